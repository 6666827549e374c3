use std::io::{self, Read, Write};

/// Write little-endian integers directly to a stream.
pub trait WriteLE: Write {
    fn write_u8(&mut self, val: u8) -> io::Result<()>;
    fn write_le_u16(&mut self, val: u16) -> io::Result<()>;
    fn write_nulls(&mut self, count: usize) -> io::Result<()>;
}

/// Everything that implements Write can also implement WriteLE.
impl<T: Write> WriteLE for T {
    fn write_u8(&mut self, val: u8) -> io::Result<()> {
        self.write_all(&[val])
    }

    fn write_le_u16(&mut self, val: u16) -> io::Result<()> {
        self.write_all(&val.to_le_bytes())
    }

    /// Tape leader/trailer style run of zero bytes.
    fn write_nulls(&mut self, count: usize) -> io::Result<()> {
        io::copy(&mut io::repeat(0).take(count as u64), self).map(|_| ())
    }
}
