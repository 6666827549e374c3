use std::io::{self, Read};

/// Read little-endian integers directly from a stream.
pub trait ReadLE: Read {
    fn read_u8(&mut self) -> io::Result<u8>;
    fn read_le_u16(&mut self) -> io::Result<u16>;
}

/// Everything that implements Read can also implement ReadLE.
impl<T: Read> ReadLE for T {
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_le_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}
