//! PDP-11 absolute binary ("absolute loader") format.
//!
//! Each record ("frame") is:
//!
//! ```text
//! 001 000            sync, i.e. little-endian 0x0001
//! count_lo count_hi  bytes in the frame excluding the checksum, so >= 6
//! addr_lo addr_hi    load address, or transfer address if count == 6
//! data...            count - 6 bytes of little-endian words
//! checksum           makes the sum of every byte in the frame 0
//! ```
//!
//! Anything between frames (usually NUL leader and trailer) is skipped.

use log::{trace, debug, info};
use std::io::Write;
use m9312_utils::octprint::pretty_print_octal_words;
use m9312_utils::read_le::ReadLE;
use m9312_utils::write_le::WriteLE;

use crate::data::Padding;
use crate::error::{ErrorKind, PromError, PromResult};

/// Longest data payload written by `write`.
pub const DATA_BYTES_PER_RECORD: usize = 32;

const SYNC: u16 = 0x0001;
/// Sync, byte count and address.
const HEADER_BYTES: u16 = 6;

/// What was learned from reading an absolute binary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsLoad {
    /// Address of the first record, which the destination is indexed from.
    pub origin: u16,
    /// Start address from the end record.
    pub transfer: u16,
    /// Number of words stored into the destination.
    pub words: usize,
}

/// Read an absolute binary stream into `dest`, which is indexed from the
/// first record's load address.
pub fn read<S: ReadLE>(source: S, dest: &mut [u16]) -> PromResult<AbsLoad> {
    Reader::new(source).run(dest)
}

#[derive(Debug)]
struct Reader<S> {
    source: S,
    checksum: u8,
    bytes_read: usize,
}

impl<S: ReadLE> Reader<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            checksum: 0,
            bytes_read: 0,
        }
    }

    fn run(&mut self, dest: &mut [u16]) -> PromResult<AbsLoad> {
        let mut origin = None;
        let mut words = 0;
        loop {
            let start = self.sync()
                .map_err(|e| e.context("Absolute binary ended before the end record"))?;
            let transfer = self.read_record(dest, &mut origin, &mut words)
                .map_err(|e| e.context(format!("Absolute binary record at byte {}", start)))?;
            if let Some(transfer) = transfer {
                // The end record sets the origin if it was the only record.
                let origin = origin.unwrap_or(transfer);
                info!("Loaded {} words from {:06o}; transfer address {:06o}.",
                      words, origin, transfer);
                trace!("Loaded image:\n{}", pretty_print_octal_words(dest, origin));
                return Ok(AbsLoad {
                    origin,
                    transfer,
                    words,
                });
            }
        }
    }

    /// Skip to just past the next sync pattern, returning the offset of the
    /// record it starts.
    fn sync(&mut self) -> PromResult<usize> {
        let skipped_from = self.bytes_read;
        let mut window: u16 = 0;
        while window != SYNC {
            let byte = self.read_u8()?;
            window = (window >> 8) | (u16::from(byte) << 8);
        }
        let start = self.bytes_read - 2;
        if start > skipped_from {
            trace!("Skipped {} bytes before record at byte {}.", start - skipped_from, start);
        }
        // The sync bytes count towards the checksum.
        self.checksum = 0;
        for byte in SYNC.to_le_bytes() {
            self.add_to_checksum(byte);
        }
        Ok(start)
    }

    /// Read the rest of a record after its sync. Returns the transfer address
    /// if this was the end record.
    fn read_record(&mut self, dest: &mut [u16], origin: &mut Option<u16>,
                   words: &mut usize) -> PromResult<Option<u16>> {
        let byte_count = self.read_u16()?;
        assert_or_error!(byte_count >= HEADER_BYTES && byte_count % 2 == 0,
            ErrorKind::RecordSize,
            format!("Invalid byte count {}: must be even and at least {}.",
                    byte_count, HEADER_BYTES));
        let address = self.read_u16()?;
        let base = *origin.get_or_insert(address);

        let payload_words = usize::from((byte_count - HEADER_BYTES) / 2);
        if payload_words > 0 {
            debug!("Data record: {} words at {:06o}.", payload_words, address);
        }
        let mut load_address = address;
        for _ in 0..payload_words {
            let word = self.read_u16()?;
            let offset = load_address.checked_sub(base).ok_or_else(|| PromError::new(
                ErrorKind::Bounds,
                format!("Load address {:06o} is below the origin {:06o}.",
                        load_address, base)))?;
            let index = usize::from(offset / 2);
            assert_or_error!(index < dest.len(), ErrorKind::Bounds,
                format!("Load address {:06o} is past the end of the {}-word image at {:06o}.",
                        load_address, dest.len(), base));
            dest[index] = word;
            *words += 1;
            load_address = load_address.wrapping_add(2);
        }

        let sum_before = self.checksum;
        let declared = self.read_u8()?;
        self.add_to_checksum(declared);
        assert_or_error!(self.checksum == 0, ErrorKind::Checksum,
            format!("Checksum mismatch: record has {:03o}, contents give {:03o}.",
                    declared, sum_before.wrapping_neg()));

        if payload_words == 0 {
            debug!("End record: transfer address {:06o}.", address);
            Ok(Some(address))
        } else {
            Ok(None)
        }
    }

    fn add_to_checksum(&mut self, byte: u8) {
        self.checksum = self.checksum.wrapping_add(byte);
    }

    fn read_u8(&mut self) -> PromResult<u8> {
        let val = self.source.read_u8()?;
        self.bytes_read += 1;
        Ok(val)
    }

    fn read_u16(&mut self) -> PromResult<u16> {
        let val = self.source.read_le_u16()?;
        self.bytes_read += 2;
        for byte in val.to_le_bytes() {
            self.add_to_checksum(byte);
        }
        Ok(val)
    }
}

/// Write `words` as data records loading from `origin`, then an end record
/// carrying `transfer`.
pub fn write<W: WriteLE>(out: W, origin: u16, transfer: u16, words: &[u16],
                         padding: &Padding) -> PromResult<()> {
    let mut writer = Writer {
        out,
        checksum: 0,
    };

    writer.out.write_nulls(padding.leader)?;
    let mut address = origin;
    let mut records = 0;
    for chunk in words.chunks(DATA_BYTES_PER_RECORD / 2) {
        writer.write_record(address, chunk)?;
        writer.out.write_nulls(padding.interrecord)?;
        address = address.wrapping_add(2 * chunk.len() as u16);
        records += 1;
    }
    writer.write_record(transfer, &[])?;
    writer.out.write_nulls(padding.trailer)?;
    writer.out.flush()?;

    info!("Wrote {} data records from {:06o}; transfer address {:06o}.",
          records, origin, transfer);
    Ok(())
}

struct Writer<W> {
    out: W,
    checksum: u8,
}

impl<W: WriteLE> Writer<W> {
    fn write_record(&mut self, address: u16, payload: &[u16]) -> PromResult<()> {
        self.checksum = 0;
        self.write_u16(SYNC)?;
        self.write_u16(HEADER_BYTES + 2 * payload.len() as u16)?;
        self.write_u16(address)?;
        for &word in payload {
            self.write_u16(word)?;
        }
        self.out.write_u8(self.checksum.wrapping_neg())?;
        trace!("Record of {} words at {:06o}.", payload.len(), address);
        Ok(())
    }

    fn write_u16(&mut self, val: u16) -> PromResult<()> {
        for byte in val.to_le_bytes() {
            self.checksum = self.checksum.wrapping_add(byte);
        }
        self.out.write_le_u16(val).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init;

    /// Build one frame with a correct checksum.
    fn frame(address: u16, payload: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        Writer { out: &mut out, checksum: 0 }.write_record(address, payload).unwrap();
        out
    }

    #[test]
    fn test_frame_layout() {
        init();
        assert_eq!(frame(0o1000, &[0x1234]),
                   vec![0x01, 0x00, 0x08, 0x00, 0x00, 0x02, 0x34, 0x12, 0xAF]);
        assert_eq!(frame(0o173000, &[]),
                   vec![0x01, 0x00, 0x06, 0x00, 0x00, 0xF6, 0x03]);
    }

    #[test]
    fn test_two_words() {
        init();
        let mut input = vec![0, 0, 0];
        input.extend(frame(0, &[0x1234, 0x5678]));
        input.extend(frame(0o1000, &[]));
        let mut dest = [0; 2];
        let load = read(input.as_slice(), &mut dest).unwrap();
        assert_eq!(dest, [0x1234, 0x5678]);
        assert_eq!(load, AbsLoad { origin: 0, transfer: 0o1000, words: 2 });
    }

    #[test]
    fn test_resync_past_junk() {
        init();
        let mut input = vec![0xFF, 0x00, 0x37];
        input.extend(frame(0o1000, &[0x1234]));
        input.extend([0xFF, 0x01, 0x37]);
        input.extend(frame(0o1002, &[0x5678]));
        input.extend([0x01, 0xFF, 0x00]);
        input.extend(frame(0o1000, &[]));
        let mut dest = [0; 2];
        let load = read(input.as_slice(), &mut dest).unwrap();
        assert_eq!(dest, [0x1234, 0x5678]);
        assert_eq!(load, AbsLoad { origin: 0o1000, transfer: 0o1000, words: 2 });
    }

    #[test]
    fn test_offsets_from_first_record() {
        init();
        let mut input = frame(0o173000, &[1, 2]);
        input.extend(frame(0o173010, &[5]));
        input.extend(frame(0o173004, &[3, 4]));
        input.extend(frame(0o173000, &[]));
        let mut dest = [0; 6];
        let load = read(input.as_slice(), &mut dest).unwrap();
        assert_eq!(dest, [1, 2, 3, 4, 5, 0]);
        assert_eq!(load.origin, 0o173000);
    }

    #[test]
    fn test_stops_after_end_record() {
        init();
        let mut input = frame(0, &[7]);
        input.extend(frame(0, &[]));
        input.extend(frame(0, &[8]));
        let mut dest = [0; 1];
        read(input.as_slice(), &mut dest).unwrap();
        assert_eq!(dest, [7]);
    }

    #[test]
    fn test_missing_end_record() {
        init();
        let input = frame(0, &[7]);
        let err = read(input.as_slice(), &mut [0; 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stream);
    }

    #[test]
    fn test_truncated_record() {
        init();
        let mut input = frame(0, &[7, 8]);
        input.truncate(input.len() - 2);
        let err = read(input.as_slice(), &mut [0; 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stream);
        assert!(err.message().starts_with("Absolute binary record at byte 0:"));
    }

    #[test]
    fn test_bad_byte_counts() {
        init();
        for count in [0u16, 4, 5, 7, 9] {
            let mut input = vec![0x01, 0x00];
            input.extend(count.to_le_bytes());
            input.extend([0; 8]);
            let err = read(input.as_slice(), &mut [0; 4]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RecordSize, "count {}", count);
        }
    }

    #[test]
    fn test_below_origin() {
        init();
        let mut input = frame(0o1000, &[1]);
        input.extend(frame(0o776, &[2]));
        input.extend(frame(0, &[]));
        let err = read(input.as_slice(), &mut [0; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bounds);
        assert!(err.message().starts_with("Absolute binary record at byte 9:"));
    }

    #[test]
    fn test_past_end() {
        init();
        let mut input = frame(0, &[1, 2, 3]);
        input.extend(frame(0, &[]));
        let err = read(input.as_slice(), &mut [0; 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bounds);
    }

    /// Flipping any bit after the sync is caught.
    #[test]
    fn test_single_bit_corruption() {
        init();
        let good = frame(0o173000, &[0o012700, 0o177560]);
        for i in 2..good.len() - 1 {
            for bit in 0..8 {
                let mut input = good.clone();
                input[i] ^= 1 << bit;
                input.extend(frame(0, &[]));
                let err = read(input.as_slice(), &mut [0; 64]).unwrap_err();
                // A corrupt byte count may be rejected or misframe the record.
                if i < 4 {
                    assert!(matches!(err.kind(), ErrorKind::RecordSize
                                                 | ErrorKind::Checksum
                                                 | ErrorKind::Bounds
                                                 | ErrorKind::Stream),
                            "byte {} bit {}: {:?}", i, bit, err);
                } else {
                    assert_eq!(err.kind(), ErrorKind::Checksum,
                               "byte {} bit {}: {:?}", i, bit, err);
                }
            }
        }
    }

    #[test]
    fn test_write_layout() {
        init();
        let words: Vec<u16> = (0..20).collect();
        let mut out = Vec::new();
        write(&mut out, 0o173000, 0o173000, &words, &Padding::default()).unwrap();
        // Two data records of 16 and 4 words, then the end record.
        assert_eq!(out.len(), (7 + 32) + (7 + 8) + 7);
        assert_eq!(&out[..6], &[0x01, 0x00, 0x26, 0x00, 0x00, 0xF6]);
        assert_eq!(&out[39..45], &[0x01, 0x00, 0x0E, 0x00, 0x20, 0xF6]);
        assert_eq!(&out[54..], &frame(0o173000, &[])[..]);
    }

    #[test]
    fn test_write_padding() {
        init();
        let padding = Padding { leader: 3, interrecord: 2, trailer: 4 };
        let mut out = Vec::new();
        write(&mut out, 0, 0o200, &[0o777], &padding).unwrap();
        let mut expected = vec![0; 3];
        expected.extend(frame(0, &[0o777]));
        expected.extend([0; 2]);
        expected.extend(frame(0o200, &[]));
        expected.extend([0; 4]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_write_read_round_trip() {
        init();
        let words: Vec<u16> = (0..64u16).map(|i| i.wrapping_mul(0x3D27) ^ 0o104400).collect();
        let padding = Padding { leader: 16, interrecord: 1, trailer: 16 };
        let mut out = Vec::new();
        write(&mut out, 0o173000, 0o173024, &words, &padding).unwrap();
        let mut dest = [0; 64];
        let load = read(out.as_slice(), &mut dest).unwrap();
        assert_eq!(&dest[..], &words[..]);
        assert_eq!(load, AbsLoad { origin: 0o173000, transfer: 0o173024, words: 64 });
    }
}
