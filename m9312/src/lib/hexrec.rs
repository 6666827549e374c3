use itertools::Itertools;
use log::{trace, debug, info};
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};

use crate::error::{ErrorKind, PromError, PromResult};

/// Longest data record written by `write`.
pub const DATA_BYTES_PER_LINE: usize = 32;

// Record type constants.
pub const RECORD_TYPE_DATA: u8 = 0x00;
pub const RECORD_TYPE_END: u8 = 0x01;

/// A colon, byte count, address, record type and checksum.
const MIN_RECORD_LEN: usize = 11;
/// Byte count, two address bytes, record type and checksum.
const OVERHEAD_BYTES: usize = 5;

/// A single parsed hex record.
#[derive(Debug, PartialEq, Eq)]
pub struct HexRecord {
    pub address: u16,
    pub record_type: u8,
    pub data: Vec<u8>,
}

impl HexRecord {
    /// A data record. At most 255 bytes fit in a record.
    pub fn data(address: u16, data: &[u8]) -> Self {
        assert!(data.len() <= usize::from(u8::MAX),
                "Hex record payload of {} bytes is too long.", data.len());
        Self {
            address,
            record_type: RECORD_TYPE_DATA,
            data: data.to_vec(),
        }
    }

    /// The end-of-file record.
    pub fn end() -> Self {
        Self {
            address: 0,
            record_type: RECORD_TYPE_END,
            data: Vec::new(),
        }
    }

    /// Parse one line, which must begin with a colon and have any line
    /// terminator already removed. Characters after the checksum are ignored.
    pub fn parse(line: &[u8]) -> PromResult<Self> {
        assert_or_error!(line.len() >= MIN_RECORD_LEN, ErrorKind::Syntax,
            format!("Record shorter than {} characters.", MIN_RECORD_LEN));
        let byte_count = usize::from(hex_byte(line, 0)?);
        let needed = MIN_RECORD_LEN + 2 * byte_count;
        assert_or_error!(line.len() >= needed, ErrorKind::Syntax,
            format!("Record too short for byte count {}: needs {} characters, has {}.",
                    byte_count, needed, line.len()));

        // Decode every byte first; the checksum covers them all.
        let bytes = (0..byte_count + OVERHEAD_BYTES)
            .map(|i| hex_byte(line, i))
            .collect::<PromResult<Vec<u8>>>()?;
        let declared = bytes[bytes.len() - 1];
        let computed = checksum(&bytes[..bytes.len() - 1]);
        assert_or_error!(declared == computed, ErrorKind::Checksum,
            format!("Checksum mismatch: record has {:02X}, contents give {:02X}.",
                    declared, computed));

        Ok(Self {
            address: u16::from_be_bytes([bytes[1], bytes[2]]),
            record_type: bytes[3],
            data: bytes[4..4 + byte_count].to_vec(),
        })
    }

    /// Copy a data record's payload into `dest` at its address.
    fn store(&self, dest: &mut [u8]) -> PromResult<()> {
        // An empty record writes nothing, wherever it points.
        if self.data.is_empty() {
            return Ok(());
        }
        let start = usize::from(self.address);
        let end = start + self.data.len();
        assert_or_error!(end <= dest.len(), ErrorKind::Bounds,
            format!("Data at {:#06X}..{:#06X} lies outside the {}-byte image.",
                    start, end, dest.len()));
        dest[start..end].copy_from_slice(&self.data);
        Ok(())
    }

    /// Every byte of the record except the checksum.
    fn header_and_data(&self) -> Vec<u8> {
        let [addr_hi, addr_lo] = self.address.to_be_bytes();
        let mut bytes = Vec::with_capacity(self.data.len() + OVERHEAD_BYTES);
        bytes.extend_from_slice(&[self.data.len() as u8, addr_hi, addr_lo, self.record_type]);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

impl Display for HexRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bytes = self.header_and_data();
        write!(f, ":{}{:02X}",
               bytes.iter().map(|b| format!("{:02X}", b)).join(""),
               checksum(&bytes))
    }
}

/// The two's complement of the byte sum, which brings the record total to 0.
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)).wrapping_neg()
}

/// Decode the `index`th hex-digit pair after the leading colon.
fn hex_byte(line: &[u8], index: usize) -> PromResult<u8> {
    let column = 1 + 2 * index;
    let high = hex_digit(line, column)?;
    let low = hex_digit(line, column + 1)?;
    Ok((high << 4) | low)
}

fn hex_digit(line: &[u8], column: usize) -> PromResult<u8> {
    let c = line.get(column).copied().unwrap_or(b' ');
    char::from(c).to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| PromError::new(ErrorKind::Syntax,
            format!("Invalid hex digit '{}' in column {}.",
                    char::from(c).escape_default(), column + 1)))
}

/// Drop any trailing CR/LF.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Read a hex record file into `dest`. Lines that don't start with a colon
/// are ignored, as are record types other than data and end. Reading stops at
/// the first end record, or at the end of the stream if there isn't one.
pub fn read<R: BufRead>(mut source: R, dest: &mut [u8]) -> PromResult<()> {
    let mut line = Vec::new();
    let mut line_number = 0;
    let mut data_records = 0;
    loop {
        line.clear();
        let len = source.read_until(b'\n', &mut line)
            .map_err(|e| PromError::from(e)
                .context(format!("Hex record line {}", line_number + 1)))?;
        if len == 0 {
            info!("Hex input ended without an end record after {} data records.",
                  data_records);
            return Ok(());
        }
        line_number += 1;

        let text = trim_line_end(&line);
        if text.first() != Some(&b':') {
            trace!("Skipping line {}: not a record.", line_number);
            continue;
        }
        let record = HexRecord::parse(text)
            .and_then(|record| {
                if record.record_type == RECORD_TYPE_DATA {
                    record.store(dest)?;
                }
                Ok(record)
            })
            .map_err(|e| e.context(format!("Hex record line {}", line_number)))?;

        match record.record_type {
            RECORD_TYPE_DATA => {
                trace!("Line {}: {} bytes at {:#06X}.",
                       line_number, record.data.len(), record.address);
                data_records += 1;
            },
            RECORD_TYPE_END => {
                info!("Read {} data records; end record on line {}.",
                      data_records, line_number);
                return Ok(());
            },
            other => {
                debug!("Ignoring record type {:02X} on line {}.", other, line_number);
            },
        }
    }
}

/// Write `data` as a series of data records starting at `base_address`,
/// followed by an end record.
pub fn write<W: Write>(mut out: W, base_address: u16, data: &[u8]) -> PromResult<()> {
    let mut address = base_address;
    let mut records = 0;
    for chunk in data.chunks(DATA_BYTES_PER_LINE) {
        writeln!(out, "{}", HexRecord::data(address, chunk))?;
        address = address.wrapping_add(chunk.len() as u16);
        records += 1;
    }
    writeln!(out, "{}", HexRecord::end())?;
    info!("Wrote {} data records covering {} bytes.", records, data.len());
    Ok(())
}
