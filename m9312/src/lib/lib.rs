//! Conversion between the three forms of a DEC M9312 boot PROM: the
//! scrambled nibble image that PROM programmers read and write as hex
//! records, PDP-11 absolute binary, and an octal dump.

#[macro_use]
pub mod error;
pub mod absbin;
pub mod data;
pub mod dump;
pub mod hexrec;
pub mod scramble;


use log::{debug, info, warn};
use std::io::{BufRead, Read, Write};

// Public API.
pub use data::{NibbleBuffer, Options, Padding, PromImage, WordBuffer};
pub use error::{ErrorKind, PromError, PromResult};

use crate::data::{PROM_SIZE, ROM_NIBBLES, ROM_WORDS};

/// Unscramble a PROM hex file into absolute binary.
pub fn unscramble_hex<R, W>(input: R, output: W, options: &Options) -> PromResult<()>
    where R: BufRead,
          W: Write
{
    let words = read_prom(input)?;
    absbin::write(output, options.origin, options.transfer_address(),
                  &words, &options.padding)
}

/// Scramble absolute binary into a PROM hex file covering the whole PROM.
pub fn scramble_abs<R, W>(input: R, output: W, options: &Options) -> PromResult<()>
    where R: Read,
          W: Write
{
    let mut words = [0; ROM_WORDS];
    let load = absbin::read(input, &mut words)?;
    if load.origin != options.origin {
        warn!("Binary loads at {:06o} rather than {:06o}.", load.origin, options.origin);
    }
    if load.words < ROM_WORDS {
        warn!("Binary only supplied {} of {} words; the rest are zero.",
              load.words, ROM_WORDS);
    }

    let mut image: PromImage = [0; PROM_SIZE];
    image[..ROM_NIBBLES].copy_from_slice(&scramble::scramble_buffer(&words));
    info!("Scrambled {} words.", ROM_WORDS);
    hexrec::write(output, 0, &image)
}

/// Unscramble a PROM hex file into an octal dump.
pub fn dump_hex<R, W>(input: R, output: W, options: &Options) -> PromResult<()>
    where R: BufRead,
          W: Write
{
    let words = read_prom(input)?;
    dump::render(output, options.origin, &words)
}

/// Read a whole PROM from hex records and unscramble the part in use.
pub fn read_prom<R: BufRead>(input: R) -> PromResult<WordBuffer> {
    let mut image: PromImage = [0; PROM_SIZE];
    hexrec::read(input, &mut image)?;
    if image[ROM_NIBBLES..].iter().any(|&b| b != 0) {
        warn!("The unused upper half of the PROM is not blank; ignoring it.");
    }

    let mut nibbles: NibbleBuffer = [0; ROM_NIBBLES];
    nibbles.copy_from_slice(&image[..ROM_NIBBLES]);
    debug!("Unscrambling {} nibbles.", nibbles.len());
    Ok(scramble::unscramble_buffer(&nibbles))
}
