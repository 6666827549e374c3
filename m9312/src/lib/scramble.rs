//! The M9312 boot PROMs hold each word as four nibbles, one per PROM
//! location, low nibble first. The board wiring crosses data bits 0 and 8
//! and inverts bits 10 to 12, so the stored nibbles are not simply the
//! word split into four.

use log::warn;

use crate::data::{NibbleBuffer, NIBBLES_PER_WORD, POLARITY_MASK,
                  ROM_NIBBLES, ROM_WORDS, WordBuffer};

/// Exchange bits 0 and 8. This is its own inverse.
#[inline]
fn swap_bits_0_8(value: u16) -> u16 {
    (value & 0xFEFE) | ((value & 0x0001) << 8) | ((value & 0x0100) >> 8)
}

/// Recover a word from the four nibbles that store it.
pub fn unscramble(nibbles: [u8; NIBBLES_PER_WORD]) -> u16 {
    let combined = nibbles.iter().rev()
        .fold(0u16, |acc, &nibble| (acc << 4) | u16::from(nibble & 0x0F));
    swap_bits_0_8(combined) ^ POLARITY_MASK
}

/// Split a word into the four nibbles the PROM stores for it.
pub fn scramble(word: u16) -> [u8; NIBBLES_PER_WORD] {
    let stored = swap_bits_0_8(word ^ POLARITY_MASK);
    [
        (stored & 0x0F) as u8,
        ((stored >> 4) & 0x0F) as u8,
        ((stored >> 8) & 0x0F) as u8,
        ((stored >> 12) & 0x0F) as u8,
    ]
}

/// Unscramble a whole ROM.
pub fn unscramble_buffer(nibbles: &NibbleBuffer) -> WordBuffer {
    let mut words = [0; ROM_WORDS];
    for (i, (word, chunk)) in words.iter_mut()
            .zip(nibbles.chunks_exact(NIBBLES_PER_WORD))
            .enumerate() {
        if chunk.iter().any(|&n| n > 0x0F) {
            warn!("Word {} has bits set above the low nibble; they are ignored.", i);
        }
        *word = unscramble([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// Scramble a whole ROM.
pub fn scramble_buffer(words: &WordBuffer) -> NibbleBuffer {
    let mut nibbles = [0; ROM_NIBBLES];
    for (chunk, &word) in nibbles.chunks_exact_mut(NIBBLES_PER_WORD).zip(words.iter()) {
        chunk.copy_from_slice(&scramble(word));
    }
    nibbles
}
