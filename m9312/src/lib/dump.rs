use log::info;
use m9312_utils::octprint::pretty_print_octal_words;
use std::io::Write;

use crate::error::PromResult;

/// Write an octal dump of `words`, addressed from `origin`.
pub fn render<W: Write>(mut out: W, origin: u16, words: &[u16]) -> PromResult<()> {
    out.write_all(pretty_print_octal_words(words, origin).as_bytes())?;
    out.flush()?;
    info!("Dumped {} words from {:06o}.", words.len(), origin);
    Ok(())
}
