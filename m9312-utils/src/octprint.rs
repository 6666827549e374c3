use std::fmt::Write;

/// Words shown on each line of an octal dump.
pub const WORDS_PER_LINE: usize = 8;

/// Nicely format the given words as an octal dump. Each line is labelled with
/// `origin` plus the index of its first word.
pub fn pretty_print_octal_words(words: &[u16], origin: u16) -> String {
    // Each 8 words of the input produces a line consisting of:
    // - a 6-digit address and a colon
    // - 8 words of 7 characters (a space and 6 digits)
    // - a single space
    // - 16 characters of ASCII
    // - 1 newline
    // Therefore, each 8 words of input produces 81 bytes of output.
    let mut str = String::with_capacity((words.len() / WORDS_PER_LINE + 1) * 81);
    for (line, chunk) in words.chunks(WORDS_PER_LINE).enumerate() {
        let address = origin.wrapping_add((line * WORDS_PER_LINE) as u16);
        write!(str, "{:06o}:", address).unwrap();
        for word in chunk.iter() {
            write!(str, " {:06o}", word).unwrap();
        }
        // Pad a short final line so the ASCII column stays aligned.
        for _ in chunk.len()..WORDS_PER_LINE {
            str.push_str("       ");
        }
        str.push(' ');
        for word in chunk.iter() {
            let [high, low] = word.to_be_bytes();
            str.push(printable(high));
            str.push(printable(low));
        }
        for _ in chunk.len()..WORDS_PER_LINE {
            str.push_str("  ");
        }
        str.push('\n');
    }

    str
}

fn printable(chr: u8) -> char {
    match chr {
        32..=126 => chr.into(),
        _ => '.',
    }
}
