// M9312-specific constants.
pub const ROM_WORDS: usize = 64;
pub const NIBBLES_PER_WORD: usize = 4;
pub const ROM_NIBBLES: usize = ROM_WORDS * NIBBLES_PER_WORD;
/// The boot PROM is a 512x4 part; the module only uses the first half.
pub const PROM_SIZE: usize = ROM_WORDS * 8;
/// Where the boot ROM appears in the PDP-11 address space.
pub const BOOT_ORIGIN: u16 = 0o173000;
/// Bits the PROM stores inverted.
pub const POLARITY_MASK: u16 = 0x1C00;

/// The logical ROM contents, one entry per word.
pub type WordBuffer = [u16; ROM_WORDS];

/// The scrambled ROM contents, one 4-bit nibble per byte.
pub type NibbleBuffer = [u8; ROM_NIBBLES];

/// Every location of the physical PROM, as seen by a PROM programmer.
pub type PromImage = [u8; PROM_SIZE];

/// Counts of NUL bytes written around absolute binary records. Paper tape
/// loaders used these as leader and trailer; the historical tools wrote none.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub leader: usize,
    pub interrecord: usize,
    pub trailer: usize,
}

/// Settings shared by the conversion pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Load address of the first ROM word.
    pub origin: u16,
    /// Start address written to the absolute binary end record. `None` reuses
    /// the origin, as the historical tools did.
    pub transfer: Option<u16>,
    pub padding: Padding,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            origin: BOOT_ORIGIN,
            transfer: None,
            padding: Padding::default(),
        }
    }
}

impl Options {
    pub fn transfer_address(&self) -> u16 {
        self.transfer.unwrap_or(self.origin)
    }
}
