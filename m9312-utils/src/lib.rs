pub mod file;
pub mod octprint;
pub mod read_le;
pub mod write_le;
