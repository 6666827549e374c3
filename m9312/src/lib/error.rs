use std::fmt::{Display, Formatter};
use std::io;

/// Which structural check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed hex digit, short line, or otherwise unrecognised structure.
    Syntax,
    /// The computed and declared checksums differ.
    Checksum,
    /// A byte count out of the allowed range or parity.
    RecordSize,
    /// An address would land outside the fixed-size destination.
    Bounds,
    /// The underlying stream failed or ended early.
    Stream,
}

/// Error type for this crate.
#[derive(Debug)]
pub struct PromError {
    kind: ErrorKind,
    desc: String,
}

impl PromError {
    /// Convenient creation.
    pub(crate) fn new<S>(kind: ErrorKind, desc: S) -> Self
        where S: Into<String>
    {
        PromError {
            kind,
            desc: desc.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.desc
    }

    /// Prefix the message with where the error happened.
    pub(crate) fn context<S: Display>(self, stage: S) -> Self {
        PromError {
            kind: self.kind,
            desc: format!("{}: {}", stage, self.desc),
        }
    }
}

impl Display for PromError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.desc)
    }
}

impl std::error::Error for PromError {}

/// Result type alias.
pub type PromResult<T> = Result<T, PromError>;

/// Convert IO errors to PROM errors.
impl From<io::Error> for PromError {
    fn from(e: io::Error) -> Self {
        let msg = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied",
            io::ErrorKind::UnexpectedEof => "Unexpected EOF",
            io::ErrorKind::OutOfMemory => "Out of memory",
            io::ErrorKind::BrokenPipe => "Broken pipe",
            _ => "Unexpected IO error",
        };
        PromError {
            kind: ErrorKind::Stream,
            desc: format!("IO error: {} ({}).", msg, e),
        }
    }
}

/// Return an error of the given kind with the given message if the provided
/// condition is false.
macro_rules! assert_or_error {
    ($condition:expr, $kind:expr, $message:expr) => {{
        if !$condition {
            return Err(PromError::new($kind, $message));
        }
    }}
}
