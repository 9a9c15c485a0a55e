//! Errors raised while building, framing or validating a JobPack.
//!
//! Every variant is terminal for the submission it was raised on. The
//! admission layer reports the first one encountered and stops.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobPackError {
    /// Buffer is shorter than the fixed header (`HEADER_SIZE` bytes).
    #[error("truncated header: only {0} bytes")]
    TruncatedHeader(usize),

    /// First four bytes are not the JobPack magic.
    #[error("bad magic: {0:#010x}")]
    BadMagic(u32),

    /// Offsets are misaligned, decreasing, past the end of the buffer,
    /// or leave the jobdict section empty.
    #[error("bad header: {0}")]
    BadHeader(String),

    /// The jobdict section is not a JSON object.
    #[error("bad jobdict: {0}")]
    BadDict(String),

    #[error("missing key: {0}")]
    MissingKey(&'static str),

    #[error("invalid prefix: {0:?} must not contain '/' or '.'")]
    InvalidPrefix(String),

    /// The jobenvs section is not a JSON object. Only raised when the
    /// environment is decoded on request, never by `parse`.
    #[error("bad jobenvs: {0}")]
    BadEnvs(String),

    /// Buffer or section larger than the wire format (or the configured
    /// admission limit) allows.
    #[error("jobpack too large: {0} bytes")]
    Oversized(usize),
}

impl JobPackError {
    /// Stable identifier of the error kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            JobPackError::TruncatedHeader(_) => "TruncatedHeader",
            JobPackError::BadMagic(_) => "BadMagic",
            JobPackError::BadHeader(_) => "BadHeader",
            JobPackError::BadDict(_) => "BadDict",
            JobPackError::MissingKey(_) => "MissingKey",
            JobPackError::InvalidPrefix(_) => "InvalidPrefix",
            JobPackError::BadEnvs(_) => "BadEnvs",
            JobPackError::Oversized(_) => "Oversized",
        }
    }
}

pub type Result<T> = std::result::Result<T, JobPackError>;
