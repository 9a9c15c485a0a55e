//! A JobPack bundles everything a client needs to start a job on the
//! cluster (metadata, environment, code archive and auxiliary data) into one
//! self-describing buffer. The master parses the buffer once and either
//! admits the job or rejects the submission with a [`JobPackError`].
//!
//! ```text
//! bytes ─► decode_header ─► frame ─► JobDict::validate ─► ParsedJob
//! ```
//!
//! Parsing never copies: the raw sections of a [`ParsedJob`] borrow the
//! submitted buffer.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;
use tracing::debug;

pub mod admission;
pub mod error;
pub mod header;
pub mod jobdict;
pub mod section;

pub use error::{JobPackError, Result};
pub use header::{
    decode_header, encode_header, encode_header_with_magic, Header, HEADER_SIZE, MAGIC,
};
pub use jobdict::{JobDict, Mapping, REQUIRED_KEYS};
pub use section::{frame, Section, SectionKind};

/////////////////////////////////////////////////////////////////////////////
// Building
/////////////////////////////////////////////////////////////////////////////

/// An encoded JobPack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPack {
    buf: Bytes,
}

impl JobPack {
    /// Serialize the four sections into a pack.
    ///
    /// `jobdict` is not validated, so this also builds packs the master
    /// will refuse. The header is always well formed.
    pub fn build(
        jobdict: &Mapping,
        jobenvs: &Mapping,
        jobhome: &[u8],
        jobdata: &[u8],
    ) -> Result<Self> {
        let jobdict = Value::Object(jobdict.clone()).to_string();
        let jobenvs = Value::Object(jobenvs.clone()).to_string();

        let sections: [&[u8]; 4] = [jobdict.as_bytes(), jobenvs.as_bytes(), jobhome, jobdata];

        let total = HEADER_SIZE + sections.iter().map(|s| s.len()).sum::<usize>();
        if u32::try_from(total).is_err() {
            return Err(JobPackError::Oversized(total));
        }

        // Each offset is the running length up to its section.
        let mut offsets = [0u32; 4];
        let mut position = HEADER_SIZE;
        for (offset, section) in offsets.iter_mut().zip(sections) {
            *offset = position as u32;
            position += section.len();
        }

        let mut buf = BytesMut::with_capacity(total);
        Header::new(offsets).encode_into(&mut buf);
        for section in sections {
            buf.put_slice(section);
        }

        debug!("Built jobpack of {} bytes, offsets {:?}", total, offsets);
        Ok(Self { buf: buf.freeze() })
    }

    /// Wrap bytes received from elsewhere. Nothing is checked until
    /// [`JobPack::parse`].
    pub fn from_bytes(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    pub fn parse(&self) -> Result<ParsedJob<'_>> {
        parse(&self.buf)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn bytes(&self) -> Bytes {
        self.buf.clone()
    }

    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl AsRef<[u8]> for JobPack {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/////////////////////////////////////////////////////////////////////////////
// Parsing
/////////////////////////////////////////////////////////////////////////////

/// A pack that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJob<'a> {
    pub jobdict: JobDict,

    /// JSON-encoded environment. See [`ParsedJob::envs`].
    pub jobenvs: &'a [u8],

    /// Archive of the job's code.
    pub jobhome: &'a [u8],

    /// Auxiliary payload.
    pub jobdata: &'a [u8],
}

impl<'a> ParsedJob<'a> {
    /// Decode the environment section.
    pub fn envs(&self) -> Result<Mapping> {
        match serde_json::from_slice(self.jobenvs) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(JobPackError::BadEnvs("expected an object".into())),
            Err(e) => Err(JobPackError::BadEnvs(e.to_string())),
        }
    }
}

/// Parse and validate an untrusted buffer.
///
/// Stages run in order (header, framing, jobdict) and the first failure
/// is returned as is.
pub fn parse(buffer: &[u8]) -> Result<ParsedJob<'_>> {
    let header = decode_header(buffer)?;
    let [jobdict, jobenvs, jobhome, jobdata] = frame(buffer, &header)?;
    let jobdict = JobDict::validate(jobdict.slice(buffer))?;

    Ok(ParsedJob {
        jobdict,
        jobenvs: jobenvs.slice(buffer),
        jobhome: jobhome.slice(buffer),
        jobdata: jobdata.slice(buffer),
    })
}
