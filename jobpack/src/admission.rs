//! The verdict handed back to a client that submitted a pack.
//!
//! The master's job endpoint passes the request body to [`respond`] and
//! writes the JSON of the returned [`Response`] back, either
//! `["ok", "<jobname>"]` or `["error", "<message>"]`.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{JobPackError, Result};
use crate::{parse, ParsedJob};

/// Largest pack accepted by default, 64 MiB.
pub const DEFAULT_MAX_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Buffers larger than this are refused before any decoding.
    pub max_size: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// A job ready to be handed to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted<'a> {
    /// Unique name, `prefix@timestamp`.
    pub name: String,
    pub job: ParsedJob<'a>,
}

/// Check a submitted buffer and name the job.
///
/// A `prefix` that is not a JSON string is named by its JSON text, so an
/// object prefix yields braces and quotes in the name. Only `/` and `.` are
/// ever refused.
pub fn admit<'a>(
    buffer: &'a [u8],
    config: &AdmissionConfig,
    now: SystemTime,
) -> Result<Admitted<'a>> {
    if buffer.len() > config.max_size {
        return Err(JobPackError::Oversized(buffer.len()));
    }

    let job = parse(buffer)?;
    let prefix = match job.jobdict.prefix() {
        Some(prefix) => prefix.to_owned(),
        None => job
            .jobdict
            .get("prefix")
            .map(|value| value.to_string())
            .unwrap_or_default(),
    };

    Ok(Admitted {
        name: job_name(&prefix, now),
        job,
    })
}

/// Build a job name from its prefix and submission time.
///
/// The suffix is the time since the epoch as hex megaseconds, seconds and
/// microseconds, e.g. `wordcount@6a2:1e3c7:4d2`.
pub fn job_name(prefix: &str, at: SystemTime) -> String {
    let since_epoch = at.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let secs = since_epoch.as_secs();
    format!(
        "{}@{:x}:{:x}:{:x}",
        prefix,
        secs / 1_000_000,
        secs % 1_000_000,
        since_epoch.subsec_micros()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// A `(status, message)` pair, serialized as a two element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response(pub Status, pub String);

impl Response {
    pub fn ok(name: impl Into<String>) -> Self {
        Self(Status::Ok, name.into())
    }

    pub fn error(err: &JobPackError) -> Self {
        Self(Status::Error, format!("Job failed to start: {}", err))
    }

    pub fn status(&self) -> Status {
        self.0
    }

    pub fn message(&self) -> &str {
        &self.1
    }

    pub fn is_ok(&self) -> bool {
        self.0 == Status::Ok
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("[\"error\",\"\"]"))
    }
}

/// Run admission on a submitted buffer and turn the outcome into the reply
/// for the client.
pub fn respond(buffer: &[u8], config: &AdmissionConfig) -> Response {
    match admit(buffer, config, SystemTime::now()) {
        Ok(admitted) => {
            info!(
                "Admitted job {} ({} byte jobhome, {} byte jobdata)",
                admitted.name,
                admitted.job.jobhome.len(),
                admitted.job.jobdata.len()
            );
            Response::ok(admitted.name)
        }
        Err(err) => {
            warn!("Rejected jobpack of {} bytes: {} ({})", buffer.len(), err, err.kind());
            Response::error(&err)
        }
    }
}
