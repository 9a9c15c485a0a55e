//! Job metadata carried in the first section of a pack.
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{JobPackError, Result};

/// A JSON object keyed by strings.
pub type Mapping = Map<String, Value>;

/// Keys a jobdict must carry, in the order they are checked.
pub const REQUIRED_KEYS: [&str; 6] = [
    "prefix",
    "scheduler",
    "input",
    "worker",
    "owner",
    "nr_reduces",
];

/// Characters a job prefix may not contain. The master derives path-like
/// job names from the prefix.
const PREFIX_FORBIDDEN: [char; 2] = ['/', '.'];

/// Validated job metadata.
///
/// Every key in [`REQUIRED_KEYS`] is present and `prefix` is well formed.
/// Nothing else is checked: the typed accessors report type mismatches to
/// their caller only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Mapping", into = "Mapping")]
pub struct JobDict(Mapping);

impl JobDict {
    /// Decode a jobdict section and validate it.
    pub fn validate(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| JobPackError::BadDict(e.to_string()))?;

        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(JobPackError::BadDict(format!(
                "expected an object, found {}",
                json_type(&other)
            ))),
        }
    }

    /// Validate an already decoded mapping.
    pub fn from_map(map: Mapping) -> Result<Self> {
        if let Some(key) = REQUIRED_KEYS.iter().copied().find(|key| !map.contains_key(*key)) {
            return Err(JobPackError::MissingKey(key));
        }

        let prefix = match map.get("prefix") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(JobPackError::MissingKey("prefix")),
        };
        if prefix.contains(PREFIX_FORBIDDEN) {
            return Err(JobPackError::InvalidPrefix(prefix));
        }

        debug!("Validated jobdict for prefix `{}`", prefix);
        Ok(Self(map))
    }

    pub fn as_map(&self) -> &Mapping {
        &self.0
    }

    pub fn into_map(self) -> Mapping {
        self.0
    }

    /// Encode back into the wire form of the section.
    pub fn to_vec(&self) -> Vec<u8> {
        Value::Object(self.0.clone()).to_string().into_bytes()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.0.get("prefix").and_then(Value::as_str)
    }

    pub fn worker(&self) -> Option<&str> {
        self.0.get("worker").and_then(Value::as_str)
    }

    pub fn owner(&self) -> Option<&str> {
        self.0.get("owner").and_then(Value::as_str)
    }

    /// Scheduler hints.
    pub fn scheduler(&self) -> Option<&Mapping> {
        self.0.get("scheduler").and_then(Value::as_object)
    }

    /// Input locators.
    pub fn inputs(&self) -> Option<&Vec<Value>> {
        self.0.get("input").and_then(Value::as_array)
    }

    /// Number of reduce tasks. The wire form is a string, a bare
    /// number is accepted as well.
    pub fn nr_reduces(&self) -> std::result::Result<u32, String> {
        match self.0.get("nr_reduces").unwrap_or(&Value::Null) {
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("nr_reduces {:?}: {}", s, e)),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| format!("nr_reduces {} out of range", n)),
            other => Err(format!("nr_reduces must be a string, found {}", json_type(other))),
        }
    }
}

impl Deref for JobDict {
    type Target = Mapping;

    fn deref(&self) -> &Mapping {
        &self.0
    }
}

impl TryFrom<Mapping> for JobDict {
    type Error = JobPackError;

    fn try_from(map: Mapping) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<JobDict> for Mapping {
    fn from(dict: JobDict) -> Self {
        dict.0
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
