use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, info};

use jobpack::admission::{respond, AdmissionConfig, Response};
use jobpack::{decode_header, frame, JobDict, JobPack, Mapping, SectionKind};

/// Everything `pack` needs to build a job description.
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub prefix: String,
    pub worker: String,
    pub owner: String,
    pub inputs: Vec<String>,
    pub nr_reduces: u32,
    pub scheduler: Vec<(String, String)>,
    pub envs: Vec<(String, String)>,
    pub jobhome: Option<PathBuf>,
    pub jobdata: Option<PathBuf>,
}

impl PackRequest {
    /// The jobdict section. `nr_reduces` travels as a string on the wire.
    pub fn jobdict(&self) -> Mapping {
        let scheduler: Mapping = self
            .scheduler
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let mut jobdict = Mapping::new();
        jobdict.insert("prefix".into(), json!(self.prefix));
        jobdict.insert("scheduler".into(), Value::Object(scheduler));
        jobdict.insert("input".into(), json!(self.inputs));
        jobdict.insert("worker".into(), json!(self.worker));
        jobdict.insert("owner".into(), json!(self.owner));
        jobdict.insert("nr_reduces".into(), json!(self.nr_reduces.to_string()));
        jobdict
    }

    pub fn jobenvs(&self) -> Mapping {
        self.envs
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect()
    }
}

async fn read_optional(path: &Option<PathBuf>) -> Result<Bytes> {
    match path {
        Some(path) => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Bytes::from(data))
        }
        None => Ok(Bytes::new()),
    }
}

/// Build a pack and write it to `output`.
pub async fn pack(request: PackRequest, output: &Path) -> Result<()> {
    let jobhome = read_optional(&request.jobhome).await?;
    let jobdata = read_optional(&request.jobdata).await?;

    let jobpack = JobPack::build(&request.jobdict(), &request.jobenvs(), &jobhome, &jobdata)?;

    // Refuse to write something the master would reject.
    jobpack
        .parse()
        .map_err(|e| anyhow!("job `{}` would be rejected: {}", request.prefix, e))?;

    tokio::fs::write(output, jobpack.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        "Wrote {} byte jobpack for `{}` to {}",
        jobpack.len(),
        request.prefix,
        output.display()
    );
    Ok(())
}

/// Run admission on a pack file. Returns the response the master would
/// send back to the client.
pub async fn check(file: &Path, max_size: usize) -> Result<Response> {
    let buffer = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    debug!("Checking {} ({} bytes)", file.display(), buffer.len());

    Ok(respond(&buffer, &AdmissionConfig { max_size }))
}

/// Render a human readable summary of a pack.
///
/// Runs the same stages as `jobpack::parse`, keeping the header and the
/// section ranges for display.
pub fn describe(buffer: &[u8]) -> Result<String> {
    let header = decode_header(buffer)?;
    let sections = frame(buffer, &header)?;
    let [jobdict, jobenvs, _, _] = sections;
    let jobdict = JobDict::validate(jobdict.slice(buffer))?;

    let mut out = String::new();
    out.push_str(&format!("magic    {:#010x}\n", header.magic));
    out.push_str(&format!("offsets  {:?}\n", header.offsets));
    for section in sections {
        out.push_str(&format!(
            "{:<8} [{}, {}) {} bytes\n",
            section.kind,
            section.start,
            section.end,
            section.len()
        ));
    }

    out.push_str(&format!(
        "\n[{}]\n{}\n",
        SectionKind::JobDict,
        serde_json::to_string_pretty(jobdict.as_map())?
    ));

    let envs: Mapping = serde_json::from_slice(jobenvs.slice(buffer))
        .map_err(|e| anyhow!("bad {}: {}", SectionKind::JobEnvs, e))?;
    out.push_str(&format!(
        "\n[{}]\n{}\n",
        SectionKind::JobEnvs,
        serde_json::to_string_pretty(&envs)?
    ));

    Ok(out)
}

pub async fn inspect(file: &Path) -> Result<()> {
    let buffer = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    print!("{}", describe(&buffer)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PackRequest {
        PackRequest {
            prefix: "wordcount".into(),
            worker: "wc-worker".into(),
            owner: "alice@host".into(),
            inputs: vec!["raw://hello".into()],
            nr_reduces: 3,
            scheduler: vec![("max_cores".into(), "8".into())],
            envs: vec![("LANG".into(), "C".into())],
            jobhome: None,
            jobdata: None,
        }
    }

    #[test]
    fn jobdict_carries_required_keys() {
        let jobdict = request().jobdict();
        for key in jobpack::REQUIRED_KEYS {
            assert!(jobdict.contains_key(key), "missing {}", key);
        }
        assert_eq!(jobdict["nr_reduces"], json!("3"));
        assert_eq!(jobdict["scheduler"], json!({"max_cores": "8"}));
    }

    #[test]
    fn describe_lists_sections() {
        let request = request();
        let jobpack =
            JobPack::build(&request.jobdict(), &request.jobenvs(), b"home", b"").unwrap();

        let text = describe(jobpack.as_bytes()).unwrap();
        assert!(text.contains("magic    0x0000d5c0"));
        assert!(text.contains("jobhome"));
        assert!(text.contains("4 bytes"));
        assert!(text.contains("\"wordcount\""));
        assert!(text.contains("\"LANG\""));
    }

    #[test]
    fn describe_fails_on_invalid_pack() {
        let err = describe(b"short").unwrap_err();
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn describe_rejects_what_parse_rejects() {
        let mut request = request();
        request.prefix = "a.b".into();
        let bad_prefix =
            JobPack::build(&request.jobdict(), &request.jobenvs(), b"", b"").unwrap();
        let incomplete = JobPack::build(&Mapping::new(), &Mapping::new(), b"", b"").unwrap();

        for submitted in [bad_prefix, incomplete] {
            let expected = jobpack::parse(submitted.as_bytes()).unwrap_err();
            let err = describe(submitted.as_bytes()).unwrap_err();
            assert_eq!(err.downcast_ref::<jobpack::JobPackError>(), Some(&expected));
        }
    }

    #[tokio::test]
    async fn pack_then_check() {
        let dir = std::env::temp_dir().join(format!("jp-ctl-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let home = dir.join("home.zip");
        tokio::fs::write(&home, b"PK\x03\x04").await.unwrap();
        let output = dir.join("wordcount.jobpack");

        let mut request = request();
        request.jobhome = Some(home);
        pack(request, &output).await.unwrap();

        let response = check(&output, 1 << 20).await.unwrap();
        assert!(response.is_ok(), "{:?}", response);
        assert!(response.message().starts_with("wordcount@"));

        let response = check(&output, 8).await.unwrap();
        assert!(!response.is_ok());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn pack_refuses_bad_prefix() {
        let mut request = request();
        request.prefix = "word.count".into();
        let output = std::env::temp_dir().join("jp-ctl-never-written.jobpack");

        let err = pack(request, &output).await.unwrap_err();
        assert!(err.to_string().contains("invalid prefix"));
        assert!(!output.exists());
    }
}
