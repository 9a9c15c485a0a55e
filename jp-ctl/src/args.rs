use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobpack::admission::DEFAULT_MAX_SIZE;

/// Command line of `jp-ctl`, a client-side tool for JobPack files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a job description and its payloads into a JobPack file.
    Pack {
        /// Job name stem. Must not contain '/' or '.'.
        #[arg(short, long)]
        prefix: String,

        /// Worker program the job runs.
        #[arg(short, long)]
        worker: String,

        /// Submitting user.
        #[arg(long)]
        owner: String,

        /// Input locator. May be repeated.
        #[arg(short, long = "input")]
        inputs: Vec<String>,

        /// Number of reduce tasks.
        #[arg(short, long, default_value = "1")]
        nr_reduces: u32,

        /// Scheduler hint as KEY=VALUE. May be repeated.
        #[arg(short, long, value_parser = parse_key_value)]
        scheduler: Vec<(String, String)>,

        /// Environment variable as KEY=VALUE. May be repeated.
        #[arg(short, long = "env", value_parser = parse_key_value)]
        envs: Vec<(String, String)>,

        /// Archive with the job's code.
        #[arg(long)]
        jobhome: Option<PathBuf>,

        /// Auxiliary payload passed to the job untouched.
        #[arg(long)]
        jobdata: Option<PathBuf>,

        /// Where to write the pack.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the master's admission checks on a JobPack file and print the
    /// response the master would send.
    Check {
        file: PathBuf,

        /// Largest accepted pack, in bytes.
        #[arg(short, long, default_value_t = DEFAULT_MAX_SIZE)]
        max_size: usize,
    },
    /// Show the header, section sizes and decoded metadata of a JobPack file.
    Inspect { file: PathBuf },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

/// Parse the command line into the subcommand to run:
/// - `pack` writes a new JobPack from flags and files,
/// - `check` replays the master's admission on a file and prints its reply,
/// - `inspect` dumps a valid file's header, section sizes and metadata.
pub fn parse_args() -> Commands {
    Args::parse().command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value("max_cores=4"),
            Ok(("max_cores".into(), "4".into()))
        );
        assert_eq!(parse_key_value("A=b=c"), Ok(("A".into(), "b=c".into())));
        assert_eq!(parse_key_value("EMPTY="), Ok(("EMPTY".into(), "".into())));
        assert!(parse_key_value("=x").is_err());
        assert!(parse_key_value("novalue").is_err());
    }

    #[test]
    fn pack_collects_repeated_flags() {
        let args = Args::try_parse_from([
            "jp-ctl", "pack", "-p", "wc", "-w", "worker", "--owner", "me", "-i", "raw://a",
            "-i", "raw://b", "-e", "LANG=C", "-o", "out.jobpack",
        ])
        .unwrap();

        match args.command {
            Commands::Pack {
                prefix,
                inputs,
                envs,
                nr_reduces,
                jobhome,
                ..
            } => {
                assert_eq!(prefix, "wc");
                assert_eq!(inputs, vec!["raw://a", "raw://b"]);
                assert_eq!(envs, vec![("LANG".to_string(), "C".to_string())]);
                assert_eq!(nr_reduces, 1);
                assert!(jobhome.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn inspect_takes_a_file() {
        let args = Args::try_parse_from(["jp-ctl", "inspect", "job.pack"]).unwrap();
        match args.command {
            Commands::Inspect { file } => assert_eq!(file, PathBuf::from("job.pack")),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Args::try_parse_from(["jp-ctl", "submit"]).is_err());
    }

    #[test]
    fn check_defaults_max_size() {
        let args = Args::try_parse_from(["jp-ctl", "check", "job.pack"]).unwrap();
        match args.command {
            Commands::Check { max_size, .. } => assert_eq!(max_size, DEFAULT_MAX_SIZE),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
