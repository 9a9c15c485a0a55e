mod args;
use args::{parse_args, Commands};

mod core;
use crate::core::PackRequest;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let command = parse_args();

    match command {
        Commands::Pack {
            prefix,
            worker,
            owner,
            inputs,
            nr_reduces,
            scheduler,
            envs,
            jobhome,
            jobdata,
            output,
        } => {
            let request = PackRequest {
                prefix,
                worker,
                owner,
                inputs,
                nr_reduces,
                scheduler,
                envs,
                jobhome,
                jobdata,
            };
            core::pack(request, &output).await?;
        }
        Commands::Check { file, max_size } => {
            let response = core::check(&file, max_size).await?;
            println!("{}", response.to_json());
            if !response.is_ok() {
                std::process::exit(1);
            }
        }
        Commands::Inspect { file } => core::inspect(&file).await?,
    }

    Ok(())
}
