mod cli;

use anyhow::Context;
use clap::Parser;
use std::process;
use tinypack_core::BundleError;

use cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to build tokio runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(error) = rt.block_on(run(cli)) {
        let kind = error
            .downcast_ref::<BundleError>()
            .map(|e| e.kind().to_string())
            .unwrap_or_else(|| "Config".to_string());
        tracing::error!("Build failed: {:#}", error);
        eprintln!("error[{kind}]: {error:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config().context("cannot assemble build configuration")?;
    let report = tinypack_core::build(&config).await?;
    println!(
        "{} -> {} ({} modules, {} bytes)",
        report.entry,
        report.output.display(),
        report.modules,
        report.bytes
    );
    Ok(())
}
