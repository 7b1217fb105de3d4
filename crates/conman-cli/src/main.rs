use anyhow::Context;
use clap::Parser;
use conman_registry::{AppResolver, RegistryConfig, RegistryError};
use tracing_subscriber::EnvFilter;

mod args;

use args::Cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", describe(&e));
            e.downcast_ref::<RegistryError>()
                .map_or(1, RegistryError::exit_code)
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config(cli: &Cli) -> RegistryConfig {
    let mut config = RegistryConfig::from_env();
    if let Some(url) = &cli.trust_server {
        config = config.with_trust_server(url.clone());
    }
    if let Some(home) = &cli.home {
        config = config.with_home_dir(home.clone());
    }
    if cli.no_pull {
        config = config.with_pull_image(false);
    }
    config
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let resolver = AppResolver::new(config(&cli))?;

    if cli.list {
        let catalog = resolver.catalog().await?;
        let json = serde_json::to_string_pretty(&catalog).context("failed to render catalog")?;
        println!("{json}");
        return Ok(());
    }

    let reference = cli.app.as_deref().unwrap_or_default();
    let report = resolver.install(reference).await?;
    for file in &report.files {
        println!("{}", file.display());
    }
    Ok(())
}

/// `<stage>: <message>` for pipeline failures.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<RegistryError>() {
        Some(e) => format!("{}: {}", e.stage(), e),
        None => format!("{err:#}"),
    }
}
