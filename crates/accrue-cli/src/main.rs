//! Accrue CLI - Extract fields and check rules with an OpenAI-compatible model.

use accrue_cli::commands;
use accrue_cli::config::OutputFormat;
use accrue_cli::{Cli, Command, Config, Formatter};
use accrue_llm::OpenAiProvider;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Log to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> accrue_cli::Result<()> {
    if let Command::Init(args) = &cli.command {
        let path = commands::execute_init(args, cli.config.as_deref())?;
        let formatter = Formatter::new(OutputFormat::Table, !cli.no_color);
        println!("{}", formatter.success(&format!("Wrote {}", path.display())));
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let formatter = Formatter::new(format, !cli.no_color && config.settings.color);

    let model = Arc::new(OpenAiProvider::new(config.provider.to_settings()?));

    let rendered = match &cli.command {
        Command::Extract(args) => commands::execute_extract(args, model, &config, &formatter).await?,
        Command::Match(args) => commands::execute_match(args, model, &config, &formatter).await?,
        Command::Init(_) => return Ok(()),
    };

    println!("{}", rendered);
    Ok(())
}
