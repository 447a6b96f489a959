use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sqlrun_console::{Console, Reply};
use sqlrun_core::{load_config, Config};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "sqlrun", version, about = "Console for the SQL runner backend")]
struct Cli {
    /// TOML config file
    #[arg(long, env = "SQLRUN_CONFIG")]
    config: Option<PathBuf>,
    /// Backend base URL; overrides config and SQLRUN_API_URL
    #[arg(long)]
    api_url: Option<String>,
    /// Directory for durable state such as query history
    #[arg(long)]
    storage_dir: Option<PathBuf>,
    /// Run one statement or command, print the result and exit
    #[arg(short = 'e', long = "execute")]
    execute: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    sqlrun_otel::init_with_default("warn");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(&path.to_string_lossy())?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    if let Some(url) = cli.api_url {
        config.api.base_url = Some(url);
    }
    if let Some(dir) = cli.storage_dir {
        config.storage.dir = Some(dir.to_string_lossy().into_owned());
    }
    let settings = config.resolve()?;

    let mut console = Console::start(&settings)
        .await
        .with_context(|| format!("starting console against {}", settings.base_url))?;

    if let Some(line) = cli.execute {
        if let Reply::Output(text) = console.handle(&line).await {
            println!("{text}");
        }
        return Ok(());
    }

    println!(
        "Connected to {} ({} tables). \\help for commands.",
        settings.base_url,
        console.tables().len()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("sqlrun> ");
        std::io::stdout().flush().context("flushing prompt")?;
        let Some(line) = lines.next_line().await.context("reading input")? else {
            break;
        };
        match console.handle(&line).await {
            Reply::Output(text) => println!("{text}"),
            Reply::Silent => {}
            Reply::Quit => break,
        }
    }
    Ok(())
}
