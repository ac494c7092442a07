use anyhow::{Context, Result};
use clap::Parser;
use controller::{JobSource, RunController, read_jobs_file};
use easyapply_common::observability::init_logging;
use easyapply_config::{ApplyConfig, ApplyConfigLoader, default_config_path};
use easyapply_drivers::browser::driver::ApplyDriver;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
mod controller;

/// Fill and submit Easy Apply job applications in a logged-in browser.
#[derive(Parser, Debug)]
#[command(name = "easyapply", version)]
struct Cli {
    /// Configuration file. Defaults to ./easyapply.yaml, then the per-user
    /// config directory.
    #[arg(short, long, env = "EASYAPPLY_CONFIG")]
    config: Option<PathBuf>,

    /// Job listing URL to apply to. Repeatable.
    #[arg(long = "job", value_name = "URL")]
    jobs: Vec<String>,

    /// File with one job listing URL per line (`#` starts a comment).
    #[arg(long, value_name = "PATH")]
    jobs_file: Option<PathBuf>,

    /// Result pages to walk when collecting listings from the open search.
    #[arg(long, default_value_t = 5)]
    max_result_pages: u32,

    /// Start immediately instead of waiting for a manual login.
    #[arg(long)]
    skip_login_pause: bool,

    /// Sleep through an open run breaker instead of stopping the run.
    #[arg(long)]
    wait_for_breaker: bool,
}

fn load_config(cli: &Cli) -> Result<ApplyConfig> {
    let loader = match &cli.config {
        Some(path) => ApplyConfigLoader::new().with_file(path),
        None => {
            let mut loader = ApplyConfigLoader::new().with_optional_file("easyapply.yaml");
            if let Some(user) = default_config_path() {
                loader = loader.with_optional_file(user);
            }
            loader
        }
    };
    let cfg = loader.load().context("loading configuration")?;
    Ok(cfg.validated()?)
}

/// Block until the operator presses Enter or the run is cancelled.
async fn login_pause(cancel: &CancellationToken) -> Result<()> {
    eprintln!();
    eprintln!("Log in, open your job search results, close any pop-ups,");
    eprintln!("then press Enter here to start.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        _ = cancel.cancelled() => anyhow::bail!("cancelled before the run started"),
        line = lines.next_line() => {
            line.context("reading stdin")?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins), then logging from its `logging:` section
    let cfg = load_config(&cli)?;
    let log_path = init_logging(cfg.logging.to_log_config())?;
    info!(target: "easyapply.run", log_dir = %log_path.display(), "easyapply starting");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "easyapply.run", "interrupt received; finishing at the next step boundary");
                cancel.cancel();
            }
        });
    }

    let mut urls = cli.jobs.clone();
    if let Some(path) = &cli.jobs_file {
        urls.extend(read_jobs_file(path)?);
    }
    let source = if urls.is_empty() {
        JobSource::Results {
            max_pages: cli.max_result_pages.max(1),
        }
    } else {
        JobSource::Urls(urls)
    };

    // 2) Browser session
    let driver = ApplyDriver::connect(&cfg.browser).await?;
    let mut page = driver.page();
    page.goto(&cfg.browser.start_url).await?;
    if !cli.skip_login_pause {
        login_pause(&cancel).await?;
    }

    // 3) Run
    let mut controller = RunController::new(cfg.engine.clone(), cancel, cli.wait_for_breaker);
    let outcome = controller.run(&mut page, &cfg.profile, source).await;

    if let Err(e) = driver.close().await {
        warn!(target: "easyapply.run", error = %e, "failed to close the browser session");
    }
    outcome
}
