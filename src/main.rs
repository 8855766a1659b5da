use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kablamo_e2e::browser::WebDriverFactory;
use kablamo_e2e::config::ReporterKind;
use kablamo_e2e::{report, suites, Runner, RunnerConfig};

/// Run the Kablamo end-to-end suite
#[derive(Debug, Parser)]
#[command(name = "kablamo-e2e", version, about)]
struct Cli {
    /// Number of tests run at once (overrides E2E_WORKERS)
    #[arg(long, short = 'j')]
    workers: Option<usize>,

    /// html, list or json (overrides E2E_REPORTER)
    #[arg(long)]
    reporter: Option<ReporterKind>,

    /// Directory the html/json report is written to (overrides E2E_REPORT_DIR)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Only run tests whose "<group> <title>" contains this text
    #[arg(long, short = 'g')]
    grep: Option<String>,

    /// Print the selected tests and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let filter = match "kablamo_e2e=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    let mut config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(reporter) = cli.reporter {
        config.reporter = reporter;
    }
    if let Some(report_dir) = cli.report_dir {
        config.report_dir = report_dir;
    }
    config.grep = cli.grep;

    info!("🏦 Starting Kablamo end-to-end suite...");

    let pages = Arc::new(WebDriverFactory::new(
        &config.webdriver_url,
        config.action_timeout,
    ));
    let mut runner = Runner::new(config, pages);
    runner.register(suites::all());

    if cli.list {
        for case in runner.selected() {
            println!("{} › {}", case.group, case.title);
        }
        return ExitCode::SUCCESS;
    }

    let summary = match runner.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Global setup failed: {}", e);
            return ExitCode::from(2);
        }
    };

    let config = runner.config();
    let written = report::write_report(&summary, config.reporter, &config.report_dir).await;
    if let Err(e) = &written {
        error!("{}", e);
    }

    ExitCode::from(report::exit_code(&summary, &written))
}
