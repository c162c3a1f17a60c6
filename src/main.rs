#![allow(unused_assignments)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use terraspec::{find_cases, render_report, run_all, Engine, RunError, RunOptions, RunSummary, TerraformCli};

/// Unit test terraform configurations
///
/// Plans the configuration once per test case and checks the plan against
/// the case's .tfspec file.
#[derive(Parser)]
#[command(name = "terraspec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder holding the test cases
    #[arg(long, default_value = "spec")]
    spec: PathBuf,

    /// Terraform configuration folder
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Print the computed plan before each case's results
    #[arg(long)]
    display_plan: bool,

    /// Terraform binary
    #[arg(long, env = "TERRASPEC_TERRAFORM", default_value = "terraform")]
    terraform: PathBuf,

    /// Log filter, e.g. `debug` or `terraspec=trace`
    #[arg(long, env = "TERRASPEC_LOG", default_value = "warn")]
    log: String,
}

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot start runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    let engine: Arc<dyn Engine> = Arc::new(TerraformCli::new(cli.terraform));
    let options = RunOptions {
        spec_dir: cli.spec,
        config_dir: cli.dir,
        display_plan: cli.display_plan,
    };

    match runtime.block_on(cmd_run(engine, options)) {
        Ok(summary) => ExitCode::from(summary.exit_code() as u8),
        Err(e) => {
            // Cases still running on blocking threads are abandoned
            runtime.shutdown_background();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(2)
        }
    }
}

async fn cmd_run(engine: Arc<dyn Engine>, options: RunOptions) -> Result<RunSummary, RunError> {
    let cases = find_cases(&options.spec_dir)?;
    tracing::info!(count = cases.len(), "running test cases");

    let stdout = std::io::stdout();
    run_all(engine, cases, Arc::new(options), |report| {
        let mut out = stdout.lock();
        let _ = out.write_all(render_report(report).as_bytes());
        let _ = out.flush();
    })
    .await
}
