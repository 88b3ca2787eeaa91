use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::Style;

use dripfeed::cli::{Cli, Command};
use dripfeed::config::{LimitOverrides, RunConfig};
use dripfeed::harvest::{CrossrefCatalog, PdfDirSink, TdmClient};
use dripfeed::pipeline::{self, Dispatcher, OutcomeObserver, RateLimiter};
use dripfeed::logging;
use dripfeed::report::{BatchProgress, LogObserver, print_summary};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("  {} {err:#}", Style::new().red().bold().apply_to("✗"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch {
            out_dir,
            journal_id,
            start_year,
            end_year,
            api_key,
            save_catalog,
            calls,
            per_secs,
            burst,
            workers,
            max_wait_secs,
        } => {
            let mut config = RunConfig::load()?;
            config.apply_overrides(LimitOverrides {
                calls,
                per_secs,
                burst,
                workers,
                max_wait_secs,
            });
            if let Some(key) = api_key {
                config.api_key = key;
            }
            config.validate()?;
            if config.api_key.is_empty() {
                bail!(
                    "no API key configured; pass --api-key, set TDM_API_KEY, \
                     or add api_key to dripfeed.toml"
                );
            }
            let end_year = end_year.unwrap_or(start_year);

            let log_path = logging::init("fetch", cli.verbose)?;
            std::fs::create_dir_all(&out_dir)?;

            let catalog = CrossrefCatalog::new(journal_id, start_year, end_year)
                .with_index_dir(out_dir.clone())
                .save_raw_response(save_catalog);
            let processor = Arc::new(TdmClient::new(config.api_key.clone()));
            let sink = Arc::new(PdfDirSink::new(out_dir.clone()));
            let filter = sink.completion_filter();

            let limiter = Arc::new(RateLimiter::new(config.limiter_policy()));
            let mut dispatcher = Dispatcher::new(limiter, config.worker_count);
            dispatcher.add_observer(Arc::new(LogObserver));
            let progress = Arc::new(BatchProgress::new());
            dispatcher.add_observer(Arc::clone(&progress) as Arc<dyn OutcomeObserver>);

            // Operator interrupt: let in-flight downloads finish, then stop.
            let cancel = dispatcher.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });

            let summary = pipeline::run_batch(&catalog, &filter, &dispatcher, processor, sink)
                .await
                .context("catalog enumeration failed")?;
            progress.finish();

            print_summary(&summary);
            println!("  log written to {}", log_path.display());
            Ok(())
        }
    }
}
