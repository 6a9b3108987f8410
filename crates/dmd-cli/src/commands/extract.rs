use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;

use dmd_core::{
    Clock, Extractor, ExtractorConfig, FeedId, HttpClient, NormalizedRecord, ReqwestHttpClient,
    RunReport, SystemClock,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::error::CliError;

use super::write_line;

#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    table: &'static str,
    record: &'a NormalizedRecord,
}

pub async fn run<W: Write>(
    args: &ExtractArgs,
    config: &ExtractorConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let http = Arc::new(
        ReqwestHttpClient::new().map_err(|error| CliError::Extract(error.into()))?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after in-flight requests");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = extract(args, config, http, Arc::new(SystemClock), shutdown_rx, out).await?;
    eprintln!("{}", serde_json::to_string(&report)?);
    check_strict(args, &report)
}

pub(crate) async fn extract<W: Write>(
    args: &ExtractArgs,
    config: &ExtractorConfig,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
    out: &mut W,
) -> Result<RunReport, CliError> {
    let feeds = selected_feeds(&args.feeds)?;
    let extractor = Extractor::connect(config, http, clock)
        .await?
        .with_shutdown(shutdown);

    let mut write_error = None;
    let report = extractor
        .run(&feeds, |record| {
            let line = RecordLine {
                table: record.table(),
                record: &record,
            };
            match write_line(out, &line) {
                Ok(()) => ControlFlow::Continue(()),
                Err(error) => {
                    warn!(error = %error, "stopping run, output is not writable");
                    write_error = Some(error);
                    ControlFlow::Break(())
                }
            }
        })
        .await?;

    match write_error {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

/// All feeds when none are named; duplicates are dropped.
fn selected_feeds(names: &[String]) -> Result<Vec<FeedId>, CliError> {
    if names.is_empty() {
        return Ok(FeedId::ALL.to_vec());
    }
    let mut feeds = Vec::with_capacity(names.len());
    for name in names {
        let feed: FeedId = name.parse()?;
        if !feeds.contains(&feed) {
            feeds.push(feed);
        }
    }
    Ok(feeds)
}

fn check_strict(args: &ExtractArgs, report: &RunReport) -> Result<(), CliError> {
    let failed_cursors = report.failed_cursors();
    let malformed_rows: usize = report.feeds.iter().map(|feed| feed.malformed_rows).sum();
    if args.strict && (failed_cursors > 0 || malformed_rows > 0) {
        return Err(CliError::StrictModeViolation {
            failed_cursors,
            malformed_rows,
        });
    }
    Ok(())
}
