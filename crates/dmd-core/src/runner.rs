//! Multi-feed extraction runs.
//!
//! Each feed walks its session in its own task; at most `concurrency` walks
//! are active at once. Normalized records flow through a bounded channel to
//! the caller's sink, so a slow sink blocks the walks instead of letting
//! records pile up.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::feed::FeedId;
use crate::http_client::HttpClient;
use crate::normalize::{normalize, Normalized};
use crate::retry::{RetryConfig, RetryingSource};
use crate::schema::NormalizedRecord;
use crate::session::Session;
use crate::tables::schema_for;
use crate::walk::{ArtifactSource, SessionWalk};
use crate::window::SessionHours;

/// Counters for one feed in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedReport {
    pub feed: FeedId,
    pub table: &'static str,
    /// Artifact fetches attempted (retries not counted).
    pub ticks: usize,
    pub failed_cursors: usize,
    pub rows_read: usize,
    pub records_emitted: usize,
    pub validation_skips: usize,
    pub malformed_rows: usize,
}

impl FeedReport {
    fn new(feed: FeedId) -> Self {
        Self {
            feed,
            table: feed.table_name(),
            ticks: 0,
            failed_cursors: 0,
            rows_read: 0,
            records_emitted: 0,
            validation_skips: 0,
            malformed_rows: 0,
        }
    }
}

/// Outcome of [`Extractor::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// In the order the feeds were requested.
    pub feeds: Vec<FeedReport>,
    /// The sink asked to stop before every record was delivered.
    pub stopped_by_sink: bool,
}

impl RunReport {
    pub fn feed(&self, feed: FeedId) -> Option<&FeedReport> {
        self.feeds.iter().find(|report| report.feed == feed)
    }

    pub fn records_emitted(&self) -> usize {
        self.feeds.iter().map(|report| report.records_emitted).sum()
    }

    pub fn failed_cursors(&self) -> usize {
        self.feeds.iter().map(|report| report.failed_cursors).sum()
    }
}

/// Runs feeds against one authenticated source.
pub struct Extractor<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    hours: SessionHours,
    retry: RetryConfig,
    concurrency: usize,
    queue_size: usize,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Extractor<Session> {
    /// Validates `config`, logs in over `http` and returns an extractor
    /// bound to the new session. The session lives as long as the extractor.
    pub async fn connect(
        config: &ExtractorConfig,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ExtractError> {
        config.validate()?;
        let session = Session::authenticate(http, &config.base_url, &config.credentials())
            .await?
            .with_timeout_ms(config.request_timeout_ms);
        Ok(Self::new(config, session, clock))
    }
}

impl<S> Extractor<S>
where
    S: ArtifactSource + 'static,
{
    pub fn new(config: &ExtractorConfig, source: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            source: Arc::new(source),
            clock,
            hours: config.session_hours(),
            retry: config.retry_config(),
            concurrency: config.concurrency.max(1),
            queue_size: config.queue_size.max(1),
            shutdown: None,
        }
    }

    /// Replaces the retry policy applied to every artifact fetch.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Stops every walk, in-flight requests included, once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Extracts today's session of every feed in `feeds`, handing records to
    /// `sink` as they arrive. Returning [`ControlFlow::Break`] from the sink
    /// stops all walks, in-flight requests included.
    pub async fn run<F>(&self, feeds: &[FeedId], mut sink: F) -> Result<RunReport, ExtractError>
    where
        F: FnMut(NormalizedRecord) -> ControlFlow<()>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("extract_run", %run_id);

        async move {
            info!(feeds = feeds.len(), concurrency = self.concurrency, "starting extraction run");

            let (tx, mut rx) = mpsc::channel(self.queue_size);
            let permits = Arc::new(Semaphore::new(self.concurrency));

            // Raised by the caller's shutdown or by the sink; every walk watches it.
            let requested = self.shutdown.as_ref().is_some_and(|rx| *rx.borrow());
            let (stop_tx, stop_rx) = watch::channel(requested);
            let stop_tx = Arc::new(stop_tx);
            let forwarder = self.shutdown.clone().map(|mut shutdown| {
                let stop_tx = Arc::clone(&stop_tx);
                tokio::spawn(async move {
                    if shutdown.wait_for(|requested| *requested).await.is_ok() {
                        debug!("shutdown requested");
                        stop_tx.send_replace(true);
                    }
                })
            });
            let mut tasks = Vec::with_capacity(feeds.len());

            for &feed in feeds {
                let task = FeedTask {
                    feed,
                    source: RetryingSource::new(Arc::clone(&self.source), self.retry.clone()),
                    clock: Arc::clone(&self.clock),
                    hours: self.hours,
                    stop: stop_rx.clone(),
                    records: tx.clone(),
                };
                let permits = Arc::clone(&permits);
                let handle = tokio::spawn(
                    async move {
                        let Ok(_permit) = permits.acquire_owned().await else {
                            return FeedReport::new(feed);
                        };
                        task.run().await
                    }
                    .instrument(info_span!("feed", feed = %feed)),
                );
                tasks.push((feed, handle));
            }
            drop(tx);

            let mut stopped_by_sink = false;
            while let Some(record) = rx.recv().await {
                if sink(record).is_break() {
                    debug!("sink requested stop");
                    stopped_by_sink = true;
                    stop_tx.send_replace(true);
                    break;
                }
            }
            drop(rx);

            let mut reports = Vec::with_capacity(tasks.len());
            let mut failure = None;
            for (feed, handle) in tasks {
                match handle.await {
                    Ok(report) => reports.push(report),
                    Err(error) => {
                        warn!(feed = %feed, error = %error, "feed task did not complete");
                        failure.get_or_insert(ExtractError::Task {
                            feed: feed.as_str(),
                            message: error.to_string(),
                        });
                    }
                }
            }
            if let Some(forwarder) = forwarder {
                forwarder.abort();
            }
            if let Some(error) = failure {
                return Err(error);
            }

            let report = RunReport {
                run_id,
                feeds: reports,
                stopped_by_sink,
            };
            info!(
                records = report.records_emitted(),
                failed_cursors = report.failed_cursors(),
                "extraction run finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

struct FeedTask<S> {
    feed: FeedId,
    source: RetryingSource<Arc<S>>,
    clock: Arc<dyn Clock>,
    hours: SessionHours,
    stop: watch::Receiver<bool>,
    records: mpsc::Sender<NormalizedRecord>,
}

impl<S: ArtifactSource> FeedTask<S> {
    async fn run(self) -> FeedReport {
        let Self {
            feed,
            source,
            clock,
            hours,
            stop,
            records,
        } = self;
        let schema = schema_for(feed);
        let mut report = FeedReport::new(feed);

        let mut walk =
            SessionWalk::new(source, feed, hours, Arc::clone(&clock)).with_shutdown(stop);

        while let Some(item) = walk.next().await {
            let raw = match item {
                Ok(raw) => raw,
                Err(error) => {
                    report.failed_cursors += 1;
                    warn!(
                        path = error.path(),
                        cursor = ?error.cursor(),
                        error = %error,
                        "skipping cursor after failed fetch"
                    );
                    continue;
                }
            };
            report.rows_read += 1;

            match normalize(schema, &raw, clock.now_utc()) {
                Ok(Normalized::Record(record)) => {
                    if records.send(record).await.is_err() {
                        debug!("record sink closed");
                        break;
                    }
                    report.records_emitted += 1;
                }
                Ok(Normalized::Skip(skip)) => {
                    report.validation_skips += 1;
                    debug!(table = skip.table, reason = ?skip.reason, "row filtered");
                }
                Err(error) => {
                    report.malformed_rows += 1;
                    warn!(
                        table = error.table,
                        column = error.column,
                        row = %error.row,
                        "skipping malformed row"
                    );
                }
            }
        }

        report.ticks = walk.fetches();
        info!(
            ticks = report.ticks,
            records = report.records_emitted,
            failed_cursors = report.failed_cursors,
            "feed finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::FetchError;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::NaiveDate;

    const HEADER: &str = "distributionTime;tradingDateAndTime;transactionIdentificationCode;instrumentId;instrumentIdentificationCode;priceCurrency;mifidPrice;mifidQuantity";

    /// Serves one trade per minute, keyed by the minute, except for failing paths.
    #[derive(Default)]
    struct Portal {
        failing: Vec<String>,
        seen: Mutex<Vec<String>>,
    }

    impl ArtifactSource for Portal {
        fn fetch<'a>(
            &'a self,
            path: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
            Box::pin(async move {
                self.seen.lock().expect("lock").push(path.to_owned());
                if self.failing.iter().any(|p| p == path) {
                    return Err(FetchError::status(path, 404));
                }
                if !path.contains("XLON-post") {
                    return Ok(String::from("a;b\n"));
                }
                let minute = path
                    .trim_end_matches(".csv")
                    .rsplit('_')
                    .next()
                    .unwrap_or("00");
                Ok(format!(
                    "{HEADER}\n2024-03-05T08:{minute}:00Z;2024-03-05T08:{minute}:00Z;9{minute};1;GB0001;GBX;10.0;5\n\
                     2024-03-05T08:{minute}:00Z;2024-03-05T08:{minute}:00Z;not-a-number;1;GB0001;GBX;10.0;5\n"
                ))
            })
        }
    }

    fn clock() -> Arc<dyn Clock> {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(8, 3, 30))
            .expect("valid time");
        Arc::new(FixedClock::at(now))
    }

    fn extractor(portal: Portal) -> Extractor<Portal> {
        Extractor::new(&ExtractorConfig::new("u", "p"), portal, clock())
            .with_retry(RetryConfig::fixed(Duration::from_millis(1), 3))
    }

    #[tokio::test]
    async fn failing_cursor_is_contained_and_counted() {
        let portal = Portal {
            failing: vec![String::from(
                "download/posttrade/LSE/FCA/XLON-post-2024-03-05T08_01.csv",
            )],
            ..Portal::default()
        };
        let extractor = extractor(portal);

        let mut ids = Vec::new();
        let report = extractor
            .run(&[FeedId::LsePostTrade], |record| {
                ids.push(record.get("transaction_id").cloned());
                ControlFlow::Continue(())
            })
            .await
            .expect("run completes");

        let feed = report.feed(FeedId::LsePostTrade).expect("reported");
        assert_eq!(feed.ticks, 4);
        assert_eq!(feed.failed_cursors, 1);
        assert_eq!(feed.records_emitted, 3);
        assert_eq!(feed.malformed_rows, 3);
        assert_eq!(feed.rows_read, 6);
        assert_eq!(ids.len(), 3);
        assert!(!report.stopped_by_sink);
    }

    #[tokio::test]
    async fn records_of_one_feed_arrive_in_cursor_order() {
        let extractor = extractor(Portal::default());

        let mut ids = Vec::new();
        extractor
            .run(&[FeedId::LsePostTrade], |record| {
                ids.push(record.get("transaction_id").cloned());
                ControlFlow::Continue(())
            })
            .await
            .expect("run completes");

        use crate::schema::Value;
        assert_eq!(
            ids,
            vec![
                Some(Value::UInt(900)),
                Some(Value::UInt(901)),
                Some(Value::UInt(902)),
                Some(Value::UInt(903)),
            ]
        );
    }

    #[tokio::test]
    async fn sink_can_stop_the_run() {
        let extractor = extractor(Portal::default());

        let mut delivered = 0;
        let report = extractor
            .run(&[FeedId::LsePostTrade], |_| {
                delivered += 1;
                ControlFlow::Break(())
            })
            .await
            .expect("run completes");

        assert_eq!(delivered, 1);
        assert!(report.stopped_by_sink);
    }

    #[tokio::test]
    async fn every_requested_feed_is_reported() {
        let extractor = extractor(Portal::default());

        let report = extractor
            .run(&[FeedId::LsePostTrade, FeedId::TurquoiseEuropePreTrade], |_| {
                ControlFlow::Continue(())
            })
            .await
            .expect("run completes");

        assert_eq!(report.feeds.len(), 2);
        let pre_trade = report.feed(FeedId::TurquoiseEuropePreTrade).expect("reported");
        assert_eq!(pre_trade.ticks, 4);
        assert_eq!(pre_trade.records_emitted, 0);
        assert_eq!(extractor.source().seen.lock().expect("lock").len(), 8);
    }

    #[tokio::test]
    async fn shutdown_before_run_fetches_nothing() {
        let (tx, rx) = watch::channel(true);
        let extractor = extractor(Portal::default()).with_shutdown(rx);

        let report = extractor
            .run(&[FeedId::LsePostTrade], |_| ControlFlow::Continue(()))
            .await
            .expect("run completes");

        assert_eq!(report.records_emitted(), 0);
        assert!(extractor.source().seen.lock().expect("lock").is_empty());
        drop(tx);
    }
}
