//! Windowed fetch loop.
//!
//! A [`SessionWalk`] visits one cursor per minute from the session open,
//! fetches the artifact for that minute and hands out its rows one by one.
//! Nothing is fetched until [`SessionWalk::next`] is awaited, and at most one
//! artifact body is held at a time. Dropping the walk stops the fetches.
//!
//! Failed fetches are reported for their cursor and the walk moves on to the
//! next minute; retrying is left to the [`ArtifactSource`] the walk is given.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use csv::StringRecord;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::error::{FetchError, FetchErrorKind};
use crate::feed::{resolve_path, FeedId};
use crate::window::{SessionHours, CURSOR_STEP_MINUTES};

/// Field delimiter of every portal artifact.
pub const FIELD_DELIMITER: u8 = b';';

/// Fetches one artifact body by its portal-relative path.
pub trait ArtifactSource: Send + Sync {
    fn fetch<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;
}

impl<S: ArtifactSource + ?Sized> ArtifactSource for Arc<S> {
    fn fetch<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        (**self).fetch(path)
    }
}

/// One delimited line keyed by the artifact's header row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    headers: Arc<StringRecord>,
    values: StringRecord,
}

impl RawRow {
    pub fn new(headers: Arc<StringRecord>, values: StringRecord) -> Self {
        Self { headers, values }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let headers: StringRecord = pairs.iter().map(|(name, _)| *name).collect();
        let values: StringRecord = pairs.iter().map(|(_, value)| *value).collect();
        Self::new(Arc::new(headers), values)
    }

    /// Value of `column`, or `None` when the header is unknown or the line
    /// was too short to reach it.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|name| name == column)?;
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Display for RawRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, (name, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

struct OpenArtifact {
    cursor: NaiveDateTime,
    path: String,
    headers: Arc<StringRecord>,
    reader: csv::Reader<Cursor<Vec<u8>>>,
}

impl OpenArtifact {
    fn open(cursor: NaiveDateTime, path: String, body: String) -> Result<Self, FetchError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(Cursor::new(body.into_bytes()));
        let headers = reader
            .headers()
            .map_err(|e| FetchError::decode(&path, e.to_string()).at_cursor(cursor))?
            .clone();

        Ok(Self {
            cursor,
            path,
            headers: Arc::new(headers),
            reader,
        })
    }

    fn next_row(&mut self) -> Result<Option<RawRow>, FetchError> {
        let mut values = StringRecord::new();
        match self.reader.read_record(&mut values) {
            Ok(true) => Ok(Some(RawRow::new(Arc::clone(&self.headers), values))),
            Ok(false) => Ok(None),
            Err(e) => Err(FetchError::decode(&self.path, e.to_string()).at_cursor(self.cursor)),
        }
    }
}

/// Lazy, finite, non-restartable sequence of raw rows for one feed and one
/// trading day.
pub struct SessionWalk<S> {
    source: S,
    feed: FeedId,
    clock: Arc<dyn Clock>,
    cursor: Option<NaiveDateTime>,
    close: NaiveDateTime,
    artifact: Option<OpenArtifact>,
    shutdown: Option<watch::Receiver<bool>>,
    fetches: usize,
}

impl<S: ArtifactSource> SessionWalk<S> {
    /// Prepares the walk over today's window as seen by `clock`. Weekends
    /// produce a walk that is already finished.
    pub fn new(source: S, feed: FeedId, hours: SessionHours, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now_local().date();
        let window = hours.window_for(today);
        if window.is_none() {
            debug!(feed = %feed, date = %today, "no trading session on a weekend");
        }

        Self {
            source,
            feed,
            clock,
            cursor: window.map(|w| w.open),
            close: window.map_or(NaiveDateTime::MIN, |w| w.close),
            artifact: None,
            shutdown: None,
            fetches: 0,
        }
    }

    /// Stops the walk, including an in-flight request, once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub const fn feed(&self) -> FeedId {
        self.feed
    }

    /// Cursor of the next artifact to be fetched or currently being read.
    pub const fn cursor(&self) -> Option<NaiveDateTime> {
        self.cursor
    }

    /// Number of artifact fetches attempted so far.
    pub const fn fetches(&self) -> usize {
        self.fetches
    }

    pub const fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    /// Next row in (cursor, line) order, an error for a cursor whose artifact
    /// could not be read, or `None` once the session is exhausted.
    pub async fn next(&mut self) -> Option<Result<RawRow, FetchError>> {
        loop {
            if let Some(artifact) = self.artifact.as_mut() {
                match artifact.next_row() {
                    Ok(Some(row)) => return Some(Ok(row)),
                    Ok(None) => {
                        self.artifact = None;
                        self.advance();
                        continue;
                    }
                    Err(error) => {
                        self.artifact = None;
                        self.advance();
                        return Some(Err(error));
                    }
                }
            }

            let cursor = self.cursor?;
            if cursor >= self.clock.now_local() || cursor > self.close {
                debug!(feed = %self.feed, fetches = self.fetches, "session walk complete");
                self.cursor = None;
                return None;
            }

            // One scheduling point per tick, so a stop raised by a consumer on
            // the same runtime is seen before the next download.
            tokio::task::yield_now().await;
            if self.shutdown_requested() {
                debug!(feed = %self.feed, %cursor, "session walk cancelled");
                self.cursor = None;
                return None;
            }

            let path = resolve_path(self.feed, cursor);
            self.fetches += 1;
            trace!(feed = %self.feed, %path, "fetching artifact");

            match self.fetch(&path).await {
                Ok(body) => match OpenArtifact::open(cursor, path, body) {
                    Ok(artifact) => self.artifact = Some(artifact),
                    Err(error) => {
                        self.advance();
                        return Some(Err(error));
                    }
                },
                Err(error) if error.kind() == FetchErrorKind::Cancelled => {
                    debug!(feed = %self.feed, %cursor, "in-flight fetch cancelled");
                    self.cursor = None;
                    return None;
                }
                Err(error) => {
                    self.advance();
                    return Some(Err(error.at_cursor(cursor)));
                }
            }
        }
    }

    async fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        match self.shutdown.as_mut() {
            Some(shutdown) => {
                tokio::select! {
                    result = self.source.fetch(path) => result,
                    _ = wait_for_shutdown(shutdown) => Err(FetchError::cancelled(path)),
                }
            }
            None => self.source.fetch(path).await,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn advance(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            *cursor += Duration::minutes(CURSOR_STEP_MINUTES);
        }
    }
}

/// Builds the walk of `feed` over today's session on `source`.
pub fn iterate<S: ArtifactSource>(
    source: S,
    feed: FeedId,
    hours: SessionHours,
    clock: Arc<dyn Clock>,
) -> SessionWalk<S> {
    SessionWalk::new(source, feed, hours, clock)
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
