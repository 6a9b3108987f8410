//! # DMD Core
//!
//! Scheduled extraction of pre- and post-trade transparency files from the
//! LSEG data-download portal.
//!
//! ## Overview
//!
//! - **Session** login with the portal's anti-forgery token handshake
//! - **Path resolution** from a feed and a minute cursor to an artifact path
//! - **Windowed fetch loop** over the trading session, pulled one row at a time
//! - **Declarative schemas** per feed, interpreted by one normalizer
//! - **Runner** for several feeds with bounded concurrency and backpressure
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`clock`] | Local and UTC "now" providers |
//! | [`config`] | Extractor configuration (YAML and environment) |
//! | [`error`] | Error types |
//! | [`feed`] | Feed identifiers and artifact paths |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Row filtering and casting |
//! | [`retry`] | Backoff and the retrying artifact source |
//! | [`runner`] | Multi-feed extraction runs |
//! | [`schema`] | Schema and record types |
//! | [`session`] | Portal login and authenticated downloads |
//! | [`tables`] | Column tables for every feed |
//! | [`walk`] | Minute-by-minute session walk |
//! | [`window`] | Trading-session window |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::ops::ControlFlow;
//! use std::sync::Arc;
//! use dmd_core::{Extractor, ExtractorConfig, FeedId, ReqwestHttpClient, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::default().with_env_overrides();
//!     let http = Arc::new(ReqwestHttpClient::new()?);
//!     let extractor = Extractor::connect(&config, http, Arc::new(SystemClock)).await?;
//!
//!     let report = extractor
//!         .run(&[FeedId::LsePostTrade], |record| {
//!             println!("{}", serde_json::to_string(&record).unwrap_or_default());
//!             ControlFlow::Continue(())
//!         })
//!         .await?;
//!     eprintln!("{} records", report.records_emitted());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Login failures and bad configuration abort a run. A cursor whose artifact
//! cannot be fetched, and a row that cannot be cast, are logged and skipped:
//!
//! ```rust
//! use dmd_core::{FetchError, FetchErrorKind};
//!
//! fn classify(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::Status(404) => "not published yet",
//!         _ if error.retryable() => "transient",
//!         _ => "permanent",
//!     }
//! }
//! # let _ = classify(&FetchError::status("a.csv", 404));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod http_client;
pub mod normalize;
pub mod retry;
pub mod runner;
pub mod schema;
pub mod session;
pub mod tables;
pub mod walk;
pub mod window;

// Time sources
pub use clock::{Clock, FixedClock, SystemClock};

// Configuration
pub use config::ExtractorConfig;

// Error types
pub use error::{
    AuthenticationError, ConfigError, ExtractError, FetchError, FetchErrorKind,
    MalformedRowError, UnknownFeedError,
};

// Feeds and paths
pub use feed::{resolve_path, resolve_path_named, Direction, FeedId};

// HTTP client types
pub use http_client::{
    FixtureHttpClient, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Normalization
pub use normalize::{normalize, Normalized, SkipReason, ValidationSkip};

// Retry logic
pub use retry::{Backoff, RetryConfig, RetryingSource};

// Runs
pub use runner::{Extractor, FeedReport, RunReport};

// Schemas and records
pub use schema::{
    Absent, ColumnSpec, ColumnType, FeedSchema, NormalizedRecord, RowFilter, SchemaDescription,
    TimestampFormat, Value,
};

// Session
pub use session::{Credentials, Session, DEFAULT_BASE_URL};

// Per-feed tables
pub use tables::schema_for;

// Fetch loop
pub use walk::{iterate, ArtifactSource, RawRow, SessionWalk};

// Trading window
pub use window::{SessionHours, TradingWindow};
