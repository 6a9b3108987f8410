//! Feed identifiers and the remote path convention.
//!
//! Every artifact lives at
//! `download/{pretrade|posttrade}/{VENUE}/{REGULATOR}/{PREFIX}-{pre|post}-{yyyy}-{MM}-{dd}T{HH}_{mm}.csv`
//! relative to the portal root.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::UnknownFeedError;

/// Pre- or post-trade transparency segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    PreTrade,
    PostTrade,
}

impl Direction {
    const fn folder(self) -> &'static str {
        match self {
            Self::PreTrade => "pretrade",
            Self::PostTrade => "posttrade",
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::PreTrade => "pre",
            Self::PostTrade => "post",
        }
    }
}

/// Venue/direction/regulator combinations published on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedId {
    TurquoiseUkPreTrade,
    TurquoiseUkPostTrade,
    TurquoiseEuropePreTrade,
    TurquoiseEuropePostTrade,
    LsePreTrade,
    LsePostTrade,
    TradechoUkPostTrade,
    TradechoNlPostTrade,
}

impl FeedId {
    pub const ALL: [Self; 8] = [
        Self::TurquoiseUkPreTrade,
        Self::TurquoiseUkPostTrade,
        Self::TurquoiseEuropePreTrade,
        Self::TurquoiseEuropePostTrade,
        Self::LsePreTrade,
        Self::LsePostTrade,
        Self::TradechoUkPostTrade,
        Self::TradechoNlPostTrade,
    ];

    /// Portal-facing feed name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TurquoiseUkPreTrade => "Turquoise-UK-Pre-Trade",
            Self::TurquoiseUkPostTrade => "Turquoise-UK-Post-Trade",
            Self::TurquoiseEuropePreTrade => "Turquoise-Europe-Pre-Trade",
            Self::TurquoiseEuropePostTrade => "Turquoise-Europe-Post-Trade",
            Self::LsePreTrade => "LSE-Pre-Trade",
            Self::LsePostTrade => "LSE-Post-Trade",
            Self::TradechoUkPostTrade => "TRADEcho-UK-Post-Trade",
            Self::TradechoNlPostTrade => "TRADEcho-NL-Post-Trade",
        }
    }

    /// Destination table name for the feed's normalized records.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::TurquoiseUkPreTrade => "trqx_pre_trade",
            Self::TurquoiseUkPostTrade => "trqx_post_trade",
            Self::TurquoiseEuropePreTrade => "tqex_pre_trade",
            Self::TurquoiseEuropePostTrade => "tqex_post_trade",
            Self::LsePreTrade => "xlon_pre_trade",
            Self::LsePostTrade => "xlon_post_delayed",
            Self::TradechoUkPostTrade => "echo_post_trade",
            Self::TradechoNlPostTrade => "eceu_post_trade",
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::TurquoiseUkPreTrade | Self::TurquoiseEuropePreTrade | Self::LsePreTrade => {
                Direction::PreTrade
            }
            Self::TurquoiseUkPostTrade
            | Self::TurquoiseEuropePostTrade
            | Self::LsePostTrade
            | Self::TradechoUkPostTrade
            | Self::TradechoNlPostTrade => Direction::PostTrade,
        }
    }

    /// Market operator folder on the portal.
    pub const fn venue(self) -> &'static str {
        match self {
            Self::TurquoiseUkPreTrade
            | Self::TurquoiseUkPostTrade
            | Self::TurquoiseEuropePreTrade
            | Self::TurquoiseEuropePostTrade => "TQE",
            Self::LsePreTrade | Self::LsePostTrade => "LSE",
            Self::TradechoUkPostTrade | Self::TradechoNlPostTrade => "TEC",
        }
    }

    pub const fn regulator(self) -> &'static str {
        match self {
            Self::TurquoiseEuropePreTrade
            | Self::TurquoiseEuropePostTrade
            | Self::TradechoNlPostTrade => "AFM",
            Self::TurquoiseUkPreTrade
            | Self::TurquoiseUkPostTrade
            | Self::LsePreTrade
            | Self::LsePostTrade
            | Self::TradechoUkPostTrade => "FCA",
        }
    }

    /// MIC-style file name prefix.
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Self::TurquoiseUkPreTrade | Self::TurquoiseUkPostTrade => "TRQX",
            Self::TurquoiseEuropePreTrade | Self::TurquoiseEuropePostTrade => "TQEX",
            Self::LsePreTrade | Self::LsePostTrade => "XLON",
            Self::TradechoUkPostTrade => "ECHO",
            Self::TradechoNlPostTrade => "ECEU",
        }
    }
}

impl Display for FeedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table names used by earlier loaders for the same feeds.
const TABLE_ALIASES: [(&str, FeedId); 1] = [("xlon_pre_delayed", FeedId::LsePreTrade)];

impl FromStr for FeedId {
    type Err = UnknownFeedError;

    /// Accepts portal names (case-insensitive, including the older
    /// `Turqouise` spelling), table names and legacy table aliases.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace("turqouise", "turquoise");
        if let Some((_, feed)) = TABLE_ALIASES.iter().find(|(alias, _)| *alias == normalized) {
            return Ok(*feed);
        }
        Self::ALL
            .into_iter()
            .find(|feed| {
                feed.as_str().eq_ignore_ascii_case(&normalized) || feed.table_name() == normalized
            })
            .ok_or_else(|| UnknownFeedError::new(value.trim()))
    }
}

/// Relative artifact path for one cursor tick of a feed.
pub fn resolve_path(feed: FeedId, cursor: NaiveDateTime) -> String {
    let direction = feed.direction();
    format!(
        "download/{folder}/{venue}/{regulator}/{prefix}-{suffix}-{year}-{month:02}-{day:02}T{hour:02}_{minute:02}.csv",
        folder = direction.folder(),
        venue = feed.venue(),
        regulator = feed.regulator(),
        prefix = feed.file_prefix(),
        suffix = direction.suffix(),
        year = cursor.year(),
        month = cursor.month(),
        day = cursor.day(),
        hour = cursor.hour(),
        minute = cursor.minute(),
    )
}

/// Resolves a path from a free-form feed name, refusing names outside the catalogue.
pub fn resolve_path_named(feed: &str, cursor: NaiveDateTime) -> Result<String, UnknownFeedError> {
    Ok(resolve_path(feed.parse()?, cursor))
}
