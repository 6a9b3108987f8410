//! Declarative per-feed table schemas and normalized record values.
//!
//! A [`FeedSchema`] lists, for each output column, the raw header it is read
//! from, the type it is cast to and what an empty raw value turns into. The
//! same description is what a host uses to create the destination table.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::feed::FeedId;

/// How a timestamp column is written in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// ISO-8601: RFC 3339 with offset, or a naive date-time taken as UTC.
    Iso,
    /// A fixed `chrono` pattern, taken as UTC.
    Pattern(&'static str),
}

/// Fixed pattern used by the market-by-order pre-trade files.
pub const MESSAGE_TIMESTAMP_PATTERN: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Semantic type of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Timestamp(TimestampFormat),
    UInt8,
    UInt64,
    Int32,
    Int64,
    Float64,
    Utf8,
    /// Integer text compared against zero.
    Bool,
}

impl ColumnType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timestamp(_) => "timestamp[us, UTC]",
            Self::UInt8 => "uint8",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Utf8 => "utf8",
            Self::Bool => "bool",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What an empty or missing raw value becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absent {
    /// The row is malformed.
    Required,
    /// The column is null.
    Null,
    /// The column is the type's zero.
    Zero,
}

/// One output column and where it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub source: &'static str,
    pub kind: ColumnType,
    pub absent: Absent,
    pub primary_key: bool,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, source: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            source,
            kind,
            absent: Absent::Required,
            primary_key: false,
        }
    }

    pub const fn null_when_empty(mut self) -> Self {
        self.absent = Absent::Null;
        self
    }

    pub const fn zero_when_empty(mut self) -> Self {
        self.absent = Absent::Zero;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Text columns pass missing values through as null; key columns never do.
    pub const fn nullable(&self) -> bool {
        if self.primary_key {
            return false;
        }
        matches!(self.kind, ColumnType::Utf8) || matches!(self.absent, Absent::Null)
    }
}

/// Row-level checks evaluated on raw values before any cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// The timestamp in `source` must not be later than now (UTC).
    NotInFuture {
        source: &'static str,
        format: TimestampFormat,
    },
    /// `source` must be present and not blank.
    Present { source: &'static str },
    /// The number in `source` must not be negative.
    NonNegative { source: &'static str },
}

/// Destination table description for one feed.
#[derive(Debug, PartialEq)]
pub struct FeedSchema {
    pub feed: FeedId,
    pub table: &'static str,
    pub title: &'static str,
    pub columns: &'static [ColumnSpec],
    pub filters: &'static [RowFilter],
}

impl FeedSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|column| column.primary_key)
    }

    /// Serializable view for hosts and the CLI.
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            feed: self.feed.as_str(),
            table: self.table,
            title: self.title,
            incremental: true,
            columns: self
                .columns
                .iter()
                .map(|column| ColumnDescription {
                    name: column.name,
                    source: column.source,
                    kind: column.kind.name(),
                    nullable: column.nullable(),
                    primary_key: column.primary_key,
                    unique: column.primary_key,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub feed: &'static str,
    pub table: &'static str,
    pub title: &'static str,
    pub incremental: bool,
    pub columns: Vec<ColumnDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: &'static str,
    pub source: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
}

/// A typed cell of a normalized record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Timestamp(DateTime<Utc>),
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Typed, renamed, validated output row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    schema: &'static FeedSchema,
    values: Vec<Value>,
}

impl NormalizedRecord {
    /// `values` is in schema column order.
    pub(crate) fn new(schema: &'static FeedSchema, values: Vec<Value>) -> Self {
        Self { schema, values }
    }

    pub fn schema(&self) -> &'static FeedSchema {
        self.schema
    }

    pub fn table(&self) -> &'static str {
        self.schema.table
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.schema.columns.iter().position(|c| c.name == column)?;
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.schema
            .columns
            .iter()
            .map(|column| column.name)
            .zip(self.values.iter())
    }

    /// Key column values, in schema order, used by hosts to upsert.
    pub fn primary_key(&self) -> Vec<&Value> {
        self.schema
            .columns
            .iter()
            .zip(self.values.iter())
            .filter(|(column, _)| column.primary_key)
            .map(|(_, value)| value)
            .collect()
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
