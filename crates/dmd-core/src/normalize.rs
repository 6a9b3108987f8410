//! Generic row normalizer driven by a [`FeedSchema`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::MalformedRowError;
use crate::schema::{
    Absent, ColumnSpec, ColumnType, FeedSchema, NormalizedRecord, RowFilter, TimestampFormat,
    Value,
};
use crate::walk::RawRow;

/// Why a well-formed row was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    FutureTimestamp { source: &'static str },
    MissingField { source: &'static str },
    NegativeValue { source: &'static str },
}

/// A row excluded by a feed's validation filter. Counted, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSkip {
    pub table: &'static str,
    pub reason: SkipReason,
}

/// Outcome of normalizing one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(NormalizedRecord),
    Skip(ValidationSkip),
}

impl Normalized {
    pub fn into_record(self) -> Option<NormalizedRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Skip(_) => None,
        }
    }
}

/// Applies the schema's filters, then casts every column.
pub fn normalize(
    schema: &'static FeedSchema,
    raw: &RawRow,
    now: DateTime<Utc>,
) -> Result<Normalized, MalformedRowError> {
    if let Some(reason) = schema
        .filters
        .iter()
        .find_map(|filter| rejected_by(filter, raw, now))
    {
        return Ok(Normalized::Skip(ValidationSkip {
            table: schema.table,
            reason,
        }));
    }

    let values = schema
        .columns
        .iter()
        .map(|column| cast_column(schema, column, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Normalized::Record(NormalizedRecord::new(schema, values)))
}

fn rejected_by(filter: &RowFilter, raw: &RawRow, now: DateTime<Utc>) -> Option<SkipReason> {
    match *filter {
        RowFilter::Present { source } => {
            let blank = raw.get(source).map_or(true, |value| value.trim().is_empty());
            blank.then_some(SkipReason::MissingField { source })
        }
        RowFilter::NonNegative { source } => {
            // Unparseable values are left for the cast to report.
            let value = raw.get(source)?.trim().parse::<f64>().ok()?;
            (value < 0.0).then_some(SkipReason::NegativeValue { source })
        }
        RowFilter::NotInFuture { source, format } => {
            let timestamp = parse_timestamp(raw.get(source)?.trim(), format)?;
            (timestamp > now).then_some(SkipReason::FutureTimestamp { source })
        }
    }
}

fn cast_column(
    schema: &FeedSchema,
    column: &ColumnSpec,
    raw: &RawRow,
) -> Result<Value, MalformedRowError> {
    let text = raw.get(column.source);

    if column.kind == ColumnType::Utf8 {
        return Ok(text.map_or(Value::Null, |value| Value::Text(value.to_owned())));
    }

    let trimmed = text.map(str::trim).filter(|value| !value.is_empty());
    let Some(value) = trimmed else {
        return match column.absent {
            Absent::Null => Ok(Value::Null),
            Absent::Zero => Ok(zero_of(column.kind)),
            Absent::Required => Err(malformed(schema, column, raw)),
        };
    };

    cast(value, column.kind).ok_or_else(|| malformed(schema, column, raw))
}

fn cast(value: &str, kind: ColumnType) -> Option<Value> {
    match kind {
        ColumnType::Timestamp(format) => parse_timestamp(value, format).map(Value::Timestamp),
        ColumnType::UInt8 => value.parse::<u8>().ok().map(|v| Value::UInt(u64::from(v))),
        ColumnType::UInt64 => value.parse::<u64>().ok().map(Value::UInt),
        ColumnType::Int32 => value.parse::<i32>().ok().map(|v| Value::Int(i64::from(v))),
        ColumnType::Int64 => value.parse::<i64>().ok().map(Value::Int),
        ColumnType::Float64 => value.parse::<f64>().ok().map(Value::Float),
        ColumnType::Bool => value.parse::<i64>().ok().map(|v| Value::Bool(v != 0)),
        ColumnType::Utf8 => Some(Value::Text(value.to_owned())),
    }
}

fn zero_of(kind: ColumnType) -> Value {
    match kind {
        ColumnType::UInt8 | ColumnType::UInt64 => Value::UInt(0),
        ColumnType::Int32 | ColumnType::Int64 => Value::Int(0),
        ColumnType::Float64 => Value::Float(0.0),
        ColumnType::Bool => Value::Bool(false),
        ColumnType::Utf8 => Value::Text(String::new()),
        ColumnType::Timestamp(_) => Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
    }
}

fn malformed(schema: &FeedSchema, column: &ColumnSpec, raw: &RawRow) -> MalformedRowError {
    MalformedRowError {
        table: schema.table,
        column: column.name,
        raw: raw.get(column.source).map(str::to_owned),
        expected: column.kind.name(),
        row: raw.to_string(),
    }
}

const NAIVE_ISO_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses `value` as UTC; naive inputs are taken to already be UTC.
pub fn parse_timestamp(value: &str, format: TimestampFormat) -> Option<DateTime<Utc>> {
    match format {
        TimestampFormat::Pattern(pattern) => NaiveDateTime::parse_from_str(value, pattern)
            .ok()
            .map(|naive| naive.and_utc()),
        TimestampFormat::Iso => DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z")
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .ok()
            })
            .or_else(|| {
                NAIVE_ISO_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }),
    }
}
