use std::io::Write;

use dmd_core::{Direction, FeedId};
use serde::Serialize;

use crate::error::CliError;

use super::write_line;

#[derive(Debug, Serialize)]
struct FeedEntry {
    feed: &'static str,
    table: &'static str,
    direction: Direction,
    venue: &'static str,
    regulator: &'static str,
    prefix: &'static str,
}

pub fn run<W: Write>(out: &mut W) -> Result<(), CliError> {
    for feed in FeedId::ALL {
        write_line(
            out,
            &FeedEntry {
                feed: feed.as_str(),
                table: feed.table_name(),
                direction: feed.direction(),
                venue: feed.venue(),
                regulator: feed.regulator(),
                prefix: feed.file_prefix(),
            },
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_one_line_per_feed() {
        let mut out = Vec::new();
        run(&mut out).expect("writes");

        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), FeedId::ALL.len());

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["feed"], "Turquoise-UK-Pre-Trade");
        assert_eq!(first["direction"], "pre_trade");
        assert_eq!(first["prefix"], "TRQX");
    }
}
