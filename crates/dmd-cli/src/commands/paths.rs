use std::io::Write;

use chrono::Local;
use dmd_core::{resolve_path, ExtractorConfig, FeedId};
use tracing::info;

use crate::cli::PathsArgs;
use crate::error::CliError;

pub fn run<W: Write>(args: &PathsArgs, config: &ExtractorConfig, out: &mut W) -> Result<(), CliError> {
    let feed: FeedId = args.feed.parse()?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let Some(window) = config.session_hours().window_for(date) else {
        info!(%date, "no trading session on a weekend");
        return Ok(());
    };

    for cursor in window.cursors() {
        writeln!(out, "{}", resolve_path(feed, cursor))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn paths(feed: &str, date: NaiveDate) -> Vec<String> {
        let mut out = Vec::new();
        run(
            &PathsArgs {
                feed: feed.to_owned(),
                date: Some(date),
            },
            &ExtractorConfig::default(),
            &mut out,
        )
        .expect("known feed");
        String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn weekday_lists_the_whole_session() {
        let lines = paths("TRADEcho-NL-Post-Trade", NaiveDate::from_ymd_opt(2024, 3, 5).expect("date"));

        assert_eq!(lines.len(), 511);
        assert_eq!(
            lines[0],
            "download/posttrade/TEC/AFM/ECEU-post-2024-03-05T08_00.csv"
        );
        assert_eq!(
            lines[510],
            "download/posttrade/TEC/AFM/ECEU-post-2024-03-05T16_30.csv"
        );
    }

    #[test]
    fn weekend_lists_nothing() {
        assert!(paths("LSE-Pre-Trade", NaiveDate::from_ymd_opt(2024, 3, 9).expect("date")).is_empty());
    }
}
