use std::io::Write;

use dmd_core::{schema_for, FeedId};

use crate::cli::SchemaArgs;
use crate::error::CliError;

use super::write_line;

pub fn run<W: Write>(args: &SchemaArgs, pretty: bool, out: &mut W) -> Result<(), CliError> {
    let feed: FeedId = args.feed.parse()?;
    let description = schema_for(feed).describe();

    if pretty {
        serde_json::to_writer_pretty(&mut *out, &description)?;
        out.write_all(b"\n")?;
        Ok(())
    } else {
        write_line(out, &description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(feed: &str) -> Result<serde_json::Value, CliError> {
        let mut out = Vec::new();
        run(
            &SchemaArgs {
                feed: feed.to_owned(),
            },
            false,
            &mut out,
        )?;
        Ok(serde_json::from_slice(&out).expect("json"))
    }

    #[test]
    fn renders_columns_with_key_and_nullability() {
        let schema = render("LSE-Post-Trade").expect("known feed");

        assert_eq!(schema["table"], "xlon_post_delayed");
        let key = schema["columns"]
            .as_array()
            .expect("columns")
            .iter()
            .find(|column| column["primary_key"] == true)
            .expect("key column");
        assert_eq!(key["name"], "transaction_id");
        assert_eq!(key["type"], "uint64");
        assert_eq!(key["nullable"], false);
    }

    #[test]
    fn unknown_feed_is_rejected() {
        let error = render("XPAR-Post-Trade").expect_err("unknown");
        assert_eq!(error.exit_code(), 2);
    }
}
