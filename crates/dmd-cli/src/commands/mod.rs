mod extract;
mod feeds;
mod paths;
mod schema;

use std::io::Write;

use dmd_core::ExtractorConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<(), CliError> {
    match &cli.command {
        Command::Feeds => feeds::run(out),
        Command::Schema(args) => schema::run(args, cli.pretty, out),
        Command::Paths(args) => paths::run(args, &load_config(cli)?, out),
        Command::Extract(args) => extract::run(args, &load_config(cli)?, out).await,
    }
}

/// File values (or defaults), then environment overrides. Not validated here.
fn load_config(cli: &Cli) -> Result<ExtractorConfig, CliError> {
    let config = match &cli.config {
        Some(path) => ExtractorConfig::from_yaml_file(path)?,
        None => ExtractorConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Writes `value` as one JSON line.
fn write_line<W: Write, T: serde::Serialize>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn cli(config: Option<std::path::PathBuf>) -> Cli {
        Cli {
            config,
            pretty: false,
            command: Command::Feeds,
        }
    }

    #[test]
    fn reads_settings_from_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "concurrency: 3\nqueue_size: 64\nsession_close: \"12:00\"")
            .expect("write config");

        let config = load_config(&cli(Some(file.path().to_path_buf()))).expect("valid config");

        assert_eq!(config.concurrency, 3);
        assert_eq!(config.queue_size, 64);
        assert_eq!(config.session_hours().close.to_string(), "12:00:00");
    }

    #[test]
    fn unreadable_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_config(&cli(Some(dir.path().join("missing.yaml"))))
            .expect_err("missing file");

        assert_eq!(error.exit_code(), 3);
    }
}
