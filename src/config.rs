use crate::error::{Result, SessionizeError};
use crate::models::DurationMode;
use std::path::{Path, PathBuf};

/// Environment variable holding a log filter directive (e.g. `sessionizer=debug`)
pub const LOG_ENV: &str = "SESSIONIZER_LOG";

/// Access log sessionizer - groups each client's requests into sessions
#[derive(clap::Parser, Debug)]
#[command(name = "sessionizer", version)]
#[command(about = "Groups a time-ordered access log into per-client sessions")]
pub struct Args {
    /// Input CSV (plain, .gz or .zst), or a directory holding log.csv and its rotations
    pub input: PathBuf,

    /// File containing the inactivity period in seconds
    pub inactivity_file: PathBuf,

    /// Where to write one line per closed session
    pub output: PathBuf,

    /// How session duration is computed: second-field or elapsed
    #[arg(long, default_value_t = DurationMode::SecondField)]
    pub duration: DurationMode,

    /// Emit JSON progress events to stdout
    #[arg(short, long)]
    pub progress: bool,

    /// Log level when SESSIONIZER_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Parse the inactivity period. Fractional seconds are truncated toward zero.
pub fn parse_inactivity(text: &str) -> std::result::Result<u64, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("file is empty".to_string());
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| format!("'{}' is not a number", trimmed))?;

    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", trimmed));
    }
    if value < 0.0 {
        return Err(format!("'{}' is negative", trimmed));
    }

    // saturating float-to-int cast
    Ok(value.trunc() as u64)
}

pub fn load_inactivity(path: &Path) -> Result<u64> {
    let text = std::fs::read_to_string(path).map_err(|e| SessionizeError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parse_inactivity(&text).map_err(|reason| SessionizeError::Config {
        path: path.to_path_buf(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_inactivity() {
        assert_eq!(parse_inactivity("2\n"), Ok(2));
        assert_eq!(parse_inactivity(" 15.9 "), Ok(15));
        assert_eq!(parse_inactivity("0"), Ok(0));
        assert_eq!(parse_inactivity("1e2"), Ok(100));
        assert!(parse_inactivity("").is_err());
        assert!(parse_inactivity("abc").is_err());
        assert!(parse_inactivity("-1").is_err());
        assert!(parse_inactivity("inf").is_err());
        assert!(parse_inactivity("NaN").is_err());
    }

    #[test]
    fn test_load_inactivity_missing_file() {
        let err = load_inactivity(Path::new("/nonexistent/inactivity_period.txt")).unwrap_err();
        assert!(matches!(err, SessionizeError::Config { .. }));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["sessionizer", "in", "period.txt", "out.txt"]);
        assert_eq!(args.duration, DurationMode::SecondField);
        assert!(!args.progress);
        assert_eq!(args.log_level, "info");

        let args = Args::parse_from(["sessionizer", "in", "p", "o", "--duration", "elapsed", "-p"]);
        assert_eq!(args.duration, DurationMode::Elapsed);
        assert!(args.progress);
    }
}
