use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Default input name inside an input directory.
pub const DEFAULT_BASE_NAME: &str = "log.csv";

/// A discovered input file with what is needed to order it
#[derive(Debug, Clone)]
pub struct LogFile {
    pub path: PathBuf,
    pub rotation_number: Option<u32>,
    pub is_compressed: bool,
}

impl LogFile {
    /// Examples:
    ///   - log.csv        -> rotation_number = None (current file)
    ///   - log.csv.1      -> rotation_number = Some(1)
    ///   - log.csv.2.gz   -> rotation_number = Some(2), is_compressed = true
    ///   - log.csv.10.zst -> rotation_number = Some(10), is_compressed = true
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        let is_compressed = is_compressed_name(file_name);
        let rotation_number = strip_compression(file_name)
            .rsplit_once('.')
            .and_then(|(_, n)| n.parse::<u32>().ok());

        LogFile {
            path: path.to_path_buf(),
            rotation_number,
            is_compressed,
        }
    }
}

impl PartialEq for LogFile {
    fn eq(&self, other: &Self) -> bool {
        self.rotation_number == other.rotation_number
    }
}

impl Eq for LogFile {}

impl PartialOrd for LogFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogFile {
    /// Oldest first: higher rotation numbers are older, the current file is newest
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.rotation_number, other.rotation_number) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => b.cmp(&a),
        }
    }
}

fn is_compressed_name(file_name: &str) -> bool {
    file_name.ends_with(".gz") || file_name.ends_with(".zst")
}

fn strip_compression(file_name: &str) -> &str {
    if is_compressed_name(file_name) {
        file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
    } else {
        file_name
    }
}

/// Find `base_name` and its numbered rotations in `log_dir`, oldest first.
/// Backup or temp siblings (`log.csv.bak`, `log.csv.old`, ...) are ignored.
pub fn discover_log_files<P: AsRef<Path>>(log_dir: P, base_name: &str) -> Result<Vec<LogFile>> {
    let log_dir = log_dir.as_ref();

    let entries = std::fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read input directory: {}", log_dir.display()))?;

    let mut log_files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let Some(suffix) = strip_compression(file_name).strip_prefix(base_name) else {
            continue;
        };

        let accepted = match suffix.strip_prefix('.') {
            None => suffix.is_empty(),
            Some(number) => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        };
        if accepted {
            log_files.push(LogFile::from_path(path));
        }
    }

    log_files.sort();
    Ok(log_files)
}

/// Expand an input path: a file is used as is, a directory is searched for
/// rotated `log.csv` files.
pub fn resolve_inputs(input: &Path) -> Result<Vec<LogFile>> {
    if input.is_dir() {
        discover_log_files(input, DEFAULT_BASE_NAME)
    } else {
        Ok(vec![LogFile::from_path(input)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let current = LogFile::from_path("/in/log.csv");
        assert_eq!(current.rotation_number, None);
        assert!(!current.is_compressed);

        let rotated = LogFile::from_path("/in/log.csv.10.zst");
        assert_eq!(rotated.rotation_number, Some(10));
        assert!(rotated.is_compressed);
    }

    #[test]
    fn test_discover_orders_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "log.csv",
            "log.csv.1",
            "log.csv.3.gz",
            "log.csv.2.zst",
            "log.csv.bak",
            "log.csv.old",
            "log.csvx",
            "other.csv",
        ] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let names: Vec<String> = discover_log_files(dir.path(), DEFAULT_BASE_NAME)
            .unwrap()
            .into_iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["log.csv.3.gz", "log.csv.2.zst", "log.csv.1", "log.csv"]);
    }

    #[test]
    fn test_resolve_plain_file() {
        let files = resolve_inputs(Path::new("/somewhere/events.csv")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rotation_number, None);
    }
}
