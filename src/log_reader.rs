use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// Large enough for good sequential throughput without holding much memory
const BUFFER_SIZE: usize = 512 * 1024;

/// Line reader over a plain, gzip or zstd log file, picked by extension.
pub struct LogFileReader {
    inner: Box<dyn BufRead>,
}

impl LogFileReader {
    /// Supports: .csv (or anything else, read as plain text), .gz, .zst
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let reader: Box<dyn BufRead> = match extension {
            "gz" => Box::new(BufReader::with_capacity(BUFFER_SIZE, GzDecoder::new(file))),
            "zst" => {
                let decoder = zstd::Decoder::new(file)
                    .with_context(|| format!("Failed to open zstd stream: {}", path.display()))?;
                Box::new(BufReader::with_capacity(BUFFER_SIZE, decoder))
            }
            _ => Box::new(BufReader::with_capacity(BUFFER_SIZE, file)),
        };

        Ok(LogFileReader { inner: reader })
    }

    /// Read a line, returning bytes consumed (0 at end of file)
    pub fn read_line(&mut self, buf: &mut String) -> Result<usize> {
        self.inner
            .read_line(buf)
            .context("Failed to read line from log file")
    }

    /// Count remaining lines without keeping them
    pub fn count_lines(mut self) -> Result<u64> {
        let mut count = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            if self.read_line(&mut line)? == 0 {
                return Ok(count);
            }
            count += 1;
        }
    }
}
