use crate::engine::Sessionizer;
use crate::log_discovery::{resolve_inputs, LogFile};
use crate::log_reader::LogFileReader;
use crate::models::DurationMode;
use crate::parser::LogParser;
use crate::progress_events::ProgressReporter;
use crate::writer::SessionWriter;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const PROGRESS_INTERVAL: u64 = 10_000;
const LINE_BUFFER_CAPACITY: usize = 1024;
const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Counters for one completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: u64,
    pub sessions: u64,
    pub sweeps: u64,
}

pub struct Processor {
    input: PathBuf,
    output: PathBuf,
    inactivity_secs: u64,
    duration_mode: DurationMode,
    reporter: ProgressReporter,
    total_lines: u64,
    lines_read: u64,
}

impl Processor {
    pub fn new(input: PathBuf, output: PathBuf, inactivity_secs: u64, duration_mode: DurationMode) -> Self {
        Self {
            input,
            output,
            inactivity_secs,
            duration_mode,
            reporter: ProgressReporter::new(false),
            total_lines: 0,
            lines_read: 0,
        }
    }

    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run the whole pipeline. On error the output file keeps whatever was
    /// written before the failure.
    pub fn process(&mut self) -> Result<RunSummary> {
        self.reporter.emit_started();
        let result = self.run();
        match &result {
            Ok(summary) => self.reporter.emit_complete(&format!(
                "{} events, {} sessions",
                summary.events, summary.sessions
            )),
            Err(e) => self.reporter.emit_failed(&format!("{:#}", e)),
        }
        result
    }

    fn run(&mut self) -> Result<RunSummary> {
        let log_files = resolve_inputs(&self.input)?;
        if log_files.is_empty() {
            anyhow::bail!("No log.csv files found in {}", self.input.display());
        }
        for log_file in &log_files {
            let rotation = match log_file.rotation_number {
                Some(n) => format!("rotation {}", n),
                None => "current".to_string(),
            };
            info!(path = %log_file.path.display(), rotation, compressed = log_file.is_compressed, "input file");
        }

        if self.reporter.is_enabled() {
            self.total_lines = count_lines_all_files(&log_files)?;
            info!(total_lines = self.total_lines, "counted input lines");
        }

        let file = File::create(&self.output)
            .with_context(|| format!("Failed to create output file: {}", self.output.display()))?;
        let mut writer = SessionWriter::new(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file));

        let mut engine = Sessionizer::new(self.inactivity_secs, self.duration_mode);
        let mut parser: Option<LogParser> = None;
        let mut events = 0u64;

        for log_file in &log_files {
            debug!(path = %log_file.path.display(), "reading");
            let mut reader = LogFileReader::open(&log_file.path)?;
            let mut line = String::with_capacity(LINE_BUFFER_CAPACITY);
            let mut line_no = 0u64;
            let mut seen_content = false;

            loop {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    break;
                }
                line_no += 1;
                self.lines_read += 1;
                self.maybe_report_progress();

                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.trim().is_empty() {
                    continue;
                }
                let first_in_file = !seen_content;
                seen_content = true;

                let active = match parser.as_ref() {
                    // later rotations repeat the header
                    Some(p) if first_in_file && p.is_header(trimmed) => continue,
                    Some(p) => p,
                    None => {
                        parser = Some(LogParser::from_header(trimmed).with_context(|| {
                            format!("Invalid header in {}", log_file.path.display())
                        })?);
                        continue;
                    }
                };

                events += 1;
                let event = active
                    .parse_line(trimmed, line_no, events)
                    .with_context(|| format!("Failed to parse {}", log_file.path.display()))?;
                trace!(ip = %event.ip, timestamp = %event.timestamp, rank = event.rank, "event");

                let closed = engine.observe(&event)?;
                writer
                    .write_all(&closed)
                    .context("Failed to write sessions")?;
            }
        }

        if parser.is_none() {
            anyhow::bail!("No header line in {}", self.input.display());
        }

        let sweeps = engine.sweeps();
        let remaining = engine.finish();
        debug!(sessions = remaining.len(), "flushing open sessions");
        writer
            .write_all(&remaining)
            .context("Failed to write sessions")?;

        let sessions = writer.written();
        writer
            .finish()
            .with_context(|| format!("Failed to flush output file: {}", self.output.display()))?;

        Ok(RunSummary {
            events,
            sessions,
            sweeps,
        })
    }

    fn maybe_report_progress(&self) {
        if !self.reporter.is_enabled() || self.lines_read % PROGRESS_INTERVAL != 0 {
            return;
        }
        let percent = if self.total_lines > 0 {
            (self.lines_read as f64 / self.total_lines as f64) * 100.0
        } else {
            0.0
        };
        self.reporter.emit_progress(
            percent,
            &format!("Processed {} of {} lines", self.lines_read, self.total_lines),
        );
    }
}

fn count_lines_all_files(log_files: &[LogFile]) -> Result<u64> {
    let mut total = 0u64;
    for log_file in log_files {
        total += LogFileReader::open(&log_file.path)?.count_lines()?;
    }
    Ok(total)
}

/// Convenience wrapper: read the threshold file, then run.
pub fn run_files(
    input: &Path,
    inactivity_file: &Path,
    output: &Path,
    duration_mode: DurationMode,
) -> Result<RunSummary> {
    let inactivity_secs = crate::config::load_inactivity(inactivity_file)?;
    Processor::new(input.to_path_buf(), output.to_path_buf(), inactivity_secs, duration_mode).process()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str, inactivity: u64) -> (Result<RunSummary>, String) {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.csv");
        let out = dir.path().join("sessionization.txt");
        std::fs::write(&log, input).unwrap();

        let result = Processor::new(log, out.clone(), inactivity, DurationMode::SecondField).process();
        let written = std::fs::read_to_string(&out).unwrap_or_default();
        (result, written)
    }

    #[test]
    fn test_process_small_log() {
        let input = "ip,date,time,zone\n\
                     1.1.1.1,2017-06-30,00:00:00,0.0\n\
                     2.2.2.2,2017-06-30,00:00:05,0.0\n\
                     \n\
                     1.1.1.1,2017-06-30,00:00:25,0.0\n";

        let (result, out) = run(input, 15);
        let summary = result.unwrap();

        assert_eq!(summary, RunSummary { events: 3, sessions: 2, sweeps: 1 });
        assert_eq!(
            out,
            "2.2.2.2,2017-06-30 00:00:05,2017-06-30 00:00:05,1,1\n\
             1.1.1.1,2017-06-30 00:00:00,2017-06-30 00:00:25,26,2\n"
        );
    }

    #[test]
    fn test_crlf_input() {
        let (result, out) = run("ip,date,time\r\n1.1.1.1,2017-06-30,00:00:00\r\n", 2);
        assert_eq!(result.unwrap().events, 1);
        assert_eq!(out, "1.1.1.1,2017-06-30 00:00:00,2017-06-30 00:00:00,1,1\n");
    }

    #[test]
    fn test_parse_error_aborts_after_partial_output() {
        let input = "ip,date,time\n\
                     1.1.1.1,2017-06-30,00:00:00\n\
                     2.2.2.2,2017-06-30,00:00:10\n\
                     3.3.3.3,2017-06-30,not-a-time\n";

        let (result, out) = run(input, 2);
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"));
        // the sweep triggered by line 3 was already written
        assert_eq!(out, "1.1.1.1,2017-06-30 00:00:00,2017-06-30 00:00:00,1,1\n");
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let (result, out) = run("", 2);
        assert!(result.is_err());
        assert!(out.is_empty());
    }
}
