use crate::models::Session;
use std::io::{self, Write};

/// Writes closed sessions as `ip,first_dt,last_dt,duration,count` rows, in
/// the order they are handed over. No header row.
pub struct SessionWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> SessionWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write_session(&mut self, session: &Session) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{}",
            escape_field(&session.ip),
            session.first_seen_str(),
            session.last_seen_str(),
            session.duration,
            session.event_count
        )?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, sessions: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a Session>,
    {
        for session in sessions {
            self.write_session(session)?;
        }
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
