use crate::error::{Result, SessionizeError};
use crate::models::{LogEvent, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use regex::Regex;

/// Parser for access-log CSV rows.
/// Header example: ip,date,time,zone,cik,accession,extention,code,size,idx,norefer,noagent,find,crawler,browser
/// Row example:    101.81.133.jja,2017-06-30,00:00:00,0.0,1608552.0,0001047469-17-004337,-index.htm,200.0,80251.0,1.0,0.0,0.0,9.0,0.0,
pub struct LogParser {
    field_regex: Regex,
    ip_col: usize,
    date_col: usize,
    time_col: usize,
}

impl LogParser {
    /// Build a parser from the header line, locating the columns it needs by name.
    pub fn from_header(header: &str) -> Result<Self> {
        // One CSV field per match, always led by a comma: either "quoted, with "" escapes"
        // or a bare run up to the next comma
        let field_regex = Regex::new(r#",(?:"(?P<quoted>(?:[^"]|"")*)"|(?P<bare>[^,]*))"#).unwrap();

        let columns: Vec<String> = split_fields(&field_regex, header)
            .into_iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();

        let find = |name: &'static str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or(SessionizeError::MissingColumn(name))
        };

        Ok(Self {
            ip_col: find("ip")?,
            date_col: find("date")?,
            time_col: find("time")?,
            field_regex,
        })
    }

    /// Whether `line` repeats the header this parser was built from.
    /// Rotated inputs each start with their own header.
    pub fn is_header(&self, line: &str) -> bool {
        let fields = split_fields(&self.field_regex, line);
        fields.get(self.ip_col).map(|f| f.trim().eq_ignore_ascii_case("ip")) == Some(true)
            && fields.get(self.date_col).map(|f| f.trim().eq_ignore_ascii_case("date")) == Some(true)
    }

    /// Parse one data row. `line_no` is only used in error messages.
    pub fn parse_line(&self, line: &str, line_no: u64, rank: u64) -> Result<LogEvent> {
        let fields = split_fields(&self.field_regex, line);

        let field = |col: usize, name: &'static str| {
            fields
                .get(col)
                .map(|f| f.trim())
                .ok_or_else(|| SessionizeError::parse(line_no, format!("missing '{}' field", name)))
        };

        let ip = field(self.ip_col, "ip")?;
        if ip.is_empty() {
            return Err(SessionizeError::parse(line_no, "empty 'ip' field"));
        }

        let date = field(self.date_col, "date")?;
        let time = field(self.time_col, "time")?;
        let timestamp = parse_timestamp(date, time).ok_or_else(|| {
            SessionizeError::parse(line_no, format!("invalid timestamp '{} {}'", date, time))
        })?;

        Ok(LogEvent::new(ip, timestamp, rank))
    }
}

fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIMESTAMP_FORMAT).ok()
}

fn split_fields(field_regex: &Regex, line: &str) -> Vec<String> {
    // lead with a comma so the first field matches like the rest and no match is empty
    let line = format!(",{}", line);
    field_regex
        .captures_iter(&line)
        .map(|caps| match caps.name("quoted") {
            Some(m) => m.as_str().replace("\"\"", "\""),
            None => caps
                .name("bare")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ts;

    const HEADER: &str = "ip,date,time,zone,cik,accession,extention,code,size,idx,norefer,noagent,find,crawler,browser";

    #[test]
    fn test_parse_edgar_row() {
        let parser = LogParser::from_header(HEADER).unwrap();
        let line = "101.81.133.jja,2017-06-30,00:00:00,0.0,1608552.0,0001047469-17-004337,-index.htm,200.0,80251.0,1.0,0.0,0.0,9.0,0.0,";

        let event = parser.parse_line(line, 2, 1).expect("Should parse successfully");

        assert_eq!(event.ip, "101.81.133.jja");
        assert_eq!(event.timestamp, ts("2017-06-30 00:00:00"));
        assert_eq!(event.rank, 1);
    }

    #[test]
    fn test_columns_found_by_name() {
        let parser = LogParser::from_header("time, Date ,extra,IP").unwrap();
        let event = parser.parse_line("23:59:59,2017-07-01,x,10.0.0.9", 2, 7).unwrap();

        assert_eq!(event.ip, "10.0.0.9");
        assert_eq!(event.timestamp, ts("2017-07-01 23:59:59"));
    }

    #[test]
    fn test_quoted_fields() {
        let parser = LogParser::from_header("ip,note,date,time").unwrap();
        let event = parser
            .parse_line(r#""10.0.0.1","a, ""quoted"" note",2017-06-30,00:00:01"#, 2, 1)
            .unwrap();

        assert_eq!(event.ip, "10.0.0.1");
        assert_eq!(event.timestamp, ts("2017-06-30 00:00:01"));
    }

    #[test]
    fn test_missing_column_in_header() {
        let err = LogParser::from_header("ip,date,zone").err().unwrap();
        assert!(matches!(err, SessionizeError::MissingColumn("time")));
    }

    #[test]
    fn test_bad_rows_are_errors() {
        let parser = LogParser::from_header(HEADER).unwrap();

        let short = parser.parse_line("10.0.0.1,2017-06-30", 5, 1).unwrap_err();
        assert!(matches!(short, SessionizeError::Parse { line: 5, .. }));

        let no_ip = parser.parse_line(",2017-06-30,00:00:00", 6, 1).unwrap_err();
        assert!(no_ip.to_string().contains("empty 'ip'"));

        let bad_time = parser.parse_line("10.0.0.1,2017-06-30,25:00:00", 7, 1).unwrap_err();
        assert!(bad_time.to_string().contains("invalid timestamp"));

        let fractional = parser.parse_line("10.0.0.1,2017-06-30,00:00:00.5", 8, 1);
        assert!(fractional.is_err());
    }

    #[test]
    fn test_split_keeps_empty_fields() {
        let parser = LogParser::from_header("zone,ip,date,time").unwrap();
        let event = parser.parse_line(",10.0.0.2,2017-06-30,00:00:03", 2, 1).unwrap();
        assert_eq!(event.ip, "10.0.0.2");

        let fields = split_fields(&parser.field_regex, "a,,b,");
        assert_eq!(fields, vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_is_header() {
        let parser = LogParser::from_header(HEADER).unwrap();
        assert!(parser.is_header(HEADER));
        assert!(!parser.is_header("10.0.0.1,2017-06-30,00:00:00"));
    }
}
