//! Trade record loading from CSV.
//!
//! The input needs a header row with `sequence`, `time`, `price` and `volume`
//! columns. Extra columns are ignored. Any malformed row aborts the load.

use chrono::{DateTime, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tickseq_core::{Error, Result, TimestampMs, Trade};
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 4] = ["sequence", "time", "price", "volume"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Column positions of the required fields.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    sequence: usize,
    time: usize,
    price: usize,
    volume: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::parse(format!(
                "missing required column(s): {} (found: {})",
                missing.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        // All four were found above
        Ok(Self {
            sequence: find("sequence").unwrap_or_default(),
            time: find("time").unwrap_or_default(),
            price: find("price").unwrap_or_default(),
            volume: find("volume").unwrap_or_default(),
        })
    }
}

/// Parse a timestamp string into epoch milliseconds.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.fff]` (UTC, space or `T`
/// separator) and plain integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Result<TimestampMs> {
    let raw = raw.trim();

    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    Err(Error::parse(format!("unrecognised timestamp '{raw}'")))
}

fn field<'r>(record: &'r StringRecord, idx: usize, column: &str, line: u64) -> Result<&'r str> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::parse(format!("line {line}: empty '{column}' field"))),
    }
}

fn parse_f64(record: &StringRecord, idx: usize, column: &str, line: u64) -> Result<f64> {
    let raw = field(record, idx, column, line)?;
    raw.parse::<f64>()
        .map_err(|e| Error::parse(format!("line {line}: invalid '{column}' value '{raw}': {e}")))
}

/// Read trades from any CSV source.
pub fn read_trades<R: Read>(source: R) -> Result<Vec<Trade>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| Error::parse(format!("failed to read header: {e}")))?
        .clone();

    // A completely empty file carries no trades
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut trades = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record.map_err(|e| Error::parse(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let sequence_raw = field(&record, columns.sequence, "sequence", line)?;
        let sequence_id = sequence_raw.parse::<i64>().map_err(|e| {
            Error::parse(format!("line {line}: invalid 'sequence' value '{sequence_raw}': {e}"))
        })?;
        if !seen.insert(sequence_id) {
            return Err(Error::parse(format!(
                "line {line}: duplicate sequence id {sequence_id}"
            )));
        }

        let ts_ms = parse_timestamp(field(&record, columns.time, "time", line)?)
            .map_err(|e| Error::parse(format!("line {line}: {e}")))?;

        trades.push(Trade {
            sequence_id,
            ts_ms,
            price: parse_f64(&record, columns.price, "price", line)?,
            volume: parse_f64(&record, columns.volume, "volume", line)?,
        });
    }

    debug!(trades = trades.len(), "read trade records");
    Ok(trades)
}

/// Read trades from a CSV file.
pub fn read_trades_from_path(path: impl AsRef<Path>) -> Result<Vec<Trade>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_trades(file).map_err(|e| match e {
        Error::Parse(msg) => Error::parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_basic() {
        let csv = "sequence,time,price,volume\n\
                   1,2024-01-01 00:00:00.250,100.0,1.5\n\
                   2,2024-01-01T00:00:01Z,101.0,2\n";
        let trades = read_trades(csv.as_bytes()).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sequence_id, 1);
        assert_eq!(trades[0].ts_ms, 1_704_067_200_250);
        assert_eq!(trades[1].ts_ms, 1_704_067_201_000);
        assert_eq!(trades[1].volume, 2.0);
    }

    #[test]
    fn test_extra_columns_and_order() {
        let csv = "volume,side,price,time,sequence\n3,buy,10.5,1000,7\n";
        let trades = read_trades(csv.as_bytes()).unwrap();
        assert_eq!(
            trades[0],
            Trade {
                sequence_id: 7,
                ts_ms: 1000,
                price: 10.5,
                volume: 3.0
            }
        );
    }

    #[test]
    fn test_missing_column() {
        let csv = "sequence,time,price\n1,1000,10\n";
        let err = read_trades(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_sequence_header_name() {
        // The row identity column is named `sequence`, not `sequence_id`
        let csv = "sequence_id,time,price,volume\n1,1000,10,1\n";
        let err = read_trades(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing required column(s): sequence "));
    }

    #[test]
    fn test_bad_value_reports_line() {
        let csv = "sequence,time,price,volume\n1,1000,10,1\n2,2000,abc,1\n";
        let err = read_trades(csv.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 3"), "{msg}");
        assert!(msg.contains("price"), "{msg}");
    }

    #[test]
    fn test_duplicate_sequence() {
        let csv = "sequence,time,price,volume\n1,1000,10,1\n1,2000,11,1\n";
        assert!(read_trades(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(read_trades("".as_bytes()).unwrap().is_empty());
        let header_only = "sequence,time,price,volume\n";
        assert!(read_trades(header_only.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("0").unwrap(), 0);
        assert_eq!(
            parse_timestamp("2024-01-01T01:00:00+01:00").unwrap(),
            1_704_067_200_000
        );
        assert_eq!(
            parse_timestamp("2024-01-01 00:00:00").unwrap(),
            1_704_067_200_000
        );
        assert!(parse_timestamp("yesterday").is_err());
    }
}
