//! Payload parsing.
//!
//! Turning bytes into rows is a pure function of the bytes and the declared
//! format: the same payload always yields the same rows.
//!
//! - CSV payloads need a header row whose names match the row type's fields.
//! - JSON payloads are either an array of objects or an object holding that
//!   array under `data` or `rows`.

use csv::{ReaderBuilder, Terminator, Trim, WriterBuilder};
use serde_json::Value;

use crate::errors::ChartDataError;
use crate::models::{DataFormat, DatasetRow};

/// Parse and validate a payload into typed rows.
///
/// Any malformed record or row failing [`DatasetRow::validate`] fails the whole
/// payload; rows are never silently dropped.
pub fn parse_rows<R: DatasetRow>(
    payload: &[u8],
    format: DataFormat,
    location: &str,
) -> Result<Vec<R>, ChartDataError> {
    let rows: Vec<R> = match format {
        DataFormat::Csv => parse_csv(payload, location)?,
        DataFormat::Json => parse_json(payload, location)?,
    };

    for (index, row) in rows.iter().enumerate() {
        if let Err(message) = row.validate() {
            return Err(parse_error(
                location,
                format!("row {} failed validation: {}", index + 1, message),
            ));
        }
    }

    Ok(rows)
}

/// Serialise rows to CSV with a header row and `\n` line endings.
pub fn write_csv<R: DatasetRow>(rows: &[R]) -> Result<String, ChartDataError> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| parse_error("csv output", e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| parse_error("csv output", e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| parse_error("csv output", e.to_string()))
}

fn parse_csv<R: DatasetRow>(payload: &[u8], location: &str) -> Result<Vec<R>, ChartDataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(payload);

    let headers = reader
        .headers()
        .map_err(|e| parse_error(location, e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(parse_error(location, "missing header row"));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| parse_error(location, e.to_string()))?;
        let row: R = record
            .deserialize(Some(&headers))
            .map_err(|e| parse_error(location, format!("row {}: {}", index + 1, e)))?;
        rows.push(row);
    }

    Ok(rows)
}

fn parse_json<R: DatasetRow>(payload: &[u8], location: &str) -> Result<Vec<R>, ChartDataError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| parse_error(location, e.to_string()))?;

    let rows = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match ["data", "rows"]
            .into_iter()
            .find(|key| map.get(*key).is_some_and(Value::is_array))
            .and_then(|key| map.remove(key))
        {
            Some(rows) => rows,
            None => {
                return Err(parse_error(
                    location,
                    "expected an array under `data` or `rows`",
                ))
            }
        },
        _ => return Err(parse_error(location, "expected a JSON array or object")),
    };

    serde_json::from_value(rows).map_err(|e| parse_error(location, e.to_string()))
}

fn parse_error(location: &str, message: impl Into<String>) -> ChartDataError {
    ChartDataError::ParseError {
        location: location.to_string(),
        message: message.into(),
    }
}
