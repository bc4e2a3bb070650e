use gtmetrix::GtmetrixError;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument '{input}': expected key=value")]
    InvalidKeyValue { input: String },

    #[error("Invalid HAR file: {message}")]
    InvalidHar { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] GtmetrixError),
}

pub type CliResult<T> = Result<T, CliError>;

/// Splits `key=value` at the first `=`. The key must be non-empty; the value
/// may contain further `=` signs.
pub fn parse_key_value(input: &str) -> CliResult<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidKeyValue {
            input: input.to_string(),
        }),
    }
}

/// Test parameters given on the command line. Numbers and booleans are sent
/// as JSON scalars, everything else as a string.
pub fn test_attributes(params: &[(String, String)]) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), param_value(value)))
        .collect()
}

fn param_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarSummary {
    pub responses: usize,
    pub total_bytes: i64,
}

impl HarSummary {
    pub fn describe(&self) -> String {
        let kb = self.total_bytes as f64 / 1024.0;
        let mb = kb / 1024.0;
        format!(
            "Total size of {} responses, uncompressed: {} bytes = {:.1} kb = {:.1} MB",
            self.responses, self.total_bytes, kb, mb
        )
    }
}

/// Sums `log.entries[].response.content.size` over a HAR document, exactly
/// as recorded (a `-1` for an unknown size is summed too). Every entry must
/// carry an integer size.
pub fn summarize_har(bytes: &[u8]) -> CliResult<HarSummary> {
    let har: Value = serde_json::from_slice(bytes)?;
    let entries = har
        .pointer("/log/entries")
        .and_then(Value::as_array)
        .ok_or_else(|| CliError::InvalidHar {
            message: "missing log.entries list".to_string(),
        })?;

    let mut total_bytes = 0i64;
    for (index, entry) in entries.iter().enumerate() {
        let size = entry
            .pointer("/response/content/size")
            .and_then(Value::as_i64)
            .ok_or_else(|| CliError::InvalidHar {
                message: format!("entry {} has no response.content.size", index),
            })?;
        total_bytes += size;
    }

    Ok(HarSummary {
        responses: entries.len(),
        total_bytes,
    })
}
