//! JSON and CSV writers for regions and tile files
//!
//! JSON output is a pretty-printed array with two-space indentation and
//! non-ASCII characters kept as-is. CSV output has a header row taken from the
//! record's field names and follows RFC 4180 quoting.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::app::models::{Record, RecordKind, Region, Tabular, TileFile};
use crate::errors::{SerializeError, SerializeResult};

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SerializeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(SerializeError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Render records as a pretty-printed JSON array
pub fn to_json<T: Serialize>(records: &[T]) -> SerializeResult<String> {
    if records.is_empty() {
        return Err(SerializeError::EmptyInput);
    }
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    Ok(json)
}

/// Render records as CSV with a header row
pub fn to_csv<T: Tabular>(records: &[T]) -> SerializeResult<String> {
    if records.is_empty() {
        return Err(SerializeError::EmptyInput);
    }

    let fields = T::field_names();
    let mut csv = String::new();
    push_row(&mut csv, fields.iter().map(|f| (*f).to_string()));

    for record in records {
        let value = serde_json::to_value(record)?;
        push_row(
            &mut csv,
            fields.iter().map(|field| cell(value.get(*field))),
        );
    }
    Ok(csv)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\r', '\n']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&cell);
        }
    }
    out.push_str("\r\n");
}

/// Render records in the given format
pub fn render<T: Tabular>(records: &[T], format: OutputFormat) -> SerializeResult<String> {
    match format {
        OutputFormat::Json => to_json(records),
        OutputFormat::Csv => to_csv(records),
    }
}

/// Render a mixed list, requiring every record to be of `kind`
///
/// # Errors
///
/// `EmptyInput` for an empty list, `TypeMismatch` naming the first record of
/// another kind
pub fn render_records(
    kind: RecordKind,
    records: &[Record],
    format: OutputFormat,
) -> SerializeResult<String> {
    if records.is_empty() {
        return Err(SerializeError::EmptyInput);
    }
    if let Some((index, other)) = records.iter().enumerate().find(|(_, r)| r.kind() != kind) {
        return Err(SerializeError::TypeMismatch {
            index,
            expected: kind.as_str(),
            found: other.kind().as_str(),
        });
    }

    match kind {
        RecordKind::Region => {
            let regions: Vec<&Region> = records
                .iter()
                .filter_map(|r| match r {
                    Record::Region(region) => Some(region),
                    Record::TileFile(_) => None,
                })
                .collect();
            render(&regions, format)
        }
        RecordKind::TileFile => {
            let files: Vec<&TileFile> = records
                .iter()
                .filter_map(|r| match r {
                    Record::TileFile(file) => Some(file),
                    Record::Region(_) => None,
                })
                .collect();
            render(&files, format)
        }
    }
}

/// Write records to `path`, creating missing parent directories
pub async fn write_records<T: Tabular>(
    records: &[T],
    path: &Path,
    format: OutputFormat,
) -> SerializeResult<()> {
    let content = render(records, format)?;

    let io_error = |source| SerializeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, content.as_bytes())
        .await
        .map_err(io_error)?;

    info!(
        "Wrote {} {} records to {}",
        records.len(),
        T::KIND,
        path.display()
    );
    debug!("{} bytes of {}", content.len(), format);
    Ok(())
}
