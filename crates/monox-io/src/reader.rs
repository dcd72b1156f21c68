//! Event source trait and common types
//!
//! The `EventSource` trait provides a uniform interface for loading event
//! samples from various file formats.

use crate::schema::EventSchema;
use monox_selection::Event;
use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Debug, Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to open file: {0}")]
    OpenFailed(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Histogram not found: {0}")]
    HistogramNotFound(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json(e.to_string())
    }
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;

/// Trait for loading event samples
pub trait EventSource: Send + Sync {
    /// Column names, types and record count
    fn schema(&self) -> &EventSchema;

    /// Read every event of the sample
    fn read_events(&self) -> IoResult<Vec<Event>>;

    /// Get the file path (if applicable)
    fn path(&self) -> Option<&str> {
        None
    }

    /// Get the format name
    fn format_name(&self) -> &'static str;
}

/// A boxed source for dynamic dispatch
pub type BoxedSource = Box<dyn EventSource>;

/// Open a file and return an appropriate source
///
/// The format is detected from the file extension.
pub fn open_events(path: &str) -> IoResult<BoxedSource> {
    let extension = path
        .rsplit('.')
        .next()
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Box::new(crate::csv_source::CsvEventSource::open(path)?)),
        "tsv" => Ok(Box::new(crate::csv_source::CsvEventSource::open_with_options(
            path,
            b'\t',
            crate::csv_source::DEFAULT_EVENT_COLUMN,
        )?)),
        _ => Err(IoError::InvalidFormat(format!(
            "Unknown file extension: {}",
            extension
        ))),
    }
}

/// Events already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    schema: EventSchema,
    events: Vec<Event>,
}

impl MemorySource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            schema: EventSchema::from_events(&events),
            events,
        }
    }
}

impl EventSource for MemorySource {
    fn schema(&self) -> &EventSchema {
        &self.schema
    }

    fn read_events(&self) -> IoResult<Vec<Event>> {
        Ok(self.events.clone())
    }

    fn format_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            open_events("sample.root"),
            Err(IoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new(vec![
            Event::new(1).with("met", 10.0),
            Event::new(2).with("met", 20.0).with("pt", 5.0),
        ]);
        assert_eq!(source.schema().num_records, 2);
        assert_eq!(source.schema().column_names(), vec!["met", "pt"]);
        assert_eq!(source.read_events().unwrap().len(), 2);
        assert_eq!(source.format_name(), "memory");
    }
}
