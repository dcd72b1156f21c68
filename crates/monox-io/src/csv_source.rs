//! CSV event samples with type inference
//!
//! One row per event. The header row names the fields. Numeric and boolean
//! columns become event fields; string columns are skipped. The event number
//! comes from the event column when the file has one, and from the row index
//! otherwise.

use crate::reader::{EventSource, IoError, IoResult};
use crate::schema::{ColumnDescriptor, ColumnType, EventSchema};
use monox_selection::Event;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default name of the event-number column
pub const DEFAULT_EVENT_COLUMN: &str = "event";

/// Rows sampled for type inference
const INFERENCE_ROWS: usize = 100;

/// CSV event source
pub struct CsvEventSource {
    path: String,
    schema: EventSchema,
    delimiter: u8,
}

impl CsvEventSource {
    /// Open a comma-separated file with an `event` column (if present)
    pub fn open(path: &str) -> IoResult<Self> {
        Self::open_with_options(path, b',', DEFAULT_EVENT_COLUMN)
    }

    /// Open a CSV file with options
    pub fn open_with_options(path: &str, delimiter: u8, event_column: &str) -> IoResult<Self> {
        if !Path::new(path).exists() {
            return Err(IoError::FileNotFound(path.to_string()));
        }

        let mut reader = Self::reader(path, delimiter)?;
        let mut schema = Self::infer_schema(&mut reader)?;
        if schema.column_index(event_column).is_some() {
            schema.event_column = Some(event_column.to_string());
        }

        tracing::debug!(
            path,
            columns = schema.num_columns(),
            records = schema.num_records,
            "opened CSV event sample"
        );

        Ok(Self {
            path: path.to_string(),
            schema,
            delimiter,
        })
    }

    fn reader(path: &str, delimiter: u8) -> IoResult<csv::Reader<BufReader<File>>> {
        let file = File::open(path).map_err(|e| IoError::OpenFailed(format!("{}: {}", path, e)))?;
        Ok(csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file)))
    }

    fn infer_schema(reader: &mut csv::Reader<BufReader<File>>) -> IoResult<EventSchema> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IoError::InvalidFormat(e.to_string()))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        if headers.is_empty() {
            return Err(IoError::InvalidFormat("missing header row".to_string()));
        }

        let mut samples: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut num_records = 0;

        for result in reader.records() {
            let record = result.map_err(|e| IoError::InvalidFormat(e.to_string()))?;
            if num_records < INFERENCE_ROWS {
                for (i, value) in record.iter().enumerate().take(samples.len()) {
                    samples[i].push(value.to_string());
                }
            }
            num_records += 1;
        }

        let columns = headers
            .into_iter()
            .zip(&samples)
            .map(|(name, values)| {
                ColumnDescriptor::new(name, ColumnType::infer(values.iter().map(|s| s.as_str())))
            })
            .collect();

        Ok(EventSchema::new(columns, num_records))
    }

    fn event_number(&self, record: &csv::StringRecord, row: usize) -> IoResult<u64> {
        let index = match &self.schema.event_column {
            Some(name) => self.schema.column_index(name),
            None => None,
        };
        let Some(index) = index else {
            return Ok(row as u64);
        };

        let cell = record.get(index).unwrap_or("");
        cell.parse::<u64>()
            .or_else(|_| {
                cell.parse::<f64>()
                    .ok()
                    .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| v as u64)
                    .ok_or(())
            })
            .map_err(|_| {
                IoError::InvalidFormat(format!(
                    "{}: row {} has invalid event number '{}'",
                    self.path, row, cell
                ))
            })
    }
}

impl EventSource for CsvEventSource {
    fn schema(&self) -> &EventSchema {
        &self.schema
    }

    fn read_events(&self) -> IoResult<Vec<Event>> {
        let mut reader = Self::reader(&self.path, self.delimiter)?;
        let numeric: Vec<(usize, &ColumnDescriptor)> = self
            .schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.dtype.is_numeric())
            .collect();

        let mut events = Vec::with_capacity(self.schema.num_records);
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| IoError::InvalidFormat(e.to_string()))?;
            let mut event = Event::new(self.event_number(&record, row)?);
            for (index, column) in &numeric {
                let value = record
                    .get(*index)
                    .map(|cell| column.dtype.parse_cell(cell))
                    .unwrap_or(f64::NAN);
                event.set(column.name.clone(), value);
            }
            events.push(event);
        }

        tracing::debug!(path = %self.path, events = events.len(), "read events");
        Ok(events)
    }

    fn path(&self) -> Option<&str> {
        Some(&self.path)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}
