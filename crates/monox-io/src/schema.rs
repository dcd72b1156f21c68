//! Schema and column types of event samples

use monox_selection::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Schema describing the structure of an event sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSchema {
    /// Column descriptors, in file order
    pub columns: Vec<ColumnDescriptor>,

    /// Number of records
    pub num_records: usize,

    /// Column holding the event number, if any
    pub event_column: Option<String>,
}

impl EventSchema {
    /// Create a new schema
    pub fn new(columns: Vec<ColumnDescriptor>, num_records: usize) -> Self {
        Self {
            columns,
            num_records,
            event_column: None,
        }
    }

    /// Schema of events already in memory (all fields numeric)
    pub fn from_events(events: &[Event]) -> Self {
        let names: BTreeSet<&str> = events
            .iter()
            .flat_map(|e| e.fields.keys().map(|k| k.as_str()))
            .collect();
        let columns = names
            .into_iter()
            .map(|n| ColumnDescriptor::new(n, ColumnType::Float64))
            .collect();
        Self::new(columns, events.len())
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the columns readable as numbers
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Descriptor for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub dtype: ColumnType,
}

impl ColumnDescriptor {
    /// Create a new column descriptor
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float64,
    Int64,
    Bool,
    String,
}

impl ColumnType {
    /// Whether values of this type become event fields
    ///
    /// Booleans count as numeric and read as 0 or 1.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String)
    }

    /// Infer a column type from sample values
    ///
    /// Empty cells are ignored; a column with no non-empty samples is a
    /// string column.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
        let non_empty: Vec<&str> = values.into_iter().filter(|s| !s.is_empty()).collect();
        if non_empty.is_empty() {
            return ColumnType::String;
        }
        if non_empty.iter().all(|s| s.parse::<i64>().is_ok()) {
            return ColumnType::Int64;
        }
        if non_empty.iter().all(|s| s.parse::<f64>().is_ok()) {
            return ColumnType::Float64;
        }
        if non_empty.iter().all(|s| parse_bool(s).is_some()) {
            return ColumnType::Bool;
        }
        ColumnType::String
    }

    /// Parse one cell as a number; unparsable cells give NaN
    pub fn parse_cell(&self, cell: &str) -> f64 {
        match self {
            ColumnType::Float64 | ColumnType::Int64 => cell.trim().parse().unwrap_or(f64::NAN),
            ColumnType::Bool => match parse_bool(cell) {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => f64::NAN,
            },
            ColumnType::String => f64::NAN,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_column_lookup() {
        let schema = EventSchema::new(
            vec![
                ColumnDescriptor::new("met", ColumnType::Float64),
                ColumnDescriptor::new("sample", ColumnType::String),
            ],
            100,
        );

        assert_eq!(schema.column_index("met"), Some(0));
        assert_eq!(schema.column_index("sample"), Some(1));
        assert_eq!(schema.column_index("pt"), None);
        assert_eq!(schema.numeric_columns(), vec!["met"]);
    }

    #[test]
    fn test_infer_types() {
        assert_eq!(ColumnType::infer(["1", "2", ""]), ColumnType::Int64);
        assert_eq!(ColumnType::infer(["1.5", "2"]), ColumnType::Float64);
        assert_eq!(ColumnType::infer(["true", "No"]), ColumnType::Bool);
        assert_eq!(ColumnType::infer(["wg", "zg"]), ColumnType::String);
        assert_eq!(ColumnType::infer(Vec::<&str>::new()), ColumnType::String);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(ColumnType::Float64.parse_cell(" 2.5"), 2.5);
        assert!(ColumnType::Float64.parse_cell("").is_nan());
        assert_eq!(ColumnType::Bool.parse_cell("true"), 1.0);
    }
}
