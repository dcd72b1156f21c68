//! Flat event records
//!
//! An [`Event`] is one row of an event sample: an event number plus named
//! numeric fields. The event number is also visible to cut expressions as
//! the field `event` unless the row carries its own `event` column.

use crate::eval::EvalContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field name under which the event number is exposed
pub const EVENT_NUMBER_FIELD: &str = "event";

/// One event with named numeric fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub number: u64,
    pub fields: HashMap<String, f64>,
}

impl Event {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            fields: HashMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(v) => Some(*v),
            None if name == EVENT_NUMBER_FIELD => Some(self.number as f64),
            None => None,
        }
    }
}

impl EvalContext for Event {
    fn field_value(&self, field: &str) -> Option<f64> {
        self.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_number_fallback() {
        let event = Event::new(42).with("met", 180.0);
        assert_eq!(event.get("met"), Some(180.0));
        assert_eq!(event.get("event"), Some(42.0));
        assert_eq!(event.get("pt"), None);

        let explicit = Event::new(42).with("event", 7.0);
        assert_eq!(explicit.get("event"), Some(7.0));
    }
}
