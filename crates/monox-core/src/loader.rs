//! Sample loading
//!
//! The pipeline asks a [`SampleLoader`] for the events of a sample under a
//! given selection. [`DirectoryLoader`] reads skim files from disk;
//! [`MemoryLoader`] serves events already in memory.

use monox_io::{open_events, IoError};
use monox_selection::Event;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::SampleConfig;
use crate::error::MonoxResult;

/// Source of events for (sample, selection) pairs
pub trait SampleLoader: Send + Sync {
    fn load(&self, sample: &SampleConfig, selection: &str) -> MonoxResult<Vec<Event>>;
}

/// Reads `<source_dir>/<sample>_<selection>.csv` (or the sample's own file)
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    source_dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }
}

impl SampleLoader for DirectoryLoader {
    fn load(&self, sample: &SampleConfig, selection: &str) -> MonoxResult<Vec<Event>> {
        let path = sample.path(&self.source_dir, selection);
        let path = path
            .to_str()
            .ok_or_else(|| IoError::InvalidFormat(format!("non UTF-8 path {}", path.display())))?;
        let source = open_events(path)?;
        let events = source.read_events()?;
        tracing::info!(
            sample = %sample.name,
            selection,
            format = source.format_name(),
            events = events.len(),
            "loaded sample"
        );
        Ok(events)
    }
}

/// Events held in memory, keyed by sample and selection
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    samples: HashMap<(String, String), Vec<Event>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sample: impl Into<String>, selection: impl Into<String>, events: Vec<Event>) {
        self.samples.insert((sample.into(), selection.into()), events);
    }

    pub fn with(mut self, sample: impl Into<String>, selection: impl Into<String>, events: Vec<Event>) -> Self {
        self.insert(sample, selection, events);
        self
    }
}

impl SampleLoader for MemoryLoader {
    fn load(&self, sample: &SampleConfig, selection: &str) -> MonoxResult<Vec<Event>> {
        self.samples
            .get(&(sample.name.clone(), selection.to_string()))
            .cloned()
            .ok_or_else(|| {
                IoError::FileNotFound(format!("{} ({})", sample.name, selection)).into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_directory_loader() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wg_monoph.csv"), "event,met\n1,100\n2,300\n").unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let events = loader.load(&SampleConfig::mc("wg"), "monoph").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].get("met"), Some(300.0));

        assert!(loader.load(&SampleConfig::mc("wg"), "efake").is_err());
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("wg", "monoph", vec![Event::new(3)]);
        assert_eq!(loader.load(&SampleConfig::mc("wg"), "monoph").unwrap().len(), 1);
        assert!(loader.load(&SampleConfig::mc("zg"), "monoph").is_err());
    }
}
