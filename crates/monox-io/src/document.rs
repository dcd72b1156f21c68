//! JSON documents of named histograms
//!
//! A document is a flat JSON object mapping names to serialized
//! [`Histogram`]s. Plots are stored as `<process>` for the nominal and
//! `<process>_<syst>Up`, `<process>_<syst>Down` or `<process>_<syst>Var` for
//! variations. Correction-factor inputs use the same format.

use crate::reader::{IoError, IoResult};
use monox_hist::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Named histograms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramDocument {
    histograms: BTreeMap<String, Histogram>,
}

impl HistogramDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IoError::FileNotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let doc = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), histograms = doc.len(), "loaded histogram document");
        Ok(doc)
    }

    /// Save the document as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> IoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> IoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, hist: Histogram) -> Option<Histogram> {
        self.histograms.insert(name.into(), hist)
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// Like [`get`](Self::get), failing with [`IoError::HistogramNotFound`]
    pub fn require(&self, name: &str) -> IoResult<&Histogram> {
        self.get(name)
            .ok_or_else(|| IoError::HistogramNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.histograms.contains_key(name)
    }

    /// Histogram names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.histograms.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram)> {
        self.histograms.iter().map(|(k, v)| (k.as_str(), v))
    }
}
