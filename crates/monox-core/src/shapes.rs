//! Shape-variation summaries
//!
//! Scans a histogram document for `<process>_<syst>Up/Down/Var` entries and
//! reports, per systematic and process, the variation histograms and the
//! display range a variation/nominal ratio panel needs.

use monox_hist::{RatioRange, VariationKind, VariationSet};
use monox_io::{discover_nuisances, HistogramDocument, NuisanceKind, NuisanceMap};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MonoxResult;

/// One (systematic, process) entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeEntry {
    pub syst: String,
    pub process: String,
    pub kind: NuisanceKind,
    pub limits: RatioRange,
    /// Nominal plus the single variation `syst`
    pub histograms: VariationSet,
}

/// Every shape variation found in a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeSummary {
    pub nuisances: NuisanceMap,
    pub entries: Vec<ShapeEntry>,
}

impl ShapeSummary {
    /// Summarize the variations of `processes` in `doc`
    ///
    /// Entries are ordered by systematic name, then by the order of
    /// `processes`.
    pub fn from_document(doc: &HistogramDocument, processes: &[String]) -> MonoxResult<Self> {
        let nuisances = discover_nuisances(doc.names(), processes);
        let mut entries = Vec::new();

        for (syst, found) in &nuisances {
            for process in processes {
                let Some(entry) = found.iter().find(|p| &p.process == process) else {
                    continue;
                };
                let histograms = variation_set(doc, process, syst, entry.kind)?;
                let limits = histograms.ratio_limits(syst)?;
                entries.push(ShapeEntry {
                    syst: syst.clone(),
                    process: process.clone(),
                    kind: entry.kind,
                    limits,
                    histograms,
                });
            }
        }

        tracing::info!(
            nuisances = nuisances.len(),
            entries = entries.len(),
            "summarized shape variations"
        );
        Ok(Self { nuisances, entries })
    }

    pub fn entry(&self, syst: &str, process: &str) -> Option<&ShapeEntry> {
        self.entries
            .iter()
            .find(|e| e.syst == syst && e.process == process)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ShapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{:<16} {:<12} {:?} ({:.2}, {:.2})",
                entry.syst, entry.process, entry.kind, entry.limits.low, entry.limits.high
            )?;
        }
        Ok(())
    }
}

/// Nominal histogram of `process` with variation `syst` registered
fn variation_set(
    doc: &HistogramDocument,
    process: &str,
    syst: &str,
    kind: NuisanceKind,
) -> MonoxResult<VariationSet> {
    let nominal = doc.require(process)?.clone();
    let variation = match kind {
        NuisanceKind::UpDown => VariationKind::UpDown {
            up: doc.require(&format!("{}_{}Up", process, syst))?.clone(),
            down: doc.require(&format!("{}_{}Down", process, syst))?.clone(),
        },
        NuisanceKind::Var => VariationKind::Single {
            varied: doc.require(&format!("{}_{}Var", process, syst))?.clone(),
        },
    };
    Ok(VariationSet::new(nominal).with_variation(syst, variation)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use monox_hist::{Binning, Histogram};

    fn hist(content: &[f64]) -> Histogram {
        let binning = Binning::uniform(content.len(), 0.0, 1.0).unwrap();
        Histogram::from_parts(binning, content.to_vec(), vec![0.0; content.len()]).unwrap()
    }

    fn document() -> HistogramDocument {
        let mut doc = HistogramDocument::new();
        doc.insert("wg", hist(&[10.0, 10.0]));
        doc.insert("wg_pdfUp", hist(&[10.3, 10.2]));
        doc.insert("wg_pdfDown", hist(&[9.7, 9.8]));
        doc.insert("zg", hist(&[10.0, 0.0]));
        doc.insert("zg_pdfUp", hist(&[13.0, 0.0]));
        doc.insert("zg_pdfDown", hist(&[7.0, 0.0]));
        doc.insert("zg_gjetsVar", hist(&[20.0, 0.0]));
        doc.insert("qcd_pdfUp", hist(&[1.0, 1.0]));
        doc
    }

    #[test]
    fn test_summary_limits() {
        let processes = vec!["wg".to_string(), "zg".to_string()];
        let summary = ShapeSummary::from_document(&document(), &processes).unwrap();

        assert_eq!(summary.nuisances.len(), 2);
        assert_eq!(summary.entries.len(), 3);
        assert_eq!(summary.entry("pdf", "wg").unwrap().limits, RatioRange::NARROW);
        assert_eq!(summary.entry("pdf", "zg").unwrap().limits, RatioRange::WIDE);
        let gjets = summary.entry("gjets", "zg").unwrap();
        assert_eq!(gjets.kind, NuisanceKind::Var);
        assert!(summary.to_string().contains("gjets"));
    }

    #[test]
    fn test_missing_nominal() {
        let mut doc = HistogramDocument::new();
        doc.insert("wg_pdfUp", hist(&[1.0]));
        doc.insert("wg_pdfDown", hist(&[1.0]));
        assert!(ShapeSummary::from_document(&doc, &["wg".to_string()]).is_err());
    }
}
