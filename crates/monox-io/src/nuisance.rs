//! Systematic-variation discovery from histogram names
//!
//! Variation histograms are named `<process>_<syst>Up`, `<process>_<syst>Down`
//! or `<process>_<syst>Var`. A process name may contain letters, digits and
//! dashes; a systematic name letters and digits.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    static ref VARIATION_NAME: Regex =
        Regex::new(r"^([0-9a-zA-Z-]+)_([0-9a-zA-Z]+)(Up|Var)$").unwrap();
}

/// The two shapes a discovered nuisance can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NuisanceKind {
    /// `<syst>Up` together with `<syst>Down`
    UpDown,
    /// A single `<syst>Var` histogram
    Var,
}

/// One (process, kind) entry of a nuisance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NuisanceProcess {
    pub process: String,
    pub kind: NuisanceKind,
}

/// Nuisances keyed by systematic name
pub type NuisanceMap = BTreeMap<String, Vec<NuisanceProcess>>;

/// Split a variation name into (process, syst, suffix)
pub fn parse_variation_name(name: &str) -> Option<(&str, &str, &str)> {
    let caps = VARIATION_NAME.captures(name)?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str(),
    ))
}

/// Find systematic variations among histogram names
///
/// Only processes listed in `processes` are considered. An `Up` variation is
/// kept only when the matching `Down` histogram exists.
pub fn discover_nuisances<'a, I>(names: I, processes: &[String]) -> NuisanceMap
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    let present: HashSet<&str> = names.iter().copied().collect();
    let mut nuisances = NuisanceMap::new();

    for name in &names {
        let Some((process, syst, suffix)) = parse_variation_name(name) else {
            continue;
        };
        if !processes.iter().any(|p| p == process) {
            continue;
        }

        let kind = if suffix == "Up" {
            let down = format!("{}_{}Down", process, syst);
            if !present.contains(down.as_str()) {
                tracing::debug!(name, "skipping Up variation without Down partner");
                continue;
            }
            NuisanceKind::UpDown
        } else {
            NuisanceKind::Var
        };

        nuisances
            .entry(syst.to_string())
            .or_default()
            .push(NuisanceProcess {
                process: process.to_string(),
                kind,
            });
    }

    nuisances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variation_name() {
        assert_eq!(
            parse_variation_name("wg_pdfUp"),
            Some(("wg", "pdf", "Up"))
        );
        assert_eq!(
            parse_variation_name("z-nunu_gjetsVar"),
            Some(("z-nunu", "gjets", "Var"))
        );
        assert_eq!(parse_variation_name("wg_pdfDown"), None);
        assert_eq!(parse_variation_name("wg"), None);
        assert_eq!(parse_variation_name("wg_pdf_scaleUp"), None);
    }

    #[test]
    fn test_discover_requires_down() {
        let names = [
            "wg",
            "wg_pdfUp",
            "wg_pdfDown",
            "zg_pdfUp",
            "zg_ewkVar",
            "data_pdfUp",
            "data_pdfDown",
        ];
        let processes = vec!["wg".to_string(), "zg".to_string()];
        let found = discover_nuisances(names.iter().copied(), &processes);

        assert_eq!(found.len(), 2);
        assert_eq!(
            found["pdf"],
            vec![NuisanceProcess {
                process: "wg".to_string(),
                kind: NuisanceKind::UpDown
            }]
        );
        assert_eq!(found["ewk"][0].kind, NuisanceKind::Var);
    }
}
