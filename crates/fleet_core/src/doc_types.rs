//! Document-type catalog: aliases, display labels and maintenance kinds.
//!
//! `doc_type` is an open-ended tag. Known kinds get a label; anything else is
//! rendered with underscores turned into spaces.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTypeCatalog {
    aliases: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    maintenance: Vec<String>,
}

/// On-disk form of the catalog (`doc_types.yaml`). Omitted sections keep their
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocTypesFile {
    pub aliases: Option<BTreeMap<String, String>>,
    pub labels: Option<BTreeMap<String, String>>,
    pub maintenance: Option<Vec<String>>,
}

const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("inspection", "Inspection"),
    ("k_document", "K Certificate"),
    ("traffic_insurance", "Traffic Insurance"),
    ("kasko", "Kasko"),
    ("service_oil", "Oil Service"),
    ("service_general", "General Service"),
];

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("k", "k_document"),
    ("k belgesi", "k_document"),
    ("muayene", "inspection"),
    ("trafik", "traffic_insurance"),
    ("trafik sigortası", "traffic_insurance"),
    ("trafik sigortasi", "traffic_insurance"),
    ("sigorta", "traffic_insurance"),
    ("insurance", "traffic_insurance"),
];

const DEFAULT_MAINTENANCE: &[&str] = &["service_oil", "service_general"];

impl Default for DocTypeCatalog {
    fn default() -> Self {
        Self::from_file(DocTypesFile::default())
    }
}

impl DocTypeCatalog {
    pub fn from_file(file: DocTypesFile) -> Self {
        let aliases = match file.aliases {
            Some(aliases) => aliases,
            None => pairs(DEFAULT_ALIASES),
        };
        let labels = match file.labels {
            Some(labels) => labels,
            None => pairs(DEFAULT_LABELS),
        };
        let maintenance = match file.maintenance {
            Some(maintenance) => maintenance,
            None => DEFAULT_MAINTENANCE.iter().map(|kind| kind.to_string()).collect(),
        };

        Self {
            aliases: aliases
                .into_iter()
                .map(|(alias, target)| (normalize_key(&alias), normalize_key(&target)))
                .collect(),
            labels: labels
                .into_iter()
                .map(|(kind, label)| (normalize_key(&kind), label))
                .collect(),
            maintenance: maintenance.iter().map(|kind| normalize_key(kind)).collect(),
        }
    }

    /// Lower-cases, joins whitespace runs with `_` and resolves aliases.
    pub fn normalize(&self, raw: &str) -> String {
        let key = normalize_key(raw);
        match self.aliases.get(&key) {
            Some(target) => target.clone(),
            None => key,
        }
    }

    pub fn label(&self, doc_type: &str) -> String {
        match self.labels.get(&self.normalize(doc_type)) {
            Some(label) => label.clone(),
            None => doc_type.replace('_', " "),
        }
    }

    pub fn is_known(&self, doc_type: &str) -> bool {
        self.labels.contains_key(&self.normalize(doc_type))
    }

    pub fn is_maintenance(&self, doc_type: &str) -> bool {
        let kind = self.normalize(doc_type);
        self.maintenance.iter().any(|m| *m == kind)
    }

    pub fn known_types(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_aliases_and_spacing() {
        let catalog = DocTypeCatalog::default();
        assert_eq!(catalog.normalize("  Muayene "), "inspection");
        assert_eq!(catalog.normalize("K  Belgesi"), "k_document");
        assert_eq!(catalog.normalize("Trafik Sigortası"), "traffic_insurance");
        assert_eq!(catalog.normalize("KASKO"), "kasko");
        assert_eq!(catalog.normalize("Tyre Change"), "tyre_change");
    }

    #[test]
    fn unknown_types_render_generically() {
        let catalog = DocTypeCatalog::default();
        assert_eq!(catalog.label("inspection"), "Inspection");
        assert_eq!(catalog.label("muayene"), "Inspection");
        assert_eq!(catalog.label("tachograph_calibration"), "tachograph calibration");
        assert!(!catalog.is_known("tachograph_calibration"));
    }

    #[test]
    fn maintenance_kinds() {
        let catalog = DocTypeCatalog::default();
        assert!(catalog.is_maintenance("service_oil"));
        assert!(catalog.is_maintenance("Service General"));
        assert!(!catalog.is_maintenance("inspection"));
    }

    #[test]
    fn file_sections_override_defaults() {
        let file: DocTypesFile = serde_yaml::from_str(
            "maintenance:\n  - service_oil\n  - tyre_change\nlabels:\n  tyre_change: Tyres\n",
        )
        .unwrap();
        let catalog = DocTypeCatalog::from_file(file);
        assert!(catalog.is_maintenance("tyre_change"));
        assert!(!catalog.is_maintenance("service_general"));
        assert_eq!(catalog.label("tyre_change"), "Tyres");
        // labels replaced wholesale, aliases still default
        assert!(!catalog.is_known("inspection"));
        assert_eq!(catalog.normalize("muayene"), "inspection");
    }
}
