//! Odometer readings embedded in maintenance notes as `km=<digits>`.

use crate::doc_types::DocTypeCatalog;
use crate::schema::Document;
use regex::Regex;
use std::sync::OnceLock;

/// Largest reading the note format can carry (9 digits).
pub const MAX_ODOMETER_KM: u32 = 999_999_999;

fn odometer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i-u:km)\s*=\s*([0-9]{1,9})").expect("odometer pattern"))
}

/// First `km=<n>` reading in the note, if any.
pub fn extract_odometer(note: Option<&str>) -> Option<u32> {
    let captures = odometer_pattern().captures(note?)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Highest reading across the vehicle's maintenance documents.
///
/// Takes the maximum rather than the reading of the latest service date: an
/// odometer only increases, so this tolerates services entered out of order.
/// A mistyped high reading therefore sticks until it is corrected.
pub fn last_known_odometer(documents: &[Document], catalog: &DocTypeCatalog) -> Option<u32> {
    documents
        .iter()
        .filter(|doc| catalog.is_maintenance(&doc.doc_type))
        .filter_map(|doc| extract_odometer(doc.note.as_deref()))
        .max()
}

/// Builds the note stored on a maintenance document: `km=<n>` and the remark,
/// joined with `"; "`.
pub fn format_maintenance_note(km: Option<u32>, remark: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(km) = km {
        parts.push(format!("km={km}"));
    }
    if let Some(remark) = remark.map(str::trim).filter(|r| !r.is_empty()) {
        parts.push(remark.to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
