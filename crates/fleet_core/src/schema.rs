use crate::status::{StatusLabel, parse_date};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::Date;

/// A dated document as returned by the fleet API.
///
/// Derived fields the API may embed (`days_left`, `status`) are ignored on
/// input and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: i64,
    pub doc_type: String,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_to: Option<String>, // ISO date; absent or unparseable classifies as unknown
    #[serde(default)]
    pub note: Option<String>,
}

impl Document {
    pub fn valid_to_date(&self) -> Option<Date> {
        self.valid_to.as_deref().and_then(parse_date)
    }

    pub fn valid_from_date(&self) -> Option<Date> {
        self.valid_from.as_deref().and_then(parse_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub responsible_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentView {
    pub id: i64,
    pub doc_type: String,
    pub doc_label: String,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
    pub note: Option<String>,
    pub days_left: Option<i64>,
    pub status: StatusLabel,
}

/// Vehicle with its classified documents and rollup, the shape the dashboard
/// renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VehicleSummary {
    pub id: i64,
    pub plate: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub responsible_email: Option<String>,
    pub created_at: Option<String>,
    pub documents: Vec<DocumentView>,
    pub document_count: usize,
    pub next_document_id: Option<i64>,
    pub next_valid_to: Option<String>,
    pub days_left: Option<i64>,
    pub next_status: Option<StatusLabel>,
    pub last_odometer_km: Option<u32>,
}

/// One entry of the upcoming-expiry feed: a document flattened out of its
/// vehicle, carrying the plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpcomingDocument {
    pub id: i64,
    pub doc_id: i64,
    pub plate: String,
    pub doc_type: String,
    pub doc_label: String,
    pub valid_from: Option<String>,
    pub valid_to: String,
    pub note: Option<String>,
    pub responsible_email: Option<String>,
    pub days_left: i64,
    pub status: StatusLabel,
}

/// Renders a parsed date back as `YYYY-MM-DD`, or passes the raw value through
/// when it did not parse.
pub(crate) fn display_date(raw: Option<&str>, parsed: Option<Date>) -> Option<String> {
    match parsed {
        Some(date) => Some(date.to_string()),
        None => raw.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn vehicle_deserializes_api_payload() {
        let raw = r#"{
            "id": 3,
            "plate": "34 ABC 123",
            "make": "Ford",
            "model": null,
            "year": 2019,
            "created_at": "2024-01-02T10:00:00",
            "document_count": 99,
            "next_status": "ok",
            "documents": [
                {"id": 9, "doc_type": "inspection", "valid_from": null,
                 "valid_to": "2024-05-01", "note": null, "days_left": 1, "status": "critical"}
            ]
        }"#;
        let vehicle: Vehicle = serde_json::from_str(raw).unwrap();
        assert_eq!(vehicle.plate, "34 ABC 123");
        assert_eq!(vehicle.documents.len(), 1);
        assert_eq!(vehicle.documents[0].valid_to_date(), Some(date!(2024 - 05 - 01)));
        assert_eq!(vehicle.responsible_email, None);
    }

    #[test]
    fn document_tolerates_missing_and_bad_dates() {
        let doc: Document =
            serde_json::from_str(r#"{"id": 1, "doc_type": "kasko", "valid_to": "soon"}"#).unwrap();
        assert_eq!(doc.valid_to_date(), None);
        assert_eq!(doc.valid_from, None);

        let doc: Document = serde_json::from_str(r#"{"id": 2, "doc_type": "kasko"}"#).unwrap();
        assert_eq!(doc.valid_to, None);
    }

    #[test]
    fn display_date_normalizes_timestamps() {
        let raw = "2024-05-01T00:00:00";
        assert_eq!(
            display_date(Some(raw), parse_date(raw)).as_deref(),
            Some("2024-05-01")
        );
        assert_eq!(display_date(Some("soon"), None).as_deref(), Some("soon"));
        assert_eq!(display_date(None, None), None);
    }
}
