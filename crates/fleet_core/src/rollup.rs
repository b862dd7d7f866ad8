//! Per-vehicle "next due" rollup.
//!
//! Every document is classified first, then one representative is picked:
//! the soonest deadline that has not passed yet, or, when everything has
//! expired, the most recently expired document. An expired document therefore
//! never hides an upcoming deadline of another type.

use crate::doc_types::DocTypeCatalog;
use crate::odometer::last_known_odometer;
use crate::schema::{Document, DocumentView, Vehicle, VehicleSummary, display_date};
use crate::status::{Classification, StatusLabel, Thresholds, classify};
use std::cmp::Reverse;
use time::Date;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VehicleRollup {
    pub document_count: usize,
    pub next_document_id: Option<i64>,
    pub next_valid_to: Option<Date>,
    pub days_left: Option<i64>,
    pub next_status: Option<StatusLabel>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: i64,
    valid_to: Option<Date>,
    classification: Classification,
}

pub fn rollup(documents: &[Document], now: Date, thresholds: &Thresholds) -> VehicleRollup {
    let candidates: Vec<Candidate> = documents
        .iter()
        .map(|doc| {
            let valid_to = doc.valid_to_date();
            Candidate {
                id: doc.id,
                valid_to,
                classification: classify(valid_to, now, thresholds),
            }
        })
        .collect();

    let mut result = VehicleRollup {
        document_count: documents.len(),
        ..VehicleRollup::default()
    };

    if let Some(next) = select_next(&candidates) {
        result.next_document_id = Some(next.id);
        result.next_valid_to = next.valid_to;
        result.days_left = next.classification.days_left;
        result.next_status = Some(next.classification.status);
    }
    result
}

fn select_next(candidates: &[Candidate]) -> Option<&Candidate> {
    let upcoming = candidates
        .iter()
        .filter_map(|c| c.classification.days_left.filter(|d| *d >= 0).map(|d| (d, c)))
        .min_by_key(|(days, c)| (*days, c.id))
        .map(|(_, c)| c);
    if upcoming.is_some() {
        return upcoming;
    }

    let latest_expired = candidates
        .iter()
        .filter_map(|c| c.classification.days_left.map(|d| (d, c)))
        .min_by_key(|(days, c)| (Reverse(*days), c.id))
        .map(|(_, c)| c);
    if latest_expired.is_some() {
        return latest_expired;
    }

    // only undated documents left
    candidates.iter().min_by_key(|c| c.id)
}

pub fn document_view(
    doc: &Document,
    now: Date,
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> DocumentView {
    let valid_to = doc.valid_to_date();
    if valid_to.is_none() {
        debug!(document_id = doc.id, valid_to = ?doc.valid_to, "document has no usable valid_to");
    }
    let classification = classify(valid_to, now, thresholds);
    DocumentView {
        id: doc.id,
        doc_type: doc.doc_type.clone(),
        doc_label: catalog.label(&doc.doc_type),
        valid_from: display_date(doc.valid_from.as_deref(), doc.valid_from_date()),
        valid_to: display_date(doc.valid_to.as_deref(), valid_to),
        note: doc.note.clone(),
        days_left: classification.days_left,
        status: classification.status,
    }
}

pub fn summarize_vehicle(
    vehicle: &Vehicle,
    now: Date,
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> VehicleSummary {
    let rollup = rollup(&vehicle.documents, now, thresholds);
    let documents = vehicle
        .documents
        .iter()
        .map(|doc| document_view(doc, now, thresholds, catalog))
        .collect();

    VehicleSummary {
        id: vehicle.id,
        plate: vehicle.plate.clone(),
        make: vehicle.make.clone(),
        model: vehicle.model.clone(),
        year: vehicle.year,
        responsible_email: vehicle.responsible_email.clone(),
        created_at: vehicle.created_at.clone(),
        documents,
        document_count: rollup.document_count,
        next_document_id: rollup.next_document_id,
        next_valid_to: rollup.next_valid_to.map(|d| d.to_string()),
        days_left: rollup.days_left,
        next_status: rollup.next_status,
        last_odometer_km: last_known_odometer(&vehicle.documents, catalog),
    }
}

pub fn summarize_fleet(
    vehicles: &[Vehicle],
    now: Date,
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> Vec<VehicleSummary> {
    let mut summaries: Vec<VehicleSummary> = vehicles
        .iter()
        .map(|vehicle| summarize_vehicle(vehicle, now, thresholds, catalog))
        .collect();
    summaries.sort_by(|a, b| a.plate.cmp(&b.plate).then(a.id.cmp(&b.id)));
    summaries
}

/// Case-insensitive substring search over plate, make and model. A blank term
/// keeps every vehicle.
pub fn filter_vehicles<'a>(vehicles: &'a [Vehicle], term: &str) -> Vec<&'a Vehicle> {
    let term = term.trim().to_lowercase();
    vehicles
        .iter()
        .filter(|vehicle| {
            term.is_empty()
                || [Some(&vehicle.plate), vehicle.make.as_ref(), vehicle.model.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}
