//! Upcoming-expiry feed and its per-plate grouping.

use crate::doc_types::DocTypeCatalog;
use crate::schema::{UpcomingDocument, Vehicle};
use crate::status::{StatusLabel, Thresholds};
use serde::Serialize;
use std::collections::BTreeMap;
use time::{Date, Duration};

pub const MIN_WINDOW_DAYS: i64 = 1;
pub const MAX_WINDOW_DAYS: i64 = 365;

pub fn clamp_window(days: i64) -> i64 {
    days.clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS)
}

/// Documents whose `valid_to` falls in `[now, now + window_days]`, soonest
/// first. Expired and undated documents are not part of the feed.
pub fn upcoming(
    vehicles: &[Vehicle],
    now: Date,
    window_days: i64,
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> Vec<UpcomingDocument> {
    feed_until(vehicles, now, clamp_window(window_days), thresholds, catalog)
}

/// [`upcoming`] without the window clamp.
pub(crate) fn feed_until(
    vehicles: &[Vehicle],
    now: Date,
    window_days: i64,
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> Vec<UpcomingDocument> {
    let until = now
        .checked_add(Duration::days(window_days.max(0)))
        .unwrap_or(Date::MAX);

    let mut feed: Vec<(Date, UpcomingDocument)> = Vec::new();
    for vehicle in vehicles {
        for doc in &vehicle.documents {
            let Some(valid_to) = doc.valid_to_date() else {
                continue;
            };
            if valid_to < now || valid_to > until {
                continue;
            }
            let days_left = (valid_to - now).whole_days();
            feed.push((
                valid_to,
                UpcomingDocument {
                    id: doc.id,
                    doc_id: doc.id,
                    plate: vehicle.plate.clone(),
                    doc_type: doc.doc_type.clone(),
                    doc_label: catalog.label(&doc.doc_type),
                    valid_from: doc.valid_from_date().map(|d| d.to_string()),
                    valid_to: valid_to.to_string(),
                    note: doc.note.clone(),
                    responsible_email: vehicle.responsible_email.clone(),
                    days_left,
                    status: thresholds.label_for(days_left),
                },
            ));
        }
    }

    feed.sort_by(|(a_date, a), (b_date, b)| a_date.cmp(b_date).then(a.id.cmp(&b.id)));
    feed.into_iter().map(|(_, entry)| entry).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateGroup {
    pub plate: String,
    pub worst_status: StatusLabel,
    pub next_document: UpcomingDocument,
    pub documents: Vec<UpcomingDocument>,
    pub responsible_email: Option<String>,
}

// critical > expired > warning > ok; unknown never wins
fn group_rank(status: StatusLabel) -> Option<u8> {
    match status {
        StatusLabel::Critical => Some(0),
        StatusLabel::Expired => Some(1),
        StatusLabel::Warning => Some(2),
        StatusLabel::Ok => Some(3),
        StatusLabel::Unknown => None,
    }
}

fn more_urgent(candidate: StatusLabel, current: StatusLabel) -> bool {
    match (group_rank(candidate), group_rank(current)) {
        (Some(c), Some(cur)) => c < cur,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Groups feed entries by plate, sorted by plate.
pub fn group_by_plate(feed: &[UpcomingDocument]) -> Vec<PlateGroup> {
    let mut groups: BTreeMap<&str, PlateGroup> = BTreeMap::new();

    for doc in feed {
        let group = groups.entry(doc.plate.as_str()).or_insert_with(|| PlateGroup {
            plate: doc.plate.clone(),
            worst_status: doc.status,
            next_document: doc.clone(),
            documents: Vec::new(),
            responsible_email: None,
        });

        group.documents.push(doc.clone());
        if group.responsible_email.is_none() {
            group.responsible_email = doc.responsible_email.clone();
        }
        if doc.valid_to < group.next_document.valid_to {
            group.next_document = doc.clone();
        }
        if more_urgent(doc.status, group.worst_status) {
            group.worst_status = doc.status;
        }
    }

    groups.into_values().collect()
}
