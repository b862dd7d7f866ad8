//! Expiry reminder planning.
//!
//! A reminder is due when a document is exactly N days from expiry for one of
//! the configured reminder days and that (document, N) pair has not been sent
//! yet. Delivery happens outside this crate.

use crate::doc_types::DocTypeCatalog;
use crate::feed::feed_until;
use crate::schema::{UpcomingDocument, Vehicle};
use crate::status::Thresholds;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::Date;

/// Default reminder days, from furthest to nearest.
pub const DEFAULT_REMINDER_DAYS: &[i64] = &[30, 15, 10, 7, 1];

/// A reminder already delivered, as kept in the external notification log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SentReminder {
    pub document_id: i64,
    pub threshold_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reminder {
    pub document_id: i64,
    pub plate: String,
    pub doc_type: String,
    pub doc_label: String,
    pub valid_to: String,
    pub days_left: i64,
    pub recipient: String,
}

impl Reminder {
    pub fn subject(&self) -> String {
        format!(
            "Document expiry reminder: {} - {} ({}d)",
            self.plate, self.doc_label, self.days_left
        )
    }

    pub fn log_entry(&self) -> SentReminder {
        SentReminder {
            document_id: self.document_id,
            threshold_days: self.days_left,
        }
    }
}

/// Feed window needed to see every reminder day.
pub fn reminder_window(reminder_days: &[i64]) -> i64 {
    reminder_days.iter().copied().max().unwrap_or(0)
}

/// Reminders due on `now`, planned straight from the vehicles. Reminder days
/// are not bounded by the upcoming-feed window.
pub fn plan_reminders(
    vehicles: &[Vehicle],
    now: Date,
    reminder_days: &[i64],
    already_sent: &[SentReminder],
    thresholds: &Thresholds,
    catalog: &DocTypeCatalog,
) -> Vec<Reminder> {
    if reminder_days.is_empty() {
        return Vec::new();
    }
    let feed = feed_until(vehicles, now, reminder_window(reminder_days), thresholds, catalog);
    due_reminders(&feed, reminder_days, already_sent)
}

pub fn due_reminders(
    feed: &[UpcomingDocument],
    reminder_days: &[i64],
    already_sent: &[SentReminder],
) -> Vec<Reminder> {
    let sent: HashSet<SentReminder> = already_sent.iter().copied().collect();

    let mut due: Vec<Reminder> = feed
        .iter()
        .filter(|doc| doc.days_left >= 0 && reminder_days.contains(&doc.days_left))
        .filter(|doc| {
            !sent.contains(&SentReminder {
                document_id: doc.id,
                threshold_days: doc.days_left,
            })
        })
        .filter_map(|doc| {
            let recipient = doc
                .responsible_email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty())?;
            Some(Reminder {
                document_id: doc.id,
                plate: doc.plate.clone(),
                doc_type: doc.doc_type.clone(),
                doc_label: doc.doc_label.clone(),
                valid_to: doc.valid_to.clone(),
                days_left: doc.days_left,
                recipient: recipient.to_string(),
            })
        })
        .collect();

    due.sort_by(|a, b| a.valid_to.cmp(&b.valid_to).then(a.document_id.cmp(&b.document_id)));
    due
}
