//! Write payloads for the fleet API's vehicle and document endpoints.
//!
//! Drafts carry operator input as typed; `normalize` produces the payload
//! the API accepts, or a `ValidationError`.

use crate::doc_types::DocTypeCatalog;
use crate::error::ValidationError;
use crate::odometer::{MAX_ODOMETER_KM, format_maintenance_note};
use crate::status::parse_date;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::Date;

/// Admin credential forwarded with write requests. Stand-in until the API
/// moves to real sessions; never inspected here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AdminCredential(String);

impl AdminCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminCredential(***)")
    }
}

/// Payload plus the credential, serialized flat as the API expects.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WriteRequest<T> {
    #[serde(flatten)]
    pub payload: T,
    pub admin_password: AdminCredential,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleDraft {
    pub plate: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub responsible_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct NewVehicle {
    pub plate: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub responsible_email: Option<String>,
}

impl VehicleDraft {
    pub fn normalize(self) -> Result<NewVehicle, ValidationError> {
        let plate = normalize_plate(&self.plate)?;
        if let Some(year) = self.year {
            if !(1900..=2100).contains(&year) {
                return Err(ValidationError::YearOutOfRange(year));
            }
        }
        Ok(NewVehicle {
            plate,
            make: non_blank(self.make),
            model: non_blank(self.model),
            year: self.year,
            responsible_email: non_blank(self.responsible_email),
        })
    }
}

/// Trims and upper-cases a plate. Inner spacing is kept as typed.
pub fn normalize_plate(raw: &str) -> Result<String, ValidationError> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() {
        return Err(ValidationError::MissingPlate);
    }
    Ok(plate)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentDraft {
    pub vehicle_id: i64,
    pub doc_type: String,
    pub valid_from: Option<String>,
    pub valid_to: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct NewDocument {
    pub vehicle_id: i64,
    pub doc_type: String,
    pub valid_from: Option<String>,
    pub valid_to: String,
    pub note: Option<String>,
}

impl DocumentDraft {
    pub fn normalize(self, catalog: &DocTypeCatalog) -> Result<NewDocument, ValidationError> {
        let doc_type = catalog.normalize(&self.doc_type);
        if !catalog.is_known(&doc_type) {
            return Err(ValidationError::UnsupportedDocType {
                doc_type: self.doc_type,
                allowed: catalog.known_types().collect::<Vec<_>>().join(", "),
            });
        }
        let valid_to = required_date("valid_to", &self.valid_to)?;
        let valid_from = match non_blank(self.valid_from) {
            Some(raw) => Some(required_date("valid_from", &raw)?),
            None => None,
        };
        if let Some(from) = valid_from {
            if from > valid_to {
                return Err(ValidationError::InvertedValidity {
                    valid_from: from.to_string(),
                    valid_to: valid_to.to_string(),
                });
            }
        }
        Ok(NewDocument {
            vehicle_id: self.vehicle_id,
            doc_type,
            valid_from: valid_from.map(|d| d.to_string()),
            valid_to: valid_to.to_string(),
            note: non_blank(self.note),
        })
    }
}

/// A service event logged as a document dated on the service day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceDraft {
    pub vehicle_id: i64,
    pub kind: String,
    pub service_date: String,
    pub km: Option<u64>,
    pub remark: Option<String>,
}

impl MaintenanceDraft {
    pub fn normalize(self, catalog: &DocTypeCatalog) -> Result<NewDocument, ValidationError> {
        let doc_type = catalog.normalize(&self.kind);
        if !catalog.is_maintenance(&doc_type) {
            return Err(ValidationError::NotMaintenance(self.kind));
        }
        let service_date = required_date("service_date", &self.service_date)?;
        let km = match self.km {
            Some(km) if km > u64::from(MAX_ODOMETER_KM) => {
                return Err(ValidationError::OdometerOutOfRange(km));
            }
            Some(km) => u32::try_from(km).ok(),
            None => None,
        };
        Ok(NewDocument {
            vehicle_id: self.vehicle_id,
            doc_type,
            valid_from: Some(service_date.to_string()),
            valid_to: service_date.to_string(),
            note: format_maintenance_note(km, self.remark.as_deref()),
        })
    }
}

fn required_date(field: &'static str, raw: &str) -> Result<Date, ValidationError> {
    parse_date(raw).ok_or_else(|| ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_plate_is_upper_cased() {
        let draft = VehicleDraft {
            plate: "  34 abc 123 ".to_string(),
            make: Some(" Ford ".to_string()),
            model: Some("   ".to_string()),
            year: Some(2019),
            responsible_email: None,
        };
        let vehicle = draft.normalize().unwrap();
        assert_eq!(vehicle.plate, "34 ABC 123");
        assert_eq!(vehicle.make.as_deref(), Some("Ford"));
        assert_eq!(vehicle.model, None);
    }

    #[test]
    fn vehicle_rejects_blank_plate_and_odd_year() {
        let blank = VehicleDraft {
            plate: "   ".to_string(),
            ..VehicleDraft::default()
        };
        assert_eq!(blank.normalize(), Err(ValidationError::MissingPlate));

        let old = VehicleDraft {
            plate: "06AAA01".to_string(),
            year: Some(1850),
            ..VehicleDraft::default()
        };
        assert_eq!(old.normalize(), Err(ValidationError::YearOutOfRange(1850)));
    }

    #[test]
    fn document_type_is_normalized_and_checked() {
        let catalog = DocTypeCatalog::default();
        let draft = DocumentDraft {
            vehicle_id: 4,
            doc_type: "Muayene".to_string(),
            valid_from: Some("".to_string()),
            valid_to: "2025-01-31".to_string(),
            note: Some(" ".to_string()),
        };
        let doc = draft.normalize(&catalog).unwrap();
        assert_eq!(doc.doc_type, "inspection");
        assert_eq!(doc.valid_from, None);
        assert_eq!(doc.note, None);

        let unknown = DocumentDraft {
            vehicle_id: 4,
            doc_type: "parking permit".to_string(),
            valid_to: "2025-01-31".to_string(),
            ..DocumentDraft::default()
        };
        let err = unknown.normalize(&catalog).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported document type: parking permit (allowed: inspection, k_document, \
             kasko, service_general, service_oil, traffic_insurance)"
        );
    }

    #[test]
    fn document_dates_are_validated() {
        let catalog = DocTypeCatalog::default();
        let missing = DocumentDraft {
            doc_type: "kasko".to_string(),
            valid_to: "".to_string(),
            ..DocumentDraft::default()
        };
        assert!(matches!(
            missing.normalize(&catalog),
            Err(ValidationError::InvalidDate { field: "valid_to", .. })
        ));

        let inverted = DocumentDraft {
            doc_type: "kasko".to_string(),
            valid_from: Some("2025-02-01".to_string()),
            valid_to: "2025-01-31".to_string(),
            ..DocumentDraft::default()
        };
        assert!(matches!(
            inverted.normalize(&catalog),
            Err(ValidationError::InvertedValidity { .. })
        ));
    }

    #[test]
    fn maintenance_becomes_same_day_document() {
        let catalog = DocTypeCatalog::default();
        let draft = MaintenanceDraft {
            vehicle_id: 2,
            kind: "service_oil".to_string(),
            service_date: "2024-06-01".to_string(),
            km: Some(185000),
            remark: Some("oil change".to_string()),
        };
        let doc = draft.normalize(&catalog).unwrap();
        assert_eq!(doc.valid_from.as_deref(), Some("2024-06-01"));
        assert_eq!(doc.valid_to, "2024-06-01");
        assert_eq!(doc.note.as_deref(), Some("km=185000; oil change"));
    }

    #[test]
    fn maintenance_rejects_other_kinds_and_huge_readings() {
        let catalog = DocTypeCatalog::default();
        let wrong_kind = MaintenanceDraft {
            kind: "inspection".to_string(),
            service_date: "2024-06-01".to_string(),
            ..MaintenanceDraft::default()
        };
        assert_eq!(
            wrong_kind.normalize(&catalog),
            Err(ValidationError::NotMaintenance("inspection".to_string()))
        );

        let huge = MaintenanceDraft {
            kind: "service_general".to_string(),
            service_date: "2024-06-01".to_string(),
            km: Some(1_000_000_000),
            ..MaintenanceDraft::default()
        };
        assert_eq!(
            huge.normalize(&catalog),
            Err(ValidationError::OdometerOutOfRange(1_000_000_000))
        );
    }

    #[test]
    fn credential_is_flattened_and_redacted() {
        let request = WriteRequest {
            payload: VehicleDraft {
                plate: "06aaa01".to_string(),
                ..VehicleDraft::default()
            }
            .normalize()
            .unwrap(),
            admin_password: AdminCredential::new("hunter2"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["plate"], "06AAA01");
        assert_eq!(json["admin_password"], "hunter2");
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
