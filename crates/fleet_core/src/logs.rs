//! Damage and expense logs kept next to the vehicle records.
//!
//! Attachments travel as base64 blobs on the wire; they are not read here.

use crate::status::parse_date;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum DamageSeverity {
    #[default]
    #[serde(rename = "Hafif")]
    Light,
    #[serde(rename = "Orta")]
    Moderate,
    #[serde(rename = "Ağır")]
    Severe,
}

impl DamageSeverity {
    /// Unrecognized severities are recorded as light.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Orta" => Self::Moderate,
            "Ağır" => Self::Severe,
            _ => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "Hafif",
            Self::Moderate => "Orta",
            Self::Severe => "Ağır",
        }
    }
}

/// Damage row as returned by `/api/damages`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DamageRecord {
    pub id: i64,
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    pub plate: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Damage {
    pub id: i64,
    pub plate: String,
    pub title: String,
    pub description: String,
    pub severity: DamageSeverity,
    pub occurred_on: String,
    pub recorded_on: String,
}

impl DamageRecord {
    /// `occurred_at` falls back to `created_at` and the other way round;
    /// `today` fills in when neither parses.
    pub fn into_damage(self, today: Date) -> Damage {
        let occurred = first_date(&[&self.occurred_at, &self.created_at]).unwrap_or(today);
        let recorded = first_date(&[&self.created_at, &self.occurred_at]).unwrap_or(today);
        Damage {
            id: self.id,
            plate: self.plate,
            title: self.title,
            description: self.description.unwrap_or_default(),
            severity: DamageSeverity::parse(&self.severity),
            occurred_on: occurred.to_string(),
            recorded_on: recorded.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AmountField {
    Number(f64),
    Text(String),
}

/// Expense row as returned by `/api/expenses`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExpenseRecord {
    pub id: i64,
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    pub plate: String,
    pub category: String,
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expense_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Expense {
    pub id: i64,
    pub plate: String,
    pub category: String,
    /// NaN when the API sent something that is not a number.
    pub amount: f64,
    pub description: String,
    pub expense_date: String,
    pub recorded_on: String,
}

impl ExpenseRecord {
    pub fn into_expense(self, today: Date) -> Expense {
        let expense_date = first_date(&[&self.expense_date, &self.created_at]).unwrap_or(today);
        let recorded = parse_optional(&self.created_at).unwrap_or(expense_date);
        let amount = match self.amount {
            Some(AmountField::Number(value)) => value,
            Some(AmountField::Text(raw)) => raw.trim().parse().unwrap_or(f64::NAN),
            None => 0.0,
        };
        Expense {
            id: self.id,
            plate: self.plate,
            category: self.category,
            amount,
            description: self.description.unwrap_or_default(),
            expense_date: expense_date.to_string(),
            recorded_on: recorded.to_string(),
        }
    }
}

/// Sum of all finite amounts.
pub fn total_expense(expenses: &[Expense]) -> f64 {
    expenses
        .iter()
        .map(|expense| expense.amount)
        .filter(|amount| amount.is_finite())
        .sum()
}

fn parse_optional(raw: &Option<String>) -> Option<Date> {
    raw.as_deref().and_then(parse_date)
}

fn first_date(candidates: &[&Option<String>]) -> Option<Date> {
    candidates.iter().find_map(|raw| parse_optional(raw))
}
