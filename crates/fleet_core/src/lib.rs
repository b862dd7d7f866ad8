pub mod config;
pub mod doc_types;
pub mod drafts;
pub mod error;
pub mod feed;
pub mod logs;
pub mod odometer;
pub mod reminders;
pub mod rollup;
pub mod schema;
pub mod status;

pub use config::FleetConfig;
pub use error::ValidationError;
pub use status::{Classification, StatusLabel, Thresholds, classify, parse_date};
