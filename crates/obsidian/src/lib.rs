pub mod vault;

pub use vault::{VaultStats, build_vault};
