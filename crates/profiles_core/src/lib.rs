//! Core persistence and use-case logic for person profiles.
//! This crate owns query composition, transaction scoping and error mapping.

pub mod config;
pub mod db;
pub mod enrich;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{CancelHandle, ContextError, RequestContext};
pub use enrich::{enrich_draft, Enrichment, EnrichmentError, ProfileEnricher, StaticEnricher};
pub use logging::{default_log_level, init_logging, logging_status, LogHandle};
pub use model::profile::{
    AgeComparison, DeletionRequest, FilterCriteria, NewProfile, ProfileDraft, ProfileId,
    ProfileRecord, ProfileValidationError, UpdateCriteria,
};
pub use repo::profile_query::{build_list_query, build_update_query, SqlStatement};
pub use repo::profile_repo::{ProfileStore, SqliteProfileStore, StoreError, StoreResult};
pub use repo::transaction::{run_in_transaction, TxMode};
pub use service::profile_service::{ProfileService, ServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
