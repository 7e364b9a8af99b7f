//! Profile use-case service.
//!
//! # Responsibility
//! - Validate caller input, generate identities for new profiles and
//!   delegate persistence to a `ProfileStore`.
//! - Remap store error kinds to service error kinds one-to-one.
//!
//! # Invariants
//! - Identities are UUID v4 strings generated here, never by the store.
//! - The service never calls the enrichment capability; it receives
//!   already-enriched `NewProfile` values.

use crate::db::{ContextError, RequestContext};
use crate::logging::LogHandle;
use crate::model::profile::{
    DeletionRequest, FilterCriteria, NewProfile, ProfileId, ProfileRecord,
    ProfileValidationError, UpdateCriteria,
};
use crate::repo::profile_repo::{ProfileStore, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for profile use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before reaching storage.
    InvalidRequest(ProfileValidationError),
    /// Target profile does not exist.
    ProfileNotFound(ProfileId),
    /// Update patch sets no field.
    NoChanges,
    /// Request context was cancelled or timed out.
    Cancelled(ContextError),
    /// Any other persistence failure.
    Store(StoreError),
}

impl ServiceError {
    /// Whether outer layers should answer with a conflict-style response.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ProfileNotFound(_) | Self::NoChanges)
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(err) => write!(f, "invalid request: {err}"),
            Self::ProfileNotFound(guid) => write!(f, "profile not found: {guid}"),
            Self::NoChanges => write!(f, "no changes"),
            Self::Cancelled(reason) => write!(f, "{reason}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRequest(err) => Some(err),
            Self::Cancelled(reason) => Some(reason),
            Self::Store(err) => Some(err),
            Self::ProfileNotFound(_) | Self::NoChanges => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(guid) => Self::ProfileNotFound(guid),
            StoreError::NoChanges => Self::NoChanges,
            StoreError::Cancelled { reason, .. } => Self::Cancelled(reason),
            other => Self::Store(other),
        }
    }
}

impl From<ProfileValidationError> for ServiceError {
    fn from(value: ProfileValidationError) -> Self {
        Self::InvalidRequest(value)
    }
}

/// Profile service facade over a store implementation.
pub struct ProfileService<S: ProfileStore> {
    store: S,
    log: LogHandle,
}

impl<S: ProfileStore> ProfileService<S> {
    pub fn new(store: S, log: LogHandle) -> Self {
        Self { store, log }
    }

    /// Lists profiles matching `criteria`; an empty page is `Ok(vec![])`.
    pub fn list_profiles(
        &mut self,
        ctx: &RequestContext,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ProfileRecord>, ServiceError> {
        const EVENT: &str = "profile_list";
        self.log.info(
            EVENT,
            "start",
            format_args!("page={} page_size={}", criteria.page, criteria.page_size),
        );
        self.reject_invalid(EVENT, criteria.validate())?;

        let result = self.store.list_profiles(ctx, criteria);
        self.finish(EVENT, result, |profiles| format!("rows={}", profiles.len()))
    }

    /// Gets one profile by identity.
    pub fn get_profile(
        &mut self,
        ctx: &RequestContext,
        guid: &str,
    ) -> Result<ProfileRecord, ServiceError> {
        const EVENT: &str = "profile_get";
        self.log.info(EVENT, "start", format_args!("guid={guid}"));

        let result = self
            .store
            .get_profile(ctx, guid)
            .and_then(|found| found.ok_or_else(|| StoreError::NotFound(guid.to_string())));
        self.finish(EVENT, result, |profile| format!("guid={}", profile.guid))
    }

    /// Counts stored profiles.
    pub fn count_profiles(&mut self, ctx: &RequestContext) -> Result<u64, ServiceError> {
        const EVENT: &str = "profile_count";
        self.log.info(EVENT, "start", format_args!(""));

        let result = self.store.count_profiles(ctx);
        self.finish(EVENT, result, |count| format!("count={count}"))
    }

    /// Assigns a fresh identity to `profile` and persists it.
    pub fn create_profile(
        &mut self,
        ctx: &RequestContext,
        profile: NewProfile,
    ) -> Result<ProfileId, ServiceError> {
        const EVENT: &str = "profile_create";
        self.log.info(EVENT, "start", format_args!(""));
        self.reject_invalid(EVENT, profile.validate())?;

        let record = profile.into_record(Uuid::new_v4().to_string());
        let result = self.store.create_profile(ctx, &record);
        self.finish(EVENT, result, |guid| format!("guid={guid}"))
    }

    /// Applies a sparse patch and returns the patched identity.
    pub fn update_profile(
        &mut self,
        ctx: &RequestContext,
        criteria: &UpdateCriteria,
    ) -> Result<ProfileId, ServiceError> {
        const EVENT: &str = "profile_update";
        self.log
            .info(EVENT, "start", format_args!("guid={}", criteria.guid));
        self.reject_invalid(EVENT, criteria.validate())?;

        let result = self.store.update_profile(ctx, criteria);
        self.finish(EVENT, result, |guid| format!("guid={guid}"))
    }

    /// Physically deletes one profile and returns its identity.
    pub fn delete_profile(
        &mut self,
        ctx: &RequestContext,
        request: &DeletionRequest,
    ) -> Result<ProfileId, ServiceError> {
        const EVENT: &str = "profile_delete";
        self.log
            .info(EVENT, "start", format_args!("guid={}", request.guid));
        self.reject_invalid(EVENT, request.validate())?;

        let result = self.store.delete_profile(ctx, request);
        self.finish(EVENT, result, |guid| format!("guid={guid}"))
    }

    fn reject_invalid(
        &self,
        event: &str,
        validation: Result<(), ProfileValidationError>,
    ) -> Result<(), ServiceError> {
        validation.map_err(|err| {
            self.log
                .warn(event, "rejected", format_args!("error=\"{err}\""));
            ServiceError::InvalidRequest(err)
        })
    }

    fn finish<T>(
        &self,
        event: &str,
        result: Result<T, StoreError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, ServiceError> {
        match result {
            Ok(value) => {
                self.log.info(event, "ok", format_args!("{}", describe(&value)));
                Ok(value)
            }
            Err(err) => {
                let mapped = ServiceError::from(err);
                match &mapped {
                    ServiceError::ProfileNotFound(guid) => {
                        self.log.warn(event, "not_found", format_args!("guid={guid}"))
                    }
                    ServiceError::NoChanges => {
                        self.log.warn(event, "no_changes", format_args!(""))
                    }
                    ServiceError::Cancelled(reason) => {
                        self.log.warn(event, "cancelled", format_args!("reason=\"{reason}\""))
                    }
                    other => self
                        .log
                        .error(event, "error", format_args!("error=\"{other}\"")),
                }
                Err(mapped)
            }
        }
    }
}
