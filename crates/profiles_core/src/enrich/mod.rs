//! Enrichment capability for new profiles.
//!
//! # Responsibility
//! - Define the `ProfileEnricher` seam that guesses age, gender and
//!   nationality from a first name.
//! - Decode the lookup services' response shapes into one `Enrichment`.
//! - Turn a `ProfileDraft` into an enriched `NewProfile` before the service
//!   is called.
//!
//! # Invariants
//! - Enrichment is all-or-nothing: any enricher failure aborts the create.
//! - Retries and timeouts belong to enricher implementations, not to core.

use crate::model::profile::{NewProfile, ProfileDraft};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Attributes guessed for one first name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub age: Option<u32>,
    pub gender: Option<String>,
    #[serde(rename = "nationalize")]
    pub nationality: Option<String>,
}

/// Age lookup response, e.g. `{"count":1,"name":"Igor","age":45}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgeEstimate {
    #[serde(default)]
    pub count: u64,
    pub name: String,
    pub age: Option<u32>,
}

/// Gender lookup response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenderEstimate {
    #[serde(default)]
    pub count: u64,
    pub name: String,
    pub gender: Option<String>,
    #[serde(default)]
    pub probability: f32,
}

/// One country candidate of a nationality lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountryGuess {
    pub country_id: String,
    pub probability: f32,
}

/// Nationality lookup response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NationalityEstimate {
    #[serde(default)]
    pub count: u64,
    pub name: String,
    #[serde(default)]
    pub country: Vec<CountryGuess>,
}

impl NationalityEstimate {
    /// Most probable country code, if any candidate was returned.
    pub fn best_country(&self) -> Option<&str> {
        self.country
            .iter()
            .max_by(|left, right| left.probability.total_cmp(&right.probability))
            .map(|guess| guess.country_id.as_str())
    }
}

impl Enrichment {
    /// Combines the three lookup responses.
    pub fn from_estimates(
        age: &AgeEstimate,
        gender: &GenderEstimate,
        nationality: &NationalityEstimate,
    ) -> Self {
        Self {
            age: age.age,
            gender: gender.gender.clone().filter(|value| !value.is_empty()),
            nationality: nationality.best_country().map(str::to_string),
        }
    }
}

/// Enrichment failure; callers treat it as a plain fail/succeed boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// A lookup could not be performed.
    Unavailable { source_name: String, message: String },
    /// A lookup answered with something that could not be decoded.
    InvalidResponse { source_name: String, message: String },
}

impl Display for EnrichmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable {
                source_name,
                message,
            } => write!(f, "failed to get {source_name}: {message}"),
            Self::InvalidResponse {
                source_name,
                message,
            } => write!(f, "invalid {source_name} response: {message}"),
        }
    }
}

impl Error for EnrichmentError {}

/// Capability that guesses profile attributes from a first name.
pub trait ProfileEnricher: Send + Sync {
    fn enrich(&self, first_name: &str) -> Result<Enrichment, EnrichmentError>;
}

/// Enricher that answers every name with the same attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEnricher {
    enrichment: Enrichment,
}

impl StaticEnricher {
    pub fn new(enrichment: Enrichment) -> Self {
        Self { enrichment }
    }
}

impl ProfileEnricher for StaticEnricher {
    fn enrich(&self, _first_name: &str) -> Result<Enrichment, EnrichmentError> {
        Ok(self.enrichment.clone())
    }
}

/// Enriches a draft into the profile handed to `ProfileService::create_profile`.
pub fn enrich_draft(
    enricher: &dyn ProfileEnricher,
    draft: ProfileDraft,
) -> Result<NewProfile, EnrichmentError> {
    let enrichment = enricher.enrich(draft.name.as_str())?;
    Ok(NewProfile {
        name: draft.name,
        surname: draft.surname,
        patronymic: draft.patronymic,
        age: enrichment.age,
        gender: enrichment.gender,
        nationality: enrichment.nationality,
    })
}
