//! Profile domain model and criteria objects.
//!
//! # Responsibility
//! - Define the stored person record and the sparse filter/patch shapes.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - `guid` is assigned once by the service and never changes.
//! - Optional attributes are `Option`; `Some(0)` age is a real value, not
//!   "unset".
//! - Builders and stores never validate; the service calls `validate()`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque profile identity. Shape is not validated; the service issues UUIDs.
pub type ProfileId = String;

pub const NAME_MAX_CHARS: usize = 20;
pub const SURNAME_MAX_CHARS: usize = 30;
pub const PATRONYMIC_MAX_CHARS: usize = 25;
pub const GENDER_MAX_CHARS: usize = 6;
pub const AGE_MAX: u32 = 130;

static NATIONALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,3}$").expect("valid nationality regex"));

/// Stored person profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub guid: ProfileId,
    pub name: String,
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Country-code guess. Serialized as `nationalize` to match the public API.
    #[serde(
        default,
        rename = "nationalize",
        skip_serializing_if = "Option::is_none"
    )]
    pub nationality: Option<String>,
}

/// Create request before enrichment: only the caller-supplied names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            patronymic: None,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        check_len("name", &self.name, 1, NAME_MAX_CHARS)?;
        check_len("surname", &self.surname, 1, SURNAME_MAX_CHARS)?;
        check_optional_len(
            "patronymic",
            self.patronymic.as_deref(),
            1,
            PATRONYMIC_MAX_CHARS,
        )
    }
}

/// Enriched profile that has not been assigned an identity yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, rename = "nationalize")]
    pub nationality: Option<String>,
}

impl NewProfile {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        check_len("name", &self.name, 1, NAME_MAX_CHARS)?;
        check_len("surname", &self.surname, 1, SURNAME_MAX_CHARS)?;
        check_optional_len(
            "patronymic",
            self.patronymic.as_deref(),
            1,
            PATRONYMIC_MAX_CHARS,
        )?;
        check_attributes(self.age, self.gender.as_deref(), self.nationality.as_deref())
    }

    /// Attaches an identity, producing the record persisted by the store.
    pub fn into_record(self, guid: ProfileId) -> ProfileRecord {
        ProfileRecord {
            guid,
            name: self.name,
            surname: self.surname,
            patronymic: self.patronymic,
            age: self.age,
            gender: self.gender,
            nationality: self.nationality,
        }
    }
}

/// Direction of the single-sided age comparison in list filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgeComparison {
    /// `age > value`.
    Greater,
    /// `age < value`.
    #[default]
    Less,
}

impl AgeComparison {
    pub fn from_greater_flag(greater: bool) -> Self {
        if greater {
            Self::Greater
        } else {
            Self::Less
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
        }
    }
}

/// `AgeComparison` as the boolean `greater` field of list requests.
mod greater_flag {
    use super::AgeComparison;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        comparison: &AgeComparison,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*comparison == AgeComparison::Greater)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<AgeComparison, D::Error> {
        bool::deserialize(deserializer).map(AgeComparison::from_greater_flag)
    }
}

/// Sparse list filter with mandatory pagination.
///
/// Text fields are `LIKE` patterns bound verbatim; `%` and `_` are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    /// Only consulted when `age` is set. Travels as the `greater` flag.
    #[serde(default, rename = "greater", with = "greater_flag")]
    pub age_comparison: AgeComparison,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, rename = "nationalize")]
    pub nationality: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl FilterCriteria {
    /// Filter with no predicates for the given page.
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            name: None,
            surname: None,
            patronymic: None,
            age: None,
            age_comparison: AgeComparison::default(),
            gender: None,
            nationality: None,
            page,
            page_size,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.page < 1 {
            return Err(ProfileValidationError::InvalidPage(self.page));
        }
        if self.page_size < 1 {
            return Err(ProfileValidationError::InvalidPageSize(self.page_size));
        }
        Ok(())
    }
}

/// Sparse patch addressed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCriteria {
    pub guid: ProfileId,
    #[serde(default, rename = "new_name")]
    pub name: Option<String>,
    #[serde(default, rename = "new_surname")]
    pub surname: Option<String>,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, rename = "nationalize")]
    pub nationality: Option<String>,
}

impl UpdateCriteria {
    /// Empty patch for `guid`.
    pub fn for_guid(guid: impl Into<ProfileId>) -> Self {
        Self {
            guid: guid.into(),
            ..Self::default()
        }
    }

    /// Returns whether at least one field would be assigned.
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.surname.is_some()
            || self.patronymic.is_some()
            || self.age.is_some()
            || self.gender.is_some()
            || self.nationality.is_some()
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.guid.trim().is_empty() {
            return Err(ProfileValidationError::EmptyIdentity);
        }
        check_optional_len("name", self.name.as_deref(), 1, NAME_MAX_CHARS)?;
        check_optional_len("surname", self.surname.as_deref(), 1, SURNAME_MAX_CHARS)?;
        check_optional_len(
            "patronymic",
            self.patronymic.as_deref(),
            1,
            PATRONYMIC_MAX_CHARS,
        )?;
        check_attributes(self.age, self.gender.as_deref(), self.nationality.as_deref())
    }
}

/// Physical delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub guid: ProfileId,
}

impl DeletionRequest {
    pub fn new(guid: impl Into<ProfileId>) -> Self {
        Self { guid: guid.into() }
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.guid.trim().is_empty() {
            return Err(ProfileValidationError::EmptyIdentity);
        }
        Ok(())
    }
}

/// Caller input rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    EmptyIdentity,
    InvalidPage(u32),
    InvalidPageSize(u32),
    FieldLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    AgeOutOfRange(u32),
    InvalidNationality(String),
}

impl Display for ProfileValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyIdentity => write!(f, "field guid is a required field"),
            Self::InvalidPage(page) => write!(f, "page must be >= 1, got {page}"),
            Self::InvalidPageSize(size) => write!(f, "page_size must be >= 1, got {size}"),
            Self::FieldLength {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "field {field} must have {min}..={max} characters, got {actual}"
            ),
            Self::AgeOutOfRange(age) => write!(f, "field age must be <= {AGE_MAX}, got {age}"),
            Self::InvalidNationality(value) => write!(
                f,
                "field nationalize must be 1..=3 ASCII letters, got `{value}`"
            ),
        }
    }
}

impl Error for ProfileValidationError {}

fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ProfileValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ProfileValidationError::FieldLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

fn check_optional_len(
    field: &'static str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<(), ProfileValidationError> {
    match value {
        Some(value) => check_len(field, value, min, max),
        None => Ok(()),
    }
}

fn check_attributes(
    age: Option<u32>,
    gender: Option<&str>,
    nationality: Option<&str>,
) -> Result<(), ProfileValidationError> {
    if let Some(age) = age {
        if age > AGE_MAX {
            return Err(ProfileValidationError::AgeOutOfRange(age));
        }
    }
    check_optional_len("gender", gender, 0, GENDER_MAX_CHARS)?;
    if let Some(value) = nationality {
        if !NATIONALITY_RE.is_match(value) {
            return Err(ProfileValidationError::InvalidNationality(
                value.to_string(),
            ));
        }
    }
    Ok(())
}
