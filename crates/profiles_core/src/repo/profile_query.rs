//! Parameterized SQL composition for profile list/update statements.
//!
//! # Responsibility
//! - Turn sparse `FilterCriteria` / `UpdateCriteria` into SQL text plus an
//!   ordered bind list.
//!
//! # Invariants
//! - Only column names and operators are written into SQL text; every value
//!   is a bound parameter.
//! - Placeholders are `?1..?n` in bind-list order, without gaps.
//! - List queries carry no `WHERE` when no predicate is set and always end
//!   with `LIMIT`/`OFFSET` placeholders.
//! - The builder does not validate pagination; callers reject `page < 1`.

use crate::model::profile::{FilterCriteria, UpdateCriteria};
use rusqlite::types::Value;

pub(crate) const PROFILES_TABLE: &str = "profiles";

pub(crate) const PROFILE_SELECT_SQL: &str = "SELECT
    guid,
    name,
    surname,
    patronymic,
    age,
    gender,
    nationalize
FROM profiles";

/// Column of the `profiles` table that criteria may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfileColumn {
    Guid,
    Name,
    Surname,
    Patronymic,
    Age,
    Gender,
    Nationality,
}

impl ProfileColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Guid => "guid",
            Self::Name => "name",
            Self::Surname => "surname",
            Self::Patronymic => "patronymic",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Nationality => "nationalize",
        }
    }
}

/// SQL text with its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Accumulates clauses and their bound values, issuing sequential placeholders.
#[derive(Debug, Default)]
struct ClauseList {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl ClauseList {
    /// Binds `value` and returns its placeholder.
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn push(&mut self, column: ProfileColumn, operator: &str, value: Value) {
        let placeholder = self.bind(value);
        let clause = format!("{} {operator} {placeholder}", column.as_str());
        self.clauses.push(clause);
    }

    fn push_text(&mut self, column: ProfileColumn, operator: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.push(column, operator, Value::Text(value.clone()));
        }
    }

    fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Builds the paged `SELECT` for a list filter.
///
/// Predicate order is name, surname, patronymic, gender, nationality, age.
pub fn build_list_query(criteria: &FilterCriteria) -> SqlStatement {
    let mut predicates = ClauseList::default();
    predicates.push_text(ProfileColumn::Name, "LIKE", criteria.name.as_ref());
    predicates.push_text(ProfileColumn::Surname, "LIKE", criteria.surname.as_ref());
    predicates.push_text(
        ProfileColumn::Patronymic,
        "LIKE",
        criteria.patronymic.as_ref(),
    );
    predicates.push_text(ProfileColumn::Gender, "LIKE", criteria.gender.as_ref());
    predicates.push_text(
        ProfileColumn::Nationality,
        "LIKE",
        criteria.nationality.as_ref(),
    );
    if let Some(age) = criteria.age {
        predicates.push(
            ProfileColumn::Age,
            criteria.age_comparison.sql_operator(),
            Value::Integer(i64::from(age)),
        );
    }

    let mut sql = String::from(PROFILE_SELECT_SQL);
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.clauses.join(" AND "));
    }

    let page_size = i64::from(criteria.page_size);
    // Offsets past i64::MAX clamp; SQLite then returns no rows.
    let skipped_pages = i64::from(criteria.page.saturating_sub(1));
    let offset = skipped_pages.saturating_mul(page_size);
    let limit_placeholder = predicates.bind(Value::Integer(page_size));
    let offset_placeholder = predicates.bind(Value::Integer(offset));
    sql.push_str(&format!(
        " LIMIT {limit_placeholder} OFFSET {offset_placeholder};"
    ));

    SqlStatement {
        sql,
        params: predicates.params,
    }
}

/// Builds `UPDATE ... RETURNING guid` for a patch, or `None` when the patch
/// sets no field.
pub fn build_update_query(criteria: &UpdateCriteria) -> Option<SqlStatement> {
    let mut assignments = ClauseList::default();
    assignments.push_text(ProfileColumn::Name, "=", criteria.name.as_ref());
    assignments.push_text(ProfileColumn::Surname, "=", criteria.surname.as_ref());
    assignments.push_text(
        ProfileColumn::Patronymic,
        "=",
        criteria.patronymic.as_ref(),
    );
    if let Some(age) = criteria.age {
        assignments.push(ProfileColumn::Age, "=", Value::Integer(i64::from(age)));
    }
    assignments.push_text(ProfileColumn::Gender, "=", criteria.gender.as_ref());
    assignments.push_text(
        ProfileColumn::Nationality,
        "=",
        criteria.nationality.as_ref(),
    );

    if assignments.is_empty() {
        return None;
    }

    let set_list = assignments.clauses.join(", ");
    let guid_placeholder = assignments.bind(Value::Text(criteria.guid.clone()));
    let sql = format!(
        "UPDATE {PROFILES_TABLE} SET {set_list} WHERE {} = {guid_placeholder} RETURNING {};",
        ProfileColumn::Guid.as_str(),
        ProfileColumn::Guid.as_str(),
    );

    Some(SqlStatement {
        sql,
        params: assignments.params,
    })
}
