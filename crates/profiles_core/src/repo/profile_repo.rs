//! Profile store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide list/create/update/delete over the `profiles` table.
//! - Run every operation inside exactly one scoped transaction.
//! - Classify outcomes into `NotFound`, `NoChanges`, `Cancelled` and
//!   `Internal` (tagged with the operation name).
//!
//! # Invariants
//! - The store never generates identities; callers pass them in.
//! - An empty patch fails with `NoChanges` before any transaction opens.
//! - An update or delete that matches no row fails with `NotFound`, even
//!   though the patch itself was non-empty.
//! - Empty list results are `Ok(vec![])`, never an error.
//! - List order is backing-store order; there is no `ORDER BY`.

use crate::db::{ContextError, DbError, RequestContext};
use crate::logging::LogHandle;
use crate::model::profile::{
    DeletionRequest, FilterCriteria, ProfileId, ProfileRecord, UpdateCriteria,
};
use crate::repo::profile_query::{
    build_list_query, build_update_query, PROFILE_SELECT_SQL, PROFILES_TABLE,
};
use crate::repo::transaction::{run_in_transaction, TxMode};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub const OP_LIST: &str = "store.profile.list";
pub const OP_GET: &str = "store.profile.get";
pub const OP_COUNT: &str = "store.profile.count";
pub const OP_CREATE: &str = "store.profile.create";
pub const OP_UPDATE: &str = "store.profile.update";
pub const OP_DELETE: &str = "store.profile.delete";

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-boundary error for profile operations.
#[derive(Debug)]
pub enum StoreError {
    /// The targeted identity matched no row.
    NotFound(ProfileId),
    /// The patch sets no field.
    NoChanges,
    /// The request context was cancelled or its deadline passed.
    Cancelled {
        op: &'static str,
        reason: ContextError,
    },
    /// A stored row violates the model (e.g. negative age).
    InvalidData(String),
    /// Any other driver, constraint or connectivity failure.
    Internal { op: &'static str, source: DbError },
}

impl StoreError {
    pub fn internal(op: &'static str, err: rusqlite::Error) -> Self {
        Self::Internal {
            op,
            source: DbError::Sqlite(err),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(guid) => write!(f, "profile not found: {guid}"),
            Self::NoChanges => write!(f, "no changes"),
            Self::Cancelled { op, reason } => write!(f, "{op}: {reason}"),
            Self::InvalidData(message) => write!(f, "invalid persisted profile data: {message}"),
            Self::Internal { op, source } => write!(f, "{op}: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cancelled { reason, .. } => Some(reason),
            Self::Internal { source, .. } => Some(source),
            Self::NotFound(_) | Self::NoChanges | Self::InvalidData(_) => None,
        }
    }
}

trait InOp<T> {
    fn in_op(self, op: &'static str) -> StoreResult<T>;
}

impl<T> InOp<T> for rusqlite::Result<T> {
    fn in_op(self, op: &'static str) -> StoreResult<T> {
        self.map_err(|err| StoreError::internal(op, err))
    }
}

/// Repository interface for profile persistence.
pub trait ProfileStore {
    fn list_profiles(
        &mut self,
        ctx: &RequestContext,
        criteria: &FilterCriteria,
    ) -> StoreResult<Vec<ProfileRecord>>;
    fn get_profile(
        &mut self,
        ctx: &RequestContext,
        guid: &str,
    ) -> StoreResult<Option<ProfileRecord>>;
    fn count_profiles(&mut self, ctx: &RequestContext) -> StoreResult<u64>;
    fn create_profile(
        &mut self,
        ctx: &RequestContext,
        profile: &ProfileRecord,
    ) -> StoreResult<ProfileId>;
    fn update_profile(
        &mut self,
        ctx: &RequestContext,
        criteria: &UpdateCriteria,
    ) -> StoreResult<ProfileId>;
    fn delete_profile(
        &mut self,
        ctx: &RequestContext,
        request: &DeletionRequest,
    ) -> StoreResult<ProfileId>;
}

/// SQLite-backed profile store over a migrated connection.
pub struct SqliteProfileStore<'conn> {
    conn: &'conn mut Connection,
    log: LogHandle,
}

impl<'conn> SqliteProfileStore<'conn> {
    pub fn new(conn: &'conn mut Connection, log: LogHandle) -> Self {
        Self { conn, log }
    }
}

impl ProfileStore for SqliteProfileStore<'_> {
    fn list_profiles(
        &mut self,
        ctx: &RequestContext,
        criteria: &FilterCriteria,
    ) -> StoreResult<Vec<ProfileRecord>> {
        let started_at = Instant::now();
        let statement = build_list_query(criteria);

        let profiles = run_in_transaction(self.conn, ctx, TxMode::Read, OP_LIST, &self.log, |tx| {
            let mut stmt = tx.prepare(&statement.sql).in_op(OP_LIST)?;
            let mut rows = stmt
                .query(params_from_iter(statement.params.iter()))
                .in_op(OP_LIST)?;
            let mut profiles = Vec::new();
            while let Some(row) = rows.next().in_op(OP_LIST)? {
                profiles.push(parse_profile_row(row, OP_LIST)?);
            }
            Ok(profiles)
        })?;

        self.log.debug(
            "profile_list",
            "ok",
            format_args!(
                "predicates={} rows={} duration_ms={}",
                statement.params.len().saturating_sub(2),
                profiles.len(),
                started_at.elapsed().as_millis()
            ),
        );
        Ok(profiles)
    }

    fn get_profile(
        &mut self,
        ctx: &RequestContext,
        guid: &str,
    ) -> StoreResult<Option<ProfileRecord>> {
        let sql = format!("{PROFILE_SELECT_SQL} WHERE guid = ?1;");
        run_in_transaction(self.conn, ctx, TxMode::Read, OP_GET, &self.log, |tx| {
            let mut stmt = tx.prepare(&sql).in_op(OP_GET)?;
            let mut rows = stmt.query([guid]).in_op(OP_GET)?;
            match rows.next().in_op(OP_GET)? {
                Some(row) => Ok(Some(parse_profile_row(row, OP_GET)?)),
                None => Ok(None),
            }
        })
    }

    fn count_profiles(&mut self, ctx: &RequestContext) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {PROFILES_TABLE};");
        let count = run_in_transaction(self.conn, ctx, TxMode::Read, OP_COUNT, &self.log, |tx| {
            tx.query_row(&sql, [], |row| row.get::<_, i64>(0))
                .in_op(OP_COUNT)
        })?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative row count `{count}`")))
    }

    fn create_profile(
        &mut self,
        ctx: &RequestContext,
        profile: &ProfileRecord,
    ) -> StoreResult<ProfileId> {
        let started_at = Instant::now();
        let guid = run_in_transaction(self.conn, ctx, TxMode::Write, OP_CREATE, &self.log, |tx| {
            tx.query_row(
                "INSERT INTO profiles (
                    guid,
                    name,
                    surname,
                    patronymic,
                    age,
                    gender,
                    nationalize
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING guid;",
                params![
                    profile.guid.as_str(),
                    profile.name.as_str(),
                    profile.surname.as_str(),
                    profile.patronymic.as_deref(),
                    profile.age,
                    profile.gender.as_deref(),
                    profile.nationality.as_deref(),
                ],
                |row| row.get::<_, String>(0),
            )
            .in_op(OP_CREATE)
        })?;

        self.log.debug(
            "profile_create",
            "ok",
            format_args!(
                "guid={} duration_ms={}",
                guid,
                started_at.elapsed().as_millis()
            ),
        );
        Ok(guid)
    }

    fn update_profile(
        &mut self,
        ctx: &RequestContext,
        criteria: &UpdateCriteria,
    ) -> StoreResult<ProfileId> {
        let Some(statement) = build_update_query(criteria) else {
            return Err(StoreError::NoChanges);
        };

        let updated = run_in_transaction(self.conn, ctx, TxMode::Write, OP_UPDATE, &self.log, |tx| {
            tx.query_row(
                &statement.sql,
                params_from_iter(statement.params.iter()),
                |row| row.get::<_, String>(0),
            )
            .optional()
            .in_op(OP_UPDATE)
        })?;

        match updated {
            Some(guid) => {
                self.log.debug(
                    "profile_update",
                    "ok",
                    format_args!("guid={} assignments={}", guid, statement.params.len() - 1),
                );
                Ok(guid)
            }
            None => Err(StoreError::NotFound(criteria.guid.clone())),
        }
    }

    fn delete_profile(
        &mut self,
        ctx: &RequestContext,
        request: &DeletionRequest,
    ) -> StoreResult<ProfileId> {
        let changed = run_in_transaction(self.conn, ctx, TxMode::Write, OP_DELETE, &self.log, |tx| {
            tx.execute(
                "DELETE FROM profiles WHERE guid = ?1;",
                [request.guid.as_str()],
            )
            .in_op(OP_DELETE)
        })?;

        if changed == 0 {
            return Err(StoreError::NotFound(request.guid.clone()));
        }

        self.log.debug(
            "profile_delete",
            "ok",
            format_args!("guid={}", request.guid),
        );
        Ok(request.guid.clone())
    }
}

fn parse_profile_row(row: &Row<'_>, op: &'static str) -> StoreResult<ProfileRecord> {
    let guid: String = row.get("guid").in_op(op)?;
    let age = match row.get::<_, Option<i64>>("age").in_op(op)? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid age value `{value}` in profiles.age for guid `{guid}`"
            ))
        })?),
        None => None,
    };

    Ok(ProfileRecord {
        name: row.get("name").in_op(op)?,
        surname: row.get("surname").in_op(op)?,
        patronymic: row.get("patronymic").in_op(op)?,
        age,
        gender: row.get("gender").in_op(op)?,
        nationality: row.get("nationalize").in_op(op)?,
        guid,
    })
}
