//! Profile persistence: query composition, transaction scope and store.
//!
//! # Responsibility
//! - Turn sparse criteria into parameterized SQL.
//! - Isolate SQLite details from service orchestration.
//!
//! # Invariants
//! - Every store operation runs inside exactly one transaction scope.
//! - Store APIs return semantic errors (`NotFound`, `NoChanges`) in addition
//!   to driver failures.

pub mod profile_query;
pub mod profile_repo;
pub mod transaction;
