//! Scoped transaction execution for profile store operations.
//!
//! # Responsibility
//! - Run exactly one store operation inside one SQLite transaction.
//! - Abort in-flight statements when the request context is done.
//! - Translate begin/commit/interrupt failures into `StoreError`.
//!
//! # Invariants
//! - Exactly one of commit or rollback runs on every exit path; on unwind
//!   the dropped `Transaction` rolls back.
//! - The interrupt hook is bound to the calling context only while `work`
//!   runs and is cleared before commit/rollback.
//! - A commit failure replaces an otherwise successful result.

use crate::db::{ContextError, RequestContext};
use crate::logging::LogHandle;
use crate::repo::profile_repo::{StoreError, StoreResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// SQLite VM instructions between two context checks while a statement runs.
const INTERRUPT_CHECK_INTERVAL_OPS: i32 = 1_000;

/// Locking mode for a scoped transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Shared lock acquired lazily; used by list/get.
    Read,
    /// Reserved lock acquired at `BEGIN`; used by create/update/delete.
    Write,
}

impl TxMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            Self::Read => TransactionBehavior::Deferred,
            Self::Write => TransactionBehavior::Immediate,
        }
    }
}

/// Binds SQLite's progress handler to a request context; clears it on drop.
struct InterruptHook<'a> {
    conn: &'a Connection,
}

impl<'a> InterruptHook<'a> {
    fn install(conn: &'a Connection, ctx: &RequestContext) -> Self {
        let ctx = ctx.clone();
        conn.progress_handler(INTERRUPT_CHECK_INTERVAL_OPS, Some(move || ctx.is_done()));
        Self { conn }
    }
}

impl Drop for InterruptHook<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Runs `work` inside one transaction scoped to `ctx`.
///
/// `op` names the calling operation and is attached to every error.
pub fn run_in_transaction<T, F>(
    conn: &mut Connection,
    ctx: &RequestContext,
    mode: TxMode,
    op: &'static str,
    log: &LogHandle,
    work: F,
) -> StoreResult<T>
where
    F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
{
    ctx.check()
        .map_err(|reason| StoreError::Cancelled { op, reason })?;

    let tx = conn
        .transaction_with_behavior(mode.behavior())
        .map_err(|err| classify(StoreError::internal(op, err), ctx))?;

    let hook = InterruptHook::install(&tx, ctx);
    let outcome = work(&tx);
    drop(hook);

    match outcome {
        Ok(value) => {
            if let Err(reason) = ctx.check() {
                rollback(tx, op, log);
                return Err(StoreError::Cancelled { op, reason });
            }
            tx.commit()
                .map_err(|err| classify(StoreError::internal(op, err), ctx))?;
            Ok(value)
        }
        Err(err) => {
            rollback(tx, op, log);
            Err(classify(err, ctx))
        }
    }
}

fn rollback(tx: Transaction<'_>, op: &'static str, log: &LogHandle) {
    if let Err(err) = tx.rollback() {
        log.warn(
            "tx_rollback",
            "error",
            format_args!("op={op} error={err}"),
        );
    }
}

/// Reports interrupted statements as cancellation with the context's reason.
fn classify(err: StoreError, ctx: &RequestContext) -> StoreError {
    match err {
        StoreError::Internal { op, source } if source.is_interrupt() => StoreError::Cancelled {
            op,
            reason: ctx.err().unwrap_or(ContextError::Canceled),
        },
        other => other,
    }
}
