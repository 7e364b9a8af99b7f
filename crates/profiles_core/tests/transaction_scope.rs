use profiles_core::db::{open_db, open_db_in_memory};
use profiles_core::{
    run_in_transaction, ContextError, LogHandle, NewProfile, ProfileService, ProfileStore,
    RequestContext, SqliteProfileStore, StoreError, StoreResult, TxMode,
};
use rusqlite::Connection;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const OP: &str = "test.tx";

const LONG_QUERY: &str = "WITH RECURSIVE counter(x) AS (
        SELECT 1
        UNION ALL
        SELECT x + 1 FROM counter WHERE x < 1000000000
    )
    SELECT COUNT(*) FROM counter;";

fn insert(conn: &Connection, guid: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO profiles (guid, name, surname) VALUES (?1, 'Igor', 'Zaycev');",
        [guid],
    )
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM profiles;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn successful_work_is_committed() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::background();
    let log = LogHandle::silent("tx");

    let inserted = run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| {
        insert(tx, "g-1").map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap();

    assert_eq!(inserted, 1);
    assert_eq!(row_count(&conn), 1);
    assert!(conn.is_autocommit());
}

#[test]
fn failed_work_is_rolled_back_with_its_error() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::background();
    let log = LogHandle::silent("tx");

    let err = run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| {
        insert(tx, "g-1").map_err(|err| StoreError::internal(OP, err))?;
        Err::<(), _>(StoreError::NotFound("g-2".to_string()))
    })
    .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(guid) if guid == "g-2"));
    assert_eq!(row_count(&conn), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn commit_failure_replaces_the_result_and_discards_the_writes() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE owners (id INTEGER PRIMARY KEY);
         CREATE TABLE pets (
             id INTEGER PRIMARY KEY,
             owner_id INTEGER NOT NULL
                 REFERENCES owners(id) DEFERRABLE INITIALLY DEFERRED
         );",
    )
    .unwrap();
    let ctx = RequestContext::background();
    let log = LogHandle::silent("tx");

    let err = run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| {
        tx.execute("INSERT INTO pets (id, owner_id) VALUES (1, 42);", [])
            .map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap_err();

    assert!(matches!(err, StoreError::Internal { op: OP, .. }));
    assert!(conn.is_autocommit());
    let pets: i64 = conn
        .query_row("SELECT COUNT(*) FROM pets;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(pets, 0);
}

#[test]
fn cancellation_during_work_discards_the_writes() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::background();
    let cancel = ctx.cancel_handle();
    let log = LogHandle::silent("tx");

    let err = run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| {
        insert(tx, "g-1").map_err(|err| StoreError::internal(OP, err))?;
        cancel.cancel();
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Cancelled {
            op: OP,
            reason: ContextError::Canceled
        }
    ));
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn deadline_interrupts_a_running_statement() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::with_timeout(Duration::from_millis(50));
    let log = LogHandle::silent("tx");

    let err = run_in_transaction(&mut conn, &ctx, TxMode::Read, OP, &log, |tx| {
        tx.query_row(LONG_QUERY, [], |row| row.get::<_, i64>(0))
            .map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Cancelled {
            op: OP,
            reason: ContextError::DeadlineExceeded
        }
    ));

    let live = RequestContext::background();
    let count = run_in_transaction(&mut conn, &live, TxMode::Read, OP, &log, |tx| {
        tx.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
            .map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn cancel_from_another_thread_interrupts_a_running_statement() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::background();
    let cancel = ctx.cancel_handle();
    let log = LogHandle::silent("tx");

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });

    let err = run_in_transaction(&mut conn, &ctx, TxMode::Read, OP, &log, |tx| {
        tx.query_row(LONG_QUERY, [], |row| row.get::<_, i64>(0))
            .map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap_err();
    canceller.join().unwrap();

    assert!(matches!(
        err,
        StoreError::Cancelled {
            reason: ContextError::Canceled,
            ..
        }
    ));
}

#[test]
fn panic_in_work_rolls_back_and_leaves_connection_usable() {
    let mut conn = open_db_in_memory().unwrap();
    let ctx = RequestContext::background();
    let log = LogHandle::silent("tx");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| -> StoreResult<()> {
            insert(tx, "g-1").map_err(|err| StoreError::internal(OP, err))?;
            panic!("work failed mid-transaction");
        })
    }));
    assert!(outcome.is_err());

    assert!(conn.is_autocommit());
    assert_eq!(row_count(&conn), 0);

    run_in_transaction(&mut conn, &ctx, TxMode::Write, OP, &log, |tx| {
        insert(tx, "g-2").map_err(|err| StoreError::internal(OP, err))
    })
    .unwrap();
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn concurrent_workers_each_use_their_own_connection() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("profiles.db");
    drop(open_db(&db_path).unwrap());

    const WORKERS: usize = 4;
    const PER_WORKER: usize = 10;

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let db_path = db_path.clone();
            thread::spawn(move || {
                let mut conn = open_db(&db_path).unwrap();
                let mut profiles = ProfileService::new(
                    SqliteProfileStore::new(&mut conn, LogHandle::silent("store")),
                    LogHandle::silent("service"),
                );
                let ctx = RequestContext::background();
                for idx in 0..PER_WORKER {
                    profiles
                        .create_profile(
                            &ctx,
                            NewProfile::new(format!("W{worker}"), format!("N{idx}")),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut conn = open_db(&db_path).unwrap();
    let mut store = SqliteProfileStore::new(&mut conn, LogHandle::silent("store"));
    let total = store
        .count_profiles(&RequestContext::background())
        .unwrap();
    assert_eq!(total, (WORKERS * PER_WORKER) as u64);
}
