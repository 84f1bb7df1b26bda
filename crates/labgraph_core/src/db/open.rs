//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for one store schema.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied for their schema.

use super::migrations::apply_migrations;
use super::{DbResult, Schema};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and applies all pending migrations of `schema`.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, schema: Schema) -> DbResult<Connection> {
    open_with(schema, "file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations of `schema`.
pub fn open_db_in_memory(schema: Schema) -> DbResult<Connection> {
    open_with(schema, "memory", Connection::open_in_memory)
}

fn open_with(
    schema: Schema,
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start schema={} mode={mode}",
        schema.as_str()
    );

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error schema={} mode={mode} duration_ms={} error_code=db_open_failed error={}",
                schema.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, schema) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok schema={} mode={mode} duration_ms={}",
                schema.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error schema={} mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                schema.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, schema: Schema) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn, schema)?;
    Ok(())
}
