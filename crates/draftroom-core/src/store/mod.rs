// SQLite persistence layer for leagues, drafts, picks and queues.
//
// Every read and write goes through a `Tx` handle. Multi-step operations
// run inside `Database::with_transaction`, which commits only when the
// closure returns `Ok` and rolls back otherwise.

mod collaborators;
mod drafts;
mod league;
mod order;
mod picks;
mod players;
mod queue;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, TransactionBehavior};
use serde::de::DeserializeOwned;

use crate::catalog::{read_player_csv, PlayerRecord};

/// SQLite-backed store shared by every draft operation.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Handle for statements that run on a locked connection, usually inside
/// an open transaction.
pub struct Tx<'a> {
    conn: &'a Connection,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS leagues (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                name             TEXT NOT NULL,
                commissioner_id  INTEGER NOT NULL,
                total_rosters    INTEGER NOT NULL,
                roster_positions TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS rosters (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                seat      INTEGER NOT NULL,
                user_id   INTEGER,
                username  TEXT,
                autopick  INTEGER NOT NULL DEFAULT 0,
                UNIQUE(league_id, seat)
            );

            CREATE TABLE IF NOT EXISTS players (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                name             TEXT NOT NULL,
                position         TEXT NOT NULL,
                team             TEXT NOT NULL DEFAULT '',
                years_exp        INTEGER NOT NULL DEFAULT 0,
                projected_points REAL NOT NULL DEFAULT 0,
                UNIQUE(name, position, team)
            );

            CREATE TABLE IF NOT EXISTS drafts (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id            INTEGER NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                draft_type           TEXT NOT NULL,
                rounds               INTEGER NOT NULL CHECK (rounds >= 1),
                pick_time_seconds    INTEGER,
                third_round_reversal INTEGER NOT NULL DEFAULT 0,
                settings             TEXT NOT NULL DEFAULT '{}',
                derby                TEXT NOT NULL DEFAULT '{}',
                status               TEXT NOT NULL DEFAULT 'not_started',
                current_pick         INTEGER,
                current_round        INTEGER,
                current_roster_id    INTEGER,
                pick_deadline        TEXT,
                started_at           TEXT,
                completed_at         TEXT,
                created_at           TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS draft_order (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_id       INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                roster_id      INTEGER NOT NULL REFERENCES rosters(id),
                draft_position INTEGER,
                UNIQUE(draft_id, roster_id),
                UNIQUE(draft_id, draft_position)
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_id          INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                pick_number       INTEGER NOT NULL,
                round             INTEGER NOT NULL,
                pick_in_round     INTEGER NOT NULL,
                roster_id         INTEGER NOT NULL REFERENCES rosters(id),
                player_id         INTEGER NOT NULL REFERENCES players(id),
                is_auto_pick      INTEGER NOT NULL DEFAULT 0,
                pick_time_seconds INTEGER,
                picked_at         TEXT NOT NULL,
                UNIQUE(draft_id, pick_number),
                UNIQUE(draft_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS pick_queue (
                draft_id  INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                roster_id INTEGER NOT NULL REFERENCES rosters(id) ON DELETE CASCADE,
                player_id INTEGER NOT NULL REFERENCES players(id),
                rank      INTEGER NOT NULL,
                PRIMARY KEY (draft_id, roster_id, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_drafts_league ON drafts(league_id);
            CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts(status);
            CREATE INDEX IF NOT EXISTS idx_draft_picks_draft ON draft_picks(draft_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection. A poisoned mutex is reported as a
    /// storage error instead of a panic.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run `f` inside an immediate transaction. The transaction commits when
    /// `f` returns `Ok`; any error rolls every statement back.
    pub fn with_transaction<T, E>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin transaction")?;
        let out = {
            let handle = Tx { conn: &tx };
            f(&handle)?
        };
        tx.commit().context("failed to commit transaction")?;
        Ok(out)
    }

    /// Run read-only statements on the connection without opening a
    /// transaction.
    pub fn read<T, E>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let conn = self.conn()?;
        let handle = Tx { conn: &conn };
        f(&handle)
    }

    /// Upsert a batch of seed players in a single transaction. Returns the
    /// number of rows written.
    pub fn import_players(&self, records: &[PlayerRecord]) -> Result<usize> {
        self.with_transaction(|tx| {
            for record in records {
                tx.upsert_player(record)?;
            }
            Ok(records.len())
        })
    }

    /// Load a player seed CSV into the catalog.
    pub fn import_players_csv(&self, path: &Path) -> Result<usize> {
        let records = read_player_csv(path)?;
        self.import_players(&records)
            .with_context(|| format!("failed to import players from {}", path.display()))
    }
}

// ------------------------------------------------------------------
// Column helpers
// ------------------------------------------------------------------

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so they sort
/// and compare correctly as text.
pub(crate) fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}")))
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, format!("bad json: {e}")))
}
