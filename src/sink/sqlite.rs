// Copyright 2026 Faultline Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use rusqlite::Connection;
use rusqlite::params;

use crate::error::SinkError;
use crate::sink::LogRow;
use crate::sink::LogStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    user_id INTEGER NOT NULL,
    errno INTEGER NOT NULL,
    errstr TEXT NOT NULL,
    errfile TEXT NOT NULL,
    errline INTEGER NOT NULL,
    backtrace TEXT NOT NULL,
    post TEXT NOT NULL,
    get TEXT NOT NULL,
    cookie TEXT NOT NULL,
    server TEXT NOT NULL
);
";

/// A [`LogStore`] backed by a SQLite database.
///
/// The connection is established lazily on the first insert and held for the
/// life of the store; the `logger` table is created on connect if missing.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Creates a store writing to the database at `path`.
    ///
    /// Nothing is opened until the first insert, so constructing a store for
    /// an unreachable path is not itself an error.
    pub fn new(path: impl Into<PathBuf>) -> SqliteStore {
        SqliteStore {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<Connection, SinkError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|err| SinkError::io("create log store directory", err))?;
            }
        }
        let conn = Connection::open(&self.path)
            .map_err(|err| SinkError::new(format!("open log store: {err}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|err| SinkError::new(format!("create logger table: {err}")))?;
        Ok(conn)
    }
}

impl LogStore for SqliteStore {
    fn insert(&self, row: &LogRow) -> anyhow::Result<()> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = match &mut *guard {
            Some(conn) => conn,
            slot => slot.insert(self.connect()?),
        };

        conn.execute(
            "INSERT INTO logger (type, user_id, errno, errstr, errfile, errline, backtrace, \
             post, get, cookie, server) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                row.kind,
                row.user_id,
                row.errno,
                row.errstr,
                row.errfile,
                row.errline,
                row.backtrace,
                row.post,
                row.get,
                row.cookie,
                row.server,
            ],
        )
        .map_err(|err| SinkError::new(format!("insert log row: {err}")))?;
        Ok(())
    }
}
