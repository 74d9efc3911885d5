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

//! Delivery sinks for fault records.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

mod file;
mod mail;
#[cfg(feature = "store-sqlite")]
mod sqlite;
pub mod testing;

pub use self::file::LocalFileStore;
pub use self::mail::Email;
pub use self::mail::UnconfiguredMailer;
pub use self::mail::compose;
#[cfg(feature = "store-sqlite")]
pub use self::sqlite::SqliteStore;

use crate::error::SinkError;
use crate::message::RenderedMessage;
use crate::record::FaultRecord;
use crate::settings::WriteMode;

/// A sink that writes channel log files.
///
/// Implementors receive one fully formatted line per fault and decide how it
/// reaches storage.
pub trait FileStore: fmt::Debug + Send + Sync + 'static {
    /// Writes one line to the file at `path`, honoring the write mode.
    fn write(&self, path: &Path, mode: WriteMode, line: &str) -> anyhow::Result<()>;
}

impl<T: FileStore + ?Sized> FileStore for Arc<T> {
    fn write(&self, path: &Path, mode: WriteMode, line: &str) -> anyhow::Result<()> {
        (**self).write(path, mode, line)
    }
}

/// A sink that persists structured fault rows.
pub trait LogStore: fmt::Debug + Send + Sync + 'static {
    /// Persists one row.
    fn insert(&self, row: &LogRow) -> anyhow::Result<()>;
}

impl<T: LogStore + ?Sized> LogStore for Arc<T> {
    fn insert(&self, row: &LogRow) -> anyhow::Result<()> {
        (**self).insert(row)
    }
}

/// A sink that forwards composed administrator emails.
pub trait MailTransport: fmt::Debug + Send + Sync + 'static {
    /// Hands one email to the underlying mail system.
    fn send(&self, email: &Email) -> anyhow::Result<()>;
}

impl<T: MailTransport + ?Sized> MailTransport for Arc<T> {
    fn send(&self, email: &Email) -> anyhow::Result<()> {
        (**self).send(email)
    }
}

/// One row of the log store.
///
/// Field names follow the store's column names; `kind` maps to the `type`
/// column. The one-line summary is deliberately absent: it is presentation,
/// reconstructible from the structured columns.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRow {
    /// The delivery channel name, stored in the `type` column.
    pub kind: String,
    /// Always `0`; the capture pipeline carries no user identity.
    pub user_id: i64,
    pub errno: i64,
    pub errstr: String,
    pub errfile: String,
    pub errline: i64,
    pub backtrace: String,
    pub post: String,
    pub get: String,
    pub cookie: String,
    pub server: String,
}

impl LogRow {
    /// Builds the store row for a rendered fault.
    pub fn new(record: &FaultRecord, message: &RenderedMessage) -> LogRow {
        LogRow {
            kind: record.channel().as_str().to_string(),
            // TODO: populate once request contexts carry a user identity
            user_id: 0,
            errno: record.code() as i64,
            errstr: record.message().to_string(),
            errfile: record.file().to_string(),
            errline: record.line() as i64,
            backtrace: message.field("backtrace").to_string(),
            post: message.field("post").to_string(),
            get: message.field("get").to_string(),
            cookie: message.field("cookie").to_string(),
            server: message.field("server").to_string(),
        }
    }
}

/// The store used when no other is configured and the built-in one is
/// compiled out. Every insert fails, tripping the delivery boundary.
#[derive(Debug, Default)]
pub struct UnconfiguredStore;

impl LogStore for UnconfiguredStore {
    fn insert(&self, _row: &LogRow) -> anyhow::Result<()> {
        Err(SinkError::new("no log store configured").into())
    }
}
