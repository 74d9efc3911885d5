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

//! In-memory sinks for exercising delivery without real storage.
//!
//! Share a double with a logger through an `Arc`: the sink traits are
//! implemented for `Arc<T>`, so a clone can go into the builder while the
//! test keeps the original for inspection.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::error::SinkError;
use crate::settings::WriteMode;
use crate::sink::Email;
use crate::sink::FileStore;
use crate::sink::LogRow;
use crate::sink::LogStore;
use crate::sink::MailTransport;

/// One write observed by a [`MemoryFileStore`].
#[derive(Clone, Debug, PartialEq)]
pub struct FileWrite {
    pub path: PathBuf,
    pub mode: WriteMode,
    pub line: String,
}

/// A [`FileStore`] that records writes instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    writes: Mutex<Vec<FileWrite>>,
}

impl MemoryFileStore {
    pub fn new() -> MemoryFileStore {
        MemoryFileStore::default()
    }

    /// All writes observed so far.
    pub fn writes(&self) -> Vec<FileWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FileStore for MemoryFileStore {
    fn write(&self, path: &Path, mode: WriteMode, line: &str) -> anyhow::Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FileWrite {
                path: path.to_path_buf(),
                mode,
                line: line.to_string(),
            });
        Ok(())
    }
}

/// A [`LogStore`] that collects rows in memory.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    rows: Mutex<Vec<LogRow>>,
}

impl MemoryLogStore {
    pub fn new() -> MemoryLogStore {
        MemoryLogStore::default()
    }

    /// All rows inserted so far.
    pub fn rows(&self) -> Vec<LogRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogStore for MemoryLogStore {
    fn insert(&self, row: &LogRow) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row.clone());
        Ok(())
    }
}

/// A [`MailTransport`] that collects sent email in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> MemoryMailer {
        MemoryMailer::default()
    }

    /// All emails handed to this transport so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MailTransport for MemoryMailer {
    fn send(&self, email: &Email) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());
        Ok(())
    }
}

/// A stand-in that fails every sink operation with a fixed error.
///
/// It implements all three sink traits so a test can break whichever leg of
/// delivery it is probing.
#[derive(Debug)]
pub struct FailingSink {
    code: u32,
    message: String,
}

impl FailingSink {
    pub fn new(code: u32, message: impl Into<String>) -> FailingSink {
        FailingSink {
            code,
            message: message.into(),
        }
    }

    fn fail(&self) -> anyhow::Error {
        SinkError::with_code(self.code, self.message.clone()).into()
    }
}

impl FileStore for FailingSink {
    fn write(&self, _path: &Path, _mode: WriteMode, _line: &str) -> anyhow::Result<()> {
        Err(self.fail())
    }
}

impl LogStore for FailingSink {
    fn insert(&self, _row: &LogRow) -> anyhow::Result<()> {
        Err(self.fail())
    }
}

impl MailTransport for FailingSink {
    fn send(&self, _email: &Email) -> anyhow::Result<()> {
        Err(self.fail())
    }
}

/// An in-memory display target.
///
/// Clones share one buffer: hand a clone to the builder as the display and
/// keep the original to read what the delivery boundary wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryDisplay {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryDisplay {
    pub fn new() -> MemoryDisplay {
        MemoryDisplay::default()
    }

    /// Everything written to the display so far.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for MemoryDisplay {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
