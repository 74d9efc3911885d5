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

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::SinkError;
use crate::settings::WriteMode;
use crate::sink::FileStore;

/// A [`FileStore`] backed by the local filesystem.
///
/// Files are opened per write and missing parent directories are created, so
/// targets can be repointed between captures without holding handles.
#[derive(Debug, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> LocalFileStore {
        LocalFileStore
    }
}

impl FileStore for LocalFileStore {
    fn write(&self, path: &Path, mode: WriteMode, line: &str) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|err| SinkError::io("create log directory", err))?;
            }
        }

        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Append => options.append(true).create(true),
            WriteMode::Truncate => options.write(true).truncate(true).create(true),
        };
        let mut file = options
            .open(path)
            .map_err(|err| SinkError::io("open log file", err))?;
        file.write_all(line.as_bytes())
            .map_err(|err| SinkError::io("write log file", err))?;
        Ok(())
    }
}
