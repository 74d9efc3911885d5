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

use std::panic::Location;

/// An error raised by a sink while persisting or forwarding a fault record.
///
/// Sink errors carry a numeric code plus the source location at which they
/// were constructed, so the delivery boundary can render them without
/// consulting any other state.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message} in {file} on line {line}")]
pub struct SinkError {
    code: u32,
    message: String,
    file: &'static str,
    line: u32,
}

impl SinkError {
    /// Creates a sink error with code `0` at the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(0, message)
    }

    /// Creates a sink error with an explicit code at the caller's location.
    #[track_caller]
    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        let caller = Location::caller();
        SinkError {
            code,
            message: message.into(),
            file: caller.file(),
            line: caller.line(),
        }
    }

    /// Wraps an IO failure, lifting the OS error number into the code slot.
    #[track_caller]
    pub fn io(action: &str, err: std::io::Error) -> Self {
        let code = err.raw_os_error().unwrap_or(0) as u32;
        Self::with_code(code, format!("{action}: {err}"))
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}
