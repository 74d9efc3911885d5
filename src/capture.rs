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

//! Output capture around the delivery pipeline.

use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

/// A scope that stages in-pipeline output and guarantees it is discarded.
///
/// Delivery produces user-visible text as a side effect of rendering. That
/// text must never leak to the caller's output: everything written through a
/// scope's handles is buffered, and the buffer is cleared on every exit path
/// from the scope, unwinds included. Only the delivery boundary writes to
/// the real display, and it writes directly, never through a scope.
#[derive(Debug, Default)]
pub struct CaptureScope {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureScope {
    pub fn enter() -> CaptureScope {
        CaptureScope::default()
    }

    /// A writer that appends to the staged buffer.
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            buffer: self.buffer.clone(),
        }
    }

    /// Clears everything staged so far.
    pub fn discard(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The number of staged bytes.
    pub fn staged(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        self.discard();
    }
}

/// A writer into a [`CaptureScope`]'s staging buffer.
#[derive(Debug)]
pub struct CaptureHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureHandle {
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

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_staged_output_is_buffered() {
        let scope = CaptureScope::enter();
        let mut handle = scope.handle();
        handle.write_all(b"rendered output").unwrap();
        assert_eq!(scope.staged(), 15);
    }

    #[test]
    fn test_discard_clears_buffer() {
        let scope = CaptureScope::enter();
        scope.handle().write_all(b"spill").unwrap();
        scope.discard();
        assert_eq!(scope.staged(), 0);
    }

    #[test]
    fn test_drop_discards_staged_output() {
        let scope = CaptureScope::enter();
        let buffer = scope.buffer.clone();
        scope.handle().write_all(b"spill").unwrap();
        drop(scope);
        assert!(buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_discards_on_unwind() {
        let buffer = {
            let scope = CaptureScope::enter();
            let buffer = scope.buffer.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                scope.handle().write_all(b"spill").unwrap();
                panic!("sink blew up");
            }));
            assert!(result.is_err());
            buffer
        };
        assert!(buffer.lock().unwrap().is_empty());
    }
}
