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

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::path::Path;
use std::sync::Arc;

use faultline::HookRegistry;
use faultline::SettingsPatch;
use faultline::SettingsRegistry;
use faultline::install_with;
use faultline::settings::WriteMode;
use faultline::sink::FileStore;
use faultline::sink::LogRow;
use faultline::sink::LogStore;
use faultline::sink::testing::MemoryDisplay;
use faultline::sink::testing::MemoryFileStore;
use faultline::sink::testing::MemoryLogStore;

/// A store that logs on every insert. With the bridge installed this only
/// terminates because in-pipeline records are dropped; otherwise each insert
/// would capture another fault and recurse.
#[derive(Debug)]
struct ChattyStore {
    inner: Arc<MemoryLogStore>,
}

impl LogStore for ChattyStore {
    fn insert(&self, row: &LogRow) -> anyhow::Result<()> {
        log::warn!("store saw a row");
        self.inner.insert(row)
    }
}

#[derive(Debug)]
struct PanickingFiles;

impl FileStore for PanickingFiles {
    fn write(&self, _path: &Path, _mode: WriteMode, _line: &str) -> anyhow::Result<()> {
        panic!("files exploded");
    }
}

// The panic hook and the log crate global are process state, so the whole
// lifecycle runs as one test.
#[test]
fn test_ambient_capture_lifecycle() {
    let registry = Arc::new(HookRegistry::new());
    let store = Arc::new(MemoryLogStore::new());

    let mut overrides = SettingsPatch::new();
    overrides.handlers.error = Some(true);
    overrides.handlers.exception = Some(true);

    let logger = Arc::new(
        faultline::builder()
            .registry(Arc::new(SettingsRegistry::new()))
            .settings(overrides)
            .file_store(MemoryFileStore::new())
            .log_store(ChattyStore {
                inner: store.clone(),
            })
            .display(MemoryDisplay::new())
            .build(),
    );

    let hooks = install_with(logger.clone(), registry.clone());
    assert!(hooks.installed_error());
    assert!(hooks.installed_exception());
    assert!(!hooks.installed_fatal());
    assert!(registry.bridge_enabled());
    assert!(registry.exception_active());
    assert!(!registry.fatal_active());
    assert!(registry.display_suppressed());

    // a later install claims what is left; earlier claims stay untouched
    let late_store = Arc::new(MemoryLogStore::new());
    let mut late_overrides = SettingsPatch::new();
    late_overrides.handlers.exception = Some(true);
    late_overrides.handlers.fatal = Some(true);
    let late = Arc::new(
        faultline::builder()
            .registry(Arc::new(SettingsRegistry::new()))
            .settings(late_overrides)
            .file_store(MemoryFileStore::new())
            .log_store(late_store.clone())
            .display(MemoryDisplay::new())
            .build(),
    );
    let late_hooks = install_with(late, registry.clone());
    assert!(!late_hooks.installed_error());
    assert!(!late_hooks.installed_exception());
    assert!(late_hooks.installed_fatal());
    assert!(registry.exception_active());
    assert!(registry.fatal_active());

    // log crate records flow through the bridge into the pipeline
    log::error!("bridge test");
    {
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "error");
        assert_eq!(rows[0].errno, 256);
        assert_eq!(rows[0].errstr, "bridge test");
        assert!(rows[0].errfile.ends_with("hooks.rs"));
    }

    // panics report through the logger that owns the exception claim
    let result = catch_unwind(|| panic!("kaboom"));
    assert!(result.is_err());
    {
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].kind, "exception");
        assert_eq!(rows[1].errno, 0);
        assert_eq!(rows[1].errstr, "kaboom");
        assert!(rows[1].errfile.ends_with("hooks.rs"));
    }
    assert!(late_store.rows().is_empty());

    // a panic raised while delivering is kept aside instead of re-entering
    let panicking = Arc::new(
        faultline::builder()
            .registry(Arc::new(SettingsRegistry::new()))
            .file_store(PanickingFiles)
            .log_store(MemoryLogStore::new())
            .display(MemoryDisplay::new())
            .build(),
    );
    let result = catch_unwind(AssertUnwindSafe(move || {
        panicking.error("write attempt");
    }));
    assert!(result.is_err());
    assert_eq!(store.rows().len(), 2);

    // releasing the fatal claim drains the pending fault through its owner
    drop(late_hooks);
    {
        let rows = late_store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "fatal");
        assert_eq!(rows[0].errno, 16);
        assert_eq!(rows[0].errstr, "files exploded");
        assert!(rows[0].errfile.ends_with("hooks.rs"));
    }
    assert_eq!(store.rows().len(), 2);
    assert!(!registry.fatal_active());
    assert!(registry.exception_active());
    assert!(registry.take_last_fault().is_none());

    // no restores were requested, so the bridge stays on
    drop(hooks);
    assert!(registry.bridge_enabled());
}
