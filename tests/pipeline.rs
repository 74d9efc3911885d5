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

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use faultline::SettingsPatch;
use faultline::SettingsRegistry;
use faultline::settings::Destination;
use faultline::settings::WriteMode;
use faultline::sink::Email;
use faultline::sink::FileStore;
use faultline::sink::LogRow;
use faultline::sink::LogStore;
use faultline::sink::MailTransport;
use faultline::sink::testing::FailingSink;
use faultline::sink::testing::MemoryDisplay;
use faultline::sink::testing::MemoryFileStore;
use faultline::sink::testing::MemoryLogStore;
use faultline::sink::testing::MemoryMailer;

/// Records which sink kind ran, in order, across all three traits.
#[derive(Debug)]
struct SeqSink {
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl SeqSink {
    fn new(label: &'static str, order: Arc<Mutex<Vec<&'static str>>>) -> SeqSink {
        SeqSink { label, order }
    }

    fn push(&self) {
        self.order.lock().unwrap().push(self.label);
    }
}

impl FileStore for SeqSink {
    fn write(&self, _path: &Path, _mode: WriteMode, _line: &str) -> anyhow::Result<()> {
        self.push();
        Ok(())
    }
}

impl LogStore for SeqSink {
    fn insert(&self, _row: &LogRow) -> anyhow::Result<()> {
        self.push();
        Ok(())
    }
}

impl MailTransport for SeqSink {
    fn send(&self, _email: &Email) -> anyhow::Result<()> {
        self.push();
        Ok(())
    }
}

fn isolated() -> faultline::Builder {
    faultline::builder().registry(Arc::new(SettingsRegistry::new()))
}

#[test]
fn test_exception_fans_out_file_then_store_then_mail() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut overrides = SettingsPatch::new();
    overrides.admin_email = Some("ops@example.com".to_string());

    let logger = isolated()
        .settings(overrides)
        .file_store(SeqSink::new("file", order.clone()))
        .log_store(SeqSink::new("db", order.clone()))
        .mail_transport(SeqSink::new("mail", order.clone()))
        .display(MemoryDisplay::new())
        .build();

    logger.exception("lost primary");

    assert_eq!(order.lock().unwrap().as_slice(), ["file", "db", "mail"]);
}

#[test]
fn test_file_and_mail_list_skips_the_store() {
    let files = Arc::new(MemoryFileStore::new());
    let store = Arc::new(MemoryLogStore::new());
    let mail = Arc::new(MemoryMailer::new());
    let mut overrides = SettingsPatch::new();
    overrides.admin_email = Some("ops@example.com".to_string());
    overrides.destinations.error = Some(vec![Destination::File, Destination::Email]);

    let logger = isolated()
        .settings(overrides)
        .file_store(files.clone())
        .log_store(store.clone())
        .mail_transport(mail.clone())
        .display(MemoryDisplay::new())
        .build();

    logger.error("disk full");

    assert_eq!(files.writes().len(), 1);
    assert_eq!(mail.sent().len(), 1);
    assert!(store.rows().is_empty());
}

#[test]
fn test_error_line_reaches_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut overrides = SettingsPatch::new();
    overrides.destinations.error = Some(vec![Destination::File]);
    overrides.files.error.path = Some(dir.path().to_path_buf());

    let display = MemoryDisplay::new();
    let logger = isolated()
        .settings(overrides)
        .log_store(MemoryLogStore::new())
        .display(display.clone())
        .build();

    logger.error("disk full");

    let written = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert!(written.contains(" - ERROR --> USER ERROR: disk full in "));
    assert!(written.contains("pipeline.rs on line "));
    assert!(!written.contains(" POST: "));
    assert!(written.ends_with('\n'));
    assert_eq!(display.contents(), "");
}

#[test]
fn test_append_accumulates_and_truncate_rewrites() {
    let dir = tempfile::tempdir().unwrap();
    let mut overrides = SettingsPatch::new();
    overrides.destinations.error = Some(vec![Destination::File]);
    overrides.files.error.path = Some(dir.path().to_path_buf());

    let mut logger = isolated()
        .settings(overrides.clone())
        .log_store(MemoryLogStore::new())
        .display(MemoryDisplay::new())
        .build();

    logger.error("first");
    logger.error("second");
    let appended = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert_eq!(appended.lines().count(), 2);

    overrides.files.error.mode = Some(WriteMode::Truncate);
    logger.reconfigure(overrides);
    logger.error("third");
    logger.error("fourth");
    let rewritten = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert_eq!(rewritten.lines().count(), 1);
    assert!(rewritten.contains("fourth"));
}

#[cfg(feature = "store-sqlite")]
#[test]
fn test_error_row_reaches_the_bundled_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("failures.db");
    let mut overrides = SettingsPatch::new();
    overrides.destinations.error = Some(vec![Destination::Db]);
    overrides.database.path = Some(db_path.clone());

    let logger = isolated()
        .settings(overrides)
        .display(MemoryDisplay::new())
        .build();

    logger.error("lost quorum");
    drop(logger);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let (kind, errno, errstr): (String, i64, String) = conn
        .query_row("SELECT type, errno, errstr FROM logger", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!(kind, "error");
    assert_eq!(errno, 256);
    assert_eq!(errstr, "lost quorum");
}

#[test]
fn test_caught_error_reaches_store_as_exception() {
    let store = Arc::new(MemoryLogStore::new());
    let logger = isolated()
        .file_store(MemoryFileStore::new())
        .log_store(store.clone())
        .display(MemoryDisplay::new())
        .build();

    let err = std::io::Error::other("connection reset");
    logger.caught(&err);

    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "exception");
    assert_eq!(rows[0].errno, 0);
    assert_eq!(rows[0].errstr, "connection reset");
    assert!(rows[0].errfile.ends_with("pipeline.rs"));
}

#[test]
fn test_emitter_backfills_its_call_site() {
    let store = Arc::new(MemoryLogStore::new());
    let logger = isolated()
        .file_store(MemoryFileStore::new())
        .log_store(store.clone())
        .display(MemoryDisplay::new())
        .build();

    let line = line!() + 1;
    logger.error("checkpoint");

    let rows = store.rows();
    assert!(rows[0].errfile.ends_with("pipeline.rs"));
    assert_eq!(rows[0].errline, i64::from(line));
}

#[test]
fn test_toml_overrides_redirect_delivery() {
    let overrides = r#"
[destinations]
default = ["file"]

[files.default]
name = "notices.log"
"#;

    let files = Arc::new(MemoryFileStore::new());
    let logger = isolated()
        .settings_toml(overrides)
        .unwrap()
        .file_store(files.clone())
        .log_store(MemoryLogStore::new())
        .display(MemoryDisplay::new())
        .build();

    logger.info("cache warmed");

    let writes = files.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, PathBuf::from("logs/notices.log"));
    assert!(writes[0].line.contains(" - DEFAULT --> USER NOTICE: cache warmed in "));
}

#[test]
fn test_production_display_hides_failure_details() {
    let mut overrides = SettingsPatch::new();
    overrides.environment = Some(faultline::settings::Environment::Production);
    overrides.destinations.error = Some(vec![Destination::Db]);

    let display = MemoryDisplay::new();
    let logger = isolated()
        .settings(overrides)
        .log_store(FailingSink::new(5, "store offline"))
        .display(display.clone())
        .build();

    logger.error("disk full");

    // the heading classifies the store failure's code, unmapped here
    let shown = display.contents();
    assert!(shown.starts_with("<h2>APPLICATION ERROR</h2><hr>"));
    assert!(shown.contains("notified the administrator/s"));
    assert!(!shown.contains("store offline"));
}

#[test]
fn test_context_rides_along_to_the_store() {
    let store = Arc::new(MemoryLogStore::new());
    let mut context = faultline::RequestContext::new();
    context.server.insert("HTTP_HOST".to_string(), "app.example.com".into());
    context.get.insert("page".to_string(), "3".into());

    let logger = isolated()
        .context(context)
        .file_store(MemoryFileStore::new())
        .log_store(store.clone())
        .display(MemoryDisplay::new())
        .build();

    logger.warning("slow path");

    let rows = store.rows();
    assert_eq!(rows[0].kind, "default");
    assert_eq!(rows[0].server, "{\"HTTP_HOST\":\"app.example.com\"}");
    assert_eq!(rows[0].get, "{\"page\":\"3\"}");
    assert_eq!(rows[0].post, "{}");
}
