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

//! The capture facade.

use std::cell::Cell;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::capture::CaptureScope;
use crate::dispatch::Dispatcher;
use crate::record::CaughtException;
use crate::record::FaultInput;
use crate::record::FaultRecord;
use crate::record::RequestContext;
use crate::settings::Settings;
use crate::settings::SettingsPatch;
use crate::settings::SettingsRegistry;
use crate::severity::Severity;
use crate::sink::FileStore;
use crate::sink::LocalFileStore;
use crate::sink::LogStore;
use crate::sink::MailTransport;
#[cfg(feature = "store-sqlite")]
use crate::sink::SqliteStore;
use crate::sink::UnconfiguredMailer;
#[cfg(not(feature = "store-sqlite"))]
use crate::sink::UnconfiguredStore;

thread_local! {
    static IN_PIPELINE: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside the capture pipeline.
///
/// Ambient fault sources consult this to drop records their own delivery
/// emits, which would otherwise recurse.
pub(crate) fn in_pipeline() -> bool {
    IN_PIPELINE.get()
}

struct PipelineGuard {
    previous: bool,
}

impl PipelineGuard {
    fn enter() -> PipelineGuard {
        let previous = IN_PIPELINE.get();
        IN_PIPELINE.set(true);
        PipelineGuard { previous }
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        IN_PIPELINE.set(self.previous);
    }
}

/// Create a new [builder][Builder].
///
/// Every collaborator has a default: local files, the built-in store at the
/// configured database path, an unconfigured mail transport, and stderr as
/// the display. A bare `builder().build()` therefore yields a working
/// logger.
///
/// ```rust,no_run
/// let logger = faultline::builder().build();
/// logger.warning("taking the slow path");
/// ```
pub fn builder() -> Builder {
    Builder::new()
}

/// A builder for configuring a [`Logger`].
#[must_use = "call `build` to construct the logger"]
pub struct Builder {
    overrides: SettingsPatch,
    registry: Option<Arc<SettingsRegistry>>,
    context: RequestContext,
    files: Option<Box<dyn FileStore>>,
    store: Option<Box<dyn LogStore>>,
    mail: Option<Box<dyn MailTransport>>,
    display: Option<Box<dyn io::Write + Send>>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("overrides", &self.overrides)
            .field("context", &self.context)
            .field("files", &self.files)
            .field("store", &self.store)
            .field("mail", &self.mail)
            .finish_non_exhaustive()
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            overrides: SettingsPatch::new(),
            registry: None,
            context: RequestContext::new(),
            files: None,
            store: None,
            mail: None,
            display: None,
        }
    }

    /// Sets the instance overrides resolved against the registry defaults.
    pub fn settings(mut self, overrides: SettingsPatch) -> Builder {
        self.overrides = overrides;
        self
    }

    /// Parses instance overrides from TOML text.
    pub fn settings_toml(self, text: &str) -> anyhow::Result<Builder> {
        let overrides = SettingsPatch::from_toml_str(text)?;
        Ok(self.settings(overrides))
    }

    /// Resolves against this registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<SettingsRegistry>) -> Builder {
        self.registry = Some(registry);
        self
    }

    /// Attaches the request context captured alongside every fault.
    pub fn context(mut self, context: RequestContext) -> Builder {
        self.context = context;
        self
    }

    /// Replaces the file sink.
    pub fn file_store(mut self, files: impl FileStore) -> Builder {
        self.files = Some(Box::new(files));
        self
    }

    /// Replaces the log store.
    pub fn log_store(mut self, store: impl LogStore) -> Builder {
        self.store = Some(Box::new(store));
        self
    }

    /// Replaces the mail transport.
    pub fn mail_transport(mut self, mail: impl MailTransport) -> Builder {
        self.mail = Some(Box::new(mail));
        self
    }

    /// Replaces the display target the delivery boundary writes to.
    pub fn display(mut self, display: impl io::Write + Send + 'static) -> Builder {
        self.display = Some(Box::new(display));
        self
    }

    /// Builds the logger, resolving its configuration once.
    pub fn build(self) -> Logger {
        let registry = self.registry.unwrap_or_else(SettingsRegistry::global);
        let settings = registry.resolve(&self.overrides);

        let files = self
            .files
            .unwrap_or_else(|| Box::new(LocalFileStore::new()));
        let store = match self.store {
            Some(store) => store,
            None => default_store(&settings),
        };
        let mail = self.mail.unwrap_or_else(|| Box::new(UnconfiguredMailer));
        let display = self.display.unwrap_or_else(|| Box::new(io::stderr()));

        Logger {
            registry,
            overrides: self.overrides,
            settings,
            context: self.context,
            dispatcher: Dispatcher::new(files, store, mail, display),
        }
    }
}

#[cfg(feature = "store-sqlite")]
fn default_store(settings: &Settings) -> Box<dyn LogStore> {
    Box::new(SqliteStore::new(settings.database.path.clone()))
}

#[cfg(not(feature = "store-sqlite"))]
fn default_store(_settings: &Settings) -> Box<dyn LogStore> {
    Box::new(UnconfiguredStore)
}

/// The fault capture facade.
///
/// A logger normalizes every capture into one canonical record and delivers
/// it to the destinations its channel is configured with. Capture never
/// panics and never returns an error to the caller: delivery failures are
/// absorbed at the boundary and surfaced on the display.
///
/// ```rust,no_run
/// use faultline::SettingsPatch;
///
/// let mut overrides = SettingsPatch::new();
/// overrides.files.error.path = Some("logs/app".into());
///
/// let logger = faultline::builder().settings(overrides).build();
/// logger.error("lost connection to primary");
/// ```
#[derive(Debug)]
pub struct Logger {
    registry: Arc<SettingsRegistry>,
    overrides: SettingsPatch,
    settings: Settings,
    context: RequestContext,
    dispatcher: Dispatcher,
}

impl Default for Logger {
    fn default() -> Logger {
        builder().build()
    }
}

impl Logger {
    /// A logger with default collaborators and no overrides.
    pub fn new() -> Logger {
        builder().build()
    }

    /// The resolved configuration this logger operates under.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the instance overrides and re-resolves against the current
    /// registry defaults. Calling twice with the same overrides yields the
    /// same configuration.
    pub fn reconfigure(&mut self, overrides: SettingsPatch) -> &mut Logger {
        self.overrides = overrides;
        self.settings = self.registry.resolve(&self.overrides);
        self
    }

    /// Drops all instance overrides, returning to the registry defaults.
    pub fn apply_defaults(&mut self) -> &mut Logger {
        self.reconfigure(SettingsPatch::new())
    }

    /// Replaces the request context attached to future captures.
    pub fn set_context(&mut self, context: RequestContext) -> &mut Logger {
        self.context = context;
        self
    }

    /// Captures a debug message.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Debug, message.into())
    }

    /// Captures an informational message.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Info, message.into())
    }

    /// Captures a notice.
    #[track_caller]
    pub fn notice(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Notice, message.into())
    }

    /// Captures a warning.
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Warning, message.into())
    }

    /// Captures an error.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Error, message.into())
    }

    /// Captures an exception-severity message.
    #[track_caller]
    pub fn exception(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Exception, message.into())
    }

    /// Captures a fatal fault.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> &Logger {
        self.emit(Severity::Fatal, message.into())
    }

    /// Captures a caught standard error as an exception.
    #[track_caller]
    pub fn caught(&self, err: &dyn std::error::Error) -> &Logger {
        self.report(FaultInput::Caught(CaughtException::from_error(err)))
    }

    #[track_caller]
    fn emit(&self, severity: Severity, message: String) -> &Logger {
        self.report(FaultInput::Message { severity, message })
    }

    /// Runs one input through the whole pipeline: normalize, render,
    /// deliver.
    ///
    /// [`FaultInput::Idle`] is a no-op. The capture scope opened here
    /// guarantees staged rendering output is discarded on every exit path.
    #[track_caller]
    pub fn report(&self, input: FaultInput) -> &Logger {
        let _guard = PipelineGuard::enter();
        let scope = CaptureScope::enter();
        if let Some(record) = FaultRecord::from_input(input, self.context.clone()) {
            self.dispatcher.dispatch(&record, &self.settings, &scope);
        }
        self
    }
}
