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

//! Ambient fault capture.
//!
//! A logger can take over three runtime fault sources, each opted into via
//! [`HandlerSettings`](crate::settings::HandlerSettings):
//!
//! - `error`: records emitted through the `log` crate macros are forwarded
//!   into the capture pipeline.
//! - `exception`: panics are captured immediately at exception severity.
//! - `fatal`: the last fault seen while no immediate capture was possible is
//!   kept aside and reported at fatal severity when the hooks are released.
//!
//! Each source is claimed at most once per registry, whichever install
//! claims it first; later installs skip already-claimed sources and leave
//! them undisturbed. Releasing the returned [`InstalledHooks`] guard applies
//! the configured [`RestoreSettings`](crate::settings::RestoreSettings) and
//! drains the pending fatal fault.

use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::logger::Logger;
use crate::record::CaughtException;
use crate::record::FaultInput;
use crate::severity::Severity;

static GLOBAL: LazyLock<Arc<HookRegistry>> = LazyLock::new(|| Arc::new(HookRegistry::new()));

/// Shared state between installed hooks and the loggers that own them.
///
/// The installation markers are one-shot: once a fault source is claimed it
/// stays claimed for the life of the process. The activity flags are what
/// the hooks consult on every event and are cleared when the claim's guard
/// is released or restored. The reporter slot names the logger that owns
/// the exception claim, so panics report through it no matter which install
/// chained the process hook.
#[derive(Debug, Default)]
pub struct HookRegistry {
    error_installed: AtomicBool,
    exception_installed: AtomicBool,
    fatal_installed: AtomicBool,
    panic_hook_chained: AtomicBool,
    bridge_enabled: AtomicBool,
    exception_active: AtomicBool,
    fatal_active: AtomicBool,
    display_suppressed: AtomicBool,
    exception_reporter: Mutex<Option<Arc<Logger>>>,
    last_fault: Mutex<Option<CaughtException>>,
}

impl HookRegistry {
    pub fn new() -> HookRegistry {
        HookRegistry::default()
    }

    /// The process-wide registry [`install`] claims against.
    pub fn global() -> Arc<HookRegistry> {
        GLOBAL.clone()
    }

    /// Whether `log` crate records are currently forwarded.
    pub fn bridge_enabled(&self) -> bool {
        self.bridge_enabled.load(Ordering::SeqCst)
    }

    /// Whether panics are currently captured at exception severity.
    pub fn exception_active(&self) -> bool {
        self.exception_active.load(Ordering::SeqCst)
    }

    /// Whether the last fault is being kept for the shutdown drain.
    pub fn fatal_active(&self) -> bool {
        self.fatal_active.load(Ordering::SeqCst)
    }

    /// Whether the pre-existing panic output is being withheld.
    pub fn display_suppressed(&self) -> bool {
        self.display_suppressed.load(Ordering::SeqCst)
    }

    fn set_exception_reporter(&self, logger: Arc<Logger>) {
        let mut slot = self
            .exception_reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(logger);
    }

    /// The logger that owns the exception claim, while capture is active.
    fn exception_reporter(&self) -> Option<Arc<Logger>> {
        if !self.exception_active() {
            return None;
        }
        self.exception_reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keeps `fault` aside for the shutdown drain, replacing any earlier
    /// one. Only the most recent pending fault is ever reported.
    pub fn record_last_fault(&self, fault: CaughtException) {
        let mut slot = self
            .last_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(fault);
    }

    /// Removes and returns the pending fault, if any.
    pub fn take_last_fault(&self) -> Option<CaughtException> {
        self.last_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn mark(marker: &AtomicBool) -> bool {
    marker
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// Claims the fault sources enabled in `logger`'s handler settings against
/// the process-wide registry.
///
/// Sources another logger already claimed are skipped. Keep the returned
/// guard alive for as long as capture should stay active; dropping it
/// applies the configured restores and drains the pending fatal fault.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// let mut overrides = faultline::SettingsPatch::new();
/// overrides.handlers.exception = Some(true);
/// overrides.handlers.fatal = Some(true);
///
/// let logger = Arc::new(faultline::builder().settings(overrides).build());
/// let _hooks = faultline::install(logger);
/// ```
pub fn install(logger: Arc<Logger>) -> InstalledHooks {
    install_with(logger, HookRegistry::global())
}

/// [`install`] against an explicit registry.
pub fn install_with(logger: Arc<Logger>, registry: Arc<HookRegistry>) -> InstalledHooks {
    let handlers = logger.settings().handlers;
    let installed_error = handlers.error && mark(&registry.error_installed);
    let installed_exception = handlers.exception && mark(&registry.exception_installed);
    let installed_fatal = handlers.fatal && mark(&registry.fatal_installed);

    let mut previous_level = None;
    if installed_error {
        registry.bridge_enabled.store(true, Ordering::SeqCst);
        let bridge = LogBridge {
            logger: logger.clone(),
            registry: registry.clone(),
        };
        // Tolerated: another global logger may already be registered, in
        // which case its records simply never reach the bridge.
        if log::set_boxed_logger(Box::new(bridge)).is_ok() {
            previous_level = Some(log::max_level());
            log::set_max_level(log::LevelFilter::Trace);
        }
    }

    if installed_exception {
        registry.set_exception_reporter(logger.clone());
        registry.exception_active.store(true, Ordering::SeqCst);
    }
    if installed_fatal {
        registry.fatal_active.store(true, Ordering::SeqCst);
    }
    if installed_exception || installed_fatal {
        registry.display_suppressed.store(true, Ordering::SeqCst);
        // one chained process hook per registry; later claims reuse it
        if mark(&registry.panic_hook_chained) {
            let hook_registry = registry.clone();
            let previous = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                handle_panic(&hook_registry, previous.as_ref(), info);
            }));
        }
    }

    InstalledHooks {
        logger,
        registry,
        installed_error,
        installed_exception,
        installed_fatal,
        previous_level,
    }
}

fn handle_panic(
    registry: &HookRegistry,
    previous: &(dyn Fn(&PanicHookInfo<'_>) + Send + Sync),
    info: &PanicHookInfo<'_>,
) {
    let fault = caught_from_panic(info);
    if crate::logger::in_pipeline() {
        // A panic raised while delivering must not re-enter the pipeline.
        registry.record_last_fault(fault);
    } else if let Some(reporter) = registry.exception_reporter() {
        reporter.report(FaultInput::Caught(fault));
    } else if registry.fatal_active() {
        registry.record_last_fault(fault);
    }
    if !registry.display_suppressed() {
        previous(info);
    }
}

fn caught_from_panic(info: &PanicHookInfo<'_>) -> CaughtException {
    let payload = info.payload();
    let message = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Box<dyn Any>".to_string()
    };
    let fault = CaughtException::new(0, message);
    match info.location() {
        Some(location) => fault.at(location.file(), location.line()),
        None => fault,
    }
}

struct LogBridge {
    logger: Arc<Logger>,
    registry: Arc<HookRegistry>,
}

impl log::Log for LogBridge {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        self.registry.bridge_enabled()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.registry.bridge_enabled() || crate::logger::in_pipeline() {
            return;
        }
        let severity = match record.level() {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Debug,
        };
        self.logger.report(FaultInput::MessageAtLine {
            severity,
            message: record.args().to_string(),
            file: record.file().unwrap_or_default().to_string(),
            line: record.line().unwrap_or(0),
        });
    }

    fn flush(&self) {}
}

/// Guard over the claimed fault sources.
///
/// Dropping the guard applies the restores the logger's settings enable and
/// reports the pending fatal fault, if the fatal source was claimed here.
#[derive(Debug)]
pub struct InstalledHooks {
    logger: Arc<Logger>,
    registry: Arc<HookRegistry>,
    installed_error: bool,
    installed_exception: bool,
    installed_fatal: bool,
    previous_level: Option<log::LevelFilter>,
}

impl InstalledHooks {
    /// Whether this guard claimed the `log` crate bridge.
    pub fn installed_error(&self) -> bool {
        self.installed_error
    }

    /// Whether this guard claimed immediate panic capture.
    pub fn installed_exception(&self) -> bool {
        self.installed_exception
    }

    /// Whether this guard claimed the shutdown drain.
    pub fn installed_fatal(&self) -> bool {
        self.installed_fatal
    }

    /// Hands the claimed sources back, as far as the logger's restore
    /// settings allow. Runs again on drop; applying twice is harmless.
    pub fn restore(&self) {
        let restore = self.logger.settings().restore;
        if self.installed_error && restore.error_handler {
            self.registry.bridge_enabled.store(false, Ordering::SeqCst);
        }
        if self.installed_exception && restore.exception_handler {
            self.registry.exception_active.store(false, Ordering::SeqCst);
        }
        if (self.installed_exception || self.installed_fatal) && restore.display {
            self.registry.display_suppressed.store(false, Ordering::SeqCst);
        }
        if restore.reporting {
            if let Some(level) = self.previous_level {
                log::set_max_level(level);
            }
        }
    }
}

impl Drop for InstalledHooks {
    fn drop(&mut self) {
        self.restore();
        if self.installed_fatal {
            self.registry.fatal_active.store(false, Ordering::SeqCst);
            if let Some(fault) = self.registry.take_last_fault() {
                let CaughtException {
                    message,
                    file,
                    line,
                    stack,
                    ..
                } = fault;
                self.logger.report(FaultInput::Detailed {
                    severity: Severity::Fatal,
                    message,
                    file,
                    line,
                    stack,
                });
            }
        }
    }
}
