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

//! Capture configuration.
//!
//! A [`Settings`] value is always fully resolved: every knob has a concrete
//! value. Callers never build one field by field. They start from the process
//! defaults held in a [`SettingsRegistry`] and overlay a sparse
//! [`SettingsPatch`], in which every leaf is optional and absent leaves keep
//! the default. Patches deserialize from TOML, so external configuration and
//! programmatic overrides share one shape.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Context;
use serde::Deserialize;

use crate::severity::Channel;

/// The fallback timestamp mask, in strftime syntax.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A sink a channel's faults are delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Append a one-line summary to the channel's log file.
    File,
    /// Insert a structured row into the log store.
    Db,
    /// Send the rendered fault to the administrator address.
    Email,
}

/// How the file sink opens a channel's log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Append,
    Truncate,
}

/// The deployment environment, selecting the failure display style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// The body shape of administrator emails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailContent {
    Plaintext,
    Html,
    /// MIME multipart/alternative carrying both plaintext and HTML.
    #[default]
    Multi,
}

/// Where and how one channel's log file is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTarget {
    /// Directory the log file lives in.
    pub path: PathBuf,
    /// File name within `path`.
    pub name: String,
    pub mode: WriteMode,
    /// Whether file lines carry the request snapshot and trace appendix.
    pub details: bool,
}

impl FileTarget {
    /// The full path of this target's log file.
    pub fn file_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }
}

/// Administrator email options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSettings {
    pub content: EmailContent,
    /// Whether email bodies carry the trace and request snapshot sections.
    pub details: bool,
    /// The `From` address on outgoing mail.
    pub from: String,
}

/// Which runtime fault triggers a logger may take over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerSettings {
    pub error: bool,
    pub exception: bool,
    pub fatal: bool,
}

/// Which pieces of ambient state to put back when hooks are released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreSettings {
    pub error_handler: bool,
    pub exception_handler: bool,
    pub display: bool,
    pub reporting: bool,
}

/// Log store location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    pub path: PathBuf,
}

/// A value chosen per delivery channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelMap<T> {
    pub default: T,
    pub debug: T,
    pub error: T,
    pub exception: T,
    pub fatal: T,
}

impl<T> ChannelMap<T> {
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Default => &self.default,
            Channel::Debug => &self.debug,
            Channel::Error => &self.error,
            Channel::Exception => &self.exception,
            Channel::Fatal => &self.fatal,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut T {
        match channel {
            Channel::Default => &mut self.default,
            Channel::Debug => &mut self.debug,
            Channel::Error => &mut self.error,
            Channel::Exception => &mut self.exception,
            Channel::Fatal => &mut self.fatal,
        }
    }
}

/// A fully resolved capture configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Ordered destinations per channel; delivery walks each list in order.
    pub destinations: ChannelMap<Vec<Destination>>,
    /// File sink target per channel.
    pub files: ChannelMap<FileTarget>,
    pub handlers: HandlerSettings,
    pub restore: RestoreSettings,
    /// Recipient of administrator emails. Empty means email delivery is
    /// skipped silently.
    pub admin_email: String,
    pub email: EmailSettings,
    /// Timestamp mask in strftime syntax.
    pub date_format: String,
    pub environment: Environment,
    pub database: StoreSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let file_target = |name: &str, details: bool| FileTarget {
            path: PathBuf::from("logs"),
            name: name.to_string(),
            mode: WriteMode::Append,
            details,
        };

        Settings {
            destinations: ChannelMap {
                default: vec![Destination::Db],
                debug: vec![Destination::Db],
                error: vec![Destination::File, Destination::Db],
                exception: vec![Destination::File, Destination::Db, Destination::Email],
                fatal: vec![Destination::File, Destination::Db, Destination::Email],
            },
            files: ChannelMap {
                default: file_target("error.log", false),
                debug: file_target("error.log", false),
                error: file_target("error.log", false),
                exception: file_target("exception.log", true),
                fatal: file_target("exception.log", true),
            },
            handlers: HandlerSettings::default(),
            restore: RestoreSettings::default(),
            admin_email: String::new(),
            email: EmailSettings {
                content: EmailContent::Multi,
                details: true,
                from: "faultline@localhost".to_string(),
            },
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            environment: Environment::Development,
            database: StoreSettings {
                path: PathBuf::from("logs/faultline.db"),
            },
        }
    }
}

impl Settings {
    /// The ordered destination list for a channel.
    pub fn destinations_for(&self, channel: Channel) -> &[Destination] {
        self.destinations.get(channel)
    }

    /// The file sink target for a channel.
    pub fn file_target_for(&self, channel: Channel) -> &FileTarget {
        self.files.get(channel)
    }

    /// Overlays a sparse patch onto this configuration, leafwise.
    ///
    /// Scalar leaves replace the current value when present. List leaves are
    /// replaced wholesale, never concatenated.
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        fn merge_destinations(slot: &mut Vec<Destination>, patch: &Option<Vec<Destination>>) {
            if let Some(list) = patch {
                *slot = list.clone();
            }
        }

        fn merge_file(target: &mut FileTarget, patch: &FileTargetPatch) {
            if let Some(path) = &patch.path {
                target.path = path.clone();
            }
            if let Some(name) = &patch.name {
                target.name = name.clone();
            }
            if let Some(mode) = patch.mode {
                target.mode = mode;
            }
            if let Some(details) = patch.details {
                target.details = details;
            }
        }

        let mut next = self.clone();

        merge_destinations(&mut next.destinations.default, &patch.destinations.default);
        merge_destinations(&mut next.destinations.debug, &patch.destinations.debug);
        merge_destinations(&mut next.destinations.error, &patch.destinations.error);
        merge_destinations(&mut next.destinations.exception, &patch.destinations.exception);
        merge_destinations(&mut next.destinations.fatal, &patch.destinations.fatal);

        merge_file(&mut next.files.default, &patch.files.default);
        merge_file(&mut next.files.debug, &patch.files.debug);
        merge_file(&mut next.files.error, &patch.files.error);
        merge_file(&mut next.files.exception, &patch.files.exception);
        merge_file(&mut next.files.fatal, &patch.files.fatal);

        if let Some(error) = patch.handlers.error {
            next.handlers.error = error;
        }
        if let Some(exception) = patch.handlers.exception {
            next.handlers.exception = exception;
        }
        if let Some(fatal) = patch.handlers.fatal {
            next.handlers.fatal = fatal;
        }

        if let Some(error_handler) = patch.restore.error_handler {
            next.restore.error_handler = error_handler;
        }
        if let Some(exception_handler) = patch.restore.exception_handler {
            next.restore.exception_handler = exception_handler;
        }
        if let Some(display) = patch.restore.display {
            next.restore.display = display;
        }
        if let Some(reporting) = patch.restore.reporting {
            next.restore.reporting = reporting;
        }

        if let Some(admin_email) = &patch.admin_email {
            next.admin_email = admin_email.clone();
        }
        if let Some(content) = patch.email.content {
            next.email.content = content;
        }
        if let Some(details) = patch.email.details {
            next.email.details = details;
        }
        if let Some(from) = &patch.email.from {
            next.email.from = from.clone();
        }
        if let Some(date_format) = &patch.date_format {
            next.date_format = date_format.clone();
        }
        if let Some(environment) = patch.environment {
            next.environment = environment;
        }
        if let Some(path) = &patch.database.path {
            next.database.path = path.clone();
        }

        next
    }
}

/// A sparse override of [`Settings`].
///
/// Every leaf is optional; absent leaves keep whatever they are overlaid on.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub destinations: DestinationsPatch,
    pub files: FilesPatch,
    pub handlers: HandlersPatch,
    pub restore: RestorePatch,
    pub admin_email: Option<String>,
    pub email: EmailPatch,
    pub date_format: Option<String>,
    pub environment: Option<Environment>,
    pub database: StorePatch,
}

impl SettingsPatch {
    pub fn new() -> Self {
        SettingsPatch::default()
    }

    /// Parses a patch from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<SettingsPatch> {
        toml::from_str(text).context("malformed settings overrides")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DestinationsPatch {
    pub default: Option<Vec<Destination>>,
    pub debug: Option<Vec<Destination>>,
    pub error: Option<Vec<Destination>>,
    pub exception: Option<Vec<Destination>>,
    pub fatal: Option<Vec<Destination>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileTargetPatch {
    pub path: Option<PathBuf>,
    pub name: Option<String>,
    pub mode: Option<WriteMode>,
    pub details: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilesPatch {
    pub default: FileTargetPatch,
    pub debug: FileTargetPatch,
    pub error: FileTargetPatch,
    pub exception: FileTargetPatch,
    pub fatal: FileTargetPatch,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandlersPatch {
    pub error: Option<bool>,
    pub exception: Option<bool>,
    pub fatal: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestorePatch {
    pub error_handler: Option<bool>,
    pub exception_handler: Option<bool>,
    pub display: Option<bool>,
    pub reporting: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailPatch {
    pub content: Option<EmailContent>,
    pub details: Option<bool>,
    pub from: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorePatch {
    pub path: Option<PathBuf>,
}

/// Process-wide default settings.
///
/// Defaults are built lazily on first use. An external configuration source
/// may [`seed`](SettingsRegistry::seed) them exactly once before loggers
/// resolve against them; later seeds are ignored. Explicit
/// [`update`](SettingsRegistry::update) calls mutate the defaults for every
/// logger resolved afterwards.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    defaults: Mutex<Settings>,
    seeded: AtomicBool,
}

static GLOBAL: LazyLock<Arc<SettingsRegistry>> = LazyLock::new(Arc::default);

impl SettingsRegistry {
    pub fn new() -> SettingsRegistry {
        SettingsRegistry::default()
    }

    /// The registry shared by loggers that are not given their own.
    pub fn global() -> Arc<SettingsRegistry> {
        GLOBAL.clone()
    }

    /// A copy of the current defaults.
    pub fn snapshot(&self) -> Settings {
        self.defaults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overlays external configuration onto the defaults, first call wins.
    ///
    /// Returns whether this call was the one that seeded the registry.
    pub fn seed(&self, patch: &SettingsPatch) -> bool {
        if self
            .seeded
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.update(patch);
        true
    }

    /// Seeds the registry from TOML text, first call wins.
    pub fn seed_toml(&self, text: &str) -> anyhow::Result<bool> {
        let patch = SettingsPatch::from_toml_str(text)?;
        Ok(self.seed(&patch))
    }

    /// Overlays a patch onto the defaults for all future resolutions.
    pub fn update(&self, patch: &SettingsPatch) {
        let mut defaults = self.defaults.lock().unwrap_or_else(PoisonError::into_inner);
        *defaults = defaults.merged(patch);
    }

    /// Resolves an instance configuration: current defaults plus overrides.
    pub fn resolve(&self, overrides: &SettingsPatch) -> Settings {
        self.snapshot().merged(overrides)
    }
}
