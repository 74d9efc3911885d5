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

//! Faultline reduces every application fault to one canonical record and
//! delivers it to the destinations its severity is configured with: append
//! log files, a queryable store, and administrator email.
//!
//! # Overview
//!
//! A capture may enter as an explicit message, a caught error, or a panic
//! picked up by the installed hooks. Whatever the entry shape, the fault is
//! normalized into the same record: severity, code, message, origin file
//! and line, call stack, and the request context active at the time.
//! Severity selects a delivery channel; the channel's configured
//! destinations receive the rendered record in order. Failures inside
//! delivery never reach the caller: the remaining destinations are skipped
//! and the failure is surfaced on the display target, worded for the
//! configured environment.
//!
//! # Examples
//!
//! Capture with the default configuration:
//!
//! ```rust,no_run
//! let logger = faultline::builder().build();
//! logger.error("lost connection to primary");
//! ```
//!
//! Override settings from TOML and take over runtime fault sources:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! let overrides = r#"
//! admin_email = "ops@example.com"
//! environment = "production"
//!
//! [handlers]
//! error = true
//! exception = true
//! fatal = true
//! "#;
//!
//! let logger = faultline::builder()
//!     .settings_toml(overrides)
//!     .expect("valid overrides")
//!     .build();
//! let _hooks = faultline::install(Arc::new(logger));
//!
//! log::warn!("disk nearly full");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod settings;
pub mod sink;

mod capture;
mod dispatch;
mod error;
mod hook;
mod message;
mod record;
mod severity;
mod trace;

pub use capture::CaptureHandle;
pub use capture::CaptureScope;
pub use error::SinkError;
pub use hook::HookRegistry;
pub use hook::InstalledHooks;
pub use hook::install;
pub use hook::install_with;
pub use message::RenderedMessage;
pub use record::CaughtException;
pub use record::ContextMap;
pub use record::FaultInput;
pub use record::FaultRecord;
pub use record::RequestContext;
pub use record::StackFrame;
pub use settings::Settings;
pub use settings::SettingsPatch;
pub use settings::SettingsRegistry;
pub use severity::Channel;
pub use severity::Severity;
pub use severity::label_for_code;
pub use trace::ArgumentValue;
pub use trace::render_trace;

mod logger;
pub use logger::Builder;
pub use logger::Logger;
pub use logger::builder;
