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

//! Fan-out of rendered faults to configured destinations.

use std::fmt;
use std::fmt::Write as _;
use std::io;
use std::io::Write as _;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::capture::CaptureScope;
use crate::error::SinkError;
use crate::message::RenderedMessage;
use crate::record::FaultRecord;
use crate::settings::Destination;
use crate::settings::Environment;
use crate::settings::Settings;
use crate::severity::label_for_code;
use crate::sink::FileStore;
use crate::sink::LogRow;
use crate::sink::LogStore;
use crate::sink::MailTransport;
use crate::sink::compose;

/// Delivers rendered faults to their channel's destinations.
///
/// Built once per logger, holding the sink collaborators and the display
/// target. Destinations run in configured order; the first failing
/// destination aborts the rest for that fault, and the failure is surfaced
/// on the display in the style the environment selects.
pub struct Dispatcher {
    files: Box<dyn FileStore>,
    store: Box<dyn LogStore>,
    mail: Box<dyn MailTransport>,
    display: Mutex<Box<dyn io::Write + Send>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("files", &self.files)
            .field("store", &self.store)
            .field("mail", &self.mail)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        files: Box<dyn FileStore>,
        store: Box<dyn LogStore>,
        mail: Box<dyn MailTransport>,
        display: Box<dyn io::Write + Send>,
    ) -> Dispatcher {
        Dispatcher {
            files,
            store,
            mail,
            display: Mutex::new(display),
        }
    }

    /// Renders and delivers one record.
    ///
    /// Rendering output is staged in the capture scope and never reaches the
    /// display. On a delivery failure the staged output is discarded first,
    /// then the failure is written to the display directly.
    pub(crate) fn dispatch(&self, record: &FaultRecord, settings: &Settings, scope: &CaptureScope) {
        let message = RenderedMessage::render(record, settings);
        let _ = scope.handle().write_all(message.plaintext.as_bytes());

        if let Err(err) = self.deliver(record, &message, settings) {
            scope.discard();
            self.display_failure(&err, &message, settings);
        }
    }

    fn deliver(
        &self,
        record: &FaultRecord,
        message: &RenderedMessage,
        settings: &Settings,
    ) -> anyhow::Result<()> {
        for destination in settings.destinations_for(record.channel()) {
            match destination {
                Destination::File => self.deliver_file(record, message, settings)?,
                Destination::Db => self.store.insert(&LogRow::new(record, message))?,
                Destination::Email => self.deliver_mail(record, message, settings)?,
            }
        }
        Ok(())
    }

    fn deliver_file(
        &self,
        record: &FaultRecord,
        message: &RenderedMessage,
        settings: &Settings,
    ) -> anyhow::Result<()> {
        let channel = record.channel();
        let target = settings.file_target_for(channel);

        let mut line = format!(
            "{} - {} --> {}",
            message.field("timestamp"),
            channel.as_upper(),
            message.field("message"),
        );
        if target.details {
            let _ = write!(
                line,
                " POST: {} GET: {} COOKIE: {} SERVER: {} TRACE: {}",
                message.field("post"),
                message.field("get"),
                message.field("cookie"),
                message.field("server"),
                message.field("backtrace"),
            );
        }
        line.push('\n');

        self.files.write(&target.file_path(), target.mode, &line)
    }

    fn deliver_mail(
        &self,
        record: &FaultRecord,
        message: &RenderedMessage,
        settings: &Settings,
    ) -> anyhow::Result<()> {
        match compose(record, message, settings) {
            Some(email) => self.mail.send(&email),
            // no administrator address; skip silently
            None => Ok(()),
        }
    }

    fn display_failure(&self, err: &anyhow::Error, message: &RenderedMessage, settings: &Settings) {
        let mut display = self.display.lock().unwrap_or_else(PoisonError::into_inner);
        // display is best effort; a broken display must not unwind delivery
        let _ = match settings.environment {
            Environment::Development => write_development(display.as_mut(), err, message),
            Environment::Production => write_production(display.as_mut(), err),
        };
        let _ = display.flush();
    }
}

fn write_development(
    out: &mut (dyn io::Write + Send),
    err: &anyhow::Error,
    message: &RenderedMessage,
) -> io::Result<()> {
    match err.downcast_ref::<SinkError>() {
        Some(sink) => write!(
            out,
            "<p>{}: {} in {} on line {}</p>",
            sink.code(),
            sink.message(),
            sink.file(),
            sink.line()
        )?,
        None => write!(out, "<p>{err:#}</p>")?,
    }
    write!(
        out,
        "<pre>Trace: {}<br />SERVER: {}<br />COOKIE: {}<br />GET: {}<br />POST: {}</pre>",
        message.field("backtrace"),
        message.field("server"),
        message.field("cookie"),
        message.field("get"),
        message.field("post"),
    )
}

fn write_production(out: &mut (dyn io::Write + Send), err: &anyhow::Error) -> io::Result<()> {
    // the heading classifies the delivery failure, not the fault it carried
    let label = match err.downcast_ref::<SinkError>() {
        Some(sink) => label_for_code(sink.code()),
        None => "APPLICATION ERROR",
    };
    write!(
        out,
        "<h2>{label}</h2><hr>We encountered an error and notified the administrator/s.<br />\
         Please go back and try again.<br />"
    )
}
