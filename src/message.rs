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

//! Presentation of fault records.
//!
//! Rendering is total: it never fails and never skips a field. Empty request
//! maps render as `{}`, an empty trace renders as an empty string, and a
//! timestamp mask that jiff rejects falls back to the default mask.

use std::collections::BTreeMap;
use std::fmt::Write;

use jiff::Zoned;
use jiff::fmt::strtime;

use crate::record::ContextMap;
use crate::record::FaultRecord;
use crate::record::RequestContext;
use crate::settings::DEFAULT_DATE_FORMAT;
use crate::settings::Settings;
use crate::severity::label_for_code;
use crate::trace::render_trace;

/// The inline stylesheet embedded in HTML email bodies.
const STYLE_SHEET: &str = "body { font: 12px verdana, arial, helvetica, sans-serif; color: #000; background-color: #fff; } \
table { border-collapse: collapse; width: 100%; margin: 8px 0; } \
th { background-color: #990000; color: #fff; padding: 6px; text-align: left; } \
td { border: 1px solid #cccccc; padding: 6px; vertical-align: top; } \
pre { background-color: #f4f4f4; border: 1px solid #cccccc; padding: 6px; overflow: auto; } \
h2 { color: #990000; }";

/// A fault rendered for delivery.
///
/// Every sink draws from the same rendering: file lines and store rows pick
/// from `fields`, email bodies use `plaintext` and `html`.
#[derive(Clone, Debug)]
pub struct RenderedMessage {
    /// Plaintext body: a marked summary line plus, when details are enabled,
    /// separator-delimited trace and request sections.
    pub plaintext: String,
    /// HTML body fragment: a heading and a field table, with trace and
    /// request dumps when details are enabled.
    pub html: String,
    /// The fixed stylesheet HTML deliveries embed.
    pub style: &'static str,
    /// Flat field map: type, label, errno, errstr, errfile, errline,
    /// backtrace, message, timestamp, userid, and the four request snapshots
    /// as JSON.
    pub fields: BTreeMap<&'static str, String>,
}

impl RenderedMessage {
    /// Renders a record under the given configuration.
    pub fn render(record: &FaultRecord, settings: &Settings) -> RenderedMessage {
        let label = label_for_code(record.code());
        let trace = render_trace(record);
        let timestamp = format_timestamp(&settings.date_format);
        let summary = format!(
            "{label}: {} in {} on line {}",
            record.message(),
            record.file(),
            record.line()
        );

        let context = record.context();
        let mut fields = BTreeMap::new();
        fields.insert("type", record.channel().as_str().to_string());
        fields.insert("label", label.to_string());
        fields.insert("errno", record.code().to_string());
        fields.insert("errstr", record.message().to_string());
        fields.insert("errfile", record.file().to_string());
        fields.insert("errline", record.line().to_string());
        fields.insert("backtrace", trace.clone());
        fields.insert("message", summary.clone());
        fields.insert("timestamp", timestamp.clone());
        fields.insert("userid", "0".to_string());
        fields.insert("post", dump_compact(&context.post));
        fields.insert("get", dump_compact(&context.get));
        fields.insert("cookie", dump_compact(&context.cookie));
        fields.insert("server", dump_compact(&context.server));

        let details = settings.email.details;
        let plaintext = render_plaintext(&summary, &trace, context, details);
        let html = render_html(record, &summary, &trace, &timestamp, details);

        RenderedMessage {
            plaintext,
            html,
            style: STYLE_SHEET,
            fields,
        }
    }

    /// A field by key. Rendering always populates every key it documents, so
    /// missing keys come back as an empty string.
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or_default()
    }
}

fn render_plaintext(summary: &str, trace: &str, context: &RequestContext, details: bool) -> String {
    const SEPARATOR: &str = "---------------------------------------------";

    let mut out = format!("*** {summary} ***\n");
    if details {
        let _ = write!(out, "Trace: {trace}\n{SEPARATOR}\n");
        let _ = write!(out, "Server Info:\n{}\n{SEPARATOR}\n", dump_pretty(&context.server));
        let _ = write!(out, "Cookie:\n{}\n{SEPARATOR}\n", dump_pretty(&context.cookie));
        let _ = write!(out, "Post:\n{}\n{SEPARATOR}\n", dump_pretty(&context.post));
        let _ = write!(out, "Get:\n{}\n", dump_pretty(&context.get));
    }
    out
}

fn render_html(
    record: &FaultRecord,
    summary: &str,
    trace: &str,
    timestamp: &str,
    details: bool,
) -> String {
    let mut out = format!(
        "<strong>{} at {}</strong>",
        record.channel().as_str(),
        escape_html(timestamp)
    );
    let _ = write!(
        out,
        "<table><thead><tr><th colspan=\"2\">{}</th></tr></thead><tbody>",
        escape_html(summary)
    );
    let _ = write!(
        out,
        "<tr valign=\"top\"><td><b>Error</b></td><td>{}</td></tr>",
        escape_html(record.message())
    );
    let _ = write!(
        out,
        "<tr valign=\"top\"><td><b>Error No.</b></td><td>{}</td></tr>",
        record.code()
    );
    let _ = write!(
        out,
        "<tr valign=\"top\"><td><b>File</b></td><td>{}</td></tr>",
        escape_html(record.file())
    );
    let _ = write!(
        out,
        "<tr valign=\"top\"><td><b>Line</b></td><td>{}</td></tr>",
        record.line()
    );
    if details {
        let _ = write!(
            out,
            "<tr valign=\"top\"><td><b>Trace</b></td><td>{}</td></tr>",
            escape_html(trace)
        );
    }
    out.push_str("</tbody></table>");
    if details {
        let context = record.context();
        let _ = write!(
            out,
            "<strong>Server Info</strong><pre>{}</pre>",
            escape_html(&dump_pretty(&context.server))
        );
        let _ = write!(
            out,
            "<strong>Cookie</strong><pre>{}</pre>",
            escape_html(&dump_pretty(&context.cookie))
        );
        let _ = write!(
            out,
            "<strong>Post</strong><pre>{}</pre>",
            escape_html(&dump_pretty(&context.post))
        );
        let _ = write!(
            out,
            "<strong>Get</strong><pre>{}</pre>",
            escape_html(&dump_pretty(&context.get))
        );
    }
    out
}

/// Formats the current wall-clock time with a strftime mask.
///
/// A mask jiff cannot apply falls back to [`DEFAULT_DATE_FORMAT`] rather
/// than failing the capture.
pub(crate) fn format_timestamp(mask: &str) -> String {
    let now = Zoned::now();
    strtime::format(mask, &now)
        .unwrap_or_else(|_| strtime::format(DEFAULT_DATE_FORMAT, &now).unwrap_or_default())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn dump_compact(map: &ContextMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

fn dump_pretty(map: &ContextMap) -> String {
    serde_json::to_string_pretty(map).unwrap_or_else(|_| "{}".to_string())
}
