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

//! Backtrace rendering.
//!
//! A record's stored stack is rendered to a single human-readable line
//! naming the innermost identifiable call, not a frame-per-line listing.

use std::fmt::Write;

use crate::record::FaultRecord;
use crate::severity::label_for_code;

/// A captured argument value, as rendered inside a trace line.
///
/// Values are stored pre-typed rather than pre-rendered so that nested
/// structures print recursively.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Key/value pairs; keys print raw, values print recursively.
    Array(Vec<(String, ArgumentValue)>),
    /// A typed object, rendered by type name only.
    Object(String),
    /// An external handle, rendered by its kind.
    Resource(String),
}

impl ArgumentValue {
    /// Renders this value the way trace lines show arguments.
    ///
    /// Strings are quoted with newlines stripped, booleans render as `1` or
    /// the empty string, null renders as `NULL`, and containers render their
    /// shape around recursively rendered elements.
    pub fn render(&self) -> String {
        match self {
            ArgumentValue::Null => "NULL".to_string(),
            ArgumentValue::Bool(true) => "1".to_string(),
            ArgumentValue::Bool(false) => String::new(),
            ArgumentValue::Int(value) => value.to_string(),
            ArgumentValue::Float(value) => {
                if value.is_finite() && value.fract() == 0.0 {
                    format!("{value:.1}")
                } else {
                    value.to_string()
                }
            }
            ArgumentValue::Str(value) => format!("\"{}\"", value.replace('\n', "")),
            ArgumentValue::Array(entries) => {
                let mut out = String::from("array(");
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{} => {}", key, value.render());
                }
                out.push(')');
                out
            }
            ArgumentValue::Object(type_name) => format!("object({type_name})"),
            ArgumentValue::Resource(kind) => format!("resource({kind})"),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Str(value.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        ArgumentValue::Str(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Bool(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Int(value)
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        ArgumentValue::Float(value)
    }
}

/// Renders a record's stack to a single trace line.
///
/// Frames are walked oldest first and the first frame that identifies a call
/// wins; later frames never replace it. A frame with a declaring type renders
/// as `<label> in class <Type>::<callee>(<args>)`, where the label comes from
/// the record's fault code. A plain function frame renders as
/// `in function <callee>(<args>)`. Records with no identifiable frame render
/// as the empty string.
pub fn render_trace(record: &FaultRecord) -> String {
    for frame in record.stack() {
        let arguments = frame
            .arguments()
            .iter()
            .map(ArgumentValue::render)
            .collect::<Vec<_>>()
            .join(", ");
        if let Some(declaring_type) = frame.declaring_type() {
            return format!(
                "{} in class {}::{}({})",
                label_for_code(record.code()),
                declaring_type,
                frame.callee(),
                arguments
            );
        }
        if !frame.callee().is_empty() {
            return format!("in function {}({})", frame.callee(), arguments);
        }
    }
    String::new()
}
