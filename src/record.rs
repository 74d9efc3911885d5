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

//! Canonical fault records and the normalization of capture inputs.
//!
//! Faults enter the pipeline in several shapes, from a bare message up to a
//! caught failure with a raw stack. [`FaultRecord::from_input`] reduces every
//! shape to one canonical record with no optional parts, backfilling the
//! origin from the caller's source location where the input leaves it out.

use std::panic::Location;

use serde_json::Map;
use serde_json::Value;

use crate::severity::Channel;
use crate::severity::Severity;
use crate::trace::ArgumentValue;

/// A map of request-shaped key/value state.
pub type ContextMap = Map<String, Value>;

/// One frame of a call stack attached to a fault.
#[derive(Clone, Debug, PartialEq)]
pub struct StackFrame {
    callee: String,
    declaring_type: Option<String>,
    arguments: Vec<ArgumentValue>,
}

impl StackFrame {
    /// A frame for a free function call.
    pub fn function(callee: impl Into<String>) -> StackFrame {
        StackFrame {
            callee: callee.into(),
            declaring_type: None,
            arguments: vec![],
        }
    }

    /// A frame for a call on a named type.
    pub fn method(declaring_type: impl Into<String>, callee: impl Into<String>) -> StackFrame {
        StackFrame {
            callee: callee.into(),
            declaring_type: Some(declaring_type.into()),
            arguments: vec![],
        }
    }

    /// Attaches the argument values the callee was invoked with.
    pub fn with_arguments(mut self, arguments: Vec<ArgumentValue>) -> StackFrame {
        self.arguments = arguments;
        self
    }

    pub fn callee(&self) -> &str {
        &self.callee
    }

    pub fn declaring_type(&self) -> Option<&str> {
        self.declaring_type.as_deref()
    }

    pub fn arguments(&self) -> &[ArgumentValue] {
        &self.arguments
    }
}

/// Request-shaped ambient state captured alongside every fault.
///
/// All four maps default to empty; an empty map renders as `{}` everywhere
/// downstream rather than being omitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestContext {
    pub post: ContextMap,
    pub get: ContextMap,
    pub cookie: ContextMap,
    pub server: ContextMap,
}

impl RequestContext {
    pub fn new() -> RequestContext {
        RequestContext::default()
    }
}

/// A caught failure carried into the capture pipeline.
///
/// An empty `file` or a zero `line` means the origin is unknown and will be
/// backfilled from the capture call site during normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct CaughtException {
    pub code: u32,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub stack: Vec<StackFrame>,
}

impl CaughtException {
    pub fn new(code: u32, message: impl Into<String>) -> CaughtException {
        CaughtException {
            code,
            message: message.into(),
            file: String::new(),
            line: 0,
            stack: vec![],
        }
    }

    /// Wraps a standard error, flattening its source chain into the message
    /// and taking the caller's location as the origin.
    #[track_caller]
    pub fn from_error(err: &dyn std::error::Error) -> CaughtException {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        let caller = Location::caller();
        CaughtException {
            code: 0,
            message,
            file: caller.file().to_string(),
            line: caller.line(),
            stack: vec![],
        }
    }

    /// Pins the failure's origin to an explicit file and line.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> CaughtException {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Attaches a raw stack, newest frame first.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> CaughtException {
        self.stack = stack;
        self
    }
}

/// The shapes a fault may enter the capture pipeline in.
#[derive(Clone, Debug, PartialEq)]
pub enum FaultInput {
    /// Nothing to capture; normalization yields no record and delivery is
    /// never invoked.
    Idle,
    /// A caught failure. The record's severity is always
    /// [`Severity::Exception`]; code, message, origin and stack come from
    /// the exception itself.
    Caught(CaughtException),
    /// A bare message. The origin is the capture call site.
    Message {
        severity: Severity,
        message: String,
    },
    /// A message raised from a known file. The line is the capture call
    /// site's.
    MessageInFile {
        severity: Severity,
        message: String,
        file: String,
    },
    /// A message with an explicit origin.
    MessageAtLine {
        severity: Severity,
        message: String,
        file: String,
        line: u32,
    },
    /// A fully specified fault including a raw stack, newest frame first.
    Detailed {
        severity: Severity,
        message: String,
        file: String,
        line: u32,
        stack: Vec<StackFrame>,
    },
}

/// The canonical, fully populated form every captured fault is reduced to.
#[derive(Clone, Debug, PartialEq)]
pub struct FaultRecord {
    severity: Severity,
    code: u32,
    message: String,
    file: String,
    line: u32,
    stack: Vec<StackFrame>,
    context: RequestContext,
}

impl FaultRecord {
    /// Normalizes a capture input into a record.
    ///
    /// [`FaultInput::Idle`] yields `None`. Every other shape yields a record
    /// whose file and line are always populated: an input that omits them,
    /// or carries an empty file or zero line, has them backfilled from this
    /// call's source location.
    ///
    /// Raw stacks are taken newest-first. The first raw frame is the capture
    /// call itself and is dropped; the remainder is stored oldest-first.
    #[track_caller]
    pub fn from_input(input: FaultInput, context: RequestContext) -> Option<FaultRecord> {
        let caller = Location::caller();
        match input {
            FaultInput::Idle => None,
            FaultInput::Caught(exception) => {
                let (file, line) = resolve_origin(exception.file, exception.line, caller);
                Some(FaultRecord {
                    severity: Severity::Exception,
                    code: exception.code,
                    message: exception.message,
                    file,
                    line,
                    stack: normalize_stack(exception.stack),
                    context,
                })
            }
            FaultInput::Message { severity, message } => Some(FaultRecord {
                severity,
                code: severity.code(),
                message,
                file: caller.file().to_string(),
                line: caller.line(),
                stack: vec![],
                context,
            }),
            FaultInput::MessageInFile {
                severity,
                message,
                file,
            } => {
                let (file, line) = resolve_origin(file, 0, caller);
                Some(FaultRecord {
                    severity,
                    code: severity.code(),
                    message,
                    file,
                    line,
                    stack: vec![],
                    context,
                })
            }
            FaultInput::MessageAtLine {
                severity,
                message,
                file,
                line,
            } => {
                let (file, line) = resolve_origin(file, line, caller);
                Some(FaultRecord {
                    severity,
                    code: severity.code(),
                    message,
                    file,
                    line,
                    stack: vec![],
                    context,
                })
            }
            FaultInput::Detailed {
                severity,
                message,
                file,
                line,
                stack,
            } => {
                let (file, line) = resolve_origin(file, line, caller);
                Some(FaultRecord {
                    severity,
                    code: severity.code(),
                    message,
                    file,
                    line,
                    stack: normalize_stack(stack),
                    context,
                })
            }
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The numeric fault code, either severity-derived or carried by the
    /// caught exception.
    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// The stored stack, oldest frame first. Empty when the input carried no
    /// raw stack.
    pub fn stack(&self) -> &[StackFrame] {
        &self.stack
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The delivery channel this record is routed to.
    pub fn channel(&self) -> Channel {
        self.severity.channel()
    }
}

fn resolve_origin(file: String, line: u32, caller: &Location) -> (String, u32) {
    let file = if file.is_empty() {
        caller.file().to_string()
    } else {
        file
    };
    let line = if line == 0 { caller.line() } else { line };
    (file, line)
}

fn normalize_stack(mut raw: Vec<StackFrame>) -> Vec<StackFrame> {
    // The newest raw frame is the capture call itself.
    if !raw.is_empty() {
        raw.remove(0);
    }
    raw.reverse();
    raw
}
