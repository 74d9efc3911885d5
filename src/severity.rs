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

//! Severity classes, their numeric codes and labels, and the mapping from
//! severity onto delivery channels.

/// The severity class of a captured fault.
///
/// Every fault carries exactly one severity. Free-form severity names are
/// folded onto this set by [`Severity::classify`]; names that match nothing
/// land on [`Severity::Unclassified`] rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Fatal,
    Exception,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    /// A severity name that matched no known class.
    Unclassified,
}

impl Severity {
    /// All severity classes, ordered from most to least severe.
    pub const fn all() -> [Severity; 8] {
        [
            Severity::Fatal,
            Severity::Exception,
            Severity::Error,
            Severity::Warning,
            Severity::Notice,
            Severity::Info,
            Severity::Debug,
            Severity::Unclassified,
        ]
    }

    /// Folds a free-form severity name onto a severity class.
    ///
    /// Matching is case-insensitive and total: an unrecognized name yields
    /// [`Severity::Unclassified`], never an error.
    pub fn classify(name: &str) -> Severity {
        for severity in Severity::all() {
            if name.eq_ignore_ascii_case(severity.name()) {
                return severity;
            }
        }
        Severity::Unclassified
    }

    /// The canonical lowercase name of this severity class.
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Exception => "exception",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Unclassified => "unclassified",
        }
    }

    /// The numeric fault code assigned to this severity class.
    pub const fn code(self) -> u32 {
        match self {
            Severity::Fatal => 16,
            Severity::Exception => 1,
            Severity::Error => 256,
            Severity::Warning => 512,
            Severity::Notice => 8,
            Severity::Info => 1024,
            Severity::Debug => 2,
            Severity::Unclassified => 4096,
        }
    }

    /// The human-readable label for this severity's fault code.
    pub const fn label(self) -> &'static str {
        label_for_code(self.code())
    }

    /// The delivery channel faults of this severity are routed to.
    ///
    /// Warnings, notices, info and unclassified faults share the default
    /// channel; the other severities each own a channel of their own.
    pub const fn channel(self) -> Channel {
        match self {
            Severity::Fatal => Channel::Fatal,
            Severity::Exception => Channel::Exception,
            Severity::Error => Channel::Error,
            Severity::Debug => Channel::Debug,
            Severity::Warning | Severity::Notice | Severity::Info | Severity::Unclassified => {
                Channel::Default
            }
        }
    }
}

/// Maps a numeric fault code to its human-readable label.
///
/// Total over all inputs: codes outside the known table come back as
/// `"APPLICATION ERROR"`.
pub const fn label_for_code(code: u32) -> &'static str {
    match code {
        1 => "ERROR",
        2 => "WARNING",
        4 => "PARSING ERROR",
        8 => "NOTICE",
        16 => "CORE ERROR",
        32 => "CORE WARNING",
        64 => "COMPILE ERROR",
        128 => "COMPILE WARNING",
        256 => "USER ERROR",
        512 => "USER WARNING",
        1024 => "USER NOTICE",
        2048 => "STRICT NOTICE",
        4096 => "RECOVERABLE ERROR",
        _ => "APPLICATION ERROR",
    }
}

/// A delivery channel.
///
/// Channels are the unit of routing configuration: destinations and file
/// targets are looked up per channel, not per severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Default,
    Debug,
    Error,
    Exception,
    Fatal,
}

impl Channel {
    pub const fn all() -> [Channel; 5] {
        [
            Channel::Default,
            Channel::Debug,
            Channel::Error,
            Channel::Exception,
            Channel::Fatal,
        ]
    }

    /// The lowercase channel name, as stored in log rows.
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Default => "default",
            Channel::Debug => "debug",
            Channel::Error => "error",
            Channel::Exception => "exception",
            Channel::Fatal => "fatal",
        }
    }

    /// The uppercase channel name, as written in log file lines.
    pub const fn as_upper(self) -> &'static str {
        match self {
            Channel::Default => "DEFAULT",
            Channel::Debug => "DEBUG",
            Channel::Error => "ERROR",
            Channel::Exception => "EXCEPTION",
            Channel::Fatal => "FATAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_names() {
        assert_eq!(Severity::classify("fatal"), Severity::Fatal);
        assert_eq!(Severity::classify("EXCEPTION"), Severity::Exception);
        assert_eq!(Severity::classify("Error"), Severity::Error);
        assert_eq!(Severity::classify("wArNiNg"), Severity::Warning);
        assert_eq!(Severity::classify("notice"), Severity::Notice);
        assert_eq!(Severity::classify("INFO"), Severity::Info);
        assert_eq!(Severity::classify("debug"), Severity::Debug);
    }

    #[test]
    fn test_classify_is_total() {
        assert_eq!(Severity::classify(""), Severity::Unclassified);
        assert_eq!(Severity::classify("catastrophe"), Severity::Unclassified);
        assert_eq!(Severity::classify("errr"), Severity::Unclassified);
    }

    #[test]
    fn test_codes_and_labels() {
        assert_eq!(Severity::Fatal.code(), 16);
        assert_eq!(Severity::Fatal.label(), "CORE ERROR");
        assert_eq!(Severity::Exception.code(), 1);
        assert_eq!(Severity::Exception.label(), "ERROR");
        assert_eq!(Severity::Error.code(), 256);
        assert_eq!(Severity::Error.label(), "USER ERROR");
        assert_eq!(Severity::Warning.code(), 512);
        assert_eq!(Severity::Warning.label(), "USER WARNING");
        assert_eq!(Severity::Notice.code(), 8);
        assert_eq!(Severity::Notice.label(), "NOTICE");
        assert_eq!(Severity::Info.code(), 1024);
        assert_eq!(Severity::Info.label(), "USER NOTICE");
        assert_eq!(Severity::Debug.code(), 2);
        assert_eq!(Severity::Debug.label(), "WARNING");
        assert_eq!(Severity::Unclassified.code(), 4096);
        assert_eq!(Severity::Unclassified.label(), "RECOVERABLE ERROR");
    }

    #[test]
    fn test_label_fallback_for_unknown_codes() {
        assert_eq!(label_for_code(0), "APPLICATION ERROR");
        assert_eq!(label_for_code(3), "APPLICATION ERROR");
        assert_eq!(label_for_code(8192), "APPLICATION ERROR");
    }

    #[test]
    fn test_channel_routing() {
        assert_eq!(Severity::Fatal.channel(), Channel::Fatal);
        assert_eq!(Severity::Exception.channel(), Channel::Exception);
        assert_eq!(Severity::Error.channel(), Channel::Error);
        assert_eq!(Severity::Debug.channel(), Channel::Debug);
        assert_eq!(Severity::Warning.channel(), Channel::Default);
        assert_eq!(Severity::Notice.channel(), Channel::Default);
        assert_eq!(Severity::Info.channel(), Channel::Default);
        assert_eq!(Severity::Unclassified.channel(), Channel::Default);
    }

    #[test]
    fn test_channel_names() {
        for channel in Channel::all() {
            assert_eq!(channel.as_str().to_uppercase(), channel.as_upper());
        }
    }
}
