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

use serde_json::Value;
use uuid::Uuid;

use crate::error::SinkError;
use crate::message::RenderedMessage;
use crate::message::escape_html;
use crate::record::FaultRecord;
use crate::settings::EmailContent;
use crate::settings::Settings;
use crate::sink::MailTransport;

/// A composed administrator email, ready for a [`MailTransport`].
#[derive(Clone, Debug, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Raw header block, CRLF-terminated lines.
    pub headers: String,
}

/// Composes the administrator email for a rendered fault.
///
/// Returns `None` when no administrator address is configured; an empty
/// address means email delivery is skipped, not an error. The subject names
/// the originating host, taken from the request context's `HTTP_HOST` entry
/// with `localhost` standing in when absent.
pub fn compose(
    record: &FaultRecord,
    message: &RenderedMessage,
    settings: &Settings,
) -> Option<Email> {
    if settings.admin_email.is_empty() {
        return None;
    }

    let host = record
        .context()
        .server
        .get("HTTP_HOST")
        .and_then(Value::as_str)
        .unwrap_or("localhost");
    let subject = format!("Critical problem on {host}");
    let from = &settings.email.from;

    let (body, headers) = match settings.email.content {
        EmailContent::Plaintext => (message.plaintext.clone(), format!("From: {from}\r\n")),
        EmailContent::Html => (
            html_document(message, &subject),
            format!(
                "From: {from}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n"
            ),
        ),
        EmailContent::Multi => {
            let boundary = format!("np{}", Uuid::new_v4().simple());
            let body = format!(
                "This is a MIME encoded message.\r\n\r\n\
                 --{boundary}\r\n\
                 Content-type: text/plain;charset=utf-8\r\n\r\n\
                 {plain}\r\n\r\n\
                 --{boundary}\r\n\
                 Content-type: text/html;charset=utf-8\r\n\r\n\
                 {html}\r\n\r\n\
                 --{boundary}--",
                plain = message.plaintext,
                html = html_document(message, &subject),
            );
            let headers = format!(
                "From: {from}\r\nMIME-Version: 1.0\r\n\
                 Content-Type: multipart/alternative;boundary=\"{boundary}\"\r\n"
            );
            (body, headers)
        }
    };

    Some(Email {
        to: settings.admin_email.clone(),
        subject,
        body,
        headers,
    })
}

/// Wraps the HTML fragment in a standalone document with the embedded
/// stylesheet, as mail clients render bodies in isolation.
fn html_document(message: &RenderedMessage, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n\
         <title>{}</title>\n<style type=\"text/css\">\n{}\n</style>\n</head>\n\
         <body>\n{}\n</body>\n</html>",
        escape_html(title),
        message.style,
        message.html
    )
}

/// The transport used when none is configured. Every send fails, tripping
/// the delivery boundary; with the default empty administrator address it is
/// never reached.
#[derive(Debug, Default)]
pub struct UnconfiguredMailer;

impl MailTransport for UnconfiguredMailer {
    fn send(&self, _email: &Email) -> anyhow::Result<()> {
        Err(SinkError::new("no mail transport configured").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FaultInput;
    use crate::record::RequestContext;
    use crate::severity::Severity;

    fn sample(admin: &str, content: EmailContent) -> (FaultRecord, RenderedMessage, Settings) {
        let mut settings = Settings::default();
        settings.admin_email = admin.to_string();
        settings.email.content = content;

        let mut context = RequestContext::new();
        context
            .server
            .insert("HTTP_HOST".to_string(), "app.example.com".into());
        let record = FaultRecord::from_input(
            FaultInput::MessageAtLine {
                severity: Severity::Fatal,
                message: "segfault imminent".to_string(),
                file: "core.rs".to_string(),
                line: 3,
            },
            context,
        )
        .unwrap();
        let message = RenderedMessage::render(&record, &settings);
        (record, message, settings)
    }

    #[test]
    fn test_empty_admin_address_composes_nothing() {
        let (record, message, settings) = sample("", EmailContent::Multi);
        assert_eq!(compose(&record, &message, &settings), None);
    }

    #[test]
    fn test_subject_names_host() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Plaintext);
        let email = compose(&record, &message, &settings).unwrap();
        assert_eq!(email.to, "ops@example.com");
        assert_eq!(email.subject, "Critical problem on app.example.com");
    }

    #[test]
    fn test_subject_falls_back_to_localhost() {
        let mut settings = Settings::default();
        settings.admin_email = "ops@example.com".to_string();
        let record = FaultRecord::from_input(
            FaultInput::Message {
                severity: Severity::Fatal,
                message: "down".to_string(),
            },
            RequestContext::new(),
        )
        .unwrap();
        let message = RenderedMessage::render(&record, &settings);
        let email = compose(&record, &message, &settings).unwrap();
        assert_eq!(email.subject, "Critical problem on localhost");
    }

    #[test]
    fn test_plaintext_body_and_minimal_headers() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Plaintext);
        let email = compose(&record, &message, &settings).unwrap();
        assert_eq!(email.body, message.plaintext);
        assert_eq!(email.headers, "From: faultline@localhost\r\n");
    }

    #[test]
    fn test_html_body_is_standalone_document() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Html);
        let email = compose(&record, &message, &settings).unwrap();
        assert!(email.body.starts_with("<!DOCTYPE html>"));
        assert!(email.body.contains("<style type=\"text/css\">"));
        assert!(email.body.contains(&message.html));
        assert!(email.headers.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_multipart_framing() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Multi);
        let email = compose(&record, &message, &settings).unwrap();

        let marker = "boundary=\"";
        let start = email.headers.find(marker).unwrap() + marker.len();
        let end = email.headers[start..].find('"').unwrap() + start;
        let boundary = &email.headers[start..end];
        assert!(boundary.starts_with("np"));

        assert!(email.body.starts_with("This is a MIME encoded message.\r\n"));
        assert!(email.body.contains(&format!("--{boundary}\r\nContent-type: text/plain;charset=utf-8")));
        assert!(email.body.contains(&format!("--{boundary}\r\nContent-type: text/html;charset=utf-8")));
        assert!(email.body.ends_with(&format!("--{boundary}--")));
        assert!(
            email
                .headers
                .contains("Content-Type: multipart/alternative;boundary=")
        );
    }

    #[test]
    fn test_distinct_emails_use_distinct_boundaries() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Multi);
        let first = compose(&record, &message, &settings).unwrap();
        let second = compose(&record, &message, &settings).unwrap();
        assert_ne!(first.headers, second.headers);
    }

    #[test]
    fn test_unconfigured_mailer_always_fails() {
        let (record, message, settings) = sample("ops@example.com", EmailContent::Plaintext);
        let email = compose(&record, &message, &settings).unwrap();
        let err = UnconfiguredMailer.send(&email).unwrap_err();
        let sink = err.downcast_ref::<SinkError>().unwrap();
        assert_eq!(sink.message(), "no mail transport configured");
    }
}
