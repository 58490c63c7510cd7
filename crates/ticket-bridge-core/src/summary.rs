//! Event classification and ticket text.
//!
//! Turns a parsed webhook payload into the one-line ticket summary and the
//! bounded ticket description.

use crate::EventKind;
use serde::Serialize;
use serde_json::{
    ser::{Formatter, PrettyFormatter, Serializer},
    Value,
};
use std::io;

/// Hard cap on the ticket description, in bytes.
pub const MAX_DESCRIPTION_BYTES: usize = 6000;

const DEFAULT_ACTION: &str = "unknown";
const DEFAULT_TITLE: &str = "No title";
const DEFAULT_REPOSITORY: &str = "unknown/repo";

/// Build the ticket summary for an event.
///
/// | Event | Summary |
/// |---|---|
/// | `issues` | `[GitHub] Issue {action}: {issue.title} ({repository.full_name})` |
/// | `pull_request` | `[GitHub] PR {action}: {pull_request.title} ({repository.full_name})` |
/// | anything else | `[GitHub] Event: {event}` |
///
/// Missing or `null` fields, and missing or `null` parent objects, fall back
/// to `unknown`, `No title` and `unknown/repo`.
pub fn summarize(event: &EventKind, payload: &Value) -> String {
    let (label, entity) = match event {
        EventKind::Issues => ("Issue", "issue"),
        EventKind::PullRequest => ("PR", "pull_request"),
        EventKind::Other(name) => return format!("[GitHub] Event: {}", name),
    };

    let action = field_text(payload.get("action"), DEFAULT_ACTION);
    let title = field_text(
        payload.get(entity).and_then(|e| e.get("title")),
        DEFAULT_TITLE,
    );
    let repository = field_text(
        payload.get("repository").and_then(|r| r.get("full_name")),
        DEFAULT_REPOSITORY,
    );

    format!("[GitHub] {} {}: {} ({})", label, action, title, repository)
}

/// Build the ticket description: the payload as JSON indented by two spaces,
/// capped at [`MAX_DESCRIPTION_BYTES`].
///
/// Non-ASCII characters are written as `\uXXXX` escapes (surrogate pairs
/// outside the BMP), so the text is pure ASCII and the byte cap is also a
/// character cap.
pub fn describe(payload: &Value) -> String {
    truncate_to_bytes(render_ascii_pretty(payload), MAX_DESCRIPTION_BYTES)
}

fn render_ascii_pretty(payload: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, AsciiPrettyFormatter::default());
    // Serializing a `Value` into memory cannot fail: keys are always strings.
    if payload.serialize(&mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Pretty printer that escapes every non-ASCII character.
#[derive(Default)]
struct AsciiPrettyFormatter {
    pretty: PrettyFormatter<'static>,
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

fn truncate_to_bytes(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }

    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

fn field_text(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
