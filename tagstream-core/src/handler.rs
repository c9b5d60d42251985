//! Event sink traits and shared event types.
//!
//! Two traits, one per layer:
//!
//! - [`TokenSink`] receives lexical events straight from the tokenizer
//!   (tag name spans, attribute fragments, raw comment/CDATA bodies).
//! - [`Handler`] receives semantic events from the parser (a fully
//!   attributed open tag, balanced close tags, routed CDATA).
//!
//! Every method has a no-op default, so a consumer implements only the
//! events it cares about. All payloads borrow from the parse buffers;
//! copy them if they must outlive the callback.

use std::fmt;

/// A single `name="value"` pair on an opening tag.
///
/// Attribute order follows the source document. Duplicate names are
/// dropped before this type is built (first occurrence wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Conditions surfaced through [`Handler::on_error`].
///
/// Parsing is lenient: malformed markup is normalized, not reported.
/// Only misuse of the streaming surface itself lands here, and the
/// offending call is ignored after the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// `write` was called after `end`.
    WriteAfterEnd,
    /// `end` was called a second time.
    EndAfterEnd,
}

impl ParseError {
    /// Stable human-readable message for this error.
    pub fn message(self) -> &'static str {
        match self {
            ParseError::WriteAfterEnd => "write called after end",
            ParseError::EndAfterEnd => "end called after end",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ParseError {}

/// Lexical event sink, driven by [`Tokenizer`](crate::Tokenizer).
///
/// The [`Parser`](crate::Parser) implements this internally; implement it
/// yourself to consume raw token spans without the HTML structural layer.
///
/// Contract per tag: `open_tag_name`, then zero or more attribute
/// sequences (`attr_name`, any number of `attr_data`, `attr_end`), then
/// exactly one of `open_tag_end` or `self_closing_tag`. Attribute values
/// split around decoded entities arrive as multiple `attr_data` calls.
pub trait TokenSink {
    fn text(&mut self, _text: &str) {}
    fn open_tag_name(&mut self, _name: &str) {}
    fn open_tag_end(&mut self) {}
    fn self_closing_tag(&mut self) {}
    fn close_tag(&mut self, _name: &str) {}
    fn attr_name(&mut self, _name: &str) {}
    fn attr_data(&mut self, _value: &str) {}
    fn attr_end(&mut self) {}
    /// Body of a `<!...>` declaration, without the delimiters.
    fn declaration(&mut self, _value: &str) {}
    /// Body of a `<?...>` instruction, without the delimiters.
    fn processing_instruction(&mut self, _value: &str) {}
    fn comment(&mut self, _value: &str) {}
    fn cdata(&mut self, _value: &str) {}
    /// The token stream is complete. Sent exactly once per session.
    fn end(&mut self) {}
}

/// Semantic event sink, driven by [`Parser`](crate::Parser).
///
/// Callbacks fire synchronously, in document order, while `write` or
/// `end` is on the stack. A tag's events arrive as `on_open_tag_name`,
/// one `on_attribute` per kept pair, then `on_open_tag` with the full
/// set. `on_close_tag` fires for explicit, implied, void and
/// end-of-document closes alike.
pub trait Handler {
    fn on_open_tag_name(&mut self, _name: &str) {}
    fn on_attribute(&mut self, _name: &str, _value: &str) {}
    fn on_open_tag(&mut self, _name: &str, _attribs: &[Attribute]) {}
    fn on_close_tag(&mut self, _name: &str) {}
    fn on_text(&mut self, _text: &str) {}
    fn on_comment(&mut self, _text: &str) {}
    fn on_comment_end(&mut self) {}
    fn on_cdata_start(&mut self) {}
    fn on_cdata_end(&mut self) {}
    /// `name` is `"?target"` or `"!target"`; `data` is the full body with
    /// the same prefix, e.g. (`"?xml"`, `"?xml version=\"1.0\"?"`).
    fn on_processing_instruction(&mut self, _name: &str, _data: &str) {}
    fn on_error(&mut self, _error: ParseError) {}
    fn on_reset(&mut self) {}
    fn on_end(&mut self) {}
}

/// A [`Handler`] that ignores every event.
///
/// Useful as the inner handler of a
/// [`CollectingHandler`](crate::CollectingHandler) and in benchmarks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl Handler for NoopHandler {}

impl TokenSink for NoopHandler {}
