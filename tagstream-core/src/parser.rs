//! Semantic layer over the tokenizer.
//!
//! [`Parser`] feeds chunks through a [`Tokenizer`] and translates the
//! lexical events into document-level [`Handler`] callbacks: it tracks
//! the open-element stack, assembles attribute maps, folds tag and
//! attribute case, auto-closes elements that HTML leaves implicit
//! (`<p>`, `<li>`, table cells, form controls), treats void elements as
//! childless, and closes everything still open when the input ends.
//!
//! Malformed input never fails: a closing tag that matches nothing is
//! reported as-is and the stack is left untouched, and unterminated
//! constructs are resolved at end of input. The only reportable errors
//! are streaming misuse, delivered through [`Handler::on_error`].

use std::mem;

use log::trace;

use crate::handler::{Attribute, Handler, ParseError, TokenSink};
use crate::tokenizer::{Tokenizer, TokenizerOptions};

/// Parser configuration, fixed per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    /// Parse as XML: no void elements, no implied closes, no raw-text
    /// elements, XML entity and character-reference rules, case
    /// preserved, and self-closing tags and CDATA always recognized.
    pub xml_mode: bool,
    /// Decode character references in text and attribute values.
    pub decode_entities: bool,
    /// Fold tag names to ASCII lowercase. Defaults to the opposite of
    /// `xml_mode`.
    pub lower_case_tags: Option<bool>,
    /// Fold attribute names to ASCII lowercase. Defaults to the opposite
    /// of `xml_mode`.
    pub lower_case_attribute_names: Option<bool>,
    /// Honor `/>` in HTML mode.
    pub recognize_self_closing: bool,
    /// Treat CDATA sections as text in HTML mode instead of comments.
    pub recognize_cdata: bool,
}

/// Elements that never have children or closing tags.
static VOID_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "area", "base", "basefont", "br", "col", "command", "embed", "frame",
    "hr", "img", "input", "isindex", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
};

const FORM_TAGS: &[&str] =
    &["input", "option", "optgroup", "select", "button", "datalist", "textarea"];

/// Opening the key element implies closing any of the listed elements
/// sitting on top of the stack.
static IMPLIES_CLOSE: phf::Map<&'static str, &'static [&'static str]> = phf::phf_map! {
    "tr" => &["tr", "th", "td"],
    "th" => &["th"],
    "td" => &["thead", "th", "td"],
    "body" => &["head", "link", "script"],
    "li" => &["li"],
    "p" => &["p"],
    "h1" => &["p"],
    "h2" => &["p"],
    "h3" => &["p"],
    "h4" => &["p"],
    "h5" => &["p"],
    "h6" => &["p"],
    "select" => FORM_TAGS,
    "input" => FORM_TAGS,
    "output" => FORM_TAGS,
    "button" => FORM_TAGS,
    "datalist" => FORM_TAGS,
    "textarea" => FORM_TAGS,
    "option" => &["option"],
    "optgroup" => &["optgroup", "option"],
};

/// Streaming HTML/XML parser driving a [`Handler`].
///
/// ```
/// use tagstream_core::{Handler, Parser};
///
/// #[derive(Default)]
/// struct Links(Vec<String>);
///
/// impl Handler for Links {
///     fn on_attribute(&mut self, name: &str, value: &str) {
///         if name == "href" {
///             self.0.push(value.to_string());
///         }
///     }
/// }
///
/// let mut parser = Parser::new(Links::default());
/// parser.write("<a href=\"/one\">one</a>");
/// parser.write("<a href=\"/two\">");
/// parser.end();
/// assert_eq!(parser.handler().0, ["/one", "/two"]);
/// ```
#[derive(Debug)]
pub struct Parser<H: Handler> {
    tokenizer: Tokenizer,
    sink: ParserSink<H>,
    ended: bool,
}

impl<H: Handler> Parser<H> {
    pub fn new(handler: H) -> Parser<H> {
        Parser::with_options(handler, ParserOptions::default())
    }

    pub fn with_options(handler: H, options: ParserOptions) -> Parser<H> {
        let tokenizer = Tokenizer::new(TokenizerOptions {
            xml_mode: options.xml_mode,
            decode_entities: options.decode_entities,
        });
        Parser {
            tokenizer,
            sink: ParserSink::new(handler, options),
            ended: false,
        }
    }

    /// Feed a chunk. Callbacks for everything the chunk completes fire
    /// before this returns; a construct cut off mid-way is held until
    /// more input arrives.
    pub fn write(&mut self, chunk: &str) {
        if self.ended {
            self.sink.handler.on_error(ParseError::WriteAfterEnd);
            return;
        }
        self.tokenizer.write(chunk, &mut self.sink);
    }

    /// Finish the document: resolve unterminated constructs, close all
    /// open elements innermost-first, then fire [`Handler::on_end`].
    pub fn end(&mut self) {
        if self.ended {
            self.sink.handler.on_error(ParseError::EndAfterEnd);
            return;
        }
        self.ended = true;
        self.tokenizer.end(&mut self.sink);
    }

    /// Stop emitting callbacks; further input is buffered.
    pub fn pause(&mut self) {
        self.tokenizer.pause();
    }

    /// Resume after [`Parser::pause`], draining buffered input and the
    /// deferred end-of-document work.
    pub fn resume(&mut self) {
        self.tokenizer.resume(&mut self.sink);
    }

    pub fn is_paused(&self) -> bool {
        self.tokenizer.is_paused()
    }

    /// Fire [`Handler::on_reset`] and restore the initial state, keeping
    /// the handler and options.
    pub fn reset(&mut self) {
        self.sink.handler.on_reset();
        self.tokenizer.reset();
        self.sink.clear();
        self.ended = false;
    }

    /// Parse a complete document in one call, resetting first.
    pub fn parse_complete(&mut self, data: &str) {
        self.reset();
        self.write(data);
        self.end();
    }

    pub fn handler(&self) -> &H {
        &self.sink.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.sink.handler
    }

    pub fn into_handler(self) -> H {
        self.sink.handler
    }
}

/// Token-to-document translation state. Implements [`TokenSink`] so the
/// tokenizer can drive it directly.
#[derive(Debug)]
struct ParserSink<H: Handler> {
    handler: H,
    xml_mode: bool,
    lower_case_tags: bool,
    lower_case_attribute_names: bool,
    recognize_self_closing: bool,
    recognize_cdata: bool,

    /// Open elements, outermost first. Void elements are never pushed.
    stack: Vec<String>,
    tag_name: String,
    /// The tag currently open is a void element.
    pending_void: bool,
    attr_name: String,
    attr_value: String,
    attribs: Vec<Attribute>,
}

impl<H: Handler> ParserSink<H> {
    fn new(handler: H, options: ParserOptions) -> ParserSink<H> {
        ParserSink {
            handler,
            xml_mode: options.xml_mode,
            lower_case_tags: options.lower_case_tags.unwrap_or(!options.xml_mode),
            lower_case_attribute_names: options
                .lower_case_attribute_names
                .unwrap_or(!options.xml_mode),
            recognize_self_closing: options.recognize_self_closing,
            recognize_cdata: options.recognize_cdata,
            stack: Vec::new(),
            tag_name: String::new(),
            pending_void: false,
            attr_name: String::new(),
            attr_value: String::new(),
            attribs: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.stack.clear();
        self.tag_name.clear();
        self.pending_void = false;
        self.attr_name.clear();
        self.attr_value.clear();
        self.attribs.clear();
    }

    fn fold_tag(&self, name: &str) -> String {
        if self.lower_case_tags {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    fn is_void(&self, name: &str) -> bool {
        if self.xml_mode {
            return false;
        }
        VOID_ELEMENTS.contains(name)
            || (!self.lower_case_tags
                && VOID_ELEMENTS.contains(name.to_ascii_lowercase().as_str()))
    }

    fn implied_closes(&self, name: &str) -> Option<&'static [&'static str]> {
        if self.xml_mode {
            return None;
        }
        IMPLIES_CLOSE
            .get(name)
            .or_else(|| {
                if self.lower_case_tags {
                    None
                } else {
                    IMPLIES_CLOSE.get(name.to_ascii_lowercase().as_str())
                }
            })
            .copied()
    }

    /// The open tag is complete. Emits `on_open_tag`, then the close for
    /// a void or explicitly self-closed element.
    fn emit_open(&mut self, close_now: bool) {
        let name = mem::take(&mut self.tag_name);
        trace!("open <{}> ({} attrs, depth {})", name, self.attribs.len(), self.stack.len());
        self.handler.on_open_tag(&name, &self.attribs);
        self.attribs.clear();
        if self.pending_void {
            self.pending_void = false;
            self.handler.on_close_tag(&name);
        } else if close_now {
            if self.stack.last().map_or(false, |top| *top == name) {
                self.stack.pop();
            }
            self.handler.on_close_tag(&name);
        }
    }

    fn emit_instruction(&mut self, prefix: char, value: &str) {
        let end = value
            .find(|ch: char| ch.is_whitespace() || ch == '/')
            .unwrap_or(value.len());
        let mut name = value[..end].to_string();
        if self.lower_case_tags {
            name.make_ascii_lowercase();
        }
        self.handler
            .on_processing_instruction(&format!("{prefix}{name}"), &format!("{prefix}{value}"));
    }
}

impl<H: Handler> TokenSink for ParserSink<H> {
    fn text(&mut self, text: &str) {
        self.handler.on_text(text);
    }

    fn open_tag_name(&mut self, name: &str) {
        let name = self.fold_tag(name);
        if let Some(closes) = self.implied_closes(&name) {
            while self.stack.last().map_or(false, |top| {
                closes.iter().any(|&c| top.eq_ignore_ascii_case(c))
            }) {
                if let Some(closed) = self.stack.pop() {
                    self.handler.on_close_tag(&closed);
                }
            }
        }
        self.pending_void = self.is_void(&name);
        if !self.pending_void {
            self.stack.push(name.clone());
        }
        self.handler.on_open_tag_name(&name);
        self.tag_name = name;
    }

    fn open_tag_end(&mut self) {
        self.emit_open(false);
    }

    fn self_closing_tag(&mut self) {
        let close = self.xml_mode || self.recognize_self_closing;
        self.emit_open(close);
    }

    fn close_tag(&mut self, name: &str) {
        let name = self.fold_tag(name);
        trace!("close </{}> (depth {})", name, self.stack.len());
        match self.stack.iter().rposition(|open| *open == name) {
            Some(pos) => {
                // implicitly close everything nested inside the match
                while self.stack.len() > pos {
                    if let Some(top) = self.stack.pop() {
                        self.handler.on_close_tag(&top);
                    }
                }
            }
            // nothing to close: report the tag, leave the stack alone
            None => self.handler.on_close_tag(&name),
        }
    }

    fn attr_name(&mut self, name: &str) {
        self.attr_name = if self.lower_case_attribute_names {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        };
    }

    fn attr_data(&mut self, value: &str) {
        self.attr_value.push_str(value);
    }

    fn attr_end(&mut self) {
        let name = mem::take(&mut self.attr_name);
        let value = mem::take(&mut self.attr_value);
        if name.is_empty() {
            return;
        }
        // first occurrence wins
        if self.attribs.iter().any(|a| a.name == name) {
            return;
        }
        self.handler.on_attribute(&name, &value);
        self.attribs.push(Attribute { name, value });
    }

    fn declaration(&mut self, value: &str) {
        self.emit_instruction('!', value);
    }

    fn processing_instruction(&mut self, value: &str) {
        self.emit_instruction('?', value);
    }

    fn comment(&mut self, value: &str) {
        self.handler.on_comment(value);
        self.handler.on_comment_end();
    }

    fn cdata(&mut self, value: &str) {
        if self.xml_mode || self.recognize_cdata {
            self.handler.on_cdata_start();
            self.handler.on_text(value);
            self.handler.on_cdata_end();
        } else {
            self.handler.on_comment(&format!("[CDATA[{value}]]"));
            self.handler.on_comment_end();
        }
    }

    fn end(&mut self) {
        while let Some(top) = self.stack.pop() {
            self.handler.on_close_tag(&top);
        }
        self.handler.on_end();
    }
}
