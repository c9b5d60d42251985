//! Lexical scanner for HTML/XML-like markup.
//!
//! The tokenizer owns an append-only buffer and advances a single cursor
//! over it, one byte at a time, dispatching on (state, byte class). Input
//! arrives in arbitrary chunks through [`Tokenizer::write`]; when the
//! buffer runs out mid-construct the scanner simply stops, keeping its
//! state and span markers, and the next `write` (or [`Tokenizer::end`])
//! picks up where it left off. The emitted token sequence is therefore
//! identical no matter how the input is chunked.
//!
//! Events go to a [`TokenSink`] passed to each streaming call. The
//! tokenizer itself never reports errors: malformed constructs are
//! resolved best-effort when the input ends.
//!
//! Multi-byte UTF-8 sequences never collide with the ASCII delimiters the
//! scanner dispatches on, so they flow through text and value sections
//! untouched. Consumed buffer prefixes are reclaimed after each write, so
//! memory is bounded by the largest in-flight construct.

use log::trace;

use crate::entities::{self, EntityTable, HTML_ENTITIES, XML_ENTITIES};
use crate::handler::TokenSink;

/// Tokenizer configuration, fixed per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenizerOptions {
    /// Disable HTML-only lexing (raw-text elements) and switch the
    /// default entity table and numeric-reference rules to XML.
    pub xml_mode: bool,
    /// Decode `&name;` / `&#d;` / `&#x..;` inside text and attribute
    /// values. Off by default; unknown references always pass through.
    pub decode_entities: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrValueKind {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    /// After `<`.
    BeforeTagName,
    InTagName,
    /// After `</`.
    BeforeClosingTagName,
    InClosingTagName,
    /// Discarding everything up to the `>` of a closing tag.
    AfterClosingTagName,
    InSelfClosingTag,
    BeforeAttrName,
    InAttrName,
    AfterAttrName,
    BeforeAttrValue,
    InAttrValue(AttrValueKind),
    /// After `<!`.
    BeforeDeclaration,
    InDeclaration,
    /// After `<?`.
    InProcessingInstruction,
    /// After `<!-`.
    BeforeComment,
    InComment,
    AfterComment1,
    AfterComment2,
    /// Matching `CDATA[`; the payload counts matched bytes.
    BeforeCdata(u8),
    InCdata,
    AfterCdata1,
    AfterCdata2,
    /// Body of a raw-text element, scanning for its closing sequence.
    InSpecialTag,
    /// After `&`.
    BeforeEntity,
    /// After `&#`.
    BeforeNumericEntity,
    InNamedEntity,
    InNumericEntity,
    InHexEntity,
}

/// Raw-text elements: their body is plain text until the matching
/// closing tag. HTML mode only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialTag {
    None,
    Script,
    Style,
    Title,
}

impl SpecialTag {
    fn from_name(name: &str) -> SpecialTag {
        if name.eq_ignore_ascii_case("script") {
            SpecialTag::Script
        } else if name.eq_ignore_ascii_case("style") {
            SpecialTag::Style
        } else if name.eq_ignore_ascii_case("title") {
            SpecialTag::Title
        } else {
            SpecialTag::None
        }
    }

    /// Lowercase closing sequence up to, not including, the delimiter.
    fn close_sequence(self) -> &'static [u8] {
        match self {
            SpecialTag::None => b"",
            SpecialTag::Script => b"</script",
            SpecialTag::Style => b"</style",
            SpecialTag::Title => b"</title",
        }
    }
}

const CDATA_SEQUENCE: &[u8] = b"CDATA[";

fn is_ws(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Streaming lexical scanner. See the module docs for the contract.
#[derive(Debug)]
pub struct Tokenizer {
    xml_mode: bool,
    decode_entities: bool,
    entities: &'static EntityTable,

    buffer: String,
    /// Byte cursor; always on a character boundary when scanning stops.
    index: usize,
    /// Start of the span the current state is accumulating.
    section_start: usize,
    state: State,
    /// State to return to after an entity sub-state.
    base_state: State,
    /// Position of the `&` currently being decoded.
    amp_start: usize,
    /// Raw-text element whose body is being scanned (or `None`).
    special: SpecialTag,
    /// Progress matching the special closing sequence.
    seq_index: usize,
    /// Position of the `<` candidate for the special closing sequence.
    seq_start: usize,
    /// Owned text accumulator, engaged once an entity decodes so a run
    /// still reaches the sink as a single event.
    text_acc: String,
    text_engaged: bool,

    running: bool,
    ended: bool,
    finished: bool,
}

impl Tokenizer {
    pub fn new(options: TokenizerOptions) -> Tokenizer {
        let entities = if options.xml_mode { &XML_ENTITIES } else { &HTML_ENTITIES };
        Tokenizer::with_entities(options, entities)
    }

    /// Build a tokenizer with a custom named-entity table.
    pub fn with_entities(options: TokenizerOptions, entities: &'static EntityTable) -> Tokenizer {
        Tokenizer {
            xml_mode: options.xml_mode,
            decode_entities: options.decode_entities,
            entities,
            buffer: String::new(),
            index: 0,
            section_start: 0,
            state: State::Text,
            base_state: State::Text,
            amp_start: 0,
            special: SpecialTag::None,
            seq_index: 0,
            seq_start: 0,
            text_acc: String::new(),
            text_engaged: false,
            running: true,
            ended: false,
            finished: false,
        }
    }

    /// Append a chunk and scan as far as the buffered input allows.
    ///
    /// Ignored after `end`. While paused the chunk is only buffered.
    pub fn write(&mut self, chunk: &str, sink: &mut impl TokenSink) {
        if self.ended {
            return;
        }
        trace!("write {} bytes ({} buffered)", chunk.len(), self.buffer.len() - self.index);
        self.buffer.push_str(chunk);
        if self.running {
            self.scan(sink);
            self.trim();
        }
    }

    /// Signal end of input: resolve any open construct, then tell the
    /// sink the stream is complete. Deferred while paused; a second call
    /// is ignored.
    pub fn end(&mut self, sink: &mut impl TokenSink) {
        if self.ended {
            return;
        }
        trace!("end ({} bytes unscanned)", self.buffer.len() - self.index);
        self.ended = true;
        if self.running {
            self.finish(sink);
        }
    }

    /// Halt scanning and event emission. Buffered and newly written input
    /// is retained until [`Tokenizer::resume`].
    pub fn pause(&mut self) {
        trace!("pause");
        self.running = false;
    }

    /// Continue after [`Tokenizer::pause`], scanning whatever accumulated,
    /// and run the end-of-input resolution if `end` arrived meanwhile.
    pub fn resume(&mut self, sink: &mut impl TokenSink) {
        if self.running {
            return;
        }
        trace!("resume ({} bytes buffered)", self.buffer.len() - self.index);
        self.running = true;
        self.scan(sink);
        if self.ended && !self.finished {
            self.finish(sink);
        } else {
            self.trim();
        }
    }

    /// Return to the initial state. Options and the entity table are
    /// retained.
    pub fn reset(&mut self) {
        trace!("reset");
        self.buffer.clear();
        self.index = 0;
        self.section_start = 0;
        self.state = State::Text;
        self.base_state = State::Text;
        self.amp_start = 0;
        self.special = SpecialTag::None;
        self.seq_index = 0;
        self.seq_start = 0;
        self.text_acc.clear();
        self.text_engaged = false;
        self.running = true;
        self.ended = false;
        self.finished = false;
    }

    pub fn is_paused(&self) -> bool {
        !self.running
    }

    fn scan(&mut self, sink: &mut impl TokenSink) {
        while self.running && self.index < self.buffer.len() {
            let c = self.buffer.as_bytes()[self.index];
            if self.step(c, sink) {
                self.index += 1;
            }
        }
    }

    fn finish(&mut self, sink: &mut impl TokenSink) {
        if self.index < self.buffer.len() {
            self.scan(sink);
        }
        self.handle_trailing(sink);
        self.finished = true;
        sink.end();
    }

    /// Reclaim the consumed buffer prefix. All live markers sit at or
    /// beyond the returned keep point, and on character boundaries.
    fn trim(&mut self) {
        let keep = self.trim_start().min(self.index);
        if keep == 0 {
            return;
        }
        self.buffer.drain(..keep);
        self.index -= keep;
        self.section_start = self.section_start.saturating_sub(keep);
        self.amp_start = self.amp_start.saturating_sub(keep);
        self.seq_start = self.seq_start.saturating_sub(keep);
    }

    fn trim_start(&self) -> usize {
        match self.state {
            State::Text
            | State::BeforeTagName
            | State::InSpecialTag
            | State::InTagName
            | State::InClosingTagName
            | State::InAttrName
            | State::InAttrValue(_)
            | State::BeforeDeclaration
            | State::InDeclaration
            | State::BeforeComment
            | State::InComment
            | State::AfterComment1
            | State::AfterComment2
            | State::BeforeCdata(_)
            | State::InCdata
            | State::AfterCdata1
            | State::AfterCdata2
            | State::InProcessingInstruction
            | State::BeforeEntity
            | State::BeforeNumericEntity
            | State::InNamedEntity
            | State::InNumericEntity
            | State::InHexEntity => self.section_start,
            _ => self.index,
        }
    }

    /// Process one byte. Returns `false` to reprocess the same byte in
    /// the new state.
    fn step(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        match self.state {
            State::Text => self.state_text(c, sink),
            State::BeforeTagName => self.state_before_tag_name(c, sink),
            State::InTagName => self.state_in_tag_name(c, sink),
            State::BeforeClosingTagName => self.state_before_closing_tag_name(c),
            State::InClosingTagName => self.state_in_closing_tag_name(c, sink),
            State::AfterClosingTagName => self.state_after_closing_tag_name(c),
            State::InSelfClosingTag => self.state_in_self_closing_tag(c, sink),
            State::BeforeAttrName => self.state_before_attr_name(c, sink),
            State::InAttrName => self.state_in_attr_name(c, sink),
            State::AfterAttrName => self.state_after_attr_name(c, sink),
            State::BeforeAttrValue => self.state_before_attr_value(c),
            State::InAttrValue(kind) => self.state_in_attr_value(kind, c, sink),
            State::BeforeDeclaration => self.state_before_declaration(c),
            State::InDeclaration => self.state_in_declaration(c, sink),
            State::InProcessingInstruction => self.state_in_processing_instruction(c, sink),
            State::BeforeComment => self.state_before_comment(c),
            State::InComment => self.state_in_comment(c),
            State::AfterComment1 => self.state_after_comment1(c),
            State::AfterComment2 => self.state_after_comment2(c, sink),
            State::BeforeCdata(n) => self.state_before_cdata(n, c),
            State::InCdata => self.state_in_cdata(c),
            State::AfterCdata1 => self.state_after_cdata1(c),
            State::AfterCdata2 => self.state_after_cdata2(c, sink),
            State::InSpecialTag => self.state_in_special_tag(c, sink),
            State::BeforeEntity => self.state_before_entity(c),
            State::BeforeNumericEntity => self.state_before_numeric_entity(c),
            State::InNamedEntity => self.state_in_named_entity(c, sink),
            State::InNumericEntity => self.state_in_numeric_entity(c, sink),
            State::InHexEntity => self.state_in_hex_entity(c, sink),
        }
    }

    // ---- text ----

    fn state_text(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'<' {
            self.flush_text(self.index, sink);
            self.state = State::BeforeTagName;
            self.section_start = self.index;
        } else if c == b'&' && self.decode_entities {
            self.start_entity(State::Text);
        } else {
            // fast-forward to the next byte that can change state
            let next = if self.decode_entities {
                memchr::memchr2(b'<', b'&', &self.buffer.as_bytes()[self.index + 1..])
            } else {
                memchr::memchr(b'<', &self.buffer.as_bytes()[self.index + 1..])
            };
            match next {
                Some(off) => self.index += off,
                None => self.index = self.buffer.len() - 1,
            }
        }
        true
    }

    /// Emit the pending text run ending at `end`. Joins the owned
    /// accumulator with the tail of the borrowed section when entity
    /// decoding spliced into the run.
    fn flush_text(&mut self, end: usize, sink: &mut impl TokenSink) {
        if self.text_engaged {
            self.text_acc.push_str(&self.buffer[self.section_start..end]);
            sink.text(&self.text_acc);
            self.text_acc.clear();
            self.text_engaged = false;
        } else if end > self.section_start {
            sink.text(&self.buffer[self.section_start..end]);
        }
    }

    // ---- tag dispatch ----

    fn state_before_tag_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'/' {
            self.state = State::BeforeClosingTagName;
        } else if c == b'<' {
            // `<` followed by another `<`: the first one is text
            self.flush_text(self.index, sink);
            self.section_start = self.index;
        } else if c == b'!' {
            self.state = State::BeforeDeclaration;
            self.section_start = self.index + 1;
        } else if c == b'?' {
            self.state = State::InProcessingInstruction;
            self.section_start = self.index + 1;
        } else if c.is_ascii_alphabetic() {
            self.state = State::InTagName;
            self.section_start = self.index;
        } else {
            // not a tag after all; the `<` stays in the text section
            self.state = State::Text;
        }
        true
    }

    fn state_in_tag_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'/' || c == b'>' || is_ws(c) {
            self.emit_open_tag_name(sink);
            self.state = State::BeforeAttrName;
            return false;
        }
        true
    }

    fn emit_open_tag_name(&mut self, sink: &mut impl TokenSink) {
        if !self.xml_mode {
            self.special = SpecialTag::from_name(&self.buffer[self.section_start..self.index]);
        }
        sink.open_tag_name(&self.buffer[self.section_start..self.index]);
    }

    fn state_before_closing_tag_name(&mut self, c: u8) -> bool {
        if is_ws(c) {
            // skip
        } else if c == b'>' {
            // `</>`: flows back into the surrounding text
            self.state = State::Text;
        } else {
            self.state = State::InClosingTagName;
            self.section_start = self.index;
        }
        true
    }

    fn state_in_closing_tag_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' || is_ws(c) {
            sink.close_tag(&self.buffer[self.section_start..self.index]);
            self.state = State::AfterClosingTagName;
            return false;
        }
        true
    }

    fn state_after_closing_tag_name(&mut self, c: u8) -> bool {
        if c == b'>' {
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
        true
    }

    fn state_in_self_closing_tag(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.self_closing_tag();
            self.state = State::Text;
            self.section_start = self.index + 1;
            // an explicitly closed raw-text element has no body
            self.special = SpecialTag::None;
        } else if !is_ws(c) {
            self.state = State::BeforeAttrName;
            return false;
        }
        true
    }

    // ---- attributes ----

    fn state_before_attr_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.open_tag_end();
            self.section_start = self.index + 1;
            self.state = if self.special == SpecialTag::None {
                State::Text
            } else {
                self.seq_index = 0;
                State::InSpecialTag
            };
        } else if c == b'/' {
            self.state = State::InSelfClosingTag;
        } else if !is_ws(c) {
            self.state = State::InAttrName;
            self.section_start = self.index;
        }
        true
    }

    fn state_in_attr_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'=' || c == b'/' || c == b'>' || is_ws(c) {
            sink.attr_name(&self.buffer[self.section_start..self.index]);
            self.state = State::AfterAttrName;
            return false;
        }
        true
    }

    fn state_after_attr_name(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'=' {
            self.state = State::BeforeAttrValue;
        } else if c == b'/' || c == b'>' {
            sink.attr_end();
            self.state = State::BeforeAttrName;
            return false;
        } else if !is_ws(c) {
            // a bare attribute, then the next one starts
            sink.attr_end();
            self.state = State::InAttrName;
            self.section_start = self.index;
        }
        true
    }

    fn state_before_attr_value(&mut self, c: u8) -> bool {
        if c == b'"' {
            self.state = State::InAttrValue(AttrValueKind::DoubleQuoted);
            self.section_start = self.index + 1;
        } else if c == b'\'' {
            self.state = State::InAttrValue(AttrValueKind::SingleQuoted);
            self.section_start = self.index + 1;
        } else if !is_ws(c) {
            self.state = State::InAttrValue(AttrValueKind::Unquoted);
            self.section_start = self.index;
            return false;
        }
        true
    }

    fn state_in_attr_value(&mut self, kind: AttrValueKind, c: u8, sink: &mut impl TokenSink) -> bool {
        let done = match kind {
            AttrValueKind::DoubleQuoted => c == b'"',
            AttrValueKind::SingleQuoted => c == b'\'',
            AttrValueKind::Unquoted => c == b'>' || is_ws(c),
        };
        if done {
            if self.index > self.section_start {
                sink.attr_data(&self.buffer[self.section_start..self.index]);
            }
            sink.attr_end();
            self.state = State::BeforeAttrName;
            return kind != AttrValueKind::Unquoted;
        }
        if c == b'&' && self.decode_entities {
            if self.index > self.section_start {
                sink.attr_data(&self.buffer[self.section_start..self.index]);
            }
            self.start_entity(State::InAttrValue(kind));
            self.section_start = self.index;
        }
        true
    }

    // ---- declarations, comments, CDATA ----

    fn state_before_declaration(&mut self, c: u8) -> bool {
        self.state = match c {
            b'[' => State::BeforeCdata(0),
            b'-' => State::BeforeComment,
            _ => State::InDeclaration,
        };
        true
    }

    fn state_in_declaration(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.declaration(&self.buffer[self.section_start..self.index]);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
        true
    }

    fn state_in_processing_instruction(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.processing_instruction(&self.buffer[self.section_start..self.index]);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
        true
    }

    fn state_before_comment(&mut self, c: u8) -> bool {
        if c == b'-' {
            self.state = State::InComment;
            self.section_start = self.index + 1;
        } else {
            self.state = State::InDeclaration;
        }
        true
    }

    fn state_in_comment(&mut self, c: u8) -> bool {
        if c == b'-' {
            self.state = State::AfterComment1;
        }
        true
    }

    fn state_after_comment1(&mut self, c: u8) -> bool {
        if c == b'-' {
            self.state = State::AfterComment2;
        } else {
            self.state = State::InComment;
        }
        true
    }

    fn state_after_comment2(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.comment(&self.buffer[self.section_start..self.index - 2]);
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if c != b'-' {
            self.state = State::InComment;
        }
        // consecutive dashes stay here so `--->` still closes
        true
    }

    fn state_before_cdata(&mut self, n: u8, c: u8) -> bool {
        if c == CDATA_SEQUENCE[n as usize] {
            self.state = if n as usize == CDATA_SEQUENCE.len() - 1 {
                self.section_start = self.index + 1;
                State::InCdata
            } else {
                State::BeforeCdata(n + 1)
            };
            true
        } else {
            self.state = State::InDeclaration;
            false
        }
    }

    fn state_in_cdata(&mut self, c: u8) -> bool {
        if c == b']' {
            self.state = State::AfterCdata1;
        }
        true
    }

    fn state_after_cdata1(&mut self, c: u8) -> bool {
        if c == b']' {
            self.state = State::AfterCdata2;
        } else {
            self.state = State::InCdata;
        }
        true
    }

    fn state_after_cdata2(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b'>' {
            sink.cdata(&self.buffer[self.section_start..self.index - 2]);
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if c != b']' {
            self.state = State::InCdata;
        }
        true
    }

    // ---- raw-text bodies ----

    fn state_in_special_tag(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        let seq = self.special.close_sequence();
        if self.seq_index == 0 {
            if c == b'<' {
                self.seq_index = 1;
                self.seq_start = self.index;
            } else {
                let next = memchr::memchr(b'<', &self.buffer.as_bytes()[self.index + 1..]);
                match next {
                    Some(off) => self.index += off,
                    None => self.index = self.buffer.len() - 1,
                }
            }
        } else if self.seq_index < seq.len() {
            if c.eq_ignore_ascii_case(&seq[self.seq_index]) {
                self.seq_index += 1;
            } else if c == b'<' {
                self.seq_index = 1;
                self.seq_start = self.index;
            } else {
                self.seq_index = 0;
            }
        } else if c == b'>' || c == b'/' || is_ws(c) {
            // the closing sequence is complete: one text run, then close
            self.flush_text(self.seq_start, sink);
            sink.close_tag(&self.buffer[self.seq_start + 2..self.seq_start + seq.len()]);
            self.special = SpecialTag::None;
            self.seq_index = 0;
            self.state = State::AfterClosingTagName;
            return false;
        } else if c == b'<' {
            self.seq_index = 1;
            self.seq_start = self.index;
        } else {
            // e.g. `</scripty`: still raw text
            self.seq_index = 0;
        }
        true
    }

    // ---- character references ----

    fn start_entity(&mut self, base: State) {
        self.base_state = base;
        self.state = State::BeforeEntity;
        self.amp_start = self.index;
    }

    fn state_before_entity(&mut self, c: u8) -> bool {
        if c == b'#' {
            self.state = State::BeforeNumericEntity;
            true
        } else if c.is_ascii_alphanumeric() {
            self.state = State::InNamedEntity;
            false
        } else {
            self.state = self.base_state;
            false
        }
    }

    fn state_before_numeric_entity(&mut self, c: u8) -> bool {
        if c == b'x' || c == b'X' {
            self.state = State::InHexEntity;
            true
        } else if c.is_ascii_digit() {
            self.state = State::InNumericEntity;
            false
        } else {
            self.state = self.base_state;
            false
        }
    }

    fn state_in_named_entity(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b';' {
            let name = &self.buffer[self.amp_start + 1..self.index];
            let repl = self.entities.lookup(name);
            if let Some(repl) = repl {
                self.splice(repl, self.index + 1, sink);
            }
            // unknown names stay literal, semicolon included
            self.state = self.base_state;
            true
        } else if c.is_ascii_alphanumeric() {
            true
        } else {
            self.state = self.base_state;
            false
        }
    }

    fn state_in_numeric_entity(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b';' {
            self.decode_numeric(10, 2, true, sink);
            self.state = self.base_state;
            true
        } else if c.is_ascii_digit() {
            true
        } else {
            // HTML consumers accept a missing semicolon; XML does not
            if !self.xml_mode {
                self.decode_numeric(10, 2, false, sink);
            }
            self.state = self.base_state;
            false
        }
    }

    fn state_in_hex_entity(&mut self, c: u8, sink: &mut impl TokenSink) -> bool {
        if c == b';' {
            self.decode_numeric(16, 3, true, sink);
            self.state = self.base_state;
            true
        } else if c.is_ascii_hexdigit() {
            true
        } else {
            if !self.xml_mode {
                self.decode_numeric(16, 3, false, sink);
            }
            self.state = self.base_state;
            false
        }
    }

    fn decode_numeric(&mut self, radix: u32, offset: usize, with_semi: bool, sink: &mut impl TokenSink) {
        let start = self.amp_start + offset;
        if start >= self.index {
            return; // `&#;` and `&#x;` stay literal
        }
        let mut cp: u32 = 0;
        for b in &self.buffer.as_bytes()[start..self.index] {
            let d = match (*b as char).to_digit(radix) {
                Some(d) => d,
                None => return,
            };
            // cap instead of overflowing; anything above the plane limit
            // decodes to U+FFFD anyway
            cp = (cp * radix + d).min(0x11_0000);
        }
        let resume_at = if with_semi { self.index + 1 } else { self.index };
        if self.xml_mode {
            if let Some(ch) = entities::decode_xml_codepoint(cp) {
                let mut buf = [0u8; 4];
                self.splice(ch.encode_utf8(&mut buf), resume_at, sink);
            }
        } else {
            let ch = entities::decode_codepoint(cp);
            let mut buf = [0u8; 4];
            self.splice(ch.encode_utf8(&mut buf), resume_at, sink);
        }
    }

    /// Commit a decoded reference: splice it into the text accumulator,
    /// or emit it as an attribute-value fragment, and restart the
    /// borrowed section after the reference.
    fn splice(&mut self, decoded: &str, resume_at: usize, sink: &mut impl TokenSink) {
        match self.base_state {
            State::Text => {
                self.text_acc.push_str(&self.buffer[self.section_start..self.amp_start]);
                self.text_acc.push_str(decoded);
                self.text_engaged = true;
            }
            _ => sink.attr_data(decoded),
        }
        self.section_start = resume_at;
    }

    // ---- end of input ----

    /// Fixed policy for resolving whatever construct is open when the
    /// input ends.
    fn handle_trailing(&mut self, sink: &mut impl TokenSink) {
        // a pending reference first, so its base state resolves below
        match self.state {
            State::InNumericEntity => {
                if !self.xml_mode {
                    self.decode_numeric(10, 2, false, sink);
                }
                self.state = self.base_state;
            }
            State::InHexEntity => {
                if !self.xml_mode {
                    self.decode_numeric(16, 3, false, sink);
                }
                self.state = self.base_state;
            }
            State::BeforeEntity | State::BeforeNumericEntity | State::InNamedEntity => {
                self.state = self.base_state;
            }
            _ => {}
        }

        let len = self.buffer.len();
        match self.state {
            State::Text | State::BeforeTagName | State::InSpecialTag => {
                self.flush_text(len, sink);
            }
            State::InCdata | State::AfterCdata1 | State::AfterCdata2 => {
                if len > self.section_start {
                    sink.cdata(&self.buffer[self.section_start..]);
                }
            }
            State::InComment | State::AfterComment1 | State::AfterComment2 => {
                if len > self.section_start {
                    sink.comment(&self.buffer[self.section_start..]);
                }
            }
            State::BeforeDeclaration
            | State::BeforeComment
            | State::BeforeCdata(_)
            | State::InDeclaration => {
                if len > self.section_start {
                    sink.declaration(&self.buffer[self.section_start..]);
                }
            }
            State::InProcessingInstruction => {
                if len > self.section_start {
                    sink.processing_instruction(&self.buffer[self.section_start..]);
                }
            }
            State::InTagName => {
                // an unterminated tag still opens
                self.emit_open_tag_name(sink);
                sink.open_tag_end();
            }
            State::InClosingTagName => {
                if len > self.section_start {
                    sink.close_tag(&self.buffer[self.section_start..]);
                }
            }
            State::BeforeAttrName | State::InSelfClosingTag => {
                sink.open_tag_end();
            }
            State::AfterAttrName | State::BeforeAttrValue => {
                sink.attr_end();
                sink.open_tag_end();
            }
            State::InAttrName => {
                sink.attr_name(&self.buffer[self.section_start..]);
                sink.attr_end();
                sink.open_tag_end();
            }
            State::InAttrValue(_) => {
                if len > self.section_start {
                    sink.attr_data(&self.buffer[self.section_start..]);
                }
                sink.attr_end();
                sink.open_tag_end();
            }
            // `</` alone vanishes; a skipped closing tag needs no more
            State::BeforeClosingTagName | State::AfterClosingTagName => {}
            // resolved above
            State::BeforeEntity
            | State::BeforeNumericEntity
            | State::InNamedEntity
            | State::InNumericEntity
            | State::InHexEntity => {}
        }
    }
}
