//! Event recording and replay.
//!
//! [`CollectingHandler`] wraps another [`Handler`], records every
//! callback as an owned [`CollectedEvent`], and forwards it unchanged.
//! The recording can be replayed into any handler, or the inner handler
//! can be restarted from it: reset downstream state and bring it back
//! to the current document position without re-parsing the input.

use crate::handler::{Attribute, Handler, NoopHandler, ParseError};

/// One recorded [`Handler`] callback, with owned payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectedEvent {
    OpenTagName(String),
    Attribute { name: String, value: String },
    OpenTag { name: String, attribs: Vec<Attribute> },
    CloseTag(String),
    Text(String),
    Comment(String),
    CommentEnd,
    CdataStart,
    CdataEnd,
    ProcessingInstruction { name: String, data: String },
    Error(ParseError),
    End,
}

fn deliver(event: &CollectedEvent, handler: &mut impl Handler) {
    match event {
        CollectedEvent::OpenTagName(name) => handler.on_open_tag_name(name),
        CollectedEvent::Attribute { name, value } => handler.on_attribute(name, value),
        CollectedEvent::OpenTag { name, attribs } => handler.on_open_tag(name, attribs),
        CollectedEvent::CloseTag(name) => handler.on_close_tag(name),
        CollectedEvent::Text(text) => handler.on_text(text),
        CollectedEvent::Comment(text) => handler.on_comment(text),
        CollectedEvent::CommentEnd => handler.on_comment_end(),
        CollectedEvent::CdataStart => handler.on_cdata_start(),
        CollectedEvent::CdataEnd => handler.on_cdata_end(),
        CollectedEvent::ProcessingInstruction { name, data } => {
            handler.on_processing_instruction(name, data)
        }
        CollectedEvent::Error(error) => handler.on_error(*error),
        CollectedEvent::End => handler.on_end(),
    }
}

/// Records the event stream while forwarding it to an inner handler.
///
/// A reset clears the recording; everything else is kept in order,
/// including errors and the final end event.
#[derive(Debug, Default)]
pub struct CollectingHandler<H = NoopHandler> {
    inner: H,
    events: Vec<CollectedEvent>,
}

impl CollectingHandler<NoopHandler> {
    /// A collector with no inner consumer.
    pub fn new() -> CollectingHandler<NoopHandler> {
        CollectingHandler::wrap(NoopHandler)
    }
}

impl<H: Handler> CollectingHandler<H> {
    pub fn wrap(inner: H) -> CollectingHandler<H> {
        CollectingHandler { inner, events: Vec::new() }
    }

    /// Events recorded since construction or the last reset.
    pub fn events(&self) -> &[CollectedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CollectedEvent> {
        self.events
    }

    /// Reset the inner handler, then feed it the whole recording again.
    pub fn restart(&mut self) {
        self.inner.on_reset();
        for event in &self.events {
            deliver(event, &mut self.inner);
        }
    }

    /// Feed the recording to another handler, keeping it recorded here.
    pub fn replay(&self, handler: &mut impl Handler) {
        for event in &self.events {
            deliver(event, handler);
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: Handler> Handler for CollectingHandler<H> {
    fn on_open_tag_name(&mut self, name: &str) {
        self.events.push(CollectedEvent::OpenTagName(name.to_string()));
        self.inner.on_open_tag_name(name);
    }

    fn on_attribute(&mut self, name: &str, value: &str) {
        self.events.push(CollectedEvent::Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.inner.on_attribute(name, value);
    }

    fn on_open_tag(&mut self, name: &str, attribs: &[Attribute]) {
        self.events.push(CollectedEvent::OpenTag {
            name: name.to_string(),
            attribs: attribs.to_vec(),
        });
        self.inner.on_open_tag(name, attribs);
    }

    fn on_close_tag(&mut self, name: &str) {
        self.events.push(CollectedEvent::CloseTag(name.to_string()));
        self.inner.on_close_tag(name);
    }

    fn on_text(&mut self, text: &str) {
        self.events.push(CollectedEvent::Text(text.to_string()));
        self.inner.on_text(text);
    }

    fn on_comment(&mut self, text: &str) {
        self.events.push(CollectedEvent::Comment(text.to_string()));
        self.inner.on_comment(text);
    }

    fn on_comment_end(&mut self) {
        self.events.push(CollectedEvent::CommentEnd);
        self.inner.on_comment_end();
    }

    fn on_cdata_start(&mut self) {
        self.events.push(CollectedEvent::CdataStart);
        self.inner.on_cdata_start();
    }

    fn on_cdata_end(&mut self) {
        self.events.push(CollectedEvent::CdataEnd);
        self.inner.on_cdata_end();
    }

    fn on_processing_instruction(&mut self, name: &str, data: &str) {
        self.events.push(CollectedEvent::ProcessingInstruction {
            name: name.to_string(),
            data: data.to_string(),
        });
        self.inner.on_processing_instruction(name, data);
    }

    fn on_error(&mut self, error: ParseError) {
        self.events.push(CollectedEvent::Error(error));
        self.inner.on_error(error);
    }

    fn on_reset(&mut self) {
        self.events.clear();
        self.inner.on_reset();
    }

    fn on_end(&mut self) {
        self.events.push(CollectedEvent::End);
        self.inner.on_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[derive(Default)]
    struct Tally {
        opens: usize,
        texts: Vec<String>,
        resets: usize,
    }

    impl Handler for Tally {
        fn on_open_tag(&mut self, _name: &str, _attribs: &[Attribute]) {
            self.opens += 1;
        }
        fn on_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }
        fn on_reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn records_and_forwards() {
        let mut parser = Parser::new(CollectingHandler::wrap(Tally::default()));
        parser.write("<p>hi</p>");
        parser.end();
        let collector = parser.into_handler();
        assert_eq!(collector.inner().opens, 1);
        assert_eq!(collector.inner().texts, ["hi"]);
        assert_eq!(
            collector.events(),
            &[
                CollectedEvent::OpenTagName("p".into()),
                CollectedEvent::OpenTag { name: "p".into(), attribs: vec![] },
                CollectedEvent::Text("hi".into()),
                CollectedEvent::CloseTag("p".into()),
                CollectedEvent::End,
            ]
        );
    }

    #[test]
    fn restart_replays_into_the_inner_handler() {
        let mut parser = Parser::new(CollectingHandler::wrap(Tally::default()));
        parser.write("<p>a</p><p>b</p>");
        parser.end();
        let mut collector = parser.into_handler();
        collector.restart();
        let inner = collector.inner();
        assert_eq!(inner.resets, 1);
        assert_eq!(inner.opens, 4);
        assert_eq!(inner.texts, ["a", "b", "a", "b"]);
    }

    #[test]
    fn replay_drives_any_handler() {
        let mut parser = Parser::new(CollectingHandler::new());
        parser.parse_complete("x<br>y");
        let collector = parser.into_handler();
        let mut copy = Tally::default();
        collector.replay(&mut copy);
        assert_eq!(copy.opens, 1);
        assert_eq!(copy.texts, ["x", "y"]);
        assert_eq!(collector.events().len(), 6);
    }

    #[test]
    fn reset_clears_the_recording() {
        let mut parser = Parser::new(CollectingHandler::new());
        parser.write("<a>");
        parser.reset();
        parser.write("<b>");
        parser.end();
        let events = parser.into_handler().into_events();
        assert_eq!(
            events,
            vec![
                CollectedEvent::OpenTagName("b".into()),
                CollectedEvent::OpenTag { name: "b".into(), attribs: vec![] },
                CollectedEvent::CloseTag("b".into()),
                CollectedEvent::End,
            ]
        );
    }
}
