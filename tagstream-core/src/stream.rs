//! Byte-stream adapter.
//!
//! [`WriteStream`] implements [`std::io::Write`] over a [`Parser`] so a
//! byte source (file, socket, pipe) can be copied straight into the
//! parser. Bytes are decoded as UTF-8 incrementally: a multi-byte
//! sequence split across writes is held until complete, and invalid
//! sequences become U+FFFD. Byte writes themselves never fail.

use std::io;
use std::mem;
use std::str;

use crate::handler::Handler;
use crate::parser::{Parser, ParserOptions};

const REPLACEMENT: &str = "\u{FFFD}";

/// Feeds decoded bytes into a [`Parser`]. See the module docs.
#[derive(Debug)]
pub struct WriteStream<H: Handler> {
    parser: Parser<H>,
    /// Incomplete trailing UTF-8 sequence, at most three bytes.
    pending: Vec<u8>,
}

impl<H: Handler> WriteStream<H> {
    pub fn new(handler: H) -> WriteStream<H> {
        WriteStream::with_options(handler, ParserOptions::default())
    }

    pub fn with_options(handler: H, options: ParserOptions) -> WriteStream<H> {
        WriteStream::from_parser(Parser::with_options(handler, options))
    }

    pub fn from_parser(parser: Parser<H>) -> WriteStream<H> {
        WriteStream { parser, pending: Vec::new() }
    }

    pub fn parser(&self) -> &Parser<H> {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut Parser<H> {
        &mut self.parser
    }

    /// End the document and hand back the parser. A held incomplete
    /// sequence is flushed as U+FFFD first.
    pub fn finish(mut self) -> Parser<H> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.parser.write(REPLACEMENT);
        }
        self.parser.end();
        self.parser
    }

    fn push_bytes(&mut self, buf: &[u8]) {
        if self.pending.is_empty() {
            let consumed = self.write_decoded(buf);
            self.pending.extend_from_slice(&buf[consumed..]);
        } else {
            let mut held = mem::take(&mut self.pending);
            held.extend_from_slice(buf);
            let consumed = self.write_decoded(&held);
            held.drain(..consumed);
            self.pending = held;
        }
    }

    /// Parse the longest decodable prefix, substituting U+FFFD for
    /// invalid sequences. Returns the bytes consumed; the remainder is
    /// an incomplete sequence that may still become valid.
    fn write_decoded(&mut self, bytes: &[u8]) -> usize {
        let total = bytes.len();
        let mut rest = bytes;
        loop {
            match str::from_utf8(rest) {
                Ok(text) => {
                    if !text.is_empty() {
                        self.parser.write(text);
                    }
                    return total;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if valid > 0 {
                        self.parser.write(str::from_utf8(&rest[..valid]).unwrap_or(""));
                    }
                    match err.error_len() {
                        Some(bad) => {
                            self.parser.write(REPLACEMENT);
                            rest = &rest[valid + bad..];
                        }
                        None => return total - (rest.len() - valid),
                    }
                }
            }
        }
    }
}

impl<H: Handler> io::Write for WriteStream<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
