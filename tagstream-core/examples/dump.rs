use std::io;
use tagstream_core::{Attribute, Handler, ParserOptions, WriteStream};

#[derive(Default)]
struct Dump {
    depth: usize,
}

impl Dump {
    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Handler for Dump {
    fn on_open_tag(&mut self, name: &str, attribs: &[Attribute]) {
        let attrs: Vec<String> =
            attribs.iter().map(|a| format!(" {}={:?}", a.name, a.value)).collect();
        println!("{}<{}{}>", self.indent(), name, attrs.join(""));
        self.depth += 1;
    }
    fn on_close_tag(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        println!("{}</{}>", self.indent(), name);
    }
    fn on_text(&mut self, text: &str) {
        if !text.trim().is_empty() {
            println!("{}{:?}", self.indent(), text);
        }
    }
    fn on_comment(&mut self, data: &str) {
        println!("{}<!--{}-->", self.indent(), data);
    }
    fn on_processing_instruction(&mut self, name: &str, _data: &str) {
        println!("{}<{}>", self.indent(), name);
    }
}

/// Parse stdin and print the document structure.
///
/// Try: curl -s https://example.com | cargo run --example dump
fn main() -> io::Result<()> {
    let options = ParserOptions { decode_entities: true, ..ParserOptions::default() };
    let mut stream = WriteStream::with_options(Dump::default(), options);
    io::copy(&mut io::stdin(), &mut stream)?;
    stream.finish();
    Ok(())
}
