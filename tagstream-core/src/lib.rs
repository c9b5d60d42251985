//! tagstream Core Parser
//!
//! Streaming, event-based parser for HTML and XML-like markup. Emits
//! document events without building a tree, from input delivered in
//! arbitrary chunks.
//!
//! # Architecture
//!
//! - **tokenizer.rs** - Byte-level state machine, suspendable at any chunk boundary
//! - **parser.rs** - Tag stack, implied closes, attribute assembly over the token stream
//! - **handler.rs** - TokenSink/Handler callback traits, Attribute, errors
//! - **entities.rs** - Named entity tables and character-reference decoding
//! - **collector.rs** - Event recording and replay
//! - **stream.rs** - `io::Write` adapter with incremental UTF-8 decoding

pub mod collector;
pub mod entities;
pub mod handler;
pub mod parser;
pub mod stream;
pub mod tokenizer;

pub use collector::{CollectedEvent, CollectingHandler};
pub use entities::EntityTable;
pub use handler::{Attribute, Handler, NoopHandler, ParseError, TokenSink};
pub use parser::{Parser, ParserOptions};
pub use stream::WriteStream;
pub use tokenizer::{Tokenizer, TokenizerOptions};
