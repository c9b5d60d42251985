//! Test harness for fixture runs with stochastic variations

use rand::Rng;
use tagstream_core::{Attribute, Handler, ParseError, Parser, ParserOptions};

use crate::common::{ExpectedEvent, Gen, TestCase};

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

/// Records every callback as a formatted line (spans every Handler
/// method, unlike the per-suite simplified enums)
#[derive(Default)]
struct Trace {
    events: Vec<String>,
}

impl Handler for Trace {
    fn on_open_tag_name(&mut self, name: &str) {
        self.events.push(format!("OpenTagName {:?}", name));
    }
    fn on_attribute(&mut self, name: &str, value: &str) {
        self.events.push(format!("Attribute {:?}", format!("{name}={value}")));
    }
    fn on_open_tag(&mut self, name: &str, _attribs: &[Attribute]) {
        self.events.push(format!("OpenTag {:?}", name));
    }
    fn on_close_tag(&mut self, name: &str) {
        self.events.push(format!("CloseTag {:?}", name));
    }
    fn on_text(&mut self, text: &str) {
        self.events.push(format!("Text {:?}", text));
    }
    fn on_comment(&mut self, text: &str) {
        self.events.push(format!("Comment {:?}", text));
    }
    fn on_comment_end(&mut self) {
        self.events.push("CommentEnd".to_string());
    }
    fn on_cdata_start(&mut self) {
        self.events.push("CdataStart".to_string());
    }
    fn on_cdata_end(&mut self) {
        self.events.push("CdataEnd".to_string());
    }
    fn on_processing_instruction(&mut self, name: &str, data: &str) {
        self.events.push(format!("ProcessingInstruction {:?}", format!("{name} {data}")));
    }
    fn on_error(&mut self, error: ParseError) {
        self.events.push(format!("Error {:?}", error.message()));
    }
    fn on_end(&mut self) {
        self.events.push("End".to_string());
    }
}

/// Parse the whole input in one write, returning formatted events
pub fn collect_events(options: ParserOptions, input: &str) -> Vec<String> {
    collect_events_chunked(options, input, &[])
}

/// Parse with writes split at the given byte positions
pub fn collect_events_chunked(options: ParserOptions, input: &str, splits: &[usize]) -> Vec<String> {
    let mut parser = Parser::with_options(Trace::default(), options);
    let mut start = 0;
    for &split in splits {
        if split > start && split < input.len() && input.is_char_boundary(split) {
            parser.write(&input[start..split]);
            start = split;
        }
    }
    parser.write(&input[start..]);
    parser.end();
    parser.into_handler().events
}

/// Format expected event for comparison
fn format_expected(event: &ExpectedEvent) -> String {
    match event {
        ExpectedEvent::Bare(name) => name.clone(),
        ExpectedEvent::WithContent(name, content) => format!("{} {:?}", name, content),
    }
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let actual = collect_events(case.options.to_parser_options(), &case.html);
    let expected: Vec<String> = case.events.iter().map(format_expected).collect();

    let mut errors = Vec::new();

    if actual.len() != expected.len() {
        errors.push(format!(
            "Event count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }

    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Event {}: expected '{}', got '{}'", i, exp, act));
        }
    }

    TestResult {
        passed: errors.is_empty(),
        input: case.html.clone(),
        expected,
        actual,
        seed: 0,
        errors,
    }
}

/// Run test with stochastic variations
///
/// Applies independent variations:
/// - 40% chance of surrounding markup before and after
/// - Input delivered in a random number of chunks
///
/// Expected events are then checked as an in-order subsequence, since
/// the wrapping context contributes events of its own.
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let mut input = String::new();

    if gen.chance(0.4) {
        input.push_str(&gen.fragment());
        // a comment flushes any pending text so the case starts clean
        input.push_str("<!--pad-->");
    }
    input.push_str(&case.html);
    if gen.chance(0.4) {
        input.push_str("<!--pad-->");
        input.push_str(&gen.fragment());
    }

    // Random chunking
    let mut splits: Vec<usize> = (0..gen.poisson(2.0))
        .map(|_| gen.rng.gen_range(0..=input.len()))
        .collect();
    splits.sort_unstable();

    let actual = collect_events_chunked(case.options.to_parser_options(), &input, &splits);
    let expected: Vec<String> = case.events.iter().map(format_expected).collect();

    // Subsequence match: expected events must appear in order
    let mut errors = Vec::new();
    let mut exp_idx = 0;

    for act in &actual {
        if exp_idx < expected.len() && act == &expected[exp_idx] {
            exp_idx += 1;
        }
    }

    if exp_idx < expected.len() {
        errors.push(format!(
            "Missing expected events starting at index {}: {:?}",
            exp_idx,
            &expected[exp_idx..]
        ));
    }

    // Check for Error events (unless expected)
    for act in &actual {
        if act.starts_with("Error") && !expected.iter().any(|e| e.starts_with("Error")) {
            errors.push(format!("Unexpected error: {}", act));
        }
    }

    TestResult {
        passed: errors.is_empty(),
        input,
        expected,
        actual,
        seed: gen.seed,
        errors,
    }
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!(
            "Seed: {} (set TAGSTREAM_TEST_SEED={} to reproduce)",
            self.seed, self.seed
        );
        eprintln!("\nInput:");
        eprintln!("{}", self.input);
        eprintln!("\nExpected events:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual events:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
