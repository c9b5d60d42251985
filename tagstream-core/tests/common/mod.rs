//! Test infrastructure for the tagstream parser
//!
//! Provides fixture loading, stochastic input generation, and the
//! event-trace harness shared by the integration suites.

mod generators;
mod harness;
mod loader;

// Each test binary pulls a different subset of these.
#[allow(unused_imports)]
pub use generators::Gen;
#[allow(unused_imports)]
pub use harness::{collect_events, collect_events_chunked, run_test, run_with_variations};
#[allow(unused_imports)]
pub use loader::{load_fixtures_by_name, CaseOptions, ExpectedEvent, TestCase};
