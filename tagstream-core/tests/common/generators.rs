//! Stochastic content generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

const TAGS: &[&str] = &[
    "div", "span", "p", "em", "strong", "section", "article", "a", "ul", "li", "table", "b",
];
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta"];
const ATTR_NAMES: &[&str] = &["id", "class", "href", "title", "lang", "data-x", "rel"];
const ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&#65;", "&#x2026;", "&nbsp;"];

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("TAGSTREAM_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| rand::random());
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Poisson-like count (simplified)
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.rng.gen::<f64>();
            if p <= l {
                break;
            }
        }
        k - 1
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Random tag name, mostly from a fixed vocabulary
    pub fn tag_name(&mut self) -> String {
        if self.chance(0.8) {
            TAGS[self.rng.gen_range(0..TAGS.len())].to_string()
        } else {
            let len = 1 + self.geometric(0.7);
            (0..len).map(|_| self.rng.gen_range(b'a'..=b'z') as char).collect()
        }
    }

    pub fn void_tag(&mut self) -> &'static str {
        VOID_TAGS[self.rng.gen_range(0..VOID_TAGS.len())]
    }

    pub fn attr_name(&mut self) -> String {
        ATTR_NAMES[self.rng.gen_range(0..ATTR_NAMES.len())].to_string()
    }

    pub fn attr_value(&mut self) -> String {
        let len = 1 + self.geometric(0.8);
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789-_./:";
        (0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())] as char)
            .collect()
    }

    /// Space-separated words, no markup characters
    pub fn words(&mut self) -> String {
        let count = 1 + self.geometric(0.6);
        let mut out = String::new();
        for i in 0..count {
            if i > 0 {
                out.push(' ');
            }
            let len = 1 + self.geometric(0.7);
            for _ in 0..len {
                out.push(self.rng.gen_range(b'a'..=b'z') as char);
            }
        }
        out
    }

    /// Text run that may contain character references
    pub fn text_run(&mut self) -> String {
        let mut out = self.words();
        if self.chance(0.3) {
            out.push_str(ENTITIES[self.rng.gen_range(0..ENTITIES.len())]);
            out.push_str(&self.words());
        }
        out
    }

    fn open_tag(&mut self, name: &str) -> String {
        let mut out = format!("<{name}");
        let attrs = self.geometric(0.4);
        for _ in 0..attrs {
            let value = self.attr_value();
            match self.rng.gen_range(0..4) {
                0 => out.push_str(&format!(" {}", self.attr_name())),
                1 => out.push_str(&format!(" {}={}", self.attr_name(), value)),
                2 => out.push_str(&format!(" {}='{}'", self.attr_name(), value)),
                _ => out.push_str(&format!(" {}=\"{}\"", self.attr_name(), value)),
            }
        }
        out.push('>');
        out
    }

    /// A self-contained fragment that leaves no construct open
    pub fn fragment(&mut self) -> String {
        match self.rng.gen_range(0..5) {
            0 => format!("<!-- {} -->", self.words()),
            1 => {
                let name = self.tag_name();
                format!("{}{}</{}>", self.open_tag(&name), self.text_run(), name)
            }
            2 => format!("<{}>", self.void_tag()),
            3 => format!("<script>var x = 1 < {};</script>", self.rng.gen_range(2..99)),
            _ => self.text_run(),
        }
    }

    /// Random well-formed document: every opened element is closed, raw
    /// text and comments are always terminated
    pub fn document(&mut self) -> String {
        let mut out = String::new();
        let mut stack: Vec<String> = Vec::new();
        let steps = 5 + self.poisson(20.0);
        for _ in 0..steps {
            match self.rng.gen_range(0..10) {
                0..=2 => {
                    let name = self.tag_name();
                    out.push_str(&self.open_tag(&name));
                    stack.push(name);
                }
                3..=4 => {
                    if let Some(name) = stack.pop() {
                        out.push_str(&format!("</{name}>"));
                    } else {
                        out.push_str(&self.text_run());
                    }
                }
                5..=6 => out.push_str(&self.text_run()),
                7 => out.push_str(&format!("<!--{}-->", self.words())),
                8 => out.push_str(&format!("<{}>", self.void_tag())),
                _ => out.push_str(&self.fragment()),
            }
        }
        while let Some(name) = stack.pop() {
            out.push_str(&format!("</{name}>"));
        }
        out
    }

    /// Arbitrary markup-flavored soup, not necessarily well formed
    pub fn soup(&mut self, max_len: usize) -> String {
        let chars: &[u8] = b"<>&;/=\"' \n\t!?-[]abcdefgh0123456789#x";
        let len = self.rng.gen_range(0..=max_len);
        (0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut g1 = Gen::new(42);
        let mut g2 = Gen::new(42);

        for _ in 0..10 {
            assert_eq!(g1.tag_name(), g2.tag_name());
            assert_eq!(g1.document(), g2.document());
            assert_eq!(g1.geometric(0.9), g2.geometric(0.9));
        }
    }

    #[test]
    fn test_documents_balance() {
        let mut gen = Gen::new(12345);
        for _ in 0..50 {
            let doc = gen.document();
            let opens = doc.matches("</").count();
            assert!(doc.len() > 0 && opens <= doc.matches('<').count());
        }
    }
}
