//! Character reference tables and decoding.
//!
//! The tokenizer treats entity data as injected configuration: an
//! [`EntityTable`] maps named references to replacement text, while the
//! numeric forms are decoded in code. Two tables ship built in: the five
//! predefined XML entities and the HTML 4 named set. Consumers with a
//! bigger vocabulary (the full HTML 5 list, custom DTD entities) can
//! build their own table over a `phf::Map` and pass it to
//! [`Tokenizer::with_entities`](crate::Tokenizer::with_entities).
//!
//! Named lookups are exact and case-sensitive: `Auml` and `auml` are
//! different references.

use phf::phf_map;

/// Immutable named-reference lookup, injected into the tokenizer.
#[derive(Debug, Clone, Copy)]
pub struct EntityTable {
    named: &'static phf::Map<&'static str, &'static str>,
}

impl EntityTable {
    pub const fn new(named: &'static phf::Map<&'static str, &'static str>) -> Self {
        Self { named }
    }

    /// Replacement text for `&name;`, or `None` if the name is unknown.
    pub fn lookup(&self, name: &str) -> Option<&'static str> {
        self.named.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.len() == 0
    }
}

/// The five predefined XML entities.
pub static XML_ENTITIES: EntityTable = EntityTable::new(&XML_NAMED);

/// The HTML 4 named set (Latin-1, Greek, punctuation, symbols, arrows,
/// math), plus `apos`. Semicolon-terminated forms only.
pub static HTML_ENTITIES: EntityTable = EntityTable::new(&HTML_NAMED);

static XML_NAMED: phf::Map<&'static str, &'static str> = phf_map! {
    "amp" => "&",
    "apos" => "'",
    "gt" => ">",
    "lt" => "<",
    "quot" => "\"",
};

static HTML_NAMED: phf::Map<&'static str, &'static str> = phf_map! {
    // Markup-significant
    "amp" => "&",
    "apos" => "'",
    "gt" => ">",
    "lt" => "<",
    "quot" => "\"",
    // Latin-1
    "nbsp" => "\u{a0}",
    "iexcl" => "\u{a1}",
    "cent" => "\u{a2}",
    "pound" => "\u{a3}",
    "curren" => "\u{a4}",
    "yen" => "\u{a5}",
    "brvbar" => "\u{a6}",
    "sect" => "\u{a7}",
    "uml" => "\u{a8}",
    "copy" => "\u{a9}",
    "ordf" => "\u{aa}",
    "laquo" => "\u{ab}",
    "not" => "\u{ac}",
    "shy" => "\u{ad}",
    "reg" => "\u{ae}",
    "macr" => "\u{af}",
    "deg" => "\u{b0}",
    "plusmn" => "\u{b1}",
    "sup2" => "\u{b2}",
    "sup3" => "\u{b3}",
    "acute" => "\u{b4}",
    "micro" => "\u{b5}",
    "para" => "\u{b6}",
    "middot" => "\u{b7}",
    "cedil" => "\u{b8}",
    "sup1" => "\u{b9}",
    "ordm" => "\u{ba}",
    "raquo" => "\u{bb}",
    "frac14" => "\u{bc}",
    "frac12" => "\u{bd}",
    "frac34" => "\u{be}",
    "iquest" => "\u{bf}",
    "Agrave" => "\u{c0}",
    "Aacute" => "\u{c1}",
    "Acirc" => "\u{c2}",
    "Atilde" => "\u{c3}",
    "Auml" => "\u{c4}",
    "Aring" => "\u{c5}",
    "AElig" => "\u{c6}",
    "Ccedil" => "\u{c7}",
    "Egrave" => "\u{c8}",
    "Eacute" => "\u{c9}",
    "Ecirc" => "\u{ca}",
    "Euml" => "\u{cb}",
    "Igrave" => "\u{cc}",
    "Iacute" => "\u{cd}",
    "Icirc" => "\u{ce}",
    "Iuml" => "\u{cf}",
    "ETH" => "\u{d0}",
    "Ntilde" => "\u{d1}",
    "Ograve" => "\u{d2}",
    "Oacute" => "\u{d3}",
    "Ocirc" => "\u{d4}",
    "Otilde" => "\u{d5}",
    "Ouml" => "\u{d6}",
    "times" => "\u{d7}",
    "Oslash" => "\u{d8}",
    "Ugrave" => "\u{d9}",
    "Uacute" => "\u{da}",
    "Ucirc" => "\u{db}",
    "Uuml" => "\u{dc}",
    "Yacute" => "\u{dd}",
    "THORN" => "\u{de}",
    "szlig" => "\u{df}",
    "agrave" => "\u{e0}",
    "aacute" => "\u{e1}",
    "acirc" => "\u{e2}",
    "atilde" => "\u{e3}",
    "auml" => "\u{e4}",
    "aring" => "\u{e5}",
    "aelig" => "\u{e6}",
    "ccedil" => "\u{e7}",
    "egrave" => "\u{e8}",
    "eacute" => "\u{e9}",
    "ecirc" => "\u{ea}",
    "euml" => "\u{eb}",
    "igrave" => "\u{ec}",
    "iacute" => "\u{ed}",
    "icirc" => "\u{ee}",
    "iuml" => "\u{ef}",
    "eth" => "\u{f0}",
    "ntilde" => "\u{f1}",
    "ograve" => "\u{f2}",
    "oacute" => "\u{f3}",
    "ocirc" => "\u{f4}",
    "otilde" => "\u{f5}",
    "ouml" => "\u{f6}",
    "divide" => "\u{f7}",
    "oslash" => "\u{f8}",
    "ugrave" => "\u{f9}",
    "uacute" => "\u{fa}",
    "ucirc" => "\u{fb}",
    "uuml" => "\u{fc}",
    "yacute" => "\u{fd}",
    "thorn" => "\u{fe}",
    "yuml" => "\u{ff}",
    // Latin Extended & spacing modifiers
    "OElig" => "\u{152}",
    "oelig" => "\u{153}",
    "Scaron" => "\u{160}",
    "scaron" => "\u{161}",
    "Yuml" => "\u{178}",
    "fnof" => "\u{192}",
    "circ" => "\u{2c6}",
    "tilde" => "\u{2dc}",
    // Greek
    "Alpha" => "\u{391}",
    "Beta" => "\u{392}",
    "Gamma" => "\u{393}",
    "Delta" => "\u{394}",
    "Epsilon" => "\u{395}",
    "Zeta" => "\u{396}",
    "Eta" => "\u{397}",
    "Theta" => "\u{398}",
    "Iota" => "\u{399}",
    "Kappa" => "\u{39a}",
    "Lambda" => "\u{39b}",
    "Mu" => "\u{39c}",
    "Nu" => "\u{39d}",
    "Xi" => "\u{39e}",
    "Omicron" => "\u{39f}",
    "Pi" => "\u{3a0}",
    "Rho" => "\u{3a1}",
    "Sigma" => "\u{3a3}",
    "Tau" => "\u{3a4}",
    "Upsilon" => "\u{3a5}",
    "Phi" => "\u{3a6}",
    "Chi" => "\u{3a7}",
    "Psi" => "\u{3a8}",
    "Omega" => "\u{3a9}",
    "alpha" => "\u{3b1}",
    "beta" => "\u{3b2}",
    "gamma" => "\u{3b3}",
    "delta" => "\u{3b4}",
    "epsilon" => "\u{3b5}",
    "zeta" => "\u{3b6}",
    "eta" => "\u{3b7}",
    "theta" => "\u{3b8}",
    "iota" => "\u{3b9}",
    "kappa" => "\u{3ba}",
    "lambda" => "\u{3bb}",
    "mu" => "\u{3bc}",
    "nu" => "\u{3bd}",
    "xi" => "\u{3be}",
    "omicron" => "\u{3bf}",
    "pi" => "\u{3c0}",
    "rho" => "\u{3c1}",
    "sigmaf" => "\u{3c2}",
    "sigma" => "\u{3c3}",
    "tau" => "\u{3c4}",
    "upsilon" => "\u{3c5}",
    "phi" => "\u{3c6}",
    "chi" => "\u{3c7}",
    "psi" => "\u{3c8}",
    "omega" => "\u{3c9}",
    "thetasym" => "\u{3d1}",
    "upsih" => "\u{3d2}",
    "piv" => "\u{3d6}",
    // General punctuation
    "ensp" => "\u{2002}",
    "emsp" => "\u{2003}",
    "thinsp" => "\u{2009}",
    "zwnj" => "\u{200c}",
    "zwj" => "\u{200d}",
    "lrm" => "\u{200e}",
    "rlm" => "\u{200f}",
    "ndash" => "\u{2013}",
    "mdash" => "\u{2014}",
    "lsquo" => "\u{2018}",
    "rsquo" => "\u{2019}",
    "sbquo" => "\u{201a}",
    "ldquo" => "\u{201c}",
    "rdquo" => "\u{201d}",
    "bdquo" => "\u{201e}",
    "dagger" => "\u{2020}",
    "Dagger" => "\u{2021}",
    "bull" => "\u{2022}",
    "hellip" => "\u{2026}",
    "permil" => "\u{2030}",
    "prime" => "\u{2032}",
    "Prime" => "\u{2033}",
    "lsaquo" => "\u{2039}",
    "rsaquo" => "\u{203a}",
    "oline" => "\u{203e}",
    "frasl" => "\u{2044}",
    "euro" => "\u{20ac}",
    // Letterlike
    "weierp" => "\u{2118}",
    "image" => "\u{2111}",
    "real" => "\u{211c}",
    "trade" => "\u{2122}",
    "alefsym" => "\u{2135}",
    // Arrows
    "larr" => "\u{2190}",
    "uarr" => "\u{2191}",
    "rarr" => "\u{2192}",
    "darr" => "\u{2193}",
    "harr" => "\u{2194}",
    "crarr" => "\u{21b5}",
    "lArr" => "\u{21d0}",
    "uArr" => "\u{21d1}",
    "rArr" => "\u{21d2}",
    "dArr" => "\u{21d3}",
    "hArr" => "\u{21d4}",
    // Mathematical operators
    "forall" => "\u{2200}",
    "part" => "\u{2202}",
    "exist" => "\u{2203}",
    "empty" => "\u{2205}",
    "nabla" => "\u{2207}",
    "isin" => "\u{2208}",
    "notin" => "\u{2209}",
    "ni" => "\u{220b}",
    "prod" => "\u{220f}",
    "sum" => "\u{2211}",
    "minus" => "\u{2212}",
    "lowast" => "\u{2217}",
    "radic" => "\u{221a}",
    "prop" => "\u{221d}",
    "infin" => "\u{221e}",
    "ang" => "\u{2220}",
    "and" => "\u{2227}",
    "or" => "\u{2228}",
    "cap" => "\u{2229}",
    "cup" => "\u{222a}",
    "int" => "\u{222b}",
    "there4" => "\u{2234}",
    "sim" => "\u{223c}",
    "cong" => "\u{2245}",
    "asymp" => "\u{2248}",
    "ne" => "\u{2260}",
    "equiv" => "\u{2261}",
    "le" => "\u{2264}",
    "ge" => "\u{2265}",
    "sub" => "\u{2282}",
    "sup" => "\u{2283}",
    "nsub" => "\u{2284}",
    "sube" => "\u{2286}",
    "supe" => "\u{2287}",
    "oplus" => "\u{2295}",
    "otimes" => "\u{2297}",
    "perp" => "\u{22a5}",
    "sdot" => "\u{22c5}",
    // Technical, geometric, misc symbols
    "lceil" => "\u{2308}",
    "rceil" => "\u{2309}",
    "lfloor" => "\u{230a}",
    "rfloor" => "\u{230b}",
    "lang" => "\u{2329}",
    "rang" => "\u{232a}",
    "loz" => "\u{25ca}",
    "spades" => "\u{2660}",
    "clubs" => "\u{2663}",
    "hearts" => "\u{2665}",
    "diams" => "\u{2666}",
};

// 0x80..=0x9F remapped per Windows-1252; gaps map to themselves.
const WINDOWS_1252: [u32; 32] = [
    0x20ac, 0x0081, 0x201a, 0x0192, 0x201e, 0x2026, 0x2020, 0x2021,
    0x02c6, 0x2030, 0x0160, 0x2039, 0x0152, 0x008d, 0x017d, 0x008f,
    0x0090, 0x2018, 0x2019, 0x201c, 0x201d, 0x2022, 0x2013, 0x2014,
    0x02dc, 0x2122, 0x0161, 0x203a, 0x0153, 0x009d, 0x017e, 0x0178,
];

/// Decode a numeric reference the way HTML consumers do.
///
/// NUL, surrogates and out-of-range values become U+FFFD; the C1 range
/// is reinterpreted through Windows-1252.
pub fn decode_codepoint(cp: u32) -> char {
    let cp = match cp {
        0 => 0xfffd,
        0x80..=0x9f => WINDOWS_1252[(cp - 0x80) as usize],
        0xd800..=0xdfff => 0xfffd,
        cp if cp > 0x10ffff => 0xfffd,
        cp => cp,
    };
    char::from_u32(cp).unwrap_or('\u{fffd}')
}

/// Decode a numeric reference under XML rules.
///
/// Returns `None` for anything outside the XML `Char` production, which
/// the tokenizer then passes through literally.
pub fn decode_xml_codepoint(cp: u32) -> Option<char> {
    let valid = matches!(cp,
        0x9 | 0xa | 0xd
        | 0x20..=0xd7ff
        | 0xe000..=0xfffd
        | 0x1_0000..=0x10_ffff);
    if valid {
        char::from_u32(cp)
    } else {
        None
    }
}
