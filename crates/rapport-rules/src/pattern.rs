use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Upper bound on the number of needles one pattern may expand to.
const MAX_NEEDLES: usize = 256;

/// Characters with regex meaning that the compiler refuses rather than
/// silently treating as literals. Escape them with `\` to match literally.
const UNSUPPORTED: &[char] = &['.', '*', '+', '[', ']', '{', '}', '^', '$'];

/// Characters that may follow `\` to stand for themselves.
const ESCAPABLE: &[char] = &[
    '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '\\',
];

/// Stand-in for `\b` while alternatives are expanded.
const BOUNDARY: char = '\u{1}';

/// A compiled reply pattern.
///
/// The supported syntax is the regex subset reply rules are written in:
///
/// - alternation: `hug|cuddle|embraces`
/// - optional characters and groups: `hugs?`, `push(es)? away`
/// - grouped alternation, optionally optional: `(hold|take) hands`, `(very |so )?sorry`
/// - word boundaries: `\bhug\b`
/// - escaped metacharacters: `\?`, `\.`, `\(`
/// - anything else is a literal character
///
/// A pattern is expanded into every literal string it can match (its
/// needles). Matching is substring search over lower-cased text, with word
/// boundaries checked around each hit, which is what an unanchored regex
/// over this subset does.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    needles: Vec<Needle>,
}

/// One literal alternative of a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Needle {
    text: String,
    /// Byte offsets into `text` that must sit on a word boundary.
    boundaries: Vec<usize>,
}

impl Needle {
    fn from_expansion(expanded: &str) -> Self {
        let mut text = String::with_capacity(expanded.len());
        let mut boundaries = Vec::new();
        for c in expanded.chars() {
            if c == BOUNDARY {
                if boundaries.last() != Some(&text.len()) {
                    boundaries.push(text.len());
                }
            } else {
                text.push(c);
            }
        }
        Self { text, boundaries }
    }

    /// The lower-cased literal text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the needle is anchored to word boundaries anywhere.
    pub fn has_boundaries(&self) -> bool {
        !self.boundaries.is_empty()
    }

    fn found_in(&self, haystack: &str) -> bool {
        if self.boundaries.is_empty() {
            return haystack.contains(self.text.as_str());
        }
        let mut from = 0;
        while let Some(offset) = haystack[from..].find(self.text.as_str()) {
            let start = from + offset;
            if self
                .boundaries
                .iter()
                .all(|b| is_word_boundary(haystack, start + b))
            {
                return true;
            }
            from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
        }
        false
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_boundary(text: &str, at: usize) -> bool {
    let before = text[..at].chars().next_back().is_some_and(is_word_char);
    let after = text[at..].chars().next().is_some_and(is_word_char);
    before != after
}

impl Pattern {
    /// Compile `source` into a pattern.
    pub fn compile(source: &str) -> Result<Self, RuleError> {
        if source.trim().is_empty() {
            return Err(RuleError::pattern(source, "pattern must not be empty"));
        }
        if source.contains(BOUNDARY) {
            return Err(RuleError::pattern(source, "control characters are not allowed"));
        }

        let chars: Vec<char> = source.chars().collect();
        let mut parser = Parser {
            source,
            chars: &chars,
            pos: 0,
        };
        let expanded = parser.alternation()?;
        if parser.pos < chars.len() {
            // Only an unmatched ')' stops the top-level alternation early.
            return Err(RuleError::pattern(
                source,
                format!("unbalanced ')' at offset {}", parser.pos),
            ));
        }

        let mut needles: Vec<Needle> = Vec::with_capacity(expanded.len());
        for alternative in &expanded {
            let needle = Needle::from_expansion(alternative);
            if needle.text.is_empty() {
                return Err(RuleError::pattern(source, "pattern can match empty text"));
            }
            if !needles.contains(&needle) {
                needles.push(needle);
            }
        }

        Ok(Self {
            source: source.to_string(),
            needles,
        })
    }

    /// The pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every literal alternative this pattern matches, in expansion order.
    pub fn needles(&self) -> &[Needle] {
        &self.needles
    }

    /// Whether already lower-cased text contains any needle.
    pub fn matches_lowered(&self, lowered: &str) -> bool {
        self.needles.iter().any(|n| n.found_in(lowered))
    }

    /// Case-insensitive match against arbitrary text.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowered(&text.to_lowercase())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for Pattern {
    type Error = RuleError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::compile(&source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    source: &'a str,
    chars: &'a [char],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> RuleError {
        RuleError::pattern(self.source, reason)
    }

    /// `sequence ('|' sequence)*`
    fn alternation(&mut self) -> Result<Vec<String>, RuleError> {
        let mut out = Vec::new();
        loop {
            let start = self.pos;
            let branch = self.sequence()?;
            if self.pos == start {
                return Err(self.error(format!("empty alternative at offset {start}")));
            }
            out.extend(branch);
            self.check_size(out.len())?;

            if self.peek() == Some('|') {
                self.pos += 1;
            } else {
                return Ok(out);
            }
        }
    }

    /// A run of atoms, each optionally followed by `?`, stopping at `|`,
    /// `)` or end of input.
    fn sequence(&mut self) -> Result<Vec<String>, RuleError> {
        let mut acc = vec![String::new()];
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let mut atom = self.atom()?;
            if self.peek() == Some('?') {
                self.pos += 1;
                atom.push(String::new());
            }
            acc = self.product(&acc, &atom)?;
        }
        Ok(acc)
    }

    /// A group, an escape, or one literal character.
    fn atom(&mut self) -> Result<Vec<String>, RuleError> {
        let at = self.pos;
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of pattern"));
        };
        self.pos += 1;
        match c {
            '(' => {
                let inner = self.alternation()?;
                if self.peek() != Some(')') {
                    return Err(self.error(format!("unclosed '(' at offset {at}")));
                }
                self.pos += 1;
                Ok(inner)
            }
            '\\' => match self.peek() {
                Some('b') => {
                    self.pos += 1;
                    Ok(vec![BOUNDARY.to_string()])
                }
                Some(e) if ESCAPABLE.contains(&e) => {
                    self.pos += 1;
                    Ok(vec![e.to_string()])
                }
                Some(e) => Err(self.error(format!("unsupported escape '\\{e}' at offset {at}"))),
                None => Err(self.error("pattern ends with '\\'")),
            },
            '?' => Err(self.error(format!("'?' at offset {at} has nothing to make optional"))),
            c if UNSUPPORTED.contains(&c) => Err(self.error(format!(
                "unsupported character '{c}' at offset {at}; escape it with '\\'"
            ))),
            c => Ok(vec![c.to_lowercase().collect()]),
        }
    }

    fn product(&self, left: &[String], right: &[String]) -> Result<Vec<String>, RuleError> {
        self.check_size(left.len().saturating_mul(right.len()))?;
        let mut out = Vec::with_capacity(left.len() * right.len());
        for l in left {
            for r in right {
                out.push(format!("{l}{r}"));
            }
        }
        Ok(out)
    }

    fn check_size(&self, n: usize) -> Result<(), RuleError> {
        if n > MAX_NEEDLES {
            return Err(self.error(format!(
                "pattern expands to more than {MAX_NEEDLES} alternatives"
            )));
        }
        Ok(())
    }
}
