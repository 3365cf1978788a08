//! Expected-status patterns for HTTP monitors
//!
//! Three forms: an exact code (`200`), a three-character wildcard where `x`
//! stands for any digit (`2xx`), or a range of two of those joined by a dash
//! (`200-399`, `2xx-3xx`). A range covers the numeric interval between its
//! lowest and highest possible endpoint (`x` resolving to 0 on the left and
//! 9 on the right).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("expected-status pattern is empty")]
    Empty,
    #[error("invalid expected-status pattern '{0}'")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Exact(String),
    Wildcard([char; 3]),
}

impl Atom {
    fn parse(s: &str) -> Result<Atom, PatternError> {
        if s.is_empty() {
            return Err(PatternError::Empty);
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Atom::Exact(s.to_string()));
        }
        let chars: Vec<char> = s.chars().collect();
        if chars.len() == 3 && chars.iter().all(|c| c.is_ascii_digit() || *c == 'x') {
            return Ok(Atom::Wildcard([chars[0], chars[1], chars[2]]));
        }
        Err(PatternError::Invalid(s.to_string()))
    }

    fn matches(&self, code: u16) -> bool {
        match self {
            Atom::Exact(expected) => *expected == code.to_string(),
            Atom::Wildcard(digits) => {
                let got = code.to_string();
                let got: Vec<char> = got.chars().collect();
                got.len() == 3
                    && digits
                        .iter()
                        .zip(got.iter())
                        .all(|(want, have)| *want == 'x' || want == have)
            }
        }
    }

    /// Lowest and highest code the atom can stand for
    fn bounds(&self) -> (u16, u16) {
        match self {
            Atom::Exact(s) => {
                let n = s.parse::<u16>().unwrap_or(u16::MAX);
                (n, n)
            }
            Atom::Wildcard(digits) => {
                let resolve = |fill: char| -> u16 {
                    digits
                        .iter()
                        .map(|c| if *c == 'x' { fill } else { *c })
                        .collect::<String>()
                        .parse()
                        .unwrap_or(u16::MAX)
                };
                (resolve('0'), resolve('9'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Single(Atom),
    Range { lo: u16, hi: u16 },
}

/// A parsed, validated expected-status pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPattern {
    raw: String,
    kind: Kind,
}

impl FromStr for StatusPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PatternError::Empty);
        }

        let kind = match s.split_once('-') {
            None => Kind::Single(Atom::parse(s)?),
            Some((left, right)) => {
                if right.contains('-') {
                    return Err(PatternError::Invalid(s.to_string()));
                }
                let (lo, _) = Atom::parse(left)?.bounds();
                let (_, hi) = Atom::parse(right)?.bounds();
                if lo > hi {
                    return Err(PatternError::Invalid(s.to_string()));
                }
                Kind::Range { lo, hi }
            }
        };

        Ok(StatusPattern {
            raw: s.to_string(),
            kind,
        })
    }
}

impl StatusPattern {
    pub fn matches(&self, code: u16) -> bool {
        match &self.kind {
            Kind::Single(atom) => atom.matches(code),
            Kind::Range { lo, hi } => (*lo..=*hi).contains(&code),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
