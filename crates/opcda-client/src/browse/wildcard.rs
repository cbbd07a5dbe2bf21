// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Element name patterns.
//!
//! Servers evaluate name filters themselves; this module implements the same
//! pattern language for client-side checks and simulated servers.
//!
//! | Pattern   | Matches                                  |
//! |-----------|------------------------------------------|
//! | `?`       | any single character                     |
//! | `*`       | zero or more characters                  |
//! | `#`       | any single digit                         |
//! | `[abc]`   | any one of the listed characters         |
//! | `[a-z]`   | any character in the range               |
//! | `[!a-z]`  | any character not in the range           |
//!
//! An empty pattern matches every name. Use `[*]`, `[?]` or `[#]` to match
//! those characters literally.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Digit,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
    fn accepts(&self, c: char) -> bool {
        match self {
            Self::Literal(expected) => *expected == c,
            Self::AnyOne => true,
            Self::AnyRun => false,
            Self::Digit => c.is_ascii_digit(),
            Self::Class { negated, ranges } => {
                let inside = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
                inside != *negated
            }
        }
    }
}

/// A compiled name pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compiles a pattern. Unterminated `[` is matched literally.
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '?' => tokens.push(Token::AnyOne),
                '#' => tokens.push(Token::Digit),
                '*' => {
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '[' => match parse_class(&chars[i + 1..]) {
                    Some((token, consumed)) => {
                        tokens.push(token);
                        i += consumed;
                    }
                    None => tokens.push(Token::Literal('[')),
                },
                c => tokens.push(Token::Literal(c)),
            }
            i += 1;
        }

        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    /// Returns the pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern matches every name.
    pub fn matches_all(&self) -> bool {
        self.tokens.is_empty() || self.tokens == [Token::AnyRun]
    }

    /// Tests a name against the pattern.
    pub fn is_match(&self, name: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }

        let text: Vec<char> = name.chars().collect();
        let tokens = &self.tokens;
        let (mut t, mut s) = (0, 0);
        let mut backtrack: Option<(usize, usize)> = None;

        while s < text.len() {
            if t < tokens.len() && tokens[t] == Token::AnyRun {
                backtrack = Some((t, s));
                t += 1;
            } else if t < tokens.len() && tokens[t].accepts(text[s]) {
                t += 1;
                s += 1;
            } else if let Some((star, start)) = backtrack {
                t = star + 1;
                s = start + 1;
                backtrack = Some((star, start + 1));
            } else {
                return false;
            }
        }

        tokens[t..].iter().all(|token| *token == Token::AnyRun)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

/// Parses the body of a `[...]` class. Returns the token and the number of
/// characters consumed including the closing bracket.
fn parse_class(chars: &[char]) -> Option<(Token, usize)> {
    let mut i = 0;
    let negated = chars.first() == Some(&'!');
    if negated {
        i += 1;
    }

    let mut ranges = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c == ']' && !ranges.is_empty() {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
            let (lo, hi) = (c, chars[i + 2]);
            ranges.push(if lo <= hi { (lo, hi) } else { (hi, lo) });
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

/// Tests `name` against `pattern`.
pub fn matches(pattern: &str, name: &str) -> bool {
    Pattern::new(pattern).is_match(name)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_star_match_all() {
        assert!(matches("", "anything"));
        assert!(matches("*", ""));
        assert!(Pattern::new("**").matches_all());
        assert!(!Pattern::new("a*").matches_all());
    }

    #[test]
    fn test_single_and_run() {
        assert!(matches("Random.Int?", "Random.Int1"));
        assert!(!matches("Random.Int?", "Random.Int12"));
        assert!(matches("Random.*", "Random.Int1"));
        assert!(matches("*Int*", "Random.Int4"));
        assert!(matches("R*m.*1", "Random.Int1"));
        assert!(!matches("Random.*", "Bucket Brigade.Int1"));
    }

    #[test]
    fn test_digit() {
        assert!(matches("Int#", "Int4"));
        assert!(!matches("Int#", "IntX"));
    }

    #[test]
    fn test_classes() {
        assert!(matches("Int[12]", "Int1"));
        assert!(!matches("Int[12]", "Int3"));
        assert!(matches("[a-c]x", "bx"));
        assert!(matches("[!a-c]x", "dx"));
        assert!(!matches("[!a-c]x", "ax"));
        assert!(matches("[*]", "*"));
        assert!(!matches("[*]", "a"));
    }

    #[test]
    fn test_unterminated_class_is_literal() {
        assert!(matches("a[b", "a[b"));
        assert!(!matches("a[b", "ab"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!matches("random*", "Random.Int1"));
    }
}
