//! Filter list parser.
//!
//! Grammar:
//!
//! ```text
//! rules    := [ rule { sep rule } [ sep ] ]
//! sep      := ';' | ','
//! rule     := operand relation operand
//! operand  := NAME [ '(' INTEGER ')' ]
//! relation := '>' | '>=' | '<' | '<=' | '=='
//! ```
//!
//! Names are case-insensitive. Only indicators accept a period. Errors carry
//! the character offset of the offending token. INI files should use `,`
//! between rules since `;` can start a comment there.

use crate::domain::column::Element;
use crate::domain::error::ParseError;
use crate::domain::rule::{ComparisonElement, ComparisonRule, Relation};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn describe_next(&self) -> String {
        self.peek()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(ParseError {
                message: format!("expected integer, found '{}'", self.describe_next()),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_operand(&mut self) -> Result<ComparisonElement, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.peek_word();
        if word.is_empty() {
            return Err(ParseError {
                message: format!("expected column or indicator, found '{}'", self.describe_next()),
                position: start,
            });
        }

        let element = word.parse::<Element>().map_err(|_| ParseError {
            message: format!("unknown column or indicator '{}'", word),
            position: start,
        })?;
        self.pos += word.len();

        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Ok(ComparisonElement::new(element));
        }

        if let Element::Raw(column) = element {
            return Err(ParseError {
                message: format!("column {} does not take a period", column),
                position: self.pos,
            });
        }

        self.advance();
        let period_pos = self.pos;
        let period = self.parse_integer()?;
        if period == 0 {
            return Err(ParseError {
                message: "period must be at least 1".to_string(),
                position: period_pos,
            });
        }
        self.expect_char(')')?;
        Ok(ComparisonElement::with_period(element, period))
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let token: String = self
            .remaining()
            .chars()
            .take_while(|c| matches!(c, '<' | '>' | '=' | '!'))
            .collect();

        if token.is_empty() {
            return Err(ParseError {
                message: format!("expected relation, found '{}'", self.describe_next()),
                position: start,
            });
        }

        match Relation::from_symbol(&token) {
            Some(relation) => {
                self.pos += token.len();
                Ok(relation)
            }
            None => Err(ParseError {
                message: format!("unknown relation '{}'", token),
                position: start,
            }),
        }
    }

    fn parse_rule(&mut self) -> Result<ComparisonRule, ParseError> {
        let left = self.parse_operand()?;
        let relation = self.parse_relation()?;
        let right = self.parse_operand()?;
        Ok(ComparisonRule {
            left,
            right,
            relation,
        })
    }

    fn parse_list(&mut self) -> Result<Vec<ComparisonRule>, ParseError> {
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            rules.push(self.parse_rule()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(';' | ',') => {
                    self.advance();
                }
                Some(ch) => {
                    return Err(ParseError {
                        message: format!("expected ';' or ',' between rules, found '{}'", ch),
                        position: self.pos,
                    });
                }
            }
        }
        Ok(rules)
    }
}

/// Parse a single comparison rule.
pub fn parse_rule(input: &str) -> Result<ComparisonRule, ParseError> {
    let mut parser = Parser::new(input);
    let rule = parser.parse_rule()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(ParseError {
            message: format!("unexpected input after rule: '{}'", parser.remaining()),
            position: parser.pos,
        });
    }
    Ok(rule)
}

/// Parse a `;`- or `,`-separated rule list. Blank input is an empty list.
pub fn parse_rules(input: &str) -> Result<Vec<ComparisonRule>, ParseError> {
    Parser::new(input).parse_list()
}
