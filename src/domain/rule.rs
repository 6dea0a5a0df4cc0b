//! Comparison rule data structures.
//!
//! - `ComparisonElement`: an operand (raw column or indicator) with an
//!   optional look-back period
//! - `Relation`: the comparison applied elementwise
//! - `ComparisonRule`: `left relation right`

use crate::domain::column::Element;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonElement {
    pub element: Element,
    pub period: Option<usize>,
}

impl ComparisonElement {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            period: None,
        }
    }

    pub fn with_period(element: Element, period: usize) -> Self {
        Self {
            element,
            period: Some(period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Greater,
        Relation::GreaterEqual,
        Relation::Less,
        Relation::LessEqual,
        Relation::Equal,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Greater => ">",
            Relation::GreaterEqual => ">=",
            Relation::Less => "<",
            Relation::LessEqual => "<=",
            Relation::Equal => "==",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.symbol() == symbol)
    }

    /// Any comparison involving `NaN` is false.
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Relation::Greater => left > right,
            Relation::GreaterEqual => left >= right,
            Relation::Less => left < right,
            Relation::LessEqual => left <= right,
            Relation::Equal => left == right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonRule {
    pub left: ComparisonElement,
    pub right: ComparisonElement,
    pub relation: Relation,
}

impl fmt::Display for ComparisonElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Some(period) => write!(f, "{}({})", self.element, period),
            None => write!(f, "{}", self.element),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for ComparisonRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.relation, self.right)
    }
}
