//! Compiled matcher node types.
//!
//! A compiled expression is a flat `Vec<MatchNode>` addressed by [`NodeId`];
//! the root is always node 0. String payloads (field names and literals) live
//! in one byte pool owned by the matcher and are referenced by [`Span`].

use std::fmt;

/// Index of a node within its matcher.
pub type NodeId = u16;

/// Root of every compiled expression.
pub const ROOT: NodeId = 0;

/// A byte range within the matcher's string pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub fn range(self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn symbol(self) -> &'static str {
        match self {
            Combinator::And => "&&",
            Combinator::Or => "||",
        }
    }
}

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Gte,
    Gt,
    Lte,
    Lt,
    Matches,
    NotMatches,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::Ne => "!=",
            Relation::Gte => ">=",
            Relation::Gt => ">",
            Relation::Lte => "<=",
            Relation::Lt => "<",
            Relation::Matches => "=~",
            Relation::NotMatches => "!~",
        }
    }

    pub fn is_pattern(self) -> bool {
        matches!(self, Relation::Matches | Relation::NotMatches)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Relation::Eq | Relation::Ne)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Header fields whose values are byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringHeader {
    Uuid,
    Type,
    Logger,
    Payload,
    EnvVersion,
    Hostname,
}

impl StringHeader {
    pub fn name(self) -> &'static str {
        match self {
            StringHeader::Uuid => "Uuid",
            StringHeader::Type => "Type",
            StringHeader::Logger => "Logger",
            StringHeader::Payload => "Payload",
            StringHeader::EnvVersion => "EnvVersion",
            StringHeader::Hostname => "Hostname",
        }
    }
}

/// What a predicate reads from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    String(StringHeader),
    Severity,
    Pid,
    Timestamp,
    Field {
        name: Span,
        field_index: u16,
        array_index: u16,
    },
}

/// The right-hand side of a predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    String(Span),
    /// A validated pattern for `=~`/`!~`.
    Pattern(Span),
    /// A literal substring for `=~`/`!~`, searched with the matcher's
    /// precompiled searcher at this index.
    Substring(u16),
    Number(f64),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchNode {
    Constant(bool),
    Combinator {
        op: Combinator,
        left: NodeId,
        right: NodeId,
    },
    Predicate {
        target: Target,
        relation: Relation,
        operand: Operand,
    },
}

impl MatchNode {
    pub fn is_leaf(&self) -> bool {
        !matches!(self, MatchNode::Combinator { .. })
    }
}
