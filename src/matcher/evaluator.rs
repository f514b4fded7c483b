//! Matcher evaluation against a message.

use super::compiler::MessageMatcher;
use super::node::{Combinator, MatchNode, NodeId, Operand, Relation, StringHeader, Target, ROOT};
use super::pattern;
use crate::codec::message::{Message, TypedValue, DEFAULT_SEVERITY};
use std::cmp::Ordering;

/// Value an unset `Pid` compares as; `Pid == NIL` tests for absence.
const ABSENT_PID: i32 = i32::MIN;

/// Read access to the parts of a message a matcher can test.
///
/// [`Message`] implements this directly; other record types can implement it
/// to be matched without conversion.
pub trait MatchSource {
    /// Value of a string header, or `None` when unset.
    fn string_header(&self, header: StringHeader) -> Option<&[u8]>;

    /// Severity, or `None` when unset.
    fn severity(&self) -> Option<i32>;

    fn pid(&self) -> Option<i32>;

    /// Nanoseconds since the Unix epoch.
    fn timestamp(&self) -> i64;

    /// Value at `Fields[name][field_index][array_index]`.
    fn lookup_field(
        &self,
        name: &[u8],
        field_index: usize,
        array_index: usize,
    ) -> Option<TypedValue<'_>>;
}

impl MatchSource for Message {
    fn string_header(&self, header: StringHeader) -> Option<&[u8]> {
        match header {
            StringHeader::Uuid => Some(&self.uuid[..]),
            StringHeader::Type => self.msg_type.as_deref(),
            StringHeader::Logger => self.logger.as_deref(),
            StringHeader::Payload => self.payload.as_deref(),
            StringHeader::EnvVersion => self.env_version.as_deref(),
            StringHeader::Hostname => self.hostname.as_deref(),
        }
    }

    fn severity(&self) -> Option<i32> {
        self.severity
    }

    fn pid(&self) -> Option<i32> {
        self.pid
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn lookup_field(
        &self,
        name: &[u8],
        field_index: usize,
        array_index: usize,
    ) -> Option<TypedValue<'_>> {
        self.fields
            .iter()
            .filter(|field| field.name.as_bytes() == name)
            .nth(field_index)?
            .value(array_index)
    }
}

impl MessageMatcher {
    /// Evaluate the matcher against a message.
    ///
    /// Combinators short-circuit: the right operand of `||` is skipped when
    /// the left is true and the right operand of `&&` when the left is false.
    pub fn evaluate<S: MatchSource + ?Sized>(&self, message: &S) -> bool {
        self.eval_node(ROOT, message)
    }

    fn eval_node<S: MatchSource + ?Sized>(&self, id: NodeId, message: &S) -> bool {
        let Some(node) = self.nodes.get(id as usize) else {
            return false;
        };
        match *node {
            MatchNode::Constant(value) => value,
            MatchNode::Combinator { op, left, right } => {
                let result = self.eval_node(left, message);
                match op {
                    Combinator::Or if result => true,
                    Combinator::And if !result => false,
                    _ => self.eval_node(right, message),
                }
            }
            MatchNode::Predicate {
                target,
                relation,
                operand,
            } => self.eval_predicate(target, relation, operand, message),
        }
    }

    fn eval_predicate<S: MatchSource + ?Sized>(
        &self,
        target: Target,
        relation: Relation,
        operand: Operand,
        message: &S,
    ) -> bool {
        match target {
            Target::String(header) => {
                let value = message.string_header(header);
                if operand == Operand::Nil {
                    return nil_test(value.is_some(), relation);
                }
                match value {
                    Some(value) => self.string_test(value, relation, operand),
                    None => absent_string_test(relation),
                }
            }
            Target::Severity => {
                let severity = message.severity().unwrap_or(DEFAULT_SEVERITY);
                numeric_test(f64::from(severity), relation, operand)
            }
            Target::Pid => {
                let pid = message.pid();
                if operand == Operand::Nil {
                    return nil_test(pid.is_some(), relation);
                }
                let pid = pid.unwrap_or(ABSENT_PID);
                numeric_test(f64::from(pid), relation, operand)
            }
            Target::Timestamp => numeric_test(message.timestamp() as f64, relation, operand),
            Target::Field {
                name,
                field_index,
                array_index,
            } => {
                let value = message.lookup_field(
                    self.string(name),
                    field_index as usize,
                    array_index as usize,
                );
                match (value, operand) {
                    (value, Operand::Nil) => nil_test(value.is_some(), relation),
                    (None, _) => false,
                    (Some(TypedValue::String(value)), _) => {
                        self.string_test(value, relation, operand)
                    }
                    (Some(TypedValue::Numeric(value)), Operand::Number(_)) => {
                        numeric_test(value, relation, operand)
                    }
                    (Some(TypedValue::Numeric(value)), Operand::Bool(expected)) => {
                        bool_test(value, expected, relation)
                    }
                    (Some(TypedValue::Bool(value)), Operand::Bool(expected)) => {
                        bool_test(if value { 1.0 } else { 0.0 }, expected, relation)
                    }
                    (Some(_), _) => false,
                }
            }
        }
    }

    fn string_test(&self, value: &[u8], relation: Relation, operand: Operand) -> bool {
        match operand {
            Operand::String(span) => compare(value.cmp(self.string(span)), relation),
            Operand::Pattern(span) => {
                let found = pattern::match_validated(value, self.string(span));
                found == (relation == Relation::Matches)
            }
            Operand::Substring(index) => {
                let found = self
                    .searchers
                    .get(index as usize)
                    .is_some_and(|searcher| searcher.is_match(value));
                found == (relation == Relation::Matches)
            }
            Operand::Number(_) | Operand::Bool(_) | Operand::Nil => false,
        }
    }
}

fn compare(ordering: Ordering, relation: Relation) -> bool {
    match relation {
        Relation::Eq => ordering == Ordering::Equal,
        Relation::Ne => ordering != Ordering::Equal,
        Relation::Gte => ordering != Ordering::Less,
        Relation::Gt => ordering == Ordering::Greater,
        Relation::Lte => ordering != Ordering::Greater,
        Relation::Lt => ordering == Ordering::Less,
        Relation::Matches | Relation::NotMatches => false,
    }
}

fn numeric_test(value: f64, relation: Relation, operand: Operand) -> bool {
    let Operand::Number(expected) = operand else {
        return false;
    };
    match relation {
        Relation::Eq => value == expected,
        Relation::Ne => value != expected,
        Relation::Gte => value >= expected,
        Relation::Gt => value > expected,
        Relation::Lte => value <= expected,
        Relation::Lt => value < expected,
        Relation::Matches | Relation::NotMatches => false,
    }
}

fn bool_test(value: f64, expected: bool, relation: Relation) -> bool {
    let expected = if expected { 1.0 } else { 0.0 };
    match relation {
        Relation::Eq => value == expected,
        Relation::Ne => value != expected,
        _ => false,
    }
}

/// `== NIL` holds when the value is absent, `!= NIL` when it is present.
fn nil_test(present: bool, relation: Relation) -> bool {
    match relation {
        Relation::Eq => !present,
        Relation::Ne => present,
        _ => false,
    }
}

/// An unset string header sorts before every value.
fn absent_string_test(relation: Relation) -> bool {
    matches!(
        relation,
        Relation::Ne | Relation::Lt | Relation::Lte | Relation::NotMatches
    )
}
