//! Matcher compilation.
//!
//! The parsed expression is flattened depth-first into postfix order and the
//! postfix sequence is folded back into a binary tree stored in a single node
//! arena. Postfix item `k` of `n` lands at arena slot `n - 1 - k`, so the last
//! fold (the whole expression) is always node 0 and every child sits at a
//! higher index than its parent.

use super::node::{Combinator, MatchNode, NodeId, Operand, Span, Target, ROOT};
use super::parser::{self, Comparison, Expression, Literal, Subject, Variable};
use crate::config::MatcherConfig;
use crate::error::{HekaError, Result};
use aho_corasick::AhoCorasick;
use std::fmt;
use tracing::{debug, trace};

/// A compiled, immutable message matcher.
///
/// Cloning is cheap relative to compiling and the matcher can be shared
/// across threads for concurrent evaluation.
///
/// ```rust
/// use heka_matcher::{Message, MessageMatcher};
///
/// let matcher = MessageMatcher::compile("Type == 'TEST' && Severity <= 6")?;
/// let message = Message::default().with_type("TEST").with_severity(3);
/// assert!(matcher.evaluate(&message));
/// # Ok::<(), heka_matcher::HekaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MessageMatcher {
    expression: String,
    pub(crate) nodes: Vec<MatchNode>,
    pub(crate) strings: Vec<u8>,
    pub(crate) searchers: Vec<AhoCorasick>,
}

impl MessageMatcher {
    /// Compile an expression with the default limits.
    pub fn compile(expression: &str) -> Result<Self> {
        Self::compile_with_config(expression, &MatcherConfig::default())
    }

    pub fn compile_with_config(expression: &str, config: &MatcherConfig) -> Result<Self> {
        config.validate()?;
        let result = parser::parse(expression, config).and_then(|ast| {
            let postfix = flatten(&ast);
            let mut arena = Arena::default();
            let nodes = arena.fold(postfix)?;
            Ok(MessageMatcher {
                expression: expression.to_string(),
                nodes,
                strings: arena.strings,
                searchers: arena.searchers,
            })
        });

        match &result {
            Ok(matcher) => trace!(
                expression,
                nodes = matcher.nodes.len(),
                "compiled message matcher"
            ),
            Err(err) => debug!(expression, error = %err, "message matcher compilation failed"),
        }
        result
    }

    /// The source text this matcher was compiled from.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The node arena; node 0 is the root.
    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &MatchNode {
        &self.nodes[ROOT as usize]
    }

    /// Bytes a span refers to in this matcher's string pool.
    pub fn string(&self, span: Span) -> &[u8] {
        self.strings.get(span.range()).unwrap_or_default()
    }
}

impl fmt::Display for MessageMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// One step of a postfix walk.
#[derive(Debug)]
enum PostfixItem<'e> {
    Leaf(&'e Expression),
    Operator(Combinator),
}

/// Flatten an expression into postfix order: left operand, right operand,
/// then the combinator joining them.
fn flatten(expr: &Expression) -> Vec<PostfixItem<'_>> {
    enum Visit<'e> {
        Enter(&'e Expression),
        Exit(Combinator),
    }

    let mut out = Vec::with_capacity(expr.test_count() * 2);
    let mut pending = vec![Visit::Enter(expr)];
    while let Some(visit) = pending.pop() {
        match visit {
            Visit::Exit(op) => out.push(PostfixItem::Operator(op)),
            Visit::Enter(node) => {
                let (op, left, right) = match node {
                    Expression::Or(left, right) => (Combinator::Or, left, right),
                    Expression::And(left, right) => (Combinator::And, left, right),
                    Expression::Constant(_) | Expression::Comparison(_) => {
                        out.push(PostfixItem::Leaf(node));
                        continue;
                    }
                };
                pending.push(Visit::Exit(op));
                pending.push(Visit::Enter(right));
                pending.push(Visit::Enter(left));
            }
        }
    }
    out
}

#[derive(Default)]
struct Arena {
    strings: Vec<u8>,
    searchers: Vec<AhoCorasick>,
}

impl Arena {
    fn fold(&mut self, postfix: Vec<PostfixItem<'_>>) -> Result<Vec<MatchNode>> {
        let count = postfix.len();
        if count > NodeId::MAX as usize {
            return Err(HekaError::syntax(0, "expression is too large"));
        }
        let mut nodes = vec![MatchNode::Constant(false); count];
        let mut stack: Vec<NodeId> = Vec::with_capacity(count / 2 + 1);

        for (k, item) in postfix.into_iter().enumerate() {
            let slot = count - 1 - k;
            nodes[slot] = match item {
                PostfixItem::Leaf(expr) => self.leaf(expr)?,
                PostfixItem::Operator(op) => {
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(HekaError::syntax(0, "operator is missing an operand"));
                    };
                    MatchNode::Combinator { op, left, right }
                }
            };
            stack.push(slot as NodeId);
        }

        if stack != [ROOT] {
            return Err(HekaError::syntax(0, "unbalanced expression"));
        }
        Ok(nodes)
    }

    fn leaf(&mut self, expr: &Expression) -> Result<MatchNode> {
        let Comparison {
            subject,
            relation,
            literal,
        } = match expr {
            Expression::Constant(value) => return Ok(MatchNode::Constant(*value)),
            Expression::Comparison(comparison) => comparison,
            Expression::Or(..) | Expression::And(..) => {
                return Err(HekaError::syntax(0, "combinator in leaf position"))
            }
        };

        let target = match subject {
            Subject::Variable(Variable::String(header)) => Target::String(*header),
            Subject::Variable(Variable::Severity) => Target::Severity,
            Subject::Variable(Variable::Pid) => Target::Pid,
            Subject::Variable(Variable::Timestamp) => Target::Timestamp,
            Subject::Field {
                name,
                field_index,
                array_index,
            } => Target::Field {
                name: self.intern(name.as_bytes())?,
                field_index: *field_index,
                array_index: *array_index,
            },
        };

        let operand = match literal {
            Literal::String(value) => Operand::String(self.intern(value)?),
            Literal::Pattern(value) => Operand::Pattern(self.intern(value)?),
            Literal::Substring(needle) => Operand::Substring(self.searcher(needle)?),
            Literal::Number(n) => Operand::Number(*n),
            Literal::Bool(b) => Operand::Bool(*b),
            Literal::Nil => Operand::Nil,
        };

        Ok(MatchNode::Predicate {
            target,
            relation: *relation,
            operand,
        })
    }

    fn intern(&mut self, bytes: &[u8]) -> Result<Span> {
        let too_large = || HekaError::syntax(0, "expression strings are too large");
        let start = u32::try_from(self.strings.len()).map_err(|_| too_large())?;
        let len = u32::try_from(bytes.len()).map_err(|_| too_large())?;
        self.strings.extend_from_slice(bytes);
        Ok(Span { start, len })
    }

    fn searcher(&mut self, needle: &[u8]) -> Result<u16> {
        let searcher = AhoCorasick::new([needle]).map_err(|err| {
            HekaError::syntax(0, format!("can not build substring search: {}", err))
        })?;
        let index = u16::try_from(self.searchers.len())
            .map_err(|_| HekaError::syntax(0, "too many substring searches"))?;
        self.searchers.push(searcher);
        Ok(index)
    }
}
