//! Message matcher: compile a boolean expression once, evaluate it against
//! many messages.
//!
//! ## Architecture
//!
//! - **Compilation**: [`parser`] tokenizes and parses the expression, checking
//!   every operand against the variable it is compared to. [`compiler`]
//!   flattens the tree to postfix order and folds it into an index-addressed
//!   node arena with the root at node 0.
//! - **Evaluation**: [`MessageMatcher::evaluate`] walks the arena with
//!   short-circuit `&&`/`||`, reading values through [`MatchSource`].
//!
//! ## Expression language
//!
//! ```text
//! Type == 'TEST' && Severity <= 6
//! Payload =~ '^error: %d+' || Fields[status][0][1] >= 500
//! Fields[user] == NIL || Logger != 'cron'
//! Payload =~ 'exact text'%
//! Timestamp < '2015-04-11T17:30:26Z'
//! ```
//!
//! String variables are `Type`, `Logger`, `Hostname`, `EnvVersion`,
//! `Payload` and `Uuid`; numeric ones are `Severity` and `Pid`.

pub mod compiler;
pub mod evaluator;
pub mod node;
pub mod parser;
pub mod pattern;
pub mod timestamp;

pub use compiler::MessageMatcher;
pub use evaluator::MatchSource;
pub use node::{Combinator, MatchNode, NodeId, Operand, Relation, Span, StringHeader, Target};
pub use pattern::PatternError;
