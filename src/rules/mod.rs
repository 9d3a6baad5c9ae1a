//! Access rule core
//!
//! Subtree rules compiled from the content tree, the store holding the
//! active set, and the evaluator that answers access checks.
//!
//! ## Rule Model
//!
//! Each rule secures one subtree of the content tree: members of any denied
//! group who request a node at or below the secured root are redirected to
//! the rule's no-access page. When secured subtrees are nested, the rule of
//! the deepest secured ancestor governs:
//!
//! ```text
//! 1 ─ 10 (denies Guests) ─ 30 (denies Editors) ─ 55
//! ```
//!
//! A request for 55 is governed by the rule on 30 alone, so a member of
//! Guests is allowed there and a member of Editors is redirected.
//!
//! ## Reload
//!
//! ```text
//! content change → RuleCompiler::compile → RuleStore::replace → AccessEvaluator::check
//! ```

pub mod compiler;
pub mod coverage;
pub mod evaluator;
pub mod store;
pub mod types;

pub use compiler::RuleCompiler;
pub use coverage::{Coverage, coverage_for};
pub use evaluator::{AccessDecision, AccessEvaluator, evaluate};
pub use store::RuleStore;
pub use types::{Rule, RuleSnapshot};
