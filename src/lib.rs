//! Castellan: an authorization policy engine.
//!
//! The crate answers "may this subject perform this action on this resource?"
//! by matching declarative rules and resolving the matched effects. Around
//! that evaluator it provides:
//!
//! - [`delegation`]: temporary permission delegation between subjects, with
//!   validation against the delegator's own grants, expiry, revocation and
//!   cycle detection for transitive chains
//! - [`compiler`]: ahead-of-time compilation of a policy into a decision
//!   table and generated Rust source
//! - [`analysis`]: conflict, collision and unreachable-rule detection plus
//!   structural diffs between policy versions
//!
//! Storage is abstracted behind the repository traits in [`db`]; in-memory
//! implementations are provided for embedding and tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use castellan::{
//!     authz::{EffectResolver, PolicyEvaluator, RuleMatcher},
//!     models::{Action, Context, Effect, Policy, PolicyRule, Resource, Subject},
//! };
//!
//! let policy = Policy::new(vec![
//!     PolicyRule::new("user:*", "document:*", "read", Effect::Allow),
//!     PolicyRule::new("user:mallory", "document:*", "*", Effect::Deny),
//! ]);
//!
//! let evaluator = PolicyEvaluator::new(RuleMatcher::Acl, EffectResolver::DenyOverride);
//! let effect = evaluator.evaluate(
//!     &policy,
//!     &Subject::new("user:alice"),
//!     Some(&Resource::new("document:1", "document")),
//!     &Action::new("read"),
//!     &Context::new(),
//! );
//! assert_eq!(effect, Effect::Allow);
//! ```

pub mod analysis;
pub mod authz;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod db;
pub mod delegation;
pub mod models;
pub mod observability;
pub mod retention;
