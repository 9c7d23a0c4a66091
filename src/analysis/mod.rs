//! Static inspection of policies before deployment.
//!
//! - [`detect_conflicts`]: allow/deny conflicts on the same
//!   (subject, resource, action) triple, priority collisions, and allows
//!   made unreachable by a higher-priority deny
//! - [`diff`]: structural comparison of two policy versions by rule
//!   signature
//!
//! Analysis never fails and never modifies its input.

mod conflicts;
mod diff;

pub use conflicts::{
    AllowDenyConflict, ConflictReport, PriorityCollision, UnreachableRule, detect_conflicts,
};
pub use diff::{PolicyDiff, diff};
