mod delegations;
mod policies;

pub use delegations::*;
pub use policies::*;
