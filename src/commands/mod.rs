//! Chat command handling
//!
//! Platform adapters hand every guild message to the `CommandRouter`, which
//! parses prefixed commands, applies the channel gate and renders replies.

pub mod parser;
pub mod router;

pub use parser::{Command, CommandInvocation};
pub use router::{CommandRouter, RouterSettings};
