//! Entity types the `Poll` state machine operates on (§3): state leaves,
//! ballots, messages, and the tagged command sum type that results from
//! decrypting one.

pub mod ballot;
pub mod command;
pub mod message;
pub mod state_leaf;

pub use ballot::Ballot;
pub use command::{ICommand, PCommand, TCommand};
pub use message::Message;
pub use state_leaf::StateLeaf;
