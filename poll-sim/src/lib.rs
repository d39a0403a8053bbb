//! An off-chain MACI (Minimal Anti-Collusion Infrastructure) poll
//! simulator: a coordinator-side state machine that ingests published
//! votes, replays them batch by batch, and emits the tally/subsidy
//! witnesses a ZK-SNARK circuit would take as input. The cryptographic
//! adapters (`field`, `hash`, `babyjubjub`) are internally consistent
//! stand-ins for the BN254/Poseidon/Baby Jubjub primitives a production
//! deployment would use — see `DESIGN.md` for what is and isn't faithful.

pub mod babyjubjub;
pub mod config;
pub mod domain;
pub mod error;
pub mod field;
pub mod hash;
pub mod maci_state;
pub mod merkle;
pub mod poll;
pub mod salt;

pub use babyjubjub::{Keypair, PrivKey, PubKey, Signature};
pub use config::{BatchSizes, MaxValues, PollParams, TreeDepths};
pub use domain::{Ballot, ICommand, Message, PCommand, StateLeaf, TCommand};
pub use error::{MaciStateError, MerkleTreeError, ProcessMessageError};
pub use field::Fr;
pub use maci_state::MaciState;
pub use merkle::{IncrementalQuinTree, MerklePath};
pub use poll::{Poll, PollId};
pub use salt::{CounterSaltSource, OsRngSaltSource, SaltSource};
