//! The error taxonomy described in SPEC_FULL.md §7. Variants here are
//! recoverable, expected outcomes of caller-supplied data; genuine
//! programmer errors (a misaligned batch boundary, a lock double-acquire,
//! an unverifiable subroot path) are `assert!`/`panic!`, not `Result`s.

use thiserror::Error;

/// Ordered rejection rules for a single decrypted vote/key-change command
/// (§4.3). Variant order matches check order; callers must not rely on it
/// for anything besides display.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMessageError {
    #[error("state leaf index out of range")]
    InvalidStateLeafIndex,
    #[error("command signature does not verify against the state leaf's public key")]
    InvalidSignature,
    #[error("command nonce does not follow the ballot's current nonce")]
    InvalidNonce,
    #[error("vote option index out of range")]
    InvalidVoteOptionIndex,
    #[error("insufficient voice credits for the requested vote weight")]
    InsufficientVoiceCredits,
    #[error("failed to decrypt or otherwise apply the command")]
    FailedDecryption,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MerkleTreeError {
    #[error("leaf index {0} is out of bounds for this tree")]
    IndexOutOfBounds(usize),
    #[error("subroot range [{0}, {1}) is not a whole subtree of this tree's arity")]
    SubrootRangeInvalid(usize, usize),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MaciStateError {
    #[error("poll {0} cannot be processed while poll {1} holds the processing lock")]
    PollAlreadyProcessing(u32, u32),
}
