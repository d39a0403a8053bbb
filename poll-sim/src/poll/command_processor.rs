//! The per-message state machine (§4.3): validates one decrypted vote/
//! key-change command against `(stateLeaves[i], ballots[i])` and, on
//! success, returns the witness data the batch processor threads into the
//! circuit inputs.

use super::Poll;
use crate::domain::command::PCommand;
use crate::domain::{Ballot, StateLeaf};
use crate::error::ProcessMessageError;
use crate::field::{self, Fr};
use crate::merkle::MerklePath;

pub struct ProcessMessageWitness {
    pub state_leaf_index: usize,
    pub original_state_leaf: StateLeaf,
    pub new_state_leaf: StateLeaf,
    pub original_state_leaf_path: MerklePath,
    pub original_ballot: Ballot,
    pub new_ballot: Ballot,
    pub original_ballot_path: MerklePath,
    pub original_vote_weight: Fr,
    pub original_vote_weights_path: MerklePath,
    pub command: PCommand,
}

impl Poll {
    /// Ordered rejection rules; the first to trigger decides the error kind
    /// (§4.3). Does not mutate `self` — the caller (the batch processor)
    /// applies the returned witness's `new_state_leaf`/`new_ballot` once it
    /// has decided how to order the mutation relative to path capture.
    pub fn process_message(&self, command: &PCommand) -> Result<ProcessMessageWitness, ProcessMessageError> {
        let max_index = self.ballots.len().min(self.state_tree.next_index());
        let state_index = command.state_index as usize;
        if state_index < 1 || state_index >= max_index {
            log::debug!("poll {}: reject InvalidStateLeafIndex ({state_index})", self.poll_id);
            return Err(ProcessMessageError::InvalidStateLeafIndex);
        }

        let original_state_leaf = self.state_leaves[state_index];
        if !command.verify_signature(&original_state_leaf.pub_key) {
            log::debug!("poll {}: reject InvalidSignature (index {state_index})", self.poll_id);
            return Err(ProcessMessageError::InvalidSignature);
        }

        let original_ballot = self.ballots[state_index].clone();
        if Fr::from(command.nonce) != original_ballot.nonce + Fr::from(1u64) {
            log::debug!("poll {}: reject InvalidNonce (index {state_index})", self.poll_id);
            return Err(ProcessMessageError::InvalidNonce);
        }

        let vote_option_index = command.vote_option_index as usize;
        if vote_option_index >= self.params.max_values.max_vote_options {
            log::debug!("poll {}: reject InvalidVoteOptionIndex ({vote_option_index})", self.poll_id);
            return Err(ProcessMessageError::InvalidVoteOptionIndex);
        }

        let original_vote_weight = original_ballot.votes[vote_option_index];
        let credits_left = field::checked_credits_left(
            original_state_leaf.voice_credit_balance,
            original_vote_weight,
            command.new_vote_weight,
        )
        .ok_or_else(|| {
            log::debug!("poll {}: reject InsufficientVoiceCredits (index {state_index})", self.poll_id);
            ProcessMessageError::InsufficientVoiceCredits
        })?;

        let original_state_leaf_path = self
            .state_tree
            .gen_merkle_path(state_index)
            .expect("state_index validated above");
        let original_ballot_path = self
            .ballot_tree
            .gen_merkle_path(state_index)
            .expect("state_index validated above");
        let votes_tree = crate::domain::ballot::votes_tree(
            &original_ballot.votes,
            self.params.tree_depths.vote_option_tree_depth,
        );
        let original_vote_weights_path = votes_tree
            .gen_merkle_path(vote_option_index)
            .expect("vote_option_index validated above");

        let mut new_state_leaf = original_state_leaf;
        new_state_leaf.pub_key = crate::babyjubjub::PubKey(crate::babyjubjub::Point {
            x: command.new_pub_key.0,
            y: command.new_pub_key.1,
        });
        new_state_leaf.voice_credit_balance = credits_left;

        let mut new_ballot = original_ballot.clone();
        new_ballot.nonce = original_ballot.nonce + Fr::from(1u64);
        new_ballot.votes[vote_option_index] = command.new_vote_weight;

        Ok(ProcessMessageWitness {
            state_leaf_index: state_index,
            original_state_leaf,
            new_state_leaf,
            original_state_leaf_path,
            original_ballot,
            new_ballot,
            original_ballot_path,
            original_vote_weight,
            original_vote_weights_path,
            command: command.clone(),
        })
    }
}
