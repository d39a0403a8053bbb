//! `processMessages` (§4.4): drives the command state machine in reverse
//! over fixed-size batches, maintaining the hash-chained sb-commitment
//! transcript that ties batches together.

use super::circuit_inputs::PartialCircuitInputs;
use super::Poll;
use crate::domain::{Ballot, ICommand, StateLeaf};
use crate::error::MaciStateError;
use crate::field::Fr;
use crate::hash::{hash3, hash_left_right, sha256_hash};
use crate::merkle::MerklePath;
use std::collections::VecDeque;

pub struct ProcessMessagesWitness {
    pub current_message_batch_index: usize,
    pub current_state_leaves: Vec<StateLeaf>,
    pub current_state_leaves_path: Vec<MerklePath>,
    pub current_ballots: Vec<Ballot>,
    pub current_ballots_path: Vec<MerklePath>,
    pub current_vote_weights: Vec<Fr>,
    pub current_vote_weights_path: Vec<MerklePath>,
    pub partial: PartialCircuitInputs,
    pub new_sb_commitment: Fr,
    pub input_hash: Fr,
}

impl Poll {
    /// `totalBatches`: see the open question on this quirk (§9) — a poll
    /// with zero messages still claims one (empty) batch.
    pub fn total_message_batches(&self) -> usize {
        let batch_size = self.params.batch_sizes.message_batch_size;
        let len = self.messages.len();
        let mut total = len / batch_size;
        if len % batch_size > 0 {
            total += 1;
        }
        if total == 0 {
            total = 1;
        }
        total
    }

    pub fn has_unprocessed_messages(&self) -> bool {
        self.num_batches_processed < self.total_message_batches()
    }

    fn coordinator_pub_key_hash(&self) -> Fr {
        hash_left_right(self.coordinator.pub_key.0.x, self.coordinator.pub_key.0.y)
    }

    /// Processes exactly one batch, in reverse order, as described in §4.4.
    /// Fails fast (without mutating anything) if another poll holds the
    /// processing lock.
    pub fn process_messages(&mut self) -> Result<ProcessMessagesWitness, MaciStateError> {
        let batch_size = self.params.batch_sizes.message_batch_size;

        if self.num_batches_processed == 0 {
            self.maci_state().borrow_mut().acquire_poll_lock(self.poll_id)?;
            let len = self.messages.len();
            self.current_message_batch_index = if len == 0 {
                0
            } else {
                let r = len % batch_size;
                len - if r == 0 { batch_size } else { r }
            };
            self.copy_state_from_maci();
            self.sb_salts.insert(self.current_message_batch_index, Fr::from(0u64));
        } else {
            match self.maci_state().borrow().current_poll_being_processed {
                Some(holder) if holder != self.poll_id => {
                    return Err(MaciStateError::PollAlreadyProcessing(self.poll_id, holder));
                }
                _ => {}
            }
        }

        assert_eq!(
            self.current_message_batch_index % batch_size,
            0,
            "currentMessageBatchIndex must stay aligned to the batch size"
        );

        let mut current_state_leaves = VecDeque::new();
        let mut current_state_leaves_path = VecDeque::new();
        let mut current_ballots = VecDeque::new();
        let mut current_ballots_path = VecDeque::new();
        let mut current_vote_weights = VecDeque::new();
        let mut current_vote_weights_path = VecDeque::new();

        for i in 0..batch_size {
            let idx = self.current_message_batch_index + batch_size - 1 - i;
            if idx >= self.messages.len() {
                self.push_blank_placeholder(
                    &mut current_state_leaves,
                    &mut current_state_leaves_path,
                    &mut current_ballots,
                    &mut current_ballots_path,
                    &mut current_vote_weights,
                    &mut current_vote_weights_path,
                );
                continue;
            }

            match &self.commands[idx] {
                ICommand::P(command) => {
                    let command = command.clone();
                    match self.process_message(&command) {
                        Ok(witness) => {
                            current_state_leaves.push_front(witness.original_state_leaf);
                            current_state_leaves_path.push_front(witness.original_state_leaf_path);
                            current_ballots.push_front(witness.original_ballot);
                            current_ballots_path.push_front(witness.original_ballot_path);
                            current_vote_weights.push_front(witness.original_vote_weight);
                            current_vote_weights_path.push_front(witness.original_vote_weights_path);

                            self.state_leaves[witness.state_leaf_index] = witness.new_state_leaf;
                            self.state_tree
                                .update(witness.state_leaf_index, witness.new_state_leaf.hash())
                                .expect("state_leaf_index was validated by process_message");
                            let vote_option_tree_depth = self.params.tree_depths.vote_option_tree_depth;
                            self.ballot_tree
                                .update(witness.state_leaf_index, witness.new_ballot.hash(vote_option_tree_depth))
                                .expect("state_leaf_index was validated by process_message");
                            self.ballots[witness.state_leaf_index] = witness.new_ballot;
                        }
                        Err(_) => {
                            self.push_blank_placeholder(
                                &mut current_state_leaves,
                                &mut current_state_leaves_path,
                                &mut current_ballots,
                                &mut current_ballots_path,
                                &mut current_vote_weights,
                                &mut current_vote_weights_path,
                            );
                        }
                    }
                }
                ICommand::T(command) => {
                    let command = *command;
                    let si = if command.state_index as usize >= self.ballots.len() {
                        0
                    } else {
                        command.state_index as usize
                    };
                    let amount = if command.state_index as usize >= self.ballots.len() {
                        Fr::from(0u64)
                    } else {
                        command.amount
                    };

                    let original_state_leaf = self.state_leaves[si];
                    let original_state_leaf_path = self
                        .state_tree
                        .gen_merkle_path(si)
                        .expect("si is always a valid state index");
                    let original_ballot = self.ballots[si].clone();
                    let original_ballot_path = self
                        .ballot_tree
                        .gen_merkle_path(si)
                        .expect("si is always a valid ballot index");
                    let votes_tree = crate::domain::ballot::votes_tree(
                        &original_ballot.votes,
                        self.params.tree_depths.vote_option_tree_depth,
                    );
                    let original_vote_weight = original_ballot.votes[0];
                    let original_vote_weights_path =
                        votes_tree.gen_merkle_path(0).expect("index 0 always exists");

                    current_state_leaves.push_front(original_state_leaf);
                    current_state_leaves_path.push_front(original_state_leaf_path);
                    current_ballots.push_front(original_ballot);
                    current_ballots_path.push_front(original_ballot_path);
                    current_vote_weights.push_front(original_vote_weight);
                    current_vote_weights_path.push_front(original_vote_weights_path);

                    let mut new_leaf = original_state_leaf;
                    new_leaf.voice_credit_balance += amount;
                    self.state_leaves[si] = new_leaf;
                    self.state_tree.update(si, new_leaf.hash()).expect("si validated above");
                }
                ICommand::Blank => {}
            }
        }

        let partial = self.gen_partial_circuit_inputs(self.current_message_batch_index);

        self.num_batches_processed += 1;
        if self.current_message_batch_index > 0 {
            self.current_message_batch_index -= batch_size;
        }

        let old_salt = *self.sb_salts.get(&self.current_message_batch_index).unwrap_or(&Fr::from(0u64));
        let mut new_sb_salt = self.next_salt();
        while new_sb_salt == old_salt {
            new_sb_salt = self.next_salt();
        }
        self.sb_salts.insert(self.current_message_batch_index, new_sb_salt);

        let new_sb_commitment = hash3([self.state_tree.root(), self.ballot_tree.root(), new_sb_salt]);
        let poll_end_timestamp = Fr::from(self.params.poll_end_timestamp);
        let input_hash = sha256_hash(&[
            partial.packed_vals,
            self.coordinator_pub_key_hash(),
            self.message_tree.root(),
            partial.current_sb_commitment,
            new_sb_commitment,
            poll_end_timestamp,
        ]);

        if self.num_batches_processed * batch_size >= self.messages.len() {
            self.maci_state().borrow_mut().release_poll_lock(self.poll_id);
        }

        log::debug!(
            "poll {}: processed batch {} ({} remaining)",
            self.poll_id,
            self.num_batches_processed,
            self.messages.len().saturating_sub(self.num_batches_processed * batch_size)
        );

        Ok(ProcessMessagesWitness {
            current_message_batch_index: self.current_message_batch_index,
            current_state_leaves: current_state_leaves.into(),
            current_state_leaves_path: current_state_leaves_path.into(),
            current_ballots: current_ballots.into(),
            current_ballots_path: current_ballots_path.into(),
            current_vote_weights: current_vote_weights.into(),
            current_vote_weights_path: current_vote_weights_path.into(),
            partial,
            new_sb_commitment,
            input_hash,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn push_blank_placeholder(
        &self,
        current_state_leaves: &mut VecDeque<StateLeaf>,
        current_state_leaves_path: &mut VecDeque<MerklePath>,
        current_ballots: &mut VecDeque<Ballot>,
        current_ballots_path: &mut VecDeque<MerklePath>,
        current_vote_weights: &mut VecDeque<Fr>,
        current_vote_weights_path: &mut VecDeque<MerklePath>,
    ) {
        current_state_leaves.push_front(self.state_leaves[0]);
        current_state_leaves_path
            .push_front(self.state_tree.gen_merkle_path(0).expect("index 0 always exists"));
        current_ballots.push_front(self.ballots[0].clone());
        current_ballots_path
            .push_front(self.ballot_tree.gen_merkle_path(0).expect("index 0 always exists"));
        current_vote_weights.push_front(Fr::from(0u64));
        let votes_tree = crate::domain::ballot::votes_tree(
            &self.ballots[0].votes,
            self.params.tree_depths.vote_option_tree_depth,
        );
        current_vote_weights_path.push_front(votes_tree.gen_merkle_path(0).expect("index 0 always exists"));
    }
}
