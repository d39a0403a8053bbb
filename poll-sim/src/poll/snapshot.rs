//! `copyStateFromMaci` (§4.2): the one-time deep copy of signup state into
//! a Poll, and the ballot tree grown to match it.

use super::Poll;
use crate::domain::Ballot;

impl Poll {
    /// Idempotent: later batches must not re-snapshot (§4.2).
    pub fn copy_state_from_maci(&mut self) {
        if self.state_copied {
            return;
        }
        let maci_state = self.maci_state();
        let maci_state = maci_state.borrow();

        self.state_leaves = maci_state.state_leaves.clone();
        self.state_tree = maci_state.state_tree.clone();
        drop(maci_state);

        let vote_option_tree_depth = self.params.tree_depths.vote_option_tree_depth;
        let empty_ballot = Ballot::blank(vote_option_tree_depth);
        let empty_hash = empty_ballot.hash(vote_option_tree_depth);
        self.ballot_tree = crate::merkle::IncrementalQuinTree::new(
            self.params.tree_depths.state_tree_depth,
            empty_hash,
        );
        self.ballots = Vec::with_capacity(self.state_leaves.len());
        for _ in 0..self.state_leaves.len() {
            self.ballot_tree.insert(empty_hash);
            self.ballots.push(empty_ballot.clone());
        }

        self.state_copied = true;
        log::debug!("poll {}: snapshotted {} state leaves from MaciState", self.poll_id, self.state_leaves.len());
    }
}

#[cfg(test)]
mod tests {
    use crate::babyjubjub::{Keypair, PrivKey};
    use crate::config::{BatchSizes, MaxValues, PollParams, TreeDepths};
    use crate::field::Fr;
    use crate::maci_state::MaciState;
    use num_bigint::BigUint;

    fn test_params() -> PollParams {
        PollParams {
            tree_depths: TreeDepths { state_tree_depth: 4, message_tree_depth: 2, vote_option_tree_depth: 2 },
            batch_sizes: BatchSizes { message_batch_size: 5, tally_batch_size: 5, subsidy_batch_size: 2 },
            max_values: MaxValues { max_vote_options: 25, max_messages: 100 },
            poll_end_timestamp: 0,
        }
    }

    #[test]
    fn snapshot_matches_signup_count_and_is_idempotent() {
        let state = MaciState::new(4);
        let voter = Keypair::from_priv_key(PrivKey(BigUint::from(1u32)));
        state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        let coordinator = Keypair::from_priv_key(PrivKey(BigUint::from(999u32)));
        let mut poll = MaciState::deploy_poll(&state, test_params(), coordinator);

        poll.copy_state_from_maci();
        assert_eq!(poll.state_leaves.len(), 2);
        assert_eq!(poll.ballots.len(), 2);
        assert_eq!(poll.ballot_tree.next_index(), 2);

        let root_before = poll.state_tree.root();
        poll.copy_state_from_maci();
        assert_eq!(poll.state_tree.root(), root_before);
    }
}
