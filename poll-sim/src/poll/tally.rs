//! `tallyVotes` (§4.6): sums votes and voice-credit squares batch by batch,
//! chained together the same way `processMessages` chains its sb-
//! commitments.

use super::Poll;
use crate::field::Fr;
use crate::hash::{hash3, hash_left_right, sha256_hash};
use crate::merkle::IncrementalQuinTree;
use ark_ff::Zero;
use num_bigint::BigUint;

pub struct TallyVotesWitness {
    pub start_index: usize,
    pub current_tally_commitment: Fr,
    pub new_tally_commitment: Fr,
    pub packed_vals: Fr,
    pub sb_commitment: Fr,
    pub input_hash: Fr,
}

impl Poll {
    pub fn has_untallied_ballots(&self) -> bool {
        self.num_batches_tallied * self.params.batch_sizes.tally_batch_size < self.ballots.len()
    }

    fn gen_results_commitment(&self, tally: &[Fr], salt: Fr) -> Fr {
        let root = tree_root(tally, self.params.tree_depths.vote_option_tree_depth);
        hash_left_right(root, salt)
    }

    fn gen_spent_voice_credit_subtotal_commitment(&self, total: Fr, salt: Fr) -> Fr {
        hash_left_right(total, salt)
    }

    fn gen_per_vo_commitment(&self, per_vo: &[Fr], salt: Fr) -> Fr {
        let root = tree_root(per_vo, self.params.tree_depths.vote_option_tree_depth);
        hash_left_right(root, salt)
    }

    fn sb_commitment(&self) -> Fr {
        let salt = *self.sb_salts.get(&self.current_message_batch_index).unwrap_or(&Fr::from(0u64));
        hash3([self.state_tree.root(), self.ballot_tree.root(), salt])
    }

    fn pack_tally_vals(&self, start_index: usize) -> Fr {
        let num_sign_ups = self.maci_state().borrow().num_sign_ups();
        let mut acc = BigUint::from(start_index as u64);
        acc += BigUint::from(num_sign_ups as u64) << 50;
        crate::field::biguint_to_fr(&acc)
    }

    pub fn tally_votes(&mut self) -> TallyVotesWitness {
        let batch_size = self.params.batch_sizes.tally_batch_size;
        let start = self.num_batches_tallied * batch_size;
        let is_first_batch = self.num_batches_tallied == 0;

        let (prior_results_salt, prior_per_vo_salt, prior_spent_salt) =
            self.tally_salts.get(&start).copied().unwrap_or((Fr::from(0u64), Fr::from(0u64), Fr::from(0u64)));

        let current_tally_commitment = if is_first_batch {
            Fr::from(0u64)
        } else {
            let results = self.gen_results_commitment(&self.tally_result, prior_results_salt);
            let per_vo = self.gen_per_vo_commitment(&self.per_vo_spent_voice_credits, prior_per_vo_salt);
            let spent = self.gen_spent_voice_credit_subtotal_commitment(self.total_spent_voice_credits, prior_spent_salt);
            hash3([results, per_vo, spent])
        };

        let end = (start + batch_size).min(self.ballots.len());
        for ballot in &self.ballots[start..end] {
            for (j, vote) in ballot.votes.iter().enumerate() {
                let vote = *vote;
                self.tally_result[j] += vote;
                self.linear_tally_result[j] += vote;
                let sq = vote * vote;
                self.per_vo_spent_voice_credits[j] += sq;
                self.total_spent_voice_credits += sq;
            }
        }

        let new_results_salt = self.next_salt();
        let new_per_vo_salt = self.next_salt();
        let new_spent_salt = self.next_salt();
        self.tally_salts.insert(start + batch_size, (new_results_salt, new_per_vo_salt, new_spent_salt));

        let new_results_commitment = self.gen_results_commitment(&self.tally_result, new_results_salt);
        let new_per_vo_commitment = self.gen_per_vo_commitment(&self.per_vo_spent_voice_credits, new_per_vo_salt);
        let new_spent_commitment =
            self.gen_spent_voice_credit_subtotal_commitment(self.total_spent_voice_credits, new_spent_salt);
        let new_tally_commitment = hash3([new_results_commitment, new_per_vo_commitment, new_spent_commitment]);

        let sb_commitment = self.sb_commitment();
        let packed_vals = self.pack_tally_vals(start);
        let input_hash = sha256_hash(&[packed_vals, sb_commitment, current_tally_commitment, new_tally_commitment]);

        self.num_batches_tallied += 1;
        log::debug!("poll {}: tallied batch starting at {start}", self.poll_id);

        TallyVotesWitness {
            start_index: start,
            current_tally_commitment,
            new_tally_commitment,
            packed_vals,
            sb_commitment,
            input_hash,
        }
    }
}

pub(crate) fn tree_root(values: &[Fr], depth: usize) -> Fr {
    let mut tree = IncrementalQuinTree::new(depth, Fr::zero());
    for value in values {
        tree.insert(*value);
    }
    tree.root()
}
