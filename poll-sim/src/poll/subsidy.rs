//! The subsidy engine (§4.7): walks the strictly-upper triangular grid of
//! batch-blocks over ballots, computing a tie-aware coefficient per pair
//! that dampens identical voting patterns.

use super::tally::tree_root;
use super::Poll;
use crate::domain::Ballot;
use crate::field::{self, Fr};
use crate::hash::{hash3, hash_left_right, sha256_hash};
use num_bigint::BigUint;

const MM: u64 = 50;
const WW: u32 = 4;

pub struct SubsidyWitness {
    pub rbi: usize,
    pub cbi: usize,
    pub current_subsidy_commitment: Fr,
    pub new_subsidy_commitment: Fr,
    pub input_hash: Fr,
}

impl Poll {
    pub fn has_unfinished_subsidy_calculation(&self) -> bool {
        let bs = self.params.batch_sizes.subsidy_batch_size;
        self.subsidy_rbi * bs < self.ballots.len() && self.subsidy_cbi * bs < self.ballots.len()
    }

    fn num_subsidy_batches(&self) -> usize {
        let bs = self.params.batch_sizes.subsidy_batch_size;
        (self.ballots.len() + bs - 1) / bs
    }

    fn previous_subsidy_key(&self) -> String {
        if self.subsidy_rbi == 0 && self.subsidy_cbi == 0 {
            return "0-0".to_string();
        }
        if self.subsidy_cbi > self.subsidy_rbi {
            format!("{}-{}", self.subsidy_rbi, self.subsidy_cbi - 1)
        } else {
            // Open question (§9): the reference wraps `cbi` to
            // `numBatches - 1` here rather than `rbi` on a row change.
            format!("{}-{}", self.subsidy_rbi - 1, self.num_subsidy_batches() - 1)
        }
    }

    fn ballot_block(&self, block_index: usize) -> Vec<Ballot> {
        let bs = self.params.batch_sizes.subsidy_batch_size;
        let start = block_index * bs;
        let vote_option_tree_depth = self.params.tree_depths.vote_option_tree_depth;
        let mut block = Vec::with_capacity(bs);
        for i in 0..bs {
            block.push(self.ballots.get(start + i).cloned().unwrap_or_else(|| Ballot::blank(vote_option_tree_depth)));
        }
        block
    }

    fn subsidy_commitment(&self, salt: Fr) -> Fr {
        let root = tree_root(&self.subsidy, self.params.tree_depths.vote_option_tree_depth);
        hash_left_right(root, salt)
    }

    fn subsidy_sb_commitment(&self) -> Fr {
        let salt = *self.sb_salts.get(&self.current_message_batch_index).unwrap_or(&Fr::from(0u64));
        hash3([self.state_tree.root(), self.ballot_tree.root(), salt])
    }

    fn pack_subsidy_vals(&self, rbi: usize, cbi: usize) -> Fr {
        let num_sign_ups = self.maci_state().borrow().num_sign_ups();
        let mut acc = BigUint::from(rbi as u64);
        acc += BigUint::from(cbi as u64) << 50;
        acc += BigUint::from(num_sign_ups as u64) << 100;
        field::biguint_to_fr(&acc)
    }

    /// One row/column batch-block of the triangular walk (§4.7).
    pub fn compute_subsidy(&mut self) -> SubsidyWitness {
        let rbi = self.subsidy_rbi;
        let cbi = self.subsidy_cbi;
        let is_first_call = rbi == 0 && cbi == 0 && !self.subsidy_salts.contains_key("0-0");

        let previous_key = self.previous_subsidy_key();
        let previous_salt = *self.subsidy_salts.get(&previous_key).unwrap_or(&Fr::from(0u64));
        let current_subsidy_commitment =
            if is_first_call { Fr::from(0u64) } else { self.subsidy_commitment(previous_salt) };

        let row = self.ballot_block(rbi);
        let col = self.ballot_block(cbi);
        let num_vote_options = self.num_vote_options();
        let mut accum = vec![BigUint::from(0u32); num_vote_options];

        let bs = self.params.batch_sizes.subsidy_batch_size;
        for i in 0..bs {
            for j in 0..bs {
                if rbi == cbi && i >= j {
                    continue;
                }
                let v_i: Vec<BigUint> = row[i].votes.iter().map(field::fr_to_biguint).collect();
                let v_j: Vec<BigUint> = col[j].votes.iter().map(field::fr_to_biguint).collect();
                let dot: BigUint = v_i
                    .iter()
                    .zip(v_j.iter())
                    .fold(BigUint::from(0u32), |acc, (a, b)| acc + a * b);
                let denominator = BigUint::from(MM) + &dot;
                let numerator = BigUint::from(MM) * BigUint::from(10u64).pow(WW);
                let k_ij = &numerator / &denominator;
                for p in 0..num_vote_options {
                    accum[p] += BigUint::from(2u32) * &k_ij * &v_i[p] * &v_j[p];
                }
            }
        }

        for (p, slot) in self.subsidy.iter_mut().enumerate() {
            *slot += field::biguint_to_fr(&accum[p]);
        }

        let new_salt = self.next_salt();
        let key = format!("{rbi}-{cbi}");
        self.subsidy_salts.insert(key, new_salt);
        let new_subsidy_commitment = self.subsidy_commitment(new_salt);

        let sb_commitment = self.subsidy_sb_commitment();
        let packed_vals = self.pack_subsidy_vals(rbi, cbi);
        let input_hash = sha256_hash(&[packed_vals, sb_commitment, current_subsidy_commitment, new_subsidy_commitment]);

        let ballots_len = self.ballots.len();
        if (cbi + 1) * bs < ballots_len {
            self.subsidy_cbi += 1;
        } else {
            self.subsidy_rbi += 1;
            self.subsidy_cbi = self.subsidy_rbi;
        }

        log::debug!("poll {}: subsidy block ({rbi}, {cbi}) done", self.poll_id);

        SubsidyWitness { rbi, cbi, current_subsidy_commitment, new_subsidy_commitment, input_hash }
    }
}
