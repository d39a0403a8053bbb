//! Partial `ProcessMessages` circuit input assembly (§4.5): right-padding,
//! message-subroot extraction, and the packed small-values word.

use super::Poll;
use crate::domain::{ICommand, Message};
use crate::field::Fr;
use crate::hash::hash3;
use crate::merkle::MerklePath;
use num_bigint::BigUint;

pub struct PartialCircuitInputs {
    pub messages: Vec<Message>,
    pub commands: Vec<ICommand>,
    pub enc_pub_keys: Vec<(Fr, Fr)>,
    pub message_subroot: Fr,
    pub message_subroot_path: MerklePath,
    pub batch_end_index: usize,
    pub packed_vals: Fr,
    pub current_sb_commitment: Fr,
}

impl Poll {
    /// `packedVals = maxVoteOptions | (numSignUps << 50) | (index << 100) |
    /// (batchEndIndex << 150)` (§4.5).
    pub(crate) fn pack_process_message_vals(&self, index: usize, batch_end_index: usize) -> Fr {
        let num_sign_ups = self.maci_state().borrow().num_sign_ups();
        let mut acc = BigUint::from(self.params.max_values.max_vote_options as u64);
        acc += BigUint::from(num_sign_ups as u64) << 50;
        acc += BigUint::from(index as u64) << 100;
        acc += BigUint::from(batch_end_index as u64) << 150;
        crate::field::biguint_to_fr(&acc)
    }

    pub fn current_sb_commitment(&self) -> Fr {
        let salt = *self.sb_salts.get(&self.current_message_batch_index).unwrap_or(&Fr::from(0u64));
        hash3([self.state_tree.root(), self.ballot_tree.root(), salt])
    }

    pub fn gen_partial_circuit_inputs(&mut self, index: usize) -> PartialCircuitInputs {
        let batch_size = self.params.batch_sizes.message_batch_size;

        let messages = pad_to_batch(&self.messages, batch_size, index);
        let commands = pad_to_batch(&self.commands, batch_size, index);
        let enc_pub_keys = pad_to_batch(&self.enc_pub_keys, batch_size, index);

        while self.message_tree.next_index() < index + batch_size {
            self.message_tree.insert(self.message_tree.zero_value());
        }

        let (message_subroot, message_subroot_path) = self
            .message_tree
            .gen_merkle_subroot_path(index, index + batch_size)
            .expect("batch boundaries are always tree-aligned by construction");
        assert!(
            self.message_tree.verify_merkle_path(message_subroot, &message_subroot_path),
            "message subroot path failed to verify against its own tree"
        );

        let batch_end_index = (index + batch_size).min(self.messages.len());
        let packed_vals = self.pack_process_message_vals(index, batch_end_index);
        let current_sb_commitment = self.current_sb_commitment();

        PartialCircuitInputs {
            messages,
            commands,
            enc_pub_keys,
            message_subroot,
            message_subroot_path,
            batch_end_index,
            packed_vals,
            current_sb_commitment,
        }
    }
}

fn pad_to_batch<T: Clone>(items: &[T], batch_size: usize, index: usize) -> Vec<T> {
    let end = index + batch_size;
    let mut padded = items.to_vec();
    if let Some(last) = items.last().cloned() {
        while padded.len() < end {
            padded.push(last.clone());
        }
    }
    padded[index.min(padded.len())..end.min(padded.len())].to_vec()
}
