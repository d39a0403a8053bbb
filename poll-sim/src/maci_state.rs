//! The minimal signup/poll registry described in §4.9 — enough to exercise
//! `Poll` in isolation, nothing resembling a contract ABI.

use crate::babyjubjub::{Keypair, PubKey};
use crate::config::PollParams;
use crate::domain::StateLeaf;
use crate::error::MaciStateError;
use crate::field::Fr;
use crate::merkle::IncrementalQuinTree;
use crate::poll::{Poll, PollId};
use ark_ff::Zero;
use std::cell::RefCell;
use std::rc::Rc;

pub struct MaciState {
    pub state_tree_depth: usize,
    pub state_leaves: Vec<StateLeaf>,
    pub state_tree: IncrementalQuinTree,
    pub poll_being_processed: bool,
    pub current_poll_being_processed: Option<PollId>,
    next_poll_id: PollId,
}

impl MaciState {
    pub fn new(state_tree_depth: usize) -> Rc<RefCell<Self>> {
        let mut state_tree = IncrementalQuinTree::new(state_tree_depth, Fr::zero());
        let blank = StateLeaf::blank();
        state_tree.insert(blank.hash());
        Rc::new(RefCell::new(MaciState {
            state_tree_depth,
            state_leaves: vec![blank],
            state_tree,
            poll_being_processed: false,
            current_poll_being_processed: None,
            next_poll_id: 0,
        }))
    }

    pub fn sign_up(&mut self, pub_key: PubKey, initial_voice_credit_balance: Fr, timestamp: Fr) -> usize {
        let leaf = StateLeaf::new(pub_key, initial_voice_credit_balance, timestamp);
        let index = self.state_leaves.len();
        self.state_tree.insert(leaf.hash());
        self.state_leaves.push(leaf);
        log::debug!("sign_up: state index {index}");
        index
    }

    /// Excludes the index-0 blank sentinel, matching the circuits'
    /// `numSignUps` input.
    pub fn num_sign_ups(&self) -> usize {
        self.state_leaves.len() - 1
    }

    /// Registers a new `Poll` against this `MaciState` and returns it,
    /// holding a non-owning back-reference for lock acquisition and signup
    /// reads (§3: "Ownership").
    pub fn deploy_poll(state: &Rc<RefCell<MaciState>>, params: PollParams, coordinator: Keypair) -> Poll {
        let poll_id = {
            let mut borrowed = state.borrow_mut();
            let poll_id = borrowed.next_poll_id;
            borrowed.next_poll_id += 1;
            poll_id
        };
        log::debug!("deploy_poll: poll {poll_id}");
        Poll::new(poll_id, params, Rc::downgrade(state), coordinator)
    }

    pub fn acquire_poll_lock(&mut self, poll_id: PollId) -> Result<(), MaciStateError> {
        if self.poll_being_processed {
            let holder = self.current_poll_being_processed.unwrap_or(poll_id);
            if holder != poll_id {
                return Err(MaciStateError::PollAlreadyProcessing(poll_id, holder));
            }
            return Ok(());
        }
        self.poll_being_processed = true;
        self.current_poll_being_processed = Some(poll_id);
        log::debug!("poll {poll_id} acquired the processing lock");
        Ok(())
    }

    pub fn release_poll_lock(&mut self, poll_id: PollId) {
        if self.current_poll_being_processed == Some(poll_id) {
            self.poll_being_processed = false;
            self.current_poll_being_processed = None;
            log::debug!("poll {poll_id} released the processing lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::babyjubjub::PrivKey;
    use num_bigint::BigUint;

    #[test]
    fn sign_up_excludes_blank_sentinel_from_num_sign_ups() {
        let state = MaciState::new(10);
        assert_eq!(state.borrow().num_sign_ups(), 0);
        let keypair = Keypair::from_priv_key(PrivKey(BigUint::from(1u32)));
        state.borrow_mut().sign_up(keypair.pub_key, Fr::from(100u64), Fr::zero());
        assert_eq!(state.borrow().num_sign_ups(), 1);
    }

    #[test]
    fn lock_rejects_a_second_poll() {
        let state = MaciState::new(10);
        state.borrow_mut().acquire_poll_lock(0).unwrap();
        let err = state.borrow_mut().acquire_poll_lock(1).unwrap_err();
        assert_eq!(err, MaciStateError::PollAlreadyProcessing(1, 0));
    }
}
