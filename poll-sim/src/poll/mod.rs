//! The `Poll` subsystem (§2: "the hard part"). Each file under this module
//! is one `impl Poll` block grouping the operations of a single
//! responsibility — ingest, snapshot, the per-message state machine, the
//! batch driver, circuit-input assembly, tally, subsidy, and (de)serialize.

pub mod batch_processor;
pub mod circuit_inputs;
pub mod command_processor;
pub mod ingest;
pub mod json;
pub mod snapshot;
pub mod subsidy;
pub mod tally;

use crate::babyjubjub::Keypair;
use crate::config::PollParams;
use crate::domain::{Ballot, ICommand, Message, StateLeaf};
use crate::field::Fr;
use crate::hash::nothing_up_my_sleeve;
use crate::maci_state::MaciState;
use crate::merkle::IncrementalQuinTree;
use crate::salt::{CounterSaltSource, SaltSource};
use ark_ff::Zero;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub type PollId = u32;

pub struct Poll {
    pub poll_id: PollId,
    pub params: PollParams,
    pub(crate) maci_state: Weak<RefCell<MaciState>>,
    pub(crate) coordinator: Keypair,

    pub messages: Vec<Message>,
    pub enc_pub_keys: Vec<(Fr, Fr)>,
    pub commands: Vec<ICommand>,
    pub message_tree: IncrementalQuinTree,

    pub state_copied: bool,
    pub state_leaves: Vec<StateLeaf>,
    pub state_tree: IncrementalQuinTree,
    pub ballots: Vec<Ballot>,
    pub ballot_tree: IncrementalQuinTree,

    pub current_message_batch_index: usize,
    pub num_batches_processed: usize,
    pub sb_salts: HashMap<usize, Fr>,

    pub num_batches_tallied: usize,
    pub tally_result: Vec<Fr>,
    pub linear_tally_result: Vec<Fr>,
    pub per_vo_spent_voice_credits: Vec<Fr>,
    pub total_spent_voice_credits: Fr,
    pub tally_salts: HashMap<usize, (Fr, Fr, Fr)>,

    pub subsidy: Vec<Fr>,
    pub subsidy_rbi: usize,
    pub subsidy_cbi: usize,
    pub subsidy_salts: HashMap<String, Fr>,

    pub(crate) salt_source: Box<dyn SaltSource>,
}

impl Poll {
    pub(crate) fn new(
        poll_id: PollId,
        params: PollParams,
        maci_state: Weak<RefCell<MaciState>>,
        coordinator: Keypair,
    ) -> Self {
        let message_tree = IncrementalQuinTree::new(
            params.tree_depths.message_tree_depth,
            nothing_up_my_sleeve(),
        );
        let state_tree = IncrementalQuinTree::new(params.tree_depths.state_tree_depth, Fr::zero());
        let ballot_tree = IncrementalQuinTree::new(params.tree_depths.state_tree_depth, Fr::zero());
        let num_vote_options = crate::domain::ballot::num_vote_options(params.tree_depths.vote_option_tree_depth);

        Poll {
            poll_id,
            params,
            maci_state,
            coordinator,
            messages: Vec::new(),
            enc_pub_keys: Vec::new(),
            commands: Vec::new(),
            message_tree,
            state_copied: false,
            state_leaves: Vec::new(),
            state_tree,
            ballots: Vec::new(),
            ballot_tree,
            current_message_batch_index: 0,
            num_batches_processed: 0,
            sb_salts: HashMap::new(),
            num_batches_tallied: 0,
            tally_result: vec![Fr::zero(); num_vote_options],
            linear_tally_result: vec![Fr::zero(); num_vote_options],
            per_vo_spent_voice_credits: vec![Fr::zero(); num_vote_options],
            total_spent_voice_credits: Fr::zero(),
            tally_salts: HashMap::new(),
            subsidy: vec![Fr::zero(); num_vote_options],
            subsidy_rbi: 0,
            subsidy_cbi: 0,
            subsidy_salts: HashMap::new(),
            salt_source: Box::new(CounterSaltSource::new()),
        }
    }

    /// Swaps in a deterministic (or otherwise custom) salt source. Production
    /// callers leave the `CounterSaltSource` default only in tests; real use
    /// should install an `OsRngSaltSource` (§5).
    pub fn set_salt_source(&mut self, source: Box<dyn SaltSource>) {
        self.salt_source = source;
    }

    pub fn maci_state(&self) -> Rc<RefCell<MaciState>> {
        self.maci_state.upgrade().expect("Poll outlived its MaciState")
    }

    pub fn num_vote_options(&self) -> usize {
        self.tally_result.len()
    }

    fn next_salt(&mut self) -> Fr {
        self.salt_source.next_salt()
    }
}
