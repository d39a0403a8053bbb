//! Plain, `serde`-(de)serializable poll configuration (§3, §1 ambient
//! stack). There is no file loader here — the crate has no deployment
//! surface — but these structs are the contract a CLI or test harness
//! builds from JSON/TOML.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDepths {
    pub state_tree_depth: usize,
    pub message_tree_depth: usize,
    pub vote_option_tree_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSizes {
    pub message_batch_size: usize,
    pub tally_batch_size: usize,
    pub subsidy_batch_size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxValues {
    pub max_vote_options: usize,
    pub max_messages: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollParams {
    pub tree_depths: TreeDepths,
    pub batch_sizes: BatchSizes,
    pub max_values: MaxValues,
    pub poll_end_timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_params_round_trip_through_json() {
        let params = PollParams {
            tree_depths: TreeDepths { state_tree_depth: 10, message_tree_depth: 2, vote_option_tree_depth: 2 },
            batch_sizes: BatchSizes { message_batch_size: 5, tally_batch_size: 5, subsidy_batch_size: 2 },
            max_values: MaxValues { max_vote_options: 25, max_messages: 1000 },
            poll_end_timestamp: 1_700_000_000,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: PollParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
