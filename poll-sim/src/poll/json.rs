//! Deep clone, structural equality, and the stable JSON layout (§4.8, §6).
//! Trees are rebuilt from their leaves on load rather than serialized
//! directly — they are derived data, not part of the wire format.

use super::Poll;
use crate::babyjubjub::{self, PubKey, Signature};
use crate::domain::command::{PCommand, TCommand};
use crate::domain::message::MESSAGE_DATA_LEN;
use crate::domain::{Ballot, ICommand, Message, StateLeaf};
use crate::field::{self, Fr};
use crate::salt::CounterSaltSource;
use num_bigint::BigUint;
use serde_json::{json, Value};
use std::rc::Weak;

impl Poll {
    /// A deep clone: every tree, array, and salt table is copied. The salt
    /// source itself is reset to a fresh deterministic counter — RNG state
    /// is not meaningfully part of a Poll's data (§4.8 grounding: copies
    /// share no mutable state with the original).
    pub fn copy(&self) -> Poll {
        Poll {
            poll_id: self.poll_id,
            params: self.params,
            maci_state: Weak::clone(&self.maci_state),
            coordinator: self.coordinator.clone(),
            messages: self.messages.clone(),
            enc_pub_keys: self.enc_pub_keys.clone(),
            commands: self.commands.clone(),
            message_tree: self.message_tree.clone(),
            state_copied: self.state_copied,
            state_leaves: self.state_leaves.clone(),
            state_tree: self.state_tree.clone(),
            ballots: self.ballots.clone(),
            ballot_tree: self.ballot_tree.clone(),
            current_message_batch_index: self.current_message_batch_index,
            num_batches_processed: self.num_batches_processed,
            sb_salts: self.sb_salts.clone(),
            num_batches_tallied: self.num_batches_tallied,
            tally_result: self.tally_result.clone(),
            linear_tally_result: self.linear_tally_result.clone(),
            per_vo_spent_voice_credits: self.per_vo_spent_voice_credits.clone(),
            total_spent_voice_credits: self.total_spent_voice_credits,
            tally_salts: self.tally_salts.clone(),
            subsidy: self.subsidy.clone(),
            subsidy_rbi: self.subsidy_rbi,
            subsidy_cbi: self.subsidy_cbi,
            subsidy_salts: self.subsidy_salts.clone(),
            salt_source: Box::new(CounterSaltSource::new()),
        }
    }

    /// Compares poll parameters and the message/command/encPubKey
    /// sequences. Trees are deliberately excluded — they are derived from
    /// this same data, so comparing them would be redundant (§4.8).
    pub fn equals(&self, other: &Poll) -> bool {
        self.params == other.params
            && self.messages == other.messages
            && self.enc_pub_keys == other.enc_pub_keys
            && self.commands == other.commands
    }

    pub fn to_json(&self) -> Value {
        json!({
            "pollEndTimestamp": self.params.poll_end_timestamp.to_string(),
            "treeDepths": {
                "stateTreeDepth": self.params.tree_depths.state_tree_depth,
                "messageTreeDepth": self.params.tree_depths.message_tree_depth,
                "voteOptionTreeDepth": self.params.tree_depths.vote_option_tree_depth,
            },
            "batchSizes": {
                "messageBatchSize": self.params.batch_sizes.message_batch_size,
                "tallyBatchSize": self.params.batch_sizes.tally_batch_size,
                "subsidyBatchSize": self.params.batch_sizes.subsidy_batch_size,
            },
            "maxValues": {
                "maxVoteOptions": self.params.max_values.max_vote_options,
                "maxMessages": self.params.max_values.max_messages,
            },
            "messages": self.messages.iter().map(message_to_json).collect::<Vec<_>>(),
            "commands": self.commands.iter().map(command_to_json).collect::<Vec<_>>(),
            "encPubKeys": self.enc_pub_keys.iter().map(|k| json!([field::to_decimal_string(&k.0), field::to_decimal_string(&k.1)])).collect::<Vec<_>>(),
            "ballots": self.ballots.iter().map(ballot_to_json).collect::<Vec<_>>(),
            "currentMessageBatchIndex": self.current_message_batch_index,
            "stateLeaves": self.state_leaves.iter().map(state_leaf_to_json).collect::<Vec<_>>(),
            "results": self.tally_result.iter().map(field::to_decimal_string).collect::<Vec<_>>(),
            "numBatchesProcessed": self.num_batches_processed,
        })
    }

    /// Rebuilds a Poll from its JSON layout. The message tree is rebuilt by
    /// re-inserting message hashes; `copy_state_from_maci` then rebuilds the
    /// state/ballot trees from the loaded leaves (§4.8).
    pub fn from_json(&mut self, value: &Value) {
        let v = value;
        self.params.poll_end_timestamp = v["pollEndTimestamp"].as_str().unwrap_or("0").parse().unwrap_or(0);

        self.messages = v["messages"].as_array().map(|a| a.iter().map(message_from_json).collect()).unwrap_or_default();
        self.commands = v["commands"].as_array().map(|a| a.iter().map(command_from_json).collect()).unwrap_or_default();
        self.enc_pub_keys = v["encPubKeys"]
            .as_array()
            .map(|a| {
                a.iter()
                    .map(|pair| {
                        let arr = pair.as_array().expect("encPubKey is a 2-tuple");
                        (decimal(&arr[0]), decimal(&arr[1]))
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.ballots = v["ballots"]
            .as_array()
            .map(|a| a.iter().map(|b| ballot_from_json(b)).collect())
            .unwrap_or_default();
        self.current_message_batch_index =
            v["currentMessageBatchIndex"].as_u64().unwrap_or(0) as usize;
        self.state_leaves = v["stateLeaves"]
            .as_array()
            .map(|a| a.iter().map(state_leaf_from_json).collect())
            .unwrap_or_default();
        self.tally_result = v["results"]
            .as_array()
            .map(|a| a.iter().map(decimal).collect())
            .unwrap_or_else(|| vec![Fr::from(0u64); self.num_vote_options()]);
        self.num_batches_processed = v["numBatchesProcessed"].as_u64().unwrap_or(0) as usize;

        self.message_tree = crate::merkle::IncrementalQuinTree::new(
            self.params.tree_depths.message_tree_depth,
            crate::hash::nothing_up_my_sleeve(),
        );
        for (message, enc_pub_key) in self.messages.iter().zip(self.enc_pub_keys.iter()) {
            self.message_tree.insert(message.hash(*enc_pub_key));
        }

        // A Poll freshly deployed and not yet snapshotted has no state
        // leaves of its own yet; defer to `copy_state_from_maci` as usual.
        // Otherwise the loaded leaves/ballots are authoritative and the
        // trees are rebuilt directly from them.
        if self.state_leaves.is_empty() {
            self.state_copied = false;
            self.copy_state_from_maci();
        } else {
            self.state_copied = true;
            let vote_option_tree_depth = self.params.tree_depths.vote_option_tree_depth;
            let empty_ballot = crate::domain::Ballot::blank(vote_option_tree_depth);
            self.state_tree =
                crate::merkle::IncrementalQuinTree::new(self.params.tree_depths.state_tree_depth, Fr::from(0u64));
            self.ballot_tree = crate::merkle::IncrementalQuinTree::new(
                self.params.tree_depths.state_tree_depth,
                empty_ballot.hash(vote_option_tree_depth),
            );
            for leaf in &self.state_leaves {
                self.state_tree.insert(leaf.hash());
            }
            for ballot in &self.ballots {
                self.ballot_tree.insert(ballot.hash(vote_option_tree_depth));
            }
        }
    }
}

fn decimal(v: &Value) -> Fr {
    field::from_decimal_string(v.as_str().unwrap_or("0")).unwrap_or(Fr::from(0u64))
}

fn message_to_json(message: &Message) -> Value {
    json!({
        "msgType": field::to_decimal_string(&message.msg_type),
        "data": message.data.iter().map(field::to_decimal_string).collect::<Vec<_>>(),
    })
}

fn message_from_json(v: &Value) -> Message {
    let mut data = [Fr::from(0u64); MESSAGE_DATA_LEN];
    if let Some(words) = v["data"].as_array() {
        for (slot, word) in data.iter_mut().zip(words.iter()) {
            *slot = decimal(word);
        }
    }
    Message { msg_type: decimal(&v["msgType"]), data }
}

fn command_to_json(command: &ICommand) -> Value {
    match command {
        ICommand::P(c) => json!({
            "cmdType": "1",
            "stateIndex": c.state_index.to_string(),
            "newPubKey": [field::to_decimal_string(&c.new_pub_key.0), field::to_decimal_string(&c.new_pub_key.1)],
            "voteOptionIndex": c.vote_option_index.to_string(),
            "newVoteWeight": field::to_decimal_string(&c.new_vote_weight),
            "nonce": c.nonce.to_string(),
            "pollId": c.poll_id.to_string(),
            "salt": field::to_decimal_string(&c.salt),
            "signatureR8": [field::to_decimal_string(&c.signature.r8.x), field::to_decimal_string(&c.signature.r8.y)],
            "signatureS": c.signature.s.to_str_radix(10),
        }),
        ICommand::T(c) => json!({
            "cmdType": "2",
            "stateIndex": c.state_index.to_string(),
            "amount": field::to_decimal_string(&c.amount),
            "pollId": c.poll_id.to_string(),
        }),
        ICommand::Blank => json!({ "cmdType": "0" }),
    }
}

fn command_from_json(v: &Value) -> ICommand {
    match v["cmdType"].as_str() {
        Some("1") => {
            let pub_key = v["newPubKey"].as_array().expect("newPubKey is a 2-tuple");
            let sig_r8 = v["signatureR8"].as_array().expect("signatureR8 is a 2-tuple");
            let s = BigUint::parse_bytes(v["signatureS"].as_str().unwrap_or("0").as_bytes(), 10)
                .unwrap_or_else(|| BigUint::from(0u32));
            ICommand::P(PCommand {
                state_index: v["stateIndex"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
                new_pub_key: (decimal(&pub_key[0]), decimal(&pub_key[1])),
                vote_option_index: v["voteOptionIndex"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
                new_vote_weight: decimal(&v["newVoteWeight"]),
                nonce: v["nonce"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
                poll_id: v["pollId"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
                salt: decimal(&v["salt"]),
                signature: Signature { r8: babyjubjub::Point { x: decimal(&sig_r8[0]), y: decimal(&sig_r8[1]) }, s },
            })
        }
        Some("2") => ICommand::T(TCommand {
            state_index: v["stateIndex"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
            amount: decimal(&v["amount"]),
            poll_id: v["pollId"].as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
        }),
        _ => ICommand::Blank,
    }
}

fn ballot_to_json(ballot: &Ballot) -> Value {
    json!({
        "nonce": field::to_decimal_string(&ballot.nonce),
        "votes": ballot.votes.iter().map(field::to_decimal_string).collect::<Vec<_>>(),
    })
}

fn ballot_from_json(v: &Value) -> Ballot {
    let votes = v["votes"].as_array().map(|a| a.iter().map(decimal).collect()).unwrap_or_default();
    Ballot { nonce: decimal(&v["nonce"]), votes }
}

fn state_leaf_to_json(leaf: &StateLeaf) -> Value {
    json!({
        "pubKey": [field::to_decimal_string(&leaf.pub_key.0.x), field::to_decimal_string(&leaf.pub_key.0.y)],
        "voiceCreditBalance": field::to_decimal_string(&leaf.voice_credit_balance),
        "timestamp": field::to_decimal_string(&leaf.timestamp),
    })
}

fn state_leaf_from_json(v: &Value) -> StateLeaf {
    let pub_key = v["pubKey"].as_array().expect("pubKey is a 2-tuple");
    StateLeaf {
        pub_key: PubKey(babyjubjub::Point { x: decimal(&pub_key[0]), y: decimal(&pub_key[1]) }),
        voice_credit_balance: decimal(&v["voiceCreditBalance"]),
        timestamp: decimal(&v["timestamp"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::babyjubjub::{Keypair as Kp, PrivKey as Pk};
    use crate::config::{BatchSizes, MaxValues, PollParams, TreeDepths};
    use crate::maci_state::MaciState;
    use num_bigint::BigUint as Bu;

    fn test_params() -> PollParams {
        PollParams {
            tree_depths: TreeDepths { state_tree_depth: 4, message_tree_depth: 2, vote_option_tree_depth: 2 },
            batch_sizes: BatchSizes { message_batch_size: 5, tally_batch_size: 5, subsidy_batch_size: 2 },
            max_values: MaxValues { max_vote_options: 25, max_messages: 100 },
            poll_end_timestamp: 12345,
        }
    }

    #[test]
    fn copy_is_independent_and_equal() {
        let state = MaciState::new(4);
        let coordinator = Kp::from_priv_key(Pk(Bu::from(1u32)));
        let mut poll = MaciState::deploy_poll(&state, test_params(), coordinator);
        poll.copy_state_from_maci();
        poll.topup_message(Message::topup([Fr::from(0u64); MESSAGE_DATA_LEN]));

        let mut copy = poll.copy();
        assert!(poll.equals(&copy));
        copy.topup_message(Message::topup([Fr::from(1u64); MESSAGE_DATA_LEN]));
        assert!(!poll.equals(&copy));
    }

    #[test]
    fn json_round_trip_preserves_messages_and_results() {
        let state = MaciState::new(4);
        let coordinator = Kp::from_priv_key(Pk(Bu::from(1u32)));
        let mut poll = MaciState::deploy_poll(&state, test_params(), coordinator);
        poll.copy_state_from_maci();
        poll.topup_message(Message::topup([Fr::from(7u64); MESSAGE_DATA_LEN]));

        let json = poll.to_json();
        let mut reloaded = MaciState::deploy_poll(&state, test_params(), Kp::from_priv_key(Pk(Bu::from(1u32))));
        reloaded.from_json(&json);

        assert_eq!(reloaded.messages, poll.messages);
        assert_eq!(reloaded.state_tree.root(), poll.state_tree.root());
    }
}
