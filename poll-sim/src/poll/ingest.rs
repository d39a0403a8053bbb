//! `publishMessage` / `topupMessage` (§4.1).

use super::Poll;
use crate::babyjubjub::{self, Keypair, PubKey};
use crate::domain::command::{PCommand, TCommand};
use crate::domain::message::MESSAGE_DATA_LEN;
use crate::domain::{ICommand, Message};
use crate::field::{self, Fr};
use num_traits::ToPrimitive;

impl Poll {
    /// Appends a vote/key-change message, decrypts it against the
    /// coordinator's keypair, and pushes the resulting command. Decryption
    /// never hard-fails (see `PCommand::decrypt`); what can fail here are
    /// the crate's own preconditions, which are programmer errors.
    pub fn publish_message(&mut self, message: Message, enc_pub_key: (Fr, Fr)) {
        assert!(message.is_vote(), "publish_message called with a non-vote message");
        for word in message.data.iter().chain([enc_pub_key.0, enc_pub_key.1].iter()) {
            assert!(field::is_below_field_size(word), "message word exceeds the field");
        }

        self.messages.push(message);
        self.enc_pub_keys.push(enc_pub_key);
        self.message_tree.insert(message.hash(enc_pub_key));

        let ephemeral_pub_key = PubKey(babyjubjub::Point { x: enc_pub_key.0, y: enc_pub_key.1 });
        let shared_key = Keypair::gen_ecdh_shared_key(&self.coordinator.priv_key, &ephemeral_pub_key);
        let command = PCommand::decrypt(message.data, shared_key);
        self.commands.push(ICommand::P(command));
    }

    /// Appends a topup message. Unlike vote messages, topup payloads are not
    /// encrypted — there is no sender keypair to hide them from (§4.1).
    pub fn topup_message(&mut self, message: Message) {
        assert!(message.is_topup(), "topup_message called with a non-topup message");
        for word in &message.data {
            assert!(field::is_below_field_size(word), "message word exceeds the field");
        }

        let pad_key = babyjubjub::pad_pub_key();
        self.messages.push(message);
        self.enc_pub_keys.push((pad_key.0.x, pad_key.0.y));
        self.message_tree.insert(message.hash((pad_key.0.x, pad_key.0.y)));

        let state_index = field::fr_to_biguint(&message.data[0]).to_u64().unwrap_or(0);
        self.commands.push(ICommand::T(TCommand::new(state_index, message.data[1], self.poll_id as u64)));
    }

    /// Convenience for tests and embedding callers: builds, signs, encrypts
    /// and ingests a vote/key-change command in one call.
    pub fn publish_vote(
        &mut self,
        voter: &Keypair,
        state_index: u64,
        vote_option_index: u64,
        new_vote_weight: Fr,
        new_pub_key: (Fr, Fr),
        nonce: u64,
        salt: Fr,
    ) {
        let command = PCommand::new(
            state_index,
            new_pub_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            self.poll_id as u64,
            salt,
        )
        .signed(voter);
        let ephemeral = Keypair::random(&mut rand::thread_rng());
        let shared_key = Keypair::gen_ecdh_shared_key(&ephemeral.priv_key, &self.coordinator.pub_key);
        let mut data = [Fr::from(0u64); MESSAGE_DATA_LEN];
        data.copy_from_slice(&command.encrypt(shared_key));
        self.publish_message(Message::vote(data), (ephemeral.pub_key.0.x, ephemeral.pub_key.0.y));
    }
}
