//! Decrypted message payloads (§3, §9): `ICommand` is the tagged union the
//! batch processor dispatches on. `PCommand` carries its own `Signature`
//! directly rather than threading a parallel signature array alongside
//! `commands`, which keeps `ICommand::Blank` trivially representable.

use crate::babyjubjub::{self, Keypair, PrivKey, PubKey, Signature};
use crate::domain::message::MESSAGE_DATA_LEN;
use crate::field::{self, Fr};
use crate::hash::hash5;
use ark_ff::Zero;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

#[derive(Clone, Debug, PartialEq)]
pub struct PCommand {
    pub state_index: u64,
    pub new_pub_key: (Fr, Fr),
    pub vote_option_index: u64,
    pub new_vote_weight: Fr,
    pub nonce: u64,
    pub poll_id: u64,
    pub salt: Fr,
    pub signature: Signature,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TCommand {
    pub state_index: u64,
    pub amount: Fr,
    pub poll_id: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ICommand {
    P(PCommand),
    T(TCommand),
    Blank,
}

const STATE_INDEX_SHIFT: usize = 0;
const VOTE_OPTION_SHIFT: usize = 50;
const NONCE_SHIFT: usize = 100;
const POLL_ID_SHIFT: usize = 150;
const FIELD_MASK_BITS: usize = 50;

fn pack_small_ints(state_index: u64, vote_option_index: u64, nonce: u64, poll_id: u64) -> Fr {
    let mut acc = BigUint::from(state_index) << STATE_INDEX_SHIFT;
    acc += BigUint::from(vote_option_index) << VOTE_OPTION_SHIFT;
    acc += BigUint::from(nonce) << NONCE_SHIFT;
    acc += BigUint::from(poll_id) << POLL_ID_SHIFT;
    field::biguint_to_fr(&acc)
}

fn unpack_small_ints(value: Fr) -> (u64, u64, u64, u64) {
    let packed = field::fr_to_biguint(&value);
    let mask = (BigUint::from(1u64) << FIELD_MASK_BITS) - BigUint::from(1u64);
    let extract = |shift: usize| -> u64 {
        ((&packed >> shift) & &mask).to_u64().unwrap_or(0)
    };
    (
        extract(STATE_INDEX_SHIFT),
        extract(VOTE_OPTION_SHIFT),
        extract(NONCE_SHIFT),
        extract(POLL_ID_SHIFT),
    )
}

impl PCommand {
    pub fn new(
        state_index: u64,
        new_pub_key: (Fr, Fr),
        vote_option_index: u64,
        new_vote_weight: Fr,
        nonce: u64,
        poll_id: u64,
        salt: Fr,
    ) -> Self {
        PCommand {
            state_index,
            new_pub_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            poll_id,
            salt,
            signature: Signature { r8: babyjubjub::Point::identity(), s: BigUint::from(0u32) },
        }
    }

    /// The value a signature is computed over — everything but the
    /// signature itself.
    pub fn hash(&self) -> Fr {
        let part1 = hash5([
            Fr::from(self.state_index),
            self.new_pub_key.0,
            self.new_pub_key.1,
            Fr::from(self.vote_option_index),
            self.new_vote_weight,
        ]);
        hash5([part1, Fr::from(self.nonce), Fr::from(self.poll_id), self.salt, Fr::zero()])
    }

    pub fn signed(mut self, keypair: &Keypair) -> Self {
        self.signature = babyjubjub::sign(&keypair.priv_key, &keypair.pub_key, self.hash());
        self
    }

    pub fn verify_signature(&self, pub_key: &PubKey) -> bool {
        babyjubjub::verify(&self.signature, pub_key, self.hash())
    }

    /// Packs this command into the plaintext layout `encrypt_data` expects:
    /// the four small integers share one word (mirroring the `packedVals`
    /// bit layout in §4.5), coordinates and salt each take a word, and the
    /// unreduced signature scalar spans three words (§4.0 design note on
    /// `to_field_digits`).
    pub fn to_plaintext(&self) -> [Fr; MESSAGE_DATA_LEN] {
        let mut data = [Fr::zero(); MESSAGE_DATA_LEN];
        data[0] = pack_small_ints(self.state_index, self.vote_option_index, self.nonce, self.poll_id);
        data[1] = self.new_pub_key.0;
        data[2] = self.new_pub_key.1;
        data[3] = self.new_vote_weight;
        data[4] = self.salt;
        data[5] = self.signature.r8.x;
        data[6] = self.signature.r8.y;
        let s_digits = field::to_field_digits(&self.signature.s, 3);
        data[7] = s_digits[0];
        data[8] = s_digits[1];
        data[9] = s_digits[2];
        data
    }

    pub fn from_plaintext(data: [Fr; MESSAGE_DATA_LEN]) -> Self {
        let (state_index, vote_option_index, nonce, poll_id) = unpack_small_ints(data[0]);
        let s = field::from_field_digits(&data[7..10]);
        PCommand {
            state_index,
            new_pub_key: (data[1], data[2]),
            vote_option_index,
            new_vote_weight: data[3],
            nonce,
            poll_id,
            salt: data[4],
            signature: Signature { r8: babyjubjub::Point { x: data[5], y: data[6] }, s },
        }
    }
}

fn keystream_word(shared_key: Fr, index: usize) -> Fr {
    crate::hash::hash_left_right(shared_key, Fr::from(index as u64))
}

/// Additive stream cipher over the field (§4.1): the coordinator and the
/// sender agree on `shared_key` via ECDH, so only the holder of either
/// private half can recover the plaintext words.
pub fn encrypt_data(plaintext: [Fr; MESSAGE_DATA_LEN], shared_key: Fr) -> [Fr; MESSAGE_DATA_LEN] {
    let mut out = [Fr::zero(); MESSAGE_DATA_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = plaintext[i] + keystream_word(shared_key, i);
    }
    out
}

pub fn decrypt_data(ciphertext: [Fr; MESSAGE_DATA_LEN], shared_key: Fr) -> [Fr; MESSAGE_DATA_LEN] {
    let mut out = [Fr::zero(); MESSAGE_DATA_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ciphertext[i] - keystream_word(shared_key, i);
    }
    out
}

impl PCommand {
    pub fn encrypt(&self, shared_key: Fr) -> [Fr; MESSAGE_DATA_LEN] {
        encrypt_data(self.to_plaintext(), shared_key)
    }

    /// Decrypting is infallible at this layer: a wrong `shared_key` yields
    /// structurally valid but semantically garbage fields, which the
    /// command state machine's existing rejection rules (§4.3) catch. There
    /// is no separate hard decode-failure mode to model.
    pub fn decrypt(ciphertext: [Fr; MESSAGE_DATA_LEN], shared_key: Fr) -> Self {
        Self::from_plaintext(decrypt_data(ciphertext, shared_key))
    }
}

impl TCommand {
    pub fn new(state_index: u64, amount: Fr, poll_id: u64) -> Self {
        TCommand { state_index, amount, poll_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_round_trip_through_packing() {
        let packed = pack_small_ints(7, 12, 3, 9);
        assert_eq!(unpack_small_ints(packed), (7, 12, 3, 9));
    }

    #[test]
    fn sign_then_verify_round_trips_through_encryption() {
        let voter = Keypair::from_priv_key(PrivKey(BigUint::from(123u32)));
        let coordinator = Keypair::from_priv_key(PrivKey(BigUint::from(456u32)));
        let command = PCommand::new(1, (Fr::from(9u64), Fr::from(8u64)), 3, Fr::from(5u64), 1, 0, Fr::from(42u64))
            .signed(&voter);

        let shared = Keypair::gen_ecdh_shared_key(&coordinator.priv_key, &voter.pub_key);
        let ciphertext = command.encrypt(shared);
        let decrypted = PCommand::decrypt(ciphertext, shared);

        assert_eq!(decrypted, command);
        assert!(decrypted.verify_signature(&voter.pub_key));
    }

    #[test]
    fn wrong_shared_key_yields_garbage_not_a_panic() {
        let voter = Keypair::from_priv_key(PrivKey(BigUint::from(123u32)));
        let command = PCommand::new(1, (Fr::from(9u64), Fr::from(8u64)), 3, Fr::from(5u64), 1, 0, Fr::from(42u64))
            .signed(&voter);
        let ciphertext = command.encrypt(Fr::from(1u64));
        let decrypted = PCommand::decrypt(ciphertext, Fr::from(2u64));
        assert_ne!(decrypted, command);
    }
}
