use crate::babyjubjub::PubKey;
use crate::field::Fr;
use crate::hash::hash5;
use ark_ff::Zero;

/// A voter's record in the state tree: `{ pubKey, voiceCreditBalance,
/// timestamp }` (§3). Index 0 is always the blank sentinel leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateLeaf {
    pub pub_key: PubKey,
    pub voice_credit_balance: Fr,
    pub timestamp: Fr,
}

impl StateLeaf {
    pub fn new(pub_key: PubKey, voice_credit_balance: Fr, timestamp: Fr) -> Self {
        StateLeaf { pub_key, voice_credit_balance, timestamp }
    }

    /// Fixed anti-DoS sentinel occupying state-tree index 0 (§3, §4.9).
    pub fn blank() -> Self {
        StateLeaf {
            pub_key: crate::babyjubjub::pad_pub_key(),
            voice_credit_balance: Fr::zero(),
            timestamp: Fr::zero(),
        }
    }

    pub fn hash(&self) -> Fr {
        hash5([
            self.pub_key.0.x,
            self.pub_key.0.y,
            self.voice_credit_balance,
            self.timestamp,
            Fr::zero(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_state_leaf_hash_is_stable() {
        assert_eq!(StateLeaf::blank().hash(), StateLeaf::blank().hash());
    }

    #[test]
    fn hash_changes_with_balance() {
        let mut leaf = StateLeaf::blank();
        let h0 = leaf.hash();
        leaf.voice_credit_balance = Fr::from(5u64);
        assert_ne!(leaf.hash(), h0);
    }
}
