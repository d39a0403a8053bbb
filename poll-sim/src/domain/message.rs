use crate::field::Fr;
use crate::hash::{hash3, hash5};
use ark_ff::Zero;

pub const MESSAGE_DATA_LEN: usize = 10;

pub const MSG_TYPE_VOTE: u64 = 1;
pub const MSG_TYPE_TOPUP: u64 = 2;

/// `{ msgType, data: [F; 10] }` (§3). `msgType` distinguishes a vote/
/// key-change message (1) from a topup message (2).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Message {
    pub msg_type: Fr,
    pub data: [Fr; MESSAGE_DATA_LEN],
}

impl Message {
    pub fn vote(data: [Fr; MESSAGE_DATA_LEN]) -> Self {
        Message { msg_type: Fr::from(MSG_TYPE_VOTE), data }
    }

    pub fn topup(data: [Fr; MESSAGE_DATA_LEN]) -> Self {
        Message { msg_type: Fr::from(MSG_TYPE_TOPUP), data }
    }

    pub fn is_vote(&self) -> bool {
        self.msg_type == Fr::from(MSG_TYPE_VOTE)
    }

    pub fn is_topup(&self) -> bool {
        self.msg_type == Fr::from(MSG_TYPE_TOPUP)
    }

    /// The domain's canonical message hash inserted into `messageTree`
    /// (§4.1): folds all ten data words together with the envelope's
    /// ephemeral public key, using only the adapters' fixed-width sponges.
    pub fn hash(&self, enc_pub_key: (Fr, Fr)) -> Fr {
        let d = &self.data;
        let inner = hash5([d[5], d[6], d[7], d[8], d[9]]);
        let outer = hash5([d[0], d[1], d[2], d[3], inner]);
        hash3([outer, enc_pub_key.0, enc_pub_key.1])
    }
}

impl Default for Message {
    fn default() -> Self {
        Message { msg_type: Fr::zero(), data: [Fr::zero(); MESSAGE_DATA_LEN] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_depends_on_enc_pub_key() {
        let message = Message::vote([Fr::from(1u64); MESSAGE_DATA_LEN]);
        let h1 = message.hash((Fr::from(1u64), Fr::from(2u64)));
        let h2 = message.hash((Fr::from(3u64), Fr::from(4u64)));
        assert_ne!(h1, h2);
    }

    #[test]
    fn msg_type_tags_round_trip() {
        assert!(Message::vote([Fr::zero(); MESSAGE_DATA_LEN]).is_vote());
        assert!(Message::topup([Fr::zero(); MESSAGE_DATA_LEN]).is_topup());
    }
}
