use crate::field::Fr;
use crate::hash::hash_left_right;
use crate::merkle::IncrementalQuinTree;
use ark_ff::Zero;

/// A voter's per-poll record: current nonce and per-option vote weights
/// (§3). Index 0 is always the empty ballot.
#[derive(Clone, Debug, PartialEq)]
pub struct Ballot {
    pub nonce: Fr,
    pub votes: Vec<Fr>,
}

impl Ballot {
    pub fn new(num_vote_options: usize) -> Self {
        Ballot { nonce: Fr::zero(), votes: vec![Fr::zero(); num_vote_options] }
    }

    /// `genBlankBallot(voteOptionTreeDepth)` (§3, §4.2): the width of a
    /// ballot is fixed by the tree's arity and depth.
    pub fn blank(vote_option_tree_depth: usize) -> Self {
        Self::new(num_vote_options(vote_option_tree_depth))
    }

    /// `hashLeftRight(nonce, votesRoot)` where `votesRoot` is the root of a
    /// fresh quinary tree over this ballot's votes (§4.6's
    /// `genResultsCommitment` reuses the same construction for tally
    /// results).
    pub fn hash(&self, vote_option_tree_depth: usize) -> Fr {
        let root = votes_tree_root(&self.votes, vote_option_tree_depth);
        hash_left_right(self.nonce, root)
    }
}

pub fn num_vote_options(vote_option_tree_depth: usize) -> usize {
    crate::merkle::ARITY.pow(vote_option_tree_depth as u32)
}

/// Builds the quinary tree §4.3's `originalVoteWeightsPathElements` and
/// §4.6's result/per-VO commitments both need, and returns its root.
pub fn votes_tree_root(votes: &[Fr], vote_option_tree_depth: usize) -> Fr {
    votes_tree(votes, vote_option_tree_depth).root()
}

pub fn votes_tree(votes: &[Fr], vote_option_tree_depth: usize) -> IncrementalQuinTree {
    let mut tree = IncrementalQuinTree::new(vote_option_tree_depth, Fr::zero());
    for vote in votes {
        tree.insert(*vote);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ballot_has_correct_width() {
        let ballot = Ballot::blank(2);
        assert_eq!(ballot.votes.len(), 25);
    }

    #[test]
    fn hash_changes_when_a_vote_changes() {
        let mut ballot = Ballot::blank(2);
        let h0 = ballot.hash(2);
        ballot.votes[3] = Fr::from(5u64);
        assert_ne!(ballot.hash(2), h0);
    }
}
