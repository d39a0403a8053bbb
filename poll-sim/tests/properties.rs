//! Property tests for the invariants enumerated in SPEC_FULL.md §8.

use maci_poll_sim::babyjubjub::{Keypair, PrivKey};
use maci_poll_sim::config::{BatchSizes, MaxValues, PollParams, TreeDepths};
use maci_poll_sim::field::Fr;
use maci_poll_sim::maci_state::MaciState;
use maci_poll_sim::salt::CounterSaltSource;
use num_bigint::BigUint;
use proptest::prelude::*;

fn params(message_batch_size: usize) -> PollParams {
    PollParams {
        tree_depths: TreeDepths { state_tree_depth: 4, message_tree_depth: 2, vote_option_tree_depth: 2 },
        batch_sizes: BatchSizes { message_batch_size, tally_batch_size: 25, subsidy_batch_size: 2 },
        max_values: MaxValues { max_vote_options: 25, max_messages: 100 },
        poll_end_timestamp: 0,
    }
}

fn keypair(seed: u32) -> Keypair {
    Keypair::from_priv_key(PrivKey(BigUint::from(seed)))
}

proptest! {
    #[test]
    fn ingest_lengths_stay_in_lockstep(
        weights in prop::collection::vec(0u64..10, 0..8),
        batch_size in 1usize..7,
    ) {
        let state = MaciState::new(4);
        let voter = keypair(1);
        let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        let mut poll = MaciState::deploy_poll(&state, params(batch_size), keypair(999));
        poll.copy_state_from_maci();

        for (i, weight) in weights.iter().enumerate() {
            poll.publish_vote(
                &voter,
                index as u64,
                0,
                Fr::from(*weight),
                (voter.pub_key.0.x, voter.pub_key.0.y),
                i as u64 + 1,
                Fr::from(i as u64 + 1),
            );
        }

        prop_assert_eq!(poll.messages.len(), poll.enc_pub_keys.len());
        prop_assert_eq!(poll.messages.len(), poll.commands.len());
        prop_assert_eq!(poll.messages.len(), poll.message_tree.next_index());
    }

    #[test]
    fn snapshot_sizes_match_sign_ups(num_sign_ups in 0usize..6) {
        let state = MaciState::new(4);
        for seed in 0..num_sign_ups as u32 {
            let voter = keypair(seed + 1);
            state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        }
        let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
        poll.copy_state_from_maci();

        prop_assert_eq!(poll.ballots.len(), poll.state_leaves.len());
        prop_assert_eq!(poll.ballot_tree.next_index(), poll.state_tree.next_index());
        prop_assert_eq!(poll.state_leaves.len(), num_sign_ups + 1);
    }

    #[test]
    fn copy_is_equal_and_independent(weight in 0u64..10) {
        let state = MaciState::new(4);
        let voter = keypair(2);
        let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
        poll.copy_state_from_maci();
        poll.publish_vote(&voter, index as u64, 0, Fr::from(weight), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(1u64));

        let mut copy = poll.copy();
        prop_assert!(poll.equals(&copy));
        copy.publish_vote(&voter, index as u64, 0, Fr::from(weight + 1), (voter.pub_key.0.x, voter.pub_key.0.y), 2, Fr::from(2u64));
        prop_assert!(!poll.equals(&copy));
    }

    #[test]
    fn json_round_trip_preserves_equality_and_roots(weight in 0u64..10) {
        let state = MaciState::new(4);
        let voter = keypair(3);
        let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
        poll.copy_state_from_maci();
        poll.publish_vote(&voter, index as u64, 0, Fr::from(weight), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(1u64));

        let json = poll.to_json();
        let mut reloaded = MaciState::deploy_poll(&state, params(5), keypair(999));
        reloaded.from_json(&json);

        prop_assert!(poll.equals(&reloaded));
        prop_assert_eq!(poll.state_tree.root(), reloaded.state_tree.root());
        prop_assert_eq!(poll.message_tree.root(), reloaded.message_tree.root());
    }

    #[test]
    fn full_processing_root_is_independent_of_batch_size(
        weights in prop::collection::vec(0u64..10, 1..6),
        batch_a in 1usize..4,
        batch_b in 4usize..9,
    ) {
        let run = |batch_size: usize| {
            let state = MaciState::new(4);
            let voter = keypair(4);
            let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(1000u64), Fr::from(0u64));
            let mut poll = MaciState::deploy_poll(&state, params(batch_size), keypair(999));
            poll.set_salt_source(Box::new(CounterSaltSource::new()));
            poll.copy_state_from_maci();
            for (i, weight) in weights.iter().enumerate() {
                poll.publish_vote(&voter, index as u64, 0, Fr::from(*weight), (voter.pub_key.0.x, voter.pub_key.0.y), i as u64 + 1, Fr::from(i as u64 + 1));
            }
            while poll.has_unprocessed_messages() {
                poll.process_messages().unwrap();
            }
            (poll.state_tree.root(), poll.ballot_tree.root())
        };

        prop_assert_eq!(run(batch_a), run(batch_b));
    }

    #[test]
    fn accepted_vote_preserves_the_quadratic_credit_law(
        first_weight in 0u64..8,
        second_weight in 0u64..8,
    ) {
        let state = MaciState::new(4);
        let voter = keypair(5);
        let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(1000u64), Fr::from(0u64));
        let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
        poll.copy_state_from_maci();
        let pre_balance = poll.state_leaves[index].voice_credit_balance;

        poll.publish_vote(&voter, index as u64, 0, Fr::from(first_weight), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(1u64));
        poll.publish_vote(&voter, index as u64, 0, Fr::from(second_weight), (voter.pub_key.0.x, voter.pub_key.0.y), 2, Fr::from(2u64));
        while poll.has_unprocessed_messages() {
            poll.process_messages().unwrap();
        }

        // Reverse-order processing always reaches the nonce-2 command first,
        // while the ballot's nonce is still 0 — it is rejected, and only the
        // nonce-1 command ever lands (the same quirk SPEC_FULL.md's
        // key-change-then-vote scenario exercises).
        let post_balance = poll.state_leaves[index].voice_credit_balance;
        let final_weight = poll.ballots[index].votes[0];
        let _ = second_weight;
        prop_assert_eq!(final_weight, Fr::from(first_weight));
        prop_assert_eq!(post_balance + final_weight * final_weight, pre_balance);
    }

    #[test]
    fn rejected_vote_leaves_state_byte_identical(over_budget_weight in 11u64..20) {
        let state = MaciState::new(4);
        let voter = keypair(6);
        let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
        let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
        poll.copy_state_from_maci();
        let ballots_before = poll.ballots.clone();
        let leaves_before = poll.state_leaves.clone();

        // over_budget_weight^2 always exceeds the 100-credit budget.
        poll.publish_vote(&voter, index as u64, 0, Fr::from(over_budget_weight), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(1u64));
        while poll.has_unprocessed_messages() {
            poll.process_messages().unwrap();
        }

        prop_assert_eq!(poll.ballots, ballots_before);
        prop_assert_eq!(poll.state_leaves, leaves_before);
    }
}

#[test]
fn tally_law_matches_summed_ballots() {
    let state = MaciState::new(4);
    let mut poll = MaciState::deploy_poll(&state, params(5), keypair(999));
    for seed in [1u32, 2u32, 3u32] {
        let voter = keypair(seed + 10);
        state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
    }
    poll.copy_state_from_maci();

    for (i, (seed, weight)) in [(1u32, 3u64), (2u32, 4u64), (3u32, 2u64)].into_iter().enumerate() {
        let voter = keypair(seed + 10);
        poll.publish_vote(&voter, (i + 1) as u64, 0, Fr::from(weight), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(i as u64 + 1));
    }

    while poll.has_unprocessed_messages() {
        poll.process_messages().unwrap();
    }
    while poll.has_untallied_ballots() {
        poll.tally_votes();
    }

    let summed: Fr = poll.ballots.iter().flat_map(|b| b.votes.iter()).fold(Fr::from(0u64), |acc, v| acc + *v);
    let tally_summed: Fr = poll.tally_result.iter().fold(Fr::from(0u64), |acc, v| acc + *v);
    assert_eq!(summed, tally_summed);

    let per_vo_summed: Fr =
        poll.per_vo_spent_voice_credits.iter().fold(Fr::from(0u64), |acc, v| acc + *v);
    assert_eq!(per_vo_summed, poll.total_spent_voice_credits);
}

#[test]
fn processing_lock_rejects_a_second_poll() {
    let state = MaciState::new(4);
    let voter = keypair(7);
    let index = state.borrow_mut().sign_up(voter.pub_key, Fr::from(100u64), Fr::from(0u64));
    let mut poll_a = MaciState::deploy_poll(&state, params(1), keypair(999));
    poll_a.copy_state_from_maci();
    poll_a.publish_vote(&voter, index as u64, 0, Fr::from(1u64), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(1u64));
    poll_a.publish_vote(&voter, index as u64, 0, Fr::from(1u64), (voter.pub_key.0.x, voter.pub_key.0.y), 2, Fr::from(2u64));
    poll_a.process_messages().unwrap();
    assert!(poll_a.has_unprocessed_messages());

    let mut poll_b = MaciState::deploy_poll(&state, params(5), keypair(111));
    poll_b.copy_state_from_maci();
    poll_b.publish_vote(&voter, index as u64, 0, Fr::from(1u64), (voter.pub_key.0.x, voter.pub_key.0.y), 1, Fr::from(3u64));
    assert!(poll_b.process_messages().is_err());
}
