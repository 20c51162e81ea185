//! Property tests for the Eisenhower scorer and ranking.

use agency_core::model::{ImportanceLevel, Lenient, Requirement, UrgencyLevel};
use agency_core::priority::{
    PriorityScore, drift, effective_priority, rank, reconcile, score, score_lenient,
};
use proptest::prelude::*;

fn arb_urgency() -> impl Strategy<Value = UrgencyLevel> {
    prop::sample::select(UrgencyLevel::ALL.to_vec())
}

fn arb_importance() -> impl Strategy<Value = ImportanceLevel> {
    prop::sample::select(ImportanceLevel::ALL.to_vec())
}

fn arb_requirement() -> impl Strategy<Value = Requirement> {
    ("[a-z]{1,6}", arb_urgency(), arb_importance(), prop::option::of(0_u8..9)).prop_map(
        |(id, urgency, importance, priority)| Requirement {
            id,
            urgency,
            importance,
            priority,
            ..Requirement::default()
        },
    )
}

proptest! {
    #[test]
    fn score_is_in_range(u in arb_urgency(), i in arb_importance()) {
        let s = score(i, u);
        prop_assert!((1..=6).contains(&s.get()));
        prop_assert_eq!(PriorityScore::new(s.get()), Some(s));
    }

    /// Raising either axis never makes the score worse.
    #[test]
    fn score_is_monotone(u1 in arb_urgency(), u2 in arb_urgency(), i1 in arb_importance(), i2 in arb_importance()) {
        let (u_lo, u_hi) = if u1 <= u2 { (u1, u2) } else { (u2, u1) };
        let (i_lo, i_hi) = if i1 <= i2 { (i1, i2) } else { (i2, i1) };
        prop_assert!(score(i_hi, u_hi) <= score(i_lo, u_lo));
        prop_assert!(score(i_lo, u_hi) <= score(i_lo, u_lo));
        prop_assert!(score(i_hi, u_lo) <= score(i_lo, u_lo));
    }

    #[test]
    fn lenient_scoring_never_panics(i in ".{0,12}", u in ".{0,12}") {
        let s = score_lenient(Some(i.as_str()), Some(u.as_str()));
        let expected = score(
            ImportanceLevel::parse_lenient(Some(i.as_str())),
            UrgencyLevel::parse_lenient(Some(u.as_str())),
        );
        prop_assert_eq!(s, expected);
    }

    #[test]
    fn rank_is_sorted_permutation(items in prop::collection::vec(arb_requirement(), 0..30)) {
        let ranked = rank(&items);
        prop_assert_eq!(ranked.len(), items.len());
        for pair in ranked.windows(2) {
            prop_assert!(effective_priority(pair[0]) <= effective_priority(pair[1]));
        }
    }

    #[test]
    fn reconcile_clears_drift(mut items in prop::collection::vec(arb_requirement(), 0..30)) {
        for item in &mut items {
            reconcile(item);
        }
        prop_assert!(drift(&items).is_empty());
    }
}
