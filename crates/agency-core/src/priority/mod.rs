//! Eisenhower urgency/importance priority scoring.
//!
//! The classic four quadrants are refined into six buckets so list views can
//! sort at a finer grain. Score `1` is the most urgent-and-important bucket,
//! `6` the least.
//!
//! | urgency \ importance | low | medium | high |
//! |----------------------|-----|--------|------|
//! | critical             | 4   | 3      | 1    |
//! | high                 | 5   | 3      | 2    |
//! | medium               | 5   | 4      | 3    |
//! | low                  | 6   | 5      | 4    |
//!
//! Urgency dominates once both axes are elevated, but bucket 1 also requires
//! high importance: critical-but-unimportant work lands in bucket 4.
//!
//! Presentation lookups ([`PriorityScore::label`], [`PriorityScore::class`],
//! [`PriorityScore::border`]) are total over the six buckets.

mod rank;

pub use rank::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ImportanceLevel, Lenient, UrgencyLevel};

/// A priority bucket in `1..=6`; lower is more urgent-and-important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriorityScore(u8);

impl PriorityScore {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(6);

    /// Every bucket, highest priority first.
    pub const ALL: [Self; 6] = [Self(1), Self(2), Self(3), Self(4), Self(5), Self(6)];

    /// Wrap a raw bucket value, rejecting anything outside `1..=6`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= 6 {
            Some(Self(value))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Display label for the bucket.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "Critical",
            2 => "High",
            3 => "Medium-High",
            4 => "Medium",
            5 => "Low",
            _ => "Minimal",
        }
    }

    /// Background and text colour classes for badges.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self.0 {
            1 => "bg-red-100 text-red-800",
            2 => "bg-orange-100 text-orange-800",
            3 => "bg-yellow-100 text-yellow-800",
            4 => "bg-blue-100 text-blue-800",
            5 => "bg-green-100 text-green-800",
            _ => "bg-gray-100 text-gray-800",
        }
    }

    /// Left-border accent class for cards and rows.
    #[must_use]
    pub const fn border(self) -> &'static str {
        match self.0 {
            1 => "border-l-red-500",
            2 => "border-l-orange-500",
            3 => "border-l-yellow-500",
            4 => "border-l-blue-500",
            5 => "border-l-green-500",
            _ => "border-l-gray-500",
        }
    }

    #[must_use]
    pub const fn badge(self) -> PriorityBadge {
        PriorityBadge {
            score: self,
            label: self.label(),
            class: self.class(),
            border: self.border(),
        }
    }
}

impl Default for PriorityScore {
    fn default() -> Self {
        score(ImportanceLevel::default(), UrgencyLevel::default())
    }
}

impl fmt::Display for PriorityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for PriorityScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("priority must be in 1..=6, got {value}"))
    }
}

impl From<PriorityScore> for u8 {
    fn from(score: PriorityScore) -> Self {
        score.0
    }
}

/// Everything a badge needs to render a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityBadge {
    pub score: PriorityScore,
    pub label: &'static str,
    pub class: &'static str,
    pub border: &'static str,
}

/// Score an (importance, urgency) pair. First matching rule wins.
#[must_use]
pub const fn score(importance: ImportanceLevel, urgency: UrgencyLevel) -> PriorityScore {
    use ImportanceLevel as I;
    use UrgencyLevel as U;

    let bucket = match (urgency, importance) {
        (U::Critical, I::High) => 1,
        (U::High, I::High) => 2,
        (U::Critical | U::High, I::Medium) | (U::Medium, I::High) => 3,
        (U::Low, I::High) | (U::Medium, I::Medium) | (U::Critical, I::Low) => 4,
        (U::High | U::Medium, I::Low) | (U::Low, I::Medium) => 5,
        (U::Low, I::Low) => 6,
    };
    PriorityScore(bucket)
}

/// Score raw form values. Missing or unrecognised values count as `medium`.
#[must_use]
pub fn score_lenient(importance: Option<&str>, urgency: Option<&str>) -> PriorityScore {
    score(
        ImportanceLevel::parse_lenient(importance),
        UrgencyLevel::parse_lenient(urgency),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_pairs() -> impl Iterator<Item = (ImportanceLevel, UrgencyLevel)> {
        ImportanceLevel::ALL
            .into_iter()
            .flat_map(|i| UrgencyLevel::ALL.into_iter().map(move |u| (i, u)))
    }

    #[test]
    fn every_pair_scores_in_range() {
        let mut count = 0;
        for (importance, urgency) in all_pairs() {
            let value = score(importance, urgency).get();
            assert!((1..=6).contains(&value), "{importance}/{urgency} -> {value}");
            assert_eq!(score(importance, urgency), score(importance, urgency));
            count += 1;
        }
        assert_eq!(count, 12);
    }

    #[test]
    fn only_critical_high_scores_one_and_only_low_low_scores_six() {
        let ones: Vec<_> = all_pairs()
            .filter(|&(i, u)| score(i, u) == PriorityScore::HIGHEST)
            .collect();
        assert_eq!(ones, vec![(ImportanceLevel::High, UrgencyLevel::Critical)]);

        let sixes: Vec<_> = all_pairs()
            .filter(|&(i, u)| score(i, u) == PriorityScore::LOWEST)
            .collect();
        assert_eq!(sixes, vec![(ImportanceLevel::Low, UrgencyLevel::Low)]);
    }

    #[test]
    fn every_bucket_is_reachable() {
        let reached: HashSet<_> = all_pairs().map(|(i, u)| score(i, u)).collect();
        assert_eq!(reached.len(), 6);
    }

    #[test]
    fn full_matrix() {
        use ImportanceLevel as I;
        use UrgencyLevel as U;

        let expected = [
            (U::Critical, [4, 3, 1]),
            (U::High, [5, 3, 2]),
            (U::Medium, [5, 4, 3]),
            (U::Low, [6, 5, 4]),
        ];
        for (urgency, row) in expected {
            for (importance, want) in [I::Low, I::Medium, I::High].into_iter().zip(row) {
                assert_eq!(
                    score(importance, urgency).get(),
                    want,
                    "urgency={urgency} importance={importance}"
                );
            }
        }
    }

    #[test]
    fn critical_but_unimportant_is_not_top_bucket() {
        assert_eq!(score(ImportanceLevel::Low, UrgencyLevel::Critical).get(), 4);
    }

    #[test]
    fn worked_examples() {
        let s = score(ImportanceLevel::Medium, UrgencyLevel::Critical);
        assert_eq!((s.get(), s.label()), (3, "Medium-High"));

        let s = score(ImportanceLevel::Low, UrgencyLevel::Low);
        assert_eq!((s.get(), s.label()), (6, "Minimal"));

        let s = score(ImportanceLevel::High, UrgencyLevel::High);
        assert_eq!((s.get(), s.label()), (2, "High"));
    }

    #[test]
    fn lenient_scoring_defaults_missing_to_medium() {
        assert_eq!(score_lenient(None, None).get(), 4);
        assert_eq!(score_lenient(Some("high"), None).get(), 3);
        assert_eq!(score_lenient(None, Some("critical")).get(), 3);
        assert_eq!(score_lenient(Some("critical"), Some("critical")).get(), 3);
        assert_eq!(score_lenient(Some("bogus"), Some("low")).get(), 5);
        assert_eq!(PriorityScore::default().get(), 4);
    }

    #[test]
    fn lookups_are_total_and_distinct() {
        let labels: HashSet<_> = PriorityScore::ALL.iter().map(|s| s.label()).collect();
        let classes: HashSet<_> = PriorityScore::ALL.iter().map(|s| s.class()).collect();
        let borders: HashSet<_> = PriorityScore::ALL.iter().map(|s| s.border()).collect();
        assert_eq!(labels.len(), 6);
        assert_eq!(classes.len(), 6);
        assert_eq!(borders.len(), 6);
        for s in PriorityScore::ALL {
            assert!(!s.label().is_empty());
            assert!(s.class().starts_with("bg-"));
            assert!(s.border().starts_with("border-l-"));
        }
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(PriorityScore::new(0).is_none());
        assert!(PriorityScore::new(7).is_none());
        assert_eq!(PriorityScore::new(6), Some(PriorityScore::LOWEST));
    }

    #[test]
    fn serde_uses_bare_integer() {
        assert_eq!(serde_json::to_string(&PriorityScore::HIGHEST).unwrap(), "1");
        assert_eq!(
            serde_json::from_str::<PriorityScore>("3").unwrap().label(),
            "Medium-High"
        );
        assert!(serde_json::from_str::<PriorityScore>("9").is_err());
    }

    #[test]
    fn badge_bundles_lookups() {
        let badge = PriorityScore::HIGHEST.badge();
        assert_eq!(badge.label, "Critical");
        assert_eq!(badge.class, "bg-red-100 text-red-800");
        assert_eq!(badge.border, "border-l-red-500");
        assert_eq!(
            serde_json::to_value(badge).unwrap()["score"],
            serde_json::json!(1)
        );
    }
}
