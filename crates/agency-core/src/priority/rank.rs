use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

use super::{PriorityScore, score};
use crate::model::{ImportanceLevel, Phase, Pitch, Requirement, Set, UrgencyLevel};

/// A record that carries urgency/importance and a persisted priority.
///
/// The persisted `priority` is a cache: it is never trusted for ordering.
/// [`effective_priority`] recomputes from the two axes on every read, and
/// [`reconcile`] refreshes the cache before a write.
pub trait Prioritized {
    fn id(&self) -> &str;
    fn urgency(&self) -> UrgencyLevel;
    fn importance(&self) -> ImportanceLevel;
    fn stored_priority(&self) -> Option<u8>;
    fn set_stored_priority(&mut self, value: Option<u8>);
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

macro_rules! impl_prioritized {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Prioritized for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn urgency(&self) -> UrgencyLevel {
                    self.urgency
                }

                fn importance(&self) -> ImportanceLevel {
                    self.importance
                }

                fn stored_priority(&self) -> Option<u8> {
                    self.priority
                }

                fn set_stored_priority(&mut self, value: Option<u8>) {
                    self.priority = value;
                }

                fn created_at(&self) -> Option<DateTime<Utc>> {
                    self.created_at
                }
            }
        )+
    };
}

impl_prioritized!(Set, Pitch, Phase, Requirement);

/// The score an item should display, recomputed from its axes.
#[must_use]
pub fn effective_priority<P: Prioritized + ?Sized>(item: &P) -> PriorityScore {
    score(item.importance(), item.urgency())
}

/// Order items for list views: score ascending, then oldest first (undated
/// items last), then id.
#[must_use]
pub fn rank<P: Prioritized>(items: &[P]) -> Vec<&P> {
    let mut ranked: Vec<&P> = items.iter().collect();
    ranked.sort_by(|a, b| compare(*a, *b));
    ranked
}

fn compare<P: Prioritized>(a: &P, b: &P) -> Ordering {
    effective_priority(a)
        .cmp(&effective_priority(b))
        .then_with(|| match (a.created_at(), b.created_at()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id().cmp(b.id()))
}

/// A persisted priority that disagrees with the recomputed score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityDrift {
    pub id: String,
    pub stored: Option<u8>,
    pub computed: PriorityScore,
}

/// `true` when the persisted priority is missing or disagrees with the axes.
#[must_use]
pub fn is_stale<P: Prioritized + ?Sized>(item: &P) -> bool {
    item.stored_priority() != Some(effective_priority(item).get())
}

/// Report every item whose persisted priority is missing or stale.
#[must_use]
pub fn drift<P: Prioritized>(items: &[P]) -> Vec<PriorityDrift> {
    items
        .iter()
        .filter(|item| is_stale(*item))
        .map(|item| PriorityDrift {
            id: item.id().to_string(),
            stored: item.stored_priority(),
            computed: effective_priority(item),
        })
        .collect()
}

/// Refresh the persisted priority before a write. Returns `true` if it changed.
pub fn reconcile<P: Prioritized + ?Sized>(item: &mut P) -> bool {
    let computed = effective_priority(item).get();
    if item.stored_priority() == Some(computed) {
        return false;
    }
    tracing::debug!(
        id = item.id(),
        stored = ?item.stored_priority(),
        computed,
        "refreshing stale priority"
    );
    item.set_stored_priority(Some(computed));
    true
}
