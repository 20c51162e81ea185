//! Cascading Client → Project → Set → Pitch selection.
//!
//! Creation and edit forms pick a parent at each tier. Picking an ancestor
//! narrows the candidates below it, and any descendant selection that falls
//! outside its narrowed candidates is cleared. This module expresses that
//! once, as a [`Chain`] of [`Level`]s, instead of per form.
//!
//! # Filtering rules
//!
//! For each level, walk its ancestors nearest first and stop at the first one
//! with a selection:
//!
//! - if the level's records carry a foreign key to that ancestor, keep records
//!   whose key matches;
//! - otherwise keep records whose parent (the level directly above) is among
//!   the parent's own filtered candidates.
//!
//! With no ancestor selected, every record is a candidate. A set with no
//! project is therefore valid under its client until a project is picked.
//!
//! # Initialisation
//!
//! [`Chain::backfill`] fills empty ancestors from the foreign keys of a
//! pre-selected deep record (for example the client of a default project). It
//! never overwrites an ancestor the caller supplied.
//!
//! Nothing here fails: unloaded lists behave as empty, and invalid selections
//! are cleared and logged at `debug`.

mod chain;
mod form;

pub use chain::*;
pub use form::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::{Client, ParseEnumError, Pitch, Project, Set};

/// A level of the selection hierarchy, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Client,
    Project,
    Set,
    Pitch,
}

impl Tier {
    pub const ALL: [Self; 4] = [Self::Client, Self::Project, Self::Set, Self::Pitch];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Project => "project",
            Self::Set => "set",
            Self::Pitch => "pitch",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                expected: "tier",
                got: s.to_string(),
            })
    }
}

/// A selectable record: an id plus foreign keys to ancestor tiers.
pub trait Node {
    fn id(&self) -> &str;

    /// The id of this record's ancestor at `tier`, if it has one.
    fn parent_id(&self, tier: Tier) -> Option<&str>;
}

/// Static shape of a [`Node`] type.
pub trait Entity: Node {
    const TIER: Tier;

    /// Tiers this record carries a foreign key for, nearest first.
    const PARENT_TIERS: &'static [Tier];
}

impl Node for Client {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self, _tier: Tier) -> Option<&str> {
        None
    }
}

impl Entity for Client {
    const TIER: Tier = Tier::Client;
    const PARENT_TIERS: &'static [Tier] = &[];
}

impl Node for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Client => self.client_id.as_deref(),
            _ => None,
        }
    }
}

impl Entity for Project {
    const TIER: Tier = Tier::Project;
    const PARENT_TIERS: &'static [Tier] = &[Tier::Client];
}

impl Node for Set {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Project => self.project_id.as_deref(),
            Tier::Client => self.client_id.as_deref(),
            _ => None,
        }
    }
}

impl Entity for Set {
    const TIER: Tier = Tier::Set;
    const PARENT_TIERS: &'static [Tier] = &[Tier::Project, Tier::Client];
}

impl Node for Pitch {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Set => self.set_id.as_deref(),
            _ => None,
        }
    }
}

impl Entity for Pitch {
    const TIER: Tier = Tier::Pitch;
    const PARENT_TIERS: &'static [Tier] = &[Tier::Set];
}

/// Filtering and validation for one tier's candidates.
pub trait HierarchyLevel {
    fn tier(&self) -> Tier;

    /// Whether records at this level carry a foreign key to `parent`.
    fn carries(&self, parent: Tier) -> bool;

    /// Records whose `parent` key equals `parent_id`; all records when
    /// `parent_id` is `None`.
    fn filter_children(&self, parent: Tier, parent_id: Option<&str>) -> Vec<&dyn Node>;

    /// Keep `current_id` only if it names one of `candidates`.
    fn validate_selection(
        &self,
        current_id: Option<&str>,
        candidates: &[&dyn Node],
    ) -> Option<String> {
        let current = current_id?;
        candidates
            .iter()
            .any(|node| node.id() == current)
            .then(|| current.to_string())
    }
}

/// One tier's records, borrowed from the caller.
pub struct Level<'a> {
    tier: Tier,
    parent_tiers: &'static [Tier],
    loaded: bool,
    nodes: Vec<&'a dyn Node>,
}

impl<'a> Level<'a> {
    /// Wrap a list of records. `None` means the list has not loaded yet.
    #[must_use]
    pub fn new<T: Entity + 'a>(items: Option<&'a [T]>) -> Self {
        Self {
            tier: T::TIER,
            parent_tiers: T::PARENT_TIERS,
            loaded: items.is_some(),
            nodes: items
                .unwrap_or_default()
                .iter()
                .map(|item| item as &dyn Node)
                .collect(),
        }
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub const fn parent_tiers(&self) -> &'static [Tier] {
        self.parent_tiers
    }

    /// Look a record up by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&dyn Node> {
        self.nodes.iter().copied().find(|node| node.id() == id)
    }

    /// Records whose `parent` key names one of `parents`.
    #[must_use]
    pub fn filter_by_membership(&self, parent: Tier, parents: &[&dyn Node]) -> Vec<&dyn Node> {
        self.nodes
            .iter()
            .copied()
            .filter(|node| {
                node.parent_id(parent)
                    .is_some_and(|pid| parents.iter().any(|p| p.id() == pid))
            })
            .collect()
    }
}

impl HierarchyLevel for Level<'_> {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn carries(&self, parent: Tier) -> bool {
        self.parent_tiers.contains(&parent)
    }

    fn filter_children(&self, parent: Tier, parent_id: Option<&str>) -> Vec<&dyn Node> {
        match parent_id {
            None => self.nodes.clone(),
            Some(id) => self
                .nodes
                .iter()
                .copied()
                .filter(|node| node.parent_id(parent) == Some(id))
                .collect(),
        }
    }
}

impl fmt::Debug for Level<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("tier", &self.tier)
            .field("loaded", &self.loaded)
            .field("len", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, client: &str) -> Project {
        Project {
            id: id.to_string(),
            client_id: Some(client.to_string()),
            name: id.to_uppercase(),
        }
    }

    fn ids(nodes: &[&dyn Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id().to_string()).collect()
    }

    #[test]
    fn filter_children_by_client() {
        let projects = vec![project("p1", "a"), project("p2", "b"), project("p3", "a")];
        let level = Level::new(Some(projects.as_slice()));
        assert_eq!(
            ids(&level.filter_children(Tier::Client, Some("a"))),
            ["p1", "p3"]
        );
        assert_eq!(ids(&level.filter_children(Tier::Client, None)).len(), 3);
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Project".parse::<Tier>(), Ok(Tier::Project));
        assert_eq!(" pitch ".parse::<Tier>(), Ok(Tier::Pitch));
        assert!("phase".parse::<Tier>().is_err());
    }

    #[test]
    fn unloaded_level_is_empty() {
        let level = Level::new::<Project>(None);
        assert!(!level.is_loaded());
        assert!(level.filter_children(Tier::Client, None).is_empty());
        assert!(level.find("p1").is_none());
    }

    #[test]
    fn validate_selection_keeps_members_only() {
        let projects = vec![project("p1", "a"), project("p2", "b")];
        let level = Level::new(Some(projects.as_slice()));
        let for_a = level.filter_children(Tier::Client, Some("a"));

        assert_eq!(
            level.validate_selection(Some("p1"), &for_a),
            Some("p1".to_string())
        );
        assert_eq!(level.validate_selection(Some("p2"), &for_a), None);
        assert_eq!(level.validate_selection(None, &for_a), None);
    }

    #[test]
    fn set_carries_project_before_client() {
        assert_eq!(Set::PARENT_TIERS, &[Tier::Project, Tier::Client]);
        let set = Set {
            id: "s1".to_string(),
            client_id: Some("a".to_string()),
            project_id: None,
            ..Set::default()
        };
        assert_eq!(set.parent_id(Tier::Client), Some("a"));
        assert_eq!(set.parent_id(Tier::Project), None);
        assert_eq!(set.parent_id(Tier::Pitch), None);
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Pitch).unwrap(), "\"pitch\"");
        assert_eq!(Tier::Set.to_string(), "set");
    }
}
