use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{HierarchyLevel, Level, Node, Tier};
use crate::model::{Client, Dataset, ParseEnumError, Pitch, Project, Set};

/// The chosen id at each tier of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    ids: BTreeMap<Tier, String>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Selection::set`].
    #[must_use]
    pub fn with(mut self, tier: Tier, id: impl Into<String>) -> Self {
        self.set(tier, Some(id.into()));
        self
    }

    #[must_use]
    pub fn get(&self, tier: Tier) -> Option<&str> {
        self.ids.get(&tier).map(String::as_str)
    }

    /// Set or unset a tier. Empty ids count as unset.
    pub fn set(&mut self, tier: Tier, id: Option<String>) {
        match id.filter(|value| !value.trim().is_empty()) {
            Some(value) => {
                self.ids.insert(tier, value);
            }
            None => {
                self.ids.remove(&tier);
            }
        }
    }

    /// Unset a tier. Returns `true` if it held a value.
    pub fn clear(&mut self, tier: Tier) -> bool {
        self.ids.remove(&tier).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Outcome of resolving a selection against a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The corrected selection.
    pub selection: Selection,
    /// Filtered candidate ids per tier, in list order.
    pub candidates: BTreeMap<Tier, Vec<String>>,
    /// Tiers whose selection was cleared, outermost first.
    pub cleared: Vec<Tier>,
}

impl Resolution {
    /// Candidate ids for `tier`; empty for tiers outside the chain.
    #[must_use]
    pub fn candidates(&self, tier: Tier) -> &[String] {
        self.candidates.get(&tier).map_or(&[], Vec::as_slice)
    }
}

/// Which form a chain is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// Client → Project → Set → Pitch.
    Requirement,
    /// Client → Project.
    Set,
    /// Client → Project → Set.
    Pitch,
    /// Client → Project.
    Phase,
}

impl FormKind {
    pub const ALL: [Self; 4] = [Self::Requirement, Self::Set, Self::Pitch, Self::Phase];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Requirement => "requirement",
            Self::Set => "set",
            Self::Pitch => "pitch",
            Self::Phase => "phase",
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requirement" => Ok(Self::Requirement),
            "set" => Ok(Self::Set),
            "pitch" => Ok(Self::Pitch),
            "phase" => Ok(Self::Phase),
            _ => Err(ParseEnumError {
                expected: "form",
                got: s.to_string(),
            }),
        }
    }
}

/// An ordered list of levels, outermost first.
///
/// Every level below the first must carry a foreign key to the level directly
/// above it.
#[derive(Debug)]
pub struct Chain<'a> {
    levels: Vec<Level<'a>>,
}

impl<'a> Chain<'a> {
    #[must_use]
    pub fn new(levels: Vec<Level<'a>>) -> Self {
        debug_assert!(
            levels
                .windows(2)
                .all(|pair| pair[1].carries(pair[0].tier())),
            "each level must carry a key to its parent"
        );
        Self { levels }
    }

    /// Client → Project → Set → Pitch, used by requirement forms.
    #[must_use]
    pub fn requirement(
        clients: Option<&'a [Client]>,
        projects: Option<&'a [Project]>,
        sets: Option<&'a [Set]>,
        pitches: Option<&'a [Pitch]>,
    ) -> Self {
        Self::new(vec![
            Level::new(clients),
            Level::new(projects),
            Level::new(sets),
            Level::new(pitches),
        ])
    }

    /// Client → Project, used by set forms.
    #[must_use]
    pub fn set_form(clients: Option<&'a [Client]>, projects: Option<&'a [Project]>) -> Self {
        Self::new(vec![Level::new(clients), Level::new(projects)])
    }

    /// Client → Project → Set, used by pitch forms.
    #[must_use]
    pub fn pitch_form(
        clients: Option<&'a [Client]>,
        projects: Option<&'a [Project]>,
        sets: Option<&'a [Set]>,
    ) -> Self {
        Self::new(vec![
            Level::new(clients),
            Level::new(projects),
            Level::new(sets),
        ])
    }

    /// Client → Project, used by phase forms.
    #[must_use]
    pub fn phase_form(clients: Option<&'a [Client]>, projects: Option<&'a [Project]>) -> Self {
        Self::set_form(clients, projects)
    }

    /// Build the chain for `form` from a fetched dataset.
    #[must_use]
    pub fn from_dataset(form: FormKind, data: &'a Dataset) -> Self {
        let clients = data.clients.as_deref();
        let projects = data.projects.as_deref();
        match form {
            FormKind::Requirement => Self::requirement(
                clients,
                projects,
                data.sets.as_deref(),
                data.pitches.as_deref(),
            ),
            FormKind::Set => Self::set_form(clients, projects),
            FormKind::Pitch => Self::pitch_form(clients, projects, data.sets.as_deref()),
            FormKind::Phase => Self::phase_form(clients, projects),
        }
    }

    #[must_use]
    pub fn tiers(&self) -> Vec<Tier> {
        self.levels.iter().map(HierarchyLevel::tier).collect()
    }

    #[must_use]
    pub fn contains(&self, tier: Tier) -> bool {
        self.levels.iter().any(|level| level.tier() == tier)
    }

    /// Filter every level against `selection` and clear selections that no
    /// longer fit.
    ///
    /// Levels are processed outermost first and each one is filtered with the
    /// already-corrected selection above it, so a cleared ancestor cascades.
    /// Tiers outside the chain are dropped from the returned selection.
    /// A level that has not loaded yet lists no candidates, but its selection
    /// is kept: an unloaded list makes the id unknown, not invalid.
    #[must_use]
    pub fn resolve(&self, selection: &Selection) -> Resolution {
        let mut corrected = Selection::new();
        for level in &self.levels {
            corrected.set(level.tier(), selection.get(level.tier()).map(str::to_string));
        }

        let mut filtered: Vec<Vec<&dyn Node>> = Vec::with_capacity(self.levels.len());
        let mut cleared = Vec::new();

        for (index, level) in self.levels.iter().enumerate() {
            let candidates = self.candidates_for(index, &corrected, &filtered);
            let tier = level.tier();

            let stale = corrected.get(tier).is_some_and(|current| {
                level.is_loaded() && level.validate_selection(Some(current), &candidates).is_none()
            });
            if stale {
                tracing::debug!(
                    %tier,
                    id = corrected.get(tier).unwrap_or_default(),
                    "clearing selection outside candidates"
                );
                corrected.clear(tier);
                cleared.push(tier);
            }

            filtered.push(candidates);
        }

        let candidates = self
            .levels
            .iter()
            .zip(&filtered)
            .map(|(level, nodes)| {
                let ids = nodes.iter().map(|node| node.id().to_string()).collect();
                (level.tier(), ids)
            })
            .collect();

        Resolution {
            selection: corrected,
            candidates,
            cleared,
        }
    }

    fn candidates_for<'s>(
        &'s self,
        index: usize,
        selection: &Selection,
        above: &[Vec<&'s dyn Node>],
    ) -> Vec<&'s dyn Node> {
        let level = &self.levels[index];

        for ancestor in self.levels[..index].iter().rev() {
            let Some(ancestor_id) = selection.get(ancestor.tier()) else {
                continue;
            };

            if level.carries(ancestor.tier()) {
                return level.filter_children(ancestor.tier(), Some(ancestor_id));
            }

            // No direct key: go through the parent's narrowed list.
            let parent = &self.levels[index - 1];
            return level.filter_by_membership(parent.tier(), &above[index - 1]);
        }

        level.filter_children(level.tier(), None)
    }

    /// Fill empty ancestor tiers from the foreign keys of selected records,
    /// innermost first. Supplied ancestors are never overwritten.
    ///
    /// Records the caller supplied are walked before records that were only
    /// back-filled, so an explicit outer id decides its own ancestors even
    /// when an inner default points elsewhere. `resolve` then clears whichever
    /// inner selection no longer fits.
    ///
    /// Returns the tiers that were filled.
    pub fn backfill(&self, selection: &mut Selection) -> Vec<Tier> {
        let supplied: Vec<Tier> = self
            .levels
            .iter()
            .map(Level::tier)
            .filter(|&tier| selection.get(tier).is_some())
            .collect();
        let mut filled = Vec::new();

        for level in self.levels.iter().rev() {
            if supplied.contains(&level.tier()) {
                self.fill_parents(level, selection, &mut filled);
            }
        }
        for level in self.levels.iter().rev() {
            self.fill_parents(level, selection, &mut filled);
        }

        filled
    }

    fn fill_parents(&self, level: &Level<'_>, selection: &mut Selection, filled: &mut Vec<Tier>) {
        let Some(node) = selection
            .get(level.tier())
            .and_then(|id| level.find(id))
        else {
            return;
        };

        let fills: Vec<(Tier, String)> = level
            .parent_tiers()
            .iter()
            .filter(|&&parent| self.contains(parent) && selection.get(parent).is_none())
            .filter_map(|&parent| {
                node.parent_id(parent)
                    .map(|parent_id| (parent, parent_id.to_string()))
            })
            .collect();

        for (parent, parent_id) in fills {
            tracing::debug!(
                tier = %parent,
                id = %parent_id,
                from = %level.tier(),
                "back-filling ancestor selection"
            );
            selection.set(parent, Some(parent_id));
            filled.push(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn project(id: &str, client: &str) -> Project {
        Project {
            id: id.to_string(),
            client_id: Some(client.to_string()),
            name: id.to_string(),
        }
    }

    fn set(id: &str, client: &str, project: Option<&str>) -> Set {
        Set {
            id: id.to_string(),
            client_id: Some(client.to_string()),
            project_id: project.map(str::to_string),
            ..Set::default()
        }
    }

    fn pitch(id: &str, set: &str) -> Pitch {
        Pitch {
            id: id.to_string(),
            set_id: Some(set.to_string()),
            ..Pitch::default()
        }
    }

    struct Fixture {
        clients: Vec<Client>,
        projects: Vec<Project>,
        sets: Vec<Set>,
        pitches: Vec<Pitch>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clients: vec![client("a"), client("b")],
                projects: vec![project("pa1", "a"), project("pa2", "a"), project("pb1", "b")],
                sets: vec![
                    set("sa1", "a", Some("pa1")),
                    set("sa-loose", "a", None),
                    set("sb1", "b", Some("pb1")),
                ],
                pitches: vec![pitch("x1", "sa1"), pitch("x2", "sa-loose"), pitch("x3", "sb1")],
            }
        }

        fn chain(&self) -> Chain<'_> {
            Chain::requirement(
                Some(&self.clients),
                Some(&self.projects),
                Some(&self.sets),
                Some(&self.pitches),
            )
        }
    }

    #[test]
    fn nothing_selected_lists_everything() {
        let fx = Fixture::new();
        let res = fx.chain().resolve(&Selection::new());
        assert_eq!(res.candidates(Tier::Project).len(), 3);
        assert_eq!(res.candidates(Tier::Set).len(), 3);
        assert_eq!(res.candidates(Tier::Pitch).len(), 3);
        assert!(res.cleared.is_empty());
    }

    #[test]
    fn client_filters_projects() {
        let fx = Fixture::new();
        let res = fx.chain().resolve(&Selection::new().with(Tier::Client, "a"));
        assert_eq!(res.candidates(Tier::Project), ["pa1", "pa2"]);
        assert_eq!(res.candidates(Tier::Set), ["sa1", "sa-loose"]);
    }

    #[test]
    fn changing_client_clears_stale_descendants() {
        let fx = Fixture::new();
        let stale = Selection::new()
            .with(Tier::Client, "a")
            .with(Tier::Project, "pb1")
            .with(Tier::Set, "sb1")
            .with(Tier::Pitch, "x3");

        let res = fx.chain().resolve(&stale);
        assert_eq!(res.cleared, [Tier::Project, Tier::Set, Tier::Pitch]);
        assert_eq!(res.selection.get(Tier::Client), Some("a"));
        assert_eq!(res.selection.get(Tier::Project), None);
        assert_eq!(res.selection.get(Tier::Set), None);
    }

    #[test]
    fn projectless_set_visible_only_without_project() {
        let fx = Fixture::new();
        let chain = fx.chain();

        let res = chain.resolve(&Selection::new().with(Tier::Client, "a"));
        assert!(res.candidates(Tier::Set).contains(&"sa-loose".to_string()));

        let res = chain.resolve(
            &Selection::new()
                .with(Tier::Client, "a")
                .with(Tier::Project, "pa1"),
        );
        assert_eq!(res.candidates(Tier::Set), ["sa1"]);
    }

    #[test]
    fn selecting_project_clears_projectless_set() {
        let fx = Fixture::new();
        let res = fx.chain().resolve(
            &Selection::new()
                .with(Tier::Client, "a")
                .with(Tier::Set, "sa-loose")
                .with(Tier::Project, "pa2"),
        );
        assert_eq!(res.cleared, [Tier::Set]);
        assert!(res.candidates(Tier::Set).is_empty());
    }

    #[test]
    fn pitches_cascade_through_sets_when_set_unselected() {
        let fx = Fixture::new();
        let chain = fx.chain();

        let res = chain.resolve(&Selection::new().with(Tier::Client, "a"));
        assert_eq!(res.candidates(Tier::Pitch), ["x1", "x2"]);

        let res = chain.resolve(
            &Selection::new()
                .with(Tier::Client, "a")
                .with(Tier::Project, "pa1"),
        );
        assert_eq!(res.candidates(Tier::Pitch), ["x1"]);

        let res = chain.resolve(&Selection::new().with(Tier::Set, "sb1"));
        assert_eq!(res.candidates(Tier::Pitch), ["x3"]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let first = chain.resolve(
            &Selection::new()
                .with(Tier::Client, "b")
                .with(Tier::Project, "pa1"),
        );
        let second = chain.resolve(&first.selection);
        assert_eq!(first.selection, second.selection);
        assert!(second.cleared.is_empty());
    }

    #[test]
    fn unknown_client_is_cleared_and_projects_unfiltered() {
        let fx = Fixture::new();
        let res = fx.chain().resolve(&Selection::new().with(Tier::Client, "zzz"));
        assert_eq!(res.cleared, [Tier::Client]);
        assert_eq!(res.candidates(Tier::Project).len(), 3);
    }

    #[test]
    fn unloaded_lists_are_empty_but_keep_selection() {
        let projects = vec![project("pa1", "a")];
        let chain = Chain::requirement(None, Some(&projects), None, None);
        let res = chain.resolve(
            &Selection::new()
                .with(Tier::Client, "a")
                .with(Tier::Set, "s-not-fetched"),
        );
        assert!(res.candidates(Tier::Client).is_empty());
        assert!(res.candidates(Tier::Set).is_empty());
        assert_eq!(res.candidates(Tier::Project), ["pa1"]);
        assert_eq!(res.selection.get(Tier::Client), Some("a"));
        assert_eq!(res.selection.get(Tier::Set), Some("s-not-fetched"));
        assert!(res.cleared.is_empty());
    }

    #[test]
    fn tiers_outside_chain_are_dropped() {
        let fx = Fixture::new();
        let chain = Chain::set_form(Some(&fx.clients), Some(&fx.projects));
        let res = chain.resolve(
            &Selection::new()
                .with(Tier::Client, "a")
                .with(Tier::Pitch, "x1"),
        );
        assert_eq!(res.selection.get(Tier::Pitch), None);
        assert!(res.candidates(Tier::Pitch).is_empty());
        assert_eq!(chain.tiers(), [Tier::Client, Tier::Project]);
    }

    #[test]
    fn backfill_from_default_project() {
        let fx = Fixture::new();
        let mut selection = Selection::new().with(Tier::Project, "pb1");
        let filled = fx.chain().backfill(&mut selection);
        assert_eq!(filled, [Tier::Client]);
        assert_eq!(selection.get(Tier::Client), Some("b"));
    }

    #[test]
    fn backfill_from_default_pitch_walks_to_root() {
        let fx = Fixture::new();
        let mut selection = Selection::new().with(Tier::Pitch, "x1");
        let filled = fx.chain().backfill(&mut selection);
        assert_eq!(filled, [Tier::Set, Tier::Project, Tier::Client]);
        assert_eq!(selection.get(Tier::Set), Some("sa1"));
        assert_eq!(selection.get(Tier::Project), Some("pa1"));
        assert_eq!(selection.get(Tier::Client), Some("a"));
    }

    #[test]
    fn backfill_never_overwrites_supplied_ancestor() {
        let fx = Fixture::new();
        let mut selection = Selection::new()
            .with(Tier::Client, "b")
            .with(Tier::Project, "pa1");
        let filled = fx.chain().backfill(&mut selection);
        assert!(filled.is_empty());
        assert_eq!(selection.get(Tier::Client), Some("b"));
    }

    #[test]
    fn backfill_lets_supplied_project_pick_client_over_pitch_chain() {
        let fx = Fixture::new();
        let mut selection = Selection::new()
            .with(Tier::Pitch, "x1")
            .with(Tier::Project, "pb1");
        let filled = fx.chain().backfill(&mut selection);
        assert_eq!(filled, [Tier::Set, Tier::Client]);
        assert_eq!(selection.get(Tier::Client), Some("b"));

        let res = fx.chain().resolve(&selection);
        assert_eq!(res.selection.get(Tier::Project), Some("pb1"));
        assert_eq!(res.cleared, [Tier::Set, Tier::Pitch]);
    }

    #[test]
    fn backfill_of_projectless_set_fills_client_only() {
        let fx = Fixture::new();
        let mut selection = Selection::new().with(Tier::Set, "sa-loose");
        let filled = fx.chain().backfill(&mut selection);
        assert_eq!(filled, [Tier::Client]);
        assert_eq!(selection.get(Tier::Project), None);
    }

    #[test]
    fn backfill_ignores_unknown_ids() {
        let fx = Fixture::new();
        let mut selection = Selection::new().with(Tier::Project, "ghost");
        assert!(fx.chain().backfill(&mut selection).is_empty());
        assert_eq!(selection.get(Tier::Client), None);
    }

    #[test]
    fn selection_treats_blank_as_unset() {
        let mut selection = Selection::new().with(Tier::Client, "  ");
        assert!(selection.is_empty());
        assert!(!selection.clear(Tier::Client));
        selection.set(Tier::Client, Some("a".to_string()));
        assert!(selection.clear(Tier::Client));
        assert!(!selection.clear(Tier::Client));
    }

    #[test]
    fn selection_serializes_as_map() {
        let selection = Selection::new()
            .with(Tier::Client, "a")
            .with(Tier::Project, "pa1");
        assert_eq!(
            serde_json::to_value(&selection).unwrap(),
            serde_json::json!({"client": "a", "project": "pa1"})
        );
        let parsed: Selection = serde_json::from_str(r#"{"set": "s1"}"#).unwrap();
        assert_eq!(parsed.get(Tier::Set), Some("s1"));
    }

    #[test]
    fn chain_from_dataset_matches_form() {
        let data = Dataset::default();
        for form in FormKind::ALL {
            let chain = Chain::from_dataset(form, &data);
            let expected: &[Tier] = match form {
                FormKind::Requirement => &Tier::ALL,
                FormKind::Set | FormKind::Phase => &[Tier::Client, Tier::Project],
                FormKind::Pitch => &[Tier::Client, Tier::Project, Tier::Set],
            };
            assert_eq!(chain.tiers(), expected, "{form}");
        }
    }

    #[test]
    fn form_kind_parses() {
        assert_eq!("Pitch".parse::<FormKind>().unwrap(), FormKind::Pitch);
        assert!("portal".parse::<FormKind>().is_err());
    }
}
