use super::{Chain, Resolution, Selection, Tier};

/// Selection state for one mounted form.
///
/// Created when the form opens, updated on every select change, dropped on
/// submit or unmount. The selection is always the resolved one, so it never
/// points at a candidate the form is not showing.
#[derive(Debug)]
pub struct FormState<'a> {
    chain: Chain<'a>,
    resolution: Resolution,
    filled: Vec<Tier>,
}

impl<'a> FormState<'a> {
    /// Open a form with optional default ids. Missing ancestors of the
    /// defaults are back-filled once, then the selection is resolved.
    #[must_use]
    pub fn new(chain: Chain<'a>, mut defaults: Selection) -> Self {
        let filled = chain.backfill(&mut defaults);
        if !filled.is_empty() {
            tracing::debug!(?filled, "form opened with back-filled ancestors");
        }
        let resolution = chain.resolve(&defaults);
        Self {
            chain,
            resolution,
            filled,
        }
    }

    /// Tiers back-filled when the form opened, innermost first.
    #[must_use]
    pub fn filled(&self) -> &[Tier] {
        &self.filled
    }

    /// Change one tier and re-resolve. Returns the tiers that were cleared
    /// as a result (possibly including `tier` itself, if `id` is not a
    /// candidate).
    pub fn select(&mut self, tier: Tier, id: Option<&str>) -> Vec<Tier> {
        let mut next = self.resolution.selection.clone();
        next.set(tier, id.map(str::to_string));
        self.resolution = self.chain.resolve(&next);
        self.resolution.cleared.clone()
    }

    /// Unset a tier and everything that depended on it. Clearing an empty
    /// tier is a no-op.
    pub fn clear(&mut self, tier: Tier) -> Vec<Tier> {
        if self.resolution.selection.get(tier).is_none() {
            return Vec::new();
        }
        self.select(tier, None)
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.resolution.selection
    }

    #[must_use]
    pub fn candidates(&self, tier: Tier) -> &[String] {
        self.resolution.candidates(tier)
    }

    #[must_use]
    pub const fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Finish the form, handing back the final selection.
    #[must_use]
    pub fn into_selection(self) -> Selection {
        self.resolution.selection
    }
}
