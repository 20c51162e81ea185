use agency_core::model::{Dataset, ImportanceLevel, Phase, Pitch, Requirement, Set, UrgencyLevel};
use agency_core::priority::{PriorityScore, Prioritized, effective_priority, is_stale, rank};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{load_dataset, project_config};
use crate::output::{OutputMode, Renderable, render_list};

/// Arguments for `ag rank`.
#[derive(Args, Debug)]
pub struct RankArgs {
    /// JSON dataset to rank, or `-` for stdin.
    #[arg(long)]
    pub input: PathBuf,

    /// Which records to rank.
    #[arg(long, value_enum, default_value_t = RankKind::All)]
    pub kind: RankKind,

    /// Only list records whose stored priority is missing or stale.
    #[arg(long)]
    pub drift_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RankKind {
    Requirements,
    Sets,
    Pitches,
    Phases,
    All,
}

impl RankKind {
    fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }

    const fn singular(self) -> &'static str {
        match self {
            Self::Requirements => "requirement",
            Self::Sets => "set",
            Self::Pitches => "pitch",
            Self::Phases => "phase",
            Self::All => "item",
        }
    }
}

/// Any prioritized record, so mixed kinds rank together.
#[derive(Debug)]
enum Item {
    Requirement(Requirement),
    Set(Set),
    Pitch(Pitch),
    Phase(Phase),
}

impl Item {
    const fn kind(&self) -> RankKind {
        match self {
            Self::Requirement(_) => RankKind::Requirements,
            Self::Set(_) => RankKind::Sets,
            Self::Pitch(_) => RankKind::Pitches,
            Self::Phase(_) => RankKind::Phases,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Requirement(r) => &r.title,
            Self::Set(s) => &s.name,
            Self::Pitch(p) => &p.name,
            Self::Phase(p) => &p.name,
        }
    }

    fn inner(&self) -> &dyn Prioritized {
        match self {
            Self::Requirement(r) => r,
            Self::Set(s) => s,
            Self::Pitch(p) => p,
            Self::Phase(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Prioritized {
        match self {
            Self::Requirement(r) => r,
            Self::Set(s) => s,
            Self::Pitch(p) => p,
            Self::Phase(p) => p,
        }
    }
}

impl Prioritized for Item {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn urgency(&self) -> UrgencyLevel {
        self.inner().urgency()
    }

    fn importance(&self) -> ImportanceLevel {
        self.inner().importance()
    }

    fn stored_priority(&self) -> Option<u8> {
        self.inner().stored_priority()
    }

    fn set_stored_priority(&mut self, value: Option<u8>) {
        self.inner_mut().set_stored_priority(value);
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.inner().created_at()
    }
}

fn collect_items(data: Dataset, kind: RankKind) -> Vec<Item> {
    let mut items = Vec::new();
    if kind.includes(RankKind::Requirements) {
        items.extend(
            data.requirements
                .unwrap_or_default()
                .into_iter()
                .map(Item::Requirement),
        );
    }
    if kind.includes(RankKind::Sets) {
        items.extend(data.sets.unwrap_or_default().into_iter().map(Item::Set));
    }
    if kind.includes(RankKind::Pitches) {
        items.extend(data.pitches.unwrap_or_default().into_iter().map(Item::Pitch));
    }
    if kind.includes(RankKind::Phases) {
        items.extend(data.phases.unwrap_or_default().into_iter().map(Item::Phase));
    }
    items
}

/// One ranked record.
#[derive(Debug, Clone, Serialize)]
pub struct RankRow {
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub urgency: UrgencyLevel,
    pub importance: ImportanceLevel,
    pub score: PriorityScore,
    pub label: &'static str,
    pub stored: Option<u8>,
    pub drift: bool,
}

impl RankRow {
    fn from_item(item: &Item) -> Self {
        let score = effective_priority(item);
        Self {
            kind: item.kind().singular(),
            id: item.id().to_string(),
            name: item.name().to_string(),
            urgency: item.urgency(),
            importance: item.importance(),
            score,
            label: score.label(),
            stored: item.stored_priority(),
            drift: is_stale(item),
        }
    }

    fn stored_text(&self) -> String {
        self.stored.map_or_else(|| "-".to_string(), |s| s.to_string())
    }
}

impl Renderable for RankRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let marker = if self.drift {
            format!("  (stored {})", self.stored_text())
        } else {
            String::new()
        };
        writeln!(
            w,
            "[{}] {:<11} {:<11} {}  {}{marker}",
            self.score, self.label, self.kind, self.id, self.name
        )
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}",
            self.score,
            self.kind,
            self.id,
            self.stored_text(),
            if self.drift { "drift" } else { "ok" },
            self.name
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["SCORE", "KIND", "ID", "STORED", "STATUS", "NAME"]
    }
}

/// Rank the records of `data`, most urgent-and-important first.
#[must_use]
pub fn rank_rows(data: Dataset, kind: RankKind, drift_only: bool) -> Vec<RankRow> {
    let items = collect_items(data, kind);
    rank(&items)
        .into_iter()
        .map(RankRow::from_item)
        .filter(|row| !drift_only || row.drift)
        .collect()
}

/// Run `ag rank`.
///
/// # Errors
///
/// Returns an error if the project config or the input cannot be loaded.
pub fn run_rank(args: &RankArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = project_config(project_root)?;
    let data = load_dataset(&args.input, &config.retry)?;
    let rows = rank_rows(data, args.kind, args.drift_only);
    tracing::debug!(count = rows.len(), kind = ?args.kind, "ranked records");

    if rows.is_empty() && !output.is_json() {
        println!("No records to rank.");
        return Ok(());
    }
    render_list(&rows, output)
}
