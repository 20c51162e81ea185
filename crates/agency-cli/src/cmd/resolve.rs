use agency_core::error::ErrorCode;
use agency_core::hierarchy::{Chain, FormKind, FormState, Selection, Tier};
use agency_core::model::Dataset;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{CodedError, load_dataset, project_config};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `ag resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// JSON dataset with the candidate lists, or `-` for stdin.
    #[arg(long)]
    pub input: PathBuf,

    /// Form whose chain to resolve.
    #[arg(long)]
    pub form: FormKind,

    /// Default client id.
    #[arg(long)]
    pub client: Option<String>,

    /// Default project id.
    #[arg(long)]
    pub project: Option<String>,

    /// Default set id.
    #[arg(long)]
    pub set: Option<String>,

    /// Default pitch id.
    #[arg(long)]
    pub pitch: Option<String>,

    /// Apply a change after opening, as `tier=id` (`tier=` clears). Repeatable.
    #[arg(long = "change", value_name = "TIER=ID", value_parser = parse_change)]
    pub changes: Vec<Change>,

    /// Fail if any supplied id had to be cleared.
    #[arg(long)]
    pub strict: bool,
}

/// One select change on an open form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub tier: Tier,
    pub id: Option<String>,
}

fn parse_change(raw: &str) -> Result<Change, String> {
    let (tier, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TIER=ID, got '{raw}'"))?;
    let tier = tier.parse::<Tier>().map_err(|err| err.to_string())?;
    let id = Some(id.trim().to_string()).filter(|id| !id.is_empty());
    Ok(Change { tier, id })
}

/// Outcome of opening a form and applying changes.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub form: FormKind,
    pub selection: Selection,
    pub filled: Vec<Tier>,
    pub cleared: Vec<Tier>,
    pub candidates: BTreeMap<Tier, Vec<String>>,
}

impl ResolveReport {
    fn selected(&self, tier: Tier) -> &str {
        self.selection.get(tier).unwrap_or("-")
    }
}

fn join_tiers(tiers: &[Tier]) -> String {
    if tiers.is_empty() {
        return "-".to_string();
    }
    tiers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Open `args.form` over `data`, apply the changes, and report the result.
#[must_use]
pub fn resolve_report(args: &ResolveArgs, data: &Dataset) -> ResolveReport {
    let defaults = [
        (Tier::Client, &args.client),
        (Tier::Project, &args.project),
        (Tier::Set, &args.set),
        (Tier::Pitch, &args.pitch),
    ]
    .into_iter()
    .fold(Selection::new(), |mut selection, (tier, id)| {
        selection.set(tier, id.clone());
        selection
    });

    let mut form = FormState::new(Chain::from_dataset(args.form, data), defaults);
    let mut cleared = form.resolution().cleared.clone();
    for change in &args.changes {
        for tier in form.select(change.tier, change.id.as_deref()) {
            if !cleared.contains(&tier) {
                cleared.push(tier);
            }
        }
    }

    let filled = form.filled().to_vec();
    let resolution = form.resolution();
    ResolveReport {
        form: args.form,
        selection: resolution.selection.clone(),
        filled,
        cleared,
        candidates: resolution.candidates.clone(),
    }
}

fn render_text(report: &ResolveReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "form={}", report.form)?;
    for (tier, ids) in &report.candidates {
        writeln!(
            w,
            "{tier}={} candidates={}",
            report.selected(*tier),
            ids.join(",")
        )?;
    }
    writeln!(w, "filled={}", join_tiers(&report.filled))?;
    writeln!(w, "cleared={}", join_tiers(&report.cleared))
}

fn render_pretty(report: &ResolveReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} form", report.form))?;
    for (tier, ids) in &report.candidates {
        let shown = if ids.is_empty() {
            "(none)".to_string()
        } else {
            ids.join(", ")
        };
        pretty_kv(
            w,
            &tier.to_string(),
            format!("{}  [{shown}]", report.selected(*tier)),
        )?;
    }
    if !report.filled.is_empty() {
        pretty_kv(w, "filled", join_tiers(&report.filled))?;
    }
    if !report.cleared.is_empty() {
        pretty_kv(w, "cleared", join_tiers(&report.cleared))?;
    }
    Ok(())
}

/// Run `ag resolve`.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded, or under `--strict` when a
/// supplied id was cleared.
pub fn run_resolve(args: &ResolveArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = project_config(project_root)?;
    let data = load_dataset(&args.input, &config.retry)?;
    let report = resolve_report(args, &data);

    if args.strict && !report.cleared.is_empty() {
        return Err(CodedError::new(
            ErrorCode::EntityNotFound,
            format!(
                "{} selection not among candidates: {}",
                report.form,
                join_tiers(&report.cleared)
            ),
        )
        .into());
    }

    render_mode(output, &report, render_text, render_pretty)
}
