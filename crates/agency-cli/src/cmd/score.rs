use agency_core::error::ErrorCode;
use agency_core::model::{ImportanceLevel, Lenient, UrgencyLevel};
use agency_core::priority::{PriorityScore, score};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use super::CodedError;
use crate::output::{OutputMode, Renderable, pretty_kv, render_list, render_mode};

/// Arguments for `ag score`.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Urgency: low, medium, high or critical.
    #[arg(short, long)]
    pub urgency: Option<String>,

    /// Importance: low, medium or high.
    #[arg(short, long)]
    pub importance: Option<String>,

    /// Reject unknown values instead of treating them as medium.
    #[arg(long)]
    pub strict: bool,
}

/// One scored (urgency, importance) pair with its presentation classes.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRow {
    pub urgency: UrgencyLevel,
    pub importance: ImportanceLevel,
    pub score: PriorityScore,
    pub label: &'static str,
    pub class: &'static str,
    pub border: &'static str,
}

impl ScoreRow {
    fn new(urgency: UrgencyLevel, importance: ImportanceLevel) -> Self {
        let score = score(importance, urgency);
        Self {
            urgency,
            importance,
            score,
            label: score.label(),
            class: score.class(),
            border: score.border(),
        }
    }
}

impl Renderable for ScoreRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{:<8} x {:<6}  [{}] {}",
            self.urgency, self.importance, self.score, self.label
        )
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}",
            self.urgency, self.importance, self.score, self.label
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["URGENCY", "IMPORTANCE", "SCORE", "LABEL"]
    }
}

fn parse_axis<T>(raw: Option<&str>, strict: bool) -> Result<T>
where
    T: Lenient,
    <T as FromStr>::Err: std::fmt::Display,
{
    match raw {
        Some(value) if strict => value
            .parse::<T>()
            .map_err(|err| CodedError::new(ErrorCode::InvalidEnumValue, err.to_string()).into()),
        _ => Ok(T::parse_lenient(raw)),
    }
}

/// Score one pair.
///
/// # Errors
///
/// Returns [`ErrorCode::InvalidEnumValue`] for unknown values under `--strict`,
/// or an error if writing output fails.
pub fn run_score(args: &ScoreArgs, output: OutputMode) -> Result<()> {
    let urgency: UrgencyLevel = parse_axis(args.urgency.as_deref(), args.strict)?;
    let importance: ImportanceLevel = parse_axis(args.importance.as_deref(), args.strict)?;
    let row = ScoreRow::new(urgency, importance);

    render_mode(
        output,
        &row,
        |row, w| {
            writeln!(
                w,
                "score={} label={} class=\"{}\" border={}",
                row.score, row.label, row.class, row.border
            )
        },
        |row, w| {
            pretty_kv(w, "urgency", row.urgency.label())?;
            pretty_kv(w, "importance", row.importance.label())?;
            pretty_kv(w, "score", format!("{} ({})", row.score, row.label))?;
            pretty_kv(w, "class", row.class)?;
            pretty_kv(w, "border", row.border)
        },
    )
}

/// All twelve pairs, most urgent first.
#[must_use]
pub fn matrix_rows() -> Vec<ScoreRow> {
    UrgencyLevel::ALL
        .into_iter()
        .rev()
        .flat_map(|u| {
            ImportanceLevel::ALL
                .into_iter()
                .rev()
                .map(move |i| ScoreRow::new(u, i))
        })
        .collect()
}

/// Print the full urgency × importance matrix.
///
/// # Errors
///
/// Returns an error if writing output fails.
pub fn run_matrix(output: OutputMode) -> Result<()> {
    render_list(&matrix_rows(), output)
}
