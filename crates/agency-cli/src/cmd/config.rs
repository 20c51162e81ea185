use agency_core::config::{EffectiveConfig, project_config_path, resolve_config, user_config_path};
use agency_core::error::ErrorCode;
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use toml::Value;

use super::CodedError;
use crate::output::{OutputMode, render, render_mode};

/// Effective config plus the output mode this invocation resolved to.
#[derive(Debug, Serialize)]
struct ConfigView {
    #[serde(flatten)]
    config: EffectiveConfig,
    resolved_output: OutputMode,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Show raw project config only
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Show raw user config only
    #[arg(long)]
    user: bool,
}

pub fn run_config(args: &ConfigArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    match &args.command {
        ConfigCommand::Show(show) => run_show(show, project_root, output),
    }
}

fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    if args.project {
        let value = load_toml_table(&project_config_path(project_root))?;
        return print_toml(&value, output);
    }

    if args.user {
        let Some(path) = user_config_path() else {
            bail!("Could not determine the user config directory");
        };
        let value = load_toml_table(&path)?;
        return print_toml(&value, output);
    }

    let config = resolve_config(project_root).map_err(|err| {
        anyhow::Error::from(CodedError::new(ErrorCode::ConfigParseError, format!("{err:#}")))
    })?;
    let view = ConfigView {
        config,
        resolved_output: output,
    };
    render_mode(output, &view, write_text, write_pretty)
}

fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = toml::from_str(&content).map_err(|err| {
        CodedError::new(
            ErrorCode::ConfigParseError,
            format!("Failed to parse {}: {err}", path.display()),
        )
    })?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }

    Ok(value)
}

fn print_toml(value: &Value, output: OutputMode) -> Result<()> {
    render(output, value, |value, w| {
        let text = toml::to_string_pretty(value).map_err(io::Error::other)?;
        write!(w, "{text}")
    })
}

fn write_text(view: &ConfigView, w: &mut dyn Write) -> io::Result<()> {
    let value = &view.config;
    let throttle = &value.project.throttle;
    let retry = &value.project.retry;
    writeln!(w, "resolved_output={}", view.resolved_output)?;
    writeln!(w, "throttle.max_calls={}", throttle.max_calls)?;
    writeln!(w, "throttle.window_ms={}", throttle.window_ms)?;
    writeln!(w, "throttle.idle_ms={}", throttle.idle_ms)?;
    writeln!(w, "throttle.debounce_ms={}", throttle.debounce_ms)?;
    writeln!(w, "retry.max_attempts={}", retry.max_attempts)?;
    writeln!(w, "retry.base_delay_ms={}", retry.base_delay_ms)?;
    writeln!(w, "retry.max_delay_ms={}", retry.max_delay_ms)?;
    writeln!(w, "retry.jitter={}", retry.jitter)?;
    if let Some(out) = &value.user.output {
        writeln!(w, "user.output={out}")?;
    }
    Ok(())
}

fn write_pretty(view: &ConfigView, w: &mut dyn Write) -> io::Result<()> {
    let value = &view.config;
    let throttle = &value.project.throttle;
    let retry = &value.project.retry;
    writeln!(w, "resolved_output = \"{}\"", view.resolved_output)?;
    writeln!(w)?;
    writeln!(w, "[throttle]")?;
    writeln!(w, "max_calls = {}", throttle.max_calls)?;
    writeln!(w, "window_ms = {}", throttle.window_ms)?;
    writeln!(w, "idle_ms = {}", throttle.idle_ms)?;
    writeln!(w, "debounce_ms = {}", throttle.debounce_ms)?;
    writeln!(w)?;
    writeln!(w, "[retry]")?;
    writeln!(w, "max_attempts = {}", retry.max_attempts)?;
    writeln!(w, "base_delay_ms = {}", retry.base_delay_ms)?;
    writeln!(w, "max_delay_ms = {}", retry.max_delay_ms)?;
    writeln!(w, "jitter = {}", retry.jitter)?;
    if let Some(out) = &value.user.output {
        writeln!(w)?;
        writeln!(w, "[user]")?;
        writeln!(w, "output = \"{out}\"")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agency_core::config::{ProjectConfig, UserConfig};

    fn view(resolved_output: OutputMode) -> ConfigView {
        ConfigView {
            config: EffectiveConfig {
                project: ProjectConfig::default(),
                user: UserConfig {
                    output: Some("json".to_string()),
                },
            },
            resolved_output,
        }
    }

    #[test]
    fn text_lists_every_key() {
        let mut buf = Vec::new();
        write_text(&view(OutputMode::Text), &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("resolved_output=text\n"));
        assert!(text.contains("throttle.max_calls=10\n"));
        assert!(text.contains("retry.jitter=true\n"));
        assert!(text.ends_with("user.output=json\n"));
    }

    #[test]
    fn pretty_output_is_valid_toml() {
        let mut buf = Vec::new();
        write_pretty(&view(OutputMode::Pretty), &mut buf).expect("write");
        let value: Value = toml::from_str(&String::from_utf8(buf).expect("utf8")).expect("toml");
        assert_eq!(value["resolved_output"].as_str(), Some("pretty"));
        assert_eq!(value["throttle"]["debounce_ms"].as_integer(), Some(300));
        assert_eq!(value["user"]["output"].as_str(), Some("json"));
    }

    #[test]
    fn json_view_reports_mode_beside_config() {
        let json = serde_json::to_value(view(OutputMode::Json)).expect("serialize");
        assert_eq!(json["resolved_output"], "json");
        assert_eq!(json["project"]["throttle"]["max_calls"], 10);
        assert_eq!(json["user"]["output"], "json");
    }

    #[test]
    fn missing_raw_config_is_empty_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        let value = load_toml_table(&dir.path().join("config.toml")).expect("load");
        assert_eq!(value.as_table().map(toml::map::Map::len), Some(0));
    }
}
