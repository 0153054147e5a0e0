mod app;
mod renderer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use trace_view_core::ViewerConfig;
use trace_view_core::model::Profile;
use trace_view_core::viewer::{MemoryQueryParams, TraceViewer};

/// Interactive terminal viewer for Chrome / Bazel trace profiles.
#[derive(Debug, Parser)]
#[command(name = "trace-view", version)]
struct Args {
    /// Trace file (`{"traceEvents": [...]}` or a bare event array).
    profile: PathBuf,
    /// Initial span filter, as if typed after `/`.
    #[arg(long)]
    filter: Option<String>,
    /// JSON file overriding viewer settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // The UI owns the terminal; send logs elsewhere with `2>trace-view.log`.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let data = std::fs::read(&args.profile)
        .with_context(|| format!("reading {}", args.profile.display()))?;
    let profile = Profile::from_json(&data)
        .with_context(|| format!("parsing {}", args.profile.display()))?;
    info!("loaded {} records from {}", profile.len(), args.profile.display());

    let config = match &args.config {
        Some(path) => ViewerConfig::load_overrides(&ViewerConfig::terminal(), path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::terminal(),
    };

    let params = match &args.filter {
        Some(text) => MemoryQueryParams::with(&config.filter_query_param, text),
        None => MemoryQueryParams::default(),
    };
    let viewer = TraceViewer::new(profile, config, Box::new(params));

    app::run(viewer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("trace-view").chain(list.iter().copied()))
    }

    #[test]
    fn parses_profile_and_options() {
        let parsed = args(&["trace.json", "--filter", "compile", "--config", "cfg.json"]).expect("args");
        assert_eq!(parsed.profile, PathBuf::from("trace.json"));
        assert_eq!(parsed.filter.as_deref(), Some("compile"));
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.json")));
    }

    #[test]
    fn rejects_missing_profile_and_extra_arguments() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
        assert!(args(&["a.json", "--filter"]).is_err());
    }

    #[test]
    fn help_is_not_a_parse_failure() {
        let err = args(&["--help"]).expect_err("help short-circuits parsing");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
