use crate::output::print_rendered;
use anyhow::Context;
use goalkit_core::query::{run_analysis, AnalysisQuery};
use goalkit_core::report::OutputMode;
use std::path::Path;

pub fn run(root: &Path, verbose: bool, json: bool) -> anyhow::Result<()> {
    let query = AnalysisQuery {
        verbose,
        mode: OutputMode::from_json_flag(json),
    };
    let rendered = run_analysis(root, &query)
        .with_context(|| format!("failed to analyze project at {}", root.display()))?;
    print_rendered(&rendered)
}
