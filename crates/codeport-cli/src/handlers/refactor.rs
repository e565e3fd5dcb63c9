//! Refactor command handler.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use codeport_axum::start_configured_servers;
use codeport_transform::{BatchReport, FileStatus, FileTransformer, TransformConfig};

use crate::bootstrap::CliContext;

/// Options of one refactor run.
pub struct RefactorArgs<'a> {
    pub dir: &'a Path,
    pub instructions: String,
    pub agentic: bool,
    pub max_in_flight: Option<usize>,
}

/// Transform `dir` in place and print a summary.
pub async fn execute(ctx: &CliContext, args: RefactorArgs<'_>) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("Not a directory: {}", args.dir.display());
    }

    let mut config = TransformConfig::from_settings(&ctx.settings, args.instructions)
        .with_agentic(args.agentic || ctx.settings.agentic);
    if let Some(n) = args.max_in_flight {
        config = config.with_max_in_flight(n);
    }

    let mcp = ctx.mcp_manager();
    start_configured_servers(&mcp, &ctx.settings, ctx.env.as_ref()).await?;

    let transformer =
        FileTransformer::new(ctx.generator()?, config).with_tools(Arc::new(mcp.clone()));
    let report = transformer.run_batch(args.dir).await;
    mcp.disconnect_all().await;

    let report = report.with_context(|| format!("Failed to process {}", args.dir.display()))?;
    print!("{}", summary_table(&report));

    if report.all_failed() {
        bail!("All {} file(s) failed to process", report.failed());
    }
    Ok(())
}

/// One row per file, then the totals.
pub fn summary_table(report: &BatchReport) -> String {
    let width = report
        .outcomes
        .iter()
        .map(|o| o.file.len())
        .max()
        .unwrap_or(0)
        .max("FILE".len());

    let mut out = format!("{:<8}  {:<width$}  DETAIL\n", "STATUS", "FILE");
    for outcome in &report.outcomes {
        let status = match outcome.status {
            FileStatus::Success => "ok",
            FileStatus::Error => "error",
            FileStatus::Skipped => "skipped",
        };
        let detail = match outcome.status {
            FileStatus::Success => outcome.outputs.join(", "),
            FileStatus::Error | FileStatus::Skipped => outcome.error.clone().unwrap_or_default(),
        };
        let _ = writeln!(out, "{status:<8}  {:<width$}  {detail}", outcome.file);
    }
    let _ = writeln!(
        out,
        "\n{} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    out
}

#[cfg(test)]
mod tests {
    use codeport_transform::FileOutcome;

    use super::*;

    #[test]
    fn test_summary_table() {
        let report = BatchReport::new(vec![
            FileOutcome::success("src/app.py", vec!["src/app.py".to_string()]),
            FileOutcome::error("b.py", "boom"),
            FileOutcome::skipped("logo.png", "unsupported extension"),
        ]);
        let table = summary_table(&report);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "STATUS    FILE        DETAIL");
        assert_eq!(lines[1], "error     b.py        boom");
        assert_eq!(lines[2], "skipped   logo.png    unsupported extension");
        assert_eq!(lines[3], "ok        src/app.py  src/app.py");
        assert_eq!(lines[5], "1 succeeded, 1 failed, 1 skipped");
    }
}
