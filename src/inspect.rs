use std::io::Write as _;

use anyhow::Context as _;

use crate::cli::InspectArgs;
use crate::config::ScheduleConfig;
use crate::formats::RowReport;
use crate::html::SourceDocument;
use crate::source::Source;

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    let config = ScheduleConfig::from_args(&args.schedule).context("load config")?;
    let source = Source::parse(&args.schedule.source);
    let html = source
        .read()
        .await
        .with_context(|| format!("read {source}"))?;

    let doc = SourceDocument::parse(&html);
    let extraction = crate::schedule::extract(&doc, &config, chrono::Local::now().date_naive());
    tracing::info!(
        calendar = %extraction.calendar_name,
        year = extraction.year,
        rows = extraction.rows.len(),
        skipped = extraction.skipped(),
        "inspected schedule"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in &extraction.rows {
        let line = serde_json::to_string(&RowReport::from(row)).context("serialize row report")?;
        writeln!(out, "{line}").context("write stdout")?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}
