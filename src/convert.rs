use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::ConvertArgs;
use crate::config::ScheduleConfig;
use crate::error::ScheduleError;
use crate::html::SourceDocument;
use crate::source::Source;
use crate::store::{self, CalendarMeta, InsertOutcome, MergePolicy, WriteMode};

/// Result of one successful conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub path: PathBuf,
    pub calendar_name: String,
    pub appended: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub total_events: usize,
}

impl ConvertSummary {
    pub fn produced(&self) -> usize {
        self.appended + self.replaced
    }
}

pub async fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let mut config = ScheduleConfig::from_args(&args.schedule).context("load config")?;
    if let Some(out) = &args.out {
        config.output_dir = PathBuf::from(out);
    }
    if args.overwrite {
        config.write_mode = WriteMode::Overwrite;
    }
    if args.dedupe {
        config.merge_policy = MergePolicy::ReplaceByUid;
    }

    let source = Source::parse(&args.schedule.source);
    let summary = convert(&source, &config)
        .await
        .with_context(|| format!("convert {source}"))?;

    println!(
        "Success: wrote {} events to {}",
        summary.produced(),
        summary.path.display()
    );
    Ok(())
}

/// Reads `source`, extracts its schedule and writes the calendar file.
pub async fn convert(source: &Source, config: &ScheduleConfig) -> Result<ConvertSummary, ScheduleError> {
    let timezone = config.validate()?;
    let html = source.read().await?;
    let doc = SourceDocument::parse(&html);
    let extraction = crate::schedule::extract(&doc, config, chrono::Local::now().date_naive());

    std::fs::create_dir_all(&config.output_dir).map_err(|source| ScheduleError::CreateOutputDir {
        path: config.output_dir.clone(),
        source,
    })?;
    let path = store::calendar_path(&config.output_dir, &extraction.calendar_name);
    let meta = CalendarMeta {
        name: extraction.calendar_name.clone(),
        timezone,
    };
    let mut document = store::load_or_new(&path, &meta, config.write_mode)?;

    let mut appended = 0;
    let mut replaced = 0;
    for event in extraction.events() {
        match document.insert(event, config.merge_policy) {
            InsertOutcome::Appended => appended += 1,
            InsertOutcome::Replaced => replaced += 1,
        }
    }

    store::save(&document, &path)?;

    let summary = ConvertSummary {
        path,
        calendar_name: extraction.calendar_name.clone(),
        appended,
        replaced,
        skipped: extraction.skipped(),
        total_events: document.event_count(),
    };
    tracing::info!(
        source = %source,
        calendar = %summary.calendar_name,
        appended,
        replaced,
        skipped = summary.skipped,
        total = summary.total_events,
        path = %summary.path.display(),
        "calendar written"
    );
    Ok(summary)
}
