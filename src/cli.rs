use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract the schedule and write (or merge into) an .ics file.
    Convert(ConvertArgs),
    /// Print one JSON line per table row describing how it was handled.
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Fixed,
    Header,
    Scan,
}

#[derive(Debug, Clone, Args)]
pub struct ScheduleArgs {
    /// Schedule page: http/https URL or local HTML file.
    #[arg(long)]
    pub source: String,

    /// YAML config file.
    #[arg(long)]
    pub config: Option<String>,

    /// How date/time/location/note columns are located.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Event length when a row has a start time but no end time.
    #[arg(long)]
    pub duration_minutes: Option<u32>,

    /// Year for dates that do not name one (default: found in page, else current).
    #[arg(long)]
    pub year: Option<i32>,

    /// IANA timezone for timed events.
    #[arg(long)]
    pub timezone: Option<String>,

    /// Calendar display name (default: first heading/paragraph of the page).
    #[arg(long)]
    pub calendar_name: Option<String>,

    /// Token that keeps a row even when it says "NO REHEARSAL" (repeatable).
    #[arg(long)]
    pub cancel_override: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Output directory for the .ics file.
    #[arg(long)]
    pub out: Option<String>,

    /// Replace an existing calendar file instead of merging into it.
    #[arg(long)]
    pub overwrite: bool,

    /// Replace events whose UID is already in the calendar instead of appending.
    #[arg(long)]
    pub dedupe: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,
}
