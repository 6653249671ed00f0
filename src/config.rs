use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::{ScheduleArgs, StrategyArg};
use crate::error::ScheduleError;
use crate::normalize::CancelPolicy;
use crate::roles::{ColumnMap, ColumnStrategy};
use crate::store::{MergePolicy, WriteMode};

pub const DEFAULT_TIMEZONE: &str = "Europe/London";
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Everything that tunes one extraction run. Read from an optional YAML
/// file, then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub strategy: ColumnStrategy,
    pub default_duration_minutes: u32,
    pub year: Option<i32>,
    pub timezone: String,
    pub calendar_name: Option<String>,
    pub write_mode: WriteMode,
    pub merge_policy: MergePolicy,
    pub cancel_tokens: Vec<String>,
    pub cancel_overrides: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let cancel = CancelPolicy::default();
        Self {
            strategy: ColumnStrategy::default(),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            year: None,
            timezone: DEFAULT_TIMEZONE.to_owned(),
            calendar_name: None,
            write_mode: WriteMode::default(),
            merge_policy: MergePolicy::default(),
            cancel_tokens: cancel.tokens,
            cancel_overrides: cancel.overrides,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ScheduleConfig {
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ScheduleError::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::from_str(&yaml).map_err(|source| ScheduleError::InvalidConfig {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads `--config` when given and layers the remaining flags on top.
    pub fn from_args(args: &ScheduleArgs) -> Result<Self, ScheduleError> {
        let mut config = match args.config.as_deref() {
            Some(path) => Self::load(Path::new(path))?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &ScheduleArgs) {
        if let Some(strategy) = args.strategy {
            self.strategy = match (strategy, &self.strategy) {
                (StrategyArg::Fixed, ColumnStrategy::Fixed { .. }) => self.strategy.clone(),
                (StrategyArg::Fixed, _) => ColumnStrategy::Fixed {
                    columns: ColumnMap::default(),
                },
                (StrategyArg::Header, _) => ColumnStrategy::Header,
                (StrategyArg::Scan, _) => ColumnStrategy::Scan,
            };
        }
        if let Some(minutes) = args.duration_minutes {
            self.default_duration_minutes = minutes;
        }
        if let Some(year) = args.year {
            self.year = Some(year);
        }
        if let Some(timezone) = &args.timezone {
            self.timezone = timezone.clone();
        }
        if let Some(name) = &args.calendar_name {
            self.calendar_name = Some(name.clone());
        }
        if !args.cancel_override.is_empty() {
            self.cancel_overrides.extend(args.cancel_override.iter().cloned());
        }
    }

    pub fn validate(&self) -> Result<chrono_tz::Tz, ScheduleError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn default_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.default_duration_minutes))
    }

    pub fn cancel_policy(&self) -> CancelPolicy {
        CancelPolicy {
            tokens: self.cancel_tokens.clone(),
            overrides: self.cancel_overrides.clone(),
        }
    }
}
