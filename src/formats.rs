use serde::{Deserialize, Serialize};

use crate::schedule::RowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Event,
    Skipped,
}

/// One line of `inspect` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    pub table: usize,
    pub row: usize,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl From<&RowResult> for RowReport {
    fn from(result: &RowResult) -> Self {
        match &result.outcome {
            Ok(event) => RowReport {
                table: result.table,
                row: result.row,
                status: RowStatus::Event,
                reason: None,
                uid: Some(event.uid.clone()),
                summary: Some(event.summary.clone()),
                start: Some(event.start.to_string()),
                end: Some(event.end.to_string()),
            },
            Err(reason) => RowReport {
                table: result.table,
                row: result.row,
                status: RowStatus::Skipped,
                reason: Some(reason.to_string()),
                uid: None,
                summary: None,
                start: None,
                end: None,
            },
        }
    }
}
