//! Per-file outcomes and batch verdicts.

use serde::Serialize;

/// How one file fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
    Skipped,
}

/// Outcome of processing one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Path relative to the job root, `/`-separated.
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Files written for this input, relative to the job root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl FileOutcome {
    pub fn success(file: impl Into<String>, outputs: Vec<String>) -> Self {
        Self {
            file: file.into(),
            status: FileStatus::Success,
            error: None,
            outputs,
        }
    }

    pub fn error(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: FileStatus::Error,
            error: Some(error.into()),
            outputs: Vec::new(),
        }
    }

    pub fn skipped(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: FileStatus::Skipped,
            error: Some(reason.into()),
            outputs: Vec::new(),
        }
    }
}

/// A failed file, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Outcomes of a whole batch, ordered by file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(mut outcomes: Vec<FileOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.file.cmp(&b.file));
        Self { outcomes }
    }

    fn count(&self, status: FileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(FileStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Error)
    }

    pub fn skipped(&self) -> usize {
        self.count(FileStatus::Skipped)
    }

    /// Files that were sent to the model.
    pub fn processed(&self) -> usize {
        self.outcomes.len() - self.skipped()
    }

    /// True when at least one file was processed and every one of them failed.
    pub fn all_failed(&self) -> bool {
        let processed = self.processed();
        processed > 0 && self.failed() == processed
    }

    pub fn failures(&self) -> Vec<FileFailure> {
        self.outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Error)
            .map(|o| FileFailure {
                file: o.file.clone(),
                error: o.error.clone().unwrap_or_else(|| "unknown".to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_is_not_all_failed() {
        let report = BatchReport::new(vec![
            FileOutcome::success("b.py", vec!["b.py".to_string()]),
            FileOutcome::error("a.py", "boom"),
            FileOutcome::skipped("logo.png", "unsupported extension"),
        ]);
        assert_eq!(report.outcomes[0].file, "a.py");
        assert_eq!(report.processed(), 2);
        assert!(!report.all_failed());
        assert_eq!(
            report.failures(),
            vec![FileFailure {
                file: "a.py".to_string(),
                error: "boom".to_string()
            }]
        );
    }

    #[test]
    fn test_all_failed_ignores_skipped() {
        let report = BatchReport::new(vec![
            FileOutcome::error("a.py", "x"),
            FileOutcome::skipped(".DS_Store", "macOS metadata file"),
        ]);
        assert!(report.all_failed());
    }

    #[test]
    fn test_nothing_processed_is_not_a_failure() {
        assert!(!BatchReport::default().all_failed());
        let report = BatchReport::new(vec![FileOutcome::skipped("x.bin", "unsupported extension")]);
        assert!(!report.all_failed());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(FileOutcome::error("a.py", "boom")).unwrap();
        assert_eq!(json, serde_json::json!({"file": "a.py", "status": "error", "error": "boom"}));
    }
}
