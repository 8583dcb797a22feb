use crate::parser::Line;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity of a single finding, in increasing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &str {
        match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// All severities, lowest first.
    pub fn all() -> [Severity; 4] {
        [
            Severity::Notice,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
        ]
    }
}

/// One finding produced by a checker or the external linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub line: Line,
    pub ignored: bool,
}

impl Alert {
    /// Create a non-ignored alert. Only the aggregation engine flips the
    /// `ignored` flag afterwards.
    pub fn new(id: &str, severity: Severity, message: impl Into<String>, line: Line) -> Alert {
        Alert {
            id: id.to_string(),
            severity,
            message: message.into(),
            line,
            ignored: false,
        }
    }
}

/// Aggregated result of checking one spec file. Immutable once returned by
/// the engine; renderers consume it read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notices: Vec<Alert>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<Alert>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Alert>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub criticals: Vec<Alert>,

    /// Check IDs disabled by the caller.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ignored_checks: Vec<String>,

    /// True if the external linter was not run.
    #[serde(default)]
    pub linting_disabled: bool,

    /// True if the target-applicability gate rejected the whole file.
    #[serde(default)]
    pub is_skipped: bool,
}

impl Report {
    /// Report for a file whose declared targets don't match the host.
    pub fn skipped() -> Report {
        Report {
            is_skipped: true,
            ..Report::default()
        }
    }

    /// Route an alert into the bucket matching its severity.
    pub fn push(&mut self, alert: Alert) {
        match alert.severity {
            Severity::Notice => self.notices.push(alert),
            Severity::Warning => self.warnings.push(alert),
            Severity::Error => self.errors.push(alert),
            Severity::Critical => self.criticals.push(alert),
        }
    }

    pub fn bucket(&self, severity: Severity) -> &[Alert] {
        match severity {
            Severity::Notice => &self.notices,
            Severity::Warning => &self.warnings,
            Severity::Error => &self.errors,
            Severity::Critical => &self.criticals,
        }
    }

    /// Total number of alerts, ignored ones included.
    pub fn total(&self) -> usize {
        self.notices.len() + self.warnings.len() + self.errors.len() + self.criticals.len()
    }

    /// Number of suppressed alerts across all buckets.
    pub fn ignored(&self) -> usize {
        Severity::all()
            .iter()
            .map(|&severity| self.bucket(severity).iter().filter(|a| a.ignored).count())
            .sum()
    }

    /// True if every alert in every bucket is suppressed (or there are none).
    pub fn is_perfect(&self) -> bool {
        self.total() - self.ignored() == 0
    }

    /// True if any non-ignored alert has at least the given severity.
    pub fn has_alerts(&self, min: Severity) -> bool {
        Severity::all().iter().any(|&severity| {
            severity >= min && self.bucket(severity).iter().any(|a| !a.ignored)
        })
    }

    /// Unique, naturally-sorted IDs of every check mentioned in the report.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();

        for severity in Severity::all() {
            for alert in self.bucket(severity) {
                if !alert.id.is_empty() && !ids.contains(&alert.id) {
                    ids.push(alert.id.clone());
                }
            }
        }

        ids.sort_by(|a, b| natural_cmp(a, b));
        ids
    }

    /// Sort every bucket ascending by line index; sentinel (-1) lines first.
    pub fn sort(&mut self) {
        self.notices.sort_by_key(|a| a.line.index);
        self.warnings.sort_by_key(|a| a.line.index);
        self.errors.sort_by_key(|a| a.line.index);
        self.criticals.sort_by_key(|a| a.line.index);
    }
}

// Orders check IDs so that PF2 comes before PF10.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let split = |id: &str| -> (String, u32) {
        let digits: String = id.chars().filter(char::is_ascii_digit).collect();
        let prefix: String = id.chars().filter(|c| !c.is_ascii_digit()).collect();
        (prefix, digits.parse().unwrap_or(0))
    };

    split(a).cmp(&split(b))
}
