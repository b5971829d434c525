//! Commit message formatting for flush commits.

use chrono::{DateTime, SecondsFormat, Utc};

/// Renders the commit message template for a flushed batch.
#[derive(Debug, Clone)]
pub struct CommitFormatter {
    template: String,
}

impl CommitFormatter {
    pub fn new(template: &str) -> Self {
        Self { template: template.to_string() }
    }

    /// Format the message for a batch of `count` notes flushed at `at`.
    pub fn format(&self, count: usize, at: DateTime<Utc>) -> String {
        self.template
            .replace("{count}", &count.to_string())
            .replace("{timestamp}", &at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}
