//! Human-readable enrichment run log.
//!
//! The run log is the batch's only user-facing report: a start banner, one
//! line per problem naming the release, and a completion banner with
//! per-outcome counts. Lines are plain text separated by `\n`.
//!
//! ```text
//! Started enrichment run at 2026-10-19T09:12:44Z (3 releases queued)
//! error: release 2 (Air - Moon Safari, external id 20): https://... returned HTTP 404
//! Enrichment run completed: 2 updated, 0 unchanged, 0 skipped, 1 failed, 0 deferred
//! ```

use std::fmt;

use chrono::Utc;

/// Outcome counters reported in the completion banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub updated: usize,
    /// Crawled, but nothing was written (no facts, or no matching row).
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Vec<String>,
    pub stats: RunStats,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, queued: usize) {
        self.lines.push(format!(
            "Started enrichment run at {} ({} releases queued)",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            queued
        ));
    }

    /// Record a failure for one release.
    pub fn error(&mut self, release: &str, message: impl fmt::Display) {
        self.lines.push(format!("error: {}: {}", release, message));
    }

    pub fn warning(&mut self, release: &str, message: impl fmt::Display) {
        self.lines.push(format!("warning: {}: {}", release, message));
    }

    /// Record an event that could not be attributed to any release.
    pub fn internal_error(&mut self, message: impl fmt::Display) {
        self.lines.push(format!("internal error: {}", message));
    }

    pub fn note(&mut self, message: impl fmt::Display) {
        self.lines.push(message.to_string());
    }

    pub fn finish(&mut self) {
        let s = self.stats;
        self.lines.push(format!(
            "Enrichment run completed: {} updated, {} unchanged, {} skipped, {} failed, {} deferred",
            s.updated, s.unchanged, s.skipped, s.failed, s.deferred
        ));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines that report a per-release error.
    pub fn error_lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter().filter(|l| l.starts_with("error: "))
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
