//! Terminal rendering of the end-of-run summary.
//!
//! Printed on stderr with `console` styles: green when every import went
//! through, red when some were rejected or failed. stdout is left to the
//! rejected-submission records.

use console::{Style, Term};

use crate::state_machine::RunSummary;

pub struct SummaryView {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for SummaryView {
    fn default() -> Self {
        Self {
            green: Style::new().for_stderr().green().bold(),
            red: Style::new().for_stderr().red().bold(),
            yellow: Style::new().for_stderr().yellow(),
            dim: Style::new().for_stderr().dim(),
        }
    }
}

impl SummaryView {
    pub fn render(&self, summary: &RunSummary) -> Vec<String> {
        let (mark, headline) = if summary.has_failures() {
            (self.red.apply_to("✗"), "Import finished with failures")
        } else {
            (self.green.apply_to("✓"), "Import finished")
        };

        let mut lines = vec![
            format!("{mark} {headline}"),
            format!(
                "  submitted {}  already imported {}  queued {}",
                summary.submitted, summary.resolved, summary.queued
            ),
            format!(
                "  completed {}  failed {}  rejected {}",
                self.green.apply_to(summary.completed),
                self.red.apply_to(summary.failed),
                self.red.apply_to(summary.errored)
            ),
        ];
        if summary.skipped_commits > 0 {
            lines.push(format!(
                "  {} skipped {} commit-pinned workflows",
                self.yellow.apply_to("↷"),
                summary.skipped_commits
            ));
        }
        lines.push(
            self.dim
                .apply_to(format!(
                    "  {} trim cycles, peak {} outstanding, {} ms",
                    summary.trim_cycles, summary.peak_outstanding, summary.duration_ms
                ))
                .to_string(),
        );
        lines
    }

    pub fn print(&self, summary: &RunSummary) -> std::io::Result<()> {
        let term = Term::stderr();
        for line in self.render(summary) {
            term.write_line(&line)?;
        }
        Ok(())
    }
}
