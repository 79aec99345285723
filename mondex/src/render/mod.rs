//! Console output for plans and apply reports.
//!
//! Everything is written to a caller supplied [`Write`] so the binary can target
//! stdout while tests capture a buffer.

use std::io::{self, Write};

use crate::service::{ApplyProgress, ApplyReport};
use crate::types::index::CanonicalIndex;
use crate::types::plan::{IndexOperation, ReconciliationPlan};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const UNDERLINE: &str = "\x1b[4m";
const ITALIC: &str = "\x1b[3m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const GRAY: &str = "\x1b[90m";

pub const NO_CHANGES: &str = "No changes required";

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    colored: bool,
}

impl Renderer {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn plan(&self, plan: &ReconciliationPlan, out: &mut impl Write) -> io::Result<()> {
        if plan.is_empty() {
            return self.info(NO_CHANGES, out);
        }

        for diff in plan {
            self.header(&format!("Collection: {}", diff.collection), out)?;
            for index in &diff.to_create {
                writeln!(out, "+ Create {}", self.create_details(index))?;
            }
            for index in &diff.to_drop {
                writeln!(out, "- Drop {}", self.drop_details(index))?;
            }
        }
        Ok(())
    }

    /// Operations grouped per collection in the order they ran, followed by a summary line.
    pub fn apply_report(&self, report: &ApplyReport, out: &mut impl Write) -> io::Result<()> {
        let mut printer = self.apply_printer(out);
        for outcome in report.outcomes() {
            printer.record(ApplyProgress::Started { collection: &outcome.collection, operation: &outcome.operation });
            printer.record(ApplyProgress::Finished(outcome));
        }
        printer.finish(report)
    }

    /// Printer for an `apply` in progress, see [`ApplyPrinter`].
    pub fn apply_printer<W: Write>(&self, out: W) -> ApplyPrinter<W> {
        ApplyPrinter { renderer: *self, out, current: None, error: None }
    }

    pub fn info(&self, message: &str, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.paint(&[GRAY], message))
    }

    pub fn success(&self, message: &str, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.paint(&[BOLD, GREEN], message))
    }

    fn header(&self, title: &str, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.paint(&[UNDERLINE, BOLD], title))
    }

    fn create_details(&self, index: &CanonicalIndex) -> String {
        let mut details =
            format!("{} {}", self.paint(&[GREEN, BOLD], &index.name), self.paint(&[GREEN], &index.keys.to_string()));
        if index.is_unique {
            details.push_str(&self.paint(&[GRAY, ITALIC], " (unique)"));
        }
        if let Some(seconds) = index.expire_after_seconds {
            details.push_str(&self.paint(&[GRAY, ITALIC], &format!(" (expires: {})", seconds)));
        }
        details
    }

    fn drop_details(&self, index: &CanonicalIndex) -> String {
        format!("{} {}", self.paint(&[RED, BOLD], &index.name), self.paint(&[RED, BOLD], &index.keys.to_string()))
    }

    fn paint(&self, styles: &[&str], text: &str) -> String {
        if !self.colored {
            return text.to_string();
        }
        format!("{}{}{}", styles.concat(), text, RESET)
    }
}

/// Writes apply progress line by line as operations run, so the output is current
/// even when an index build takes long or the process dies halfway.
///
/// The first write error stops all further output and is returned by
/// [`ApplyPrinter::finish`].
pub struct ApplyPrinter<W> {
    renderer: Renderer,
    out: W,
    current: Option<String>,
    error: Option<io::Error>,
}

impl<W: Write> ApplyPrinter<W> {
    pub fn record(&mut self, progress: ApplyProgress<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write(progress) {
            self.error = Some(e);
        }
    }

    /// Writes the summary line, or reports the write error that stopped the output.
    pub fn finish(mut self, report: &ApplyReport) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if report.is_empty() {
            return self.renderer.info(NO_CHANGES, &mut self.out);
        }

        let summary = format!("{} of {} operations succeeded", report.succeeded_count(), report.total());
        if report.is_success() {
            self.renderer.success(&summary, &mut self.out)
        } else {
            let summary = format!("{}, {} failed", summary, report.failed_count());
            writeln!(self.out, "{}", self.renderer.paint(&[RED, BOLD], &summary))
        }
    }

    fn write(&mut self, progress: ApplyProgress<'_>) -> io::Result<()> {
        match progress {
            ApplyProgress::Started { collection, operation } => {
                if self.current.as_deref() != Some(collection) {
                    self.renderer.header(&format!("Collection: {}", collection), &mut self.out)?;
                    self.current = Some(collection.to_string());
                }
                match operation {
                    IndexOperation::Drop(index) => {
                        writeln!(self.out, "- Dropping index {}", self.renderer.drop_details(index))?
                    }
                    IndexOperation::Create(index) => {
                        writeln!(self.out, "+ Creating index {}", self.renderer.create_details(index))?
                    }
                }
                self.out.flush()
            }
            ApplyProgress::Finished(outcome) => {
                if let Err(error) = &outcome.result {
                    writeln!(self.out, "  {}", self.renderer.paint(&[RED], &format!("failed: {}", error)))?;
                }
                Ok(())
            }
        }
    }
}
