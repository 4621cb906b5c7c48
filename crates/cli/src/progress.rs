//! Cargo-style status output for dropsync
//!
//! ```text
//!     Planned 3 transfers (1 upload), 2 deletes
//!      Synced 952 files in 3.2s, 67.44 MiB uploaded
//!   Unchanged client_dir
//! ```

use std::io::Write as _;
use std::time::Duration;

use dropsync_core::{Plan, SyncAction};
use dropsync_transport::PassOutcome;

/// Status verbs (right-aligned to 12 chars)
struct Status;

impl Status {
    const PLANNED: &str = "Planned";
    const SYNCED: &str = "Synced";
    const UNCHANGED: &str = "Unchanged";
    const SKIPPED: &str = "Skipped";
    const SCANNED: &str = "Scanned";
}

/// Print a cargo-style status line
fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One-line summary of a plan
#[must_use]
pub fn plan_summary(plan: &Plan) -> String {
    format!(
        "{} ({}), {}",
        plural(plan.transfers.len(), "transfer"),
        plural(plan.upload_count(), "upload"),
        plural(plan.cleanup.len(), "delete")
    )
}

/// Print a plan, one action per line
pub fn print_plan(plan: &Plan) {
    print_status(Status::PLANNED, &plan_summary(plan));
    let mut term = console::Term::stdout();
    let dim = console::Style::new().dim();
    for action in plan.actions() {
        let verb = match action {
            SyncAction::Upload(_) => console::Style::new().yellow().apply_to("+"),
            SyncAction::CopyRename { .. } | SyncAction::MoveRename { .. } => {
                console::Style::new().cyan().apply_to("~")
            }
            SyncAction::Delete(_) => console::Style::new().red().apply_to("-"),
        };
        let _ = writeln!(term, "  {verb} {}", dim.apply_to(action));
    }
}

/// Print the result of a one-shot pass
pub fn print_outcome(outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Synced(report) => {
            let uploaded = humansize::format_size(report.uploaded_bytes, humansize::BINARY);
            print_status(
                Status::SYNCED,
                &format!(
                    "{} in {}, {} uploaded ({})",
                    plural(report.files, "file"),
                    format_elapsed(report.elapsed),
                    uploaded,
                    plan_summary(&report.plan)
                ),
            );
        }
        PassOutcome::Unchanged => print_status(Status::UNCHANGED, "nothing to do"),
        PassOutcome::Skipped => print_status(Status::SKIPPED, "another pass is running"),
    }
}

/// Print a scan summary
pub fn print_scan(files: usize, total_bytes: u64) {
    let size = humansize::format_size(total_bytes, humansize::BINARY);
    print_status(Status::SCANNED, &format!("{} ({size})", plural(files, "file")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropsync_core::RelPath;

    #[test]
    fn test_plan_summary() {
        let plan = Plan {
            transfers: vec![
                SyncAction::Upload(RelPath::new("a").unwrap()),
                SyncAction::MoveRename {
                    src: RelPath::new("b").unwrap(),
                    dst: RelPath::new("c").unwrap(),
                },
            ],
            cleanup: vec![SyncAction::Delete(RelPath::new("d").unwrap())],
        };
        assert_eq!(plan_summary(&plan), "2 transfers (1 upload), 1 delete");
        assert_eq!(plan_summary(&Plan::default()), "0 transfers (0 uploads), 0 deletes");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(3200)), "3.20s");
    }
}
