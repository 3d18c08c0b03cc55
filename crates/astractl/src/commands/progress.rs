//! Spinner output for commands that wait on a database status

use std::time::Duration;

use astractl_core::{ProgressCallback, ProgressEvent, Status};
use indicatif::{ProgressBar, ProgressStyle};

/// A spinner driven by poller events
///
/// Hidden when verbose logging is on; the poller's log lines replace it.
pub struct WaitSpinner {
    pb: ProgressBar,
}

impl WaitSpinner {
    pub fn new(verbose: bool) -> Self {
        let pb = if verbose {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        Self { pb }
    }

    /// A callback for the client that updates this spinner
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Box::new(move |event: ProgressEvent| {
            pb.set_message(describe(&event));
        })
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for WaitSpinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

fn join(statuses: &[Status]) -> String {
    statuses
        .iter()
        .map(Status::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Spinner text for an event
pub fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started { id, awaiting, .. } => {
            format!("Waiting for {} to become {}", id, join(awaiting))
        }
        ProgressEvent::Waiting {
            id,
            status,
            attempt,
            attempts,
        } => format!("{}: {} (check {}/{})", id, status, attempt, attempts),
        ProgressEvent::LookupFailed {
            id,
            attempt,
            attempts,
            ..
        } => format!(
            "{}: status unavailable, retrying (check {}/{})",
            id, attempt, attempts
        ),
        ProgressEvent::Completed { id, status } => match status {
            Some(status) => format!("\u{2713} {} is {}", id, status),
            None => format!("\u{2713} {} is gone", id),
        },
        ProgressEvent::Failed { id, error } => format!("\u{2717} {}: {}", id, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_waiting_with_attempt_counter() {
        let event = ProgressEvent::Waiting {
            id: "db-1".to_string(),
            status: Status::Provisioning,
            attempt: 3,
            attempts: 120,
        };
        assert_eq!(describe(&event), "db-1: PROVISIONING (check 3/120)");
    }

    #[test]
    fn describes_started_with_all_targets() {
        let event = ProgressEvent::Started {
            id: "db-1".to_string(),
            awaiting: vec![Status::Terminated, Status::Terminating],
            attempts: 30,
        };
        assert_eq!(
            describe(&event),
            "Waiting for db-1 to become TERMINATED or TERMINATING"
        );
    }

    #[test]
    fn gone_completion_is_reported() {
        let event = ProgressEvent::Completed {
            id: "db-1".to_string(),
            status: None,
        };
        assert!(describe(&event).contains("gone"));
    }

    #[test]
    fn hidden_spinner_accepts_events() {
        let spinner = WaitSpinner::new(true);
        let callback = spinner.callback();
        callback(ProgressEvent::Failed {
            id: "db-1".to_string(),
            error: "boom".to_string(),
        });
        spinner.finish();
    }
}
