//! Terminal rendering of upload events.

use datadrop_upload::{ReadinessState, UploadEvent, UploadState};
use tokio::sync::mpsc;

/// Prints events until the pipeline drops its sender.
pub async fn render_events(mut events: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// Formats one event as a status line. Events with nothing to show yield
/// `None`.
pub fn describe(event: &UploadEvent) -> Option<String> {
    match event {
        UploadEvent::StateChanged(state) => match state {
            UploadState::Creating => Some("Creating dataset ...".into()),
            UploadState::Transferring => Some("Uploading files ...".into()),
            UploadState::Completed => Some("Upload complete".into()),
            UploadState::Idle | UploadState::Failed => None,
        },
        UploadEvent::DatasetCreated { dataset_id } => Some(format!("Dataset {dataset_id} created")),
        UploadEvent::Progress(p) => Some(format!(
            "[{:5.1}%] {} ({:.0}%)",
            p.dataset_progress, p.current_file_name, p.file_progress
        )),
        UploadEvent::Failed { error } => Some(format!("Upload failed: {error}")),
        UploadEvent::Readiness(update) => {
            let marker = match update.state {
                ReadinessState::Available => "ok",
                ReadinessState::Deleted | ReadinessState::Failed | ReadinessState::Unknown => "!!",
                _ => "..",
            };
            Some(format!("[{marker}] {}", update.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datadrop_upload::{ReadinessUpdate, UploadProgressSnapshot};

    #[test]
    fn progress_line() {
        let event = UploadEvent::Progress(UploadProgressSnapshot {
            dataset_progress: 42.5,
            file_progress: 100.0,
            current_file_name: "survey/a.csv".into(),
        });
        assert_eq!(describe(&event).unwrap(), "[ 42.5%] survey/a.csv (100%)");
    }

    #[test]
    fn readiness_lines_are_marked() {
        let ready = UploadEvent::Readiness(ReadinessUpdate {
            state: ReadinessState::Available,
            message: "Dataset ready".into(),
        });
        assert_eq!(describe(&ready).unwrap(), "[ok] Dataset ready");

        let gone = UploadEvent::Readiness(ReadinessUpdate {
            state: ReadinessState::Deleted,
            message: "Malware detected, the dataset was deleted".into(),
        });
        assert!(describe(&gone).unwrap().starts_with("[!!]"));
    }

    #[test]
    fn failed_state_is_reported_once() {
        assert!(describe(&UploadEvent::StateChanged(UploadState::Failed)).is_none());
        assert_eq!(
            describe(&UploadEvent::Failed {
                error: "cancelled".into()
            })
            .unwrap(),
            "Upload failed: cancelled"
        );
    }
}
