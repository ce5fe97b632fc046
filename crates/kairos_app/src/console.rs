use chrono::{DateTime, Local};
use kairos_client::{Notifier, ServerEvent};
use kairos_core::{NotebookViewModel, Notification, NotificationLevel, PcaPoint};

/// Prints notifications as they arrive; errors go to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        let line = notification_line(Local::now(), notification);
        match notification.level {
            NotificationLevel::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}

pub fn notification_line(at: DateTime<Local>, notification: &Notification) -> String {
    format!("{} {}", at.format("%H:%M:%S"), notification)
}

pub fn event_line(at: DateTime<Local>, event: &ServerEvent) -> String {
    format!("{} event {}: {}", at.format("%H:%M:%S"), event.name, event.data)
}

pub fn render_overview(view: &NotebookViewModel) -> String {
    let mut out = String::new();
    let id = view.notebook_id.as_deref().unwrap_or("-");
    out.push_str(&format!("{} ({id})\n", heading(&view.name)));

    out.push_str(&format!("\nSources ({})\n", view.sources.len()));
    for row in &view.sources {
        out.push_str(&format!(
            "  {}  {:<7} {}  [{} chunks]\n",
            row.id, row.kind.as_str(), row.origin, row.chunk_count
        ));
    }

    out.push_str(&format!("\nLive sources ({})\n", view.live_sources.len()));
    for row in &view.live_sources {
        let state = if row.running { "running" } else { "stopped" };
        out.push_str(&format!(
            "  {}  {:<7} {}  {state}\n",
            row.id, row.kind.as_str(), row.origin
        ));
    }

    out.push_str(&format!("\nGenerations ({})\n", view.generations.len()));
    for row in &view.generations {
        out.push_str(&format!("  {} {}: {}\n", row.kind, row.id, row.output_preview));
    }

    out.push_str(&format!("\nConversation ({})\n", view.conversation.len()));
    for message in &view.conversation {
        out.push_str(&format!("  {}: {}\n", message.sender, message.text));
    }

    out.push_str("\nDocument");
    if view.unsaved_changes {
        out.push_str(" (unsaved)");
    }
    out.push('\n');
    for line in view.document_text.lines() {
        out.push_str(&format!("  {line}\n"));
    }
    out
}

pub fn render_jobs(view: &NotebookViewModel) -> String {
    if view.jobs.is_empty() {
        return "no jobs\n".to_string();
    }
    let mut out = format!("{} running\n", view.running_job_count);
    for row in &view.jobs {
        let status = if row.error {
            "error".to_string()
        } else {
            format!("{:?}", row.status).to_lowercase()
        };
        out.push_str(&format!("  {:<10} {}", status, row.job_id));
        if let Some(output) = &row.output_preview {
            out.push_str(&format!("  {output}"));
        }
        out.push('\n');
    }
    out
}

pub fn render_pca(points: &[PcaPoint]) -> String {
    points
        .iter()
        .map(|point| format!("{:>8.3} {:>8.3}  {}\n", point.x, point.y, point.text))
        .collect()
}

fn heading(name: &str) -> &str {
    if name.trim().is_empty() {
        "Untitled"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::{notification_line, render_jobs, render_overview};
    use chrono::{Local, TimeZone};
    use kairos_core::{JobRowView, JobStatus, NotebookViewModel, Notification};

    #[test]
    fn notification_line_has_local_time_prefix() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap();
        let line = notification_line(at, &Notification::error("save failed", "disk full"));
        assert_eq!(line, "09:07:03 [error] save failed: disk full");
    }

    #[test]
    fn overview_marks_unsaved_document() {
        let view = NotebookViewModel {
            name: String::new(),
            document_text: "Line".into(),
            unsaved_changes: true,
            ..NotebookViewModel::default()
        };
        let text = render_overview(&view);
        assert!(text.starts_with("Untitled (-)"));
        assert!(text.contains("Document (unsaved)\n  Line\n"));
    }

    #[test]
    fn jobs_show_error_rows() {
        let view = NotebookViewModel {
            jobs: vec![JobRowView {
                job_id: "j1".into(),
                status: JobStatus::Finished,
                error: true,
                output_preview: Some("boom".into()),
            }],
            ..NotebookViewModel::default()
        };
        assert_eq!(render_jobs(&view), "0 running\n  error      j1  boom\n");
    }
}
