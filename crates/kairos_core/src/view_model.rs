use crate::{JobId, JobStatus, Message, NotebookId, SourceId, SourceKind};

const TRUNCATED_MARKER: &str = "…";
pub const MAX_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotebookViewModel {
    pub notebook_id: Option<NotebookId>,
    pub name: String,
    pub sources: Vec<SourceRowView>,
    pub live_sources: Vec<LiveSourceRowView>,
    pub conversation: Vec<Message>,
    pub generations: Vec<GenerationRowView>,
    pub jobs: Vec<JobRowView>,
    pub running_job_count: usize,
    pub document_text: String,
    pub unsaved_changes: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRowView {
    pub id: SourceId,
    pub kind: SourceKind,
    pub origin: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSourceRowView {
    pub id: SourceId,
    pub kind: SourceKind,
    pub origin: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRowView {
    pub id: String,
    pub kind: String,
    pub input: String,
    pub output_preview: String,
    pub step_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub error: bool,
    pub output_preview: Option<String>,
}

/// Single-line preview capped at [`MAX_PREVIEW_CHARS`] characters.
pub fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(MAX_PREVIEW_CHARS) {
        Some((end, _)) => format!("{}{TRUNCATED_MARKER}", &flat[..end]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{preview, MAX_PREVIEW_CHARS};

    #[test]
    fn short_text_kept_but_flattened() {
        assert_eq!(preview("a\n  b\tc"), "a b c");
    }

    #[test]
    fn long_text_truncated_on_char_boundary() {
        let text: String = "é".repeat(MAX_PREVIEW_CHARS + 10);
        let out = preview(&text);
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), MAX_PREVIEW_CHARS + 1);
    }
}
