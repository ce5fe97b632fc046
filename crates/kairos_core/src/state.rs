use crate::document::Document;
use crate::view_model::{
    preview, GenerationRowView, JobRowView, LiveSourceRowView, NotebookViewModel, SourceRowView,
};
use crate::{Generation, Job, Message, Notebook, NotebookId, Source, SourceId};

/// Client-side cache of one notebook. Only the editor document is ever
/// changed locally; everything else mirrors the last fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotebookState {
    notebook_id: Option<NotebookId>,
    name: String,
    sources: Vec<Source>,
    live_sources: Vec<Source>,
    running_live_sources: Vec<SourceId>,
    conversation: Vec<Message>,
    generations: Vec<Generation>,
    jobs: Vec<Job>,
    content: Document,
    unsaved_changes: bool,
    dirty: bool,
}

impl NotebookState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notebook_id(&self) -> Option<&str> {
        self.notebook_id.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.notebook_id.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn live_sources(&self) -> &[Source] {
        &self.live_sources
    }

    pub fn running_live_sources(&self) -> &[SourceId] {
        &self.running_live_sources
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn generations(&self) -> &[Generation] {
        &self.generations
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn content(&self) -> &Document {
        &self.content
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn view(&self) -> NotebookViewModel {
        NotebookViewModel {
            notebook_id: self.notebook_id.clone(),
            name: self.name.clone(),
            sources: self
                .sources
                .iter()
                .map(|source| SourceRowView {
                    id: source.id.clone(),
                    kind: source.kind,
                    origin: source.origin.clone(),
                    chunk_count: source.ids.len(),
                })
                .collect(),
            live_sources: self
                .live_sources
                .iter()
                .map(|source| LiveSourceRowView {
                    id: source.id.clone(),
                    kind: source.kind,
                    origin: source.origin.clone(),
                    running: self.running_live_sources.contains(&source.id),
                })
                .collect(),
            conversation: self.conversation.clone(),
            generations: self
                .generations
                .iter()
                .map(|generation| GenerationRowView {
                    id: generation.id.clone(),
                    kind: generation.kind.clone(),
                    input: generation.input.clone(),
                    output_preview: preview(&generation.output),
                    step_count: generation.steps().len(),
                })
                .collect(),
            jobs: self
                .jobs
                .iter()
                .map(|job| JobRowView {
                    job_id: job.id.clone(),
                    status: job.status.clone(),
                    error: job.error,
                    output_preview: job.output_text().map(|text| preview(&text)),
                })
                .collect(),
            running_job_count: self.jobs.iter().filter(|job| job.is_running()).count(),
            document_text: self.content.plain_text(),
            unsaved_changes: self.unsaved_changes,
            dirty: self.dirty,
        }
    }

    /// Returns whether a re-render is pending and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn load(&mut self, id: NotebookId, notebook: Notebook) {
        self.notebook_id = Some(id);
        self.name = notebook.name;
        self.sources = notebook.sources;
        self.live_sources = notebook.live_sources;
        self.conversation = notebook.conversation;
        self.generations = notebook.generations;
        self.content = Document::from_value(notebook.content);
        self.unsaved_changes = false;
        self.mark_dirty();
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        self.mark_dirty();
    }

    /// Adopts the server document unless local edits are pending.
    pub(crate) fn set_server_content(&mut self, value: serde_json::Value) -> bool {
        if self.unsaved_changes {
            return false;
        }
        self.content = Document::from_value(value);
        self.mark_dirty();
        true
    }

    pub(crate) fn set_sources(&mut self, sources: Vec<Source>) {
        self.sources = sources;
        self.mark_dirty();
    }

    pub(crate) fn set_live_sources(&mut self, sources: Vec<Source>) {
        self.live_sources = sources;
        self.mark_dirty();
    }

    pub(crate) fn set_running_live_sources(&mut self, ids: Vec<SourceId>) {
        self.running_live_sources = ids;
        self.mark_dirty();
    }

    pub(crate) fn set_conversation(&mut self, conversation: Vec<Message>) {
        self.conversation = conversation;
        self.mark_dirty();
    }

    pub(crate) fn set_generations(&mut self, generations: Vec<Generation>) {
        self.generations = generations;
        self.mark_dirty();
    }

    pub(crate) fn set_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
        self.mark_dirty();
    }

    /// Insert or replace a job snapshot, keeping first-seen order.
    pub(crate) fn upsert_job(&mut self, job: Job) {
        match self.jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => *existing = job,
            None => self.jobs.push(job),
        }
        self.mark_dirty();
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.content.append_paragraphs(text);
        self.unsaved_changes = true;
        self.mark_dirty();
    }

    pub(crate) fn replace_selection(&mut self, selection: &str, replacement: &str) -> bool {
        let replaced = self.content.replace_text(selection, replacement);
        if replaced {
            self.unsaved_changes = true;
            self.mark_dirty();
        }
        replaced
    }

    pub(crate) fn mark_saved(&mut self) {
        self.unsaved_changes = false;
        self.mark_dirty();
    }
}
