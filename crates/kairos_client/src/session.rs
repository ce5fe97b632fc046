use std::sync::{Arc, Mutex, MutexGuard};

use kairos_core::{
    update, Effect, Job, JobId, Msg, NotebookId, NotebookState, NotebookViewModel, Notification,
    Operation, PcaPoint, SourceId, SourceKind, PING_EVENT,
};
use kairos_logging::{kairos_debug, kairos_info};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::job::{join_job, JobOutcome, NoProgress, ProgressSink};
use crate::sse::ServerEvent;
use crate::{ApiError, JobRef, NotebookApi, PickKind, PollSettings};

/// Receives the notifications produced by session actions and pushed events.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{operation}: {source}")]
    Api {
        operation: Operation,
        #[source]
        source: ApiError,
    },
    #[error("{operation}: {outcome}")]
    Job {
        operation: Operation,
        outcome: JobOutcome,
    },
    #[error("{0}: notebook is not loaded yet")]
    NotLoaded(Operation),
}

/// Per-notebook view-model: a cache of the notebook plus the actions that
/// change it on the server.
///
/// Every action follows the same shape: submit, wait for the job, then
/// re-fetch whatever the job touched. The cache is never updated
/// optimistically; only the editor document is edited locally. A failing
/// action reports exactly one error notification and leaves the document
/// untouched.
pub struct NotebookSession {
    notebook_id: NotebookId,
    api: Arc<dyn NotebookApi>,
    poll: PollSettings,
    cancel: CancellationToken,
    notifier: Arc<dyn Notifier>,
    state: Mutex<NotebookState>,
}

impl NotebookSession {
    pub fn new(
        notebook_id: impl Into<NotebookId>,
        api: Arc<dyn NotebookApi>,
        poll: PollSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            api,
            poll,
            cancel: CancellationToken::new(),
            notifier,
            state: Mutex::new(NotebookState::new()),
        }
    }

    /// Creates a notebook on the service and returns a loaded session for it.
    pub async fn create(
        api: Arc<dyn NotebookApi>,
        name: Option<&str>,
        path: Option<&str>,
        poll: PollSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SessionError> {
        let notebook_id = api
            .create_notebook(name, path)
            .await
            .map_err(|source| report_api(notifier.as_ref(), Operation::Create, source))?;
        kairos_info!("created notebook {}", notebook_id);
        let session = Self::new(notebook_id, api, poll, notifier);
        session.load().await?;
        Ok(session)
    }

    /// Loads a notebook file on the service host and returns a loaded session.
    /// Cancelling `cancel` stops waiting for the load job.
    pub async fn open_path(
        api: Arc<dyn NotebookApi>,
        path: Option<&str>,
        poll: PollSettings,
        cancel: &CancellationToken,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SessionError> {
        let operation = Operation::Load;
        let job_id = api
            .load_notebook(path)
            .await
            .map_err(|source| report_api(notifier.as_ref(), operation, source))?;
        // The load job is filed under its own id.
        let job = JobRef::scoped(job_id.clone(), job_id);
        let outcome = join_job(api.as_ref(), &job, &poll, cancel, &NoProgress)
            .await
            .map_err(|source| report_api(notifier.as_ref(), operation, source))?;
        let notebook_id = match outcome.output_text() {
            Some(id) if outcome.is_success() => id,
            _ => {
                let outcome = if outcome.is_success() {
                    JobOutcome::Failed {
                        job_id: job.job_id().to_string(),
                        reason: "load job returned no notebook id".into(),
                    }
                } else {
                    outcome
                };
                return Err(report_job(notifier.as_ref(), operation, outcome));
            }
        };
        let session = Self::new(notebook_id, api, poll, notifier);
        session.load().await?;
        Ok(session)
    }

    pub fn notebook_id(&self) -> &str {
        &self.notebook_id
    }

    /// Token that cancels every poll started by this session. Event
    /// subscriptions should hang off it via `child_token`.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stops in-flight polls; they resolve as [`JobOutcome::Cancelled`].
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn view(&self) -> NotebookViewModel {
        self.lock_state().view()
    }

    pub fn snapshot(&self) -> NotebookState {
        self.lock_state().clone()
    }

    /// Returns whether anything changed since the last call.
    pub fn consume_dirty(&self) -> bool {
        self.lock_state().consume_dirty()
    }

    /// Fetches the whole notebook and replaces the cache.
    pub async fn load(&self) -> Result<(), SessionError> {
        let operation = Operation::Load;
        let request = self.api.notebook(&self.notebook_id);
        let notebook = self.call(operation, request).await?;
        self.dispatch(Msg::NotebookLoaded {
            id: self.notebook_id.clone(),
            notebook,
        });
        self.refresh_running_live_sources(operation).await?;
        self.refresh_jobs_for(operation).await
    }

    /// Re-fetches every collection and the editor content. Unsaved local
    /// edits are kept and a warning is emitted instead.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let operation = Operation::Refresh;
        let request = self.api.content(&self.notebook_id);
        let content = self.call(operation, request).await?;
        self.dispatch(Msg::ContentFetched(content));
        self.refresh_sources(operation).await?;
        self.refresh_live_sources(operation).await?;
        self.refresh_running_live_sources(operation).await?;
        self.refresh_conversation(operation).await?;
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await
    }

    pub async fn refresh_jobs(&self) -> Result<(), SessionError> {
        self.refresh_jobs_for(Operation::Refresh).await
    }

    pub async fn rename(&self, name: &str) -> Result<(), SessionError> {
        let rename = self.api.rename_notebook(&self.notebook_id, name);
        let notebook = self.call(Operation::Rename, rename).await?;
        self.dispatch(Msg::NameFetched(notebook.name));
        Ok(())
    }

    /// Runs `prompt` against the notebook agent. The answer is recorded as a
    /// generation; it is also returned.
    pub async fn run(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        let operation = Operation::Run;
        let content = self.loaded_content(operation)?;
        let request = self.api.run(&self.notebook_id, &content, prompt);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        self.refresh_generations(operation).await?;
        self.refresh_conversation(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(outcome.output_text())
    }

    /// Generates text for `prompt` and appends it to the document.
    pub async fn generate(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        let operation = Operation::Generate;
        let content = self.loaded_content(operation)?;
        let request = self.api.generate(&self.notebook_id, &content, prompt);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        let output = outcome.output_text();
        if let Some(text) = &output {
            self.dispatch(Msg::InsertText(text.clone()));
        }
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(output)
    }

    /// Rewrites `selection` according to `prompt` and replaces it in the
    /// document.
    pub async fn edit(
        &self,
        selection: &str,
        prompt: &str,
    ) -> Result<Option<String>, SessionError> {
        let operation = Operation::Edit;
        let content = self.loaded_content(operation)?;
        let request = self.api.edit(&self.notebook_id, &content, selection, prompt);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        let output = outcome.output_text();
        if let Some(text) = &output {
            self.dispatch(Msg::ReplaceSelection {
                selection: selection.to_string(),
                replacement: text.clone(),
            });
        }
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(output)
    }

    /// Sends a chat turn and returns the reply.
    pub async fn chat(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        let operation = Operation::Chat;
        let request = self.api.chat(&self.notebook_id, prompt);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        self.refresh_conversation(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(outcome.output_text())
    }

    /// Asks for writing ideas based on the current document.
    pub async fn ideas(&self) -> Result<Option<String>, SessionError> {
        let operation = Operation::Ideas;
        let content = self.loaded_content(operation)?;
        let request = self.api.ideas(&self.notebook_id, &content);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(outcome.output_text())
    }

    /// Ingests a new source and refreshes the source list.
    pub async fn add_source(&self, kind: SourceKind, origin: &str) -> Result<(), SessionError> {
        let operation = Operation::AddSource;
        let request = self.api.add_source(&self.notebook_id, kind, origin);
        let job_id = self.call(operation, request).await?;
        self.await_job(operation, job_id).await?;
        self.refresh_sources(operation).await?;
        self.refresh_jobs_for(operation).await
    }

    pub async fn source_content(&self, source_id: &str) -> Result<String, SessionError> {
        let request = self.api.source_content(&self.notebook_id, source_id);
        self.call(Operation::SourceSummary, request).await
    }

    /// Summarizes a source, optionally only its last `last_k` chunks.
    pub async fn source_summary(
        &self,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<Option<String>, SessionError> {
        let operation = Operation::SourceSummary;
        let request = self.api.source_summary(&self.notebook_id, source_id, last_k);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(outcome.output_text())
    }

    pub async fn live_source_summary(
        &self,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<Option<String>, SessionError> {
        let operation = Operation::LiveSourceSummary;
        let request = self.api.live_source_summary(&self.notebook_id, source_id, last_k);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        self.refresh_generations(operation).await?;
        self.refresh_jobs_for(operation).await?;
        Ok(outcome.output_text())
    }

    /// Starts a live source; returns its id.
    pub async fn start_live_source(
        &self,
        kind: SourceKind,
        origin: &str,
    ) -> Result<SourceId, SessionError> {
        let operation = Operation::StartLiveSource;
        let request = self.api.start_live_source(&self.notebook_id, kind, origin);
        let id = self.call(operation, request).await?;
        self.refresh_live_sources(operation).await?;
        self.refresh_running_live_sources(operation).await?;
        Ok(id)
    }

    pub async fn stop_live_source(&self, source_id: &str) -> Result<bool, SessionError> {
        let operation = Operation::StopLiveSource;
        let request = self.api.stop_live_source(&self.notebook_id, source_id);
        let stopped = self.call(operation, request).await?;
        self.refresh_running_live_sources(operation).await?;
        Ok(stopped)
    }

    /// Saves the current document, optionally to a new path on the service
    /// host. Edits made while the save is in flight stay marked unsaved.
    pub async fn save(&self, path: Option<&str>) -> Result<(), SessionError> {
        let operation = Operation::Save;
        let content = self.loaded_content(operation)?;
        let request = self.api.save_notebook(&self.notebook_id, &content, path);
        let job_id = self.call(operation, request).await?;
        self.await_job(operation, job_id).await?;
        let unchanged = self.lock_state().content().as_value() == &content;
        if unchanged {
            self.dispatch(Msg::ContentSaved);
        }
        self.refresh_jobs_for(operation).await
    }

    /// Appends text to the document without a server round trip.
    pub fn insert(&self, text: &str) {
        self.dispatch(Msg::InsertText(text.to_string()));
    }

    /// Opens the native file picker on the service host; returns the picked
    /// path, or `None` if the picker was dismissed.
    pub async fn pick_file(&self, kind: PickKind) -> Result<Option<String>, SessionError> {
        let operation = Operation::PickFile;
        let request = self.api.open_file(Some(&self.notebook_id), kind);
        let job_id = self.call(operation, request).await?;
        let outcome = self.await_job(operation, job_id).await?;
        Ok(outcome.output_text().filter(|path| !path.is_empty()))
    }

    pub async fn pca(&self) -> Result<Vec<PcaPoint>, SessionError> {
        let request = self.api.pca(&self.notebook_id);
        self.call(Operation::Refresh, request).await
    }

    /// Feeds a pushed event through the state machine.
    pub fn apply_server_event(&self, event: ServerEvent) {
        if event.name != PING_EVENT {
            kairos_debug!("ignoring '{}' event for {}", event.name, self.notebook_id);
        }
        self.dispatch(Msg::ServerEvent {
            name: event.name,
            data: event.data,
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, NotebookState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, msg: Msg) {
        let effects = {
            let mut guard = self.lock_state();
            let state = std::mem::take(&mut *guard);
            let (state, effects) = update(state, msg);
            *guard = state;
            effects
        };
        for effect in effects {
            match effect {
                Effect::Notify(notification) => self.notifier.notify(&notification),
            }
        }
    }

    fn loaded_content(&self, operation: Operation) -> Result<Value, SessionError> {
        let state = self.lock_state();
        if !state.is_loaded() {
            drop(state);
            self.dispatch(Msg::OperationFailed {
                operation,
                reason: "notebook is not loaded yet".into(),
            });
            return Err(SessionError::NotLoaded(operation));
        }
        Ok(state.content().as_value().clone())
    }

    async fn call<T>(
        &self,
        operation: Operation,
        request: impl std::future::Future<Output = Result<T, ApiError>>,
    ) -> Result<T, SessionError> {
        match request.await {
            Ok(value) => Ok(value),
            Err(source) => {
                self.dispatch(Msg::OperationFailed {
                    operation,
                    reason: source.to_string(),
                });
                Err(SessionError::Api { operation, source })
            }
        }
    }

    async fn await_job(
        &self,
        operation: Operation,
        job_id: JobId,
    ) -> Result<JobOutcome, SessionError> {
        let job = JobRef::scoped(self.notebook_id.clone(), job_id);
        let sink = StateProgress { session: self };
        let poll = join_job(self.api.as_ref(), &job, &self.poll, &self.cancel, &sink);
        let outcome = self.call(operation, poll).await?;
        if outcome.is_success() {
            return Ok(outcome);
        }
        self.dispatch(Msg::OperationFailed {
            operation,
            reason: outcome.to_string(),
        });
        Err(SessionError::Job { operation, outcome })
    }

    async fn refresh_sources(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.sources(&self.notebook_id);
        let sources = self.call(operation, request).await?;
        self.dispatch(Msg::SourcesFetched(sources));
        Ok(())
    }

    async fn refresh_live_sources(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.live_sources(&self.notebook_id);
        let sources = self.call(operation, request).await?;
        self.dispatch(Msg::LiveSourcesFetched(sources));
        Ok(())
    }

    async fn refresh_running_live_sources(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.running_live_sources(&self.notebook_id);
        let ids = self.call(operation, request).await?;
        self.dispatch(Msg::RunningLiveSourcesFetched(ids));
        Ok(())
    }

    async fn refresh_conversation(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.conversation(&self.notebook_id);
        let conversation = self.call(operation, request).await?;
        self.dispatch(Msg::ConversationFetched(conversation));
        Ok(())
    }

    async fn refresh_generations(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.generations(&self.notebook_id);
        let generations = self.call(operation, request).await?;
        self.dispatch(Msg::GenerationsFetched(generations));
        Ok(())
    }

    async fn refresh_jobs_for(&self, operation: Operation) -> Result<(), SessionError> {
        let request = self.api.jobs(&self.notebook_id);
        let jobs = self.call(operation, request).await?;
        self.dispatch(Msg::JobsFetched(jobs));
        Ok(())
    }
}

struct StateProgress<'a> {
    session: &'a NotebookSession,
}

impl ProgressSink for StateProgress<'_> {
    fn on_progress(&self, job: &Job) {
        self.session.dispatch(Msg::JobProgress(job.clone()));
    }
}

fn report_api(notifier: &dyn Notifier, operation: Operation, source: ApiError) -> SessionError {
    notifier.notify(&Notification::error(
        format!("{operation} failed"),
        source.to_string(),
    ));
    SessionError::Api { operation, source }
}

fn report_job(notifier: &dyn Notifier, operation: Operation, outcome: JobOutcome) -> SessionError {
    notifier.notify(&Notification::error(
        format!("{operation} failed"),
        outcome.to_string(),
    ));
    SessionError::Job { operation, outcome }
}
