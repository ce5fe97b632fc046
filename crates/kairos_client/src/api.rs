use std::fmt;

use kairos_core::{
    Generation, Job, JobId, Message, Notebook, NotebookId, PcaPoint, Source, SourceId, SourceKind,
};
use serde_json::Value;

use crate::ApiError;

/// Which job registry a job lives in.
///
/// The service files most jobs under the notebook that started them
/// (`notebooks/{id}/jobs/{job}`); the global `jobs/{job}` route is kept for
/// older deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobRef {
    Global(JobId),
    Scoped { notebook_id: NotebookId, job_id: JobId },
}

impl JobRef {
    pub fn scoped(notebook_id: impl Into<NotebookId>, job_id: impl Into<JobId>) -> Self {
        JobRef::Scoped {
            notebook_id: notebook_id.into(),
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            JobRef::Global(job_id) | JobRef::Scoped { job_id, .. } => job_id,
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobRef::Global(job_id) => write!(f, "{job_id}"),
            JobRef::Scoped {
                notebook_id,
                job_id,
            } => write!(f, "{notebook_id}/{job_id}"),
        }
    }
}

/// What the native file picker on the service host should select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    File,
    Directory,
}

impl PickKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PickKind::File => "file",
            PickKind::Directory => "directory",
        }
    }
}

/// Remote notebook service. Operations that start background work return the
/// id of the job to poll with [`crate::join_job`].
#[async_trait::async_trait]
pub trait NotebookApi: Send + Sync {
    async fn open_file(&self, notebook_id: Option<&str>, kind: PickKind)
        -> Result<JobId, ApiError>;
    async fn save_file(&self, notebook_id: Option<&str>, kind: PickKind)
        -> Result<JobId, ApiError>;

    async fn create_notebook(
        &self,
        name: Option<&str>,
        path: Option<&str>,
    ) -> Result<NotebookId, ApiError>;
    async fn rename_notebook(&self, notebook_id: &str, name: &str) -> Result<Notebook, ApiError>;
    async fn notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError>;
    async fn name(&self, notebook_id: &str) -> Result<String, ApiError>;
    async fn content(&self, notebook_id: &str) -> Result<Value, ApiError>;
    async fn save_notebook(
        &self,
        notebook_id: &str,
        content: &Value,
        path: Option<&str>,
    ) -> Result<JobId, ApiError>;
    /// Loads a notebook file; the job is filed under its own id and its
    /// output is the new notebook id.
    async fn load_notebook(&self, path: Option<&str>) -> Result<JobId, ApiError>;

    async fn run(&self, notebook_id: &str, content: &Value, prompt: &str)
        -> Result<JobId, ApiError>;
    async fn generate(
        &self,
        notebook_id: &str,
        content: &Value,
        prompt: &str,
    ) -> Result<JobId, ApiError>;
    async fn edit(
        &self,
        notebook_id: &str,
        content: &Value,
        text: &str,
        prompt: &str,
    ) -> Result<JobId, ApiError>;
    async fn chat(&self, notebook_id: &str, prompt: &str) -> Result<JobId, ApiError>;
    async fn ideas(&self, notebook_id: &str, content: &Value) -> Result<JobId, ApiError>;

    async fn sources(&self, notebook_id: &str) -> Result<Vec<Source>, ApiError>;
    async fn add_source(
        &self,
        notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<JobId, ApiError>;
    async fn source(&self, notebook_id: &str, source_id: &str) -> Result<Source, ApiError>;
    async fn source_content(&self, notebook_id: &str, source_id: &str)
        -> Result<String, ApiError>;
    async fn source_summary(
        &self,
        notebook_id: &str,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<JobId, ApiError>;

    async fn live_sources(&self, notebook_id: &str) -> Result<Vec<Source>, ApiError>;
    async fn start_live_source(
        &self,
        notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<SourceId, ApiError>;
    async fn running_live_sources(&self, notebook_id: &str) -> Result<Vec<SourceId>, ApiError>;
    async fn live_source(&self, notebook_id: &str, source_id: &str) -> Result<Source, ApiError>;
    async fn live_source_summary(
        &self,
        notebook_id: &str,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<JobId, ApiError>;
    async fn stop_live_source(&self, notebook_id: &str, source_id: &str)
        -> Result<bool, ApiError>;

    async fn document(&self, notebook_id: &str, document_id: &str) -> Result<Value, ApiError>;
    async fn conversation(&self, notebook_id: &str) -> Result<Vec<Message>, ApiError>;
    async fn generations(&self, notebook_id: &str) -> Result<Vec<Generation>, ApiError>;
    async fn jobs(&self, notebook_id: &str) -> Result<Vec<Job>, ApiError>;
    async fn job(&self, job: &JobRef) -> Result<Job, ApiError>;
    async fn pca(&self, notebook_id: &str) -> Result<Vec<PcaPoint>, ApiError>;
    /// Asks the service to push a `ping` event to the notebook's subscribers.
    async fn ping(&self, notebook_id: &str) -> Result<String, ApiError>;
}
