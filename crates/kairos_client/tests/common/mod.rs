#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use kairos_client::{ApiError, ApiErrorKind, JobRef, NotebookApi, PickKind};
use kairos_core::{
    Generation, Job, JobId, JobStatus, Message, Notebook, NotebookId, PcaPoint, Source, SourceId,
    SourceKind,
};
use serde_json::{json, Value};
use tokio::time::Instant;

pub fn running(id: &str) -> Job {
    Job {
        id: id.into(),
        status: JobStatus::Running,
        error: false,
        output: None,
    }
}

pub fn finished(id: &str, output: Value) -> Job {
    Job {
        id: id.into(),
        status: JobStatus::Finished,
        error: false,
        output: Some(output),
    }
}

pub fn failed(id: &str, reason: &str) -> Job {
    Job {
        id: id.into(),
        status: JobStatus::Finished,
        error: true,
        output: Some(json!(reason)),
    }
}

pub fn document(lines: &[&str]) -> Value {
    let content: Vec<Value> = lines
        .iter()
        .map(|line| json!({"type": "paragraph", "content": [{"type": "text", "text": line}]}))
        .collect();
    json!({"type": "doc", "content": content})
}

/// In-memory service. Job status checks are answered from a script; the
/// last scripted snapshot repeats once the script runs dry.
#[derive(Default)]
pub struct ScriptedApi {
    pub notebook: Mutex<Notebook>,
    pub script: Mutex<VecDeque<Job>>,
    pub last_job: Mutex<Option<Job>>,
    pub job_checks: Mutex<Vec<(JobRef, Instant)>>,
    pub calls: Mutex<Vec<String>>,
    pub pending_sources: Mutex<Vec<Source>>,
    pub fail_submit: Mutex<Option<ApiError>>,
}

impl ScriptedApi {
    pub fn with_notebook(notebook: Notebook) -> Self {
        Self {
            notebook: Mutex::new(notebook),
            ..Self::default()
        }
    }

    pub fn script(&self, jobs: impl IntoIterator<Item = Job>) {
        self.script.lock().unwrap().extend(jobs);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn check_count(&self) -> usize {
        self.job_checks.lock().unwrap().len()
    }

    pub fn check_times(&self) -> Vec<Instant> {
        self.job_checks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn submit(&self, call: &str) -> Result<JobId, ApiError> {
        self.record(call);
        match self.fail_submit.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(format!("{call}-job")),
        }
    }
}

pub fn server_error() -> ApiError {
    ApiError::new(ApiErrorKind::HttpStatus(500), "500 Internal Server Error")
}

#[async_trait::async_trait]
impl NotebookApi for ScriptedApi {
    async fn open_file(
        &self,
        _notebook_id: Option<&str>,
        _kind: PickKind,
    ) -> Result<JobId, ApiError> {
        self.submit("open_file")
    }

    async fn save_file(
        &self,
        _notebook_id: Option<&str>,
        _kind: PickKind,
    ) -> Result<JobId, ApiError> {
        self.submit("save_file")
    }

    async fn create_notebook(
        &self,
        name: Option<&str>,
        _path: Option<&str>,
    ) -> Result<NotebookId, ApiError> {
        self.record("create");
        if let Some(err) = self.fail_submit.lock().unwrap().take() {
            return Err(err);
        }
        if let Some(name) = name {
            self.notebook.lock().unwrap().name = name.to_string();
        }
        Ok("nb-new".into())
    }

    async fn rename_notebook(&self, _notebook_id: &str, name: &str) -> Result<Notebook, ApiError> {
        self.record("rename");
        let mut notebook = self.notebook.lock().unwrap();
        notebook.name = name.to_string();
        Ok(notebook.clone())
    }

    async fn notebook(&self, _notebook_id: &str) -> Result<Notebook, ApiError> {
        self.record("notebook");
        Ok(self.notebook.lock().unwrap().clone())
    }

    async fn name(&self, _notebook_id: &str) -> Result<String, ApiError> {
        Ok(self.notebook.lock().unwrap().name.clone())
    }

    async fn content(&self, _notebook_id: &str) -> Result<Value, ApiError> {
        self.record("content");
        Ok(self.notebook.lock().unwrap().content.clone())
    }

    async fn save_notebook(
        &self,
        _notebook_id: &str,
        content: &Value,
        _path: Option<&str>,
    ) -> Result<JobId, ApiError> {
        self.notebook.lock().unwrap().content = content.clone();
        self.submit("save")
    }

    async fn load_notebook(&self, _path: Option<&str>) -> Result<JobId, ApiError> {
        self.submit("load")
    }

    async fn run(
        &self,
        _notebook_id: &str,
        _content: &Value,
        _prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.submit("run")
    }

    async fn generate(
        &self,
        _notebook_id: &str,
        _content: &Value,
        _prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.submit("generate")
    }

    async fn edit(
        &self,
        _notebook_id: &str,
        _content: &Value,
        _text: &str,
        _prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.submit("edit")
    }

    async fn chat(&self, _notebook_id: &str, _prompt: &str) -> Result<JobId, ApiError> {
        self.submit("chat")
    }

    async fn ideas(&self, _notebook_id: &str, _content: &Value) -> Result<JobId, ApiError> {
        self.submit("ideas")
    }

    async fn sources(&self, _notebook_id: &str) -> Result<Vec<Source>, ApiError> {
        self.record("sources");
        Ok(self.notebook.lock().unwrap().sources.clone())
    }

    async fn add_source(
        &self,
        _notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<JobId, ApiError> {
        let job_id = self.submit("add_source")?;
        // Becomes visible once the job has been polled to completion.
        self.pending_sources.lock().unwrap().push(Source {
            id: format!("src-{origin}"),
            kind,
            origin: origin.to_string(),
            ids: vec!["chunk-0".into()],
        });
        Ok(job_id)
    }

    async fn source(&self, _notebook_id: &str, source_id: &str) -> Result<Source, ApiError> {
        self.notebook
            .lock()
            .unwrap()
            .sources
            .iter()
            .find(|source| source.id == source_id)
            .cloned()
            .ok_or_else(|| ApiError::new(ApiErrorKind::HttpStatus(404), "no such source"))
    }

    async fn source_content(
        &self,
        _notebook_id: &str,
        source_id: &str,
    ) -> Result<String, ApiError> {
        Ok(format!("content of {source_id}"))
    }

    async fn source_summary(
        &self,
        _notebook_id: &str,
        _source_id: &str,
        _last_k: Option<u32>,
    ) -> Result<JobId, ApiError> {
        self.submit("source_summary")
    }

    async fn live_sources(&self, _notebook_id: &str) -> Result<Vec<Source>, ApiError> {
        self.record("live_sources");
        Ok(self.notebook.lock().unwrap().live_sources.clone())
    }

    async fn start_live_source(
        &self,
        _notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<SourceId, ApiError> {
        self.record("start_live_source");
        let id = format!("live-{origin}");
        self.notebook.lock().unwrap().live_sources.push(Source {
            id: id.clone(),
            kind,
            origin: origin.to_string(),
            ids: Vec::new(),
        });
        Ok(id)
    }

    async fn running_live_sources(&self, _notebook_id: &str) -> Result<Vec<SourceId>, ApiError> {
        self.record("running_live_sources");
        Ok(self
            .notebook
            .lock()
            .unwrap()
            .live_sources
            .iter()
            .map(|source| source.id.clone())
            .collect())
    }

    async fn live_source(&self, _notebook_id: &str, source_id: &str) -> Result<Source, ApiError> {
        self.notebook
            .lock()
            .unwrap()
            .live_sources
            .iter()
            .find(|source| source.id == source_id)
            .cloned()
            .ok_or_else(|| ApiError::new(ApiErrorKind::HttpStatus(404), "no such live source"))
    }

    async fn live_source_summary(
        &self,
        _notebook_id: &str,
        _source_id: &str,
        _last_k: Option<u32>,
    ) -> Result<JobId, ApiError> {
        self.submit("live_source_summary")
    }

    async fn stop_live_source(
        &self,
        _notebook_id: &str,
        source_id: &str,
    ) -> Result<bool, ApiError> {
        self.record("stop_live_source");
        let mut notebook = self.notebook.lock().unwrap();
        let before = notebook.live_sources.len();
        notebook.live_sources.retain(|source| source.id != source_id);
        Ok(notebook.live_sources.len() != before)
    }

    async fn document(&self, _notebook_id: &str, _document_id: &str) -> Result<Value, ApiError> {
        Ok(json!({}))
    }

    async fn conversation(&self, _notebook_id: &str) -> Result<Vec<Message>, ApiError> {
        self.record("conversation");
        Ok(self.notebook.lock().unwrap().conversation.clone())
    }

    async fn generations(&self, _notebook_id: &str) -> Result<Vec<Generation>, ApiError> {
        self.record("generations");
        Ok(self.notebook.lock().unwrap().generations.clone())
    }

    async fn jobs(&self, _notebook_id: &str) -> Result<Vec<Job>, ApiError> {
        self.record("jobs");
        Ok(self.last_job.lock().unwrap().iter().cloned().collect())
    }

    async fn job(&self, job: &JobRef) -> Result<Job, ApiError> {
        self.job_checks
            .lock()
            .unwrap()
            .push((job.clone(), Instant::now()));
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last_job.lock().unwrap();
        let snapshot = match next {
            Some(job) => job,
            None => last
                .clone()
                .ok_or_else(|| ApiError::new(ApiErrorKind::Decode, "no scripted job"))?,
        };
        if !snapshot.is_running() && !snapshot.error {
            let pending: Vec<Source> = self.pending_sources.lock().unwrap().drain(..).collect();
            self.notebook.lock().unwrap().sources.extend(pending);
        }
        *last = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn pca(&self, _notebook_id: &str) -> Result<Vec<PcaPoint>, ApiError> {
        Ok(vec![PcaPoint {
            x: 0.5,
            y: -1.0,
            text: "chunk".into(),
        }])
    }

    async fn ping(&self, _notebook_id: &str) -> Result<String, ApiError> {
        Ok("pong".into())
    }
}
