use kairos_core::{
    Generation, Job, JobId, Message, Notebook, NotebookId, PcaPoint, Source, SourceId, SourceKind,
};
use kairos_logging::{kairos_debug, kairos_trace};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::map_reqwest_error;
use crate::{ApiError, ApiErrorKind, ClientSettings, JobRef, NotebookApi, PickKind};

type Query<'a> = [(&'a str, Option<String>)];

/// [`NotebookApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpNotebookApi {
    client: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl HttpNotebookApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                ApiErrorKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiErrorKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base,
            settings,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Build `{base}/{segments...}?{query}`; absent query values are omitted
    /// and every path segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &Query<'_>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::new(ApiErrorKind::InvalidUrl, "base url cannot hold a path")
            })?;
            path.pop_if_empty().extend(segments);
        }
        let present: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (*key, value)))
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }

    /// Open the notebook's server-sent event stream. No request timeout is
    /// applied so the connection stays up until either side closes it.
    pub async fn open_event_stream(
        &self,
        notebook_id: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(&["events", notebook_id], &[])?;
        kairos_debug!("GET {} (event stream)", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &Query<'_>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments, query)?;
        self.send(Method::GET, url, None).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &Query<'_>,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments, query)?;
        self.send(Method::POST, url, body).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        kairos_debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(timeout) = self.settings.request_timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            let encoded = serde_json::to_vec(body)
                .map_err(|err| ApiError::new(ApiErrorKind::Encode, err.to_string()))?;
            request = request.header(CONTENT_TYPE, "application/json").body(encoded);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        kairos_trace!("response body {} bytes", bytes.len());
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(ApiErrorKind::Decode, err.to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };
    Err(ApiError::new(
        ApiErrorKind::HttpStatus(status.as_u16()),
        message,
    ))
}

fn opt(value: Option<&str>) -> Option<String> {
    value.map(ToOwned::to_owned)
}

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[async_trait::async_trait]
impl NotebookApi for HttpNotebookApi {
    async fn open_file(
        &self,
        notebook_id: Option<&str>,
        kind: PickKind,
    ) -> Result<JobId, ApiError> {
        self.get(
            &["files", "open"],
            &[("notebook_id", opt(notebook_id)), ("type", some(kind.as_str()))],
        )
        .await
    }

    async fn save_file(
        &self,
        notebook_id: Option<&str>,
        kind: PickKind,
    ) -> Result<JobId, ApiError> {
        self.post(
            &["files", "save"],
            &[("notebook_id", opt(notebook_id)), ("type", some(kind.as_str()))],
            None,
        )
        .await
    }

    async fn create_notebook(
        &self,
        name: Option<&str>,
        path: Option<&str>,
    ) -> Result<NotebookId, ApiError> {
        self.get(
            &["notebooks", "create"],
            &[("name", opt(name)), ("path", opt(path))],
        )
        .await
    }

    async fn rename_notebook(&self, notebook_id: &str, name: &str) -> Result<Notebook, ApiError> {
        self.get(&["notebooks", notebook_id, "rename"], &[("name", some(name))]).await
    }

    async fn notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError> {
        self.get(&["notebooks", notebook_id], &[]).await
    }

    async fn name(&self, notebook_id: &str) -> Result<String, ApiError> {
        self.get(&["notebooks", notebook_id, "name"], &[]).await
    }

    async fn content(&self, notebook_id: &str) -> Result<Value, ApiError> {
        self.get(&["notebooks", notebook_id, "content"], &[]).await
    }

    async fn save_notebook(
        &self,
        notebook_id: &str,
        content: &Value,
        path: Option<&str>,
    ) -> Result<JobId, ApiError> {
        self.post(
            &["notebooks", notebook_id, "save"],
            &[("path", opt(path))],
            Some(content),
        )
        .await
    }

    async fn load_notebook(&self, path: Option<&str>) -> Result<JobId, ApiError> {
        self.get(&["notebooks", "load"], &[("path", opt(path))]).await
    }

    async fn run(
        &self,
        notebook_id: &str,
        content: &Value,
        prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.post(
            &["notebooks", notebook_id, "run"],
            &[("prompt", some(prompt))],
            Some(content),
        )
        .await
    }

    async fn generate(
        &self,
        notebook_id: &str,
        content: &Value,
        prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.post(
            &["notebooks", notebook_id, "generate"],
            &[("prompt", some(prompt))],
            Some(content),
        )
        .await
    }

    async fn edit(
        &self,
        notebook_id: &str,
        content: &Value,
        text: &str,
        prompt: &str,
    ) -> Result<JobId, ApiError> {
        self.post(
            &["notebooks", notebook_id, "edit"],
            &[("text", some(text)), ("prompt", some(prompt))],
            Some(content),
        )
        .await
    }

    async fn chat(&self, notebook_id: &str, prompt: &str) -> Result<JobId, ApiError> {
        self.get(&["notebooks", notebook_id, "chat"], &[("prompt", some(prompt))]).await
    }

    async fn ideas(&self, notebook_id: &str, content: &Value) -> Result<JobId, ApiError> {
        self.post(&["notebooks", notebook_id, "ideas"], &[], Some(content)).await
    }

    async fn sources(&self, notebook_id: &str) -> Result<Vec<Source>, ApiError> {
        self.get(&["notebooks", notebook_id, "sources"], &[]).await
    }

    async fn add_source(
        &self,
        notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<JobId, ApiError> {
        self.get(
            &["notebooks", notebook_id, "sources", "add"],
            &[("type", some(kind.as_str())), ("origin", some(origin))],
        )
        .await
    }

    async fn source(&self, notebook_id: &str, source_id: &str) -> Result<Source, ApiError> {
        self.get(&["notebooks", notebook_id, "sources", source_id], &[]).await
    }

    async fn source_content(
        &self,
        notebook_id: &str,
        source_id: &str,
    ) -> Result<String, ApiError> {
        self.get(
            &["notebooks", notebook_id, "sources", source_id, "content"],
            &[],
        )
        .await
    }

    async fn source_summary(
        &self,
        notebook_id: &str,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<JobId, ApiError> {
        self.get(
            &["notebooks", notebook_id, "sources", source_id, "summary"],
            &[("last_k", last_k.map(|k| k.to_string()))],
        )
        .await
    }

    async fn live_sources(&self, notebook_id: &str) -> Result<Vec<Source>, ApiError> {
        self.get(&["notebooks", notebook_id, "live_sources"], &[]).await
    }

    async fn start_live_source(
        &self,
        notebook_id: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<SourceId, ApiError> {
        self.get(
            &["notebooks", notebook_id, "live_sources", "start"],
            &[("type", some(kind.as_str())), ("origin", some(origin))],
        )
        .await
    }

    async fn running_live_sources(&self, notebook_id: &str) -> Result<Vec<SourceId>, ApiError> {
        self.get(&["notebooks", notebook_id, "live_sources", "running"], &[]).await
    }

    async fn live_source(&self, notebook_id: &str, source_id: &str) -> Result<Source, ApiError> {
        self.get(&["notebooks", notebook_id, "live_sources", source_id], &[]).await
    }

    async fn live_source_summary(
        &self,
        notebook_id: &str,
        source_id: &str,
        last_k: Option<u32>,
    ) -> Result<JobId, ApiError> {
        self.get(
            &["notebooks", notebook_id, "live_sources", source_id, "summary"],
            &[("last_k", last_k.map(|k| k.to_string()))],
        )
        .await
    }

    async fn stop_live_source(
        &self,
        notebook_id: &str,
        source_id: &str,
    ) -> Result<bool, ApiError> {
        self.get(
            &["notebooks", notebook_id, "live_sources", source_id, "stop"],
            &[],
        )
        .await
    }

    async fn document(&self, notebook_id: &str, document_id: &str) -> Result<Value, ApiError> {
        self.get(&["notebooks", notebook_id, "documents", document_id], &[]).await
    }

    async fn conversation(&self, notebook_id: &str) -> Result<Vec<Message>, ApiError> {
        self.get(&["notebooks", notebook_id, "conversation"], &[]).await
    }

    async fn generations(&self, notebook_id: &str) -> Result<Vec<Generation>, ApiError> {
        self.get(&["notebooks", notebook_id, "generations"], &[]).await
    }

    async fn jobs(&self, notebook_id: &str) -> Result<Vec<Job>, ApiError> {
        self.get(&["notebooks", notebook_id, "jobs"], &[]).await
    }

    async fn job(&self, job: &JobRef) -> Result<Job, ApiError> {
        match job {
            JobRef::Global(job_id) => self.get(&["jobs", job_id.as_str()], &[]).await,
            JobRef::Scoped {
                notebook_id,
                job_id,
            } => {
                self.get(
                    &["notebooks", notebook_id.as_str(), "jobs", job_id.as_str()],
                    &[],
                )
                .await
            }
        }
    }

    async fn pca(&self, notebook_id: &str) -> Result<Vec<PcaPoint>, ApiError> {
        self.get(&["notebooks", notebook_id, "pca"], &[]).await
    }

    async fn ping(&self, notebook_id: &str) -> Result<String, ApiError> {
        self.get(&["ping", notebook_id], &[]).await
    }
}
