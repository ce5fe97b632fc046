use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type NotebookId = String;
pub type JobId = String;
pub type SourceId = String;

/// Full notebook record as returned by `GET notebooks/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notebook {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub live_sources: Vec<Source>,
    #[serde(default)]
    pub conversation: Vec<Message>,
    #[serde(default)]
    pub generations: Vec<Generation>,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Youtube,
    Web,
    /// Live audio capture.
    Sound,
    #[serde(other)]
    Other,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Youtube => "youtube",
            SourceKind::Web => "web",
            SourceKind::Sound => "sound",
            SourceKind::Other => "other",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "youtube" => Ok(SourceKind::Youtube),
            "web" => Ok(SourceKind::Web),
            "sound" => Ok(SourceKind::Sound),
            other => Err(format!("unknown source type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub origin: String,
    /// Ids of the ingested document chunks.
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub tool: String,
    pub tool_input: String,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub action: Action,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub intermediate_steps: Option<Vec<Step>>,
}

impl Generation {
    pub fn steps(&self) -> &[Step] {
        self.intermediate_steps.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Finished,
    #[serde(other)]
    Unknown,
}

/// Server-tracked job snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub output: Option<Value>,
}

impl Job {
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Output rendered as text: strings verbatim, other JSON compactly.
    pub fn output_text(&self) -> Option<String> {
        self.output.as_ref().and_then(value_text)
    }
}

pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// One projected chunk from `GET notebooks/{id}/pca`, encoded as `[x, y, text]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, String)", into = "(f64, f64, String)")]
pub struct PcaPoint {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

impl From<(f64, f64, String)> for PcaPoint {
    fn from((x, y, text): (f64, f64, String)) -> Self {
        Self { x, y, text }
    }
}

impl From<PcaPoint> for (f64, f64, String) {
    fn from(point: PcaPoint) -> Self {
        (point.x, point.y, point.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notebook_decodes_service_payload() {
        let payload = json!({
            "name": "Quiet Harbor",
            "sources": [{"id": "s1", "type": "pdf", "origin": "/tmp/a.pdf", "ids": ["d1", "d2"]}],
            "live_sources": [],
            "conversation": [{"id": "m1", "sender": "Human", "text": "hi"}],
            "content": null,
            "generations": [{
                "id": "g1", "type": "run", "input": "q", "output": "a",
                "intermediate_steps": [{"action": {"tool": "Search", "tool_input": "q", "log": ""}, "result": "r"}]
            }]
        });

        let notebook: Notebook = serde_json::from_value(payload).unwrap();
        assert_eq!(notebook.name, "Quiet Harbor");
        assert_eq!(notebook.sources[0].kind, SourceKind::Pdf);
        assert_eq!(notebook.sources[0].ids.len(), 2);
        assert_eq!(notebook.generations[0].steps()[0].action.tool, "Search");
        assert!(notebook.content.is_null());
    }

    #[test]
    fn unknown_job_status_is_not_running() {
        let job: Job =
            serde_json::from_value(json!({"id": "j", "status": "queued", "error": false}))
                .unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(!job.is_running());
        assert_eq!(job.output_text(), None);
    }

    #[test]
    fn pca_point_decodes_from_triple() {
        let points: Vec<PcaPoint> =
            serde_json::from_value(json!([[1.5, -2.0, "chunk"]])).unwrap();
        assert_eq!(
            points,
            vec![PcaPoint {
                x: 1.5,
                y: -2.0,
                text: "chunk".into()
            }]
        );
    }

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("YouTube".parse::<SourceKind>(), Ok(SourceKind::Youtube));
        assert!("ftp".parse::<SourceKind>().is_err());
    }
}
