//! Async client for the Kairos notebook service: typed HTTP calls, job
//! polling, the notebook event stream and a per-notebook session that keeps
//! a local cache in sync.
mod api;
mod error;
mod events;
mod http;
mod job;
mod session;
mod settings;
mod sse;

pub use api::{JobRef, NotebookApi, PickKind};
pub use error::{ApiError, ApiErrorKind};
pub use events::EventSubscription;
pub use http::HttpNotebookApi;
pub use job::{join_job, JobOutcome, NoProgress, ProgressSink};
pub use session::{NotebookSession, Notifier, SessionError};
pub use settings::{ClientSettings, PollSettings, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL};
pub use sse::{ServerEvent, SseParser, DEFAULT_EVENT};
pub use tokio_util::sync::CancellationToken;
