//! Kairos core: notebook data model, pure state machine and view-model helpers.
mod document;
mod effect;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use document::Document;
pub use effect::{Effect, Notification, NotificationLevel};
pub use model::{
    Action, Generation, Job, JobId, JobStatus, Message, Notebook, NotebookId, PcaPoint, Source,
    SourceId, SourceKind, Step,
};
pub use msg::{Msg, Operation};
pub use state::NotebookState;
pub use update::{update, PING_EVENT};
pub use view_model::{
    preview, GenerationRowView, JobRowView, LiveSourceRowView, NotebookViewModel, SourceRowView,
    MAX_PREVIEW_CHARS,
};
