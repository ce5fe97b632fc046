use std::fmt;

use serde_json::Value;

use crate::{Generation, Job, Message, Notebook, NotebookId, Source, SourceId};

/// User-facing notebook operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Load,
    Rename,
    Run,
    Generate,
    Edit,
    Chat,
    Ideas,
    AddSource,
    SourceSummary,
    LiveSourceSummary,
    StartLiveSource,
    StopLiveSource,
    Save,
    Refresh,
    PickFile,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Create => "create",
            Operation::Load => "load",
            Operation::Rename => "rename",
            Operation::Run => "run",
            Operation::Generate => "generate",
            Operation::Edit => "edit",
            Operation::Chat => "chat",
            Operation::Ideas => "ideas",
            Operation::AddSource => "add source",
            Operation::SourceSummary => "source summary",
            Operation::LiveSourceSummary => "live source summary",
            Operation::StartLiveSource => "start live source",
            Operation::StopLiveSource => "stop live source",
            Operation::Save => "save",
            Operation::Refresh => "refresh",
            Operation::PickFile => "pick file",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Full notebook fetched from the service.
    NotebookLoaded { id: NotebookId, notebook: Notebook },
    NameFetched(String),
    /// Server copy of the editor document.
    ContentFetched(Value),
    SourcesFetched(Vec<Source>),
    LiveSourcesFetched(Vec<Source>),
    RunningLiveSourcesFetched(Vec<SourceId>),
    ConversationFetched(Vec<Message>),
    GenerationsFetched(Vec<Generation>),
    JobsFetched(Vec<Job>),
    /// Poller snapshot of a job that is still running.
    JobProgress(Job),
    /// Append text to the editor document.
    InsertText(String),
    /// Replace the selected text in the editor document.
    ReplaceSelection {
        selection: String,
        replacement: String,
    },
    /// The service acknowledged a save of the current document.
    ContentSaved,
    OperationFailed {
        operation: Operation,
        reason: String,
    },
    /// Named event pushed over the notebook event stream.
    ServerEvent { name: String, data: String },
}
