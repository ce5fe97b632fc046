use crate::{Effect, Msg, NotebookState, Notification};

/// Event name the service uses for its keep-alive/ping pushes.
pub const PING_EVENT: &str = "ping";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: NotebookState, msg: Msg) -> (NotebookState, Vec<Effect>) {
    let effects = match msg {
        Msg::NotebookLoaded { id, notebook } => {
            state.load(id, notebook);
            Vec::new()
        }
        Msg::NameFetched(name) => {
            state.set_name(name);
            Vec::new()
        }
        Msg::ContentFetched(value) => {
            if !state.set_server_content(value) {
                return (
                    state,
                    vec![Effect::Notify(Notification::warning(
                        "Document not refreshed",
                        "local edits are not saved yet",
                    ))],
                );
            }
            Vec::new()
        }
        Msg::SourcesFetched(sources) => {
            state.set_sources(sources);
            Vec::new()
        }
        Msg::LiveSourcesFetched(sources) => {
            state.set_live_sources(sources);
            Vec::new()
        }
        Msg::RunningLiveSourcesFetched(ids) => {
            state.set_running_live_sources(ids);
            Vec::new()
        }
        Msg::ConversationFetched(conversation) => {
            state.set_conversation(conversation);
            Vec::new()
        }
        Msg::GenerationsFetched(generations) => {
            state.set_generations(generations);
            Vec::new()
        }
        Msg::JobsFetched(jobs) => {
            state.set_jobs(jobs);
            Vec::new()
        }
        Msg::JobProgress(job) => {
            state.upsert_job(job);
            Vec::new()
        }
        Msg::InsertText(text) => {
            state.append_text(&text);
            Vec::new()
        }
        Msg::ReplaceSelection {
            selection,
            replacement,
        } => {
            if state.replace_selection(&selection, &replacement) {
                Vec::new()
            } else {
                vec![Effect::Notify(Notification::warning(
                    "Edit not applied",
                    format!("selection \"{selection}\" is no longer in the document"),
                ))]
            }
        }
        Msg::ContentSaved => {
            state.mark_saved();
            Vec::new()
        }
        Msg::OperationFailed { operation, reason } => {
            vec![Effect::Notify(Notification::error(
                format!("{operation} failed"),
                reason,
            ))]
        }
        Msg::ServerEvent { name, data } => {
            if name == PING_EVENT {
                vec![Effect::Notify(Notification::info(name, data))]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}
