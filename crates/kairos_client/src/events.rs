use futures_util::StreamExt;
use kairos_logging::{kairos_debug, kairos_error, kairos_info, kairos_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::map_reqwest_error;
use crate::sse::{ServerEvent, SseParser};
use crate::{ApiError, HttpNotebookApi};

const EVENT_BUFFER: usize = 64;

type EventResult = Result<ServerEvent, ApiError>;

/// Live subscription to `GET events/{notebook_id}`.
///
/// The connection is made and read on a background task; events are handed
/// out by [`Self::next`]. The service may hold back the response headers
/// until it has something to send, so opening never waits for them.
/// There is no reconnect: once the server closes the stream `next` returns
/// `None`. Dropping the subscription closes the connection.
pub struct EventSubscription {
    notebook_id: String,
    events: mpsc::Receiver<EventResult>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl EventSubscription {
    /// Starts connecting and returns at once. `parent` cancels the
    /// subscription along with everything else that hangs off it.
    pub fn open(api: &HttpNotebookApi, notebook_id: &str, parent: &CancellationToken) -> Self {
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_events(
            api.clone(),
            notebook_id.to_string(),
            tx,
            cancel.clone(),
        ));

        Self {
            notebook_id: notebook_id.to_string(),
            events: rx,
            cancel,
            reader,
        }
    }

    pub fn notebook_id(&self) -> &str {
        &self.notebook_id
    }

    /// Next event, or `None` once the stream has ended or been closed.
    ///
    /// A failed connect or a broken stream is reported once as `Err`; the
    /// subscription is closed afterwards.
    pub async fn next(&mut self) -> Option<EventResult> {
        self.events.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.reader.is_finished()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_events(
    api: HttpNotebookApi,
    notebook_id: String,
    tx: mpsc::Sender<EventResult>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => {
            kairos_debug!("event stream for {} cancelled while connecting", notebook_id);
            return;
        }
        connected = api.open_event_stream(&notebook_id) => connected,
    };
    let response = match connected {
        Ok(response) => response,
        Err(err) => {
            kairos_error!("cannot subscribe to events for {}: {}", notebook_id, err);
            let _ = tx.send(Err(err)).await;
            return;
        }
    };
    kairos_info!("subscribed to events for notebook {}", notebook_id);

    let mut parser = SseParser::new();
    let mut stream = response.bytes_stream();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                kairos_debug!("event stream for {} closed by client", notebook_id);
                return;
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for event in parser.feed(&bytes) {
                    kairos_debug!("event '{}' for notebook {}", event.name, notebook_id);
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(err)) => {
                kairos_warn!("event stream for {} failed: {}", notebook_id, err);
                let _ = tx.send(Err(map_reqwest_error(err))).await;
                return;
            }
            None => {
                kairos_info!("event stream for {} ended by server", notebook_id);
                return;
            }
        }
    }
}
