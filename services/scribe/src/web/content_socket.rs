//! services/scribe/src/web/content_socket.rs
//!
//! One WebSocket per observed tab. The page shim streams DOM snapshots,
//! editor state and window messages; a `ContentObserver` runs behind them
//! and the scraped problem goes to the relay.

use crate::content::{
    ContentObserver, EditorModel, ObserverSettings, PageChannels, PageEvent, SourceRouter,
};
use crate::relay::RelayHandle;
use crate::web::protocol::{ContentEvent, ContentFrame};
use crate::web::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use scribe_core::{RuntimeMessage, ScrapedProblem, WindowMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const PAGE_EVENT_CAPACITY: usize = 32;

/// The handler for upgrading `/content` requests to WebSocket connections.
pub async fn content_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Content script connected.");
    let (mut sender, mut receiver) = socket.split();
    let (page, mut observer) = PageConnection::open(
        app_state.router.clone(),
        app_state.relay.clone(),
        app_state.observer_settings(),
    );
    let mut observer_done = false;

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ContentFrame>(&text) {
                    Ok(frame) => {
                        if !page.handle(frame).await {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to deserialize content frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    page.handle(ContentFrame::Unload).await;
                    break;
                }
                Some(Err(e)) => {
                    warn!("Content socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            result = &mut observer, if !observer_done => {
                observer_done = true;
                let problem = result.unwrap_or_else(|e| {
                    error!("Content observer task failed: {}", e);
                    None
                });
                let event = ContentEvent::Finished { problem };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            warn!("Failed to report observer result to the page.");
                        }
                    }
                    Err(e) => error!("Failed to serialize content event: {}", e),
                }
            }
        }
    }

    if !observer_done {
        observer.abort();
    }
    info!("Content script disconnected.");
}

/// The content-script side of one page.
pub(crate) struct PageConnection {
    events: mpsc::Sender<PageEvent>,
    editor: watch::Sender<Option<EditorModel>>,
    window: mpsc::Sender<WindowMessage>,
    relay: RelayHandle,
}

impl PageConnection {
    /// Starts an observer for a new page and returns its task.
    pub(crate) fn open(
        router: Arc<SourceRouter>,
        relay: RelayHandle,
        settings: ObserverSettings,
    ) -> (Self, JoinHandle<Option<ScrapedProblem>>) {
        let (events, events_rx) = mpsc::channel(PAGE_EVENT_CAPACITY);
        let (editor, probe) = watch::channel(None);
        let (channels, window) = PageChannels::new(events_rx);
        let observer = ContentObserver::new(router, relay.clone(), probe, settings);
        let task = tokio::spawn(observer.run(channels));
        let page = Self {
            events,
            editor,
            window,
            relay,
        };
        (page, task)
    }

    /// Routes one frame. Returns `false` once the page is gone.
    pub(crate) async fn handle(&self, frame: ContentFrame) -> bool {
        match frame {
            ContentFrame::Mutation { page } => {
                if self.events.send(PageEvent::Mutation(page)).await.is_err() {
                    debug!("Observer already finished; mutation dropped.");
                }
            }
            ContentFrame::Editor { model } => {
                self.editor.send_replace(model);
            }
            ContentFrame::Window {
                message: WindowMessage::SupabaseLogin { token },
            } => {
                info!("Forwarding login credential to the relay.");
                if let Err(e) = self.relay.send(RuntimeMessage::SupabaseLogin { token }).await {
                    error!("Could not forward login credential: {}", e);
                }
            }
            ContentFrame::Window { message } => {
                if self.window.send(message).await.is_err() {
                    debug!("Observer already finished; window message dropped.");
                }
            }
            ContentFrame::Unload => {
                let _ = self.events.send(PageEvent::Unload).await;
                return false;
            }
        }
        true
    }
}
