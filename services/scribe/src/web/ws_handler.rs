//! services/scribe/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a side-panel WebSocket
//! connection. Each connection owns one `ChatSession`.

use crate::adapters::ChannelNotifier;
use crate::panel::session::PendingExchange;
use crate::panel::{ChatSession, SessionError};
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use scribe_core::Notification;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// The handler for upgrading `/panel` requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (notice_tx, notice_rx) = mpsc::unbounded_channel::<Notification>();

    // All writes go through one task so events keep their order.
    let writer = tokio::spawn(write_loop(sender, outbox_rx, notice_rx));

    // --- 1. Initialization Phase ---
    let mut session = ChatSession::new(
        app_state.panel_services(),
        Arc::new(ChannelNotifier::new(notice_tx)),
    );
    let status = session.initialize().await;
    info!("Side panel session {} is {:?}.", session.session_id(), status);
    let _ = outbox.send(ServerMessage::SessionInitialized {
        session_id: session.session_id().to_string(),
        status,
        is_chat: session.is_chat(),
        user: session.user().cloned(),
        transcript: session.transcript().to_vec(),
    });

    // --- 2. Main Message Loop ---
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(command) => dispatch(&mut session, command, &outbox).await,
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    let _ = outbox.send(ServerMessage::Error {
                        message: format!("Unrecognised command: {}", e),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Side panel socket error: {}", e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    drop(outbox);
    drop(session);
    if let Err(e) = writer.await {
        error!("Side panel writer task failed: {}", e);
    }
    info!("Side panel connection closed.");
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::UnboundedReceiver<ServerMessage>,
    mut notices: mpsc::UnboundedReceiver<Notification>,
) {
    loop {
        let message = tokio::select! {
            Some(message) = outbox.recv() => message,
            Some(notification) = notices.recv() => ServerMessage::Notification { notification },
            else => break,
        };
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            warn!("Side panel went away while sending.");
            break;
        }
    }
}

fn report(outbox: &mpsc::UnboundedSender<ServerMessage>, error: SessionError) {
    warn!("Side panel command rejected: {}", error);
    let _ = outbox.send(ServerMessage::Error {
        message: error.to_string(),
    });
}

/// Applies one side-panel command and queues the resulting events.
pub(crate) async fn dispatch(
    session: &mut ChatSession,
    command: ClientMessage,
    outbox: &mpsc::UnboundedSender<ServerMessage>,
) {
    match command {
        ClientMessage::SendMessage { text } => {
            let pending = session.begin_message(&text);
            run_exchange(session, pending, outbox).await;
        }
        ClientMessage::GenerateNote => {
            let pending = session.begin_note();
            run_exchange(session, pending, outbox).await;
        }
        ClientMessage::ToggleMode => {
            let is_chat = session.toggle_mode();
            let _ = outbox.send(ServerMessage::ModeChanged { is_chat });
        }
        ClientMessage::SaveResponse { message_id } => {
            match session.save_structured_response(message_id).await {
                Ok(record) => {
                    let _ = outbox.send(ServerMessage::ResponseSaved {
                        message_id,
                        question_id: record.id,
                    });
                }
                // Port failures were already reported through the notifier.
                Err(SessionError::Port(_)) => {}
                Err(e) => report(outbox, e),
            }
        }
        ClientMessage::SaveTranscript => match session.save_transcript().await {
            Ok(stored_id) => {
                let _ = outbox.send(ServerMessage::TranscriptSaved { stored_id });
            }
            Err(SessionError::Port(_)) => {}
            Err(e) => report(outbox, e),
        },
    }
}

async fn run_exchange(
    session: &mut ChatSession,
    pending: Result<PendingExchange, SessionError>,
    outbox: &mpsc::UnboundedSender<ServerMessage>,
) {
    let pending = match pending {
        Ok(pending) => pending,
        Err(e) => return report(outbox, e),
    };
    let _ = outbox.send(ServerMessage::MessageAppended {
        message: pending.user_message.clone(),
    });
    let _ = outbox.send(ServerMessage::Typing { active: true });
    let reply = session.finish(pending).await;
    let _ = outbox.send(ServerMessage::Typing { active: false });
    let _ = outbox.send(ServerMessage::MessageAppended { message: reply });
}
