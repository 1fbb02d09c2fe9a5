//! services/scribe/src/web/host_socket.rs
//!
//! The browser host shim. Receives `HostCommand`s (open the side panel,
//! navigate a tab) and reports tab events back as runtime messages.

use crate::relay::RelayHandle;
use crate::web::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use scribe_core::RuntimeMessage;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// The handler for upgrading `/host` requests to WebSocket connections.
pub async fn host_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Browser host shim connected.");
    let (mut sender, mut receiver) = socket.split();
    let mut commands = app_state.host.subscribe();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Ok(command) => {
                    let json = match serde_json::to_string(&command) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize host command: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        warn!("Host shim went away while sending.");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Host shim fell behind; {} command(s) dropped.", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => forward_event(&app_state.relay, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("Host socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
    info!("Browser host shim disconnected.");
}

/// Passes a browser event (e.g. `TAB_UPDATED`) on to the relay.
async fn forward_event(relay: &RelayHandle, text: &str) {
    match serde_json::from_str::<RuntimeMessage>(text) {
        Ok(message) => {
            if let Err(e) = relay.send(message).await {
                error!("Could not forward host event: {}", e);
            }
        }
        Err(e) => warn!("Failed to deserialize host event: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HostCommand;
    use crate::testing::test_app;
    use scribe_core::AuthToken;

    #[tokio::test]
    async fn oauth_redirect_reported_by_the_shim_is_completed() {
        let app = test_app();
        let mut shim = app.host.subscribe();

        forward_event(
            &app.state.relay,
            r#"{"type":"TAB_UPDATED","tabId":12,"url":"http://localhost:3000/#access_token=abc&refresh_token=def"}"#,
        )
        .await;

        assert_eq!(
            shim.recv().await.unwrap(),
            HostCommand::UpdateTab {
                tab_id: 12,
                url: "options.html".into()
            }
        );
        assert_eq!(app.tokens.current(), Some(AuthToken::new("abc")));
    }

    #[tokio::test]
    async fn malformed_events_are_ignored() {
        let app = test_app();
        forward_event(&app.state.relay, "{\"type\":\"NOPE\"}").await;
        assert_eq!(app.state.relay.fetch().await.unwrap(), None);
    }
}
