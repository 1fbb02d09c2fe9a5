//! services/scribe/src/relay/actor.rs
//!
//! The background context. One task owns the cache and handles every
//! runtime message in arrival order; other contexts only ever hold a
//! `RelayHandle`.

use crate::relay::cache::RelayCache;
use scribe_core::{
    AuthToken, PanelAction, PanelHost, RelayPayload, RelayReply, RuntimeMessage, TokenStore,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

const RELAY_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("The background relay has shut down")]
    Closed,
    #[error("The background relay dropped the reply")]
    NoReply,
}

struct Envelope {
    message: RuntimeMessage,
    reply: Option<oneshot::Sender<RelayReply>>,
}

//=========================================================================================
// Handle
//=========================================================================================

/// The sending side of the relay, shared by every other context.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<Envelope>,
}

impl RelayHandle {
    /// Fire-and-forget, like `runtime.sendMessage` without a callback.
    pub async fn send(&self, message: RuntimeMessage) -> Result<(), RelayError> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .await
            .map_err(|_| RelayError::Closed)
    }

    /// Sends and waits until the relay has handled the message. Page-info
    /// requests get the cached payload back; everything else gets an empty
    /// reply once processed.
    pub async fn request(&self, message: RuntimeMessage) -> Result<RelayReply, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| RelayError::Closed)?;
        reply_rx.await.map_err(|_| RelayError::NoReply)
    }

    pub async fn fetch(&self) -> Result<Option<RelayPayload>, RelayError> {
        Ok(self.request(RuntimeMessage::SetPageInfo).await?.data)
    }
}

//=========================================================================================
// Relay task
//=========================================================================================

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Tab URLs starting with this are OAuth callbacks.
    pub oauth_redirect_prefix: String,
    /// Where a tab goes after a completed OAuth callback.
    pub options_page_url: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            oauth_redirect_prefix: "http://localhost:3000/".to_string(),
            options_page_url: "options.html".to_string(),
        }
    }
}

pub struct Relay {
    cache: RelayCache,
    panel_host: Arc<dyn PanelHost>,
    tokens: Arc<dyn TokenStore>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        panel_host: Arc<dyn PanelHost>,
        tokens: Arc<dyn TokenStore>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            cache: RelayCache::new(),
            panel_host,
            tokens,
            settings,
        }
    }

    /// Starts the relay task. It stops once every handle is dropped.
    pub fn spawn(self) -> (RelayHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (RelayHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>) {
        info!("Background relay started.");
        while let Some(Envelope { message, reply }) = rx.recv().await {
            debug!("Relay received {}.", message.kind());
            let response = self.handle(message).await;
            if let Some(reply) = reply {
                // The requester may have gone away; nothing to do then.
                let _ = reply.send(response);
            }
        }
        info!("Background relay stopped.");
    }

    async fn handle(&mut self, message: RuntimeMessage) -> RelayReply {
        match message {
            RuntimeMessage::ScrapedData { data } => {
                info!("Caching scraped problem '{}'.", data.question);
                self.cache.record(RelayPayload::scraped(data));
            }
            RuntimeMessage::GetPopupData | RuntimeMessage::SetPageInfo => {
                if let Some(at) = self.cache.updated_at() {
                    debug!("Serving payload cached at {}.", at);
                }
                return RelayReply {
                    data: self.cache.fetch(),
                };
            }
            RuntimeMessage::OpenSidePanel { tab_id, action } => {
                self.open_panel(tab_id, action).await;
            }
            RuntimeMessage::SupabaseLogin { token } => {
                self.accept_credential(&token).await;
            }
            RuntimeMessage::TabUpdated { tab_id, url } => {
                if url.starts_with(&self.settings.oauth_redirect_prefix) {
                    self.finish_oauth(tab_id, &url).await;
                }
            }
        }
        RelayReply::default()
    }

    async fn open_panel(&mut self, tab_id: i64, action: PanelAction) {
        match self.panel_host.open_side_panel(tab_id).await {
            Ok(()) => {
                info!("Side panel opened on tab {}.", tab_id);
                self.cache.stash_action(action);
            }
            Err(e) => error!("Error opening side panel on tab {}: {}", tab_id, e),
        }
    }

    async fn accept_credential(&self, token: &AuthToken) {
        match self.tokens.save(token).await {
            Ok(()) => info!("Auth credential stored."),
            Err(e) => error!("Failed to store auth credential: {}", e),
        }
    }

    async fn finish_oauth(&self, tab_id: i64, url: &str) {
        info!("Handling OAuth callback on tab {}.", tab_id);
        let Some(access_token) = parse_oauth_fragment(url) else {
            warn!("No session tokens found in the OAuth callback URL.");
            return;
        };
        self.accept_credential(&access_token).await;
        if let Err(e) = self
            .panel_host
            .update_tab(tab_id, &self.settings.options_page_url)
            .await
        {
            error!("Failed to redirect tab {} after OAuth: {}", tab_id, e);
        }
    }
}

/// Returns the `access_token` from an OAuth callback fragment. The fragment
/// must also carry a non-empty `refresh_token` to count as a session.
pub fn parse_oauth_fragment(url: &str) -> Option<AuthToken> {
    let parsed = Url::parse(url).ok()?;
    let fragment = parsed.fragment()?;
    let mut access = None;
    let mut has_refresh = false;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match &*key {
            "access_token" if !value.is_empty() => access = Some(value.into_owned()),
            "refresh_token" if !value.is_empty() => has_refresh = true,
            _ => {}
        }
    }
    if !has_refresh {
        return None;
    }
    access.map(AuthToken::new)
}
