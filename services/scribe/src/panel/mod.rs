//! services/scribe/src/panel/mod.rs
//!
//! The extension's UI contexts: the side-panel chat session, the toolbar
//! popup and the options-page dashboard. None of them render anything; they
//! hold the state and talk to the relay and the remote services.

pub mod dashboard;
pub mod popup;
pub mod session;

use crate::relay::RelayHandle;
use scribe_core::{IdentityService, InferenceService, QuestionStore, TokenStore, User};
use std::sync::Arc;
use tracing::{error, warn};

pub use dashboard::{Dashboard, ProfileStats, QuestionFilter, Rank, SortKey};
pub use popup::{PopupController, PopupInfo, PopupSettings};
pub use session::{ChatSession, SessionError, SessionStatus};

/// Everything a UI context may reach.
#[derive(Clone)]
pub struct PanelServices {
    pub relay: RelayHandle,
    pub inference: Arc<dyn InferenceService>,
    pub store: Arc<dyn QuestionStore>,
    pub identity: Arc<dyn IdentityService>,
    pub tokens: Arc<dyn TokenStore>,
}

impl PanelServices {
    /// Reads the durable token and resolves its user. Any failure means
    /// signed out.
    pub async fn restore_user(&self) -> Option<User> {
        let token = match self.tokens.load().await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                error!("Session fetch error: {}", e);
                return None;
            }
        };
        match self.identity.resolve_user(&token).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored session was rejected: {}", e);
                None
            }
        }
    }
}
