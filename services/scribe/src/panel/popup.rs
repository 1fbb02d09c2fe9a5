//! services/scribe/src/panel/popup.rs
//!
//! The toolbar popup: shows the scraped question, opens the side panel in
//! note mode and handles sign-in state.

use crate::panel::PanelServices;
use crate::relay::RelayError;
use scribe_core::{PanelAction, PortResult, RuntimeMessage, User};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupSettings {
    /// Extra attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// What the popup displays about the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopupInfo {
    pub question: String,
    pub description: String,
}

pub struct PopupController {
    services: PanelServices,
    settings: PopupSettings,
    tab_id: Option<i64>,
    info: PopupInfo,
    user: Option<User>,
}

impl PopupController {
    pub fn new(services: PanelServices, settings: PopupSettings, tab_id: Option<i64>) -> Self {
        Self {
            services,
            settings,
            tab_id,
            info: PopupInfo::default(),
            user: None,
        }
    }

    pub fn info(&self) -> &PopupInfo {
        &self.info
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Asks the relay for the scraped problem, retrying at a fixed delay while
    /// nothing is cached. Gives up quietly and leaves the info empty.
    pub async fn request_data(&mut self) -> PopupInfo {
        for attempt in 0..=self.settings.retries {
            if attempt > 0 {
                tokio::time::sleep(self.settings.delay).await;
            }
            match self.services.relay.request(RuntimeMessage::GetPopupData).await {
                Ok(reply) => {
                    if let Some(problem) = reply.data.and_then(|payload| payload.problem) {
                        self.info = PopupInfo {
                            question: problem.question,
                            description: problem.description,
                        };
                        return self.info.clone();
                    }
                    debug!("No popup data yet (attempt {}).", attempt + 1);
                }
                Err(e) => warn!("Popup data request failed: {}", e),
            }
        }
        info!("No data fetched");
        self.info.clone()
    }

    /// Opens the side panel on the current tab in note mode. Returns `false`
    /// when the popup does not know its tab.
    pub async fn open_note_panel(&self) -> Result<bool, RelayError> {
        let Some(tab_id) = self.tab_id else {
            return Ok(false);
        };
        self.services
            .relay
            .send(RuntimeMessage::OpenSidePanel {
                tab_id,
                action: PanelAction::GenNote,
            })
            .await?;
        Ok(true)
    }

    pub async fn restore_session(&mut self) -> Option<&User> {
        self.user = self.services.restore_user().await;
        self.user.as_ref()
    }

    pub async fn sign_out(&mut self) -> PortResult<()> {
        self.services.tokens.clear().await?;
        self.user = None;
        info!("Signed out.");
        Ok(())
    }
}
