//! services/scribe/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::BroadcastPanelHost;
use crate::config::Config;
use crate::content::{ExtractorSettings, ObserverSettings, SourceRouter};
use crate::panel::{Dashboard, PanelServices, PopupSettings};
use crate::relay::RelayHandle;
use scribe_core::{IdentityService, InferenceService, QuestionStore, TokenStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: RelayHandle,
    pub inference: Arc<dyn InferenceService>,
    pub store: Arc<dyn QuestionStore>,
    pub identity: Arc<dyn IdentityService>,
    pub tokens: Arc<dyn TokenStore>,
    pub host: BroadcastPanelHost,
    pub router: Arc<SourceRouter>,
}

impl AppState {
    /// The handles one side panel or popup works with.
    pub fn panel_services(&self) -> PanelServices {
        PanelServices {
            relay: self.relay.clone(),
            inference: self.inference.clone(),
            store: self.store.clone(),
            identity: self.identity.clone(),
            tokens: self.tokens.clone(),
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.store.clone())
    }

    pub fn observer_settings(&self) -> ObserverSettings {
        ObserverSettings {
            debounce: self.config.observer_debounce,
            extractor: ExtractorSettings {
                poll_interval: self.config.extractor_poll,
                max_attempts: self.config.extractor_max_attempts,
            },
        }
    }

    pub fn popup_settings(&self) -> PopupSettings {
        PopupSettings {
            retries: self.config.popup_retries,
            delay: self.config.popup_retry_delay,
        }
    }
}
