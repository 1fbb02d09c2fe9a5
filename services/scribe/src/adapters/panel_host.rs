//! services/scribe/src/adapters/panel_host.rs
//!
//! Drives the browser through whichever host shims are connected to `/host`.

use async_trait::async_trait;
use scribe_core::{PanelHost, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

const HOST_CHANNEL_CAPACITY: usize = 32;

/// A browser-side command for the host shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    OpenSidePanel { tab_id: i64 },
    UpdateTab { tab_id: i64, url: String },
}

#[derive(Clone)]
pub struct BroadcastPanelHost {
    tx: broadcast::Sender<HostCommand>,
}

impl Default for BroadcastPanelHost {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(HOST_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl BroadcastPanelHost {
    pub fn subscribe(&self) -> broadcast::Receiver<HostCommand> {
        self.tx.subscribe()
    }

    fn dispatch(&self, command: HostCommand) -> PortResult<()> {
        let receivers = self
            .tx
            .send(command)
            .map_err(|_| PortError::Unavailable("no browser host is connected".to_string()))?;
        debug!("Host command delivered to {} shim(s).", receivers);
        Ok(())
    }
}

#[async_trait]
impl PanelHost for BroadcastPanelHost {
    async fn open_side_panel(&self, tab_id: i64) -> PortResult<()> {
        self.dispatch(HostCommand::OpenSidePanel { tab_id })
    }

    async fn update_tab(&self, tab_id: i64, url: &str) -> PortResult<()> {
        self.dispatch(HostCommand::UpdateTab {
            tab_id,
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fails_without_a_connected_shim() {
        let host = BroadcastPanelHost::default();
        let err = host.open_side_panel(3).await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
    }

    #[tokio::test]
    async fn every_shim_sees_every_command() {
        let host = BroadcastPanelHost::default();
        let mut first = host.subscribe();
        let mut second = host.subscribe();

        host.open_side_panel(3).await.unwrap();
        host.update_tab(3, "options.html").await.unwrap();

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), HostCommand::OpenSidePanel { tab_id: 3 });
            assert_eq!(
                rx.recv().await.unwrap(),
                HostCommand::UpdateTab {
                    tab_id: 3,
                    url: "options.html".into()
                }
            );
        }
    }

    #[test]
    fn commands_are_tagged_for_the_shim() {
        let json = serde_json::to_value(HostCommand::OpenSidePanel { tab_id: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "open_side_panel", "tab_id": 7}));
    }
}
