//! services/scribe/src/content/extractor.rs
//!
//! The page extractor: the script injected into the page's own world. It
//! waits for the code editor to load a model, then posts one `LEETCODE_CODE`
//! window message with the editor's value and language and stops.

use scribe_core::WindowMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `source` field stamped on every message the extractor posts.
pub const EXTRACTOR_SOURCE: &str = "monaco-extractor";

/// The first model of the page's code editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorModel {
    pub value: String,
    pub language_id: String,
}

/// Read access to the page's editor.
pub trait EditorProbe: Send + Sync + 'static {
    fn first_model(&self) -> Option<EditorModel>;
}

impl EditorProbe for watch::Receiver<Option<EditorModel>> {
    fn first_model(&self) -> Option<EditorModel> {
        self.borrow().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorSettings {
    pub poll_interval: Duration,
    /// `None` polls until the page goes away.
    pub max_attempts: Option<u32>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: None,
        }
    }
}

/// How a spawned extractor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorOutcome {
    Emitted,
    Cancelled,
    GaveUp { attempts: u32 },
    ChannelClosed,
}

pub struct PageExtractor<P> {
    probe: P,
    settings: ExtractorSettings,
}

impl<P: EditorProbe> PageExtractor<P> {
    pub fn new(probe: P, settings: ExtractorSettings) -> Self {
        Self { probe, settings }
    }

    /// Starts polling on its own task. The returned handle owns the
    /// cancellation token.
    pub fn spawn(self, window_tx: mpsc::Sender<WindowMessage>) -> ExtractorHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(window_tx, token.clone()));
        ExtractorHandle { token, task }
    }

    async fn run(
        self,
        window_tx: mpsc::Sender<WindowMessage>,
        token: CancellationToken,
    ) -> ExtractorOutcome {
        let mut attempts = 0u32;
        loop {
            if token.is_cancelled() {
                return ExtractorOutcome::Cancelled;
            }
            attempts += 1;

            if let Some(model) = self.probe.first_model().filter(|m| !m.value.is_empty()) {
                info!(
                    "Editor model ready after {} attempt(s), language '{}'.",
                    attempts, model.language_id
                );
                let message = WindowMessage::LeetcodeCode {
                    source: Some(EXTRACTOR_SOURCE.to_string()),
                    code: model.value,
                    language: model.language_id,
                };
                return match window_tx.send(message).await {
                    Ok(()) => ExtractorOutcome::Emitted,
                    Err(_) => ExtractorOutcome::ChannelClosed,
                };
            }

            if let Some(max) = self.settings.max_attempts {
                if attempts >= max {
                    warn!("Editor model never loaded, giving up after {} attempts.", attempts);
                    return ExtractorOutcome::GaveUp { attempts };
                }
            }

            debug!("Editor not ready, retrying in {:?}.", self.settings.poll_interval);
            tokio::select! {
                _ = token.cancelled() => return ExtractorOutcome::Cancelled,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }
}

/// A running extractor bound to the lifetime of its page.
pub struct ExtractorHandle {
    token: CancellationToken,
    task: JoinHandle<ExtractorOutcome>,
}

impl ExtractorHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> ExtractorOutcome {
        self.task.await.unwrap_or(ExtractorOutcome::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn model(value: &str) -> Option<EditorModel> {
        Some(EditorModel {
            value: value.to_string(),
            language_id: "python".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn emits_once_the_editor_has_a_model() {
        let (model_tx, model_rx) = watch::channel(None);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        let handle = PageExtractor::new(model_rx, ExtractorSettings::default()).spawn(window_tx);

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(window_rx.try_recv().is_err());

        model_tx.send(model("class Solution: pass")).unwrap();
        let message = window_rx.recv().await.unwrap();
        assert_eq!(
            message,
            WindowMessage::LeetcodeCode {
                source: Some(EXTRACTOR_SOURCE.to_string()),
                code: "class Solution: pass".to_string(),
                language: "python".to_string(),
            }
        );
        assert_eq!(handle.join().await, ExtractorOutcome::Emitted);
        // Exactly one message: the sender is gone with the task.
        assert!(window_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_editor_value_is_not_ready() {
        let (model_tx, model_rx) = watch::channel(model(""));
        let (window_tx, mut window_rx) = mpsc::channel(4);
        let settings = ExtractorSettings {
            max_attempts: Some(4),
            ..Default::default()
        };
        let handle = PageExtractor::new(model_rx, settings).spawn(window_tx);

        assert_eq!(handle.join().await, ExtractorOutcome::GaveUp { attempts: 4 });
        assert!(window_rx.recv().await.is_none());
        drop(model_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn capped_extractor_polls_at_the_fixed_interval() {
        let (_model_tx, model_rx) = watch::channel::<Option<EditorModel>>(None);
        let (window_tx, _window_rx) = mpsc::channel(4);
        let settings = ExtractorSettings {
            max_attempts: Some(3),
            ..Default::default()
        };
        let started = Instant::now();
        let outcome = PageExtractor::new(model_rx, settings)
            .spawn(window_tx)
            .join()
            .await;

        assert_eq!(outcome, ExtractorOutcome::GaveUp { attempts: 3 });
        assert_eq!(started.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling_without_a_message() {
        let (_model_tx, model_rx) = watch::channel::<Option<EditorModel>>(None);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        let handle = PageExtractor::new(model_rx, ExtractorSettings::default()).spawn(window_tx);

        tokio::time::sleep(Duration::from_millis(700)).await;
        handle.cancel();
        assert_eq!(handle.join().await, ExtractorOutcome::Cancelled);
        assert!(window_rx.recv().await.is_none());
    }
}
