//! services/scribe/src/content/observer.rs
//!
//! The content script's main loop. It watches page mutations, waits for
//! them to settle, classifies the page and keeps trying its problem source
//! until a `ScrapedProblem` comes out. The problem is then sent to the relay
//! and the observer disconnects.

use crate::content::dom::PageSnapshot;
use crate::content::extractor::{EditorProbe, ExtractorHandle, ExtractorSettings, PageExtractor};
use crate::content::sources::{EditorCapture, Extraction, ProblemSource, SourceRouter};
use crate::relay::RelayHandle;
use scribe_core::{RuntimeMessage, ScrapedProblem, WindowMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

const WINDOW_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Watching,
    Extracting,
    Done,
}

/// What the page reports to its content script.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// A batch of DOM mutations, with the page as it looks afterwards.
    Mutation(PageSnapshot),
    Unload,
}

#[derive(Debug, Clone, Copy)]
pub struct ObserverSettings {
    pub debounce: Duration,
    pub extractor: ExtractorSettings,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            extractor: ExtractorSettings::default(),
        }
    }
}

/// The page-side channels one content script listens on.
pub struct PageChannels {
    events: mpsc::Receiver<PageEvent>,
    window_rx: mpsc::Receiver<WindowMessage>,
    window_tx: mpsc::Sender<WindowMessage>,
}

impl PageChannels {
    /// Returns the channels plus the sender for messages posted on the page window.
    pub fn new(events: mpsc::Receiver<PageEvent>) -> (Self, mpsc::Sender<WindowMessage>) {
        let (window_tx, window_rx) = mpsc::channel(WINDOW_CHANNEL_CAPACITY);
        let channels = Self {
            events,
            window_rx,
            window_tx: window_tx.clone(),
        };
        (channels, window_tx)
    }
}

enum Step {
    Event(Option<PageEvent>),
    Window(WindowMessage),
    Debounced,
}

pub struct ContentObserver<P> {
    router: Arc<SourceRouter>,
    relay: RelayHandle,
    probe: Option<P>,
    settings: ObserverSettings,
    state: ObserverState,
}

impl<P: EditorProbe> ContentObserver<P> {
    pub fn new(
        router: Arc<SourceRouter>,
        relay: RelayHandle,
        probe: P,
        settings: ObserverSettings,
    ) -> Self {
        Self {
            router,
            relay,
            probe: Some(probe),
            settings,
            state: ObserverState::Idle,
        }
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    /// Observes until a problem is scraped, the page is not a problem page,
    /// or the page goes away. Returns the scraped problem, if any.
    pub async fn run(mut self, channels: PageChannels) -> Option<ScrapedProblem> {
        let PageChannels {
            mut events,
            mut window_rx,
            window_tx,
        } = channels;

        self.state = ObserverState::Watching;
        let mut latest: Option<PageSnapshot> = None;
        let mut deadline: Option<Instant> = None;
        let mut source: Option<Arc<dyn ProblemSource>> = None;
        let mut capture: Option<EditorCapture> = None;
        let mut extractor: Option<ExtractorHandle> = None;
        let mut scraped = None;

        while self.state != ObserverState::Done {
            let debounce = sleep_until(deadline.unwrap_or_else(Instant::now));
            let step = tokio::select! {
                event = events.recv() => Step::Event(event),
                Some(message) = window_rx.recv() => Step::Window(message),
                _ = debounce, if deadline.is_some() => Step::Debounced,
            };

            match step {
                Step::Event(None) | Step::Event(Some(PageEvent::Unload)) => {
                    info!("Page went away, content observer stopping.");
                    self.state = ObserverState::Done;
                }
                Step::Event(Some(PageEvent::Mutation(snapshot))) => {
                    latest = Some(snapshot);
                    match self.state {
                        ObserverState::Watching => {
                            deadline = Some(Instant::now() + self.settings.debounce);
                        }
                        ObserverState::Extracting => {
                            scraped = self.attempt(&source, &latest, &capture);
                        }
                        _ => {}
                    }
                }
                Step::Debounced => {
                    deadline = None;
                    let Some(page) = latest.as_ref() else {
                        continue;
                    };
                    match self.router.route_page(page) {
                        Ok(Some(matched)) => {
                            info!("Problem page detected ({}), extracting.", matched.name());
                            self.state = ObserverState::Extracting;
                            if matched.captures_editor() {
                                if let Some(probe) = self.probe.take() {
                                    extractor = Some(
                                        PageExtractor::new(probe, self.settings.extractor)
                                            .spawn(window_tx.clone()),
                                    );
                                }
                            }
                            source = Some(matched);
                            scraped = self.attempt(&source, &latest, &capture);
                        }
                        Ok(None) => {
                            info!("Not a problem page, disconnecting observer.");
                            self.state = ObserverState::Done;
                        }
                        Err(e) => {
                            warn!("{}", e);
                            self.state = ObserverState::Done;
                        }
                    }
                }
                Step::Window(WindowMessage::LeetcodeCode { code, language, .. }) => {
                    if self.state == ObserverState::Extracting {
                        debug!("Editor capture received ({} bytes).", code.len());
                        capture = Some(EditorCapture { code, language });
                        scraped = self.attempt(&source, &latest, &capture);
                    }
                }
                Step::Window(WindowMessage::SupabaseLogin { .. }) => {
                    debug!("Login message ignored by the observer.");
                }
            }

            if let Some(problem) = scraped.as_ref() {
                if let Err(e) = self
                    .relay
                    .send(RuntimeMessage::ScrapedData {
                        data: problem.clone(),
                    })
                    .await
                {
                    error!("Failed to hand the scraped problem to the relay: {}", e);
                }
                self.state = ObserverState::Done;
            }
        }

        if let Some(handle) = extractor {
            handle.cancel();
        }
        scraped
    }

    fn attempt(
        &self,
        source: &Option<Arc<dyn ProblemSource>>,
        latest: &Option<PageSnapshot>,
        capture: &Option<EditorCapture>,
    ) -> Option<ScrapedProblem> {
        let (Some(source), Some(page)) = (source, latest) else {
            return None;
        };
        match source.try_extract(page, capture.as_ref()) {
            Ok(Extraction::Ready(problem)) => {
                info!("Scraped '{}' from {}.", problem.question, source.name());
                Some(problem)
            }
            Ok(Extraction::NotReady) => None,
            Err(e) => {
                warn!("Error while extracting {} data: {}", source.name(), e);
                None
            }
        }
    }
}
