//! services/scribe/src/content/mod.rs
//!
//! The page-side contexts: the injected page extractor and the content
//! script that observes the page and scrapes problems out of it.

pub mod dom;
pub mod extractor;
pub mod observer;
pub mod sources;

pub use dom::{DomNode, PageSnapshot};
pub use extractor::{EditorModel, EditorProbe, ExtractorSettings, PageExtractor};
pub use observer::{ContentObserver, ObserverSettings, ObserverState, PageChannels, PageEvent};
pub use sources::{
    EditorCapture, ExtractError, Extraction, GfgSource, LeetCodeSource, ProblemSource,
    SourceRouter, DIFFICULTY_PRECEDENCE,
};
