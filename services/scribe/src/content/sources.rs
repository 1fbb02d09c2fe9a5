//! services/scribe/src/content/sources.rs
//!
//! Problem sources: one per supported site, each knowing how to read a
//! `ScrapedProblem` out of a page snapshot. The `SourceRouter` picks the
//! source for a page by host and path prefix.

use crate::content::dom::{DomNode, PageLocation, PageSnapshot};
use scribe_core::{Difficulty, ScrapedProblem};
use std::sync::Arc;

//=========================================================================================
// Errors and Results
//=========================================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Expected page element is missing: {0}")]
    MissingElement(&'static str),
    #[error("Page URL could not be parsed: {0}")]
    InvalidUrl(String),
}

/// The result of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Ready(ScrapedProblem),
    /// The page has not rendered enough yet. Try again on the next mutation.
    NotReady,
}

/// Editor contents handed over by the page extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCapture {
    pub code: String,
    pub language: String,
}

pub trait ProblemSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether extraction needs the page extractor's editor capture.
    fn captures_editor(&self) -> bool {
        false
    }

    fn try_extract(
        &self,
        page: &PageSnapshot,
        editor: Option<&EditorCapture>,
    ) -> Result<Extraction, ExtractError>;
}

//=========================================================================================
// Difficulty markers
//=========================================================================================

/// Marker classes checked in order. The first one present on the page wins.
pub const DIFFICULTY_PRECEDENCE: [(Difficulty, &str); 3] = [
    (Difficulty::Easy, "text-difficulty-easy"),
    (Difficulty::Hard, "text-difficulty-hard"),
    (Difficulty::Medium, "text-difficulty-medium"),
];

pub const UNKNOWN_DIFFICULTY: &str = "No Difficulty Found";

fn difficulty_from_markers(root: &DomNode) -> String {
    DIFFICULTY_PRECEDENCE
        .iter()
        .find(|(_, class)| root.find_first_by_class(class).is_some())
        .map(|(difficulty, _)| difficulty.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_DIFFICULTY.to_string())
}

//=========================================================================================
// LeetCode
//=========================================================================================

pub struct LeetCodeSource;

impl LeetCodeSource {
    pub const TITLE_CLASS: &'static str = "text-title-large";
    pub const DESCRIPTION_CLASS: &'static str = "elfjS";
    pub const MISSING_TITLE: &'static str = "No question title found";
    pub const MISSING_DESCRIPTION: &'static str = "No question description found";
}

impl ProblemSource for LeetCodeSource {
    fn name(&self) -> &'static str {
        "leetcode"
    }

    fn captures_editor(&self) -> bool {
        true
    }

    fn try_extract(
        &self,
        page: &PageSnapshot,
        editor: Option<&EditorCapture>,
    ) -> Result<Extraction, ExtractError> {
        let Some(editor) = editor else {
            return Ok(Extraction::NotReady);
        };
        let root = &page.root;

        let question = root
            .find_first_by_class(Self::TITLE_CLASS)
            .map(DomNode::inner_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| Self::MISSING_TITLE.to_string());

        let description = root
            .find_first_by_class(Self::DESCRIPTION_CLASS)
            .ok_or(ExtractError::MissingElement(".elfjS"))?
            .inner_text();
        let description = if description.is_empty() {
            Self::MISSING_DESCRIPTION.to_string()
        } else {
            description
        };

        Ok(Extraction::Ready(ScrapedProblem {
            question,
            description,
            code: Some(editor.code.clone()),
            language: Some(editor.language.clone()),
            difficulty: Some(difficulty_from_markers(root)),
        }))
    }
}

//=========================================================================================
// GeeksforGeeks
//=========================================================================================

pub struct GfgSource;

impl GfgSource {
    pub const PANEL_CLASS: &'static str = "undefined";
    pub const PANEL_INDEX: usize = 2;
    pub const EDITOR_CLASS: &'static str = "ace_text-layer";
    pub const DEFAULT_LANGUAGE: &'static str = "c++";

    fn selected_language(root: &DomNode) -> String {
        root.find_first(|n| n.attr("role") == Some("listbox"))
            .and_then(|listbox| {
                listbox.find_first(|n| {
                    n.attr("role") == Some("option") && n.attr("aria-selected") == Some("true")
                })
            })
            .and_then(|option| option.find_first_by_class("text"))
            .map(|label| label.inner_text().trim().to_string())
            .filter(|language| !language.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_LANGUAGE.to_string())
    }
}

impl ProblemSource for GfgSource {
    fn name(&self) -> &'static str {
        "geeksforgeeks"
    }

    fn try_extract(
        &self,
        page: &PageSnapshot,
        _editor: Option<&EditorCapture>,
    ) -> Result<Extraction, ExtractError> {
        let root = &page.root;
        let panels = root.find_all_by_class(Self::PANEL_CLASS);
        let Some(panel) = panels.get(Self::PANEL_INDEX).filter(|p| p.children.len() >= 4) else {
            return Ok(Extraction::NotReady);
        };
        let code = match root.find_first_by_class(Self::EDITOR_CLASS) {
            Some(editor) => editor.inner_text(),
            None => return Ok(Extraction::NotReady),
        };
        if code.is_empty() {
            return Ok(Extraction::NotReady);
        }

        let question = panel
            .descend(&[0, 0, 0])
            .ok_or(ExtractError::MissingElement("question title"))?
            .inner_text();
        let difficulty = panel
            .descend(&[1, 0, 1])
            .ok_or(ExtractError::MissingElement("difficulty label"))?
            .inner_text();
        let description = panel
            .child(3)
            .ok_or(ExtractError::MissingElement("description"))?
            .inner_text();

        Ok(Extraction::Ready(ScrapedProblem {
            question,
            description,
            code: Some(code),
            language: Some(Self::selected_language(root)),
            difficulty: Some(difficulty),
        }))
    }
}

//=========================================================================================
// Routing
//=========================================================================================

struct Route {
    host: String,
    path_prefix: String,
    source: Arc<dyn ProblemSource>,
}

/// Maps host + path prefix to the source that handles the page.
#[derive(Default)]
pub struct SourceRouter {
    routes: Vec<Route>,
}

impl SourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// LeetCode and GeeksforGeeks problem pages.
    pub fn standard() -> Self {
        Self::new()
            .with_route("leetcode.com", "/problems", Arc::new(LeetCodeSource))
            .with_route("www.geeksforgeeks.org", "/problems", Arc::new(GfgSource))
    }

    pub fn with_route(
        mut self,
        host: impl Into<String>,
        path_prefix: impl Into<String>,
        source: Arc<dyn ProblemSource>,
    ) -> Self {
        self.routes.push(Route {
            host: host.into(),
            path_prefix: path_prefix.into(),
            source,
        });
        self
    }

    pub fn route(&self, location: &PageLocation) -> Option<Arc<dyn ProblemSource>> {
        self.routes
            .iter()
            .find(|r| location.host == r.host && location.path.starts_with(&r.path_prefix))
            .map(|r| r.source.clone())
    }

    pub fn route_page(
        &self,
        page: &PageSnapshot,
    ) -> Result<Option<Arc<dyn ProblemSource>>, ExtractError> {
        let location = page
            .location()
            .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", page.url, e)))?;
        Ok(self.route(&location))
    }
}
