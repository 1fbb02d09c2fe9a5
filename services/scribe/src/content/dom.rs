//! services/scribe/src/content/dom.rs
//!
//! A serialisable snapshot of a page's DOM, as streamed by the browser shim
//! after every mutation batch. Problem sources query it the way a content
//! script queries `document`: by class name, by attribute and by child index.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

/// One element of the snapshot. Text nodes are folded into `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Direct text only, not from children.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn child(&self, index: usize) -> Option<&DomNode> {
        self.children.get(index)
    }

    /// Follows a path of child indices, e.g. `[0, 0, 0]`.
    pub fn descend(&self, path: &[usize]) -> Option<&DomNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// All nodes below `self` in document (preorder) order, `self` excluded.
    pub fn descendants(&self) -> Vec<&DomNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&DomNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Like `getElementsByClassName`: every matching descendant in document order.
    pub fn find_all_by_class(&self, class: &str) -> Vec<&DomNode> {
        self.descendants()
            .into_iter()
            .filter(|node| node.has_class(class))
            .collect()
    }

    pub fn find_first_by_class(&self, class: &str) -> Option<&DomNode> {
        self.find_first(|node| node.has_class(class))
    }

    pub fn find_first<P>(&self, predicate: P) -> Option<&DomNode>
    where
        P: Fn(&DomNode) -> bool,
    {
        self.descendants().into_iter().find(|node| predicate(*node))
    }

    /// Rendered text of the subtree: one line per non-empty text segment,
    /// with runs of spaces collapsed.
    pub fn inner_text(&self) -> String {
        let mut segments = Vec::new();
        collect_text(self, &mut segments);
        segments.join("\n")
    }
}

fn collect_text(node: &DomNode, out: &mut Vec<String>) {
    let collapsed = whitespace().replace_all(node.text.trim(), " ");
    if !collapsed.is_empty() {
        out.push(collapsed.into_owned());
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"[ \t\x{a0}]+").expect("static regex is valid"))
}

/// The page as seen after one mutation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub root: DomNode,
}

/// Host and path of a page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub host: String,
    pub path: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, root: DomNode) -> Self {
        Self {
            url: url.into(),
            root,
        }
    }

    pub fn location(&self) -> Result<PageLocation, url::ParseError> {
        let parsed = Url::parse(&self.url)?;
        Ok(PageLocation {
            host: parsed.host_str().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
        })
    }
}
