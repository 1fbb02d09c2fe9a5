//! crates/scribe_core/src/messages.rs
//!
//! The typed messages exchanged between extension contexts.
//!
//! Runtime messages go from the content script, popup and side panel to the
//! background relay. Window messages stay inside one page: they connect the
//! script injected into the page with the content script observing it.

use crate::domain::{AuthToken, PanelAction, RelayPayload, ScrapedProblem};
use serde::{Deserialize, Serialize};

/// Messages understood by the background relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    /// A freshly scraped problem. Overwrites the relay cache.
    ScrapedData { data: ScrapedProblem },

    /// Asks for the cached payload (sent by the popup).
    GetPopupData,

    /// Asks for the cached payload (sent by the side panel).
    SetPageInfo,

    /// Opens the side panel on a tab and stashes the action for it.
    OpenSidePanel {
        #[serde(rename = "tabId")]
        tab_id: i64,
        action: PanelAction,
    },

    /// Persists a credential handed over by the login page.
    SupabaseLogin { token: AuthToken },

    /// A tab navigated. Used to catch the OAuth redirect.
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: i64,
        url: String,
    },
}

impl RuntimeMessage {
    /// Whether the sender waits for a `RelayReply`.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            RuntimeMessage::GetPopupData | RuntimeMessage::SetPageInfo
        )
    }

    /// The wire name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeMessage::ScrapedData { .. } => "SCRAPED_DATA",
            RuntimeMessage::GetPopupData => "GET_POPUP_DATA",
            RuntimeMessage::SetPageInfo => "SET_PAGE_INFO",
            RuntimeMessage::OpenSidePanel { .. } => "OPEN_SIDE_PANEL",
            RuntimeMessage::SupabaseLogin { .. } => "SUPABASE_LOGIN",
            RuntimeMessage::TabUpdated { .. } => "TAB_UPDATED",
        }
    }
}

/// The relay's answer to `GET_POPUP_DATA` / `SET_PAGE_INFO`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayReply {
    pub data: Option<RelayPayload>,
}

/// Messages posted on a page's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowMessage {
    /// Editor contents read by the injected page extractor.
    LeetcodeCode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        code: String,
        language: String,
    },

    /// A credential posted by the extension's login page.
    SupabaseLogin { token: AuthToken },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_side_panel_uses_camel_case_tab_id() {
        let message: RuntimeMessage = serde_json::from_value(json!({
            "type": "OPEN_SIDE_PANEL",
            "tabId": 42,
            "action": "gen_note"
        }))
        .unwrap();
        assert_eq!(
            message,
            RuntimeMessage::OpenSidePanel {
                tab_id: 42,
                action: PanelAction::GenNote
            }
        );
        assert!(!message.expects_reply());
    }

    #[test]
    fn scraped_data_keeps_optional_fields_optional() {
        let message: RuntimeMessage = serde_json::from_value(json!({
            "type": "SCRAPED_DATA",
            "data": {"question": "Two Sum", "description": "..."}
        }))
        .unwrap();
        let RuntimeMessage::ScrapedData { data } = message else {
            panic!("expected SCRAPED_DATA");
        };
        assert_eq!(data.code, None);
        assert_eq!(data.difficulty, None);
    }

    #[test]
    fn page_info_requests_expect_replies() {
        assert!(RuntimeMessage::GetPopupData.expects_reply());
        assert!(RuntimeMessage::SetPageInfo.expects_reply());
        assert_eq!(RuntimeMessage::SetPageInfo.kind(), "SET_PAGE_INFO");
    }

    #[test]
    fn window_code_message_matches_page_script_shape() {
        let message: WindowMessage = serde_json::from_value(json!({
            "source": "monaco-extractor",
            "type": "LEETCODE_CODE",
            "code": "function twoSum(){}",
            "language": "javascript"
        }))
        .unwrap();
        assert_eq!(
            message,
            WindowMessage::LeetcodeCode {
                source: Some("monaco-extractor".into()),
                code: "function twoSum(){}".into(),
                language: "javascript".into(),
            }
        );
    }
}
