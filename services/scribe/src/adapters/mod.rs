pub mod db;
pub mod notifier;
pub mod openai_llm;
pub mod panel_host;
pub mod solve_http;
pub mod token_store;

pub use db::DbAdapter;
pub use notifier::{ChannelNotifier, LogNotifier};
pub use openai_llm::OpenAiInferenceAdapter;
pub use panel_host::{BroadcastPanelHost, HostCommand};
pub use solve_http::SolveHttpAdapter;
pub use token_store::FileTokenStore;
