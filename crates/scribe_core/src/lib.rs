pub mod domain;
pub mod messages;
pub mod ports;

pub use domain::{
    AuthToken, ChatMessage, Difficulty, InferenceReply, MessageBody, NewQuestion, Notification,
    NotificationLevel, PanelAction, PopupRequest, QuestionRecord, QuestionUpdate, RelayPayload,
    ScrapedProblem, Sender, SolveRequest, StructuredResponse, User,
};
pub use messages::{RelayReply, RuntimeMessage, WindowMessage};
pub use ports::{
    IdentityService, InferenceService, Notifier, PanelHost, PortError, PortResult, QuestionStore,
    TokenStore,
};
