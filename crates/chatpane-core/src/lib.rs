pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod language;
pub mod state;

// Re-export main types for convenience
pub use api::{ChatBackend, HttpBackend};
pub use config::Config;
pub use controller::{ChatController, ChatTicket, ToggleOutcome, TranslateTicket};
pub use error::{ClientError, SubmitError, ToggleError};
pub use language::Language;
pub use state::{Entry, Message, MessageId, Role, TranslationToggle, Transcript};
