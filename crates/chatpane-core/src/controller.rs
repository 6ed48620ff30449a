//! Chat widget controller
//!
//! Every user action is split into a synchronous `begin` half that updates
//! the transcript and hands back a ticket describing the network request,
//! and a `complete` half that consumes the ticket with the request's result.
//! A surface can run the request wherever it likes (the TUI spawns it on the
//! runtime) while the controller stays single-owner. `send` and
//! `toggle_translation` chain both halves for callers that can simply await.

use log::{debug, info, warn};

use crate::api::ChatBackend;
use crate::error::{ClientError, SubmitError, ToggleError};
use crate::graph;
use crate::language::Language;
use crate::state::{IndicatorHandle, MessageId, Role, Transcript};

/// Bot-role text rendered when a chat request fails for any reason
pub const CHAT_FAILURE_MESSAGE: &str = "Unable to reach the server.";

/// Alert raised when a translate request fails
pub const TRANSLATE_FAILURE_ALERT: &str = "Translation failed. Please try again.";

/// An accepted chat submission whose reply is still outstanding
#[must_use = "a chat ticket must be completed or the typing indicator stays visible"]
#[derive(Debug)]
pub struct ChatTicket {
    /// Trimmed text to send as `message`
    pub message: String,
    pub user_message: MessageId,
    indicator: IndicatorHandle,
}

/// An activated translate control whose request is still outstanding
#[must_use = "a translate ticket must be completed or the control stays disabled"]
#[derive(Debug)]
pub struct TranslateTicket {
    pub id: MessageId,
    /// Currently displayed text, sent as `text`
    pub text: String,
    pub target: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Translated,
    Reverted,
    Failed,
}

#[derive(Debug, Default)]
pub struct ChatController {
    transcript: Transcript,
    chat_in_flight: bool,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn is_sending(&self) -> bool {
        self.chat_in_flight
    }

    /// Render a message into the log
    pub fn render(&mut self, text: &str, role: Role) -> MessageId {
        self.transcript.push(text, role)
    }

    // Chat flow

    /// Accept the contents of `input` as a new chat message.
    ///
    /// On success the user entry is rendered, the typing indicator is shown
    /// and `input` is cleared. Rejections leave `input` and the log untouched.
    pub fn submit(&mut self, input: &mut String) -> Result<ChatTicket, SubmitError> {
        let message = input.trim();
        if message.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.chat_in_flight || self.transcript.is_typing() {
            return Err(SubmitError::Busy);
        }

        let message = message.to_string();
        input.clear();

        let user_message = self.transcript.push(&message, Role::User);
        let indicator = self.transcript.show_typing().ok_or(SubmitError::Busy)?;
        self.chat_in_flight = true;

        info!("Sending chat message ({} chars)", message.chars().count());
        Ok(ChatTicket { message, user_message, indicator })
    }

    /// Finish a chat request: remove the indicator and render the reply or
    /// the failure message. Returns the bot entry.
    pub fn complete_chat(&mut self, ticket: ChatTicket, result: Result<String, ClientError>) -> MessageId {
        self.transcript.remove_typing(ticket.indicator);
        self.chat_in_flight = false;

        match result {
            Ok(reply) => self.transcript.push(&reply, Role::Bot),
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.transcript.push(CHAT_FAILURE_MESSAGE, Role::Bot)
            }
        }
    }

    /// Submit `input` and await the reply from `backend`
    pub async fn send(
        &mut self,
        backend: &dyn ChatBackend,
        input: &mut String,
    ) -> Result<MessageId, SubmitError> {
        let ticket = self.submit(input)?;
        let result = backend.chat(&ticket.message).await;
        Ok(self.complete_chat(ticket, result))
    }

    // Translate toggle

    /// Activate the translate control of a message in the Original state,
    /// disabling it until the ticket is completed.
    pub fn begin_translation(&mut self, id: MessageId) -> Result<TranslateTicket, ToggleError> {
        let text = self
            .transcript
            .message(id)
            .map(|m| m.text.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or(ToggleError::NotTranslatable)?;
        let toggle = self.transcript.toggle_mut(id).ok_or(ToggleError::NotTranslatable)?;

        if toggle.pending {
            return Err(ToggleError::Pending);
        }
        if toggle.is_translated {
            return Err(ToggleError::AlreadyTranslated);
        }

        toggle.acquire();
        debug!("Translating message {} to {}", id.0, toggle.target.as_str());
        Ok(TranslateTicket { id, text, target: toggle.target })
    }

    /// Finish a translate request and re-enable the control.
    ///
    /// On failure the displayed text is left as it was and an alert is raised.
    pub fn complete_translation(
        &mut self,
        ticket: TranslateTicket,
        result: Result<String, ClientError>,
    ) -> ToggleOutcome {
        let Some(toggle) = self.transcript.toggle_mut(ticket.id) else {
            return ToggleOutcome::Failed;
        };
        toggle.release();

        match result {
            Ok(translation) => {
                let translation = graph::strip_images(&translation);
                toggle.is_translated = true;
                if let Some(message) = self.transcript.message_mut(ticket.id) {
                    message.text = translation;
                }
                ToggleOutcome::Translated
            }
            Err(e) => {
                warn!("Translate request for message {} failed: {}", ticket.id.0, e);
                self.transcript.alert = Some(TRANSLATE_FAILURE_ALERT.to_string());
                ToggleOutcome::Failed
            }
        }
    }

    /// Switch a translated message back to its original text. No request is
    /// made; the original is kept by the control.
    pub fn revert(&mut self, id: MessageId) -> Result<(), ToggleError> {
        let toggle = self.transcript.toggle_mut(id).ok_or(ToggleError::NotTranslatable)?;

        if toggle.pending {
            return Err(ToggleError::Pending);
        }
        if !toggle.is_translated {
            return Err(ToggleError::NotTranslated);
        }

        toggle.is_translated = false;
        let original = toggle.original_text.clone();
        if let Some(message) = self.transcript.message_mut(id) {
            message.text = original;
        }
        Ok(())
    }

    /// Handle a click on a message's translate control
    pub async fn toggle_translation(
        &mut self,
        backend: &dyn ChatBackend,
        id: MessageId,
    ) -> Result<ToggleOutcome, ToggleError> {
        let translated = self
            .transcript
            .toggle(id)
            .map(|t| t.is_translated)
            .ok_or(ToggleError::NotTranslatable)?;

        if translated {
            self.revert(id)?;
            return Ok(ToggleOutcome::Reverted);
        }

        let ticket = self.begin_translation(id)?;
        let result = backend.translate(&ticket.text, Some(ticket.target)).await;
        Ok(self.complete_translation(ticket, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Entry, LABEL_ORIGINAL, LABEL_TRANSLATE, LABEL_TRANSLATING};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// Backend answering from fixed scripts and recording every call
    #[derive(Default)]
    struct FakeBackend {
        reply: Option<String>,
        translation: Option<String>,
        chat_calls: Mutex<Vec<String>>,
        translate_calls: Mutex<Vec<(String, Option<Language>)>>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self { reply: Some(reply.to_string()), ..Default::default() }
        }

        fn translating(translation: &str) -> Self {
            Self { translation: Some(translation.to_string()), ..Default::default() }
        }
    }

    fn server_error() -> ClientError {
        ClientError::Status { status: StatusCode::INTERNAL_SERVER_ERROR, body: String::new() }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn chat(&self, message: &str) -> Result<String, ClientError> {
            self.chat_calls.lock().unwrap().push(message.to_string());
            self.reply.clone().ok_or_else(server_error)
        }

        async fn translate(&self, text: &str, target: Option<Language>) -> Result<String, ClientError> {
            self.translate_calls.lock().unwrap().push((text.to_string(), target));
            self.translation.clone().ok_or_else(server_error)
        }
    }

    #[tokio::test]
    async fn test_send_renders_user_and_bot_entries() {
        let backend = FakeBackend::replying("Hi there /static/graphs/q1.png");
        let mut controller = ChatController::new();
        let mut input = "Hello".to_string();

        let bot = controller.send(&backend, &mut input).await.unwrap();

        assert!(input.is_empty());
        assert_eq!(*backend.chat_calls.lock().unwrap(), vec!["Hello".to_string()]);

        let transcript = controller.transcript();
        let texts: Vec<_> = transcript.messages().map(|m| (m.role, m.text.clone())).collect();
        assert_eq!(
            texts,
            vec![(Role::User, "Hello".to_string()), (Role::Bot, "Hi there".to_string())]
        );
        let reply = transcript.message(bot).unwrap();
        assert_eq!(reply.image.as_deref(), Some("/static/graphs/q1.png"));
        assert_eq!(transcript.toggle(bot).unwrap().label(), LABEL_TRANSLATE);
    }

    #[tokio::test]
    async fn test_send_trims_input() {
        let backend = FakeBackend::replying("ok");
        let mut controller = ChatController::new();
        let mut input = "  How many members?  ".to_string();

        controller.send(&backend, &mut input).await.unwrap();

        assert_eq!(*backend.chat_calls.lock().unwrap(), vec!["How many members?".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let backend = FakeBackend::replying("unused");
        let mut controller = ChatController::new();

        for raw in ["", "   ", "\n\t "] {
            let mut input = raw.to_string();
            let result = controller.send(&backend, &mut input).await;
            assert_eq!(result, Err(SubmitError::Empty));
            assert_eq!(input, raw);
        }

        assert!(controller.transcript().entries().is_empty());
        assert!(backend.chat_calls.lock().unwrap().is_empty());
        assert_eq!(controller.transcript().indicators_shown, 0);
    }

    #[tokio::test]
    async fn test_chat_failure_renders_apology() {
        let backend = FakeBackend::default();
        let mut controller = ChatController::new();
        let mut input = "Hello".to_string();

        let bot = controller.send(&backend, &mut input).await.unwrap();

        let transcript = controller.transcript();
        assert_eq!(transcript.message(bot).unwrap().text, CHAT_FAILURE_MESSAGE);
        assert_eq!(transcript.count_role(Role::User), 1);
        assert_eq!(transcript.count_role(Role::Bot), 1);
        assert!(!transcript.is_typing());
        assert!(!controller.is_sending());
    }

    #[test]
    fn test_indicator_lifecycle() {
        let mut controller = ChatController::new();
        let mut input = "Hello".to_string();

        let ticket = controller.submit(&mut input).unwrap();
        let transcript = controller.transcript();
        assert!(transcript.is_typing());
        assert!(matches!(transcript.entries().last(), Some(Entry::Typing)));
        assert_eq!(transcript.count_role(Role::User), 1);

        controller.complete_chat(ticket, Ok("Hi".to_string()));
        let transcript = controller.transcript();
        assert!(!transcript.is_typing());
        assert_eq!(transcript.indicators_shown, 1);
        assert_eq!(transcript.indicators_removed, 1);
    }

    #[test]
    fn test_overlapping_submit_is_refused() {
        let mut controller = ChatController::new();
        let mut first = "one".to_string();
        let mut second = "two".to_string();

        let ticket = controller.submit(&mut first).unwrap();
        assert_eq!(controller.submit(&mut second).unwrap_err(), SubmitError::Busy);
        assert_eq!(second, "two");
        assert_eq!(controller.transcript().count_role(Role::User), 1);

        controller.complete_chat(ticket, Err(server_error()));
        assert!(controller.submit(&mut second).is_ok());
    }

    #[tokio::test]
    async fn test_translate_then_revert() {
        let mut controller = ChatController::new();
        let id = controller.render("Hi there /static/graphs/q1.png", Role::Bot);
        let backend = FakeBackend::translating("مرحبا /static/graphs/q1.png");

        let outcome = controller.toggle_translation(&backend, id).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Translated);
        assert_eq!(
            *backend.translate_calls.lock().unwrap(),
            vec![("Hi there".to_string(), Some(Language::Arabic))]
        );

        let transcript = controller.transcript();
        assert_eq!(transcript.message(id).unwrap().text, "مرحبا");
        let toggle = transcript.toggle(id).unwrap();
        assert!(toggle.is_translated);
        assert!(!toggle.pending);
        assert_eq!(toggle.label(), LABEL_ORIGINAL);

        let outcome = controller.toggle_translation(&backend, id).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Reverted);
        assert_eq!(backend.translate_calls.lock().unwrap().len(), 1);

        let transcript = controller.transcript();
        assert_eq!(transcript.message(id).unwrap().text, "Hi there");
        assert_eq!(transcript.toggle(id).unwrap().label(), LABEL_TRANSLATE);
        assert_eq!(
            transcript.message(id).unwrap().image.as_deref(),
            Some("/static/graphs/q1.png")
        );
    }

    #[tokio::test]
    async fn test_arabic_original_targets_english() {
        let mut controller = ChatController::new();
        let id = controller.render("مرحبا", Role::Bot);
        let backend = FakeBackend::translating("Hello");

        controller.toggle_translation(&backend, id).await.unwrap();

        assert_eq!(backend.translate_calls.lock().unwrap()[0].1, Some(Language::English));
        assert_eq!(controller.transcript().message(id).unwrap().text, "Hello");
    }

    #[tokio::test]
    async fn test_translate_failure_keeps_text_and_alerts() {
        let mut controller = ChatController::new();
        let id = controller.render("Hi there", Role::Bot);
        let backend = FakeBackend::default();

        let outcome = controller.toggle_translation(&backend, id).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Failed);

        let transcript = controller.transcript_mut();
        assert_eq!(transcript.message(id).unwrap().text, "Hi there");
        let toggle = transcript.toggle(id).unwrap();
        assert!(!toggle.pending);
        assert!(!toggle.is_translated);
        assert_eq!(toggle.label(), LABEL_TRANSLATE);
        assert_eq!(transcript.take_alert().as_deref(), Some(TRANSLATE_FAILURE_ALERT));
        assert!(transcript.alert.is_none());
    }

    #[test]
    fn test_control_disabled_while_pending() {
        let mut controller = ChatController::new();
        let id = controller.render("Hi there", Role::Bot);

        let ticket = controller.begin_translation(id).unwrap();
        assert_eq!(ticket.text, "Hi there");
        assert_eq!(controller.transcript().toggle(id).unwrap().label(), LABEL_TRANSLATING);
        assert_eq!(controller.begin_translation(id).unwrap_err(), ToggleError::Pending);
        assert_eq!(controller.revert(id).unwrap_err(), ToggleError::Pending);

        // Chat remains usable while a translation is in flight
        let mut input = "next question".to_string();
        let chat = controller.submit(&mut input).unwrap();
        controller.complete_chat(chat, Ok("answer".to_string()));

        controller.complete_translation(ticket, Ok("Bonjour".to_string()));
        assert_eq!(controller.transcript().toggle(id).unwrap().label(), LABEL_ORIGINAL);
    }

    #[test]
    fn test_translation_displayed_exactly() {
        let mut controller = ChatController::new();
        let id = controller.render("Members:\n  - north  12\n  - south  30", Role::Bot);
        assert_eq!(
            controller.transcript().message(id).unwrap().text,
            "Members:\n  - north  12\n  - south  30"
        );

        let translated = "Line 1:\n    - item  one\n  indented";
        let ticket = controller.begin_translation(id).unwrap();
        controller.complete_translation(ticket, Ok(translated.to_string()));
        assert_eq!(controller.transcript().message(id).unwrap().text, translated);

        controller.revert(id).unwrap();
        let ticket = controller.begin_translation(id).unwrap();
        controller.complete_translation(ticket, Ok("  X  /static/graphs/q1.png".to_string()));
        assert_eq!(controller.transcript().message(id).unwrap().text, "  X");
    }

    #[tokio::test]
    async fn test_image_only_reply_is_not_translatable() {
        let mut controller = ChatController::new();
        let id = controller.render("/static/graphs/q1.png", Role::Bot);
        let backend = FakeBackend::translating("unused");

        assert_eq!(controller.begin_translation(id).unwrap_err(), ToggleError::NotTranslatable);
        assert_eq!(
            controller.toggle_translation(&backend, id).await.unwrap_err(),
            ToggleError::NotTranslatable
        );
        assert!(backend.translate_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_user_messages_have_no_toggle() {
        let mut controller = ChatController::new();
        let id = controller.render("Hello", Role::User);

        assert_eq!(controller.begin_translation(id).unwrap_err(), ToggleError::NotTranslatable);
        assert_eq!(controller.revert(id).unwrap_err(), ToggleError::NotTranslatable);
    }

    #[test]
    fn test_revert_requires_translation() {
        let mut controller = ChatController::new();
        let id = controller.render("Hi", Role::Bot);
        assert_eq!(controller.revert(id).unwrap_err(), ToggleError::NotTranslated);
    }
}
