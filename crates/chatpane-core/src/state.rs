//! UI-agnostic conversation state
//!
//! The transcript is the single source of truth a surface renders from: the
//! ordered log entries, the per-message translate toggles, the typing
//! indicator and any pending alert. Nothing here performs I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Identity of a rendered message, allocated in order by the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Who a message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

/// A rendered chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    /// Displayed text (for bot messages, possibly the translated form)
    pub text: String,
    /// Embedded graph image path, stripped from `text`
    pub image: Option<String>,
}

/// Handle to the visible "typing" placeholder
#[derive(Debug, PartialEq, Eq)]
pub struct IndicatorHandle(u64);

/// A single row of the conversation log
#[derive(Debug, Clone)]
pub enum Entry {
    Message(MessageId),
    Typing,
}

/// Per-bot-message translate control
#[derive(Debug, Clone)]
pub struct TranslationToggle {
    pub original_text: String,
    pub is_translated: bool,
    pub pending: bool,
    /// Language the next translate request asks for
    pub target: Language,
}

pub const LABEL_TRANSLATE: &str = "Translate";
pub const LABEL_TRANSLATING: &str = "Translating…";
pub const LABEL_ORIGINAL: &str = "Original";

impl TranslationToggle {
    pub fn new(original_text: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            is_translated: false,
            pending: false,
            target: Language::detect(original_text).opposite(),
        }
    }

    pub fn label(&self) -> &'static str {
        if self.pending {
            LABEL_TRANSLATING
        } else if self.is_translated {
            LABEL_ORIGINAL
        } else {
            LABEL_TRANSLATE
        }
    }

    /// Disable the control for the duration of a request
    pub(crate) fn acquire(&mut self) {
        self.pending = true;
    }

    /// Re-enable the control. The label falls back to whatever the
    /// translated flag says, which is the pre-click label unless the
    /// request succeeded.
    pub(crate) fn release(&mut self) {
        self.pending = false;
    }
}

/// Ordered conversation log plus everything a surface needs to draw it
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    messages: HashMap<MessageId, Message>,
    toggles: HashMap<MessageId, TranslationToggle>,
    next_id: u64,
    typing: Option<u64>,
    pub indicators_shown: usize,
    pub indicators_removed: usize,
    /// Set whenever a new entry is appended; the surface scrolls and clears it
    pub scroll_pending: bool,
    /// User-visible alert awaiting acknowledgement
    pub alert: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append a message and return its id. Bot messages get their embedded
    /// graph image split out and, when any text remains, a translate toggle.
    pub fn push(&mut self, text: &str, role: Role) -> MessageId {
        let id = MessageId(self.allocate());
        let (text, image) = match role {
            Role::User => (text.to_string(), None),
            Role::Bot => crate::graph::split_image(text),
        };

        if role == Role::Bot && !text.trim().is_empty() {
            self.toggles.insert(id, TranslationToggle::new(&text));
        }

        self.messages.insert(id, Message { id, role, text, image });
        self.entries.push(Entry::Message(id));
        self.scroll_pending = true;
        id
    }

    /// Show the typing placeholder. Returns `None` if one is already visible.
    pub fn show_typing(&mut self) -> Option<IndicatorHandle> {
        if self.typing.is_some() {
            return None;
        }
        let token = self.allocate();
        self.typing = Some(token);
        self.entries.push(Entry::Typing);
        self.indicators_shown += 1;
        self.scroll_pending = true;
        Some(IndicatorHandle(token))
    }

    pub fn remove_typing(&mut self, handle: IndicatorHandle) {
        if self.typing != Some(handle.0) {
            return;
        }
        self.typing = None;
        self.entries.retain(|entry| !matches!(entry, Entry::Typing));
        self.indicators_removed += 1;
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.get_mut(&id)
    }

    pub fn toggle(&self, id: MessageId) -> Option<&TranslationToggle> {
        self.toggles.get(&id)
    }

    pub(crate) fn toggle_mut(&mut self, id: MessageId) -> Option<&mut TranslationToggle> {
        self.toggles.get_mut(&id)
    }

    /// Messages in display order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(id) => self.messages.get(id),
            Entry::Typing => None,
        })
    }

    /// Bot message ids in display order (the selectable ones)
    pub fn bot_message_ids(&self) -> Vec<MessageId> {
        self.messages()
            .filter(|m| m.role == Role::Bot)
            .map(|m| m.id)
            .collect()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages().filter(|m| m.role == role).count()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }
}
