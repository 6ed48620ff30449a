//! Language detection for choosing a translation direction

use serde::{Deserialize, Serialize};

/// Languages the translate endpoint understands, serialized the way the
/// server's `target_lang` field expects them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Arabic,
}

impl Language {
    /// Text containing any character from the Arabic block is Arabic,
    /// anything else is treated as English.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
            Language::Arabic
        } else {
            Language::English
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Language::English => Language::Arabic,
            Language::Arabic => Language::English,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "Arabic",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Arabic => "ar",
        }
    }
}
