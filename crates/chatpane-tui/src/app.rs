use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use chatpane_core::{
    ChatBackend, ChatController, ChatTicket, ClientError, HttpBackend, MessageId, Role,
    SubmitError, ToggleError, TranslateTicket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

type RequestTask = JoinHandle<Result<String, ClientError>>;

/// Chat request running on the runtime, with the ticket to complete once it resolves
pub struct PendingChat {
    pub ticket: ChatTicket,
    pub task: RequestTask,
}

pub struct PendingTranslation {
    pub ticket: TranslateTicket,
    pub task: RequestTask,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub controller: ChatController,
    pub backend: HttpBackend,
    pub chat_task: Option<PendingChat>,
    pub translate_tasks: Vec<PendingTranslation>,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Bot message selected for translate/copy in Normal mode
    pub selected: Option<MessageId>,

    // Chat panel scroll
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // One-line notice in the footer ("Copied", "Still waiting...")
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(backend: HttpBackend) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            controller: ChatController::new(),
            backend,
            chat_task: None,
            translate_tasks: Vec::new(),

            input: String::new(),
            cursor: 0,

            selected: None,

            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            status: None,

            animation_frame: 0,
        }
    }

    /// Send the input box contents. The request runs on the runtime and is
    /// picked up by `poll_tasks`.
    pub fn submit_input(&mut self) {
        match self.controller.submit(&mut self.input) {
            Ok(ticket) => {
                self.cursor = 0;
                self.status = None;

                let backend = self.backend.clone();
                let message = ticket.message.clone();
                let task = tokio::spawn(async move { backend.chat(&message).await });
                self.chat_task = Some(PendingChat { ticket, task });
            }
            Err(SubmitError::Empty) => {}
            Err(e @ SubmitError::Busy) => {
                self.status = Some(e.to_string());
            }
        }
    }

    /// Activate the translate control of the selected bot message
    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };

        let translated = self
            .controller
            .transcript()
            .toggle(id)
            .map(|t| t.is_translated)
            .unwrap_or(false);

        if translated {
            if let Err(e) = self.controller.revert(id) {
                self.status = Some(e.to_string());
            }
            return;
        }

        match self.controller.begin_translation(id) {
            Ok(ticket) => {
                let backend = self.backend.clone();
                let text = ticket.text.clone();
                let target = ticket.target;
                let task = tokio::spawn(async move { backend.translate(&text, Some(target)).await });
                self.translate_tasks.push(PendingTranslation { ticket, task });
            }
            // Disabled control: the keypress is ignored like a click on a disabled button
            Err(ToggleError::Pending) => {}
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Complete every request whose task has finished
    pub async fn poll_tasks(&mut self) {
        if self.chat_task.as_ref().is_some_and(|p| p.task.is_finished()) {
            if let Some(PendingChat { ticket, task }) = self.chat_task.take() {
                let result = join_result(task).await;
                let id = self.controller.complete_chat(ticket, result);
                if self.selected.is_none() {
                    self.selected = Some(id);
                }
            }
        }

        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.translate_tasks)
            .into_iter()
            .partition(|p| p.task.is_finished());
        self.translate_tasks = running;

        for PendingTranslation { ticket, task } in finished {
            let result = join_result(task).await;
            self.controller.complete_translation(ticket, result);
        }

        if self.controller.transcript().scroll_pending {
            self.controller.transcript_mut().scroll_pending = false;
            self.scroll_to_bottom();
        }
    }

    pub fn alert(&self) -> Option<&str> {
        self.controller.transcript().alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.controller.transcript_mut().take_alert();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.controller.transcript().is_typing() || !self.translate_tasks.is_empty() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Selection among bot messages

    pub fn select_next(&mut self) {
        let ids = self.controller.transcript().bot_message_ids();
        self.selected = match self.selected.and_then(|s| ids.iter().position(|id| *id == s)) {
            Some(i) => ids.get(i + 1).or(ids.last()).copied(),
            None => ids.first().copied(),
        };
    }

    pub fn select_prev(&mut self) {
        let ids = self.controller.transcript().bot_message_ids();
        self.selected = match self.selected.and_then(|s| ids.iter().position(|id| *id == s)) {
            Some(i) => ids.get(i.saturating_sub(1)).copied(),
            None => ids.last().copied(),
        };
    }

    /// Full URL of the selected message's graph image, if it has one
    pub fn selected_image_url(&self) -> Option<String> {
        let id = self.selected?;
        let image = self.controller.transcript().message(id)?.image.as_ref()?;
        Some(self.backend.resolve_url(image))
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest entry is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let transcript = self.controller.transcript();
        let mut total_lines: usize = 0;

        for msg in transcript.messages() {
            total_lines += 1; // Role line ("You:" or "Bot:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines += (char_count / wrap_width) + 1;
            }
            if msg.role == Role::Bot {
                if msg.image.is_some() {
                    total_lines += 1;
                }
                if transcript.toggle(msg.id).is_some() {
                    total_lines += 1; // Translate control
                }
            }
            total_lines += 1; // Blank line after message
        }

        if transcript.is_typing() {
            total_lines += 2; // "Bot:" + "typing..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        // Paragraph scroll offsets are u16; very long sessions pin to the limit
        self.scroll = u16::try_from(total_lines.saturating_sub(visible_height)).unwrap_or(u16::MAX);
    }
}

async fn join_result(task: RequestTask) -> Result<String, ClientError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(ClientError::Task(e.to_string())),
    }
}
