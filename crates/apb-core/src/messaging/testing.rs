//! Recording messenger used by unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Html {
        chat_id: ChatId,
        html: String,
    },
    Keyboard {
        chat_id: ChatId,
        html: String,
        keyboard: InlineKeyboard,
    },
    Edit {
        msg: MessageRef,
        html: String,
        keyboard: Option<InlineKeyboard>,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
    },
}

impl Sent {
    pub fn html(&self) -> &str {
        match self {
            Sent::Html { html, .. } | Sent::Keyboard { html, .. } | Sent::Edit { html, .. } => {
                html
            }
            Sent::Answer { text, .. } => text.as_deref().unwrap_or(""),
        }
    }

    pub fn keyboard(&self) -> Option<&InlineKeyboard> {
        match self {
            Sent::Keyboard { keyboard, .. } => Some(keyboard),
            Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<Sent>>,
    max_message_len: usize,
    failing: AtomicBool,
}

impl Default for FakeMessenger {
    fn default() -> Self {
        Self::with_max_len(4096)
    }
}

impl FakeMessenger {
    pub fn with_max_len(max_message_len: usize) -> Self {
        Self {
            next_id: Mutex::new(1),
            sent: Mutex::new(Vec::new()),
            max_message_len,
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent gateway call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::External("gateway unavailable".to_string()));
        }
        Ok(())
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        let id = *guard;
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Text of the most recent outgoing message or edit (callback answers skipped).
    pub fn last_html(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| !matches!(s, Sent::Answer { .. }))
            .map(|s| s.html().to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: self.max_message_len,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Html {
            chat_id,
            html: html.to_string(),
        });
        Ok(self.alloc(chat_id))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Edit {
            msg,
            html: html.to_string(),
            keyboard: None,
        });
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Keyboard {
            chat_id,
            html: html.to_string(),
            keyboard,
        });
        Ok(self.alloc(chat_id))
    }

    async fn edit_inline_keyboard(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Edit {
            msg,
            html: html.to_string(),
            keyboard: Some(keyboard),
        });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
