//! Chat view
//!
//! Append-only. Messages are stamped by the store at commit time, so every
//! client sees the same order regardless of local clocks or send races.

use std::sync::Arc;

use super::error::{Notice, ViewResult};
use super::form::required;
use super::page::Page;
use crate::models::{ChatMessage, DEFAULT_AUTHOR};
use crate::store::{DocumentStore, NewDocument};
use crate::sync::{LiveList, Record, ViewState};

pub const EMPTY_MESSAGE: &str = "Message can't be empty.";

/// Input of the message form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatForm {
    pub text: String,
    pub author: String,
}

impl Default for ChatForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            author: DEFAULT_AUTHOR.to_string(),
        }
    }
}

impl ChatForm {
    /// Author as posted: trimmed, falling back to the default name
    pub fn display_author(&self) -> String {
        match self.author.trim() {
            "" => DEFAULT_AUTHOR.to_string(),
            name => name.to_string(),
        }
    }
}

/// The chat page
pub struct ChatView {
    page: Page<ChatMessage>,
    pub form: ChatForm,
}

impl ChatView {
    pub async fn mount(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            page: Page::mount(store).await,
            form: ChatForm::default(),
        }
    }

    pub fn state(&self) -> ViewState<ChatMessage> {
        self.page.state()
    }

    pub fn list_mut(&mut self) -> &mut LiveList<ChatMessage> {
        self.page.list_mut()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.page.notice()
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.form.author = author.into();
    }

    /// Whether `message` was posted under the current author name
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        message.author == self.form.display_author()
    }

    /// Post the form's text; clears the text (not the author) on success
    pub async fn submit(&mut self) -> ViewResult<()> {
        let result = self.post().await;
        if result.is_ok() {
            self.form.text.clear();
        }
        self.page.settle("send message", result)
    }

    /// Fill the form's text and post it
    pub async fn send(&mut self, text: impl Into<String>) -> ViewResult<()> {
        self.form.text = text.into();
        self.submit().await
    }

    async fn post(&self) -> ViewResult<()> {
        let text = required(ChatMessage::TEXT, &self.form.text, EMPTY_MESSAGE)?;
        let document = NewDocument::new()
            .field(ChatMessage::TEXT, text)
            .field(ChatMessage::AUTHOR, self.form.display_author())
            .server_timestamp(ChatMessage::CREATED_AT);

        self.page
            .store()
            .add(ChatMessage::COLLECTION, document)
            .await?;
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.page.unmount();
    }
}
