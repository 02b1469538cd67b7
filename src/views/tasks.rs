//! Task List view
//!
//! CRUD over `todos`: add from the form, toggle completion, delete. The list
//! itself only ever changes through the live query.

use serde_json::json;
use std::sync::Arc;

use super::error::{Notice, ViewError, ViewResult};
use super::form::required;
use super::page::Page;
use crate::models::Task;
use crate::store::{DocumentStore, Fields, NewDocument};
use crate::sync::{LiveList, Record, ViewState};

pub const EMPTY_TASK: &str = "Task can't be empty.";

/// Input of the add-task form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub text: String,
}

/// The to-do list page
pub struct TaskListView {
    page: Page<Task>,
    pub form: TaskForm,
}

impl TaskListView {
    /// Mount the page and open its live query
    pub async fn mount(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            page: Page::mount(store).await,
            form: TaskForm::default(),
        }
    }

    pub fn state(&self) -> ViewState<Task> {
        self.page.state()
    }

    pub fn list_mut(&mut self) -> &mut LiveList<Task> {
        self.page.list_mut()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.page.notice()
    }

    /// Submit the form; clears it once the store accepted the task
    pub async fn submit(&mut self) -> ViewResult<()> {
        let result = self.create().await;
        if result.is_ok() {
            self.form = TaskForm::default();
        }
        self.page.settle("add task", result)
    }

    /// Fill the form with `text` and submit it
    pub async fn add_task(&mut self, text: impl Into<String>) -> ViewResult<()> {
        self.form.text = text.into();
        self.submit().await
    }

    async fn create(&self) -> ViewResult<()> {
        let text = required(Task::TEXT, &self.form.text, EMPTY_TASK)?;
        let document = NewDocument::new()
            .field(Task::TEXT, text)
            .field(Task::COMPLETED, false)
            .field(Task::CREATED_AT, chrono::Utc::now().timestamp_millis());

        self.page.store().add(Task::COLLECTION, document).await?;
        Ok(())
    }

    /// Flip the completion flag of `task` as last seen in the list
    pub async fn toggle(&mut self, task: &Task) -> ViewResult<()> {
        let result = self.set_completed(&task.id, !task.completed).await;
        self.page.settle("toggle task", result)
    }

    /// Flip the completion flag of the listed task with this id
    pub async fn toggle_by_id(&mut self, id: &str) -> ViewResult<()> {
        match self.page.find(|t| t.id == id) {
            Some(task) => self.toggle(&task).await,
            None => self
                .page
                .settle("toggle task", Err(ViewError::UnknownRecord(id.to_string()))),
        }
    }

    async fn set_completed(&self, id: &str, completed: bool) -> ViewResult<()> {
        let mut fields = Fields::new();
        fields.insert(Task::COMPLETED.to_string(), json!(completed));
        self.page
            .store()
            .update(Task::COLLECTION, id, fields)
            .await?;
        Ok(())
    }

    /// Delete a task
    pub async fn delete(&mut self, id: &str) -> ViewResult<()> {
        let result = self
            .page
            .store()
            .delete(Task::COLLECTION, id)
            .await
            .map_err(ViewError::from);
        self.page.settle("delete task", result)
    }

    /// Tear down the live query
    pub fn unmount(&mut self) {
        self.page.unmount();
    }
}
