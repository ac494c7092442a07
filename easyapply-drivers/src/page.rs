use crate::dom::{ElementId, PageSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Everything the engine may do to a page.
///
/// [`ElementId`]s refer to the most recent [`snapshot`](Page::snapshot);
/// after any action that can change the DOM, take a fresh snapshot before
/// addressing elements again.
#[async_trait]
pub trait Page: Send {
    async fn snapshot(&mut self) -> Result<PageSnapshot>;

    /// Replace the value of a text input or textarea.
    async fn set_value(&mut self, id: ElementId, value: &str) -> Result<()>;

    async fn attach_file(&mut self, id: ElementId, path: &Path) -> Result<()>;

    /// Select a radio button or tick a checkbox.
    async fn choose(&mut self, id: ElementId) -> Result<()>;

    /// Pick the `<select>` option whose text matches `option`.
    async fn select_option(&mut self, id: ElementId, option: &str) -> Result<()>;

    async fn click(&mut self, id: ElementId) -> Result<()>;

    async fn scroll_by(&mut self, dy: i64) -> Result<()>;

    async fn move_pointer(&mut self, x: i64, y: i64) -> Result<()>;
}
