//! Scripted in-memory [`Page`] for exercising the engine without a browser.
//!
//! A fixture is a list of screens. Clicking a control whose key has a
//! registered transition replaces the live page with a fresh copy of the
//! target screen; everything else mutates the live snapshot in place. A
//! screen may also settle into another one after a number of reads, for
//! content that renders late.
use crate::dom::{ControlKind, ElementId, PageSnapshot};
use crate::page::Page;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FixtureScreen {
    pub snapshot: PageSnapshot,
    transitions: HashMap<String, usize>,
    settle: Option<(usize, usize)>,
}

impl FixtureScreen {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            snapshot,
            transitions: HashMap::new(),
            settle: None,
        }
    }

    /// Clicking the control with `key` loads screen `next`.
    pub fn on_click(mut self, key: impl Into<String>, next: usize) -> Self {
        self.transitions.insert(key.into(), next);
        self
    }

    /// The first `reads` snapshots show this screen; later ones show `next`.
    pub fn settles_into(mut self, next: usize, reads: usize) -> Self {
        self.settle = Some((reads, next));
        self
    }
}

/// One recorded interaction, addressed by element key.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureAction {
    SetValue { key: String, value: String },
    AttachFile { key: String, path: String },
    Choose { key: String },
    Select { key: String, option: String },
    Click { key: String },
    Scroll(i64),
    Pointer(i64, i64),
}

#[derive(Debug)]
pub struct FixturePage {
    screens: Vec<FixtureScreen>,
    current: usize,
    live: PageSnapshot,
    snapshots: usize,
    reads_on_screen: usize,
    actions: Vec<FixtureAction>,
    rejecting: HashSet<String>,
    fail_snapshots: bool,
}

impl FixturePage {
    pub fn new(screens: Vec<FixtureScreen>) -> Self {
        let live = screens
            .first()
            .map(|s| s.snapshot.clone())
            .unwrap_or_default();
        Self {
            screens,
            current: 0,
            live,
            snapshots: 0,
            reads_on_screen: 0,
            actions: Vec::new(),
            rejecting: HashSet::new(),
            fail_snapshots: false,
        }
    }

    pub fn single(snapshot: PageSnapshot) -> Self {
        Self::new(vec![FixtureScreen::new(snapshot)])
    }

    /// Input sent to the control with `key` is recorded but never sticks.
    pub fn rejecting_input(mut self, key: impl Into<String>) -> Self {
        self.rejecting.insert(key.into());
        self
    }

    /// Every snapshot request fails, as with a crashed browser tab.
    pub fn failing_snapshots(mut self) -> Self {
        self.fail_snapshots = true;
        self
    }

    pub fn current_screen(&self) -> usize {
        self.current
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    pub fn actions(&self) -> &[FixtureAction] {
        &self.actions
    }

    /// Keys of every clicked control, in order.
    pub fn clicks(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                FixtureAction::Click { key } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn live(&self) -> &PageSnapshot {
        &self.live
    }

    fn load(&mut self, next: usize) -> Result<()> {
        let screen = self
            .screens
            .get(next)
            .ok_or_else(|| anyhow!("fixture has no screen {next}"))?;
        self.live = screen.snapshot.clone();
        self.current = next;
        self.reads_on_screen = 0;
        Ok(())
    }

    fn key_of(&self, id: ElementId) -> Result<String> {
        self.live
            .element(id)
            .map(|e| e.key())
            .ok_or_else(|| anyhow!("stale element reference {}", id.0))
    }

    fn accepts(&self, key: &str) -> bool {
        !self.rejecting.contains(key)
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        self.snapshots += 1;
        if self.fail_snapshots {
            bail!("fixture snapshot failure");
        }
        if let Some((reads, next)) = self.screens[self.current].settle {
            if self.reads_on_screen >= reads {
                self.load(next)?;
            }
        }
        self.reads_on_screen += 1;
        Ok(self.live.clone())
    }

    async fn set_value(&mut self, id: ElementId, value: &str) -> Result<()> {
        let key = self.key_of(id)?;
        self.actions.push(FixtureAction::SetValue {
            key: key.clone(),
            value: value.to_string(),
        });
        if self.accepts(&key) {
            if let Some(el) = self.live.element_mut(id) {
                el.value = value.to_string();
            }
        }
        Ok(())
    }

    async fn attach_file(&mut self, id: ElementId, path: &Path) -> Result<()> {
        let key = self.key_of(id)?;
        let path = path.display().to_string();
        self.actions.push(FixtureAction::AttachFile {
            key: key.clone(),
            path: path.clone(),
        });
        if self.accepts(&key) {
            if let Some(el) = self.live.element_mut(id) {
                el.value = path;
            }
        }
        Ok(())
    }

    async fn choose(&mut self, id: ElementId) -> Result<()> {
        let key = self.key_of(id)?;
        self.actions.push(FixtureAction::Choose { key: key.clone() });
        if !self.accepts(&key) {
            return Ok(());
        }
        let Some(target) = self.live.element(id).cloned() else {
            return Ok(());
        };
        if target.kind == ControlKind::Radio {
            if let Some(group) = target.attr("name") {
                for el in self.live.elements.iter_mut() {
                    if el.kind == ControlKind::Radio && el.attr("name") == Some(group) {
                        el.checked = false;
                    }
                }
            }
        }
        if let Some(el) = self.live.element_mut(id) {
            el.checked = true;
        }
        Ok(())
    }

    async fn select_option(&mut self, id: ElementId, option: &str) -> Result<()> {
        let key = self.key_of(id)?;
        self.actions.push(FixtureAction::Select {
            key: key.clone(),
            option: option.to_string(),
        });
        let accepts = self.accepts(&key);
        let Some(el) = self.live.element_mut(id) else {
            return Ok(());
        };
        let wanted = option.trim().to_lowercase();
        let matched = el
            .options
            .iter()
            .find(|o| o.trim().to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| anyhow!("option {option:?} not offered by {key}"))?;
        if accepts {
            el.value = matched;
        }
        Ok(())
    }

    async fn click(&mut self, id: ElementId) -> Result<()> {
        let key = self.key_of(id)?;
        self.actions.push(FixtureAction::Click { key: key.clone() });
        if let Some(&next) = self.screens[self.current].transitions.get(&key) {
            self.load(next)?;
        }
        Ok(())
    }

    async fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.actions.push(FixtureAction::Scroll(dy));
        Ok(())
    }

    async fn move_pointer(&mut self, x: i64, y: i64) -> Result<()> {
        self.actions.push(FixtureAction::Pointer(x, y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSnapshot;

    fn two_screens() -> FixturePage {
        let first = PageSnapshot::new("https://example.test/1")
            .with_element(ElementSnapshot::new(ControlKind::TextInput).with_attr("name", "city"))
            .with_element(
                ElementSnapshot::new(ControlKind::Button)
                    .with_attr("id", "next")
                    .with_text("Continue"),
            );
        let second = PageSnapshot::new("https://example.test/2").with_heading("Review");
        FixturePage::new(vec![
            FixtureScreen::new(first).on_click("id:next", 1),
            FixtureScreen::new(second),
        ])
    }

    #[tokio::test]
    async fn click_follows_transition() {
        let mut page = two_screens();
        page.set_value(ElementId(0), "Springfield").await.unwrap();
        assert_eq!(page.live().elements[0].value, "Springfield");

        page.click(ElementId(1)).await.unwrap();
        assert_eq!(page.current_screen(), 1);
        assert_eq!(page.snapshot().await.unwrap().headings, vec!["Review"]);
        assert_eq!(page.clicks(), vec!["id:next"]);
    }

    #[tokio::test]
    async fn radio_choice_is_exclusive() {
        let snap = PageSnapshot::new("https://example.test").with_question(
            "Sponsorship?",
            vec![
                ElementSnapshot::new(ControlKind::Radio)
                    .with_attr("name", "sp")
                    .with_attr("value", "Yes"),
                ElementSnapshot::new(ControlKind::Radio)
                    .with_attr("name", "sp")
                    .with_attr("value", "No"),
            ],
            true,
        );
        let mut page = FixturePage::single(snap);
        page.choose(ElementId(0)).await.unwrap();
        page.choose(ElementId(1)).await.unwrap();
        assert!(!page.live().elements[0].checked);
        assert!(page.live().elements[1].checked);
    }

    #[tokio::test]
    async fn rejected_input_is_recorded_but_not_applied() {
        let mut page = two_screens().rejecting_input("name:city");
        page.set_value(ElementId(0), "Springfield").await.unwrap();
        assert!(page.live().elements[0].value.is_empty());
        assert_eq!(page.actions().len(), 1);
    }

    #[tokio::test]
    async fn unknown_select_option_is_an_error() {
        let snap = PageSnapshot::new("https://example.test").with_element(
            ElementSnapshot::new(ControlKind::Select).with_options(["Day shift", "Night shift"]),
        );
        let mut page = FixturePage::single(snap);
        assert!(page.select_option(ElementId(0), "day shift").await.is_ok());
        assert_eq!(page.live().elements[0].value, "Day shift");
        assert!(page.select_option(ElementId(0), "Weekend").await.is_err());
    }

    #[tokio::test]
    async fn screen_settles_after_reads() {
        let loading = PageSnapshot::new("https://example.test/1").with_body_text("Loading");
        let ready = PageSnapshot::new("https://example.test/1").with_heading("Documents");
        let mut page = FixturePage::new(vec![
            FixtureScreen::new(loading).settles_into(1, 2),
            FixtureScreen::new(ready),
        ]);
        assert!(page.snapshot().await.unwrap().headings.is_empty());
        assert!(page.snapshot().await.unwrap().headings.is_empty());
        assert_eq!(page.snapshot().await.unwrap().headings, vec!["Documents"]);
        assert_eq!(page.current_screen(), 1);
    }

    #[tokio::test]
    async fn stale_ids_are_rejected() {
        let mut page = two_screens();
        assert!(page.click(ElementId(9)).await.is_err());
    }
}
