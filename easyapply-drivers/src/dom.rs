//! Immutable snapshot of the interactive parts of a page.
//!
//! Snapshots are what every locator strategy and classifier predicate reads.
//! An [`ElementId`] is only meaningful for the snapshot that produced it;
//! use [`ElementSnapshot::key`] to find the same control again later.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a control inside one [`PageSnapshot`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub usize);

/// Coarse control type derived from tag and `type` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    FileInput,
    TextInput,
    TextArea,
    Select,
    Radio,
    Checkbox,
    Button,
    Link,
    #[default]
    Other,
}

impl ControlKind {
    /// Controls that hold an answer (as opposed to triggering an action).
    pub fn holds_answer(self) -> bool {
        matches!(
            self,
            ControlKind::FileInput
                | ControlKind::TextInput
                | ControlKind::TextArea
                | ControlKind::Select
                | ControlKind::Radio
                | ControlKind::Checkbox
        )
    }

    fn default_tag(self) -> &'static str {
        match self {
            ControlKind::TextArea => "textarea",
            ControlKind::Select => "select",
            ControlKind::Button => "button",
            ControlKind::Link => "a",
            ControlKind::Other => "div",
            _ => "input",
        }
    }

    fn default_input_type(self) -> Option<&'static str> {
        match self {
            ControlKind::FileInput => Some("file"),
            ControlKind::TextInput => Some("text"),
            ControlKind::Radio => Some("radio"),
            ControlKind::Checkbox => Some("checkbox"),
            _ => None,
        }
    }
}

/// One interactive control as seen at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub tag: String,
    pub kind: ControlKind,
    pub input_type: Option<String>,
    pub attributes: BTreeMap<String, String>,
    /// Text of the associated `<label>` (or `aria-labelledby` target).
    pub label: Option<String>,
    /// Closest text node preceding the control in document order.
    pub preceding_text: Option<String>,
    /// Visible text (buttons, links, option labels).
    pub text: String,
    pub value: String,
    pub checked: bool,
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
    /// Option texts of a `<select>`.
    pub options: Vec<String>,
}

impl Default for ElementSnapshot {
    fn default() -> Self {
        Self::new(ControlKind::Other)
    }
}

impl ElementSnapshot {
    /// A visible, enabled, empty control of `kind`.
    pub fn new(kind: ControlKind) -> Self {
        Self {
            id: ElementId::default(),
            tag: kind.default_tag().to_string(),
            kind,
            input_type: kind.default_input_type().map(str::to_string),
            attributes: BTreeMap::new(),
            label: None,
            preceding_text: None,
            text: String::new(),
            value: String::new(),
            checked: false,
            visible: true,
            enabled: true,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_preceding_text(mut self, text: impl Into<String>) -> Self {
        self.preceding_text = Some(text.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Stable identity across snapshots: `id`, then `name` (plus `value` for
    /// radios), then document position.
    pub fn key(&self) -> String {
        if let Some(id) = self.attr("id").filter(|s| !s.is_empty()) {
            return format!("id:{id}");
        }
        if let Some(name) = self.attr("name").filter(|s| !s.is_empty()) {
            return match self.kind {
                ControlKind::Radio | ControlKind::Checkbox => {
                    format!("name:{name}={}", self.attr("value").unwrap_or(&self.text))
                }
                _ => format!("name:{name}"),
            };
        }
        format!("idx:{}", self.id.0)
    }

    /// Whether the control currently holds no answer.
    pub fn is_empty(&self) -> bool {
        match self.kind {
            ControlKind::Radio | ControlKind::Checkbox => !self.checked,
            _ => self.value.trim().is_empty(),
        }
    }

    pub fn is_interactable(&self) -> bool {
        self.visible && self.enabled
    }

    /// Text a human would read on or next to the control, lowercased.
    pub fn caption(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.text.is_empty() {
            parts.push(&self.text);
        }
        if let Some(label) = &self.label {
            parts.push(label);
        }
        if let Some(aria) = self.attr("aria-label") {
            parts.push(aria);
        }
        if matches!(self.kind, ControlKind::Button) && !self.value.is_empty() {
            parts.push(&self.value);
        }
        parts.join(" ").to_lowercase()
    }
}

/// A screening question: its prompt and the controls that answer it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionBlock {
    pub prompt: String,
    pub controls: Vec<ElementId>,
    pub required: bool,
}

/// Everything the engine knows about the page at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub headings: Vec<String>,
    pub body_text: String,
    pub elements: Vec<ElementSnapshot>,
    pub questions: Vec<QuestionBlock>,
}

/// Coarse identity of a page, used to detect whether navigation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSignature {
    pub url: String,
    pub headings: Vec<String>,
    pub keys: Vec<String>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.headings.push(heading.into());
        self
    }

    pub fn with_body_text(mut self, text: impl Into<String>) -> Self {
        self.body_text = text.into();
        self
    }

    /// Append a control, assigning it the next [`ElementId`].
    pub fn with_element(mut self, element: ElementSnapshot) -> Self {
        self.push_element(element);
        self
    }

    /// Append a question block together with its answer controls.
    pub fn with_question(
        mut self,
        prompt: impl Into<String>,
        controls: Vec<ElementSnapshot>,
        required: bool,
    ) -> Self {
        let ids = controls
            .into_iter()
            .map(|c| self.push_element(c))
            .collect();
        self.questions.push(QuestionBlock {
            prompt: prompt.into(),
            controls: ids,
            required,
        });
        self
    }

    fn push_element(&mut self, mut element: ElementSnapshot) -> ElementId {
        let id = ElementId(self.elements.len());
        element.id = id;
        self.elements.push(element);
        id
    }

    pub fn element(&self, id: ElementId) -> Option<&ElementSnapshot> {
        self.elements.get(id.0).filter(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut ElementSnapshot> {
        self.elements.get_mut(id.0).filter(|e| e.id == id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&ElementSnapshot> {
        self.elements.iter().find(|e| e.key() == key)
    }

    pub fn controls_of(&self, kind: ControlKind) -> impl Iterator<Item = &ElementSnapshot> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    /// Case-insensitive search across headings and body text.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.body_text.to_lowercase().contains(&needle)
            || self
                .headings
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
    }

    pub fn signature(&self) -> PageSignature {
        PageSignature {
            url: self.url.clone(),
            headings: self.headings.clone(),
            keys: self.elements.iter().map(ElementSnapshot::key).collect(),
        }
    }
}
