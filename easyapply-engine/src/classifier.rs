//! Page Classifier: map a snapshot onto a workflow step kind.
//!
//! Predicates run in a fixed order and the first hit wins. The function is
//! pure, so classifying an unchanged page twice gives the same answer.
use crate::locator::{locate, locate_excluding};
use crate::taxonomy::{CONTACT_FIELDS, SUBMIT};
use easyapply_drivers::{ControlKind, ElementId, PageSnapshot};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageClassification {
    ResumeUpload,
    ContactInfo,
    ScreeningQuestions,
    Review,
    Submission,
    Unknown,
}

impl fmt::Display for PageClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageClassification::ResumeUpload => "resume_upload",
            PageClassification::ContactInfo => "contact_info",
            PageClassification::ScreeningQuestions => "screening_questions",
            PageClassification::Review => "review",
            PageClassification::Submission => "submission",
            PageClassification::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Body-text markers of a completed application.
pub const SUCCESS_MARKERS: [&str; 5] = [
    "application submitted",
    "application sent",
    "application complete",
    "thank you for applying",
    "your application has been sent",
];

/// Body-text markers of a listing the applicant has already applied to.
pub const ALREADY_APPLIED_MARKERS: [&str; 3] =
    ["already applied", "you applied", "applied on"];

const HEADING_KEYWORDS: [(PageClassification, &[&str]); 4] = [
    (PageClassification::ResumeUpload, &["resume", "cv", "upload", "documents"]),
    (PageClassification::ContactInfo, &["contact", "information", "details"]),
    (PageClassification::ScreeningQuestions, &["questions", "screening", "assessment"]),
    (PageClassification::Review, &["review", "summary", "confirm"]),
];

type Predicate = fn(&PageSnapshot) -> Option<PageClassification>;

/// Ordered predicates; the name is reported alongside the result.
const PREDICATES: [(&str, Predicate); 7] = [
    ("success_marker", success_marker),
    ("already_applied", already_applied),
    ("heading_keywords", heading_keywords),
    ("upload_control", upload_control),
    ("contact_field", contact_field),
    ("question_blocks", question_blocks),
    ("submit_with_summary", submit_with_summary),
];

pub fn classify(page: &PageSnapshot) -> PageClassification {
    classify_explained(page).0
}

/// Classification plus the name of the predicate that produced it.
pub fn classify_explained(page: &PageSnapshot) -> (PageClassification, &'static str) {
    PREDICATES
        .iter()
        .find_map(|(name, predicate)| predicate(page).map(|c| (c, *name)))
        .unwrap_or((PageClassification::Unknown, "none"))
}

pub fn has_success_marker(page: &PageSnapshot) -> bool {
    SUCCESS_MARKERS.iter().any(|m| page.mentions(m))
}

pub fn is_already_applied(page: &PageSnapshot) -> bool {
    ALREADY_APPLIED_MARKERS.iter().any(|m| page.mentions(m))
}

fn success_marker(page: &PageSnapshot) -> Option<PageClassification> {
    has_success_marker(page).then_some(PageClassification::Submission)
}

fn already_applied(page: &PageSnapshot) -> Option<PageClassification> {
    is_already_applied(page).then_some(PageClassification::Submission)
}

fn heading_keywords(page: &PageSnapshot) -> Option<PageClassification> {
    let words: HashSet<String> = page
        .headings
        .iter()
        .flat_map(|h| {
            h.split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .collect();
    HEADING_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| words.contains(*k)))
        .map(|(class, _)| *class)
}

fn upload_control(page: &PageSnapshot) -> Option<PageClassification> {
    page.controls_of(ControlKind::FileInput)
        .any(|el| el.enabled)
        .then_some(PageClassification::ResumeUpload)
}

/// Contact-like fields that are not part of a screening question.
fn contact_field(page: &PageSnapshot) -> Option<PageClassification> {
    let in_questions: HashSet<ElementId> = page
        .questions
        .iter()
        .flat_map(|q| q.controls.iter().copied())
        .collect();
    CONTACT_FIELDS
        .iter()
        .any(|d| locate_excluding(d, page, &in_questions).is_some())
        .then_some(PageClassification::ContactInfo)
}

fn question_blocks(page: &PageSnapshot) -> Option<PageClassification> {
    page.questions
        .iter()
        .any(|q| !q.prompt.trim().is_empty() && !q.controls.is_empty())
        .then_some(PageClassification::ScreeningQuestions)
}

/// A submit action on a page that shows data rather than asking for it.
fn submit_with_summary(page: &PageSnapshot) -> Option<PageClassification> {
    let shows_summary = !page.body_text.trim().is_empty()
        && !page.elements.iter().any(|el| {
            el.visible
                && el.kind.holds_answer()
                && el.kind != ControlKind::FileInput
                && el.is_empty()
        });
    (locate(&SUBMIT, page).is_some() && shows_summary).then_some(PageClassification::Review)
}
