//! Per-job state and the report it is summarised into.
use crate::answers::QuestionAnswer;
use crate::classifier::PageClassification;
use crate::containment::JobBreaker;
use easyapply_common::ErrorKind;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// A listing handed to the engine by the Run Controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            title: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Start,
    Classify,
    Fill,
    Verify,
    Advance,
    Submitted,
    Abandoned,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Start => "start",
            EngineState::Classify => "classify",
            EngineState::Fill => "fill",
            EngineState::Verify => "verify",
            EngineState::Advance => "advance",
            EngineState::Submitted => "submitted",
            EngineState::Abandoned => "abandoned",
            EngineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// Another page would exceed `max_pages_per_job`.
    PageLimit,
    Cancelled,
}

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Submitted,
    Abandoned { reason: AbandonReason },
    Failed { error: ErrorKind, detail: String },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Submitted => "submitted",
            JobOutcome::Abandoned { .. } => "abandoned",
            JobOutcome::Failed { .. } => "failed",
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            JobOutcome::Failed { error, .. } => Some(*error),
            _ => None,
        }
    }
}

/// Mutable state of a job in flight. Lives only inside
/// [`WorkflowEngine::run_job`](crate::WorkflowEngine::run_job).
#[derive(Debug)]
pub struct JobContext {
    pub attempt: Uuid,
    pub job: Job,
    /// Pages processed so far, starting at 1 for the entry page.
    pub pages: u32,
    pub max_pages: u32,
    pub breaker: JobBreaker,
    pub answers: Vec<QuestionAnswer>,
    pub last_classification: Option<PageClassification>,
    pub last_state: EngineState,
    pub last_error: Option<String>,
    pub already_applied: bool,
    started: Instant,
}

impl JobContext {
    pub fn new(job: Job, max_pages: u32, failure_threshold: u32) -> Self {
        Self {
            attempt: Uuid::new_v4(),
            job,
            pages: 1,
            max_pages: max_pages.max(1),
            breaker: JobBreaker::new(failure_threshold),
            answers: Vec::new(),
            last_classification: None,
            last_state: EngineState::Start,
            last_error: None,
            already_applied: false,
            started: Instant::now(),
        }
    }

    /// Count a newly loaded page. Returns `false`, leaving the counter
    /// untouched, when it would exceed the maximum.
    pub fn next_page(&mut self) -> bool {
        if self.pages >= self.max_pages {
            return false;
        }
        self.pages += 1;
        true
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(self, outcome: JobOutcome) -> JobReport {
        JobReport {
            job_id: self.job.id.clone(),
            attempt: self.attempt,
            duration: self.elapsed(),
            outcome,
            pages: self.pages,
            answers: self.answers,
            last_classification: self.last_classification,
            last_state: self.last_state,
            already_applied: self.already_applied,
        }
    }
}

/// What the Run Controller gets back for each job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub attempt: Uuid,
    pub outcome: JobOutcome,
    pub pages: u32,
    pub duration: Duration,
    pub answers: Vec<QuestionAnswer>,
    pub last_classification: Option<PageClassification>,
    pub last_state: EngineState,
    pub already_applied: bool,
}

impl JobReport {
    pub fn is_submitted(&self) -> bool {
        self.outcome == JobOutcome::Submitted
    }
}
