//! The Easy Apply workflow engine.
//!
//! Given a live [`Page`](easyapply_drivers::Page) positioned on a job's
//! application entry point, the [`WorkflowEngine`] classifies each page,
//! fills it from the applicant [`Profile`](easyapply_common::Profile),
//! verifies mandatory fields and advances, until the job is submitted,
//! abandoned or failed.
//!
//! # Modules
//!
//! - [`taxonomy`]: static field descriptors and per-step field plans
//! - [`locator`]: ordered strategy fallback from descriptor to control
//! - [`classifier`]: ordered predicates from snapshot to step kind
//! - [`answers`]: screening question archetypes and profile-backed answers
//! - [`filler`]: fill, verify and advance one step
//! - [`behavior`]: log-normal pacing and incidental actions
//! - [`containment`]: job/run circuit breakers and the action rate limiter
//! - [`job`], [`stats`]: per-job context and run-wide statistics
//! - [`engine`]: the state machine tying it together
pub mod answers;
pub mod behavior;
pub mod classifier;
pub mod containment;
pub mod engine;
pub mod filler;
pub mod job;
pub mod locator;
pub mod stats;
pub mod taxonomy;

pub use answers::{answer, answer_question, Confidence, QuestionAnswer};
pub use behavior::BehaviorSimulator;
pub use classifier::{classify, PageClassification};
pub use containment::{Admission, CircuitState, JobBreaker, RateLimiter, RunBreaker};
pub use engine::WorkflowEngine;
pub use filler::{fill_step, StepResult};
pub use job::{AbandonReason, EngineState, Job, JobOutcome, JobReport};
pub use locator::{locate, wait_for};
pub use stats::RunStatistics;
pub use taxonomy::FieldDescriptor;
