//! Workflow Engine: the per-job state machine and the run-wide state it owns.
//!
//! `Start -> Classify -> Fill -> Verify -> Advance -> (Classify | Submitted |
//! Abandoned | Failed)`. Every step is gated by the job's circuit breaker and
//! checks for cancellation first; each advance click draws from the rate
//! limiter. Job-level failures come back as [`JobOutcome::Failed`] values.
//! Only a rejection by the run breaker is returned as an error.
use crate::behavior::BehaviorSimulator;
use crate::classifier::{classify_explained, has_success_marker, is_already_applied, PageClassification};
use crate::containment::{CircuitState, JobVerdict, RateLimiter, RunBreaker};
use crate::filler::{advance, fill_step, verify, AdvanceAction, MandatoryField};
use crate::job::{AbandonReason, EngineState, Job, JobContext, JobOutcome, JobReport};
use crate::stats::RunStatistics;
use easyapply_common::{ApplyError, EngineSettings, ErrorKind, Profile};
use easyapply_drivers::{Page, PageSnapshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a step sends the job next.
enum Step {
    Next(EngineState),
    Done(JobOutcome),
}

/// What the page did after an advance click.
enum Navigation {
    Changed(PageSnapshot),
    Unchanged,
}

pub struct WorkflowEngine {
    settings: EngineSettings,
    behavior: BehaviorSimulator,
    rate: RateLimiter,
    run_breaker: RunBreaker,
    stats: RunStatistics,
    cancel: CancellationToken,
}

/// Counters that live for one job's pass through the loop.
#[derive(Default)]
struct Attempts {
    classify: u32,
    verify: u32,
    advance: u32,
}

impl WorkflowEngine {
    pub fn new(settings: EngineSettings, cancel: CancellationToken) -> Self {
        Self {
            behavior: BehaviorSimulator::new(&settings, cancel.clone()),
            rate: RateLimiter::from_settings(&settings),
            run_breaker: RunBreaker::from_settings(&settings),
            stats: RunStatistics::default(),
            settings,
            cancel,
        }
    }

    /// Swap the pacing source, e.g. for a disabled simulator in tests. The
    /// simulator's cancellation token becomes the engine's.
    pub fn with_behavior(mut self, behavior: BehaviorSimulator) -> Self {
        self.cancel = behavior.cancel_token().clone();
        self.behavior = behavior;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn behavior(&self) -> &BehaviorSimulator {
        &self.behavior
    }

    pub fn record_skipped(&mut self) {
        self.stats.record_skipped();
    }

    pub fn run_breaker_state(&self) -> CircuitState {
        self.run_breaker.state()
    }

    /// Drive one job from its application entry page to a terminal outcome.
    ///
    /// `page` must already show the first application step.
    pub async fn run_job(
        &mut self,
        job: Job,
        page: &mut dyn Page,
        profile: &Profile,
    ) -> Result<JobReport, ApplyError> {
        let admission = match self.run_breaker.admit(Instant::now()) {
            Ok(admission) => admission,
            Err(e) => {
                warn!(target: "easyapply.engine", job_id = %job.id, error = %e, "job rejected by run breaker");
                return Err(e);
            }
        };

        let mut ctx = JobContext::new(
            job,
            self.settings.max_pages_per_job,
            self.settings.job_failure_threshold,
        );
        info!(
            target: "easyapply.engine",
            job_id = %ctx.job.id,
            attempt = %ctx.attempt,
            admission = ?admission,
            "job started"
        );

        let outcome = self.drive(&mut ctx, page, profile).await;
        self.log_outcome(&ctx, &outcome);

        let verdict = match outcome {
            JobOutcome::Submitted => JobVerdict::Success,
            JobOutcome::Failed { .. } => JobVerdict::Failure,
            JobOutcome::Abandoned { .. } => JobVerdict::Neutral,
        };
        self.run_breaker.record(verdict, Instant::now());

        let report = ctx.finish(outcome);
        self.stats.record(&report);
        Ok(report)
    }

    async fn drive(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        profile: &Profile,
    ) -> JobOutcome {
        let mut state = EngineState::Start;
        let mut classification = PageClassification::Unknown;
        let mut mandatory: Vec<MandatoryField> = Vec::new();
        let mut attempts = Attempts::default();

        loop {
            if self.cancel.is_cancelled() {
                return abandoned(AbandonReason::Cancelled);
            }
            if ctx.breaker.is_open() {
                return JobOutcome::Failed {
                    error: ErrorKind::CircuitOpen,
                    detail: ctx
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "job breaker open".to_string()),
                };
            }
            if ctx.last_state != state {
                debug!(target: "easyapply.engine", job_id = %ctx.job.id, from = %ctx.last_state, to = %state, "transition");
            }
            ctx.last_state = state;

            let step = match state {
                EngineState::Classify => {
                    self.classify(ctx, page, &mut classification, &mut attempts)
                        .await
                }
                EngineState::Fill => {
                    self.fill(ctx, page, profile, classification, &mut mandatory)
                        .await
                }
                EngineState::Verify => self.verify(ctx, page, &mandatory, &mut attempts).await,
                EngineState::Advance => self.advance(ctx, page, &mut attempts).await,
                EngineState::Start => Ok(Step::Next(EngineState::Classify)),
                EngineState::Submitted | EngineState::Abandoned | EngineState::Failed => {
                    unreachable!("terminal states leave the loop through Step::Done")
                }
            };

            match step {
                Ok(Step::Next(next)) => state = next,
                Ok(Step::Done(outcome)) => return outcome,
                Err(ApplyError::Cancelled) => return abandoned(AbandonReason::Cancelled),
                Err(e) => {
                    return JobOutcome::Failed {
                        error: e.kind(),
                        detail: e.to_string(),
                    }
                }
            }
        }
    }

    async fn classify(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        classification: &mut PageClassification,
        attempts: &mut Attempts,
    ) -> Result<Step, ApplyError> {
        let snapshot = match page.snapshot().await {
            Ok(s) => s,
            Err(e) => return self.retry(ctx, page, e.into(), EngineState::Classify).await,
        };
        let (class, predicate) = classify_explained(&snapshot);
        ctx.last_classification = Some(class);
        info!(
            target: "easyapply.classify",
            job_id = %ctx.job.id,
            page = ctx.pages,
            classification = %class,
            predicate,
            heading = snapshot.headings.first().map(String::as_str).unwrap_or(""),
            "page classified"
        );

        match class {
            PageClassification::Submission => {
                ctx.already_applied =
                    is_already_applied(&snapshot) && !has_success_marker(&snapshot);
                Ok(Step::Done(JobOutcome::Submitted))
            }
            PageClassification::Unknown => {
                attempts.classify += 1;
                if attempts.classify >= self.settings.classify_retries.max(1) {
                    return Err(ApplyError::ClassificationAmbiguous {
                        attempts: attempts.classify,
                    });
                }
                let err = ApplyError::ClassificationAmbiguous {
                    attempts: attempts.classify,
                };
                self.retry(ctx, page, err, EngineState::Classify).await
            }
            other => {
                attempts.classify = 0;
                ctx.breaker.record_success();
                *classification = other;
                Ok(Step::Next(EngineState::Fill))
            }
        }
    }

    async fn fill(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        profile: &Profile,
        classification: PageClassification,
        mandatory: &mut Vec<MandatoryField>,
    ) -> Result<Step, ApplyError> {
        let result = match fill_step(
            classification,
            page,
            profile,
            &mut self.behavior,
            &self.settings,
        )
        .await
        {
            Ok(result) => result,
            Err(e) if e.is_recoverable() => {
                return self.retry(ctx, page, e, EngineState::Classify).await
            }
            Err(e) => return Err(e),
        };

        if let Some(blocker) = result.blockers.first() {
            return Err(ApplyError::RequiredFieldUnfillable {
                field: blocker.field.clone(),
            });
        }
        ctx.answers.extend(result.answers);
        *mandatory = result.mandatory;
        Ok(Step::Next(EngineState::Verify))
    }

    async fn verify(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        mandatory: &[MandatoryField],
        attempts: &mut Attempts,
    ) -> Result<Step, ApplyError> {
        let unfilled = match verify(page, mandatory).await {
            Ok(unfilled) => unfilled,
            Err(e) if e.is_recoverable() => {
                return self.retry(ctx, page, e, EngineState::Verify).await
            }
            Err(e) => return Err(e),
        };
        if unfilled.is_empty() {
            attempts.verify = 0;
            return Ok(Step::Next(EngineState::Advance));
        }

        attempts.verify += 1;
        let field = unfilled.join(", ");
        if attempts.verify > self.settings.verify_retries {
            return Err(ApplyError::RequiredFieldUnfillable { field });
        }
        info!(
            target: "easyapply.engine",
            job_id = %ctx.job.id,
            attempt = attempts.verify,
            fields = %field,
            "mandatory fields empty; refilling"
        );
        let err = ApplyError::ElementNotFound { field };
        self.retry(ctx, page, err, EngineState::Fill).await
    }

    async fn advance(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        attempts: &mut Attempts,
    ) -> Result<Step, ApplyError> {
        let action = match advance(page, &mut self.behavior, &mut self.rate).await {
            Ok(action) => action,
            Err(e) if e.is_recoverable() => return self.stalled(ctx, page, attempts, e).await,
            Err(e) => return Err(e),
        };

        match self.await_navigation(page, &action).await? {
            Navigation::Changed(snapshot) => {
                if action.terminal && has_success_marker(&snapshot) {
                    return Ok(Step::Done(JobOutcome::Submitted));
                }
                attempts.advance = 0;
                ctx.breaker.record_success();
                if !ctx.next_page() {
                    return Ok(Step::Done(abandoned(AbandonReason::PageLimit)));
                }
                debug!(target: "easyapply.engine", job_id = %ctx.job.id, page = ctx.pages, "next page");
                Ok(Step::Next(EngineState::Classify))
            }
            Navigation::Unchanged => {
                let err = ApplyError::NavigationStalled {
                    attempts: attempts.advance + 1,
                };
                self.stalled(ctx, page, attempts, err).await
            }
        }
    }

    /// Count a failed advance; re-examine the page unless the budget is
    /// spent.
    async fn stalled(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        attempts: &mut Attempts,
        err: ApplyError,
    ) -> Result<Step, ApplyError> {
        attempts.advance += 1;
        if attempts.advance > self.settings.advance_retries {
            ctx.last_error = Some(err.to_string());
            return Err(ApplyError::NavigationStalled {
                attempts: attempts.advance,
            });
        }
        self.retry(ctx, page, err, EngineState::Classify).await
    }

    /// Poll until the page signature moves away from the pre-click one, or a
    /// terminal click shows a success marker.
    async fn await_navigation(
        &mut self,
        page: &mut dyn Page,
        action: &AdvanceAction,
    ) -> Result<Navigation, ApplyError> {
        let deadline = Instant::now() + self.settings.element_wait();
        loop {
            match page.snapshot().await {
                Ok(snapshot) => {
                    if snapshot.signature() != action.before
                        || (action.terminal && has_success_marker(&snapshot))
                    {
                        return Ok(Navigation::Changed(snapshot));
                    }
                }
                Err(e) => debug!(target: "easyapply.engine", error = %e, "snapshot failed while waiting for navigation"),
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Navigation::Unchanged);
            }
            let nap = self.settings.poll_interval().min(deadline - now);
            self.behavior.suspend(nap).await?;
        }
    }

    /// Record a recoverable step failure against the job breaker and pause
    /// before `then`.
    async fn retry(
        &mut self,
        ctx: &mut JobContext,
        page: &mut dyn Page,
        err: ApplyError,
        then: EngineState,
    ) -> Result<Step, ApplyError> {
        warn!(
            target: "easyapply.engine",
            job_id = %ctx.job.id,
            state = %ctx.last_state,
            kind = %err.kind(),
            error = %err,
            "step failed"
        );
        ctx.last_error = Some(err.to_string());
        if ctx.breaker.record_failure(&ctx.job.id) {
            return Ok(Step::Next(then));
        }
        self.behavior.pace(page).await?;
        Ok(Step::Next(then))
    }

    fn log_outcome(&self, ctx: &JobContext, outcome: &JobOutcome) {
        let last_classification = ctx
            .last_classification
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        match outcome {
            JobOutcome::Failed { error, detail } => warn!(
                target: "easyapply.engine",
                job_id = %ctx.job.id,
                outcome = outcome.label(),
                kind = %error,
                detail = %detail,
                last_classification = %last_classification,
                last_state = %ctx.last_state,
                pages = ctx.pages,
                "job finished"
            ),
            _ => info!(
                target: "easyapply.engine",
                job_id = %ctx.job.id,
                outcome = outcome.label(),
                already_applied = ctx.already_applied,
                last_classification = %last_classification,
                last_state = %ctx.last_state,
                pages = ctx.pages,
                elapsed_secs = ctx.elapsed().as_secs_f64(),
                "job finished"
            ),
        }
    }
}

fn abandoned(reason: AbandonReason) -> JobOutcome {
    JobOutcome::Abandoned { reason }
}
