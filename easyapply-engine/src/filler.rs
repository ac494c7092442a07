//! Form Filler: populate the fields of one classified step, read the
//! mandatory ones back, and trigger the advance control.
use crate::answers::{answer_question, normalize, QuestionAnswer};
use crate::behavior::BehaviorSimulator;
use crate::classifier::PageClassification;
use crate::containment::RateLimiter;
use crate::locator::{locate, locate_excluding, wait_for_excluding};
use crate::taxonomy::{plan, FieldDescriptor, FieldKind, StepField, StrategyKind, ADVANCE_ORDER, SUBMIT};
use easyapply_common::{ApplyError, EngineSettings, Profile};
use easyapply_drivers::{ControlKind, ElementId, ElementSnapshot, Page, PageSignature, PageSnapshot};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A field that stops the current job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub field: String,
    pub reason: String,
}

/// A field that must read back non-empty before advancing. Any one of
/// `keys` holding a value satisfies it (radio groups have several).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MandatoryField {
    pub field: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepResult {
    pub filled: u32,
    pub skipped: u32,
    pub blockers: Vec<Blocker>,
    pub answers: Vec<QuestionAnswer>,
    pub mandatory: Vec<MandatoryField>,
}

impl StepResult {
    pub fn is_blocked(&self) -> bool {
        !self.blockers.is_empty()
    }
}

/// The control an advance click went to.
#[derive(Debug, Clone)]
pub struct AdvanceAction {
    pub field: &'static str,
    pub key: String,
    /// The click went to the final submission control.
    pub terminal: bool,
    /// Page signature right before the click.
    pub before: PageSignature,
}

/// Fill every field of a `classification` step that is currently empty.
///
/// Descriptor fields come from the step plan; question blocks are answered
/// on every step. Only a missing required field is a blocker here. Values
/// that do not stick are caught later by [`verify`].
pub async fn fill_step(
    classification: PageClassification,
    page: &mut dyn Page,
    profile: &Profile,
    pacer: &mut BehaviorSimulator,
    settings: &EngineSettings,
) -> Result<StepResult, ApplyError> {
    let snapshot = page.snapshot().await?;
    let mut run = StepRun {
        page,
        pacer,
        profile,
        settings,
        current: snapshot,
        result: StepResult::default(),
        taken: HashSet::new(),
        claimed: HashSet::new(),
    };
    run.taken = claimed_ids(&run.current, &run.claimed);

    for field in plan(classification) {
        run.fill_field(field).await?;
    }
    if classification != PageClassification::Submission {
        run.answer_questions().await?;
    }

    info!(
        target: "easyapply.fill",
        step = %classification,
        filled = run.result.filled,
        skipped = run.result.skipped,
        blockers = run.result.blockers.len(),
        "step filled"
    );
    Ok(run.result)
}

struct StepRun<'a> {
    page: &'a mut dyn Page,
    pacer: &'a mut BehaviorSimulator,
    profile: &'a Profile,
    settings: &'a EngineSettings,
    current: PageSnapshot,
    result: StepResult,
    /// Ids in `current` that descriptor fields must not use.
    taken: HashSet<ElementId>,
    /// Keys of controls already claimed by a descriptor field.
    claimed: HashSet<String>,
}

/// Question-block controls plus previously claimed controls, as ids of
/// `snapshot`.
fn claimed_ids(snapshot: &PageSnapshot, claimed: &HashSet<String>) -> HashSet<ElementId> {
    let questions = snapshot.questions.iter().flat_map(|q| q.controls.iter().copied());
    let keyed = snapshot
        .elements
        .iter()
        .filter(|el| claimed.contains(&el.key()))
        .map(|el| el.id);
    questions.chain(keyed).collect()
}

impl StepRun<'_> {
    fn block(&mut self, field: &str, reason: &str) {
        warn!(target: "easyapply.fill", field, reason, "required field unavailable");
        self.result.blockers.push(Blocker {
            field: field.to_string(),
            reason: reason.to_string(),
        });
    }

    async fn fill_field(&mut self, field: &StepField) -> Result<(), ApplyError> {
        let d = field.descriptor;
        let hit = locate_excluding(d, &self.current, &self.taken)
            .map(|h| (h.element.clone(), h.strategy));

        let (element, strategy) = match hit {
            Some(found) => found,
            None if field.required => {
                let claimed = &self.claimed;
                let sighting = wait_for_excluding(
                    &mut *self.page,
                    d,
                    self.settings.element_wait(),
                    self.settings.poll_interval(),
                    self.pacer.cancel_token(),
                    &|snapshot: &PageSnapshot| claimed_ids(snapshot, claimed),
                )
                .await?;
                let Some(sighting) = sighting else {
                    self.block(d.name, "not found");
                    return Ok(());
                };
                self.current = sighting.snapshot;
                self.taken = claimed_ids(&self.current, &self.claimed);
                match self.current.element(sighting.element) {
                    Some(el) => (el.clone(), sighting.strategy),
                    None => {
                        self.block(d.name, "vanished from snapshot");
                        return Ok(());
                    }
                }
            }
            None => {
                debug!(target: "easyapply.fill", field = d.name, "optional field absent");
                self.result.skipped += 1;
                return Ok(());
            }
        };
        self.taken.insert(element.id);
        self.claimed.insert(element.key());

        if field.required {
            self.result.mandatory.push(MandatoryField {
                field: d.name.to_string(),
                keys: vec![element.key()],
            });
        }
        if !element.is_empty() {
            debug!(target: "easyapply.fill", field = d.name, "already holds a value");
            self.result.skipped += 1;
            return Ok(());
        }

        let Some(value) = field_value(d, &element, strategy, self.profile) else {
            debug!(target: "easyapply.fill", field = d.name, "no profile value");
            self.result.skipped += 1;
            return Ok(());
        };

        self.pacer.pace(&mut *self.page).await?;
        let outcome = match d.kind {
            FieldKind::FileUpload => {
                self.page
                    .attach_file(element.id, &PathBuf::from(&value))
                    .await
            }
            _ => self.page.set_value(element.id, &value).await,
        };
        match outcome {
            Ok(()) => {
                info!(
                    target: "easyapply.fill",
                    field = d.name,
                    strategy = ?strategy,
                    key = %element.key(),
                    outcome = "filled",
                    "field filled"
                );
                self.result.filled += 1;
            }
            Err(e) => {
                warn!(
                    target: "easyapply.fill",
                    field = d.name,
                    strategy = ?strategy,
                    outcome = "error",
                    error = %e,
                    "field fill failed"
                );
                self.result.skipped += 1;
            }
        }
        Ok(())
    }

    async fn answer_questions(&mut self) -> Result<(), ApplyError> {
        let blocks = self.current.questions.clone();
        for block in blocks {
            let prompt = block.prompt.trim();
            let controls: Vec<ElementSnapshot> = block
                .controls
                .iter()
                .filter_map(|id| self.current.element(*id))
                .filter(|el| el.enabled && el.kind.holds_answer())
                .cloned()
                .collect();
            if prompt.is_empty() || controls.is_empty() {
                continue;
            }
            if block.required {
                self.result.mandatory.push(MandatoryField {
                    field: short_prompt(prompt),
                    keys: controls.iter().map(ElementSnapshot::key).collect(),
                });
            }
            if controls.iter().any(|c| !c.is_empty()) {
                self.result.skipped += 1;
                continue;
            }

            let qa = answer_question(prompt, self.profile);
            info!(
                target: "easyapply.fill",
                question = %qa.question,
                archetype = ?qa.archetype,
                confidence = ?qa.confidence,
                "question answered"
            );

            self.pacer.pace(&mut *self.page).await?;
            match apply_answer(&mut *self.page, &controls, &qa.value, self.profile).await {
                Ok(true) => {
                    self.result.filled += 1;
                    self.result.answers.push(qa);
                }
                Ok(false) => {
                    debug!(target: "easyapply.fill", question = %qa.question, "no control accepts the answer");
                    self.result.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        target: "easyapply.fill",
                        question = %qa.question,
                        error = %e,
                        "answer could not be entered"
                    );
                    self.result.skipped += 1;
                }
            }
        }
        Ok(())
    }
}

/// Profile value for a descriptor-driven field.
fn field_value(
    d: &FieldDescriptor,
    element: &ElementSnapshot,
    strategy: StrategyKind,
    profile: &Profile,
) -> Option<String> {
    let c = &profile.contact;
    let docs = &profile.documents;
    let value = match d.name {
        "resume" => {
            let looks_like_cover = strategy == StrategyKind::Position
                && [element.caption(), element.preceding_text.clone().unwrap_or_default()]
                    .iter()
                    .any(|t| t.to_lowercase().contains("cover"));
            match (&docs.cover_letter, looks_like_cover) {
                (Some(cover), true) => cover.display().to_string(),
                _ => docs.resume.display().to_string(),
            }
        }
        "cover_letter" => docs.cover_letter.as_ref()?.display().to_string(),
        "phone" => c.phone.clone(),
        "email" => c.email.clone(),
        "address" => c.address.clone(),
        "city" => c.city.clone(),
        "state" => c.state.clone(),
        "postal_code" => c.postal_code.clone(),
        _ => return None,
    };
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Enter `answer` into whichever kind of control the question offers.
/// `Ok(false)` means nothing suitable was there.
async fn apply_answer(
    page: &mut dyn Page,
    controls: &[ElementSnapshot],
    answer: &str,
    profile: &Profile,
) -> anyhow::Result<bool> {
    let Some(first) = controls.iter().find(|c| c.visible).or(controls.first()) else {
        return Ok(false);
    };
    match first.kind {
        ControlKind::TextInput | ControlKind::TextArea => {
            let value = if first.input_type.as_deref() == Some("number") {
                numeric_answer(answer, profile.experience.baseline)
            } else {
                answer.to_string()
            };
            page.set_value(first.id, &value).await?;
            Ok(true)
        }
        ControlKind::Select => {
            let Some(i) = pick_option(&first.options, answer) else {
                return Ok(false);
            };
            page.select_option(first.id, &first.options[i]).await?;
            Ok(true)
        }
        ControlKind::Radio => {
            let radios: Vec<&ElementSnapshot> =
                controls.iter().filter(|c| c.kind == ControlKind::Radio).collect();
            let texts: Vec<String> = radios.iter().map(|r| choice_text(r)).collect();
            let Some(i) = pick_option(&texts, answer) else {
                return Ok(false);
            };
            page.choose(radios[i].id).await?;
            Ok(true)
        }
        ControlKind::Checkbox => {
            let boxes: Vec<&ElementSnapshot> =
                controls.iter().filter(|c| c.kind == ControlKind::Checkbox).collect();
            if boxes.len() == 1 {
                if !is_affirmative(answer) {
                    return Ok(false);
                }
                page.choose(boxes[0].id).await?;
                return Ok(true);
            }
            let texts: Vec<String> = boxes.iter().map(|b| choice_text(b)).collect();
            let Some(i) = pick_option(&texts, answer) else {
                return Ok(false);
            };
            page.choose(boxes[i].id).await?;
            Ok(true)
        }
        ControlKind::FileInput => Ok(false),
        ControlKind::Button | ControlKind::Link | ControlKind::Other => Ok(false),
    }
}

/// Text shown for a radio or checkbox choice.
fn choice_text(el: &ElementSnapshot) -> String {
    el.label
        .clone()
        .filter(|l| !l.trim().is_empty())
        .or_else(|| (!el.text.trim().is_empty()).then(|| el.text.clone()))
        .or_else(|| el.attr("value").map(str::to_string))
        .unwrap_or_default()
}

fn is_affirmative(answer: &str) -> bool {
    let a = normalize(answer);
    a == "yes" || a.starts_with("yes ") || a == "true" || a == "i agree"
}

fn is_placeholder(option: &str) -> bool {
    let o = normalize(option);
    o.is_empty()
        || ["select", "choose", "please"].iter().any(|p| o.starts_with(p))
        || option.trim_start().starts_with("--")
}

/// Digits of `answer`, or the experience baseline when it has none.
fn numeric_answer(answer: &str, baseline: u32) -> String {
    let digits: String = answer
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();
    if digits.is_empty() {
        baseline.to_string()
    } else {
        digits
    }
}

fn numbers_in(text: &str) -> Vec<f64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter_map(|s| s.trim_matches('.').parse::<f64>().ok())
        .collect()
}

fn range_contains(option: &str, n: f64) -> bool {
    let o = normalize(option);
    let nums = numbers_in(&o);
    match nums.as_slice() {
        [lo, hi, ..] => *lo <= n && n <= *hi,
        [x] if option.contains('+') || ["more", "over", "above", "at least"].iter().any(|w| o.contains(w)) => {
            n >= *x
        }
        [x] if ["less", "under", "below", "fewer"].iter().any(|w| o.contains(w)) => n < *x,
        [x] => (n - *x).abs() < f64::EPSILON,
        [] => false,
    }
}

/// Index of the option that best fits `answer`: exact text, then yes/no
/// prefix, then containment, then numeric range, then a "Yes" option,
/// then the first real option.
pub fn pick_option(options: &[String], answer: &str) -> Option<usize> {
    let wanted = normalize(answer);
    let candidates: Vec<(usize, String)> = options
        .iter()
        .enumerate()
        .filter(|(_, o)| !is_placeholder(o))
        .map(|(i, o)| (i, normalize(o)))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let by = |pred: &dyn Fn(&str) -> bool| candidates.iter().find(|(_, o)| pred(o)).map(|(i, _)| *i);

    if !wanted.is_empty() {
        if let Some(i) = by(&|o| o == wanted) {
            return Some(i);
        }
        if wanted == "yes" || wanted == "no" {
            let prefix = format!("{wanted} ");
            if let Some(i) = by(&|o| o.starts_with(&prefix)) {
                return Some(i);
            }
        } else if let Some(i) = by(&|o| o.contains(wanted.as_str()) || wanted.contains(o)) {
            return Some(i);
        }
    }
    if let Ok(n) = wanted.parse::<f64>() {
        if let Some(i) = candidates
            .iter()
            .find(|(i, _)| range_contains(&options[*i], n))
            .map(|(i, _)| *i)
        {
            return Some(i);
        }
    }
    by(&|o| o == "yes").or(Some(candidates[0].0))
}

/// Fields from `mandatory` that read back empty on a fresh snapshot.
pub async fn verify(
    page: &mut dyn Page,
    mandatory: &[MandatoryField],
) -> Result<Vec<String>, ApplyError> {
    if mandatory.is_empty() {
        return Ok(Vec::new());
    }
    let snapshot = page.snapshot().await?;
    let unfilled: Vec<String> = mandatory
        .iter()
        .filter(|m| {
            !m.keys
                .iter()
                .filter_map(|k| snapshot.find_by_key(k))
                .any(|el| !el.is_empty())
        })
        .map(|m| m.field.clone())
        .collect();
    if !unfilled.is_empty() {
        debug!(target: "easyapply.fill", unfilled = ?unfilled, "mandatory fields empty after fill");
    }
    Ok(unfilled)
}

/// Click the highest-priority advance control on the current page.
///
/// The click draws one slot from `rate`, booked only once a control has
/// been found.
pub async fn advance(
    page: &mut dyn Page,
    pacer: &mut BehaviorSimulator,
    rate: &mut RateLimiter,
) -> Result<AdvanceAction, ApplyError> {
    let snapshot = page.snapshot().await?;
    let Some((descriptor, element)) = ADVANCE_ORDER
        .iter()
        .find_map(|d| locate(d, &snapshot).map(|hit| (*d, hit.element.clone())))
    else {
        return Err(ApplyError::ElementNotFound {
            field: "advance".to_string(),
        });
    };

    rate.acquire(pacer).await?;
    pacer.pace(page).await?;
    page.click(element.id).await?;
    let action = AdvanceAction {
        field: descriptor.name,
        key: element.key(),
        terminal: descriptor.name == SUBMIT.name,
        before: snapshot.signature(),
    };
    info!(
        target: "easyapply.fill",
        field = action.field,
        key = %action.key,
        terminal = action.terminal,
        "advance clicked"
    );
    Ok(action)
}

/// Log-friendly name for a question block.
fn short_prompt(prompt: &str) -> String {
    const MAX: usize = 60;
    if prompt.chars().count() <= MAX {
        prompt.to_string()
    } else {
        let cut: String = prompt.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easyapply_drivers::fixture::{FixtureAction, FixturePage, FixtureScreen};
    use tokio_util::sync::CancellationToken;

    fn profile() -> Profile {
        let mut p = Profile::default();
        p.contact.phone = "555-0100".into();
        p.contact.city = "Springfield".into();
        p.documents.resume = PathBuf::from("/tmp/resume.pdf");
        p.experience.baseline = 2;
        p.experience.technologies.insert("Python".into(), 5);
        p
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            element_wait_ms: 200,
            poll_interval_ms: 50,
            ..EngineSettings::default()
        }
    }

    fn pacer() -> BehaviorSimulator {
        BehaviorSimulator::disabled(CancellationToken::new())
    }

    fn limiter() -> RateLimiter {
        RateLimiter::from_settings(&EngineSettings::default())
    }

    fn opts(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn option_matching_order() {
        let yes_no = opts(&["Select an option", "Yes", "No"]);
        assert_eq!(pick_option(&yes_no, "No"), Some(2));
        assert_eq!(pick_option(&yes_no, "Maybe"), Some(1));

        let ranges = opts(&["Less than 1 year", "1-2 years", "3-5 years", "6+ years"]);
        assert_eq!(pick_option(&ranges, "4"), Some(2));
        assert_eq!(pick_option(&ranges, "10"), Some(3));
        assert_eq!(pick_option(&ranges, "0"), Some(0));

        let degrees = opts(&["High school", "Bachelor's degree", "Master's degree"]);
        assert_eq!(pick_option(&degrees, "Bachelor"), Some(1));

        let prefixed = opts(&["Yes, I can", "No, I cannot"]);
        assert_eq!(pick_option(&prefixed, "No"), Some(1));

        assert_eq!(pick_option(&opts(&["--"]), "Yes"), None);
    }

    #[test]
    fn number_inputs_get_digits() {
        assert_eq!(numeric_answer("5", 1), "5");
        assert_eq!(numeric_answer("about 7 years", 1), "7");
        assert_eq!(numeric_answer("Yes", 3), "3");
    }

    #[tokio::test]
    async fn contact_step_fills_only_empty_fields() {
        let snap = PageSnapshot::new("u")
            .with_element(ElementSnapshot::new(ControlKind::TextInput).with_attr("name", "phone"))
            .with_element(
                ElementSnapshot::new(ControlKind::TextInput)
                    .with_attr("name", "city")
                    .with_value("Shelbyville"),
            );
        let mut page = FixturePage::single(snap);
        let res = fill_step(
            PageClassification::ContactInfo,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();

        assert_eq!(res.filled, 1);
        assert!(!res.is_blocked());
        assert_eq!(
            page.actions(),
            &[FixtureAction::SetValue {
                key: "name:phone".into(),
                value: "555-0100".into()
            }]
        );
        assert_eq!(page.live().find_by_key("name:city").unwrap().value, "Shelbyville");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_required_upload_is_a_blocker() {
        let mut page = FixturePage::single(PageSnapshot::new("u").with_heading("Upload your resume"));
        let res = fill_step(
            PageClassification::ResumeUpload,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();
        assert_eq!(res.blockers.len(), 1);
        assert_eq!(res.blockers[0].field, "resume");
        assert!(page.snapshot_count() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_upload_skips_question_owned_file_input() {
        let portfolio = || {
            vec![ElementSnapshot::new(ControlKind::FileInput).with_attr("name", "portfolio")]
        };
        let loading = PageSnapshot::new("u")
            .with_heading("Upload your resume")
            .with_question("Attach a portfolio sample", portfolio(), false);
        let ready = PageSnapshot::new("u")
            .with_heading("Upload your resume")
            .with_question("Attach a portfolio sample", portfolio(), false)
            .with_element(ElementSnapshot::new(ControlKind::FileInput).with_attr("name", "file-1"));
        let mut page = FixturePage::new(vec![
            FixtureScreen::new(loading).settles_into(1, 2),
            FixtureScreen::new(ready),
        ]);

        let res = fill_step(
            PageClassification::ResumeUpload,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();

        assert!(res.blockers.is_empty());
        assert_eq!(page.current_screen(), 1);
        assert_eq!(res.mandatory[0].keys, vec!["name:file-1".to_string()]);
        assert!(page.actions().contains(&FixtureAction::AttachFile {
            key: "name:file-1".into(),
            path: "/tmp/resume.pdf".into(),
        }));
        assert!(!page
            .actions()
            .iter()
            .any(|a| matches!(a, FixtureAction::AttachFile { key, .. } if key == "name:portfolio")));
    }

    #[tokio::test]
    async fn resume_attached_and_registered_as_mandatory() {
        let snap = PageSnapshot::new("u").with_element(
            ElementSnapshot::new(ControlKind::FileInput)
                .with_attr("name", "resumeFile")
                .hidden(),
        );
        let mut page = FixturePage::single(snap);
        let res = fill_step(
            PageClassification::ResumeUpload,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();
        assert_eq!(res.filled, 1);
        assert_eq!(res.mandatory[0].keys, vec!["name:resumeFile".to_string()]);
        assert!(verify(&mut page, &res.mandatory).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn questions_use_the_answer_generator() {
        let snap = PageSnapshot::new("u")
            .with_question(
                "How many years of Python experience do you have?",
                vec![ElementSnapshot::new(ControlKind::TextInput)
                    .with_attr("name", "q1")
                    .with_input_type("number")],
                true,
            )
            .with_question(
                "Will you require visa sponsorship?",
                vec![
                    ElementSnapshot::new(ControlKind::Radio)
                        .with_attr("name", "q2")
                        .with_attr("value", "1")
                        .with_label("Yes"),
                    ElementSnapshot::new(ControlKind::Radio)
                        .with_attr("name", "q2")
                        .with_attr("value", "0")
                        .with_label("No"),
                ],
                true,
            );
        let mut page = FixturePage::single(snap);
        let res = fill_step(
            PageClassification::ScreeningQuestions,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();

        assert_eq!(res.filled, 2);
        assert_eq!(res.answers.len(), 2);
        assert_eq!(page.live().find_by_key("name:q1").unwrap().value, "5");
        assert!(page.live().find_by_key("name:q2=0").unwrap().checked);
        assert!(verify(&mut page, &res.mandatory).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verify_reports_rejected_input() {
        let snap = PageSnapshot::new("u").with_question(
            "Which city do you live in?",
            vec![ElementSnapshot::new(ControlKind::TextInput).with_attr("name", "q_city")],
            true,
        );
        let mut page = FixturePage::single(snap).rejecting_input("name:q_city");
        let res = fill_step(
            PageClassification::ScreeningQuestions,
            &mut page,
            &profile(),
            &mut pacer(),
            &settings(),
        )
        .await
        .unwrap();
        assert_eq!(res.filled, 1);
        let unfilled = verify(&mut page, &res.mandatory).await.unwrap();
        assert_eq!(unfilled, vec!["Which city do you live in?".to_string()]);
    }

    #[tokio::test]
    async fn advance_prefers_submit_over_continue() {
        let snap = PageSnapshot::new("u")
            .with_element(
                ElementSnapshot::new(ControlKind::Button)
                    .with_attr("id", "next")
                    .with_text("Continue"),
            )
            .with_element(
                ElementSnapshot::new(ControlKind::Button)
                    .with_attr("id", "go")
                    .with_text("Submit your application"),
            );
        let mut page = FixturePage::single(snap);
        let action = advance(&mut page, &mut pacer(), &mut limiter()).await.unwrap();
        assert!(action.terminal);
        assert_eq!(page.clicks(), vec!["id:go"]);
    }

    #[tokio::test]
    async fn advance_without_controls_is_element_not_found() {
        let mut page = FixturePage::single(PageSnapshot::new("u"));
        let mut rate = limiter();
        let err = advance(&mut page, &mut pacer(), &mut rate).await.unwrap_err();
        assert!(matches!(err, ApplyError::ElementNotFound { .. }));
        assert_eq!(rate.available(tokio::time::Instant::now()), 30);
    }

    #[tokio::test]
    async fn advance_click_books_one_rate_slot() {
        let snap = PageSnapshot::new("u").with_element(
            ElementSnapshot::new(ControlKind::Button)
                .with_attr("id", "next")
                .with_text("Continue"),
        );
        let mut page = FixturePage::single(snap);
        let mut rate = limiter();
        advance(&mut page, &mut pacer(), &mut rate).await.unwrap();
        assert_eq!(rate.available(tokio::time::Instant::now()), 29);
    }
}
