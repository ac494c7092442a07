#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;

use easyapply_common::observability::{LogConfig, LogFormat};
use easyapply_common::{EngineSettings, Profile};
use easyapply_drivers::fixture::{FixturePage, FixtureScreen};
use easyapply_drivers::{ControlKind, ElementSnapshot, PageSnapshot};
use easyapply_engine::{BehaviorSimulator, WorkflowEngine};
use tokio_util::sync::CancellationToken;

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "easyapply-tests",
            log_dir: Some(std::env::temp_dir().join("easyapply-tests")),
            emit_stderr: true,
            format: if std::env::var("EASYAPPLY_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };
        easyapply_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        element_wait_ms: 200,
        poll_interval_ms: 50,
        seed: Some(7),
        ..EngineSettings::default()
    }
}

pub fn engine(settings: EngineSettings) -> (WorkflowEngine, CancellationToken) {
    init_test_tracing();
    let cancel = CancellationToken::new();
    let engine = WorkflowEngine::new(settings, cancel.clone())
        .with_behavior(BehaviorSimulator::disabled(cancel.clone()));
    (engine, cancel)
}

pub fn profile() -> Profile {
    let mut p = Profile::default();
    p.contact.phone = "555-0100".into();
    p.contact.city = "Springfield".into();
    p.contact.address = "1 Main St".into();
    p.contact.postal_code = "12345".into();
    p.contact.state = "IL".into();
    p.documents.resume = PathBuf::from("/tmp/resume.pdf");
    p.experience.baseline = 1;
    p.experience.technologies.insert("Python".into(), 5);
    p
}

pub fn continue_button() -> ElementSnapshot {
    ElementSnapshot::new(ControlKind::Button)
        .with_attr("id", "continue")
        .with_text("Continue")
}

pub fn submit_button() -> ElementSnapshot {
    ElementSnapshot::new(ControlKind::Button)
        .with_attr("id", "submit")
        .with_text("Submit your application")
}

pub fn resume_page() -> PageSnapshot {
    PageSnapshot::new("https://apply.example.test/resume")
        .with_heading("Add a resume for the employer")
        .with_element(
            ElementSnapshot::new(ControlKind::FileInput)
                .with_attr("name", "resumeFile")
                .hidden(),
        )
        .with_element(continue_button())
}

pub fn contact_page(n: usize) -> PageSnapshot {
    PageSnapshot::new(format!("https://apply.example.test/contact/{n}"))
        .with_heading("Add your contact information")
        .with_element(ElementSnapshot::new(ControlKind::TextInput).with_attr("name", "phone"))
        .with_element(ElementSnapshot::new(ControlKind::TextInput).with_attr("name", "city"))
        .with_element(continue_button())
}

pub fn questions_page() -> PageSnapshot {
    PageSnapshot::new("https://apply.example.test/questions")
        .with_heading("Answer these questions from the employer")
        .with_question(
            "How many years of Python experience do you have?",
            vec![ElementSnapshot::new(ControlKind::TextInput)
                .with_attr("name", "q_years")
                .with_input_type("number")],
            true,
        )
        .with_question(
            "Will you now or in the future require visa sponsorship?",
            vec![
                ElementSnapshot::new(ControlKind::Radio)
                    .with_attr("name", "q_visa")
                    .with_attr("value", "1")
                    .with_label("Yes"),
                ElementSnapshot::new(ControlKind::Radio)
                    .with_attr("name", "q_visa")
                    .with_attr("value", "0")
                    .with_label("No"),
            ],
            true,
        )
        .with_element(continue_button())
}

pub fn review_page() -> PageSnapshot {
    PageSnapshot::new("https://apply.example.test/review")
        .with_heading("Please review your application")
        .with_body_text("Phone 555-0100 City Springfield")
        .with_element(submit_button())
}

pub fn success_page() -> PageSnapshot {
    PageSnapshot::new("https://apply.example.test/done")
        .with_heading("Application submitted")
        .with_body_text("Application submitted. Thank you for applying!")
}

/// resume -> contact -> questions -> review -> success.
pub fn full_flow() -> FixturePage {
    FixturePage::new(vec![
        FixtureScreen::new(resume_page()).on_click("id:continue", 1),
        FixtureScreen::new(contact_page(0)).on_click("id:continue", 2),
        FixtureScreen::new(questions_page()).on_click("id:continue", 3),
        FixtureScreen::new(review_page()).on_click("id:submit", 4),
        FixtureScreen::new(success_page()),
    ])
}
