//! Sanity checks applied to a loaded configuration before a run starts.
use easyapply_common::{ApplyError, EngineSettings, Profile};
use std::path::Path;
use tracing::warn;

/// Characters stripped from free-text answers before they reach a form.
const UNSAFE_CHARS: [char; 7] = ['<', '>', '"', '&', ';', '|', '`'];
const RESUME_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];
const MAX_PLAUSIBLE_YEARS: u32 = 50;

/// Reject engine bounds the state machine cannot honour.
pub fn validate_engine(engine: &EngineSettings) -> Result<(), ApplyError> {
    let mut problems = Vec::new();
    if engine.max_pages_per_job == 0 {
        problems.push("max_pages_per_job must be at least 1");
    }
    if engine.actions_per_hour == 0 {
        problems.push("actions_per_hour must be at least 1");
    }
    if engine.rate_window_secs == 0 {
        problems.push("rate_window_secs must be at least 1");
    }
    if engine.job_failure_threshold == 0 || engine.run_failure_threshold == 0 {
        problems.push("breaker thresholds must be at least 1");
    }
    if !(0.0..=1.0).contains(&engine.incidental_action_probability) {
        problems.push("incidental_action_probability must be within 0..=1");
    }
    if !engine.base_delay_secs.is_finite() || engine.base_delay_secs < 0.0 {
        problems.push("base_delay_secs must be a non-negative number");
    }
    if !engine.delay_sigma.is_finite() || engine.delay_sigma < 0.0 {
        problems.push("delay_sigma must be a non-negative number");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApplyError::Config(problems.join("; ")))
    }
}

/// Check required fields and documents, then sanitise free-text answers.
pub fn validate_profile(profile: &mut Profile) -> Result<(), ApplyError> {
    let contact = &profile.contact;
    let missing: Vec<&str> = [
        ("phone", &contact.phone),
        ("address", &contact.address),
        ("city", &contact.city),
        ("postal_code", &contact.postal_code),
        ("state", &contact.state),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        return Err(ApplyError::Config(format!(
            "missing required profile fields: {}",
            missing.join(", ")
        )));
    }

    check_document("resume", &profile.documents.resume)?;
    if let Some(cover) = &profile.documents.cover_letter {
        check_document("cover_letter", cover)?;
    }

    for (tech, years) in &profile.experience.technologies {
        if *years > MAX_PLAUSIBLE_YEARS {
            warn!(target: "easyapply.config", technology = %tech, years, "experience value seems unrealistic");
        }
    }
    if profile.experience.baseline > MAX_PLAUSIBLE_YEARS {
        warn!(target: "easyapply.config", years = profile.experience.baseline, "baseline experience seems unrealistic");
    }

    sanitize_profile(profile);
    Ok(())
}

fn check_document(name: &str, path: &Path) -> Result<(), ApplyError> {
    if !path.exists() {
        return Err(ApplyError::Config(format!(
            "{name} file not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ApplyError::Config(format!(
            "{name} path is not a file: {}",
            path.display()
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !RESUME_EXTENSIONS.contains(&ext.as_str()) {
        warn!(target: "easyapply.config", document = name, extension = %ext, "document extension may not be accepted");
    }
    Ok(())
}

fn sanitize_profile(profile: &mut Profile) {
    let Profile {
        contact,
        links,
        university,
        preferences,
        self_identification,
        default_answer,
        ..
    } = profile;

    let fields: [(&str, &mut String); 19] = [
        ("contact.phone", &mut contact.phone),
        ("contact.email", &mut contact.email),
        ("contact.address", &mut contact.address),
        ("contact.city", &mut contact.city),
        ("contact.postal_code", &mut contact.postal_code),
        ("contact.state", &mut contact.state),
        ("links.github", &mut links.github),
        ("links.linkedin", &mut links.linkedin),
        ("university", university),
        ("preferences.preferred_shift", &mut preferences.preferred_shift),
        ("preferences.education_level", &mut preferences.education_level),
        ("preferences.available_hours", &mut preferences.available_hours),
        (
            "preferences.interview_availability",
            &mut preferences.interview_availability,
        ),
        ("preferences.why_this_role", &mut preferences.why_this_role),
        ("self_identification.gender", &mut self_identification.gender),
        (
            "self_identification.disability",
            &mut self_identification.disability,
        ),
        ("self_identification.veteran", &mut self_identification.veteran),
        (
            "self_identification.ethnicity",
            &mut self_identification.ethnicity,
        ),
        ("default_answer", default_answer),
    ];

    for (name, value) in fields {
        strip_unsafe(name, value);
    }
    if let Some(salary) = preferences.salary_expectation.as_mut() {
        strip_unsafe("preferences.salary_expectation", salary);
    }
}

fn strip_unsafe(name: &str, value: &mut String) {
    if value.contains(UNSAFE_CHARS) {
        warn!(target: "easyapply.config", field = name, "removed unsafe characters");
        value.retain(|c| !UNSAFE_CHARS.contains(&c));
    }
}
