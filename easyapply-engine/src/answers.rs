//! Answer Generator: map a screening question onto a profile-backed answer.
//!
//! Matching is keyword based over normalised text against an ordered list of
//! archetypes. Answers depend only on the question text and the profile.
use easyapply_common::{yes_no, Profile};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// How an answer was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// The profile holds a value for exactly what was asked.
    Exact,
    /// The archetype was recognised but the value is a general setting.
    KeywordMatch,
    /// Nothing recognised; the configured default was used.
    DefaultFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    YearsOfExperience,
    Sponsorship,
    WorkAuthorization,
    Commute,
    CriminalRecord,
    BackgroundCheck,
    Certification,
    Shift,
    Disability,
    Veteran,
    Gender,
    Ethnicity,
    Education,
    Salary,
    WhyThisRole,
    InterviewAvailability,
    AvailableHours,
    University,
    Github,
    Linkedin,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    State,
}

/// Ordered keyword table; earlier rows win.
const ARCHETYPES: &[(Archetype, &[&str])] = &[
    (Archetype::YearsOfExperience, &["years of experience", "years experience", "how many years", "years of professional", "years have you"]),
    (Archetype::Sponsorship, &["sponsorship", "sponsor", "visa"]),
    (Archetype::WorkAuthorization, &["authorized to work", "authorised to work", "authorization", "authorisation", "legally", "eligible to work", "right to work"]),
    (Archetype::Commute, &["commute", "relocate", "relocation", "reliably"]),
    (Archetype::CriminalRecord, &["criminal", "convicted", "felony", "conviction"]),
    (Archetype::BackgroundCheck, &["background check", "dbs", "drug test", "drug screen"]),
    (Archetype::Certification, &["certification", "certified", "license", "licence"]),
    (Archetype::Shift, &["shift"]),
    (Archetype::Disability, &["disability", "disabled"]),
    (Archetype::Veteran, &["veteran", "military"]),
    (Archetype::Gender, &["gender", "sex"]),
    (Archetype::Ethnicity, &["race", "ethnicity", "ethnic", "hispanic", "latino"]),
    (Archetype::Education, &["education", "degree", "highest level"]),
    (Archetype::Salary, &["salary", "compensation", "desired pay", "pay expectation", "expected pay"]),
    (Archetype::WhyThisRole, &["why do you want", "why are you interested", "why this role", "why would you", "tell us why", "what interests you"]),
    (Archetype::InterviewAvailability, &["interview"]),
    (Archetype::AvailableHours, &["hours", "full time", "part time", "available to work", "weekends"]),
    (Archetype::University, &["university", "college", "school"]),
    (Archetype::Github, &["github"]),
    (Archetype::Linkedin, &["linkedin"]),
    (Archetype::Email, &["email"]),
    (Archetype::Phone, &["phone", "mobile number"]),
    (Archetype::Address, &["street address", "address"]),
    (Archetype::City, &["city", "town"]),
    (Archetype::PostalCode, &["zip", "postal", "postcode"]),
    (Archetype::State, &["which state", "what state", "state of residence", "state province"]),
];

const GENERIC_WHY: &str =
    "I am excited about this role and believe my experience makes me a strong fit for the team.";
const NEGOTIABLE: &str = "Negotiable";

/// A question paired with the answer given, kept for the job report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub archetype: Option<Archetype>,
    pub value: String,
    pub confidence: Confidence,
}

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9+#]+").expect("static regex"))
}

/// Lowercase, collapse punctuation and whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    non_word()
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Whole-word phrase search over normalised text.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let padded = format!(" {normalized} ");
    padded.contains(&format!(" {phrase} "))
}

/// Archetype of a question, if any.
pub fn archetype_of(question: &str) -> Option<Archetype> {
    let q = normalize(question);
    ARCHETYPES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(&q, k)))
        .map(|(a, _)| *a)
}

/// `(value, confidence)` for a question.
pub fn answer(question: &str, profile: &Profile) -> (String, Confidence) {
    let qa = answer_question(question, profile);
    (qa.value, qa.confidence)
}

pub fn answer_question(question: &str, profile: &Profile) -> QuestionAnswer {
    let normalized = normalize(question);
    let archetype = archetype_of(question);
    let resolved = archetype.and_then(|a| resolve(a, &normalized, profile));

    let (value, confidence) = match resolved {
        Some(found) => found,
        None => (profile.default_answer.clone(), Confidence::DefaultFallback),
    };
    QuestionAnswer {
        question: normalized,
        archetype: archetype.filter(|_| confidence != Confidence::DefaultFallback),
        value,
        confidence,
    }
}

fn exact(value: &str) -> Option<(String, Confidence)> {
    let value = value.trim();
    (!value.is_empty()).then(|| (value.to_string(), Confidence::Exact))
}

fn resolve(archetype: Archetype, q: &str, profile: &Profile) -> Option<(String, Confidence)> {
    let e = &profile.eligibility;
    let p = &profile.preferences;
    let s = &profile.self_identification;
    let c = &profile.contact;
    match archetype {
        Archetype::YearsOfExperience => Some(years_of_experience(q, profile)),
        Archetype::Sponsorship => exact(yes_no(e.sponsorship_needed)),
        Archetype::WorkAuthorization => exact(yes_no(e.work_authorized)),
        Archetype::Commute => exact(yes_no(e.commute_willing)),
        Archetype::CriminalRecord => exact(yes_no(e.criminal_record)),
        Archetype::BackgroundCheck => exact(yes_no(e.background_check_consent)),
        Archetype::Certification => exact(yes_no(e.valid_certification)),
        Archetype::Shift => exact(&p.preferred_shift),
        Archetype::Disability => exact(&s.disability),
        Archetype::Veteran => exact(&s.veteran),
        Archetype::Gender => exact(&s.gender),
        Archetype::Ethnicity => exact(&s.ethnicity),
        Archetype::Education => exact(&p.education_level),
        Archetype::Salary => p
            .salary_expectation
            .as_deref()
            .and_then(exact)
            .or_else(|| Some((NEGOTIABLE.to_string(), Confidence::KeywordMatch))),
        Archetype::WhyThisRole => {
            exact(&p.why_this_role).or_else(|| Some((GENERIC_WHY.to_string(), Confidence::KeywordMatch)))
        }
        Archetype::InterviewAvailability => exact(&p.interview_availability),
        Archetype::AvailableHours => exact(&p.available_hours),
        Archetype::University => exact(&profile.university),
        Archetype::Github => exact(&profile.links.github),
        Archetype::Linkedin => exact(&profile.links.linkedin),
        Archetype::Email => exact(&c.email),
        Archetype::Phone => exact(&c.phone),
        Archetype::Address => exact(&c.address),
        Archetype::City => exact(&c.city),
        Archetype::PostalCode => exact(&c.postal_code),
        Archetype::State => exact(&c.state),
    }
}

/// Per-technology years if the question names a listed technology, else the
/// baseline. Longer technology names are tried first so `java` never
/// shadows `javascript`.
fn years_of_experience(q: &str, profile: &Profile) -> (String, Confidence) {
    let mut techs: Vec<(String, u32)> = profile
        .experience
        .technologies
        .iter()
        .map(|(name, years)| (normalize(name), *years))
        .filter(|(name, _)| !name.is_empty())
        .collect();
    techs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    match techs.iter().find(|(name, _)| contains_phrase(q, name)) {
        Some((_, years)) => (years.to_string(), Confidence::Exact),
        None => (
            profile.experience.baseline.to_string(),
            Confidence::KeywordMatch,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        let mut p = Profile::default();
        p.experience.baseline = 1;
        p.experience.technologies.insert("Python".into(), 5);
        p.experience.technologies.insert("Java".into(), 2);
        p.experience.technologies.insert("JavaScript".into(), 4);
        p.preferences.preferred_shift = "Day shift".into();
        p.default_answer = "Yes".into();
        p
    }

    #[test]
    fn python_years_are_exact() {
        assert_eq!(
            answer("Years of experience with Python?", &profile()),
            ("5".to_string(), Confidence::Exact)
        );
    }

    #[test]
    fn longest_technology_name_wins() {
        let (v, _) = answer("How many years of JavaScript experience do you have?", &profile());
        assert_eq!(v, "4");
        let (v, _) = answer("How many years of Java experience do you have?", &profile());
        assert_eq!(v, "2");
    }

    #[test]
    fn unlisted_technology_uses_baseline() {
        assert_eq!(
            answer("How many years of experience do you have with Kubernetes?", &profile()),
            ("1".to_string(), Confidence::KeywordMatch)
        );
    }

    #[test]
    fn sponsorship_is_checked_before_authorization() {
        let q = "Will you now or in the future require sponsorship for employment visa status (authorization)?";
        assert_eq!(archetype_of(q), Some(Archetype::Sponsorship));
        assert_eq!(answer(q, &profile()).0, "No");
        assert_eq!(
            archetype_of("Are you legally authorized to work in the United States?"),
            Some(Archetype::WorkAuthorization)
        );
    }

    #[test]
    fn unknown_question_falls_back_to_default() {
        let qa = answer_question("What is your favourite colour?", &profile());
        assert_eq!(qa.value, "Yes");
        assert_eq!(qa.confidence, Confidence::DefaultFallback);
        assert_eq!(qa.archetype, None);
    }

    #[test]
    fn empty_profile_value_falls_back() {
        let qa = answer_question("GitHub profile URL", &profile());
        assert_eq!(qa.confidence, Confidence::DefaultFallback);
    }

    #[test]
    fn free_text_defaults_are_keyword_matches() {
        let (v, c) = answer("Why do you want to work here?", &profile());
        assert_eq!(c, Confidence::KeywordMatch);
        assert!(v.contains("excited"));
        assert_eq!(answer("Desired salary?", &profile()), (NEGOTIABLE.into(), Confidence::KeywordMatch));
    }

    #[test]
    fn normalisation_collapses_punctuation() {
        assert_eq!(normalize("  Do you have C++ / C# experience?? "), "do you have c++ c# experience");
    }

    #[test]
    fn answers_are_deterministic() {
        let p = profile();
        let q = "Which shift are you available for?";
        assert_eq!(answer(q, &p), answer(q, &p));
        assert_eq!(answer(q, &p).0, "Day shift");
    }
}
