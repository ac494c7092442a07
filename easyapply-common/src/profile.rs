//! The applicant's answer bank.
//!
//! A [`Profile`] is loaded once per run and handed to the engine by shared
//! reference; nothing in the engine mutates it.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const DECLINE: &str = "Decline to answer";

/// Static answers used to fill application forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub contact: Contact,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub documents: Documents,
    #[serde(default)]
    pub experience: Experience,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub self_identification: SelfIdentification,
    /// Answer given to questions that match no archetype.
    #[serde(default = "default_answer")]
    pub default_answer: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            contact: Contact::default(),
            links: Links::default(),
            university: String::new(),
            documents: Documents::default(),
            experience: Experience::default(),
            eligibility: Eligibility::default(),
            preferences: Preferences::default(),
            self_identification: SelfIdentification::default(),
            default_answer: default_answer(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
    pub github: String,
    pub linkedin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Documents {
    pub resume: PathBuf,
    pub cover_letter: Option<PathBuf>,
}

impl Default for Documents {
    fn default() -> Self {
        Self {
            resume: PathBuf::from("resume.pdf"),
            cover_letter: None,
        }
    }
}

/// Years of experience per technology, with a baseline for unlisted ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub baseline: u32,
    #[serde(deserialize_with = "crate::lenient::map")]
    pub technologies: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Eligibility {
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub work_authorized: bool,
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub sponsorship_needed: bool,
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub commute_willing: bool,
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub criminal_record: bool,
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub background_check_consent: bool,
    #[serde(deserialize_with = "crate::lenient::scalar")]
    pub valid_certification: bool,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            work_authorized: true,
            sponsorship_needed: false,
            commute_willing: true,
            criminal_record: false,
            background_check_consent: true,
            valid_certification: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub preferred_shift: String,
    pub salary_expectation: Option<String>,
    pub education_level: String,
    pub available_hours: String,
    pub interview_availability: String,
    pub why_this_role: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_shift: "Day shift".to_string(),
            salary_expectation: None,
            education_level: "Bachelor".to_string(),
            available_hours: "Yes".to_string(),
            interview_availability: "Flexible".to_string(),
            why_this_role: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfIdentification {
    pub gender: String,
    pub disability: String,
    pub veteran: String,
    pub ethnicity: String,
}

impl Default for SelfIdentification {
    fn default() -> Self {
        Self {
            gender: DECLINE.to_string(),
            disability: DECLINE.to_string(),
            veteran: DECLINE.to_string(),
            ethnicity: DECLINE.to_string(),
        }
    }
}

fn default_answer() -> String {
    "Yes".to_string()
}

/// Render a boolean flag the way application forms expect it.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
