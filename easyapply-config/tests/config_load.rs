use easyapply_common::{LogFormat, StealthLevel};
use easyapply_config::ApplyConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a file in a temp dir and return its path.
fn write_file(tmp: &TempDir, name: &str, contents: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, contents).expect("write file");
    p
}

fn profile_yaml(resume: &std::path::Path) -> String {
    format!(
        r#"
version: "1"
profile:
  contact:
    phone: "${{EA_TEST_PHONE}}"
    address: "1 Main St"
    city: "Springfield"
    postal_code: "62701"
    state: "IL"
  documents:
    resume: "{}"
  experience:
    baseline: 1
    technologies:
      python: 5
      rust: 3
  eligibility:
    sponsorship_needed: false
engine:
  max_pages_per_job: 8
  base_delay_secs: 1.5
browser:
  stealth: maximum
logging:
  format: json
  stderr: false
"#,
        resume.display()
    )
}

#[test]
#[serial]
fn loads_file_with_env_expansion() {
    let tmp = TempDir::new().unwrap();
    let resume = write_file(&tmp, "resume.pdf", "%PDF-1.4");
    let path = write_file(&tmp, "easyapply.yaml", &profile_yaml(&resume));

    let config = temp_env::with_var("EA_TEST_PHONE", Some("555-0100"), || {
        ApplyConfigLoader::new()
            .with_file(&path)
            .load()
            .expect("load config")
    });

    assert_eq!(config.version.as_deref(), Some("1"));
    assert_eq!(config.profile.contact.phone, "555-0100");
    assert_eq!(config.profile.experience.technologies["python"], 5);
    assert_eq!(config.engine.max_pages_per_job, 8);
    assert_eq!(config.engine.actions_per_hour, 30);
    assert_eq!(config.browser.stealth, StealthLevel::Maximum);
    assert_eq!(config.logging.format, LogFormat::Json);

    let config = config.validated().expect("valid profile");
    assert_eq!(config.profile.documents.resume, resume);
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let resume = write_file(&tmp, "resume.pdf", "%PDF-1.4");
    let path = write_file(&tmp, "easyapply.yaml", &profile_yaml(&resume));

    let config = temp_env::with_vars(
        [
            ("EA_TEST_PHONE", Some("555-0100")),
            ("EASYAPPLY__ENGINE__MAX_PAGES_PER_JOB", Some("4")),
            ("EASYAPPLY__BROWSER__HEADLESS", Some("true")),
        ],
        || {
            ApplyConfigLoader::new()
                .with_file(&path)
                .load()
                .expect("load config")
        },
    );

    assert_eq!(config.engine.max_pages_per_job, 4);
    assert!(config.browser.headless);
}

#[test]
#[serial]
fn environment_text_overrides_keep_leading_zeros() {
    let tmp = TempDir::new().unwrap();
    let resume = write_file(&tmp, "resume.pdf", "%PDF-1.4");
    let path = write_file(&tmp, "easyapply.yaml", &profile_yaml(&resume));

    let config = temp_env::with_vars(
        [
            ("EA_TEST_PHONE", Some("555-0100")),
            ("EASYAPPLY__PROFILE__CONTACT__POSTAL_CODE", Some("02134")),
            ("EASYAPPLY__PROFILE__CONTACT__PHONE", Some("0123456789")),
            ("EASYAPPLY__PROFILE__EXPERIENCE__BASELINE", Some("2")),
            ("EASYAPPLY__ENGINE__BASE_DELAY_SECS", Some("0.5")),
            ("EASYAPPLY__ENGINE__SEED", Some("42")),
        ],
        || {
            ApplyConfigLoader::new()
                .with_file(&path)
                .load()
                .expect("load config")
        },
    );

    assert_eq!(config.profile.contact.postal_code, "02134");
    assert_eq!(config.profile.contact.phone, "0123456789");
    assert_eq!(config.profile.experience.baseline, 2);
    assert_eq!(config.engine.base_delay_secs, 0.5);
    assert_eq!(config.engine.seed, Some(42));
}

#[test]
#[serial]
fn malformed_numeric_override_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let resume = write_file(&tmp, "resume.pdf", "%PDF-1.4");
    let path = write_file(&tmp, "easyapply.yaml", &profile_yaml(&resume));

    let err = temp_env::with_vars(
        [
            ("EA_TEST_PHONE", Some("555-0100")),
            ("EASYAPPLY__ENGINE__MAX_PAGES_PER_JOB", Some("ten")),
        ],
        || ApplyConfigLoader::new().with_file(&path).load().unwrap_err(),
    );

    assert!(err.to_string().contains("ten"));
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    let config = ApplyConfigLoader::new()
        .with_optional_file(tmp.path().join("missing.yaml"))
        .with_yaml_str("profile:\n  contact:\n    city: 'Springfield'\n")
        .load()
        .expect("load config");

    assert_eq!(config.profile.contact.city, "Springfield");
}

#[test]
#[serial]
fn validation_rejects_missing_resume() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        &tmp,
        "easyapply.yaml",
        &profile_yaml(&tmp.path().join("missing.pdf")),
    );

    let config = temp_env::with_var("EA_TEST_PHONE", Some("555-0100"), || {
        ApplyConfigLoader::new().with_file(&path).load().unwrap()
    });

    let err = config.validated().unwrap_err();
    assert!(err.to_string().contains("resume file not found"));
}
