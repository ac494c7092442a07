use super::fingerprint::UserAgentProfile;
use easyapply_common::StealthLevel;

/// Chrome command-line arguments for a stealth level and fingerprint.
pub fn build_stealth_arguments(level: StealthLevel, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
        format!("--accept-lang={}", profile.accept_language()),
    ];
    if level != StealthLevel::Lightweight {
        args.push("--disable-features=VizDisplayCompositor".to_string());
        args.push("--disable-ipc-flooding-protection".to_string());
    }
    if level == StealthLevel::Maximum {
        args.push("--disable-gpu".to_string());
        args.push("--disable-web-security".to_string());
    }
    args
}

/// Chrome `excludeSwitches` entries that hide the automation banner.
pub fn excluded_switches() -> Vec<&'static str> {
    vec!["enable-automation", "enable-logging"]
}

/// JavaScript evasions run after every navigation.
pub struct StealthScripts;

impl StealthScripts {
    pub fn core_evasions() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }

    pub fn languages(profile: &UserAgentProfile) -> String {
        let langs = serde_json::to_string(&profile.languages).unwrap_or_else(|_| "[]".into());
        format!("Object.defineProperty(navigator, 'languages', {{ get: () => {langs} }});")
    }

    pub fn platform(profile: &UserAgentProfile) -> String {
        let platform = serde_json::to_string(&profile.platform).unwrap_or_else(|_| "''".into());
        format!("Object.defineProperty(navigator, 'platform', {{ get: () => {platform} }});")
    }

    pub fn webgl_evasions() -> &'static str {
        r#"
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = function (p) {
                if (p === 37445) return 'Intel Inc.';
                if (p === 37446) return 'Intel Iris OpenGL Engine';
                return getParameter.call(this, p);
            };
        "#
    }

    /// Scripts to run for `level`, in order.
    pub fn for_level(level: StealthLevel, profile: &UserAgentProfile) -> Vec<String> {
        let mut scripts = vec![Self::core_evasions().to_string(), Self::languages(profile)];
        if level == StealthLevel::Maximum {
            scripts.push(Self::platform(profile));
            scripts.push(Self::webgl_evasions().to_string());
        }
        scripts
    }
}
