use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const CHROME_VERSIONS: [&str; 3] = ["129.0.0.0", "130.0.0.0", "131.0.0.0"];

/// (platform token in the UA string, `navigator.platform`)
const PLATFORMS: [(&str, &str); 2] = [
    ("Windows NT 10.0; Win64; x64", "Win32"),
    ("Macintosh; Intel Mac OS X 10_15_7", "MacIntel"),
];

const LOCALES: [&str; 3] = ["en-US", "en-GB", "en-CA"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// User agent, viewport and locale presented for one browser session.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
}

impl UserAgentProfile {
    /// Draw a plausible desktop Chrome profile.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let chrome = CHROME_VERSIONS.choose(rng).copied().unwrap_or("131.0.0.0");
        let (ua_platform, platform) = PLATFORMS.choose(rng).copied().unwrap_or(PLATFORMS[0]);
        let locale = LOCALES.choose(rng).copied().unwrap_or("en-US");

        Self {
            user_agent: format!(
                "Mozilla/5.0 ({ua_platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{chrome} Safari/537.36"
            ),
            viewport: (rng.gen_range(1200..=1920), rng.gen_range(800..=1080)),
            platform: platform.to_string(),
            languages: vec![locale.to_string(), "en".to_string()],
        }
    }

    /// Value for Chrome's `--accept-lang`.
    pub fn accept_language(&self) -> String {
        self.languages.join(",")
    }
}
