use super::{
    behavioral::TypingCadence,
    fingerprint::UserAgentProfile,
    page::WebDriverPage,
    stealth::{build_stealth_arguments, excluded_switches},
};
use anyhow::{Context, Result};
use easyapply_common::{BrowserSettings, StealthLevel};
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use tracing::info;
use webdriver::capabilities::Capabilities;

/// Owns the WebDriver session for a run.
pub struct ApplyDriver {
    pub client: Client,
    pub stealth: StealthLevel,
    pub fingerprint: UserAgentProfile,
    pub typing: TypingCadence,
}

/// `goog:chromeOptions` for the given settings and fingerprint.
pub fn chrome_options(settings: &BrowserSettings, fingerprint: &UserAgentProfile) -> Value {
    let mut args = build_stealth_arguments(settings.stealth, fingerprint);
    if settings.headless {
        args.push("--headless=new".to_string());
        if !args.iter().any(|a| a == "--disable-gpu") {
            args.push("--disable-gpu".to_string());
        }
    }

    let mut opts = Map::new();
    opts.insert("args".to_string(), json!(args));
    opts.insert("excludeSwitches".to_string(), json!(excluded_switches()));
    opts.insert("useAutomationExtension".to_string(), json!(false));
    Value::Object(opts)
}

impl ApplyDriver {
    /// Connect to the WebDriver service at `settings.webdriver_url`.
    pub async fn connect(settings: &BrowserSettings) -> Result<Self> {
        let fingerprint = UserAgentProfile::random(&mut rand::thread_rng());

        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            chrome_options(settings, &fingerprint),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&settings.webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {}", settings.webdriver_url))?;

        info!(
            target: "easyapply.run",
            user_agent = %fingerprint.user_agent,
            viewport = ?fingerprint.viewport,
            stealth = ?settings.stealth,
            "browser session started"
        );

        Ok(Self {
            client,
            stealth: settings.stealth,
            fingerprint,
            typing: TypingCadence::default(),
        })
    }

    /// A page handle sharing this session.
    pub fn page(&self) -> WebDriverPage {
        WebDriverPage::new(
            self.client.clone(),
            self.stealth,
            self.fingerprint.clone(),
            self.typing.clone(),
        )
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
