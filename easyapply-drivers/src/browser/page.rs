use super::{behavioral::TypingCadence, fingerprint::UserAgentProfile, stealth::StealthScripts};
use crate::dom::{ElementId, PageSnapshot};
use crate::page::Page;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use easyapply_common::StealthLevel;
use fantoccini::{elements::Element, Client, Locator};
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

const SNAPSHOT_SCRIPT: &str = include_str!("snapshot.js");

const SELECT_SCRIPT: &str = r#"
    const [el, wanted] = arguments;
    const w = String(wanted).trim().toLowerCase();
    const opts = Array.from(el.options);
    const opt = opts.find(o => o.text.trim().toLowerCase() === w)
        || opts.find(o => o.text.trim().toLowerCase().includes(w));
    if (!opt) return false;
    el.value = opt.value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
"#;

const POINTER_SCRIPT: &str = r#"
    const [x, y] = arguments;
    const target = document.elementFromPoint(x, y) || document.body;
    target.dispatchEvent(new MouseEvent('mousemove', { clientX: x, clientY: y, bubbles: true }));
"#;

/// A browser tab driven over WebDriver.
pub struct WebDriverPage {
    pub(crate) client: Client,
    pub(crate) stealth: StealthLevel,
    pub(crate) fingerprint: UserAgentProfile,
    pub(crate) typing: TypingCadence,
}

impl WebDriverPage {
    pub fn new(
        client: Client,
        stealth: StealthLevel,
        fingerprint: UserAgentProfile,
        typing: TypingCadence,
    ) -> Self {
        Self {
            client,
            stealth,
            fingerprint,
            typing,
        }
    }

    /// Navigate to `url` and re-apply the stealth scripts.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).with_context(|| format!("invalid url {url:?}"))?;
        self.typing.random_delay(300, 1200).await;
        self.client.goto(parsed.as_str()).await?;
        self.apply_stealth().await
    }

    async fn apply_stealth(&mut self) -> Result<()> {
        for script in StealthScripts::for_level(self.stealth, &self.fingerprint) {
            self.client.execute(&script, vec![]).await?;
        }
        Ok(())
    }

    pub async fn get_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    pub async fn get_title(&self) -> Result<String> {
        Ok(self.client.title().await?)
    }

    /// Switch to the most recently opened window, if it is not already
    /// current. Returns whether a switch happened.
    pub async fn focus_newest_window(&mut self) -> Result<bool> {
        let windows = self.client.windows().await?;
        let current = self.client.window().await?;
        match windows.last() {
            Some(newest) if *newest != current => {
                self.client.switch_to_window(newest.clone()).await?;
                self.apply_stealth().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Close every window except the first and switch back to it.
    pub async fn close_extra_windows(&mut self) -> Result<()> {
        let windows = self.client.windows().await?;
        let Some((main, extra)) = windows.split_first() else {
            return Ok(());
        };
        for handle in extra {
            self.client.switch_to_window(handle.clone()).await?;
            if let Err(e) = self.client.close_window().await {
                warn!(target: "easyapply.run", error = %e, "failed to close window");
            }
        }
        self.client.switch_to_window(main.clone()).await?;
        Ok(())
    }

    async fn element(&self, id: ElementId) -> Result<Element> {
        let selector = format!(r#"[data-easyapply-idx="{}"]"#, id.0);
        self.client
            .find(Locator::Css(&selector))
            .await
            .with_context(|| format!("element {} is no longer on the page", id.0))
    }

    async fn click_element(&self, element: &Element) -> Result<()> {
        if let Err(e) = element.click().await {
            debug!(target: "easyapply.fill", error = %e, "native click failed; using script click");
            self.client
                .execute("arguments[0].click();", vec![serde_json::to_value(element)?])
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        let raw = self.client.execute(SNAPSHOT_SCRIPT, vec![]).await?;
        serde_json::from_value(raw).context("unexpected snapshot shape")
    }

    async fn set_value(&mut self, id: ElementId, value: &str) -> Result<()> {
        let el = self.element(id).await?;
        el.clear().await?;
        self.typing.type_text(&el, value).await
    }

    async fn attach_file(&mut self, id: ElementId, path: &Path) -> Result<()> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", path.display()))?;
        let path = absolute
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF-8 path {}", absolute.display()))?;
        let el = self.element(id).await?;
        el.send_keys(path).await?;
        Ok(())
    }

    async fn choose(&mut self, id: ElementId) -> Result<()> {
        let el = self.element(id).await?;
        self.click_element(&el).await
    }

    async fn select_option(&mut self, id: ElementId, option: &str) -> Result<()> {
        let el = self.element(id).await?;
        let picked = self
            .client
            .execute(SELECT_SCRIPT, vec![serde_json::to_value(&el)?, json!(option)])
            .await?;
        if picked.as_bool() != Some(true) {
            bail!("option {option:?} not offered");
        }
        Ok(())
    }

    async fn click(&mut self, id: ElementId) -> Result<()> {
        let el = self.element(id).await?;
        self.client
            .execute(
                "arguments[0].scrollIntoView({block: 'center'});",
                vec![serde_json::to_value(&el)?],
            )
            .await?;
        self.click_element(&el).await
    }

    async fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.client
            .execute("window.scrollBy(0, arguments[0]);", vec![json!(dy)])
            .await?;
        Ok(())
    }

    async fn move_pointer(&mut self, x: i64, y: i64) -> Result<()> {
        self.client
            .execute(POINTER_SCRIPT, vec![json!(x), json!(y)])
            .await?;
        Ok(())
    }
}
