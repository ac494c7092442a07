use anyhow::Result;
use fantoccini::elements::Element;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// WebDriver key code for Backspace.
const BACKSPACE: &str = "\u{E003}";

#[derive(Debug, Clone)]
/// Per-keystroke timing for typing into form fields.
pub struct TypingCadence {
    pub min_ms: u64,
    pub max_ms: u64,
    /// Chance of mistyping the last character and correcting it.
    pub correction_probability: f64,
}

impl Default for TypingCadence {
    fn default() -> Self {
        Self {
            min_ms: 30,
            max_ms: 150,
            correction_probability: 0.05,
        }
    }
}

impl TypingCadence {
    /// Keystrokes fire instantly.
    pub fn instant() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
            correction_probability: 0.0,
        }
    }

    pub fn keystroke_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = (self.min_ms.min(self.max_ms), self.min_ms.max(self.max_ms));
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        let ms = OsRng.gen_range(min.min(max)..=max.max(min));
        sleep(Duration::from_millis(ms)).await;
    }

    /// Type `text` one character at a time, occasionally retyping the last
    /// character.
    pub async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        for ch in text.chars() {
            element.send_keys(&ch.to_string()).await?;
            sleep(self.keystroke_delay(&mut OsRng)).await;
        }

        let last = text.chars().last();
        if let Some(last) = last.filter(|_| text.chars().count() > 3) {
            if OsRng.gen_bool(self.correction_probability.clamp(0.0, 1.0)) {
                element.send_keys(BACKSPACE).await?;
                sleep(self.keystroke_delay(&mut OsRng)).await;
                element.send_keys(&last.to_string()).await?;
            }
        }
        Ok(())
    }
}
