//! Element Locator: resolve a [`FieldDescriptor`] against a snapshot.
//!
//! Strategies are tried in descriptor order and the first one that yields an
//! eligible control wins. There is no scoring across strategies. Absence is
//! `None`, never an error.
use crate::taxonomy::{FieldDescriptor, FieldKind, Strategy, StrategyKind};
use easyapply_common::ApplyError;
use easyapply_drivers::{ElementId, ElementSnapshot, Page, PageSnapshot};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const ATTRIBUTE_KEYS: [&str; 5] = ["id", "name", "data-testid", "autocomplete", "type"];

/// A control that satisfied one of a descriptor's strategies.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub element: &'a ElementSnapshot,
    pub strategy: StrategyKind,
}

/// Resolve `descriptor` on `page`.
pub fn locate<'a>(descriptor: &FieldDescriptor, page: &'a PageSnapshot) -> Option<Located<'a>> {
    locate_excluding(descriptor, page, &HashSet::new())
}

/// Like [`locate`], skipping controls already claimed by another field.
pub fn locate_excluding<'a>(
    descriptor: &FieldDescriptor,
    page: &'a PageSnapshot,
    taken: &HashSet<ElementId>,
) -> Option<Located<'a>> {
    let found = descriptor.strategies.iter().find_map(|strategy| {
        let mut pool = page
            .elements
            .iter()
            .filter(|el| !taken.contains(&el.id) && is_candidate(descriptor, el));
        let hit = match strategy {
            Strategy::Attribute(aliases) => pool.find(|el| attribute_matches(el, aliases)),
            Strategy::Label(needles) => pool.find(|el| contains_any(&accessible_name(el), needles)),
            Strategy::NearbyText(needles) => pool.find(|el| {
                el.preceding_text
                    .as_deref()
                    .is_some_and(|t| contains_any(&t.to_lowercase(), needles))
            }),
            Strategy::Position { control, nth } => pool.filter(|el| el.kind == *control).nth(*nth),
        };
        hit.map(|element| Located {
            element,
            strategy: strategy.kind(),
        })
    });

    match &found {
        Some(hit) => trace!(
            target: "easyapply.fill",
            field = descriptor.name,
            strategy = ?hit.strategy,
            key = %hit.element.key(),
            "located"
        ),
        None => trace!(target: "easyapply.fill", field = descriptor.name, "not located"),
    }
    found
}

fn is_candidate(descriptor: &FieldDescriptor, el: &ElementSnapshot) -> bool {
    descriptor.kind.accepts(el.kind)
        && (el.is_interactable() || (el.enabled && descriptor.kind == FieldKind::FileUpload))
        && !is_avoided(descriptor, el)
}

fn is_avoided(descriptor: &FieldDescriptor, el: &ElementSnapshot) -> bool {
    if descriptor.avoid.is_empty() {
        return false;
    }
    let name = accessible_name(el);
    descriptor.avoid.iter().any(|word| {
        name.contains(word)
            || ATTRIBUTE_KEYS
                .iter()
                .filter_map(|k| el.attr(k))
                .any(|v| tokens(v).iter().any(|t| t == word))
    })
}

fn attribute_matches(el: &ElementSnapshot, aliases: &[&str]) -> bool {
    ATTRIBUTE_KEYS.iter().filter_map(|k| el.attr(k)).any(|value| {
        let toks = tokens(value);
        let joined = toks.concat();
        aliases
            .iter()
            .any(|alias| joined == *alias || toks.iter().any(|t| t == alias))
    })
}

/// Lowercased label, `aria-label`, `placeholder`, plus own text for
/// buttons and links.
pub fn accessible_name(el: &ElementSnapshot) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(label) = el.label.as_deref() {
        parts.push(label);
    }
    for key in ["aria-label", "placeholder", "title"] {
        if let Some(v) = el.attr(key) {
            parts.push(v);
        }
    }
    if !el.kind.holds_answer() {
        parts.push(&el.text);
        parts.push(&el.value);
    }
    parts.join(" ").to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Split an attribute value into lowercase tokens on punctuation and
/// camelCase boundaries: `phoneNumber-input` -> `[phone, number, input]`.
pub fn tokens(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut prev_lower = false;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower && !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            cur.extend(ch.to_lowercase());
            prev_lower = ch.is_lowercase() || ch.is_numeric();
        } else {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            prev_lower = false;
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// A descriptor match found by [`wait_for`], with the snapshot it came from.
#[derive(Debug, Clone)]
pub struct Sighting {
    pub snapshot: PageSnapshot,
    pub element: ElementId,
    pub strategy: StrategyKind,
}

/// Poll fresh snapshots until `descriptor` resolves or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout and [`ApplyError::Cancelled`] if `cancel`
/// fires while waiting.
pub async fn wait_for(
    page: &mut dyn Page,
    descriptor: &FieldDescriptor,
    timeout: Duration,
    poll: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Sighting>, ApplyError> {
    wait_for_excluding(page, descriptor, timeout, poll, cancel, &|_: &PageSnapshot| HashSet::new()).await
}

/// Like [`wait_for`], skipping the controls `taken` claims on each fresh
/// snapshot. Ids are per snapshot, so the exclusion set is rebuilt every poll.
pub async fn wait_for_excluding(
    page: &mut dyn Page,
    descriptor: &FieldDescriptor,
    timeout: Duration,
    poll: Duration,
    cancel: &CancellationToken,
    taken: &dyn Fn(&PageSnapshot) -> HashSet<ElementId>,
) -> Result<Option<Sighting>, ApplyError> {
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(ApplyError::Cancelled);
        }
        let snapshot = page.snapshot().await?;
        if let Some(hit) = locate_excluding(descriptor, &snapshot, &taken(&snapshot)) {
            let (element, strategy) = (hit.element.id, hit.strategy);
            return Ok(Some(Sighting {
                snapshot,
                element,
                strategy,
            }));
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(target: "easyapply.fill", field = descriptor.name, ?timeout, "gave up waiting for element");
            return Ok(None);
        }
        let nap = poll.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return Err(ApplyError::Cancelled),
            _ = sleep(nap) => {}
        }
    }
}
