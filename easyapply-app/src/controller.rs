//! Run Controller: walks the job list and hands each application to the
//! engine. Everything job-shaped lives in the engine; this only navigates.
use anyhow::{Context, Result};
use easyapply_common::{ApplyError, EngineSettings, Profile};
use easyapply_drivers::browser::page::WebDriverPage;
use easyapply_drivers::{ControlKind, Page, PageSnapshot};
use easyapply_engine::locator::wait_for;
use easyapply_engine::taxonomy::{APPLY_BUTTON, FieldDescriptor, FieldKind, Strategy};
use easyapply_engine::{Job, WorkflowEngine};
use std::collections::HashSet;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

const PROGRESS_EVERY: u32 = 5;
const LISTING_MARKERS: [&str; 3] = ["viewjob", "jk=", "/rc/clk"];

/// "Next page" link on a search results page.
static NEXT_RESULTS: FieldDescriptor = FieldDescriptor {
    name: "next_results_page",
    kind: FieldKind::Action,
    strategies: &[
        Strategy::Attribute(&["paginationpagenext"]),
        Strategy::Label(&["next page", "next"]),
    ],
    avoid: &["previous"],
};

pub enum JobSource {
    Urls(Vec<String>),
    /// Collect listings from the search results open in the browser.
    Results { max_pages: u32 },
}

enum Flow {
    Continue,
    Halt(ApplyError),
}

pub struct RunController {
    engine: WorkflowEngine,
    cancel: CancellationToken,
    wait_for_breaker: bool,
    processed: u32,
}

impl RunController {
    pub fn new(settings: EngineSettings, cancel: CancellationToken, wait_for_breaker: bool) -> Self {
        Self {
            engine: WorkflowEngine::new(settings, cancel.clone()),
            cancel,
            wait_for_breaker,
            processed: 0,
        }
    }

    pub async fn run(
        &mut self,
        page: &mut WebDriverPage,
        profile: &Profile,
        source: JobSource,
    ) -> Result<()> {
        let urls = match source {
            JobSource::Urls(urls) => urls,
            JobSource::Results { max_pages } => self.collect_listings(page, max_pages).await?,
        };
        info!(target: "easyapply.run", jobs = urls.len(), "run started");

        let mut halted = None;
        for url in &urls {
            if self.cancel.is_cancelled() {
                info!(target: "easyapply.run", "run cancelled");
                break;
            }
            if let Flow::Halt(e) = self.apply_to(page, profile, url).await {
                halted = Some(e);
                break;
            }
            self.processed += 1;
            if self.processed % PROGRESS_EVERY == 0 {
                self.engine.stats().log_summary("progress");
            }
        }

        self.engine.stats().log_summary("final statistics");
        match halted {
            Some(e) => {
                error!(target: "easyapply.run", error = %e, "run halted");
                Err(e.into())
            }
            None => Ok(()),
        }
    }

    async fn apply_to(&mut self, page: &mut WebDriverPage, profile: &Profile, url: &str) -> Flow {
        let job = Job::new(job_id(url)).with_url(url);
        info!(target: "easyapply.run", job_id = %job.id, url, "opening listing");

        if let Err(e) = page.close_extra_windows().await {
            debug!(target: "easyapply.run", error = %e, "window cleanup failed");
        }
        if let Err(e) = page.goto(url).await {
            warn!(target: "easyapply.run", job_id = %job.id, error = %e, "listing did not load; skipping");
            self.engine.record_skipped();
            return Flow::Continue;
        }

        let settings = self.engine.settings();
        let entry = wait_for(
            page,
            &APPLY_BUTTON,
            settings.element_wait(),
            settings.poll_interval(),
            &self.cancel,
        )
        .await;
        let sighting = match entry {
            Ok(Some(sighting)) => sighting,
            Ok(None) => {
                info!(target: "easyapply.run", job_id = %job.id, "no Easy Apply button; skipping");
                self.engine.record_skipped();
                return Flow::Continue;
            }
            Err(ApplyError::Cancelled) => return Flow::Continue,
            Err(e) => {
                warn!(target: "easyapply.run", job_id = %job.id, error = %e, "listing unreadable; skipping");
                self.engine.record_skipped();
                return Flow::Continue;
            }
        };

        if let Err(e) = page.click(sighting.element).await {
            warn!(target: "easyapply.run", job_id = %job.id, error = %e, "Easy Apply button click failed; skipping");
            self.engine.record_skipped();
            return Flow::Continue;
        }
        match page.focus_newest_window().await {
            Ok(true) => debug!(target: "easyapply.run", job_id = %job.id, "application opened in a new window"),
            Ok(false) => {}
            Err(e) => debug!(target: "easyapply.run", error = %e, "window focus failed"),
        }

        let flow = loop {
            match self.engine.run_job(job.clone(), page, profile).await {
                Ok(report) => {
                    info!(
                        target: "easyapply.run",
                        job_id = %report.job_id,
                        outcome = report.outcome.label(),
                        pages = report.pages,
                        answers = report.answers.len(),
                        "application finished"
                    );
                    break Flow::Continue;
                }
                Err(ApplyError::CircuitOpen { retry_after, scope }) if self.wait_for_breaker => {
                    let wait = retry_after.unwrap_or_else(|| self.engine.settings().breaker_cooldown());
                    info!(
                        target: "easyapply.run",
                        %scope,
                        wait_secs = wait.as_secs(),
                        "run breaker open; waiting for the probe window"
                    );
                    if self.engine.behavior().suspend(wait).await.is_err() {
                        break Flow::Continue;
                    }
                }
                Err(e) => break Flow::Halt(e),
            }
        };

        if let Err(e) = page.close_extra_windows().await {
            debug!(target: "easyapply.run", error = %e, "window cleanup failed");
        }
        flow
    }

    /// Listing URLs from the results page open in the browser, following
    /// "next page" links up to `max_pages`.
    async fn collect_listings(&mut self, page: &mut WebDriverPage, max_pages: u32) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for n in 1..=max_pages {
            let snapshot = page.snapshot().await.context("reading search results")?;
            let found = job_links(&snapshot);
            info!(target: "easyapply.run", page = n, listings = found.len(), "collected listings");
            for url in found {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            if n == max_pages || self.cancel.is_cancelled() {
                break;
            }
            let Some(next) = easyapply_engine::locate(&NEXT_RESULTS, &snapshot) else {
                debug!(target: "easyapply.run", "no further result pages");
                break;
            };
            let id = next.element.id;
            page.click(id).await.context("opening the next results page")?;
            if self.engine.behavior().suspend(self.engine.settings().element_wait()).await.is_err() {
                break;
            }
        }
        Ok(urls)
    }
}

/// Absolute listing URLs linked from a results page, in page order.
pub fn job_links(snapshot: &PageSnapshot) -> Vec<String> {
    let base = Url::parse(&snapshot.url).ok();
    let mut seen = HashSet::new();
    snapshot
        .controls_of(ControlKind::Link)
        .filter_map(|el| el.attr("href"))
        .filter(|href| LISTING_MARKERS.iter().any(|m| href.contains(m)))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Url::parse(href).ok().map(String::from),
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Stable job identifier: the `jk` query parameter when present, else the
/// URL itself.
pub fn job_id(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "jk")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| url.to_string())
}

pub fn read_jobs_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading job list {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use easyapply_drivers::ElementSnapshot;
    use std::io::Write;

    fn link(href: &str) -> ElementSnapshot {
        ElementSnapshot::new(ControlKind::Link).with_attr("href", href)
    }

    #[test]
    fn listing_links_are_absolute_and_unique() {
        let snapshot = PageSnapshot::new("https://www.indeed.com/jobs?q=rust")
            .with_element(link("/viewjob?jk=abc123"))
            .with_element(link("/rc/clk?jk=def456&from=serp"))
            .with_element(link("/viewjob?jk=abc123"))
            .with_element(link("/career-advice"));
        assert_eq!(
            job_links(&snapshot),
            vec![
                "https://www.indeed.com/viewjob?jk=abc123".to_string(),
                "https://www.indeed.com/rc/clk?jk=def456&from=serp".to_string(),
            ]
        );
    }

    #[test]
    fn job_id_prefers_jk_parameter() {
        assert_eq!(job_id("https://www.indeed.com/viewjob?jk=abc123&tk=x"), "abc123");
        assert_eq!(job_id("https://jobs.example.test/42"), "https://jobs.example.test/42");
    }

    #[test]
    fn jobs_file_skips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# saved searches").unwrap();
        writeln!(file, "https://www.indeed.com/viewjob?jk=1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  https://www.indeed.com/viewjob?jk=2  ").unwrap();
        let urls = read_jobs_file(file.path()).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "https://www.indeed.com/viewjob?jk=2");
    }

    #[test]
    fn next_results_link_is_found() {
        let snapshot = PageSnapshot::new("u")
            .with_element(link("/jobs?start=0").with_attr("aria-label", "Previous Page"))
            .with_element(
                link("/jobs?start=10").with_attr("data-testid", "pagination-page-next"),
            );
        let hit = easyapply_engine::locate(&NEXT_RESULTS, &snapshot).unwrap();
        assert_eq!(hit.element.attr("href"), Some("/jobs?start=10"));
    }
}
