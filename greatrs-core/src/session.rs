//! Site Session Driver: one analysis round-trip against the GREAT web UI.
//!
//! A [`GreatSession`] owns a single Chrome instance and walks a linear
//! protocol: open, fill the form, submit, await the job, then scrape or
//! download whichever output was requested. The session closes with the
//! struct on every path; the single exception is the UCSC handoff, which
//! returns a second, independent browser for the caller to keep open.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::Url;

use crate::artifacts;
use crate::config::{AnalysisOptions, ControlAdjustment, GlobalControls, PlotKind};
use crate::errors::{GreatError, Result};
use crate::models::RegionSet;
use crate::scrape::{self, TableScrape};
use crate::site;

pub struct GreatSession {
    browser: Browser,
    tab: Arc<Tab>,
    http: Client,
}

impl GreatSession {
    ///
    /// Launch a browser and navigate to the GREAT submission form.
    ///
    /// TLS relaxation and the automation-fingerprint workarounds are scoped
    /// to this session; nothing process-wide is touched.
    ///
    pub fn open(opts: &AnalysisOptions) -> Result<Self> {
        let launch = LaunchOptions::default_builder()
            .headless(opts.headless)
            .ignore_certificate_errors(opts.accept_invalid_certs)
            .args(vec![
                OsStr::new("--ignore-ssl-errors=yes"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| GreatError::Browser(anyhow!("invalid launch options: {e}")))?;
        let browser = Browser::new(launch)?;
        let tab = browser.new_tab()?;

        tab.navigate_to(site::GREAT_URL)?;
        tab.wait_until_navigated()?;
        // GREAT rejects sessions that advertise themselves as automated.
        tab.evaluate(
            "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
            false,
        )?;

        let http = Self::http_client(&tab, opts)?;
        info!("GREAT session opened at {}", site::GREAT_URL);

        Ok(GreatSession { browser, tab, http })
    }

    /// Copy the browser's session cookies into a blocking HTTP client so
    /// the raw image fetches later on are not rejected as bot traffic.
    fn http_client(tab: &Arc<Tab>, opts: &AnalysisOptions) -> Result<Client> {
        let url = Url::parse(site::GREAT_URL)
            .map_err(|e| GreatError::Browser(anyhow!("entry url: {e}")))?;
        let jar = Jar::default();
        for cookie in tab.get_cookies()? {
            jar.add_cookie_str(
                &format!(
                    "{}={}; Domain={}; Path={}",
                    cookie.name, cookie.value, cookie.domain, cookie.path
                ),
                &url,
            );
        }
        Ok(Client::builder()
            .danger_accept_invalid_certs(opts.accept_invalid_certs)
            .cookie_provider(Arc::new(jar))
            .build()?)
    }

    ///
    /// Fill the submission form: assembly radio, paste-in BED mode, the
    /// serialized region payload, and optionally the background set.
    ///
    pub fn configure(
        &self,
        regions: &RegionSet,
        background: Option<&RegionSet>,
        opts: &AnalysisOptions,
    ) -> Result<()> {
        self.click_id(opts.assembly.element_id())?;
        self.click_id(site::BED_CHOICE_ID)?;
        self.set_value(
            &format!("document.getElementsByName('{}')[0]", site::BED_DATA_NAME),
            &regions.to_tsv()?,
        )?;

        if let Some(bg) = background {
            self.click_css(site::BG_CHOICE_CSS)?;
            self.set_value(
                &format!("document.querySelector('{}')", site::BG_DATA_CSS),
                &bg.to_tsv()?,
            )?;
        }

        debug!(
            "form configured: {} test regions, {} background regions",
            regions.len(),
            background.map_or(0, RegionSet::len)
        );
        Ok(())
    }

    /// Open the advanced panel and apply the association rule and the
    /// curated-regulatory-domains choice.
    pub fn set_association_options(&self, opts: &AnalysisOptions) -> Result<()> {
        self.click_id(site::ASSOC_PANEL_ID)?;
        if let Some(id) = opts.association_rule.element_id() {
            self.click_id(id)?;
        }
        // checked by default on the site, so only a disable needs a click
        if !opts.include_curated_domains {
            self.click_id(site::CURATED_DOMAINS_ID)?;
        }
        Ok(())
    }

    ///
    /// Submit and block until the analysis job finishes. On timeout the
    /// site's own inline error text is surfaced in the log before failing.
    ///
    pub fn submit_and_await(&self) -> Result<()> {
        self.click_id(site::SUBMIT_ID)?;
        info!(
            "submitted; waiting up to {}s for the analysis job",
            site::SUBMIT_TIMEOUT.as_secs()
        );

        let results = self.tab.wait_for_element_with_custom_timeout(
            &format!("#{}", site::JOB_CONTAINER_ID),
            site::SUBMIT_TIMEOUT,
        );
        if results.is_err() {
            if let Ok(element) = self.tab.find_element(site::INLINE_ERROR_CSS) {
                if let Ok(text) = element.get_inner_text() {
                    warn!("site reported: {}", text.trim());
                }
            }
            return Err(GreatError::AnalysisTimeout {
                waiting_for: "the analysis job to finish",
                seconds: site::SUBMIT_TIMEOUT.as_secs(),
                hint: site::OVERSIZE_HINT,
            });
        }

        self.reveal(site::JOB_CONTAINER_ID)?;
        Ok(())
    }

    ///
    /// Apply post-analysis filtering. After all adjustments, every "Set"
    /// button is clicked so each table re-filters.
    ///
    pub fn adjust_global_controls(&self, controls: &GlobalControls) -> Result<()> {
        self.reveal(site::GLOBAL_CONTROLS_ID)?;

        for adjustment in controls.iter() {
            match adjustment {
                ControlAdjustment::GeneHits(value) => self.set_value(
                    &format!("document.getElementById('{}')", site::GENE_HITS_FIELD_ID),
                    value,
                )?,
                ControlAdjustment::View(id) => self.click_id(id)?,
                ControlAdjustment::Field { id, value } => {
                    self.set_value(&format!("document.getElementById('{id}')"), value)?
                }
            }
        }

        self.tab.evaluate(
            &format!(
                "document.querySelectorAll('button.button').forEach(b => {{ \
                   if (b.value === '{}') b.click(); }});",
                site::SET_BUTTON_VALUE
            ),
            false,
        )?;
        Ok(())
    }

    ///
    /// Reveal the region-gene association view in its own tab and return
    /// the rendered HTML for the pure parsers in [`crate::scrape`].
    ///
    pub fn association_page(&self) -> Result<String> {
        self.click_link_text(&self.tab, site::ASSOC_LINK_TEXT)?;
        let tab = self.wait_for_tab(1, site::TAB_TIMEOUT, "the gene association tab")?;
        tab.wait_until_navigated()?;
        tab.wait_for_element_with_custom_timeout(site::SUBTABLE_CSS, site::TAB_TIMEOUT)
            .map_err(|_| GreatError::AnalysisTimeout {
                waiting_for: "the gene association tables",
                seconds: site::TAB_TIMEOUT.as_secs(),
                hint: site::OVERSIZE_HINT,
            })?;
        Ok(tab.get_content()?)
    }

    ///
    /// Hand the region set off to the UCSC genome browser in a fresh,
    /// caller-owned session.
    ///
    /// UCSC tooling misbehaves inside the automated session, so the tab's
    /// URL is read while this session is still alive and re-opened in an
    /// independent visible browser. The returned [`Browser`] stays open
    /// until the caller drops it; this is the documented exception to the
    /// session-teardown contract.
    ///
    pub fn ucsc_handoff(&self) -> Result<Browser> {
        self.tab.evaluate("window.scrollTo(0, 0);", false)?;
        self.click_link_text(&self.tab, site::UCSC_LINK_TEXT)?;

        let tab = self.wait_for_tab(1, site::TAB_TIMEOUT, "the UCSC browser tab")?;
        tab.wait_for_element_with_custom_timeout(
            &format!("#{}", site::UCSC_READY_ID),
            site::TAB_TIMEOUT,
        )
        .map_err(|_| GreatError::AnalysisTimeout {
            waiting_for: "the UCSC genome browser",
            seconds: site::TAB_TIMEOUT.as_secs(),
            hint: site::CONNECTIVITY_HINT,
        })?;
        let url = tab.get_url();

        let launch = LaunchOptions::default_builder()
            .headless(false)
            .args(vec![OsStr::new("--disable-dev-shm-usage")])
            .build()
            .map_err(|e| GreatError::Browser(anyhow!("invalid launch options: {e}")))?;
        let handoff = Browser::new(launch)?;
        let handoff_tab = handoff.new_tab()?;
        handoff_tab.navigate_to(&url)?;
        handoff_tab.wait_until_navigated()?;

        info!("UCSC genome browser opened at {}", url);
        Ok(handoff)
    }

    ///
    /// Fetch one of the three distance plots (the (offset+7)-th image on
    /// the results page) and save it flattened onto a white background.
    ///
    pub fn save_distance_plot(&self, offset: usize, stem: &str) -> Result<PathBuf> {
        let images = self.tab.find_elements("img")?;
        let position = site::PLOT_IMG_OFFSET + offset;
        let image = images.get(position).ok_or_else(|| {
            GreatError::MissingElement(format!(
                "distance plot image #{position} (page has {} images)",
                images.len()
            ))
        })?;

        let src = attribute(image, "src")?
            .ok_or_else(|| GreatError::MissingElement("distance plot image source".to_string()))?;
        let bytes = self.http.get(&src).send()?.error_for_status()?.bytes()?;
        let flattened = artifacts::flatten_onto_white(&bytes)?;
        artifacts::write_png(stem, &flattened)
    }

    ///
    /// Scrape one enrichment table, retrying while it renders empty.
    ///
    /// `None` is the no-results sentinel. An empty table is treated as a
    /// transient server-side render delay up to the retry cap, after which
    /// it becomes a distinct error rather than looping forever.
    ///
    pub fn enrichment_table(&self, index: usize) -> Result<Option<DataFrame>> {
        for attempt in 1..=site::MAX_SCRAPE_RETRIES {
            let html = self.tab.get_content()?;
            match scrape::enrichment_table(&html, index)? {
                TableScrape::Rows(frame) => return Ok(Some(frame)),
                TableScrape::NoResults => {
                    info!("{}", site::NO_RESULTS_TEXT);
                    return Ok(None);
                }
                TableScrape::Pending => {
                    debug!("table {index} empty on attempt {attempt}, retrying");
                    thread::sleep(site::SCRAPE_RETRY_DELAY);
                }
            }
        }
        Err(GreatError::EmptyAfterRetries {
            attempts: site::MAX_SCRAPE_RETRIES,
        })
    }

    ///
    /// Drive the site's chart widget for one enrichment table and persist
    /// the rendered PNG as served (charts come opaque; no flattening).
    ///
    pub fn save_chart(&self, table_index: usize, plot: PlotKind, stem: &str) -> Result<PathBuf> {
        self.spawn_chart_tab(table_index, plot)?;
        let chart_tab = self.wait_for_tab(1, site::CHART_TIMEOUT, "the chart tab")?;
        chart_tab.wait_until_navigated()?;
        chart_tab
            .wait_for_element_with_custom_timeout(
                &format!("#{}", plot.container_id()),
                site::CHART_TIMEOUT,
            )
            .map_err(|_| GreatError::AnalysisTimeout {
                waiting_for: "the chart container",
                seconds: site::CHART_TIMEOUT.as_secs(),
                hint: site::CONNECTIVITY_HINT,
            })?;

        // download links appear once the chart is fully rendered; the
        // full-size hop for hierarchy charts is also served on this tab,
        // and only the last click spawns the image tab
        self.wait_for_link(&chart_tab, site::PDF_LINK_TEXT, "the chart download links")?;
        for text in chart_link_sequence(plot) {
            self.wait_for_link(&chart_tab, text, "the chart download links")?;
            self.click_link_text(&chart_tab, text)?;
        }

        let image_tab = self.wait_for_tab(2, site::CHART_TIMEOUT, "the chart image tab")?;
        image_tab.wait_until_navigated()?;
        let image = image_tab
            .wait_for_element_with_custom_timeout("img", site::CHART_TIMEOUT)
            .map_err(|_| GreatError::AnalysisTimeout {
                waiting_for: "the chart image",
                seconds: site::CHART_TIMEOUT.as_secs(),
                hint: site::CONNECTIVITY_HINT,
            })?;
        let src = attribute(&image, "src")?
            .ok_or_else(|| GreatError::MissingElement("chart image source".to_string()))?;
        let bytes = self.http.get(&src).send()?.error_for_status()?.bytes()?;
        artifacts::write_png(stem, &bytes)
    }

    /// The session's browser closes on drop; this is the explicit spelling.
    pub fn close(self) {}

    // --- element plumbing ---

    fn click_id(&self, id: &str) -> Result<()> {
        self.tab.find_element(&format!("#{id}"))?.click()?;
        Ok(())
    }

    fn click_css(&self, css: &str) -> Result<()> {
        self.tab.find_element(css)?.click()?;
        Ok(())
    }

    /// Set a form control's value through the protocol; the BED payloads
    /// are far too large to type keystroke by keystroke.
    fn set_value(&self, js_target: &str, value: &str) -> Result<()> {
        let literal = serde_json::to_string(value)
            .map_err(|e| GreatError::Browser(anyhow!("payload escaping: {e}")))?;
        self.tab
            .evaluate(&format!("{js_target}.value = {literal};"), false)?;
        Ok(())
    }

    fn reveal(&self, id: &str) -> Result<()> {
        self.tab.evaluate(
            &format!("document.getElementById('{id}').style.display = 'block';"),
            false,
        )?;
        Ok(())
    }

    /// Click the first anchor whose trimmed text matches exactly. The GREAT
    /// result pages identify their actions by link text, not by id.
    fn click_link_text(&self, tab: &Arc<Tab>, text: &str) -> Result<()> {
        match tab.evaluate(&link_match_js(text, true), false)?.value {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            _ => Err(GreatError::MissingElement(format!("link \"{text}\""))),
        }
    }

    fn wait_for_link(
        &self,
        tab: &Arc<Tab>,
        text: &str,
        waiting_for: &'static str,
    ) -> Result<()> {
        let probe = link_match_js(text, false);
        let deadline = Instant::now() + site::CHART_TIMEOUT;
        loop {
            if let Some(serde_json::Value::Bool(true)) = tab.evaluate(&probe, false)?.value {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(GreatError::AnalysisTimeout {
                    waiting_for,
                    seconds: site::CHART_TIMEOUT.as_secs(),
                    hint: site::CONNECTIVITY_HINT,
                });
            }
            thread::sleep(Duration::from_millis(200));
        }
    }

    ///
    /// Wait for the tab at `index` to attach. A tab that has not appeared
    /// yet is the one deliberately tolerated wait condition: it is polled,
    /// not failed, until the timeout.
    ///
    fn wait_for_tab(
        &self,
        index: usize,
        timeout: Duration,
        waiting_for: &'static str,
    ) -> Result<Arc<Tab>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let tabs = self
                    .browser
                    .get_tabs()
                    .lock()
                    .map_err(|_| GreatError::Browser(anyhow!("tab registry poisoned")))?;
                if let Some(tab) = tabs.get(index) {
                    return Ok(tab.clone());
                }
            }
            if Instant::now() >= deadline {
                return Err(GreatError::AnalysisTimeout {
                    waiting_for,
                    seconds: timeout.as_secs(),
                    hint: site::CONNECTIVITY_HINT,
                });
            }
            thread::sleep(Duration::from_millis(200));
        }
    }

    ///
    /// Pick a chart type from the nth visualization select. The widget
    /// intermittently ignores a selection server side, so if no tab spawns
    /// the select is reset and retried, up to a bounded number of attempts.
    ///
    fn spawn_chart_tab(&self, table_index: usize, plot: PlotKind) -> Result<()> {
        for _ in 0..site::MAX_SCRAPE_RETRIES {
            self.select_vis_option(table_index, plot.option_text())?;

            let deadline = Instant::now() + Duration::from_secs(2);
            while Instant::now() < deadline {
                let spawned = {
                    let tabs = self
                        .browser
                        .get_tabs()
                        .lock()
                        .map_err(|_| GreatError::Browser(anyhow!("tab registry poisoned")))?;
                    tabs.len() > 1
                };
                if spawned {
                    return Ok(());
                }
                thread::sleep(Duration::from_millis(200));
            }

            self.select_vis_option(table_index, site::VIS_RESET_OPTION_TEXT)?;
        }
        Err(GreatError::AnalysisTimeout {
            waiting_for: "the chart tab",
            seconds: site::CHART_TIMEOUT.as_secs(),
            hint: site::CONNECTIVITY_HINT,
        })
    }

    fn select_vis_option(&self, index: usize, option_text: &str) -> Result<()> {
        let literal = serde_json::to_string(option_text)
            .map_err(|e| GreatError::Browser(anyhow!("option escaping: {e}")))?;
        let js = format!(
            "(() => {{ const s = document.getElementsByClassName('{}')[{index}]; \
               if (!s) return false; \
               for (let i = 0; i < s.options.length; i++) {{ \
                 if (s.options[i].text === {literal}) {{ \
                   s.selectedIndex = i; \
                   s.dispatchEvent(new Event('change')); \
                   return true; }} }} \
               return false; }})()",
            site::VIS_LIST_CLASS
        );
        match self.tab.evaluate(&js, false)?.value {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            _ => Err(GreatError::MissingElement(format!(
                "visualization selector for table {index}"
            ))),
        }
    }
}

/// Links clicked on the chart tab, in order, before the image tab is
/// attached. Hierarchy charts route through one extra full-size link.
fn chart_link_sequence(plot: PlotKind) -> &'static [&'static str] {
    match plot {
        PlotKind::Bar => &[site::PNG_LINK_TEXT],
        PlotKind::Hierarchy => &[site::PNG_LINK_TEXT, site::FULL_SIZE_LINK_TEXT],
    }
}

fn link_match_js(text: &str, click: bool) -> String {
    let literal = serde_json::to_string(text).unwrap_or_default();
    let action = if click { "a.click(); " } else { "" };
    format!(
        "(() => {{ for (const a of document.querySelectorAll('a')) {{ \
           if (a.textContent.trim() === {literal}) {{ {action}return true; }} }} \
           return false; }})()"
    )
}

/// Read an attribute off an element. The protocol hands attributes back as
/// a flat name/value list.
fn attribute(element: &Element, name: &str) -> Result<Option<String>> {
    let attributes = element.get_attributes()?;
    Ok(attributes.and_then(|attrs| {
        attrs
            .chunks_exact(2)
            .find(|pair| pair[0] == name)
            .map(|pair| pair[1].clone())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_link_match_js_escapes_text() {
        let js = link_match_js("View all \"genomic\" associations.", true);
        assert!(js.contains("\\\"genomic\\\""));
        assert!(js.contains("a.click();"));
    }

    #[rstest]
    fn test_link_match_js_probe_does_not_click() {
        let js = link_match_js("PNG", false);
        assert!(!js.contains("a.click();"));
    }

    #[rstest]
    fn test_chart_links_stay_on_chart_tab_until_the_image_spawns() {
        assert_eq!(chart_link_sequence(PlotKind::Bar), [site::PNG_LINK_TEXT]);
        assert_eq!(
            chart_link_sequence(PlotKind::Hierarchy),
            [site::PNG_LINK_TEXT, site::FULL_SIZE_LINK_TEXT]
        );
    }

    #[rstest]
    fn test_timeout_messages_name_probable_cause() {
        let err = GreatError::AnalysisTimeout {
            waiting_for: "the analysis job to finish",
            seconds: site::SUBMIT_TIMEOUT.as_secs(),
            hint: site::OVERSIZE_HINT,
        };
        let msg = err.to_string();
        assert!(msg.contains("60 seconds"));
        assert!(msg.contains("too large") || msg.contains("connection"));
        assert!(msg.contains("headless(false)"));
    }

    #[rstest]
    fn test_retry_cap_is_a_distinct_error() {
        let err = GreatError::EmptyAfterRetries {
            attempts: site::MAX_SCRAPE_RETRIES,
        };
        assert_eq!(
            err.to_string().contains(site::NO_RESULTS_TEXT),
            false,
            "cap exhaustion must not read like the no-results sentinel"
        );
    }
}
