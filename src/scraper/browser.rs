//! CDP-backed scraping via chromiumoxide.

use super::{BrowserScraper, EXTRACT_SCRIPT, STEALTH_SCRIPT, SessionCollector, TimelineScraper};
use crate::auth::{Cookie, StorageState};
use crate::config::ScrapeConfig;
use crate::error::{Result, TweetlogError};
use crate::tweet::{RawTweet, Tweet};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetCookiesParams, SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const LAUNCH_ARGS: [&str; 3] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
];

const SELECTOR_POLL: Duration = Duration::from_millis(250);

fn browser_err(context: &str) -> impl Fn(chromiumoxide::error::CdpError) -> TweetlogError + '_ {
    move |e| TweetlogError::Browser(format!("{context}: {e}"))
}

#[async_trait]
impl TimelineScraper for BrowserScraper {
    async fn scrape(&self, url: &str) -> Result<Vec<Tweet>> {
        let (mut browser, handler) = self.launch().await?;

        let result = self.run_session(&browser, url).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        let _ = browser.wait().await;
        handler.abort();

        result
    }
}

impl BrowserScraper {
    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let cfg = &self.config;
        let mut builder = BrowserConfig::builder()
            .args(LAUNCH_ARGS)
            .window_size(cfg.viewport_width, cfg.viewport_height)
            .viewport(Viewport {
                width: cfg.viewport_width,
                height: cfg.viewport_height,
                ..Default::default()
            });
        if !cfg.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| TweetlogError::Browser(format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(browser_err("Failed to launch browser"))?;

        // The handler must be polled for the connection to make progress.
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        Ok((browser, handle))
    }

    async fn run_session(&self, browser: &Browser, url: &str) -> Result<Vec<Tweet>> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(browser_err("Failed to open page"))?;

        self.prepare_page(&page).await?;

        info!(%url, "Accessing timeline");
        match tokio::time::timeout(self.config.navigation_timeout(), page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(TweetlogError::Scrape {
                    url: url.to_string(),
                    reason: format!("navigation failed: {e}"),
                });
            }
            Err(_) => warn!(
                %url,
                timeout_secs = self.config.navigation_timeout_secs,
                "Navigation did not finish in time; continuing with what loaded"
            ),
        }

        if !wait_for_selector(&page, "article", self.config.selector_timeout()).await {
            warn!("Element wait timeout (might be OK if content loaded)");
        }

        let mut collector = SessionCollector::new();
        let rounds = self.config.scroll_count;
        for round in 1..=rounds {
            info!("Scrolling {round}/{rounds}...");

            match extract(&page).await {
                Ok(batch) => {
                    let added = collector.absorb(batch);
                    debug!(round, added, total = collector.len(), "Extracted tweets");
                }
                // Articles can detach mid-read; the next round picks them up.
                Err(e) => warn!(round, error = %e, "Extraction failed for this round"),
            }

            if let Err(e) = self.scroll(&page).await {
                warn!(round, error = %e, "Scroll failed");
            }
            tokio::time::sleep(self.config.scroll_pause()).await;
        }

        if collector.is_empty() {
            warn!(%url, "No tweets found on the page");
        } else {
            info!(tweets = collector.len(), "Total unique tweets collected");
        }
        Ok(collector.into_tweets())
    }

    /// User agent, locale, stealth script and saved session, before any navigation.
    async fn prepare_page(&self, page: &Page) -> Result<()> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(browser_err("Failed to install init script"))?;

        let overrides = emulation_overrides(&self.config, self.auth.as_ref());
        page.execute(overrides.locale)
            .await
            .map_err(browser_err("Failed to set locale"))?;
        if let Some(user_agent) = overrides.user_agent {
            page.execute(user_agent)
                .await
                .map_err(browser_err("Failed to set user agent"))?;
        }

        let Some(state) = &self.auth else {
            return Ok(());
        };

        let cookies = state
            .cookies
            .iter()
            .filter_map(|c| match cookie_param(c) {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!(cookie = %c.name, error = %e, "Skipping unusable cookie");
                    None
                }
            })
            .collect::<Vec<_>>();
        if !cookies.is_empty() {
            debug!(count = cookies.len(), "Installing session cookies");
            page.execute(SetCookiesParams::new(cookies))
                .await
                .map_err(browser_err("Failed to set cookies"))?;
        }

        if let Some(script) = local_storage_script(state) {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
                .await
                .map_err(browser_err("Failed to seed localStorage"))?;
        }

        Ok(())
    }

    async fn scroll(&self, page: &Page) -> Result<()> {
        let wheel = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(f64::from(self.config.viewport_width) / 2.0)
            .y(f64::from(self.config.viewport_height) / 2.0)
            .delta_x(0.0)
            .delta_y(self.config.scroll_delta)
            .build()
            .map_err(|e| TweetlogError::Browser(format!("Failed to build wheel event: {e}")))?;
        page.execute(wheel)
            .await
            .map_err(browser_err("Mouse wheel failed"))?;
        Ok(())
    }
}

async fn extract(page: &Page) -> Result<Vec<Tweet>> {
    let rows: Vec<RawTweet> = page
        .evaluate(EXTRACT_SCRIPT)
        .await
        .map_err(browser_err("Evaluate failed"))?
        .into_value()?;
    Ok(rows.into_iter().map(Tweet::from).collect())
}

/// Poll until `selector` matches or `timeout` passes.
async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let started = Instant::now();
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if started.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(SELECTOR_POLL).await;
    }
}

fn cookie_param(cookie: &Cookie) -> std::result::Result<CookieParam, String> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expires_at() {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(same_site) = cookie.same_site.as_deref().and_then(same_site) {
        builder = builder.same_site(same_site);
    }
    builder.build()
}

/// Emulation commands sent before navigation.
struct EmulationOverrides {
    locale: SetLocaleOverrideParams,
    user_agent: Option<SetUserAgentOverrideParams>,
}

/// The locale is always overridden; the user agent only with a saved session.
fn emulation_overrides(config: &ScrapeConfig, auth: Option<&StorageState>) -> EmulationOverrides {
    EmulationOverrides {
        locale: SetLocaleOverrideParams {
            locale: Some(config.locale.clone()),
        },
        user_agent: auth.map(|_| SetUserAgentOverrideParams::new(config.user_agent.clone())),
    }
}

fn same_site(raw: &str) -> Option<CookieSameSite> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

/// Init script writing saved localStorage entries when the page's origin matches.
fn local_storage_script(state: &StorageState) -> Option<String> {
    let mut script = String::new();
    for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
        let origin_js = serde_json::to_string(&origin.origin).ok()?;
        script.push_str(&format!("if (location.origin === {origin_js}) {{\n"));
        for entry in &origin.local_storage {
            let name = serde_json::to_string(&entry.name).ok()?;
            let value = serde_json::to_string(&entry.value).ok()?;
            script.push_str(&format!("  localStorage.setItem({name}, {value});\n"));
        }
        script.push_str("}\n");
    }
    (!script.is_empty()).then_some(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{OriginStorage, StorageEntry};

    #[test]
    fn same_site_is_case_insensitive() {
        assert!(matches!(same_site("Lax"), Some(CookieSameSite::Lax)));
        assert!(matches!(same_site("NONE"), Some(CookieSameSite::None)));
        assert!(same_site("bogus").is_none());
    }

    #[test]
    fn local_storage_script_escapes_values() {
        let state = StorageState {
            cookies: Vec::new(),
            origins: vec![OriginStorage {
                origin: "https://x.com".into(),
                local_storage: vec![StorageEntry {
                    name: "k".into(),
                    value: "it's \"quoted\"".into(),
                }],
            }],
        };
        let script = local_storage_script(&state).unwrap();
        assert!(script.contains(r#"if (location.origin === "https://x.com")"#));
        assert!(script.contains(r#"localStorage.setItem("k", "it's \"quoted\"");"#));
    }

    #[test]
    fn anonymous_session_still_overrides_locale() {
        let config = ScrapeConfig::default();
        let overrides = emulation_overrides(&config, None);
        assert_eq!(overrides.locale.locale.as_deref(), Some("ja-JP"));
        assert!(overrides.user_agent.is_none());
    }

    #[test]
    fn saved_session_also_overrides_user_agent() {
        let config = ScrapeConfig::default();
        let overrides = emulation_overrides(&config, Some(&StorageState::default()));
        assert_eq!(overrides.locale.locale.as_deref(), Some("ja-JP"));
        let user_agent = overrides.user_agent.unwrap();
        assert_eq!(user_agent.user_agent, config.user_agent);
    }

    #[test]
    fn no_local_storage_means_no_script() {
        assert!(local_storage_script(&StorageState::default()).is_none());
    }
}
