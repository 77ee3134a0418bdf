use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use super::join::MeetingPage;

/// Identity string presented to the meeting page. A consistent desktop
/// Chrome profile keeps the page on its normal guest-join flow.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 720;

const ELEMENT_POLL: Duration = Duration::from_millis(250);
/// Per-iteration bound on a single control query; the admission loop treats
/// an expiry as "no buttons yet" and retries.
const CONTROL_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

const CONTROL_SELECTOR: &str = "button, [role=\"button\"]";

#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    /// Browser executable override; autodetected when unset
    pub executable: Option<String>,
}

/// A meeting page driven over the Chrome DevTools Protocol.
///
/// Owns the whole browser process; `close()` consumes the page so a session
/// can only release it once.
pub struct ChromeMeetingPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeMeetingPage {
    /// Launch a fresh automated browser configured to auto-grant microphone
    /// and camera prompts.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .headless_mode(HeadlessMode::New)
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .args(vec![
                "--use-fake-ui-for-media-stream",
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
                "--start-maximized",
            ]);
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(Path::new(path));
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        // The CDP connection only makes progress while its event stream is
        // polled.
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;
        page.set_user_agent(USER_AGENT)
            .await
            .context("Failed to set user agent")?;

        info!("Browser launched");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Shut the browser down and reap the process.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .context("Failed to close browser")?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl MeetingPage for ChromeMeetingPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await.context("Navigation failed")?;
        self.page
            .wait_for_navigation()
            .await
            .context("Page never finished loading")?;
        Ok(())
    }

    async fn click_text(&self, text: &str, timeout: Duration) -> Result<bool> {
        let xpath = format!("//*[contains(text(), '{}')]", text);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(elements) = self.page.find_xpaths(xpath.as_str()).await {
                if let Some(element) = elements.into_iter().next() {
                    element
                        .click()
                        .await
                        .with_context(|| format!("Failed to click '{}'", text))?;
                    return Ok(true);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }

    async fn fill_placeholder(
        &self,
        placeholder: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let selector = format!("input[placeholder=\"{}\"]", placeholder);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector.clone()).await {
                let _ = element.click().await;
                element
                    .type_str(value)
                    .await
                    .context("Failed to type into name field")?;
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }

    async fn visible_controls(&self) -> Result<Vec<String>> {
        let elements = tokio::time::timeout(
            CONTROL_QUERY_TIMEOUT,
            self.page.find_elements(CONTROL_SELECTOR),
        )
        .await
        .context("control query timed out")?
        .context("control query failed")?;

        let mut labels = Vec::new();
        for element in elements {
            // Controls can detach between query and read; skip those.
            if let Ok(Some(text)) = element.inner_text().await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    labels.push(text);
                }
            }
        }
        Ok(labels)
    }

    async fn click_control(&self, label: &str) -> Result<()> {
        let elements = self
            .page
            .find_elements(CONTROL_SELECTOR)
            .await
            .context("control query failed")?;

        for element in elements {
            let text = match element.inner_text().await {
                Ok(Some(text)) => text,
                _ => continue,
            };
            if text.trim() == label.trim() {
                element
                    .click()
                    .await
                    .with_context(|| format!("Failed to click '{}'", label))?;
                return Ok(());
            }
        }

        anyhow::bail!("control '{}' is no longer visible", label)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("Failed to read page URL")?
            .unwrap_or_default())
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .page
            .get_title()
            .await
            .context("Failed to read page title")?
            .unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .context("Failed to save screenshot")?;
        Ok(())
    }
}
