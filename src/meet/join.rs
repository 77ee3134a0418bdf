use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Where the diagnostic screenshot lands when a join attempt fails.
pub const FAILURE_SCREENSHOT_PATH: &str = "join-failure.png";

const POPUP_TIMEOUT: Duration = Duration::from_secs(5);
const NAME_TIMEOUT: Duration = Duration::from_secs(5);

/// The meeting the agent joins as a guest.
#[derive(Debug, Clone)]
pub struct MeetingTarget {
    /// Join URL; a missing scheme is normalized to https
    pub url: String,
    /// Guest display name
    pub display_name: String,
    /// Recorded but never applied; guest join has no profile picture
    pub avatar: Option<String>,
}

/// Bounds on the admission wait.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Wall-clock deadline for the whole admission wait
    pub deadline: Duration,
    /// Sleep between admission polls
    pub poll_interval: Duration,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Result of one admission poll pass. "Button present but wrong state" and
/// "no buttons yet" are the same thing here: still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Pending,
    Admitted,
}

/// Terminal result of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Admitted,
    Failed(String),
}

/// Page capabilities the join state machine drives. The production
/// implementation is a CDP-automated browser page; tests substitute a fake.
#[async_trait::async_trait]
pub trait MeetingPage: Send + Sync {
    /// Open the URL and wait for the document's content-loaded milestone.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Click a control containing `text` if one shows up within `timeout`.
    /// `Ok(false)` means none appeared.
    async fn click_text(&self, text: &str, timeout: Duration) -> Result<bool>;

    /// Fill the input matching `placeholder` if visible within `timeout`.
    async fn fill_placeholder(
        &self,
        placeholder: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<bool>;

    /// Labels of the currently rendered interactive controls.
    async fn visible_controls(&self) -> Result<Vec<String>>;

    /// Click the control carrying `label`.
    async fn click_control(&self, label: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn screenshot(&self, path: &Path) -> Result<()>;
}

/// Prepend a default scheme when the target URL has none.
pub fn normalize_meeting_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Case-insensitive admission-intent match. Anchored so "Join now" passes
/// but unrelated labels ("Leave", "Joined participants") do not.
pub fn is_admission_label(label: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(join|join now|ask to join|request to join)\s*$")
            .expect("admission pattern is valid")
    });
    pattern.is_match(label)
}

/// Best-effort dismissal of the informational overlay shown on first visit.
/// Returns whether one was found and dismissed; lookup errors count as not
/// found and never fail the attempt.
pub async fn dismiss_popup(page: &dyn MeetingPage) -> bool {
    match page.click_text("Got it", POPUP_TIMEOUT).await {
        Ok(true) => {
            debug!("Dismissed informational popup");
            true
        }
        Ok(false) => false,
        Err(e) => {
            debug!("Popup lookup failed, proceeding: {}", e);
            false
        }
    }
}

/// Best-effort entry of the guest display name.
pub async fn enter_display_name(page: &dyn MeetingPage, name: &str) -> bool {
    match page.fill_placeholder("Your name", name, NAME_TIMEOUT).await {
        Ok(true) => {
            debug!("Entered display name '{}'", name);
            true
        }
        Ok(false) => false,
        Err(e) => {
            debug!("Name field lookup failed, proceeding: {}", e);
            false
        }
    }
}

/// One pass over the rendered controls: click the first admission-intent
/// control found. Enumeration or click failures just mean "still pending".
pub async fn poll_admission(page: &dyn MeetingPage) -> Admission {
    let controls = match page.visible_controls().await {
        Ok(controls) => controls,
        Err(e) => {
            debug!("No controls attached yet: {}", e);
            return Admission::Pending;
        }
    };

    for label in controls {
        if !is_admission_label(&label) {
            continue;
        }
        info!("Clicking '{}'...", label.trim());
        match page.click_control(&label).await {
            Ok(()) => return Admission::Admitted,
            Err(e) => {
                warn!("Failed to click '{}': {}", label.trim(), e);
                return Admission::Pending;
            }
        }
    }

    Admission::Pending
}

/// Drive the page through popup dismissal, name entry, and the admission
/// poll loop until the agent is inside the meeting or the deadline expires.
///
/// The poll loop is bounded by `config.deadline` wall-clock time and stops
/// immediately on the first successful admission click. On failure the page
/// diagnostics are captured before returning; the caller releases the
/// browser.
pub async fn join_meeting(
    page: &dyn MeetingPage,
    target: &MeetingTarget,
    config: &JoinConfig,
) -> JoinOutcome {
    let url = normalize_meeting_url(&target.url);
    info!("Joining meeting: {}", url);

    if let Err(e) = page.navigate(&url).await {
        let reason = format!("navigation failed: {}", e);
        error!("Error joining meeting: {}", reason);
        capture_failure_diagnostics(page).await;
        return JoinOutcome::Failed(reason);
    }

    dismiss_popup(page).await;
    enter_display_name(page, &target.display_name).await;

    if let Some(avatar) = &target.avatar {
        info!(
            "Avatar is set to {}, but guest join does not support a profile picture",
            avatar
        );
    }

    let deadline = Instant::now() + config.deadline;
    loop {
        if poll_admission(page).await == Admission::Admitted {
            info!("Admission requested, waiting to be let in");
            return JoinOutcome::Admitted;
        }
        if Instant::now() >= deadline {
            break;
        }
        sleep(config.poll_interval).await;
    }

    warn!("Could not find or click an admission button. Aborting.");
    capture_failure_diagnostics(page).await;
    JoinOutcome::Failed(format!(
        "no admission control within {}s",
        config.deadline.as_secs()
    ))
}

/// Record what the page looked like when the attempt failed: URL, title,
/// every visible control label, and a full-page screenshot.
async fn capture_failure_diagnostics(page: &dyn MeetingPage) {
    match page.current_url().await {
        Ok(url) => warn!("Current URL: {}", url),
        Err(e) => warn!("Could not read page URL: {}", e),
    }
    match page.title().await {
        Ok(title) => warn!("Page title: {}", title),
        Err(e) => warn!("Could not read page title: {}", e),
    }
    match page.visible_controls().await {
        Ok(labels) => warn!("Visible controls: {:?}", labels),
        Err(e) => warn!("Could not enumerate controls: {}", e),
    }
    match page.screenshot(Path::new(FAILURE_SCREENSHOT_PATH)).await {
        Ok(()) => info!("Saved failure screenshot to {}", FAILURE_SCREENSHOT_PATH),
        Err(e) => warn!("Failed to capture screenshot: {}", e),
    }
}
