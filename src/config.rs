use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::VadParams;
use crate::meet::{BrowserSettings, JoinConfig, MeetingTarget};

/// Environment-supplied configuration.
///
/// Every key is optional except `MEETING_URL` and `OPENAI_API_KEY`; missing
/// required keys fail `load()` before any resource is touched.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Join target (`MEETING_URL`)
    pub meeting_url: String,

    /// Credential for the conversational engine (`OPENAI_API_KEY`)
    pub openai_api_key: String,

    /// Display name used for guest join and the default system prompt
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Accepted but not applicable to guest join; logged only
    #[serde(default)]
    pub agent_image: Option<String>,

    /// Replaces the generated default system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Queue an introduction-triggering seed message after admission
    #[serde(default)]
    pub announce_on_join: bool,

    /// Let detected human speech preempt an in-progress agent utterance
    #[serde(default = "default_true")]
    pub allow_interruptions: bool,

    #[serde(default = "default_vad_start_secs")]
    pub vad_start_secs: f64,

    #[serde(default = "default_vad_stop_secs")]
    pub vad_stop_secs: f64,

    #[serde(default = "default_vad_confidence")]
    pub vad_confidence: f64,

    /// Wall-clock bound on the admission wait, in seconds. Generous by
    /// default: admission may require a remote human host to approve.
    #[serde(default = "default_join_wait_secs")]
    pub join_wait_secs: u64,

    /// Sleep between admission-button polls, in seconds
    #[serde(default = "default_join_poll_secs")]
    pub join_poll_secs: u64,

    /// Browser executable override (`BROWSER_EXECUTABLE`)
    #[serde(default)]
    pub browser_executable: Option<String>,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("Failed to read environment")?;

        settings
            .try_deserialize()
            .context("Please set MEETING_URL and OPENAI_API_KEY")
    }

    pub fn meeting_target(&self) -> MeetingTarget {
        MeetingTarget {
            url: self.meeting_url.clone(),
            display_name: self.agent_name.clone(),
            avatar: self.agent_image.clone(),
        }
    }

    pub fn join_config(&self) -> JoinConfig {
        JoinConfig {
            deadline: Duration::from_secs(self.join_wait_secs),
            poll_interval: Duration::from_secs(self.join_poll_secs),
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            executable: self.browser_executable.clone(),
        }
    }

    pub fn vad_params(&self) -> VadParams {
        VadParams {
            start_secs: self.vad_start_secs,
            stop_secs: self.vad_stop_secs,
            confidence: self.vad_confidence,
        }
    }
}

fn default_agent_name() -> String {
    "AI Assistant".to_string()
}

fn default_true() -> bool {
    true
}

fn default_vad_start_secs() -> f64 {
    0.2
}

fn default_vad_stop_secs() -> f64 {
    0.2
}

fn default_vad_confidence() -> f64 {
    0.7
}

fn default_join_wait_secs() -> u64 {
    300
}

fn default_join_poll_secs() -> u64 {
    2
}
