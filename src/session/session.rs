use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::audio::{locate_devices, AudioTransport, TransportParams};
use crate::config::Config;
use crate::engine::{EngineParams, RealtimeEngine};
use crate::meet::{join_meeting, ChromeMeetingPage, JoinOutcome};
use crate::pipeline::{seed_frames, Pipeline, PipelineParams, PipelineRunner, PipelineTask};

/// One agent deployment: owns the browser and the pipeline together.
///
/// Lifecycle is strictly created -> join attempted -> pipeline run -> torn
/// down. The browser is released on every exit path; a failed join aborts
/// pipeline startup entirely.
pub struct AgentSession {
    config: Config,
    session_id: String,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl AgentSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: format!("meeting-{}", uuid::Uuid::new_v4()),
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run the session to completion: resolve devices, assemble the
    /// pipeline, join the meeting, then bridge audio until shutdown.
    pub async fn run(self) -> Result<()> {
        info!("Starting session {}", self.session_id);

        // Device binding is resolved once, before the pipeline exists, and
        // never re-resolved mid-session.
        let binding = locate_devices().context("Failed to scan audio devices")?;

        let mut transport = AudioTransport::new(
            binding,
            TransportParams {
                vad: self.config.vad_params(),
                ..TransportParams::default()
            },
        );
        let engine = RealtimeEngine::new(
            self.config.openai_api_key.clone(),
            EngineParams {
                allow_interruptions: self.config.allow_interruptions,
                ..EngineParams::default()
            },
        );

        let pipeline = Pipeline::new(vec![
            Box::new(transport.input()?),
            Box::new(engine),
            Box::new(transport.output()?),
        ]);
        let task = PipelineTask::new(
            pipeline,
            PipelineParams {
                allow_interruptions: self.config.allow_interruptions,
                enable_metrics: true,
            },
        );

        let page = ChromeMeetingPage::launch(&self.config.browser_settings())
            .await
            .context("Failed to launch browser")?;

        let target = self.config.meeting_target();
        let join_config = self.config.join_config();

        // An interrupt during the (potentially minutes-long) admission wait
        // must still unwind through browser cleanup.
        let outcome = tokio::select! {
            outcome = join_meeting(&page, &target, &join_config) => outcome,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted while joining");
                JoinOutcome::Failed("interrupted before admission".to_string())
            }
        };

        if let JoinOutcome::Failed(reason) = outcome {
            if let Err(e) = page.close().await {
                warn!("Failed to close browser: {}", e);
            }
            anyhow::bail!("Failed to join meeting: {}", reason);
        }

        info!("Starting voice agent...");

        for frame in seed_frames(
            &self.config.agent_name,
            self.config.system_prompt.as_deref(),
            self.config.announce_on_join,
        ) {
            task.queue_frame(frame)
                .await
                .context("Failed to queue seed message")?;
        }

        let result = PipelineRunner::new().run(task).await;

        // Cleanup runs whether the pipeline completed, failed, or was
        // interrupted; the page was moved out on the join-failure path, so
        // this is the only remaining close.
        if let Err(e) = page.close().await {
            warn!("Failed to close browser: {}", e);
        }

        let elapsed = Utc::now().signed_duration_since(self.started_at);
        info!(
            "Session {} finished after {:.1}s",
            self.session_id,
            elapsed.num_milliseconds() as f64 / 1000.0
        );

        result
    }
}
