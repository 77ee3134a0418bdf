use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::frames::Frame;
use super::processor::FrameProcessor;

const CHANNEL_CAPACITY: usize = 64;

/// An ordered chain of frame processors.
pub struct Pipeline {
    stages: Vec<Box<dyn FrameProcessor>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn FrameProcessor>>) -> Self {
        Self { stages }
    }
}

/// Pipeline-level capabilities.
#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    /// Human speech preempts an in-progress agent utterance
    pub allow_interruptions: bool,
    /// Log per-stage frame counters at shutdown
    pub enable_metrics: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            allow_interruptions: true,
            enable_metrics: true,
        }
    }
}

/// A runnable pipeline with a frame-injection queue feeding the first stage.
///
/// Seed frames queued before `run()` are processed ahead of any live audio.
pub struct PipelineTask {
    pipeline: Pipeline,
    params: PipelineParams,
    inject_tx: mpsc::Sender<Frame>,
    inject_rx: Option<mpsc::Receiver<Frame>>,
}

impl PipelineTask {
    pub fn new(pipeline: Pipeline, params: PipelineParams) -> Self {
        let (inject_tx, inject_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            pipeline,
            params,
            inject_tx,
            inject_rx: Some(inject_rx),
        }
    }

    /// Queue a frame into the head of the chain.
    pub async fn queue_frame(&self, frame: Frame) -> Result<()> {
        self.inject_tx
            .send(frame)
            .await
            .map_err(|_| anyhow::anyhow!("pipeline is not accepting frames"))
    }

    /// Sender that can push `Frame::End` into the chain from outside,
    /// unwinding every stage in order.
    pub fn canceller(&self) -> mpsc::Sender<Frame> {
        self.inject_tx.clone()
    }

    /// Run the chain until `Frame::End` has traversed every stage.
    pub async fn run(mut self) -> Result<()> {
        let enable_metrics = self.params.enable_metrics;
        info!(
            "Pipeline starting ({} stages, interruptions {})",
            self.pipeline.stages.len(),
            if self.params.allow_interruptions {
                "allowed"
            } else {
                "off"
            }
        );

        let mut handles = Vec::new();
        let mut rx = self
            .inject_rx
            .take()
            .context("pipeline task already ran")?;

        for mut stage in self.pipeline.stages.into_iter() {
            let (tx, next_rx) = mpsc::channel(CHANNEL_CAPACITY);

            stage
                .start(tx.clone())
                .await
                .with_context(|| format!("Failed to start {} stage", stage.name()))?;

            let handle = tokio::spawn(async move {
                let mut processed: u64 = 0;
                while let Some(frame) = rx.recv().await {
                    let is_end = matches!(frame, Frame::End);
                    if let Err(e) = stage.process(frame, &tx).await {
                        error!("{} stage failed: {}", stage.name(), e);
                        let _ = tx.send(Frame::End).await;
                        break;
                    }
                    processed += 1;
                    if is_end {
                        break;
                    }
                }
                if let Err(e) = stage.stop().await {
                    error!("Failed to stop {} stage: {}", stage.name(), e);
                }
                if enable_metrics {
                    info!("{} stage processed {} frames", stage.name(), processed);
                }
            });

            handles.push(handle);
            rx = next_rx;
        }

        // Drain the tail of the chain until shutdown reaches it.
        while let Some(frame) = rx.recv().await {
            if matches!(frame, Frame::End) {
                break;
            }
        }

        // A stage may have originated the shutdown mid-chain; push End
        // through from the head so the earlier stages unwind too.
        let _ = self.inject_tx.send(Frame::End).await;
        drop(self.inject_tx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Pipeline stage panicked: {}", e);
            }
        }

        info!("Pipeline stopped");
        Ok(())
    }
}

/// Drives a task to completion while honoring the interrupt signal.
pub struct PipelineRunner;

impl PipelineRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run the task until it completes or Ctrl-C arrives. On interrupt the
    /// chain is unwound in order before returning.
    pub async fn run(&self, task: PipelineTask) -> Result<()> {
        let canceller = task.canceller();
        let mut run = Box::pin(task.run());

        tokio::select! {
            result = &mut run => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down pipeline");
                let _ = canceller.send(Frame::End).await;
                run.await
            }
        }
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}
