use anyhow::Result;
use tokio::sync::mpsc;

use super::frames::Frame;

/// One stage in the processing chain.
///
/// Stages receive frames from the previous stage and emit frames to the next
/// one through `output`. A stage that does not consume a frame must forward
/// it, `Frame::End` included, so shutdown reaches every downstream stage.
#[async_trait::async_trait]
pub trait FrameProcessor: Send {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Called once before any frame is processed. Source-like stages spawn
    /// their producers here; `output` feeds the next stage.
    async fn start(&mut self, output: mpsc::Sender<Frame>) -> Result<()> {
        let _ = output;
        Ok(())
    }

    /// Handle one frame from the previous stage.
    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()>;

    /// Called once after `Frame::End` passed through or the chain unwound.
    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Forward a frame downstream, tolerating a closed channel: a receiver that
/// is already gone just means the pipeline is unwinding.
pub async fn forward(output: &mpsc::Sender<Frame>, frame: Frame) {
    let _ = output.send(frame).await;
}
