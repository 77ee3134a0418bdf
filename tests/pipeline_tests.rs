// Tests for pipeline assembly, frame ordering, shutdown, and turn-seeding.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use meet_agent::pipeline::{
    forward, seed_frames, Frame, FrameProcessor, Pipeline, PipelineParams, PipelineTask, Role,
};
use meet_agent::AudioFrame;

fn tag(frame: &Frame) -> &'static str {
    match frame {
        Frame::Audio(_) => "audio",
        Frame::SpeechStarted => "speech-started",
        Frame::SpeechStopped => "speech-stopped",
        Frame::Interrupted => "interrupted",
        Frame::Messages { .. } => "messages",
        Frame::End => "end",
    }
}

fn audio_frame() -> Frame {
    Frame::Audio(AudioFrame {
        samples: vec![0i16; 480],
        sample_rate: 24_000,
        channels: 1,
        timestamp_ms: 0,
    })
}

/// Records every frame it sees, forwards everything.
struct RecorderStage {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl FrameProcessor for RecorderStage {
    fn name(&self) -> &str {
        self.label
    }

    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.label, tag(&frame)));
        forward(output, frame).await;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:stopped", self.label));
        Ok(())
    }
}

/// Emits one audio frame and then ends the stream from mid-chain, the way
/// the engine stage does when the service closes the connection.
struct SourceStage;

#[async_trait::async_trait]
impl FrameProcessor for SourceStage {
    fn name(&self) -> &str {
        "source"
    }

    async fn start(&mut self, output: mpsc::Sender<Frame>) -> Result<()> {
        tokio::spawn(async move {
            let _ = output.send(audio_frame()).await;
            let _ = output.send(Frame::End).await;
        });
        Ok(())
    }

    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()> {
        forward(output, frame).await;
        Ok(())
    }
}

fn params() -> PipelineParams {
    PipelineParams {
        allow_interruptions: true,
        enable_metrics: false,
    }
}

fn entries_for(log: &Arc<Mutex<Vec<String>>>, label: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.starts_with(label))
        .cloned()
        .collect()
}

#[tokio::test]
async fn test_frames_flow_in_order_through_every_stage() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(vec![
        Box::new(RecorderStage {
            label: "a",
            log: Arc::clone(&log),
        }),
        Box::new(RecorderStage {
            label: "b",
            log: Arc::clone(&log),
        }),
    ]);
    let task = PipelineTask::new(pipeline, params());

    task.queue_frame(Frame::Messages {
        messages: Vec::new(),
        trigger_response: false,
    })
    .await
    .unwrap();
    task.queue_frame(audio_frame()).await.unwrap();
    task.queue_frame(Frame::End).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), task.run())
        .await
        .expect("pipeline must terminate")
        .unwrap();

    assert_eq!(
        entries_for(&log, "a"),
        vec!["a:messages", "a:audio", "a:end", "a:stopped"]
    );
    assert_eq!(
        entries_for(&log, "b"),
        vec!["b:messages", "b:audio", "b:end", "b:stopped"]
    );
}

#[tokio::test]
async fn test_end_from_mid_chain_unwinds_every_stage() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(vec![
        Box::new(RecorderStage {
            label: "upstream",
            log: Arc::clone(&log),
        }),
        Box::new(SourceStage),
        Box::new(RecorderStage {
            label: "downstream",
            log: Arc::clone(&log),
        }),
    ]);
    let task = PipelineTask::new(pipeline, params());

    tokio::time::timeout(Duration::from_secs(5), task.run())
        .await
        .expect("pipeline must terminate")
        .unwrap();

    // The stage downstream of the source saw its frames...
    assert_eq!(
        entries_for(&log, "downstream"),
        vec!["downstream:audio", "downstream:end", "downstream:stopped"]
    );
    // ...and the stage upstream of it was still unwound.
    let upstream = entries_for(&log, "upstream");
    assert_eq!(upstream.last().unwrap(), "upstream:stopped");
}

#[tokio::test]
async fn test_canceller_unwinds_an_idle_pipeline() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(vec![Box::new(RecorderStage {
        label: "only",
        log: Arc::clone(&log),
    })]);
    let task = PipelineTask::new(pipeline, params());
    let canceller = task.canceller();

    let run = tokio::spawn(task.run());
    canceller.send(Frame::End).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("pipeline must terminate")
        .unwrap()
        .unwrap();

    assert_eq!(entries_for(&log, "only"), vec!["only:end", "only:stopped"]);
}

#[test]
fn test_seed_without_announce_is_single_silent_system_message() {
    let frames = seed_frames("Scribe", None, false);

    assert_eq!(frames.len(), 1);
    match &frames[0] {
        Frame::Messages {
            messages,
            trigger_response,
        } => {
            assert!(!trigger_response);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, Role::System);
            assert!(messages[0].content.contains("Scribe"));
            assert!(messages[0].content.contains("concise"));
        }
        other => panic!("expected a messages frame, got {:?}", other),
    }
}

#[test]
fn test_seed_with_announce_adds_triggering_introduction() {
    let frames = seed_frames("Scribe", None, true);

    assert_eq!(frames.len(), 2);
    match &frames[0] {
        Frame::Messages {
            trigger_response, ..
        } => assert!(!trigger_response),
        other => panic!("expected a messages frame, got {:?}", other),
    }
    match &frames[1] {
        Frame::Messages {
            messages,
            trigger_response,
        } => {
            assert!(trigger_response);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, Role::User);
            assert!(messages[0].content.to_lowercase().contains("introduce"));
        }
        other => panic!("expected a messages frame, got {:?}", other),
    }
}

#[test]
fn test_seed_uses_operator_prompt_verbatim() {
    let frames = seed_frames("Scribe", Some("You are the standup scribe."), false);

    match &frames[0] {
        Frame::Messages { messages, .. } => {
            assert_eq!(messages[0].content, "You are the standup scribe.");
        }
        other => panic!("expected a messages frame, got {:?}", other),
    }
}
