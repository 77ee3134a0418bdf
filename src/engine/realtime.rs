use anyhow::{Context, Result};
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

use crate::audio::AudioFrame;
use crate::pipeline::{forward, ChatMessage, Frame, FrameProcessor};

const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
const DEFAULT_MODEL: &str = "gpt-realtime-mini";

/// Sample rate of the PCM16 audio the realtime service emits.
const ENGINE_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone)]
pub struct EngineParams {
    pub model: String,
    /// Cancel the in-progress response when human speech is detected
    pub allow_interruptions: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            allow_interruptions: true,
        }
    }
}

/// Pipeline stage holding the WebSocket session to the realtime service.
///
/// Upstream audio frames become base64 PCM append events; seed messages
/// become conversation items; engine audio deltas come back out as audio
/// frames for the transport output.
pub struct RealtimeEngine {
    api_key: String,
    params: EngineParams,
    writer_tx: Option<mpsc::Sender<Message>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RealtimeEngine {
    pub fn new(api_key: String, params: EngineParams) -> Self {
        Self {
            api_key,
            params,
            writer_tx: None,
            tasks: Vec::new(),
        }
    }

    async fn send_event(&self, event: Value) -> Result<()> {
        let writer = self
            .writer_tx
            .as_ref()
            .context("engine not started")?;
        writer
            .send(Message::Text(event.to_string()))
            .await
            .map_err(|_| anyhow::anyhow!("engine connection closed"))
    }
}

#[async_trait::async_trait]
impl FrameProcessor for RealtimeEngine {
    fn name(&self) -> &str {
        "realtime-engine"
    }

    async fn start(&mut self, output: mpsc::Sender<Frame>) -> Result<()> {
        let url = format!("{}?model={}", REALTIME_URL, self.params.model);
        info!("Connecting to realtime engine ({})", self.params.model);

        let mut request = url
            .into_client_request()
            .context("Invalid realtime service URL")?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .context("API key is not a valid header value")?,
        );
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("Failed to connect to realtime engine")?;
        let (mut sink, mut stream) = ws.split();

        let (writer_tx, mut writer_rx) = mpsc::channel::<Message>(64);

        let writer = tokio::spawn(async move {
            while let Some(msg) = writer_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("Realtime engine connection error: {}", e);
                        break;
                    }
                };
                match msg {
                    Message::Text(text) => handle_server_event(&text, &output).await,
                    Message::Close(_) => {
                        info!("Realtime engine closed the connection");
                        break;
                    }
                    _ => {}
                }
            }
            // Server side is gone; unwind the rest of the chain.
            forward(&output, Frame::End).await;
        });

        writer_tx
            .send(Message::Text(session_update_event().to_string()))
            .await
            .map_err(|_| anyhow::anyhow!("engine connection closed during setup"))?;

        self.writer_tx = Some(writer_tx);
        self.tasks = vec![writer, reader];
        Ok(())
    }

    async fn process(&mut self, frame: Frame, output: &mpsc::Sender<Frame>) -> Result<()> {
        match frame {
            Frame::Audio(frame) => {
                self.send_event(audio_append_event(&frame)).await?;
            }
            Frame::Messages {
                messages,
                trigger_response,
            } => {
                for message in &messages {
                    self.send_event(item_create_event(message)).await?;
                }
                if trigger_response {
                    self.send_event(response_create_event()).await?;
                }
            }
            Frame::SpeechStarted => {
                if self.params.allow_interruptions {
                    self.send_event(response_cancel_event()).await?;
                    forward(output, Frame::Interrupted).await;
                }
            }
            Frame::SpeechStopped => {
                // Endpointing is the service's job; nothing to commit here.
            }
            Frame::End => {
                forward(output, Frame::End).await;
            }
            other => forward(output, other).await,
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the writer closes the socket; the reader ends with it.
        self.writer_tx = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }
}

async fn handle_server_event(text: &str, output: &mpsc::Sender<Frame>) {
    let event: Value = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Unparseable engine event: {}", e);
            return;
        }
    };

    match event["type"].as_str().unwrap_or_default() {
        "response.audio.delta" => {
            let Some(delta) = event["delta"].as_str() else {
                return;
            };
            match decode_pcm16(delta) {
                Ok(samples) => {
                    let frame = AudioFrame {
                        samples,
                        sample_rate: ENGINE_SAMPLE_RATE,
                        channels: 1,
                        timestamp_ms: 0,
                    };
                    forward(output, Frame::Audio(frame)).await;
                }
                Err(e) => warn!("Bad audio delta from engine: {}", e),
            }
        }
        "response.done" => debug!("Engine finished a response"),
        "error" => {
            warn!(
                "Engine error: {}",
                event["error"]["message"].as_str().unwrap_or("unknown")
            );
        }
        _ => {}
    }
}

fn session_update_event() -> Value {
    json!({
        "type": "session.update",
        "session": {
            "modalities": ["audio", "text"],
            "input_audio_format": "pcm16",
            "output_audio_format": "pcm16",
            "turn_detection": { "type": "server_vad" },
        }
    })
}

/// Encode an audio frame as an input-buffer append event.
pub fn audio_append_event(frame: &AudioFrame) -> Value {
    let pcm: Vec<u8> = frame
        .samples
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    json!({
        "type": "input_audio_buffer.append",
        "audio": base64::engine::general_purpose::STANDARD.encode(&pcm),
    })
}

/// Encode a seed message as a conversation-item create event.
pub fn item_create_event(message: &ChatMessage) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": message.role.as_str(),
            "content": [{ "type": "input_text", "text": message.content }],
        }
    })
}

pub fn response_create_event() -> Value {
    json!({ "type": "response.create" })
}

pub fn response_cancel_event() -> Value {
    json!({ "type": "response.cancel" })
}

/// Decode base64 PCM16 little-endian into samples.
pub fn decode_pcm16(encoded: &str) -> Result<Vec<i16>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("invalid base64 audio payload")?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}
