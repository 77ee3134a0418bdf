use crate::audio::AudioFrame;

/// Conversation-message role understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single conversation-history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Unit of data flowing through the processing chain, strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// PCM audio, either captured meeting audio or synthesized agent speech
    Audio(AudioFrame),
    /// Human speech onset detected by the transport VAD
    SpeechStarted,
    /// Human speech offset detected by the transport VAD
    SpeechStopped,
    /// An agent utterance was cancelled; buffered output must be flushed
    Interrupted,
    /// Conversation seed injected before live audio is processed.
    /// `trigger_response` queues an immediate engine turn; without it the
    /// messages extend history and the agent stays quiet until addressed.
    Messages {
        messages: Vec<ChatMessage>,
        trigger_response: bool,
    },
    /// Shutdown marker; every stage forwards it downstream and stops
    End,
}

/// Build the seed frames queued before the pipeline starts.
///
/// Always exactly one system-role message (operator override or generated
/// default). With `announce_on_join`, a second user-role message requests a
/// self-introduction and triggers an immediate spoken turn.
pub fn seed_frames(
    agent_name: &str,
    system_prompt: Option<&str>,
    announce_on_join: bool,
) -> Vec<Frame> {
    let system = system_prompt
        .map(str::to_string)
        .unwrap_or_else(|| default_system_prompt(agent_name));

    let mut frames = vec![Frame::Messages {
        messages: vec![ChatMessage {
            role: Role::System,
            content: system,
        }],
        trigger_response: false,
    }];

    if announce_on_join {
        frames.push(Frame::Messages {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "Please briefly introduce yourself to the meeting.".to_string(),
            }],
            trigger_response: true,
        });
    }

    frames
}

fn default_system_prompt(agent_name: &str) -> String {
    format!(
        "You are a helpful AI assistant named {} in a video meeting. \
         Listen to the conversation and participate when addressed or when \
         you have relevant information. Keep your responses concise.",
        agent_name
    )
}
