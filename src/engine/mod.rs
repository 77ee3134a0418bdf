//! Conversational engine stage.
//!
//! The realtime speech/LLM service is an external collaborator; the wire
//! protocol lives entirely behind `RealtimeEngine` and nothing else in the
//! crate knows it.

mod realtime;

pub use realtime::{
    audio_append_event, decode_pcm16, item_create_event, response_cancel_event,
    response_create_event, EngineParams, RealtimeEngine,
};
