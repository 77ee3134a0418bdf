// Tests for the realtime-engine wire encoding.

use meet_agent::engine::{
    audio_append_event, decode_pcm16, item_create_event, response_cancel_event,
    response_create_event,
};
use meet_agent::pipeline::{ChatMessage, Role};
use meet_agent::AudioFrame;

#[test]
fn test_audio_frame_becomes_append_event() {
    let frame = AudioFrame {
        samples: vec![1, -2, 300, -32768],
        sample_rate: 24_000,
        channels: 1,
        timestamp_ms: 40,
    };

    let event = audio_append_event(&frame);

    assert_eq!(event["type"], "input_audio_buffer.append");
    let decoded = decode_pcm16(event["audio"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, frame.samples);
}

#[test]
fn test_seed_message_becomes_conversation_item() {
    let message = ChatMessage {
        role: Role::System,
        content: "You are a meeting assistant.".to_string(),
    };

    let event = item_create_event(&message);

    assert_eq!(event["type"], "conversation.item.create");
    assert_eq!(event["item"]["type"], "message");
    assert_eq!(event["item"]["role"], "system");
    assert_eq!(
        event["item"]["content"][0]["text"],
        "You are a meeting assistant."
    );
}

#[test]
fn test_user_role_serializes_as_user() {
    let message = ChatMessage {
        role: Role::User,
        content: "Introduce yourself.".to_string(),
    };

    assert_eq!(item_create_event(&message)["item"]["role"], "user");
}

#[test]
fn test_response_control_events() {
    assert_eq!(response_create_event()["type"], "response.create");
    assert_eq!(response_cancel_event()["type"], "response.cancel");
}

#[test]
fn test_decode_rejects_invalid_payload() {
    assert!(decode_pcm16("not base64!!!").is_err());
}

#[test]
fn test_decode_ignores_trailing_odd_byte() {
    // 3 bytes decode to exactly one i16; the dangling byte is dropped.
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode([0x34, 0x12, 0xff]);
    assert_eq!(decode_pcm16(&encoded).unwrap(), vec![0x1234]);
}
