// Tests for configuration defaults and derived settings.
//
// `Config` is plain serde data; deserializing from a value map exercises the
// same path the environment source uses without racing on process env vars.

use meet_agent::Config;
use serde_json::json;
use std::time::Duration;

fn required_only() -> Config {
    serde_json::from_value(json!({
        "meeting_url": "meet.example/abc-defg",
        "openai_api_key": "sk-test",
    }))
    .unwrap()
}

#[test]
fn test_defaults_with_required_keys_only() {
    let cfg = required_only();

    assert_eq!(cfg.agent_name, "AI Assistant");
    assert_eq!(cfg.agent_image, None);
    assert_eq!(cfg.system_prompt, None);
    assert!(!cfg.announce_on_join);
    assert!(cfg.allow_interruptions);
    assert_eq!(cfg.vad_start_secs, 0.2);
    assert_eq!(cfg.vad_stop_secs, 0.2);
    assert_eq!(cfg.vad_confidence, 0.7);
    assert_eq!(cfg.join_wait_secs, 300);
    assert_eq!(cfg.join_poll_secs, 2);
    assert_eq!(cfg.browser_executable, None);
}

#[test]
fn test_missing_required_key_is_an_error() {
    let result: Result<Config, _> = serde_json::from_value(json!({
        "meeting_url": "meet.example/abc-defg",
    }));
    assert!(result.is_err());

    let result: Result<Config, _> = serde_json::from_value(json!({
        "openai_api_key": "sk-test",
    }));
    assert!(result.is_err());
}

#[test]
fn test_derived_settings_carry_overrides() {
    let cfg: Config = serde_json::from_value(json!({
        "meeting_url": "meet.example/abc-defg",
        "openai_api_key": "sk-test",
        "agent_name": "Scribe",
        "agent_image": "https://example.com/avatar.png",
        "announce_on_join": true,
        "allow_interruptions": false,
        "vad_start_secs": 0.5,
        "vad_stop_secs": 0.8,
        "vad_confidence": 0.9,
        "join_wait_secs": 30,
        "join_poll_secs": 1,
        "browser_executable": "/usr/bin/chromium",
    }))
    .unwrap();

    let target = cfg.meeting_target();
    assert_eq!(target.url, "meet.example/abc-defg");
    assert_eq!(target.display_name, "Scribe");
    assert_eq!(target.avatar.as_deref(), Some("https://example.com/avatar.png"));

    let join = cfg.join_config();
    assert_eq!(join.deadline, Duration::from_secs(30));
    assert_eq!(join.poll_interval, Duration::from_secs(1));

    let vad = cfg.vad_params();
    assert_eq!(vad.start_secs, 0.5);
    assert_eq!(vad.stop_secs, 0.8);
    assert_eq!(vad.confidence, 0.9);

    assert_eq!(
        cfg.browser_settings().executable.as_deref(),
        Some("/usr/bin/chromium")
    );
    assert!(cfg.announce_on_join);
    assert!(!cfg.allow_interruptions);
}
