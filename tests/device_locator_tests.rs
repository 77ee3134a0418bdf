// Unit tests for the audio device locator.
//
// The scan logic is a pure function over enumeration probes, so no audio
// host is needed here.

use anyhow::anyhow;
use meet_agent::audio::{resolve_binding, DeviceProbe};

fn probe(name: &str, max_output_channels: u16) -> anyhow::Result<DeviceProbe> {
    Ok(DeviceProbe {
        name: name.to_string(),
        max_output_channels,
    })
}

#[test]
fn test_no_markers_resolves_to_defaults() {
    let binding = resolve_binding(vec![
        probe("Built-in Microphone", 0),
        probe("Built-in Speakers", 2),
    ]);

    assert_eq!(binding.input_index, None);
    assert_eq!(binding.output_index, None);
}

#[test]
fn test_empty_device_list_resolves_to_defaults() {
    let binding = resolve_binding(Vec::new());

    assert_eq!(binding.input_index, None);
    assert_eq!(binding.output_index, None);
}

#[test]
fn test_markers_resolve_to_their_indices() {
    let binding = resolve_binding(vec![
        probe("Built-in Microphone", 0),
        probe("Monitor of BrowserOutput.monitor", 0),
        probe("BotOutput Virtual Sink", 2),
    ]);

    assert_eq!(binding.input_index, Some(1));
    assert_eq!(binding.output_index, Some(2));
}

#[test]
fn test_enumeration_errors_are_skipped_and_preserve_indices() {
    // A device that fails to enumerate still occupies its index, so matches
    // after it must line up with the host's numbering.
    let binding = resolve_binding(vec![
        Err(anyhow!("device busy")),
        probe("BrowserOutput.monitor", 0),
        Err(anyhow!("no name")),
        probe("BotOutput", 2),
    ]);

    assert_eq!(binding.input_index, Some(1));
    assert_eq!(binding.output_index, Some(3));
}

#[test]
fn test_sink_marker_requires_output_channels() {
    // The monitor of the agent sink carries the marker too but is an input
    // device; it must not be picked as the output endpoint.
    let binding = resolve_binding(vec![probe("Monitor of BotOutput", 0)]);

    assert_eq!(binding.output_index, None);
}

#[test]
fn test_plain_browser_output_is_not_the_monitor() {
    let binding = resolve_binding(vec![probe("BrowserOutput", 2)]);

    assert_eq!(binding.input_index, None);
}

#[test]
fn test_first_match_wins_per_marker() {
    let binding = resolve_binding(vec![
        probe("BrowserOutput.monitor (primary)", 0),
        probe("BrowserOutput.monitor (copy)", 0),
        probe("BotOutput A", 2),
        probe("BotOutput B", 2),
    ]);

    assert_eq!(binding.input_index, Some(0));
    assert_eq!(binding.output_index, Some(2));
}
