use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::{info, warn};

/// Name marker for the monitor of the sink the browser plays meeting audio
/// into. The agent listens to the meeting by reading this device as input.
pub const MEETING_MONITOR_MARKER: &str = "BrowserOutput.monitor";

/// Name marker for the virtual sink the agent speaks into. Its monitor is the
/// browser's microphone, so the matching device must expose output channels.
pub const AGENT_SINK_MARKER: &str = "BotOutput";

/// Resolved audio endpoints for one session. `None` means the platform
/// default device is used. Resolved once, immutable afterward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioDeviceBinding {
    /// Device the agent reads meeting audio from
    pub input_index: Option<usize>,
    /// Device the agent writes synthesized speech to
    pub output_index: Option<usize>,
}

/// What device enumeration reports about a single device.
#[derive(Debug, Clone)]
pub struct DeviceProbe {
    pub name: String,
    pub max_output_channels: u16,
}

/// Match enumerated devices against the virtual-device markers.
///
/// Device indices are positional: an entry that failed to enumerate still
/// occupies its index, so later matches line up with the host's numbering.
/// Enumeration errors are logged and skipped, never propagated.
pub fn resolve_binding<I>(probes: I) -> AudioDeviceBinding
where
    I: IntoIterator<Item = Result<DeviceProbe>>,
{
    let mut binding = AudioDeviceBinding::default();

    for (index, probe) in probes.into_iter().enumerate() {
        let probe = match probe {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Error checking device {}: {}", index, e);
                continue;
            }
        };

        info!("{}: {}", index, probe.name);

        if binding.input_index.is_none() && probe.name.contains(MEETING_MONITOR_MARKER) {
            binding.input_index = Some(index);
        }

        if binding.output_index.is_none()
            && probe.name.contains(AGENT_SINK_MARKER)
            && probe.max_output_channels > 0
        {
            binding.output_index = Some(index);
        }
    }

    if binding.input_index.is_none() {
        warn!(
            "{} not found. Using default input device.",
            MEETING_MONITOR_MARKER
        );
    }
    if binding.output_index.is_none() {
        warn!(
            "{} not found. Using default output device.",
            AGENT_SINK_MARKER
        );
    }

    binding
}

/// Scan the system's audio devices for the virtual-device markers.
///
/// Logs the full device list for operator diagnosis. The audio host handle is
/// scoped to this call and released before returning.
pub fn locate_devices() -> Result<AudioDeviceBinding> {
    let host = cpal::default_host();
    let devices = host.devices().context("Failed to enumerate audio devices")?;

    info!("Available audio devices:");

    let probes = devices.map(|device| -> Result<DeviceProbe> {
        let name = device.name().context("device name unavailable")?;
        let max_output_channels = device
            .supported_output_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);
        Ok(DeviceProbe {
            name,
            max_output_channels,
        })
    });

    Ok(resolve_binding(probes))
}
