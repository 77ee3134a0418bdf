pub mod devices;
pub mod transport;
pub mod vad;

pub use devices::{locate_devices, resolve_binding, AudioDeviceBinding, DeviceProbe};
pub use transport::{AudioFrame, AudioTransport, TransportInput, TransportOutput, TransportParams};
pub use vad::{frame_confidence, VadEvent, VadGate, VadParams};
