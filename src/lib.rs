pub mod audio;
pub mod config;
pub mod engine;
pub mod meet;
pub mod pipeline;
pub mod session;

pub use audio::{
    locate_devices, resolve_binding, AudioDeviceBinding, AudioFrame, AudioTransport, DeviceProbe,
    TransportParams, VadEvent, VadGate, VadParams,
};
pub use config::Config;
pub use engine::{EngineParams, RealtimeEngine};
pub use meet::{
    join_meeting, normalize_meeting_url, BrowserSettings, ChromeMeetingPage, JoinConfig,
    JoinOutcome, MeetingPage, MeetingTarget,
};
pub use pipeline::{
    seed_frames, ChatMessage, Frame, FrameProcessor, Pipeline, PipelineParams, PipelineRunner,
    PipelineTask, Role,
};
pub use session::AgentSession;
