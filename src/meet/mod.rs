//! Meeting join: the admission state machine and the automated browser page
//! it drives.
//!
//! The state machine in `join` only sees the `MeetingPage` trait, so the
//! retry policy is testable without a real browser; `chrome` is the CDP
//! implementation used in production.

mod chrome;
mod join;

pub use chrome::{BrowserSettings, ChromeMeetingPage};
pub use join::{
    dismiss_popup, enter_display_name, is_admission_label, join_meeting, normalize_meeting_url,
    poll_admission, Admission, JoinConfig, JoinOutcome, MeetingPage, MeetingTarget,
    FAILURE_SCREENSHOT_PATH,
};
