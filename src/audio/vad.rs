//! Voice-activity gate with start/stop hysteresis.
//!
//! A speech segment begins only after confidence stays at or above the
//! threshold continuously for `start_secs`, and ends only after sub-threshold
//! audio persists for `stop_secs`. Both directions debounce noise-driven
//! flapping.

/// Speech endpointing thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadParams {
    /// Continuous above-threshold time required to enter speech
    pub start_secs: f64,
    /// Continuous below-threshold time required to leave speech
    pub stop_secs: f64,
    /// Confidence threshold in [0, 1]
    pub confidence: f64,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            start_secs: 0.2,
            stop_secs: 0.2,
            confidence: 0.7,
        }
    }
}

/// Edge emitted by the gate when the speech state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    SpeechStarted,
    SpeechStopped,
}

#[derive(Debug)]
pub struct VadGate {
    params: VadParams,
    speaking: bool,
    above_secs: f64,
    below_secs: f64,
}

impl VadGate {
    pub fn new(params: VadParams) -> Self {
        Self {
            params,
            speaking: false,
            above_secs: 0.0,
            below_secs: 0.0,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one analysis window of `elapsed_secs` duration with the given
    /// confidence. Returns an event when the gate flips state.
    pub fn observe(&mut self, confidence: f64, elapsed_secs: f64) -> Option<VadEvent> {
        if confidence >= self.params.confidence {
            self.below_secs = 0.0;
            if !self.speaking {
                self.above_secs += elapsed_secs;
                if self.above_secs >= self.params.start_secs {
                    self.speaking = true;
                    self.above_secs = 0.0;
                    return Some(VadEvent::SpeechStarted);
                }
            }
        } else {
            self.above_secs = 0.0;
            if self.speaking {
                self.below_secs += elapsed_secs;
                if self.below_secs >= self.params.stop_secs {
                    self.speaking = false;
                    self.below_secs = 0.0;
                    return Some(VadEvent::SpeechStopped);
                }
            }
        }

        None
    }
}

/// Crude energy-based speech confidence in [0, 1].
///
/// Conversational speech peaks well below full-scale RMS; a level around
/// -20 dBFS already maps to 1.0 so the threshold range stays usable.
pub fn frame_confidence(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    let rms = (sum_squares / samples.len() as f64).sqrt();

    (rms * 10.0).min(1.0)
}
