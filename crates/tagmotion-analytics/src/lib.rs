//! Motion analytics for tag sample streams.
//!
//! [`StreamPipeline`] is the causal, per-stream path fed frame by frame.
//! [`analyze_window`] recomputes a stored window from scratch.

pub mod calibration;
pub mod conditioner;
pub mod filter;
pub mod integrator;
pub mod jump;
pub mod kinematics;
pub mod phase;
pub mod pipeline;
pub mod speed;
pub mod step;
pub mod window;

pub use calibration::{auto_calibrate, CalibrationOffset, Calibrator};
pub use conditioner::{Conditioned, ConditionedSample, SignalConditioner};
pub use integrator::{AxisTriple, KinematicIntegrator, ReportRecord};
pub use jump::{detect_jumps, JumpDetector, JumpEvent};
pub use phase::{classify_phase, MovementPhase, SpeedHistory};
pub use pipeline::{FrameOutput, LiveMetrics, StreamPipeline};
pub use speed::SpeedEstimator;
pub use step::{detect_steps, StepDetector, StepEvent};
pub use window::{analyze_window, WindowAnalytics};
