//! Target-motion simulation and wire-record core for the synthetic
//! vessel-track sender.
//!
//! A single simulated vessel is dead-reckoned from operator input, driven
//! through its track lifecycle by [`controller::MotionController`] and
//! emitted as [`wire::WireBatch`] messages through a [`prelude::Publisher`].

pub mod assembler;
pub mod controller;
pub mod kinematics;
pub mod prelude;
pub mod target;
pub mod telemetry;
pub mod transport;
pub mod wire;

pub use assembler::{AssemblerConfig, MessageAssembler};
pub use controller::{ControllerState, Effect, Event, MotionController, OperatorForm};
pub use prelude::{OperatorInput, Publisher};
