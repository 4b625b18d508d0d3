pub mod form;
pub mod motion;
pub mod quickfill;
pub mod state;

pub use form::{CompassPoint, FormField, OperatorForm, DEFAULT_PUBLISH_INTERVAL};
pub use motion::MotionController;
pub use quickfill::{quick_fill, QuickFill};
pub use state::{ControllerState, Effect, Event, TimerKind, Transition, TICK};
