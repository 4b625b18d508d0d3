pub mod projector;
pub mod ramp;

pub use projector::{project, GeoPosition};
pub use ramp::{average_speed, next_speed, RampProfile};
