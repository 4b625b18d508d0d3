pub mod class;
pub mod identity;
pub mod snapshot;

pub use class::{SourceChannel, TargetClass, TrackStatus};
pub use identity::{ensure_identity, GeneratedIdentity, IdTemplate, IdentityKind, IdentityPolicy};
pub use snapshot::{Kinematics, SourceIds, TargetSnapshot};
