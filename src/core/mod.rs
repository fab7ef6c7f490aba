pub mod error;
pub mod types;

pub use error::{ManagerError, Result};
pub use types::{DataFileRef, LaunchUnitRef, PortAssignment, Role, ShardKey};
