pub mod employment;
pub mod hierarchy;
pub mod permissions;
pub mod validators;

pub use employment::{EmploymentStatus, EmploymentType};
pub use hierarchy::{HierarchyError, PositionDiff, PositionState};
