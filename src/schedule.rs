mod edit;
mod normalize;

pub use edit::{EditError, ScheduleEdit};
pub use normalize::normalize;
