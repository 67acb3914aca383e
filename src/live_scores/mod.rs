pub mod ncaa;
pub mod provider;
pub mod schedule;

pub use ncaa::NcaaScoreboard;
pub use provider::{ScheduleSource, ScoreboardSource};
pub use schedule::{CachedSchedule, CollegeBasketballData};
