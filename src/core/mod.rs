pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::care_day;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PetConfig;
