pub mod api;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod groups;
pub mod modules;
pub mod planning;
pub mod scheduling;
pub mod schools;
pub mod situations;
pub mod uploads;
pub mod users;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
