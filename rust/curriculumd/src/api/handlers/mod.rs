pub mod calendars;
pub mod competences;
pub mod dashboard;
pub mod health;
pub mod learning_situations;
pub mod modules;
pub mod planning_units;
pub mod regions;
pub mod scheduled_situations;
pub mod school_types;
pub mod schools;
pub mod subjects;
pub mod terms;
pub mod uploads;
pub mod users;
pub mod years;
