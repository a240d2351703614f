pub mod analytics;
pub mod assignments;
pub mod assistant;
pub mod backup;
pub mod core;
pub mod passes;
pub mod question_bank;
pub mod setup;
pub mod staff;
pub mod submissions;
pub mod timetable;
