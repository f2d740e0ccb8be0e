pub mod assignment;
pub mod attendance;
pub mod classroom;
pub mod qr_session;
pub mod student;
pub mod subject;
pub mod term;
pub mod timetable_entry;
