pub mod attendance;
pub mod checkin;
pub mod maintenance;
pub mod roster;
pub mod session;
pub mod summary;
pub mod term;
