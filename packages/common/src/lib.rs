pub mod attendance_status;
pub mod geo;

pub use attendance_status::{AttendanceStatus, ParseStatusError};
pub use geo::GeoPoint;
