//! Check-in and attendance core.
//!
//! Everything here takes its connection and term explicitly. HTTP concerns
//! live in `handlers`.

pub mod aggregate;
pub mod error;
pub mod feed;
pub mod maintenance;
pub mod roster;
pub mod session;
pub mod token;
pub mod validator;
pub mod writer;

pub use error::CheckinError;
pub use feed::{CheckInEvent, CheckInFeed};
pub use roster::RosterService;
pub use session::{NewSession, SessionManager};
pub use token::TokenSigner;
pub use validator::{ScanOutcome, ScanRejection, ScanRequest, ScanValidator};
pub use writer::{AttendanceWriter, DraftRecord, RecordBatch, RecordFilter, SaveSummary};
