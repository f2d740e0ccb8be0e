#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attendance status of one student for one period.
///
/// Statuses are ranked by severity; when several records describe the same
/// student on the same day, the most severe one wins (see [`AttendanceStatus::worst`]).
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "present"))]
    Present,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "late"))]
    Late,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "absent"))]
    Absent,
    /// Excused absence.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "leave"))]
    Leave,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "sick"))]
    Sick,
    /// Away on a school activity.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "activity"))]
    Activity,
    /// Attended remotely.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "online"))]
    Online,
}

impl AttendanceStatus {
    /// All possible status values.
    pub const ALL: &'static [AttendanceStatus] = &[
        Self::Present,
        Self::Late,
        Self::Absent,
        Self::Leave,
        Self::Sick,
        Self::Activity,
        Self::Online,
    ];

    /// All statuses, most severe first.
    pub const BY_SEVERITY: &'static [AttendanceStatus] = &[
        Self::Absent,
        Self::Sick,
        Self::Leave,
        Self::Late,
        Self::Activity,
        Self::Online,
        Self::Present,
    ];

    /// Severity rank; higher is more severe.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Absent => 6,
            Self::Sick => 5,
            Self::Leave => 4,
            Self::Late => 3,
            Self::Activity => 2,
            Self::Online => 1,
            Self::Present => 0,
        }
    }

    pub fn is_more_severe_than(&self, other: &AttendanceStatus) -> bool {
        self.severity() > other.severity()
    }

    /// Reduce a set of statuses to the most severe one. `None` for an empty input.
    pub fn worst<I>(statuses: I) -> Option<AttendanceStatus>
    where
        I: IntoIterator<Item = AttendanceStatus>,
    {
        statuses.into_iter().max_by_key(|s| s.severity())
    }

    /// Returns the string representation (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::Leave => "leave",
            Self::Sick => "sick",
            Self::Activity => "activity",
            Self::Online => "online",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            AttendanceStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for AttendanceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "absent" => Ok(Self::Absent),
            "leave" => Ok(Self::Leave),
            "sick" => Ok(Self::Sick),
            "activity" => Ok(Self::Activity),
            "online" => Ok(Self::Online),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
