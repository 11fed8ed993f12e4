#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Employment status of a staff member.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")
)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "active"))]
    Active,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "inactive"))]
    Inactive,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "on_leave"))]
    OnLeave,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "terminated"))]
    Terminated,
}

impl EmploymentStatus {
    pub const ALL: &'static [EmploymentStatus] = &[
        Self::Active,
        Self::Inactive,
        Self::OnLeave,
        Self::Terminated,
    ];

    /// Still on the payroll: working or on leave.
    pub fn is_employed(&self) -> bool {
        matches!(self, Self::Active | Self::OnLeave)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::OnLeave => "on_leave",
            Self::Terminated => "terminated",
        }
    }
}

impl Default for EmploymentStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract type under which a staff member is employed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")
)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "full_time"))]
    FullTime,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "part_time"))]
    PartTime,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "contract"))]
    Contract,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "internship"))]
    Internship,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::PartTime => "part_time",
            Self::Contract => "contract",
            Self::Internship => "internship",
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid employment status string.
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
            EmploymentStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for EmploymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "on_leave" => Ok(Self::OnLeave),
            "terminated" => Ok(Self::Terminated),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
