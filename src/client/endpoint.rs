//! Fixed mapping from resource and report types to endpoint paths.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

use crate::error::TsheetsError;

/// Remote entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    Users,
    CurrentUser,
    EffectiveSettings,
    Jobcodes,
    JobcodeAssignments,
    #[strum(serialize = "customfields")]
    CustomFields,
    #[strum(serialize = "customfielditems")]
    CustomFieldItems,
    Timesheets,
    TimesheetsDeleted,
    Geolocations,
}

impl ResourceType {
    /// Path segment below the API root.
    pub fn path(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::CurrentUser => "current_user",
            Self::EffectiveSettings => "effective_settings",
            Self::Jobcodes => "jobcodes",
            Self::JobcodeAssignments => "jobcode_assignments",
            Self::CustomFields => "customfields",
            Self::CustomFieldItems => "customfielditems",
            Self::Timesheets => "timesheets",
            Self::TimesheetsDeleted => "timesheets_deleted",
            Self::Geolocations => "geolocations",
        }
    }

    /// Whether the remote accepts DELETE on this resource.
    pub fn supports_delete(self) -> bool {
        matches!(self, Self::Timesheets)
    }

    /// Parse a resource name, failing for names outside the known set.
    pub fn parse(name: &str) -> Result<Self, TsheetsError> {
        Self::from_str(name).map_err(|_| TsheetsError::UnknownEndpoint(name.to_string()))
    }
}

/// Report categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ReportType {
    Project,
    Payroll,
}

impl ReportType {
    pub fn path(self) -> &'static str {
        match self {
            Self::Project => "reports/project",
            Self::Payroll => "reports/payroll",
        }
    }

    pub fn parse(name: &str) -> Result<Self, TsheetsError> {
        Self::from_str(name).map_err(|_| TsheetsError::UnknownEndpoint(name.to_string()))
    }
}
