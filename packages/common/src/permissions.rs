//! Permission catalog.
//!
//! Access groups grant permissions by codename. The catalog is the closed set of
//! codenames a group may carry; superusers implicitly hold all of them.

/// A grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDef {
    pub codename: &'static str,
    pub description: &'static str,
}

const fn perm(codename: &'static str, description: &'static str) -> PermissionDef {
    PermissionDef {
        codename,
        description,
    }
}

pub const POSITION_VIEW: &str = "position:view";
pub const POSITION_CREATE: &str = "position:create";
pub const POSITION_EDIT: &str = "position:edit";
pub const POSITION_DELETE: &str = "position:delete";
pub const DIVISION_VIEW: &str = "division:view";
pub const DIVISION_CREATE: &str = "division:create";
pub const DIVISION_EDIT: &str = "division:edit";
pub const DIVISION_DELETE: &str = "division:delete";
pub const USER_VIEW: &str = "user:view";
pub const USER_MANAGE: &str = "user:manage";
pub const GROUP_VIEW: &str = "group:view";
pub const GROUP_MANAGE: &str = "group:manage";

pub const CATALOG: &[PermissionDef] = &[
    perm(POSITION_VIEW, "Can view positions"),
    perm(POSITION_CREATE, "Can create positions"),
    perm(POSITION_EDIT, "Can edit positions and their group links"),
    perm(POSITION_DELETE, "Can deactivate and delete positions"),
    perm(DIVISION_VIEW, "Can view divisions"),
    perm(DIVISION_CREATE, "Can create divisions"),
    perm(DIVISION_EDIT, "Can edit divisions"),
    perm(DIVISION_DELETE, "Can delete divisions"),
    perm(USER_VIEW, "Can view employees"),
    perm(USER_MANAGE, "Can manage employees"),
    perm(GROUP_VIEW, "Can view access groups"),
    perm(GROUP_MANAGE, "Can manage access groups"),
    // Dashboard
    perm("dashboard:view_company", "Can view company-wide dashboard"),
    perm("dashboard:view_division", "Can view division dashboard"),
    perm("dashboard:view_own", "Can view own dashboard"),
    perm("dashboard:export", "Can export dashboard data"),
    // Attendance
    perm("attendance:approve", "Can approve attendance"),
    perm("attendance:view_all_reports", "Can view all attendance reports"),
    // Leave
    perm("leave:approve_all", "Can approve all leaves"),
    perm("leave:reject", "Can reject leave"),
    perm("leave:cancel_approved", "Can cancel approved leave"),
    // Reports
    perm("report:export_attendance", "Can export attendance report"),
    perm("report:export_leave", "Can export leave report"),
    perm("report:export_payroll", "Can export payroll report"),
    perm("report:view_analytics", "Can view analytics dashboard"),
];

/// Whether `codename` is part of the catalog.
pub fn is_known(codename: &str) -> bool {
    CATALOG.iter().any(|p| p.codename == codename)
}

/// Every codename in the catalog.
pub fn all_codenames() -> Vec<String> {
    CATALOG.iter().map(|p| p.codename.to_string()).collect()
}
