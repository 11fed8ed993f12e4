use thiserror::Error;

/// Prefix of the access-group label mirrored from a position name.
pub const GROUP_LABEL_PREFIX: &str = "Position: ";

/// Maximum length of a position or division code.
pub const MAX_CODE_LEN: usize = 20;

/// Maximum length of a position name.
pub const MAX_NAME_LEN: usize = 100;

/// Inclusive range of valid authority levels.
pub const LEVEL_RANGE: std::ops::RangeInclusive<i32> = 1..=i16::MAX as i32;

/// Violations of the authority-level ordering between a position and its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error(
        "parent position must have lower level than this position (parent level {parent_level}, level {level})"
    )]
    ParentNotLower { parent_level: i32, level: i32 },

    #[error(
        "subordinate position '{code}' (level {subordinate_level}) must have higher level than {level}"
    )]
    SubordinateNotHigher {
        code: String,
        subordinate_level: i32,
        level: i32,
    },
}

/// Check that a position at `level` may sit under a parent at `parent_level`.
///
/// A root position (no parent) is always valid.
pub fn validate(parent_level: Option<i32>, level: i32) -> Result<(), HierarchyError> {
    match parent_level {
        Some(parent_level) if parent_level >= level => {
            Err(HierarchyError::ParentNotLower {
                parent_level,
                level,
            })
        }
        _ => Ok(()),
    }
}

/// Check that every direct subordinate still outranks a position moved to `level`.
pub fn validate_subordinates<'a, I>(level: i32, subordinates: I) -> Result<(), HierarchyError>
where
    I: IntoIterator<Item = (&'a str, i32)>,
{
    for (code, subordinate_level) in subordinates {
        if subordinate_level <= level {
            return Err(HierarchyError::SubordinateNotHigher {
                code: code.to_string(),
                subordinate_level,
                level,
            });
        }
    }
    Ok(())
}

/// Label of the access group linked to a position named `name`.
pub fn group_label(name: &str) -> String {
    format!("{GROUP_LABEL_PREFIX}{name}")
}

/// Canonical form of a position or division code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// The hierarchy-relevant state of a stored position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionState {
    pub name: String,
    pub code: String,
    pub level: i32,
    pub parent_id: Option<i32>,
    pub is_active: bool,
}

/// A requested change to a position. `None` leaves the field untouched;
/// `parent_id: Some(None)` detaches the position from its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionDiff {
    pub name: Option<String>,
    pub code: Option<String>,
    pub level: Option<i32>,
    pub parent_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl PositionDiff {
    /// Drop every field whose requested value equals the current one.
    pub fn against(self, current: &PositionState) -> Self {
        Self {
            name: self.name.filter(|n| *n != current.name),
            code: self
                .code
                .map(|c| normalize_code(&c))
                .filter(|c| *c != current.code),
            level: self.level.filter(|l| *l != current.level),
            parent_id: self.parent_id.filter(|p| *p != current.parent_id),
            is_active: self.is_active.filter(|a| *a != current.is_active),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the linked group label has to follow.
    pub fn renames(&self) -> bool {
        self.name.is_some()
    }

    /// Whether the hierarchy ordering has to be re-validated.
    pub fn moves(&self) -> bool {
        self.level.is_some() || self.parent_id.is_some()
    }

    /// The state the position would have once this diff is applied.
    pub fn prospective(&self, current: &PositionState) -> PositionState {
        PositionState {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            code: self.code.clone().unwrap_or_else(|| current.code.clone()),
            level: self.level.unwrap_or(current.level),
            parent_id: self.parent_id.unwrap_or(current.parent_id),
            is_active: self.is_active.unwrap_or(current.is_active),
        }
    }
}
