//! Planned changes for declared cloud resources

use serde::{Deserialize, Serialize};

/// A planned change for one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    /// Declared resource name
    pub resource: String,

    /// Type of change to perform
    pub change_type: ChangeType,

    /// Drifted field paths (empty for create/no-op)
    pub fields: Vec<String>,

    /// Description of the change
    pub description: String,
}

/// Type of change to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and recreate the resource
    Replace,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Create => write!(f, "create"),
            ChangeType::Update => write!(f, "update"),
            ChangeType::Replace => write!(f, "replace"),
            ChangeType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all changes to be applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// List of changes to perform
    pub changes: Vec<Change>,
}

impl Plan {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    /// Whether the plan has any changes
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.change_type != ChangeType::NoOp)
    }

    /// Get changes by type
    pub fn changes_by_type(&self, change_type: ChangeType) -> Vec<&Change> {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.changes_by_type(ChangeType::Create).len(),
            update: self.changes_by_type(ChangeType::Update).len(),
            replace: self.changes_by_type(ChangeType::Replace).len(),
            no_change: self.changes_by_type(ChangeType::NoOp).len(),
        }
    }
}

/// Summary of planned changes
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} unchanged",
            self.create, self.update, self.replace, self.no_change
        )
    }
}
