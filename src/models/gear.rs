use serde::{Deserialize, Serialize};

/// Service condition reported by the gear service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GearCondition {
    InService,
    OutOfService,
    Retired,
}

impl std::fmt::Display for GearCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GearCondition::InService => write!(f, "In service"),
            GearCondition::OutOfService => write!(f, "Out of service"),
            GearCondition::Retired => write!(f, "Retired"),
        }
    }
}

/// One piece of turnout gear tracked by serial number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearItem {
    pub id: i64,
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
    /// Category string from the backend catalog (COAT, TROUSERS, HELMET, ...)
    pub kind: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "manufactureDate")]
    pub manufacture_date: Option<String>,
    pub condition: Option<GearCondition>,
    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<i64>,
    #[serde(rename = "assignedToName")]
    pub assigned_to_name: Option<String>,
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
    #[serde(rename = "lastInspectionDate")]
    pub last_inspection_date: Option<String>,
    #[serde(rename = "retiredAt")]
    pub retired_at: Option<String>,
}

impl GearItem {
    /// Short label for lists: kind and serial, e.g. "COAT TN-2210-0471".
    pub fn display_name(&self) -> String {
        match self.kind {
            Some(ref kind) => format!("{} {}", kind, self.serial_number),
            None => self.serial_number.clone(),
        }
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.condition, Some(GearCondition::Retired)) || self.retired_at.is_some()
    }
}

/// One entry in a gear item's service history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearHistoryEntry {
    pub id: Option<i64>,
    /// What happened: INSPECTION, REPAIR, ASSIGNMENT, RETIREMENT.
    pub action: Option<String>,
    #[serde(rename = "occurredAt")]
    pub occurred_at: Option<String>,
    #[serde(rename = "technicianName")]
    pub technician_name: Option<String>,
    pub notes: Option<String>,
}
