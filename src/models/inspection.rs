use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionOutcome {
    Passed,
    FailedRepairable,
    FailedRetired,
}

impl std::fmt::Display for InspectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionOutcome::Passed => write!(f, "Passed"),
            InspectionOutcome::FailedRepairable => write!(f, "Failed - repairable"),
            InspectionOutcome::FailedRetired => write!(f, "Failed - retired"),
        }
    }
}

/// A single defect noted during an inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionFinding {
    /// Defect code from the NFPA 1851 checklist, e.g. "THERMAL_DAMAGE".
    pub code: String,
    pub description: Option<String>,
    /// Where on the garment, e.g. "left sleeve cuff".
    pub location: Option<String>,
}

/// Inspection submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewInspection {
    #[serde(rename = "gearId")]
    pub gear_id: i64,
    #[serde(rename = "leadId")]
    pub lead_id: Option<i64>,
    pub outcome: InspectionOutcome,
    pub findings: Vec<InspectionFinding>,
    pub notes: Option<String>,
    #[serde(rename = "inspectedAt")]
    pub inspected_at: DateTime<Utc>,
}

/// A stored inspection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: i64,
    #[serde(rename = "gearId")]
    pub gear_id: i64,
    #[serde(rename = "leadId")]
    pub lead_id: Option<i64>,
    #[serde(rename = "technicianId")]
    pub technician_id: Option<i64>,
    #[serde(rename = "technicianName")]
    pub technician_name: Option<String>,
    pub outcome: Option<InspectionOutcome>,
    #[serde(default)]
    pub findings: Vec<InspectionFinding>,
    pub notes: Option<String>,
    #[serde(rename = "inspectedAt")]
    pub inspected_at: Option<String>,
}

/// Repair submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewRepair {
    #[serde(rename = "gearId")]
    pub gear_id: i64,
    #[serde(rename = "inspectionId")]
    pub inspection_id: Option<i64>,
    pub description: String,
    #[serde(rename = "partsUsed")]
    pub parts_used: Vec<String>,
    pub completed: bool,
    #[serde(rename = "repairedAt")]
    pub repaired_at: DateTime<Utc>,
}

/// A stored repair record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repair {
    pub id: i64,
    #[serde(rename = "gearId")]
    pub gear_id: i64,
    #[serde(rename = "inspectionId")]
    pub inspection_id: Option<i64>,
    #[serde(rename = "technicianName")]
    pub technician_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "partsUsed", default)]
    pub parts_used: Vec<String>,
    pub completed: Option<bool>,
    #[serde(rename = "repairedAt")]
    pub repaired_at: Option<String>,
}
