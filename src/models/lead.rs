use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    Scheduled,
    EnRoute,
    OnSite,
    Completed,
    Cancelled,
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadStatus::Scheduled => write!(f, "Scheduled"),
            LeadStatus::EnRoute => write!(f, "En route"),
            LeadStatus::OnSite => write!(f, "On site"),
            LeadStatus::Completed => write!(f, "Completed"),
            LeadStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A scheduled inspection/repair job at a fire department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
    #[serde(rename = "departmentName")]
    pub department_name: Option<String>,
    #[serde(rename = "stationName")]
    pub station_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[serde(rename = "scheduledDate")]
    pub scheduled_date: Option<String>,
    pub status: Option<LeadStatus>,
    #[serde(rename = "gearCount")]
    pub gear_count: Option<i32>,
    #[serde(rename = "contactName")]
    pub contact_name: Option<String>,
    #[serde(rename = "contactPhone")]
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl Lead {
    pub fn is_open(&self) -> bool {
        !matches!(
            self.status,
            Some(LeadStatus::Completed) | Some(LeadStatus::Cancelled)
        )
    }

    /// One-line site label for lists.
    pub fn site_display(&self) -> String {
        match (&self.department_name, &self.station_name) {
            (Some(dept), Some(station)) => format!("{} - {}", dept, station),
            (Some(dept), None) => dept.clone(),
            (None, Some(station)) => station.clone(),
            (None, None) => format!("Lead #{}", self.id),
        }
    }
}
