use serde::{Deserialize, Serialize};

/// A firefighter on a department roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Firefighter {
    pub id: i64,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "badgeNumber")]
    pub badge_number: Option<String>,
    pub rank: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "mobilePhone")]
    pub mobile_phone: Option<String>,
    pub active: Option<bool>,
    // Garment sizes, used when assigning replacement gear
    #[serde(rename = "coatSize")]
    pub coat_size: Option<String>,
    #[serde(rename = "trouserSize")]
    pub trouser_size: Option<String>,
    #[serde(rename = "bootSize")]
    pub boot_size: Option<String>,
    #[serde(rename = "gloveSize")]
    pub glove_size: Option<String>,
}

impl Firefighter {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

/// Roster creation/update payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewFirefighter {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "badgeNumber")]
    pub badge_number: Option<String>,
    pub rank: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "mobilePhone")]
    pub mobile_phone: Option<String>,
}

/// A fire department served by the shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "stationCount")]
    pub station_count: Option<i32>,
    #[serde(rename = "contactEmail")]
    pub contact_email: Option<String>,
}

// Response from /departments/{id}/roster (members plus department echo)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterResponse {
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
    pub members: Vec<Firefighter>,
}
