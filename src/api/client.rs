//! API client for communicating with the gear service REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests to fetch lead, gear, inspection, and roster data. All calls
//! go through the [`Transport`], which handles bearer tokens and session
//! refresh transparently.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::try_join;
use serde::Deserialize;
use tracing::debug;

use crate::models::{
    Department, Firefighter, GearHistoryEntry, GearItem, Inspection, Lead, LeadStatus,
    NewFirefighter, NewInspection, NewRepair, Repair, RosterResponse,
};

use super::request::{ApiRequest, MultipartField};
use super::transport::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Number of days to look back for leads.
/// Two weeks captures jobs still being written up without flooding the list.
const LEAD_LOOKBACK_DAYS: i64 = 14;

/// Number of days to look ahead for leads.
/// Two months covers the typical department scheduling horizon.
const LEAD_LOOKAHEAD_DAYS: i64 = 60;

/// API client for the gear service.
/// Clone is cheap - the underlying transport shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
}

impl ApiClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// The underlying transport, for wiring host hooks at startup.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // ===== Leads =====

    /// Fetch leads assigned to a technician in a window around today
    pub async fn fetch_leads(&self, technician_id: i64) -> Result<Vec<Lead>> {
        let now = Utc::now();
        let from_date = (now - chrono::Duration::days(LEAD_LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let to_date = (now + chrono::Duration::days(LEAD_LOOKAHEAD_DAYS))
            .format("%Y-%m-%d")
            .to_string();

        debug!(from = %from_date, to = %to_date, "Fetching leads");

        let body = serde_json::json!({
            "fromDate": from_date,
            "toDate": to_date,
            "assignedTechnicianId": technician_id
        });

        let request = ApiRequest::post("/leads/search").json(&body)?;
        let response = self
            .transport
            .execute(request)
            .await
            .context("Failed to fetch leads")?;

        let text = response.text().await.context("Failed to read leads response body")?;
        parse_lead_list(&text)
    }

    /// Fetch detailed lead info
    pub async fn fetch_lead_detail(&self, lead_id: i64) -> Result<Lead> {
        self.transport
            .get_json(&format!("/leads/{}", lead_id))
            .await
            .with_context(|| format!("Failed to fetch lead {}", lead_id))
    }

    /// Update a lead's workflow status
    pub async fn update_lead_status(&self, lead_id: i64, status: LeadStatus) -> Result<Lead> {
        let body = serde_json::json!({ "status": status });
        self.transport
            .put_json(&format!("/leads/{}/status", lead_id), &body)
            .await
            .with_context(|| format!("Failed to update status of lead {}", lead_id))
    }

    // ===== Gear =====

    /// Look up a gear item by its scanned serial number
    pub async fn fetch_gear_by_serial(&self, serial: &str) -> Result<GearItem> {
        self.transport
            .get_json(&format!("/gear/serial/{}", serial))
            .await
            .with_context(|| format!("Failed to look up gear serial {}", serial))
    }

    /// Fetch all gear tracked for a department
    pub async fn fetch_department_gear(&self, department_id: i64) -> Result<Vec<GearItem>> {
        let response = self
            .transport
            .execute(ApiRequest::get(format!(
                "/departments/{}/gear",
                department_id
            )))
            .await
            .context("Failed to fetch department gear")?;

        let text = response.text().await?;
        parse_gear_list(&text)
    }

    /// Fetch the service history of a gear item
    pub async fn fetch_gear_history(&self, gear_id: i64) -> Result<Vec<GearHistoryEntry>> {
        let response = self
            .transport
            .execute(ApiRequest::get(format!("/gear/{}/history", gear_id)))
            .await
            .with_context(|| format!("Failed to fetch history for gear {}", gear_id))?;

        let text = response.text().await?;
        parse_history_list(&text)
    }

    // ===== Inspections & repairs =====

    /// Record an inspection outcome
    pub async fn submit_inspection(&self, inspection: &NewInspection) -> Result<Inspection> {
        self.transport
            .post_json("/inspections", inspection)
            .await
            .context("Failed to submit inspection")
    }

    /// Record a repair
    pub async fn submit_repair(&self, repair: &NewRepair) -> Result<Repair> {
        self.transport
            .post_json("/repairs", repair)
            .await
            .context("Failed to submit repair")
    }

    /// Attach a photo to an inspection record.
    /// The transport strips any preset content type so the multipart boundary
    /// is generated correctly.
    pub async fn upload_inspection_photo(
        &self,
        inspection_id: i64,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let request = ApiRequest::post(format!("/inspections/{}/photos", inspection_id))
            .multipart(vec![MultipartField {
                name: "photo".to_string(),
                file_name: Some(file_name.to_string()),
                mime_type: Some(mime_type.to_string()),
                data: bytes,
            }]);

        self.transport
            .execute(request)
            .await
            .with_context(|| format!("Failed to upload photo for inspection {}", inspection_id))?;
        Ok(())
    }

    // ===== Roster =====

    /// Fetch the firefighter roster for a department
    pub async fn fetch_roster(&self, department_id: i64) -> Result<Vec<Firefighter>> {
        let response: RosterResponse = self
            .transport
            .get_json(&format!("/departments/{}/roster", department_id))
            .await
            .context("Failed to fetch roster")?;
        Ok(response.members)
    }

    /// Add a firefighter to a department roster
    pub async fn create_firefighter(
        &self,
        department_id: i64,
        firefighter: &NewFirefighter,
    ) -> Result<Firefighter> {
        self.transport
            .post_json(
                &format!("/departments/{}/roster", department_id),
                firefighter,
            )
            .await
            .context("Failed to create firefighter")
    }

    /// Update an existing roster entry
    pub async fn update_firefighter(&self, firefighter: &Firefighter) -> Result<Firefighter> {
        self.transport
            .put_json(&format!("/firefighters/{}", firefighter.id), firefighter)
            .await
            .with_context(|| format!("Failed to update firefighter {}", firefighter.id))
    }

    /// Fetch a department profile
    pub async fn fetch_department(&self, department_id: i64) -> Result<Department> {
        self.transport
            .get_json(&format!("/departments/{}", department_id))
            .await
            .with_context(|| format!("Failed to fetch department {}", department_id))
    }

    /// Fetch a department profile together with its roster
    pub async fn fetch_department_overview(
        &self,
        department_id: i64,
    ) -> Result<(Department, Vec<Firefighter>)> {
        try_join!(
            self.fetch_department(department_id),
            self.fetch_roster(department_id)
        )
    }
}

// The backend is inconsistent about list envelopes: newer endpoints return a
// bare array, older ones wrap it. Try both before giving up.

fn parse_lead_list(text: &str) -> Result<Vec<Lead>> {
    if let Ok(leads) = serde_json::from_str::<Vec<Lead>>(text) {
        return Ok(leads);
    }

    #[derive(Deserialize)]
    struct LeadsWrapper {
        #[serde(default)]
        leads: Vec<Lead>,
        #[serde(default)]
        data: Vec<Lead>,
    }

    if let Ok(wrapper) = serde_json::from_str::<LeadsWrapper>(text) {
        if !wrapper.leads.is_empty() {
            return Ok(wrapper.leads);
        }
        if !wrapper.data.is_empty() {
            return Ok(wrapper.data);
        }
        return Ok(vec![]);
    }

    Err(anyhow::anyhow!(
        "Failed to parse leads response. Response starts with: {}",
        &text[..text.len().min(200)]
    ))
}

fn parse_gear_list(text: &str) -> Result<Vec<GearItem>> {
    if let Ok(items) = serde_json::from_str::<Vec<GearItem>>(text) {
        return Ok(items);
    }

    #[derive(Deserialize)]
    struct GearWrapper {
        #[serde(default)]
        items: Vec<GearItem>,
        #[serde(default)]
        data: Vec<GearItem>,
    }

    if let Ok(wrapper) = serde_json::from_str::<GearWrapper>(text) {
        if !wrapper.items.is_empty() {
            return Ok(wrapper.items);
        }
        return Ok(wrapper.data);
    }

    Err(anyhow::anyhow!(
        "Failed to parse gear response. Response starts with: {}",
        &text[..text.len().min(200)]
    ))
}

fn parse_history_list(text: &str) -> Result<Vec<GearHistoryEntry>> {
    if let Ok(entries) = serde_json::from_str::<Vec<GearHistoryEntry>>(text) {
        return Ok(entries);
    }

    #[derive(Deserialize)]
    struct HistoryWrapper {
        #[serde(default)]
        entries: Vec<GearHistoryEntry>,
    }

    let wrapper: HistoryWrapper =
        serde_json::from_str(text).context("Failed to parse gear history response")?;
    Ok(wrapper.entries)
}
