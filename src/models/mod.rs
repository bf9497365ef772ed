//! Data models for gear service entities.
//!
//! This module contains the data structures used to represent
//! inspection-shop data including:
//!
//! - `Lead`: scheduled jobs at fire departments
//! - `GearItem`, `GearHistoryEntry`: turnout gear tracked by serial number
//! - `Inspection`, `Repair`: recorded outcomes and their submission payloads
//! - `Firefighter`, `Department`: roster management

pub mod firefighter;
pub mod gear;
pub mod inspection;
pub mod lead;

pub use firefighter::{Department, Firefighter, NewFirefighter, RosterResponse};
pub use gear::{GearCondition, GearHistoryEntry, GearItem};
pub use inspection::{
    Inspection, InspectionFinding, InspectionOutcome, NewInspection, NewRepair, Repair,
};
pub use lead::{Lead, LeadStatus};
