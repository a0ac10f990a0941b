//! # Domain Types
//!
//! Core domain types used throughout the goods catalog.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Good       │   │   AuditEvent    │   │   GoodsList     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, projectId  │   │  operation      │   │  meta           │       │
//! │  │  name, descr.   │   │  goodId, ...    │   │  goods[]        │       │
//! │  │  priority       │   │  eventTime      │   │                 │       │
//! │  │  removed        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   GoodInput     │   │  DeleteReceipt  │   │ PriorityEntry   │       │
//! │  │  name           │   │  id             │   │  id             │       │
//! │  │  description?   │   │  campaignId     │   │  priority       │       │
//! │  └─────────────────┘   │  removed        │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire shapes serialize with camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET};

// =============================================================================
// Good
// =============================================================================

/// A catalog entry scoped to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Good {
    /// Store-assigned, monotonically increasing.
    pub id: i32,

    /// Project this good belongs to.
    pub project_id: i32,

    pub name: String,

    /// Empty when the client never supplied one.
    pub description: String,

    /// Global ordering, lower first. Always `>= 1`.
    pub priority: i32,

    /// Soft-delete marker.
    pub removed: bool,

    pub created_at: DateTime<Utc>,
}

impl Good {
    /// The `(id, priority)` pair reported by reprioritize.
    pub fn priority_entry(&self) -> PriorityEntry {
        PriorityEntry {
            id: self.id,
            priority: self.priority,
        }
    }
}

/// Body of `POST /good/create` and `PATCH /good/update`.
///
/// On update a `null` or absent description keeps the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl GoodInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Delete / Reprioritize
// =============================================================================

/// Response of `DELETE /good/remove`.
///
/// The project id goes out as `campaignId`; clients depend on that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub id: i32,
    #[serde(rename = "campaignId")]
    pub project_id: i32,
    pub removed: bool,
}

/// Body of `PATCH /good/reprioritize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprioritizeRequest {
    pub new_priority: i32,
}

/// One good's priority after a reprioritize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriorityEntry {
    pub id: i32,
    pub priority: i32,
}

/// Response of `PATCH /good/reprioritize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityList {
    pub priorities: Vec<PriorityEntry>,
}

// =============================================================================
// Listing
// =============================================================================

/// Paging parameters of `GET /goods/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: DEFAULT_LIST_OFFSET,
        }
    }
}

impl ListRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Replaces a non-positive limit and a negative offset with the defaults.
    pub fn normalized(self) -> Self {
        Self {
            limit: if self.limit <= 0 {
                DEFAULT_LIST_LIMIT
            } else {
                self.limit
            },
            offset: if self.offset < 0 {
                DEFAULT_LIST_OFFSET
            } else {
                self.offset
            },
        }
    }
}

/// Totals and the effective paging of a list response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub total: i64,
    pub removed: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response of `GET /goods/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsList {
    pub meta: Meta,
    pub goods: Vec<Good>,
}

// =============================================================================
// Audit
// =============================================================================

/// Which service operation produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
    Reprioritize,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Reprioritize => "reprioritize",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a read or state change, shipped over `goods.logs`.
///
/// `eventTime` is also accepted under its older `evenTime` spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub operation: Operation,
    pub good_id: i32,
    pub project_id: i32,
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub removed: bool,
    #[serde(alias = "evenTime")]
    pub event_time: DateTime<Utc>,
}

impl AuditEvent {
    /// Snapshot of `good` as seen by `operation`.
    pub fn from_good(operation: Operation, good: &Good, at: DateTime<Utc>) -> Self {
        Self {
            operation,
            good_id: good.id,
            project_id: good.project_id,
            name: good.name.clone(),
            description: good.description.clone(),
            priority: good.priority,
            removed: good.removed,
            event_time: at,
        }
    }

    /// Delete carries only the address and the removed flag.
    pub fn from_receipt(receipt: &DeleteReceipt, at: DateTime<Utc>) -> Self {
        Self {
            operation: Operation::Delete,
            good_id: receipt.id,
            project_id: receipt.project_id,
            name: String::new(),
            description: String::new(),
            priority: 0,
            removed: receipt.removed,
            event_time: at,
        }
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Caller identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "userId")]
    pub id: uuid::Uuid,
    pub email: String,
    pub role: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_good() -> Good {
        Good {
            id: 3,
            project_id: 1,
            name: "one".to_string(),
            description: String::new(),
            priority: 1,
            removed: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_good_serializes_camel_case() {
        let json = serde_json::to_value(sample_good()).unwrap();
        assert_eq!(json["projectId"], 1);
        assert_eq!(json["removed"], false);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("project_id").is_none());
    }

    #[test]
    fn test_delete_receipt_uses_campaign_id() {
        let receipt = DeleteReceipt {
            id: 5,
            project_id: 2,
            removed: true,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        assert_eq!(json, r#"{"id":5,"campaignId":2,"removed":true}"#);
    }

    #[test]
    fn test_good_input_description_optional() {
        let input: GoodInput = serde_json::from_str(r#"{"name":"one"}"#).unwrap();
        assert_eq!(input.description, None);

        let input: GoodInput =
            serde_json::from_str(r#"{"name":"one","description":null}"#).unwrap();
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_reprioritize_request_field_name() {
        let req: ReprioritizeRequest = serde_json::from_str(r#"{"newPriority":4}"#).unwrap();
        assert_eq!(req.new_priority, 4);
    }

    #[test]
    fn test_list_request_normalized() {
        assert_eq!(ListRequest::new(0, -1).normalized(), ListRequest::new(10, 0));
        assert_eq!(ListRequest::new(-5, 3).normalized(), ListRequest::new(10, 3));
        assert_eq!(ListRequest::new(25, 50).normalized(), ListRequest::new(25, 50));
    }

    #[test]
    fn test_audit_event_accepts_legacy_time_key() {
        let raw = r#"{
            "operation": "create",
            "goodId": 3,
            "projectId": 1,
            "name": "one",
            "description": "",
            "priority": 1,
            "removed": false,
            "evenTime": "2024-05-01T12:00:00Z"
        }"#;
        let event: AuditEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.operation, Operation::Create);
        assert_eq!(event.event_time, sample_good().created_at);

        let out = serde_json::to_value(&event).unwrap();
        assert!(out.get("eventTime").is_some());
    }

    #[test]
    fn test_delete_event_is_compact() {
        let receipt = DeleteReceipt {
            id: 3,
            project_id: 1,
            removed: true,
        };
        let event = AuditEvent::from_receipt(&receipt, Utc::now());
        assert_eq!(event.operation, Operation::Delete);
        assert!(event.removed);
        assert_eq!(event.priority, 0);
        assert!(event.name.is_empty());
    }
}
