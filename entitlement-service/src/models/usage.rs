//! Usage metering model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::MeteringError;
use crate::models::{Limit, SubscriptionStatus, Tier};

/// Metered resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Content,
    SocialPost,
    Email,
    AffiliateLink,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Content,
        ResourceType::SocialPost,
        ResourceType::Email,
        ResourceType::AffiliateLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Content => "content",
            ResourceType::SocialPost => "social_post",
            ResourceType::Email => "email",
            ResourceType::AffiliateLink => "affiliate_link",
        }
    }

    /// Strict conversion for caller-supplied values.
    pub fn parse(s: &str) -> Result<Self, MeteringError> {
        match s {
            "content" => Ok(ResourceType::Content),
            "social_post" => Ok(ResourceType::SocialPost),
            "email" => Ok(ResourceType::Email),
            "affiliate_link" => Ok(ResourceType::AffiliateLink),
            _ => Err(MeteringError::UnknownResourceType(s.to_string())),
        }
    }
}

/// Append-only usage event. Never updated or deleted; aggregated by
/// summing quantity grouped by (account, resource type, period).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageEvent {
    pub event_id: Uuid,
    pub account_id: Uuid,
    pub resource_type: String,
    pub quantity: i32,
    pub recorded_utc: DateTime<Utc>,
    pub period_id: Uuid,
}

/// Result of an advisory entitlement check.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementResult {
    pub allowed: bool,
    pub used: i64,
    pub limit: Limit,
    pub remaining: Limit,
}

/// Why a record attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    LimitExceeded,
}

/// Result of an authoritative record attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

/// Current-period usage for one resource type.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    pub used: i64,
    pub limit: Limit,
    pub remaining: Limit,
}

/// Current-period usage across all resource types, for display.
#[derive(Debug, Clone, Serialize)]
pub struct UsageOverview {
    pub account_id: Uuid,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub usage: BTreeMap<&'static str, ResourceUsage>,
}
