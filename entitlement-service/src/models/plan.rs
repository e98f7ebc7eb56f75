//! Plan catalog model.

use serde::{Serialize, Serializer};

use crate::models::{ResourceType, Tier};

/// Per-resource limit for a tier. Stored as `-1` (unlimited) or a
/// non-negative ceiling, but always matched as this enum in code so the
/// sentinel is never treated as a numeric ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    At(i64),
}

impl Limit {
    /// Decode the stored sentinel representation.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Limit::Unlimited
        } else {
            Limit::At(raw)
        }
    }

    /// Encode to the stored sentinel representation.
    pub fn raw(&self) -> i64 {
        match self {
            Limit::Unlimited => -1,
            Limit::At(n) => *n,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Whether recording `quantity` more units on top of `used` stays
    /// within this limit.
    pub fn permits(&self, used: i64, quantity: i64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::At(n) => used + quantity <= *n,
        }
    }

    /// Remaining quota given `used` units consumed.
    pub fn remaining(&self, used: i64) -> Limit {
        match self {
            Limit::Unlimited => Limit::Unlimited,
            Limit::At(n) => Limit::At((n - used).max(0)),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Limit::Unlimited => serializer.serialize_str("unlimited"),
            Limit::At(n) => serializer.serialize_i64(*n),
        }
    }
}

/// Per-resource-type limits for a tier.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub content: Limit,
    pub social_posts: Limit,
    pub emails: Limit,
    pub affiliate_links: Limit,
}

impl PlanLimits {
    pub fn for_resource(&self, resource: ResourceType) -> Limit {
        match resource {
            ResourceType::Content => self.content,
            ResourceType::SocialPost => self.social_posts,
            ResourceType::Email => self.emails,
            ResourceType::AffiliateLink => self.affiliate_links,
        }
    }
}

/// Catalog entry for a subscription tier. Immutable once loaded; there is
/// no runtime mutation path.
#[derive(Debug, Clone)]
pub struct Plan {
    pub tier: Tier,
    pub name: &'static str,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    pub limits: PlanLimits,
    pub features: &'static [&'static str],
    pub popular: bool,
}
