//! Static plan catalog.
//!
//! Loaded once at process start and never mutated at runtime. Prices and
//! limits are the product's published tiers.

use once_cell::sync::Lazy;

use crate::models::{Limit, Plan, PlanLimits, Tier};

static PLANS: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![
        Plan {
            tier: Tier::Free,
            name: "Free",
            monthly_price_cents: 0,
            yearly_price_cents: 0,
            limits: PlanLimits {
                content: Limit::At(10),
                social_posts: Limit::At(50),
                emails: Limit::At(100),
                affiliate_links: Limit::At(25),
            },
            features: &[
                "AI content generation",
                "Social media posting",
                "Email campaigns",
                "Basic analytics",
                "Email support",
            ],
            popular: false,
        },
        Plan {
            tier: Tier::Starter,
            name: "Starter",
            monthly_price_cents: 2_900,
            yearly_price_cents: 29_000,
            limits: PlanLimits {
                content: Limit::At(100),
                social_posts: Limit::At(500),
                emails: Limit::At(1_000),
                affiliate_links: Limit::At(100),
            },
            features: &[
                "Everything in Free",
                "Advanced analytics",
                "Content scheduling",
                "SEO optimization",
                "Priority support",
            ],
            popular: true,
        },
        Plan {
            tier: Tier::Professional,
            name: "Professional",
            monthly_price_cents: 7_900,
            yearly_price_cents: 79_000,
            limits: PlanLimits {
                content: Limit::At(500),
                social_posts: Limit::At(2_000),
                emails: Limit::At(5_000),
                affiliate_links: Limit::At(500),
            },
            features: &[
                "Everything in Starter",
                "A/B testing",
                "Custom templates",
                "Team collaboration",
                "Phone support",
            ],
            popular: false,
        },
        Plan {
            tier: Tier::Enterprise,
            name: "Enterprise",
            monthly_price_cents: 19_900,
            yearly_price_cents: 199_000,
            limits: PlanLimits {
                content: Limit::Unlimited,
                social_posts: Limit::Unlimited,
                emails: Limit::Unlimited,
                affiliate_links: Limit::Unlimited,
            },
            features: &[
                "Everything in Professional",
                "White-label solution",
                "Custom integrations",
                "Dedicated support",
                "SLA guarantee",
            ],
            popular: false,
        },
    ]
});

/// All plans, ascending by monthly price.
pub fn plans() -> &'static [Plan] {
    &PLANS
}

/// Catalog entry for a tier.
pub fn get_plan(tier: Tier) -> &'static Plan {
    PLANS
        .iter()
        .find(|p| p.tier == tier)
        .expect("plan catalog covers every tier")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;

    #[test]
    fn plans_are_ordered_by_ascending_price() {
        let prices: Vec<i64> = plans().iter().map(|p| p.monthly_price_cents).collect();
        let mut sorted = prices.clone();
        sorted.sort();
        assert_eq!(prices, sorted);
        assert_eq!(plans().len(), 4);
    }

    #[test]
    fn free_tier_limits_match_published_caps() {
        let plan = get_plan(Tier::Free);
        assert_eq!(plan.limits.for_resource(ResourceType::Content), Limit::At(10));
        assert_eq!(
            plan.limits.for_resource(ResourceType::SocialPost),
            Limit::At(50)
        );
        assert_eq!(plan.limits.for_resource(ResourceType::Email), Limit::At(100));
        assert_eq!(
            plan.limits.for_resource(ResourceType::AffiliateLink),
            Limit::At(25)
        );
    }

    #[test]
    fn enterprise_is_unlimited_everywhere() {
        let plan = get_plan(Tier::Enterprise);
        for resource in ResourceType::ALL {
            assert!(plan.limits.for_resource(resource).is_unlimited());
        }
    }

    #[test]
    fn sentinel_round_trips_through_raw() {
        assert_eq!(Limit::from_raw(-1), Limit::Unlimited);
        assert_eq!(Limit::from_raw(10), Limit::At(10));
        assert_eq!(Limit::Unlimited.raw(), -1);
        assert_eq!(Limit::At(500).raw(), 500);
    }

    #[test]
    fn unlimited_permits_any_usage() {
        assert!(Limit::Unlimited.permits(0, 1));
        assert!(Limit::Unlimited.permits(i64::MAX - 1, 1));
        assert!(!Limit::At(10).permits(10, 1));
        assert!(Limit::At(10).permits(9, 1));
        assert!(!Limit::At(10).permits(5, 6));
    }
}
