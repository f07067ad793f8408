use proptest::prelude::*;
use tickwise::services::adaptive_budget::{MAX_BUDGET, MIN_BUDGET};
use tickwise::services::{adaptive_budget, reserve_multiplier, room_scaling_multiplier};
use tickwise::{AdaptiveBudgetConfig, FrequencyCategory};

fn category() -> impl Strategy<Value = FrequencyCategory> {
    prop_oneof![
        Just(FrequencyCategory::High),
        Just(FrequencyCategory::Medium),
        Just(FrequencyCategory::Low),
    ]
}

proptest! {
    /// Property: every budget fraction stays inside [0.01, 1.0]
    #[test]
    fn prop_budget_is_bounded(
        category in category(),
        domains in 0u32..10_000,
        reserve in 0u32..20_000,
    ) {
        let budget = adaptive_budget(category, domains, reserve, &AdaptiveBudgetConfig::default());
        prop_assert!((MIN_BUDGET..=MAX_BUDGET).contains(&budget), "budget {budget}");
    }

    /// Property: more workload domains never shrink the budget
    #[test]
    fn prop_budget_monotonic_in_domains(
        category in category(),
        domains in 1u32..5_000,
        extra in 1u32..5_000,
        reserve in 0u32..20_000,
    ) {
        let config = AdaptiveBudgetConfig::default();
        let smaller = adaptive_budget(category, domains, reserve, &config);
        let larger = adaptive_budget(category, domains + extra, reserve, &config);
        prop_assert!(larger >= smaller, "{larger} < {smaller}");
    }

    /// Property: the scale multiplier never exceeds its cap
    #[test]
    fn prop_scale_capped(domains in 0u32..u32::MAX) {
        let config = AdaptiveBudgetConfig::default();
        let multiplier = room_scaling_multiplier(domains, &config);
        prop_assert!(multiplier >= 1.0);
        prop_assert!(multiplier <= config.room_scaling.max_multiplier);
    }

    /// Property: a critical reserve budgets strictly less than a normal one
    #[test]
    fn prop_critical_reserve_conserves(
        category in category(),
        domains in 1u32..20,
        critical in 0u32..500,
        normal in 2_000u32..9_000,
    ) {
        let config = AdaptiveBudgetConfig::default();
        let conserving = adaptive_budget(category, domains, critical, &config);
        let regular = adaptive_budget(category, domains, normal, &config);
        prop_assert!(conserving < regular, "{conserving} >= {regular}");
    }

    /// Property: the reserve multiplier never decreases as the bank fills
    #[test]
    fn prop_reserve_multiplier_monotonic(reserve in 0u32..20_000, extra in 0u32..20_000) {
        let config = AdaptiveBudgetConfig::default();
        prop_assert!(
            reserve_multiplier(reserve + extra, &config) >= reserve_multiplier(reserve, &config)
        );
    }
}

#[test]
fn test_baseline_budget() {
    let config = AdaptiveBudgetConfig::default();
    assert!((adaptive_budget(FrequencyCategory::High, 1, 5000, &config) - 0.25).abs() < 1e-12);
    assert!((adaptive_budget(FrequencyCategory::Medium, 1, 5000, &config) - 0.06).abs() < 1e-12);
    assert!((adaptive_budget(FrequencyCategory::Low, 1, 5000, &config) - 0.05).abs() < 1e-12);
}
