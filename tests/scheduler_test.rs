//! Property tests for the slot planner

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use autoposter::config::PublishingConfig;
use autoposter::scheduler::{
    calculate_next_post_time, get_today_slots, interval_seconds, NextPostReason, Slot,
};

fn window() -> impl Strategy<Value = (u32, u32)> {
    (0u32..23).prop_flat_map(|start| (Just(start), (start + 1)..=23))
}

fn now() -> impl Strategy<Value = NaiveDateTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    })
}

fn publishing(posts_per_day: u32, window: (u32, u32), interval_min: u64) -> PublishingConfig {
    PublishingConfig {
        posts_per_day,
        publish_window: window,
        interval_min,
        ..PublishingConfig::default()
    }
}

// ============================================================================
// Slots
// ============================================================================

proptest! {
    #[test]
    fn test_single_post_is_window_start(window in window()) {
        let slots = get_today_slots(1, window);
        prop_assert_eq!(slots, vec![Slot::new(window.0, 0)]);
    }

    #[test]
    fn test_slots_evenly_spaced(n in 2u32..=12, window in window()) {
        let slots = get_today_slots(n, window);
        let interval = interval_seconds(n, window);

        prop_assert_eq!(slots.len(), n as usize);
        prop_assert_eq!(slots[0], Slot::new(window.0, 0));
        prop_assert!(slots.last().unwrap().seconds() <= i64::from(window.1) * 3600);

        for pair in slots.windows(2) {
            let gap = pair[1].seconds() - pair[0].seconds();
            prop_assert!(gap > 0, "slots must increase: {:?}", pair);
            prop_assert!((gap - interval).abs() < 60, "gap {} vs interval {}", gap, interval);
        }
    }

    #[test]
    fn test_slots_are_idempotent(n in 1u32..=12, window in window()) {
        prop_assert_eq!(get_today_slots(n, window), get_today_slots(n, window));
    }
}

// ============================================================================
// Next post time
// ============================================================================

proptest! {
    #[test]
    fn test_next_post_is_pure(
        n in 1u32..=6,
        window in window(),
        count in 0usize..8,
        now in now(),
    ) {
        let config = publishing(n, window, 1800);
        prop_assert_eq!(
            calculate_next_post_time(now, count, &config),
            calculate_next_post_time(now, count, &config)
        );
    }

    #[test]
    fn test_limit_reached_is_tomorrow_start(
        n in 1u32..=6,
        window in window(),
        extra in 0usize..3,
        now in now(),
    ) {
        let config = publishing(n, window, 1800);
        let next = calculate_next_post_time(now, n as usize + extra, &config);

        let tomorrow = now.date().succ_opt().unwrap().and_hms_opt(window.0, 0, 0).unwrap();
        prop_assert_eq!(next.at, tomorrow);
        prop_assert_eq!(next.reason, NextPostReason::LimitReached);
    }

    #[test]
    fn test_next_post_is_in_future(
        n in 1u32..=6,
        window in window(),
        count in 0usize..6,
        interval_min in 60u64..7200,
        now in now(),
    ) {
        let config = publishing(n, window, interval_min);
        let next = calculate_next_post_time(now, count, &config);
        prop_assert!(next.at > now);
        prop_assert!(next.at - now <= Duration::days(2));
    }
}

#[test]
fn test_nine_am_with_nothing_published_uses_interval_min() {
    let config = publishing(3, (8, 20), 1800);
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();

    let next = calculate_next_post_time(now, 0, &config);
    assert_eq!(next.at, now + Duration::seconds(1800));
    assert_eq!(next.reason, NextPostReason::InWindow);
    assert_eq!(next.time_str(), "09:30");
}
