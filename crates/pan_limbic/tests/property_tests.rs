//! Property-based tests for the mood engine.
//!
//! Verifies that intensity and valence stay within bounds for arbitrary event
//! sequences, and that failure events never change the label.

use chrono::{Duration, TimeZone, Utc};
use pan_core::config::MoodConfig;
use pan_core::Polarity;
use pan_limbic::{MoodEngine, MoodEvent};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_polarity() -> impl Strategy<Value = Polarity> {
    prop_oneof![
        Just(Polarity::Positive),
        Just(Polarity::Negative),
        Just(Polarity::Inquisitive),
        Just(Polarity::Neutral),
    ]
}

fn arb_event() -> impl Strategy<Value = MoodEvent> {
    prop_oneof![
        arb_polarity().prop_map(MoodEvent::Sentiment),
        Just(MoodEvent::IdleDecay),
        (-50i64..=50).prop_map(MoodEvent::AffinityShift),
        Just(MoodEvent::CapabilityUnavailable),
        Just(MoodEvent::Unrecognized),
    ]
}

// ============================================================================
// Bound properties
// ============================================================================

proptest! {
    #[test]
    fn intensity_and_valence_stay_in_bounds(
        events in prop::collection::vec((arb_event(), 0i64..600), 1..60)
    ) {
        let config = MoodConfig::default();
        let (min, max) = (config.min_intensity, config.max_intensity);
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut engine = MoodEngine::new(config, start);
        let mut now = start;
        for (event, gap) in events {
            now += Duration::seconds(gap);
            let state = engine.apply(event, now);
            prop_assert!(state.intensity >= min && state.intensity <= max);
            prop_assert!(state.valence >= -1.0 && state.valence <= 1.0);
        }
    }

    #[test]
    fn failure_events_hold_the_label(
        warmup in prop::collection::vec(arb_event(), 0..20),
        hold in prop_oneof![Just(MoodEvent::CapabilityUnavailable), Just(MoodEvent::Unrecognized)],
        gap in 0i64..3600,
    ) {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut engine = MoodEngine::new(MoodConfig::default(), start);
        for event in warmup {
            engine.apply(event, start);
        }
        let label = engine.label();
        let valence = engine.state().valence;
        engine.apply(hold, start + Duration::seconds(gap));
        prop_assert_eq!(engine.label(), label);
        prop_assert_eq!(engine.state().valence, valence);
    }

    #[test]
    fn same_events_same_state(events in prop::collection::vec(arb_event(), 0..30)) {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut a = MoodEngine::new(MoodConfig::default(), start);
        let mut b = MoodEngine::new(MoodConfig::default(), start);
        for (i, event) in events.into_iter().enumerate() {
            let at = start + Duration::seconds(i as i64 * 7);
            a.apply(event, at);
            b.apply(event, at);
        }
        prop_assert_eq!(a.state(), b.state());
    }
}
