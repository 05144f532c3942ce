//! Accumulation Tests
//!
//! Tests for:
//! - Accumulation index derived from the host sample counter
//! - Samples-per-pixel budget: override vs. view budget, floor of 1
//! - Ping-pong slot parity across consecutive frames

mod common;

use common::view;
use vdb_overlay::accumulation::accumulation_index;
use vdb_overlay::host::RenderMode;
use vdb_overlay::AccumulationState;

// ============================================================================
// Accumulation Index
// ============================================================================

#[test]
fn raster_views_never_accumulate() {
    for counter in [None, Some(0), Some(3), Some(100)] {
        let state = AccumulationState::compute(&view(RenderMode::Rasterized, counter, 16), -1);
        assert_eq!(state.num_accumulations, 0);
        assert!(!state.path_tracing);
    }
}

#[test]
fn path_tracing_lags_counter_by_one() {
    let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(5), 16), -1);
    assert_eq!(state.num_accumulations, 4);
    assert!(state.path_tracing);
}

#[test]
fn zero_counter_does_not_underflow() {
    assert_eq!(accumulation_index(0), 0);
    let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(0), 16), -1);
    assert_eq!(state.num_accumulations, 0);
    assert!(state.needs_samples());
}

#[test]
fn missing_view_state_counts_as_zero() {
    let state = AccumulationState::compute(&view(RenderMode::PathTracing, None, 16), -1);
    assert_eq!(state.num_accumulations, 0);
}

// ============================================================================
// Sample Budget
// ============================================================================

#[test]
fn override_wins_when_non_negative() {
    let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(1), 16), 8);
    assert_eq!(state.max_spp, 8);
}

#[test]
fn negative_override_defers_to_view() {
    let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(1), 16), -1);
    assert_eq!(state.max_spp, 16);
}

#[test]
fn budget_never_drops_below_one() {
    let from_view = AccumulationState::compute(&view(RenderMode::PathTracing, Some(1), 0), -1);
    assert_eq!(from_view.max_spp, 1);

    let from_override = AccumulationState::compute(&view(RenderMode::PathTracing, Some(1), 16), 0);
    assert_eq!(from_override.max_spp, 1);
}

#[test]
fn converged_view_stops_sampling() {
    let budget = 4;
    for counter in 1..=budget {
        let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(counter), budget), -1);
        assert!(state.needs_samples(), "counter {counter} should still sample");
    }
    let done = AccumulationState::compute(&view(RenderMode::PathTracing, Some(budget + 1), budget), -1);
    assert!(!done.needs_samples());
}

// ============================================================================
// Slot Parity
// ============================================================================

#[test]
fn consecutive_counters_alternate_slots() {
    let slots: Vec<usize> = (1..=6)
        .map(|counter| {
            AccumulationState::compute(&view(RenderMode::PathTracing, Some(counter), 64), -1)
                .current_slot()
        })
        .collect();
    assert_eq!(slots, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn previous_slot_is_the_other_one() {
    for counter in 0..8 {
        let state = AccumulationState::compute(&view(RenderMode::PathTracing, Some(counter), 64), -1);
        assert_eq!(state.current_slot() + state.previous_slot(), 1);
    }
}
