use std::{cell::Cell, collections::HashMap, rc::Rc};

use super::*;
use crate::{
    EffectDefinition, ElementSchedule, RecordingEngine, RenderCall, TargetId,
};

const A: TargetId = TargetId(1);
const B: TargetId = TargetId(2);

fn definitions() -> HashMap<String, EffectDefinition> {
    [
        EffectDefinition::new("fade", 3.0),
        EffectDefinition::new("zoom", 1.0),
        EffectDefinition::new("long", 10.0),
    ]
    .into_iter()
    .map(|def| (def.name.clone(), def))
    .collect()
}

fn scheduler_with(schedule: &Schedule, config: SyncConfig) -> Scheduler<RecordingEngine> {
    let (scheduler, report) =
        Scheduler::bind(&definitions(), schedule, RecordingEngine::new(), config);
    assert!(report.is_clean());
    scheduler
}

/// A fades in over [2, 5), B over [6, 9).
fn two_fades() -> Scheduler<RecordingEngine> {
    let mut schedule = Schedule::new();
    schedule.add("fade", A, 2.0).add("fade", B, 6.0);
    scheduler_with(&schedule, SyncConfig::default())
}

fn assert_disjoint(scheduler: &Scheduler<RecordingEngine>) {
    for id in scheduler.running() {
        assert!(!scheduler.paused().contains(id), "{id:?} is both running and paused");
        assert_eq!(scheduler.state(*id), RunState::Running);
    }
    for id in scheduler.paused() {
        assert_eq!(scheduler.state(*id), RunState::Paused);
    }
}

#[test]
fn oversampled_ticks_start_once() {
    let mut scheduler = two_fades();
    for sample in [1.96, 1.98, 2.0, 2.01, 2.03, 2.04] {
        scheduler.on_tick(sample);
    }

    assert_eq!(scheduler.engine().apply_count(A, "fade"), 1);
    assert_eq!(scheduler.running(), [InstanceId(0)]);
    assert!(!scheduler.engine().has_effect(B, "fade"));
}

#[test]
fn advance_reports_only_new_starts() {
    let mut scheduler = two_fades();
    assert_eq!(scheduler.advance(2.0), vec![InstanceId(0)]);
    assert!(scheduler.advance(2.0).is_empty());
    assert!(scheduler.advance(3.0).is_empty());
    assert_eq!(scheduler.advance(6.0), vec![InstanceId(1)]);
}

#[test]
fn paused_instance_in_its_start_bucket_runs_once() {
    let mut scheduler = two_fades();
    scheduler.seek(2.0, false);
    assert_eq!(scheduler.paused(), [InstanceId(0)]);

    scheduler.advance(2.0);

    assert_eq!(scheduler.running(), [InstanceId(0)]);
    assert!(scheduler.paused().is_empty());
    assert_eq!(scheduler.engine().apply_count(A, "fade"), 1);
    assert_eq!(scheduler.engine().play_state(A), Some(PlayState::Running));
    assert_disjoint(&scheduler);
}

#[test]
fn seek_starts_mid_flight_effects_at_their_phase() {
    let mut scheduler = two_fades();

    let started = scheduler.seek(4.0, true);
    assert_eq!(started, vec![InstanceId(0)]);
    assert_eq!(scheduler.engine().phase_delay_ms(A), Some(-2000));
    assert_eq!(scheduler.running(), [InstanceId(0)]);
    assert!(scheduler.engine().has_effect(A, "fade"));

    scheduler.clear_all();

    let started = scheduler.seek(7.0, false);
    assert_eq!(started, vec![InstanceId(1)]);
    assert_eq!(scheduler.paused(), [InstanceId(1)]);
    assert_eq!(scheduler.engine().phase_delay_ms(B), Some(-1000));
    assert_eq!(scheduler.engine().play_state(B), Some(PlayState::Paused));
    assert!(scheduler.running().is_empty());
}

#[test]
fn seek_quantizes_and_uses_whole_milliseconds() {
    let mut scheduler = two_fades();
    scheduler.seek(2.33, true);
    assert_eq!(scheduler.engine().phase_delay_ms(A), Some(-300));
}

#[test]
fn seek_far_into_a_long_effect_saturates_the_delay() {
    let definitions: HashMap<String, EffectDefinition> =
        [("drift".to_string(), EffectDefinition::new("drift", 1e20))].into();
    let mut schedule = Schedule::new();
    schedule.add("drift", A, 0.0);
    let (mut scheduler, _) = Scheduler::bind(
        &definitions,
        &schedule,
        RecordingEngine::new(),
        SyncConfig::default(),
    );

    assert_eq!(scheduler.seek(1e17, true), [InstanceId(0)]);
    assert_eq!(
        scheduler.engine().phase_delay_ms(A),
        Some(i64::MIN.div_euclid(10))
    );
    assert_eq!(scheduler.running(), [InstanceId(0)]);
}

#[test]
fn seek_outside_every_effect_is_empty() {
    let mut scheduler = two_fades();
    assert!(scheduler.seek(0.5, true).is_empty());
    assert!(scheduler.seek(5.0, true).is_empty());
    assert!(scheduler.seek(120.0, false).is_empty());
    assert!(scheduler.engine().calls().is_empty());
}

#[test]
fn seek_at_exact_start_has_no_delay() {
    let mut scheduler = two_fades();
    scheduler.seek(6.0, true);
    assert_eq!(scheduler.engine().phase_delay_ms(B), Some(0));
}

#[test]
fn seek_without_clear_keeps_membership_unique() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    scheduler.seek(3.0, false);

    assert!(scheduler.running().is_empty());
    assert_eq!(scheduler.paused(), [InstanceId(0)]);
    assert_disjoint(&scheduler);
}

#[test]
fn pause_and_resume_move_between_sets() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    scheduler.advance(6.0);

    scheduler.pause_all();
    assert!(scheduler.running().is_empty());
    assert_eq!(scheduler.paused().len(), 2);
    assert_eq!(scheduler.engine().play_state(A), Some(PlayState::Paused));
    assert_eq!(scheduler.engine().play_state(B), Some(PlayState::Paused));

    scheduler.resume_all();
    assert!(scheduler.paused().is_empty());
    assert_eq!(scheduler.running().len(), 2);
    assert_eq!(scheduler.engine().play_state(A), Some(PlayState::Running));
    assert_disjoint(&scheduler);
}

#[test]
fn pause_and_resume_on_empty_sets_do_nothing() {
    let mut scheduler = two_fades();
    scheduler.pause_all();
    scheduler.resume_all();
    scheduler.clear_all();
    assert!(scheduler.engine().calls().is_empty());
}

#[test]
fn clear_all_resets_everything() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    scheduler.pause_all();
    scheduler.seek(7.0, false);
    scheduler.resume_all();
    scheduler.advance(6.0);
    scheduler.pause_all();

    scheduler.clear_all();

    assert!(scheduler.running().is_empty());
    assert!(scheduler.paused().is_empty());
    for target in [A, B] {
        assert!(scheduler.engine().is_clean(target), "{target} still styled");
        assert!(scheduler.engine().target(target).unwrap().layout_syncs > 0);
    }
    assert_eq!(scheduler.engine().removals_while_paused(), 0);
    for id in [InstanceId(0), InstanceId(1)] {
        assert_eq!(scheduler.state(id), RunState::Idle);
    }
}

#[test]
fn cleared_instances_can_replay_from_zero() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    scheduler.clear_all();
    scheduler.advance(2.0);
    assert_eq!(scheduler.engine().apply_count(A, "fade"), 2);
}

#[test]
fn resume_every_tick_can_be_disabled() {
    let mut schedule = Schedule::new();
    schedule.add("fade", A, 2.0).add("fade", B, 6.0);
    let config = SyncConfig {
        resume_on_tick: false,
        ..Default::default()
    };
    let mut scheduler = scheduler_with(&schedule, config);

    scheduler.seek(2.0, false);
    scheduler.advance(2.0);
    assert_eq!(scheduler.paused(), [InstanceId(0)]);
    assert!(scheduler.running().is_empty());

    scheduler.resume_all();
    assert_eq!(scheduler.running(), [InstanceId(0)]);
}

#[test]
fn completion_returns_instance_to_idle() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);

    let tokens = scheduler.engine_mut().complete(A);
    assert_eq!(tokens.len(), 1);
    assert!(scheduler.effect_completed(tokens[0]));

    assert!(scheduler.running().is_empty());
    assert_eq!(scheduler.state(InstanceId(0)), RunState::Idle);
    assert!(scheduler.engine().is_clean(A));
    assert!(!scheduler.effect_completed(tokens[0]));
}

#[test]
fn completion_after_clear_is_ignored() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    let tokens = scheduler.engine_mut().complete(A);
    scheduler.clear_all();
    let calls_before = scheduler.engine().calls().len();

    assert!(!scheduler.effect_completed(tokens[0]));
    assert_eq!(scheduler.engine().calls().len(), calls_before);
}

#[test]
fn stale_completion_does_not_reset_a_restart() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    let stale = scheduler.engine_mut().complete(A);
    scheduler.clear_all();
    scheduler.advance(2.0);

    assert!(!scheduler.effect_completed(stale[0]));
    assert_eq!(scheduler.running(), [InstanceId(0)]);

    let fresh = scheduler.engine_mut().complete(A);
    assert!(scheduler.effect_completed(fresh[0]));
}

#[test]
fn auto_seek_finds_long_effects_among_short_ones() {
    let mut schedule = Schedule::new();
    schedule.add("long", A, 0.0).add("zoom", B, 5.0);

    let mut auto = scheduler_with(&schedule, SyncConfig::default());
    assert_eq!(auto.seek(3.0, true), vec![InstanceId(0)]);
    assert_eq!(auto.engine().phase_delay_ms(A), Some(-3000));

    let early = SyncConfig {
        seek_scan: SeekScan::EarlyExit,
        ..Default::default()
    };
    let mut early = scheduler_with(&schedule, early);
    assert!(early.seek(3.0, true).is_empty());
}

#[test]
fn callbacks_fire_from_ticks() {
    let mut scheduler = two_fades();
    let count = Rc::new(Cell::new(0));
    let handle = count.clone();
    scheduler.register_callback(3.0, move || handle.set(handle.get() + 1));

    for sample in [2.9, 2.97, 3.0, 3.02, 3.1, 3.0] {
        scheduler.on_tick(sample);
    }
    assert_eq!(count.get(), 2);
}

#[test]
fn explicit_registry_is_owned_per_scheduler() {
    let count = Rc::new(Cell::new(0));
    let mut registry = CallbackRegistry::default();
    let handle = count.clone();
    registry.register(1.0, move || handle.set(handle.get() + 1));

    let mut first = two_fades().with_callbacks(registry);
    let mut second = two_fades();
    second.on_tick(1.0);
    assert_eq!(count.get(), 0);
    first.on_tick(1.0);
    assert_eq!(count.get(), 1);
}

#[test]
fn registry_on_another_grid_follows_the_schedule() {
    let count = Rc::new(Cell::new(0));
    let mut registry = CallbackRegistry::new(Quantizer::new(4));
    let handle = count.clone();
    registry.register(2.25, move || handle.set(handle.get() + 1));

    let mut scheduler = two_fades().with_callbacks(registry);
    assert_eq!(scheduler.callbacks.quantizer(), scheduler.index().quantizer());

    // 2.25 lands in the 2.3 bucket on a tenth-of-a-second grid.
    scheduler.on_tick(2.2);
    assert_eq!(count.get(), 0);
    scheduler.on_tick(2.3);
    assert_eq!(count.get(), 1);
}

#[test]
fn broken_entries_leave_the_rest_playable() {
    let elements = [
        ElementSchedule::new(A, "fade, zoom", "2"),
        ElementSchedule::new(B, "sparkle, fade", "1, 6"),
    ];
    let schedule = Schedule::from_elements(&elements);
    let (mut scheduler, report) = Scheduler::bind(
        &definitions(),
        &schedule,
        RecordingEngine::new(),
        SyncConfig::default(),
    );

    assert_eq!(report.skipped.len(), 2);
    assert_eq!(scheduler.index().len(), 2);

    scheduler.on_tick(2.0);
    scheduler.on_tick(6.0);
    assert!(scheduler.engine().has_effect(A, "fade"));
    assert!(scheduler.engine().has_effect(B, "fade"));
    assert_eq!(scheduler.seek(7.0, true).len(), 1);
}

#[test]
fn start_registers_completion_observer() {
    let mut scheduler = two_fades();
    scheduler.advance(2.0);
    let calls = scheduler.engine().calls();
    assert!(matches!(calls[0], RenderCall::Apply { target, .. } if target == A));
    assert!(matches!(
        calls[1],
        RenderCall::Observe { target, token } if target == A && token.generation == 1
    ));
}
