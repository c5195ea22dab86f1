use crate::test_support::{animation, assert_approx, doll_data_with, rotate, translate};
use crate::{
    Animation, AnimationState, AnimationStateEvent, Error, Event, EventTimeline, MAX_TRACKS,
    MixDurationTable, Skeleton, SkeletonData, StateEvent,
};
use std::sync::Arc;

fn event_animation(name: &str, duration: f32, times: &[f32]) -> Animation {
    let mut anim = animation(name, Vec::new());
    anim.duration = duration;
    anim.event_timeline = Some(EventTimeline {
        events: times
            .iter()
            .map(|&time| Event {
                time,
                data: 0,
                name: "step".to_string(),
                int_value: 0,
                float_value: 0.0,
                string: None,
            })
            .collect(),
    });
    anim
}

/// `wait` holds the body at x = 0, `pick` at x = 20; `wave` turns it 0 -> 90 over one second.
fn doll() -> Arc<SkeletonData> {
    doll_data_with(vec![
        animation(
            "wait",
            vec![translate(1, &[(0.0, 0.0, 10.0), (1.0, 0.0, 10.0)])],
        ),
        animation(
            "pick",
            vec![translate(1, &[(0.0, 20.0, 10.0), (1.0, 20.0, 10.0)])],
        ),
        animation("wave", vec![rotate(1, &[(0.0, 0.0), (1.0, 90.0)])]),
        event_animation("walk", 1.0, &[0.0, 0.5]),
    ])
}

fn state_with_mix(data: &Arc<SkeletonData>, from: &str, to: &str, mix: f32) -> AnimationState {
    let mut table = MixDurationTable::new(data.clone());
    table.set_mix(from, to, mix).unwrap();
    AnimationState::new(table)
}

fn posed(state: &AnimationState, data: &Arc<SkeletonData>) -> Skeleton {
    let mut skeleton = Skeleton::new(data.clone());
    state.apply(&mut skeleton);
    skeleton.update_world_transform();
    skeleton
}

fn kinds(events: &[StateEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| match &e.kind {
            AnimationStateEvent::Event(event) => format!("{}:event@{}", e.animation, event.time),
            kind => format!("{}:{kind:?}", e.animation),
        })
        .collect()
}

#[test]
fn unknown_animation_and_bad_track_are_errors() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));

    assert!(matches!(
        state.set_animation(0, "fly", true),
        Err(Error::UnknownAnimation { ref name }) if name == "fly"
    ));
    assert!(matches!(
        state.set_animation(MAX_TRACKS, "wait", true),
        Err(Error::InvalidTrackIndex { index }) if index == MAX_TRACKS
    ));
    assert!(state.current(0).is_none());
    assert_eq!(state.tracks_len(), 0);
}

#[test]
fn empty_state_leaves_setup_pose() {
    let data = doll();
    let state = AnimationState::new(MixDurationTable::new(data.clone()));
    let skeleton = posed(&state, &data);
    assert_approx(skeleton.bones[1].x, 0.0);
    assert_approx(skeleton.bones[1].y, 10.0);
    assert_approx(skeleton.bones[1].rotation, 0.0);
}

#[test]
fn non_looping_entry_clamps_and_holds_the_last_key() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data.clone()));
    state.set_animation(0, "wave", false).unwrap();
    state.update(5.0);

    let entry = state.current(0).unwrap();
    assert_approx(entry.time, 1.0);
    assert!(entry.is_complete());
    assert_approx(posed(&state, &data).bones[1].rotation, 90.0);
}

#[test]
fn looping_entry_is_periodic() {
    let data = doll();
    let mut a = AnimationState::new(MixDurationTable::new(data.clone()));
    let mut b = AnimationState::new(MixDurationTable::new(data.clone()));
    a.set_animation(0, "wave", true).unwrap();
    b.set_animation(0, "wave", true).unwrap();
    a.update(0.25);
    b.update(1.25);

    assert_approx(a.current(0).unwrap().time, 0.25);
    assert_approx(b.current(0).unwrap().time, 0.25);
    assert_approx(
        posed(&a, &data).bones[1].rotation,
        posed(&b, &data).bones[1].rotation,
    );
    assert_approx(posed(&a, &data).bones[1].rotation, 22.5);
}

#[test]
fn crossfade_blends_halfway_at_half_the_mix() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.1);
    state.set_animation(0, "wait", true).unwrap();
    state.update(0.5);
    state.set_animation(0, "pick", true).unwrap();

    assert_eq!(state.previous(0).unwrap().animation_name, "wait");
    assert_approx(state.current(0).unwrap().mix_duration, 0.1);

    state.update(0.05);
    assert_approx(state.current(0).unwrap().mix_alpha(), 0.5);
    let skeleton = posed(&state, &data);
    assert_approx(skeleton.bones[1].x, 10.0);
    assert_approx(skeleton.bones[1].y, 10.0);
}

#[test]
fn crossfade_completes_and_drops_the_previous_entry() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.1);
    state.set_animation(0, "wait", true).unwrap();
    state.update(0.5);
    state.set_animation(0, "pick", true).unwrap();
    state.update(0.05);
    state.drain_events();

    state.update(0.06);
    let entry = state.current(0).unwrap();
    assert!(state.previous(0).is_none());
    assert!(entry.mix_time <= entry.mix_duration);
    assert_approx(posed(&state, &data).bones[1].x, 20.0);
    assert_eq!(kinds(&state.drain_events()), vec!["wait:End"]);
}

#[test]
fn previous_entry_keeps_playing_during_the_mix() {
    let data = doll();
    let mut state = state_with_mix(&data, "wave", "pick", 1.0);
    state.set_animation(0, "wave", false).unwrap();
    state.update(0.2);
    state.set_animation(0, "pick", true).unwrap();
    state.update(0.2);

    assert_approx(state.previous(0).unwrap().time, 0.4);
    // wave at 0.4 is 36 degrees; mixed 20% toward the setup rotation beneath
    assert_approx(posed(&state, &data).bones[1].rotation, 28.8);
}

#[test]
fn unlisted_pair_cuts_instantly() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.1);
    state.set_animation(0, "pick", true).unwrap();
    state.set_animation(0, "wait", true).unwrap();

    assert!(state.previous(0).is_none());
    assert_approx(posed(&state, &data).bones[1].x, 0.0);
}

#[test]
fn explicit_mix_overrides_the_table() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data.clone()));
    state.set_animation(0, "wait", true).unwrap();
    state.set_animation_with_mix(0, "pick", true, 0.4).unwrap();
    state.update(0.1);

    assert_approx(posed(&state, &data).bones[1].x, 5.0);
    assert!(matches!(
        state.set_animation_with_mix(0, "wait", true, -1.0),
        Err(Error::InvalidValue { .. })
    ));
}

#[test]
fn resetting_the_same_animation_restarts_without_mixing() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.1);
    state.set_animation(0, "wait", true).unwrap();
    state.set_animation(0, "pick", true).unwrap();
    state.update(0.03);
    assert!(state.previous(0).is_some());

    state.set_animation(0, "pick", true).unwrap();
    let entry = state.current(0).unwrap();
    assert!(state.previous(0).is_none());
    assert_approx(entry.time, 0.0);
    assert_approx(entry.mix_duration, 0.0);
    assert_approx(posed(&state, &data).bones[1].x, 20.0);
}

#[test]
fn negative_and_non_finite_deltas_are_ignored() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));
    state.set_animation(0, "wave", true).unwrap();
    state.update(0.3);
    state.update(-0.1);
    state.update(f32::NAN);
    state.update(f32::INFINITY);
    assert_approx(state.current(0).unwrap().time, 0.3);
}

#[test]
fn higher_tracks_apply_on_top() {
    let data = doll_data_with(vec![
        animation("wave", vec![rotate(1, &[(0.0, 0.0), (1.0, 90.0)])]),
        animation("pick", vec![translate(1, &[(0.0, 20.0, 10.0)])]),
        animation("tilt", vec![rotate(1, &[(0.0, 10.0)])]),
    ]);
    let mut state = AnimationState::new(MixDurationTable::new(data.clone()));
    state.set_animation(0, "wave", true).unwrap();
    state.set_animation(1, "pick", true).unwrap();
    state.update(0.5);

    let skeleton = posed(&state, &data);
    assert_approx(skeleton.bones[1].rotation, 45.0);
    assert_approx(skeleton.bones[1].x, 20.0);

    state.set_animation(3, "tilt", true).unwrap();
    assert_eq!(state.tracks_len(), 4);
    assert_approx(posed(&state, &data).bones[1].rotation, 10.0);
    assert_approx(posed(&state, &data).bones[1].x, 20.0);
}

#[test]
fn clear_track_ends_entries_and_restores_setup() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.5);
    state.set_animation(0, "wait", true).unwrap();
    state.set_animation(0, "pick", true).unwrap();
    state.drain_events();

    state.clear_track(0);
    assert!(state.current(0).is_none());
    assert_eq!(kinds(&state.drain_events()), vec!["wait:End", "pick:End"]);
    assert_approx(posed(&state, &data).bones[1].x, 0.0);

    state.set_animation(2, "wave", true).unwrap();
    state.clear_tracks();
    assert_eq!(state.tracks_len(), 0);
}

#[test]
fn start_interrupt_and_end_are_queued_in_order() {
    let data = doll();
    let mut state = state_with_mix(&data, "wait", "pick", 0.1);
    state.set_animation(0, "wait", true).unwrap();
    state.set_animation(0, "pick", true).unwrap();
    state.set_animation(0, "wave", true).unwrap();

    assert_eq!(
        kinds(&state.drain_events()),
        vec![
            "wait:Start",
            "wait:Interrupt",
            "pick:Start",
            "wait:End",
            "pick:End",
            "wave:Start",
        ]
    );
    assert!(state.drain_events().is_empty());
}

#[test]
fn events_fire_once_per_loop_around_the_wrap() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));
    state.set_animation(0, "walk", true).unwrap();
    state.drain_events();

    state.update(0.6);
    assert_eq!(
        kinds(&state.drain_events()),
        vec!["walk:event@0", "walk:event@0.5"]
    );

    state.update(0.6);
    assert_eq!(
        kinds(&state.drain_events()),
        vec!["walk:Complete", "walk:event@0"]
    );

    state.update(0.1);
    assert!(state.drain_events().is_empty());
}

#[test]
fn key_at_zero_fires_on_the_first_update() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));
    state.set_animation(0, "walk", false).unwrap();
    state.drain_events();

    state.update(0.0);
    assert_eq!(kinds(&state.drain_events()), vec!["walk:event@0"]);
}

#[test]
fn non_looping_completion_fires_once() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));
    state.set_animation(0, "wave", false).unwrap();
    state.drain_events();

    state.update(2.0);
    assert_eq!(kinds(&state.drain_events()), vec!["wave:Complete"]);
    state.update(2.0);
    assert!(state.drain_events().is_empty());
}

#[test]
fn delta_spanning_several_loops_reports_one_completion() {
    let data = doll();
    let mut state = AnimationState::new(MixDurationTable::new(data));
    state.set_animation(0, "wave", true).unwrap();
    state.drain_events();

    state.update(3.5);
    assert_eq!(kinds(&state.drain_events()), vec!["wave:Complete"]);
    assert_approx(state.current(0).unwrap().time, 0.5);
}

#[test]
fn mix_table_validates_names_and_durations() {
    let data = doll();
    let mut table = MixDurationTable::new(data);

    assert!(matches!(
        table.set_mix("wait", "fly", 0.1),
        Err(Error::UnknownAnimation { .. })
    ));
    assert!(matches!(
        table.set_mix("wait", "pick", f32::NAN),
        Err(Error::InvalidValue { .. })
    ));
    assert!(matches!(
        table.set_default_mix(-0.5),
        Err(Error::InvalidValue { .. })
    ));

    table.set_default_mix(0.3).unwrap();
    table.set_mix("wait", "pick", 0.1).unwrap();
    assert_approx(table.mix_duration("wait", "pick"), 0.1);
    assert_approx(table.mix_duration("pick", "wait"), 0.3);
    assert_approx(table.mix_duration("fly", "wait"), 0.3);
}
