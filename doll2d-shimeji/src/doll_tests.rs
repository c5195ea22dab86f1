use crate::test_support::{PICK_ANGLE, assert_approx, doll_assets, overlay};
use crate::{Doll, DollConfig, DollError, DragState, PointerState};
use doll2d::MixDurationTable;

fn doll_at(x: f32, y: f32) -> Doll {
    let mut overlay = overlay();
    let index = overlay.spawn_at(x, y).unwrap();
    overlay.despawn(index).unwrap()
}

fn current(doll: &Doll) -> &str {
    doll.state().current(0).unwrap().animation_name.as_str()
}

#[test]
fn hit_box_hangs_above_the_anchor() {
    let doll = doll_at(500.0, 500.0);
    assert_eq!(doll.size(), (200.0, 300.0));

    assert!(doll.hit_test(500.0, 250.0));
    assert!(!doll.hit_test(500.0, 501.0));
}

#[test]
fn hit_box_edges_are_exclusive() {
    let doll = doll_at(500.0, 500.0);

    assert!(!doll.hit_test(500.0, 500.0));
    assert!(!doll.hit_test(500.0, 200.0));
    assert!(doll.hit_test(500.0, 201.0));
    assert!(!doll.hit_test(400.0, 250.0));
    assert!(doll.hit_test(401.0, 250.0));
    assert!(!doll.hit_test(600.0, 250.0));
}

#[test]
fn spawned_doll_idles_upright() {
    let doll = doll_at(10.0, 20.0);
    assert_eq!(doll.drag_state(), DragState::Idle);
    assert_eq!(current(&doll), "wait");
    assert_eq!(doll.anchor(), (10.0, 20.0));
    assert_eq!(doll.skeleton().scale_y, -1.0);
    assert_eq!(doll.skeleton().bones[0].world_y, 20.0);
}

#[test]
fn press_inside_grabs_and_crossfades_to_pick() {
    let mut doll = doll_at(500.0, 500.0);
    doll.handle_pointer(PointerState::pressed(500.0, 400.0));

    assert_eq!(doll.drag_state(), DragState::Held);
    assert_eq!(current(&doll), "pick");
    let previous = doll.state().previous(0).unwrap();
    assert_eq!(previous.animation_name, "wait");
    assert_approx(doll.state().current(0).unwrap().mix_duration, 0.1);
    // the anchor snaps to the pointer on the grabbing frame
    assert_eq!(doll.anchor(), (500.0, 400.0));
}

#[test]
fn press_outside_is_ignored() {
    let mut doll = doll_at(500.0, 500.0);
    doll.handle_pointer(PointerState::pressed(500.0, 520.0));

    assert_eq!(doll.drag_state(), DragState::Idle);
    assert_eq!(current(&doll), "wait");
    assert_eq!(doll.anchor(), (500.0, 500.0));
}

#[test]
fn held_doll_follows_the_pointer_anywhere() {
    let mut doll = doll_at(500.0, 500.0);
    doll.handle_pointer(PointerState::pressed(500.0, 400.0));
    doll.handle_pointer(PointerState::pressed(1200.0, 900.0));

    assert!(doll.is_held());
    assert_eq!(doll.anchor(), (1200.0, 900.0));
}

#[test]
fn release_drops_in_place_and_returns_to_wait() {
    let mut doll = doll_at(500.0, 500.0);
    doll.handle_pointer(PointerState::pressed(500.0, 400.0));
    doll.handle_pointer(PointerState::released(640.0, 380.0));

    assert_eq!(doll.drag_state(), DragState::Idle);
    assert_eq!(doll.anchor(), (640.0, 380.0));
    assert_eq!(current(&doll), "wait");
    assert_approx(doll.state().current(0).unwrap().mix_duration, 0.2);

    doll.handle_pointer(PointerState::released(0.0, 0.0));
    assert_eq!(doll.anchor(), (640.0, 380.0));
}

#[test]
fn grab_offset_shifts_the_followed_anchor() {
    let (_, data) = doll_assets();
    let config = DollConfig {
        grab_offset: [0.0, 150.0],
        ..DollConfig::default()
    };
    let mut doll = Doll::new(data.clone(), MixDurationTable::new(data), &config, 0.0, 0.0).unwrap();
    doll.grab();
    doll.track_pointer(PointerState::pressed(30.0, 40.0));
    assert_eq!(doll.anchor(), (30.0, 190.0));
}

#[test]
fn grab_and_release_are_idempotent() {
    let mut doll = doll_at(0.0, 0.0);
    doll.release();
    assert_eq!(current(&doll), "wait");
    assert!(doll.state().previous(0).is_none());

    doll.grab();
    doll.grab();
    // a second grab does not restart the crossfade
    assert_eq!(doll.state().previous(0).unwrap().animation_name, "wait");
}

#[test]
fn advance_poses_the_active_animation() {
    let mut doll = doll_at(500.0, 500.0);
    doll.handle_pointer(PointerState::pressed(500.0, 400.0));

    doll.advance(0.05);
    assert_approx(doll.skeleton().bones[0].rotation, PICK_ANGLE / 2.0);

    doll.advance(0.1);
    assert!(doll.state().previous(0).is_none());
    assert_approx(doll.skeleton().bones[0].rotation, PICK_ANGLE);
    assert_eq!(doll.skeleton().bones[0].world_x, 500.0);
    assert_eq!(doll.skeleton().bones[0].world_y, 400.0);
}

#[test]
fn y_up_keeps_the_skeleton_unflipped() {
    let (_, data) = doll_assets();
    let config = DollConfig {
        y_down: false,
        ..DollConfig::default()
    };
    let doll =
        Doll::new(data.clone(), MixDurationTable::new(data), &config, 500.0, 500.0).unwrap();
    assert_eq!(doll.skeleton().scale_y, 1.0);

    // the body is drawn upward from the anchor, and the hit box follows it
    let vertices = doll.skeleton().slot_world_vertices(0).unwrap();
    let ys = vertices.iter().skip(1).step_by(2).copied();
    assert_eq!(ys.clone().fold(f32::MAX, f32::min), 500.0);
    assert_eq!(ys.fold(f32::MIN, f32::max), 800.0);

    assert!(doll.hit_test(500.0, 650.0));
    assert!(!doll.hit_test(500.0, 350.0));
    assert!(!doll.hit_test(500.0, 500.0));
    assert!(!doll.hit_test(500.0, 800.0));
    assert!(doll.hit_test(500.0, 799.0));
}

#[test]
fn unknown_animations_fail_construction() {
    let (_, data) = doll_assets();
    for config in [
        DollConfig {
            idle_animation: "sleep".to_string(),
            ..DollConfig::default()
        },
        DollConfig {
            pick_animation: "fly".to_string(),
            ..DollConfig::default()
        },
    ] {
        let err = Doll::new(data.clone(), MixDurationTable::new(data.clone()), &config, 0.0, 0.0)
            .unwrap_err();
        assert!(
            matches!(
                err,
                DollError::Runtime(doll2d::Error::UnknownAnimation { .. })
            ),
            "{err:?}"
        );
    }
}
