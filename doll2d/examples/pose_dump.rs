//! Poses a skeleton at a point in an animation and prints bones, slots and the draw list as JSON.
//!
//! Usage: `pose_dump <atlas> <skel> [animation] [time] [--scale <s>] [--mix-from <name> <secs>]`

use doll2d::{AnimationState, MixDurationTable, Skeleton, build_draw_list, load_skeleton};
use serde_json::json;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut scale = 1.0f32;
    let mut mix_from: Option<(String, f32)> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--scale" => {
                scale = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(1.0);
                i += 2;
            }
            "--mix-from" => {
                let name = args.get(i + 1).cloned();
                let secs = args.get(i + 2).and_then(|s| s.parse().ok()).unwrap_or(0.0);
                mix_from = name.map(|name| (name, secs));
                i += 3;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let atlas_path = positional
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./assets/rm4a1/rm4a1.atlas"));
    let skel_path = positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./assets/rm4a1/rm4a1.skel"));
    let animation = positional
        .get(2)
        .cloned()
        .unwrap_or_else(|| "wait".to_string());
    let time: f32 = positional
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.5);

    let atlas_text = std::fs::read_to_string(&atlas_path).expect("read atlas");
    let bytes = std::fs::read(&skel_path).expect("read skel");
    let (atlas, data) = load_skeleton(&atlas_text, &bytes, scale).expect("load skeleton");

    let mut skeleton = Skeleton::new(data.clone());
    let mut state = AnimationState::new(MixDurationTable::new(data));

    if let Some((from, secs)) = &mix_from {
        state.set_animation(0, from, true).expect("set mix-from animation");
        state
            .set_animation_with_mix(0, &animation, true, *secs)
            .expect("set animation");
    } else {
        state
            .set_animation(0, &animation, true)
            .expect("set animation");
    }
    state.update(time.max(0.0));
    state.apply(&mut skeleton);
    skeleton.update_world_transform();

    let bones: Vec<_> = skeleton
        .bones
        .iter()
        .enumerate()
        .map(|(i, bone)| {
            let name = skeleton
                .data
                .bones
                .get(i)
                .map(|b| b.name.as_str())
                .unwrap_or("<unknown>");
            json!({
                "i": i,
                "name": name,
                "world": {"a": bone.a, "b": bone.b, "c": bone.c, "d": bone.d, "x": bone.world_x, "y": bone.world_y},
                "local": {"x": bone.x, "y": bone.y, "rotation": bone.rotation, "scaleX": bone.scale_x, "scaleY": bone.scale_y},
            })
        })
        .collect();

    let slots: Vec<_> = skeleton
        .slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let name = skeleton
                .data
                .slots
                .get(i)
                .map(|s| s.name.as_str())
                .unwrap_or("<unknown>");
            json!({
                "i": i,
                "name": name,
                "color": slot.color,
                "attachment": slot.attachment,
                "deformed": !slot.deform.is_empty(),
            })
        })
        .collect();

    let draw_list = build_draw_list(&skeleton);
    let draws: Vec<_> = draw_list
        .draws
        .iter()
        .map(|d| {
            let page = atlas.page(d.page).map(|p| p.name.as_str()).unwrap_or("<unknown>");
            json!({
                "page": page,
                "blend": format!("{:?}", d.blend),
                "firstIndex": d.first_index,
                "indexCount": d.index_count,
            })
        })
        .collect();

    let out = json!({
        "animation": animation,
        "time": time,
        "bones": bones,
        "slots": slots,
        "drawOrder": skeleton.draw_order,
        "vertexCount": draw_list.vertices.len(),
        "draws": draws,
        "events": state
            .drain_events()
            .iter()
            .map(|e| format!("{}:{:?}", e.animation, e.kind))
            .collect::<Vec<_>>(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("serialize pose")
    );
}
