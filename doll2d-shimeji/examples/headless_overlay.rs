//! Drives an overlay without a window: spawns a doll, scripts a press/drag/release and prints one
//! JSON line per frame.
//!
//! Usage: `headless_overlay [config.json] [--frames <n>]`

use doll2d::{DrawList, Skeleton};
use doll2d_shimeji::{DollConfig, Overlay, PointerState, PoseRenderer};
use serde_json::json;

#[derive(Default)]
struct FrameStats {
    dolls: Vec<serde_json::Value>,
}

impl PoseRenderer for FrameStats {
    fn begin_frame(&mut self) {
        self.dolls.clear();
    }

    fn draw_doll(&mut self, doll_index: usize, skeleton: &Skeleton, draw_list: &DrawList) {
        self.dolls.push(json!({
            "doll": doll_index,
            "anchor": [skeleton.x, skeleton.y],
            "vertices": draw_list.vertices.len(),
            "draws": draw_list.draws.len(),
        }));
    }
}

fn main() {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config_path = None;
    let mut frames = 60usize;
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                frames = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(60);
                i += 2;
            }
            other => {
                config_path = Some(other.to_string());
                i += 1;
            }
        }
    }

    let config = match &config_path {
        Some(path) => DollConfig::from_path(path).expect("read config"),
        None => DollConfig {
            spawn: [400.0, 600.0],
            ..DollConfig::default()
        },
    };
    let mut overlay = Overlay::load(config).expect("load doll");
    let index = overlay.spawn().expect("spawn doll");
    let (x, y) = overlay.doll(index).map(|d| d.anchor()).unwrap_or_default();

    let delta = 1.0 / 60.0;
    let mut stats = FrameStats::default();
    for frame in 0..frames {
        // grab a third of the way in, drag right, let go at two thirds
        let t = frame as f32 / frames as f32;
        let pointer = if t < 1.0 / 3.0 {
            PointerState::released(x, y - 10.0)
        } else if t < 2.0 / 3.0 {
            PointerState::pressed(x + (t - 1.0 / 3.0) * 600.0, y - 10.0)
        } else {
            PointerState::released(x + 200.0, y - 10.0)
        };
        overlay.tick(pointer, delta);
        overlay.render(&mut stats);

        let animation = overlay
            .doll(index)
            .and_then(|d| d.state().current(0))
            .map(|e| e.animation_name.clone());
        println!(
            "{}",
            json!({
                "frame": frame,
                "pointer": [pointer.x, pointer.y, pointer.pressed],
                "animation": animation,
                "dolls": stats.dolls,
            })
        );
    }
}
