//! A 200x300 doll with `wait` and `pick` animations, kept in memory or written to disk.

use crate::{DollConfig, Overlay};
use doll2d::{Atlas, SkeletonData};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) const DOLL_ATLAS: &str = r#"
doll.png
size: 256,512
format: RGBA8888
filter: Linear,Linear
repeat: none
body
  rotate: false
  xy: 0, 0
  size: 200, 300
  orig: 200, 300
  offset: 0, 0
  index: -1
"#;

/// Rotation of the root bone while `pick` plays.
pub(crate) const PICK_ANGLE: f32 = 15.0;

#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }

    fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    fn f32(&mut self, v: f32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn white(&mut self) -> &mut Self {
        self.0.extend_from_slice(&[0xFF; 4]);
        self
    }

    fn varint(&mut self, v: u8) -> &mut Self {
        assert!(v < 0x80);
        self.u8(v)
    }

    fn null(&mut self) -> &mut Self {
        self.varint(0)
    }

    fn str(&mut self, s: &str) -> &mut Self {
        assert!(s.is_ascii());
        self.varint(s.len() as u8 + 1);
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    /// Animation with a single root rotate timeline holding `angle` from 0 to `duration`.
    fn hold_rotation(&mut self, name: &str, angle: f32, duration: f32) -> &mut Self {
        self.str(name);
        // slot groups
        self.varint(0);
        // bone group: root, one rotate timeline with two linear keys
        self.varint(1).varint(0).varint(1).u8(1).varint(2);
        self.f32(0.0).f32(angle).u8(0);
        self.f32(duration).f32(angle);
        // ik, deform, draw order, events
        self.varint(0).varint(0).varint(0).varint(0)
    }
}

pub(crate) fn doll_bytes() -> Vec<u8> {
    let mut w = Bytes::default();
    w.str("shimeji").str("2.1.27").f32(200.0).f32(300.0).bool(false);

    // root bone
    w.varint(1).str("root").varint(0);
    w.f32(0.0).f32(0.0).f32(1.0).f32(1.0).f32(0.0).f32(0.0);
    w.bool(false).bool(false).bool(true).bool(true);

    // ik
    w.varint(0);

    w.varint(1).str("body").varint(0).white().str("body").bool(false);

    // default skin: one region covering the hit box above the root
    w.varint(1).varint(0).varint(1);
    w.str("body").null().u8(0).null();
    w.f32(0.0).f32(150.0).f32(1.0).f32(1.0).f32(0.0).f32(200.0).f32(300.0);
    w.white();

    // named skins, events
    w.varint(0).varint(0);

    w.varint(2);
    w.hold_rotation("wait", 0.0, 1.0);
    w.hold_rotation("pick", PICK_ANGLE, 0.5);
    w.0
}

pub(crate) fn doll_assets() -> (Atlas, Arc<SkeletonData>) {
    doll2d::load_skeleton(DOLL_ATLAS, &doll_bytes(), 1.0).expect("doll fixture")
}

pub(crate) fn overlay_with(config: DollConfig) -> Overlay {
    let (atlas, data) = doll_assets();
    Overlay::new(config, atlas, data).expect("overlay")
}

pub(crate) fn overlay() -> Overlay {
    overlay_with(DollConfig::default())
}

/// Writes the fixture atlas and skeleton into a fresh temp directory and points a default
/// config at them.
pub(crate) fn write_doll_files(tag: &str) -> DollConfig {
    let dir = std::env::temp_dir().join(format!(
        "doll2d-shimeji-{tag}-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create fixture dir");
    let atlas_path = dir.join("doll.atlas");
    let skeleton_path = dir.join("doll.skel");
    std::fs::write(&atlas_path, DOLL_ATLAS).expect("write atlas");
    std::fs::write(&skeleton_path, doll_bytes()).expect("write skeleton");
    DollConfig {
        atlas_path,
        skeleton_path,
        ..DollConfig::default()
    }
}

pub(crate) fn fixture_dir(config: &DollConfig) -> PathBuf {
    config
        .atlas_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default()
}

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}
