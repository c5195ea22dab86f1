//! Hand-built skeleton fixtures shared by the unit tests.

use crate::{
    Animation, AttachmentFrame, AttachmentTimeline, Curve, RotateFrame, RotateTimeline,
    SkeletonData, Timeline, TranslateTimeline, Vec2Frame,
};
use std::sync::Arc;

pub(crate) const DOLL_ATLAS: &str = r#"
doll.png
size: 64,64
format: RGBA8888
filter: Linear,Linear
repeat: none
body
  rotate: false
  xy: 0, 0
  size: 32, 32
  orig: 32, 32
  offset: 0, 0
  index: -1
head
  rotate: false
  xy: 32, 0
  size: 32, 32
  orig: 32, 32
  offset: 0, 0
  index: -1
skirt
  rotate: false
  xy: 0, 32
  size: 64, 32
  orig: 64, 32
  offset: 0, 0
  index: -1
"#;

pub(crate) const WHITE: u32 = 0xFFFF_FFFF;

/// Writes the legacy big-endian skeleton encoding.
#[derive(Default)]
pub(crate) struct SkelWriter {
    bytes: Vec<u8>,
}

impl SkelWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub(crate) fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    pub(crate) fn color(&mut self, rgba: u32) -> &mut Self {
        self.bytes.extend_from_slice(&rgba.to_be_bytes());
        self
    }

    pub(crate) fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub(crate) fn floats(&mut self, values: &[f32]) -> &mut Self {
        self.varint(values.len() as u32);
        for &v in values {
            self.f32(v);
        }
        self
    }

    pub(crate) fn shorts(&mut self, values: &[u16]) -> &mut Self {
        self.varint(values.len() as u32);
        for &v in values {
            self.bytes.extend_from_slice(&v.to_be_bytes());
        }
        self
    }

    pub(crate) fn varint(&mut self, mut v: u32) -> &mut Self {
        loop {
            let b = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.bytes.push(b);
                return self;
            }
            self.bytes.push(b | 0x80);
        }
    }

    pub(crate) fn varint_signed(&mut self, v: i32) -> &mut Self {
        self.varint(((v << 1) ^ (v >> 31)) as u32)
    }

    pub(crate) fn string(&mut self, s: Option<&str>) -> &mut Self {
        let Some(s) = s else {
            return self.varint(0);
        };
        self.varint(s.chars().count() as u32 + 1);
        let mut buf = [0u8; 4];
        for ch in s.chars() {
            self.bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        self
    }

    pub(crate) fn str(&mut self, s: &str) -> &mut Self {
        self.string(Some(s))
    }

    /// `name, parent+1, x, y, scaleX, scaleY, rotation, length, flips, inherit flags`.
    pub(crate) fn bone(
        &mut self,
        name: &str,
        parent: Option<u32>,
        x: f32,
        y: f32,
        rotation: f32,
    ) -> &mut Self {
        self.str(name).varint(parent.map_or(0, |p| p + 1));
        self.f32(x).f32(y).f32(1.0).f32(1.0).f32(rotation).f32(0.0);
        self.bool(false).bool(false).bool(true).bool(true)
    }

    pub(crate) fn region_attachment(
        &mut self,
        key: &str,
        path: Option<&str>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> &mut Self {
        self.str(key).string(None).u8(0).string(path);
        self.f32(x).f32(y).f32(1.0).f32(1.0).f32(0.0).f32(width).f32(height);
        self.color(WHITE)
    }
}

/// Header through events of the doll fixture: bones `root` and `body` (y = 10), slots `body`,
/// `head` and `skirt`, a default skin with two regions, an alias and an unweighted mesh, and one
/// event named `step`. The caller writes the animation section.
pub(crate) fn write_doll_prelude(w: &mut SkelWriter) {
    w.str("fixture").str("2.1.27").f32(200.0).f32(300.0).bool(false);

    w.varint(2);
    w.bone("root", None, 0.0, 0.0, 0.0);
    w.bone("body", Some(0), 0.0, 10.0, 0.0);

    // ik
    w.varint(0);

    w.varint(3);
    for name in ["body", "head", "skirt"] {
        w.str(name).varint(1).color(WHITE).str(name).bool(false);
    }

    // default skin
    w.varint(3);
    w.varint(0).varint(1);
    w.region_attachment("body", None, 0.0, 0.0, 32.0, 32.0);
    w.varint(1).varint(2);
    w.region_attachment("head", None, 0.0, 40.0, 32.0, 32.0);
    w.region_attachment("head-blink", Some("head"), 0.0, 40.0, 32.0, 32.0);
    w.varint(2).varint(1);
    w.str("skirt").string(None).u8(2).string(None);
    w.floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    w.shorts(&[0, 1, 2]);
    w.floats(&[0.0, 0.0, 10.0, 0.0, 0.0, 10.0]);
    w.color(WHITE).varint(3);

    // named skins
    w.varint(0);

    w.varint(1);
    w.str("step").varint_signed(0).f32(0.0).string(None);
}

/// Writes an animation that only carries an event timeline.
pub(crate) fn write_event_animation(w: &mut SkelWriter, name: &str, times: &[f32]) {
    w.str(name);
    w.varint(0).varint(0).varint(0).varint(0).varint(0);
    w.varint(times.len() as u32);
    for &time in times {
        w.f32(time).varint(0).varint_signed(0).f32(0.0).bool(false);
    }
}

pub(crate) fn doll_bytes() -> Vec<u8> {
    let mut w = SkelWriter::new();
    write_doll_prelude(&mut w);
    w.varint(0);
    w.finish()
}

pub(crate) fn doll_data() -> Arc<SkeletonData> {
    let (_, data) = crate::load_skeleton(DOLL_ATLAS, &doll_bytes(), 1.0).expect("doll fixture");
    data
}

/// The doll fixture with extra animations appended after decoding.
pub(crate) fn doll_data_with(animations: Vec<Animation>) -> Arc<SkeletonData> {
    let mut data = (*doll_data()).clone();
    for animation in animations {
        data.animation_index
            .insert(animation.name.clone(), data.animations.len());
        data.animations.push(animation);
    }
    Arc::new(data)
}

pub(crate) fn animation(name: &str, timelines: Vec<Timeline>) -> Animation {
    let duration = timelines.iter().map(Timeline::last_time).fold(0.0, f32::max);
    Animation {
        name: name.to_string(),
        duration,
        timelines,
        draw_order_timeline: None,
        event_timeline: None,
    }
}

pub(crate) fn rotate(bone_index: usize, keys: &[(f32, f32)]) -> Timeline {
    Timeline::Rotate(RotateTimeline {
        bone_index,
        frames: keys
            .iter()
            .map(|&(time, angle)| RotateFrame {
                time,
                angle,
                curve: Curve::Linear,
            })
            .collect(),
    })
}

pub(crate) fn translate(bone_index: usize, keys: &[(f32, f32, f32)]) -> Timeline {
    Timeline::Translate(TranslateTimeline {
        bone_index,
        frames: keys
            .iter()
            .map(|&(time, x, y)| Vec2Frame {
                time,
                x,
                y,
                curve: Curve::Linear,
            })
            .collect(),
    })
}

pub(crate) fn attachment(slot_index: usize, keys: &[(f32, Option<&str>)]) -> Timeline {
    Timeline::Attachment(AttachmentTimeline {
        slot_index,
        frames: keys
            .iter()
            .map(|&(time, name)| AttachmentFrame {
                time,
                name: name.map(str::to_string),
            })
            .collect(),
    })
}

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}
