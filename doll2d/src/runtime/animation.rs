use crate::{
    AttachmentFrame, ColorFrame, DeformFrame, DrawOrderFrame, DrawOrderTimeline, Event,
    EventTimeline, RotateFrame, Timeline, Vec2Frame,
};

/// Pose property addressed by a timeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Channel {
    BoneRotate(usize),
    BoneTranslate(usize),
    BoneScale(usize),
    SlotAttachment(usize),
    SlotColor(usize),
    SlotDeform(usize),
}

impl Channel {
    /// Discrete channels switch values instead of interpolating.
    pub fn is_discrete(self) -> bool {
        matches!(self, Channel::SlotAttachment(_))
    }
}

/// A sampled channel value.
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineValue {
    Rotate(f32),
    Translate { x: f32, y: f32 },
    Scale { x: f32, y: f32 },
    Attachment(Option<String>),
    Color([f32; 4]),
    Deform(Vec<f32>),
}

impl Timeline {
    pub fn channel(&self) -> Channel {
        match self {
            Timeline::Rotate(t) => Channel::BoneRotate(t.bone_index),
            Timeline::Translate(t) => Channel::BoneTranslate(t.bone_index),
            Timeline::Scale(t) => Channel::BoneScale(t.bone_index),
            Timeline::Attachment(t) => Channel::SlotAttachment(t.slot_index),
            Timeline::Color(t) => Channel::SlotColor(t.slot_index),
            Timeline::Deform(t) => Channel::SlotDeform(t.slot_index),
        }
    }

    /// Samples the timeline at `time`. Times outside the key range hold the boundary key.
    /// Returns `None` only for a timeline without keys.
    pub fn sample_at(&self, time: f32) -> Option<TimelineValue> {
        match self {
            Timeline::Rotate(t) => sample_rotate(&t.frames, time).map(TimelineValue::Rotate),
            Timeline::Translate(t) => {
                sample_vec2(&t.frames, time).map(|(x, y)| TimelineValue::Translate { x, y })
            }
            Timeline::Scale(t) => {
                sample_vec2(&t.frames, time).map(|(x, y)| TimelineValue::Scale { x, y })
            }
            Timeline::Attachment(t) => {
                sample_attachment(&t.frames, time).map(TimelineValue::Attachment)
            }
            Timeline::Color(t) => sample_color(&t.frames, time).map(TimelineValue::Color),
            Timeline::Deform(t) => sample_deform(&t.frames, time).map(TimelineValue::Deform),
        }
    }
}

trait Keyframe {
    fn time(&self) -> f32;
}

macro_rules! impl_keyframe {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyframe for $ty {
            fn time(&self) -> f32 {
                self.time
            }
        })*
    };
}

impl_keyframe!(
    RotateFrame,
    Vec2Frame,
    AttachmentFrame,
    ColorFrame,
    DeformFrame,
    DrawOrderFrame
);

enum Span<'a, F> {
    Hold(&'a F),
    Between(&'a F, &'a F, f32),
}

/// Finds the keys bracketing `time` and the linear progress between them.
fn span<F: Keyframe>(frames: &[F], time: f32) -> Option<Span<'_, F>> {
    let index = frames.partition_point(|f| f.time() <= time);
    if index == 0 {
        return frames.first().map(Span::Hold);
    }
    if index >= frames.len() {
        return frames.last().map(Span::Hold);
    }
    let prev = &frames[index - 1];
    let next = &frames[index];
    let denom = next.time() - prev.time();
    if denom.abs() <= 1.0e-12 {
        return Some(Span::Hold(next));
    }
    Some(Span::Between(prev, next, (time - prev.time()) / denom))
}

/// Key at or before `time`, or the first key when `time` precedes every key.
fn step<F: Keyframe>(frames: &[F], time: f32) -> Option<&F> {
    let index = frames.partition_point(|f| f.time() <= time);
    frames.get(index.saturating_sub(1))
}

pub(crate) fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    from + (to - from) * alpha
}

/// Wraps an angle difference into `(-180, 180]`.
pub(crate) fn shortest_rotation(degrees: f32) -> f32 {
    let degrees = degrees.rem_euclid(360.0);
    if degrees > 180.0 {
        degrees - 360.0
    } else {
        degrees
    }
}

pub(crate) fn lerp_rotation(from: f32, to: f32, alpha: f32) -> f32 {
    from + shortest_rotation(to - from) * alpha
}

pub(crate) fn lerp_color(from: [f32; 4], to: [f32; 4], alpha: f32) -> [f32; 4] {
    [
        lerp(from[0], to[0], alpha),
        lerp(from[1], to[1], alpha),
        lerp(from[2], to[2], alpha),
        lerp(from[3], to[3], alpha),
    ]
}

pub(crate) fn lerp_vertices(from: &[f32], to: &[f32], alpha: f32) -> Vec<f32> {
    if from.len() != to.len() {
        return to.to_vec();
    }
    from.iter()
        .zip(to)
        .map(|(&a, &b)| lerp(a, b, alpha))
        .collect()
}

fn sample_rotate(frames: &[RotateFrame], time: f32) -> Option<f32> {
    Some(match span(frames, time)? {
        Span::Hold(f) => f.angle,
        Span::Between(prev, next, percent) => {
            lerp_rotation(prev.angle, next.angle, prev.curve.percent(percent))
        }
    })
}

fn sample_vec2(frames: &[Vec2Frame], time: f32) -> Option<(f32, f32)> {
    Some(match span(frames, time)? {
        Span::Hold(f) => (f.x, f.y),
        Span::Between(prev, next, percent) => {
            let t = prev.curve.percent(percent);
            (lerp(prev.x, next.x, t), lerp(prev.y, next.y, t))
        }
    })
}

fn sample_attachment(frames: &[AttachmentFrame], time: f32) -> Option<Option<String>> {
    step(frames, time).map(|f| f.name.clone())
}

fn sample_color(frames: &[ColorFrame], time: f32) -> Option<[f32; 4]> {
    Some(match span(frames, time)? {
        Span::Hold(f) => f.color,
        Span::Between(prev, next, percent) => {
            lerp_color(prev.color, next.color, prev.curve.percent(percent))
        }
    })
}

fn sample_deform(frames: &[DeformFrame], time: f32) -> Option<Vec<f32>> {
    Some(match span(frames, time)? {
        Span::Hold(f) => f.vertices.clone(),
        Span::Between(prev, next, percent) => {
            lerp_vertices(&prev.vertices, &next.vertices, prev.curve.percent(percent))
        }
    })
}

impl DrawOrderTimeline {
    /// Draw order in effect at `time`; `None` means the setup order.
    pub fn sample_at(&self, time: f32) -> Option<&[usize]> {
        step(&self.frames, time)?.draw_order.as_deref()
    }
}

impl EventTimeline {
    /// Appends events keyed in `(after, until]`.
    pub fn collect(&self, after: f32, until: f32, out: &mut Vec<Event>) {
        let start = self.events.partition_point(|e| e.time <= after);
        out.extend(
            self.events[start..]
                .iter()
                .take_while(|e| e.time <= until)
                .cloned(),
        );
    }
}
