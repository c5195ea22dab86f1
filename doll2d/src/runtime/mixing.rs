//! Combines the samples of an incoming and an outgoing track entry into the pose.
//!
//! For every channel either entry keys, the resolver picks a `from` and a `to` value and writes
//! `mix(from, to, alpha)`:
//!
//! - keyed by the incoming entry: `from` is the outgoing sample, or the pose value beneath this
//!   track when the outgoing entry does not key the channel; `to` is the incoming sample.
//! - keyed only by the outgoing entry: `from` is the outgoing sample and `to` is the pose value
//!   beneath this track, so the channel eases back as the crossfade completes.
//!
//! Attachment switches and draw order are discrete: the incoming entry's keys win immediately,
//! and keys only the outgoing entry sets hold until the crossfade ends.

use super::animation::{Channel, TimelineValue, lerp, lerp_color, lerp_rotation, lerp_vertices};
use crate::{Animation, AttachmentData, Skeleton, Timeline};
use std::collections::{BTreeMap, BTreeSet};

/// Channel plus the attachment a deform key targets.
type Key<'a> = (Channel, Option<&'a str>);

fn sample_animation<'a>(
    animation: &'a Animation,
    time: f32,
    active_skin: Option<&str>,
) -> BTreeMap<Key<'a>, TimelineValue> {
    let mut out = BTreeMap::new();
    for timeline in &animation.timelines {
        let Some(value) = timeline.sample_at(time) else {
            continue;
        };
        let key = match timeline {
            Timeline::Deform(t) => {
                let key = (timeline.channel(), Some(t.attachment.as_str()));
                // The same attachment key may be deformed per skin; prefer the active one.
                if out.contains_key(&key) && active_skin != Some(t.skin.as_str()) {
                    continue;
                }
                key
            }
            _ => (timeline.channel(), None),
        };
        out.insert(key, value);
    }
    out
}

/// The value beneath this track: whatever the pose holds after setup and lower tracks.
fn base_value(skeleton: &Skeleton, channel: Channel) -> Option<TimelineValue> {
    Some(match channel {
        Channel::BoneRotate(i) => TimelineValue::Rotate(skeleton.bones.get(i)?.rotation),
        Channel::BoneTranslate(i) => {
            let bone = skeleton.bones.get(i)?;
            TimelineValue::Translate {
                x: bone.x,
                y: bone.y,
            }
        }
        Channel::BoneScale(i) => {
            let bone = skeleton.bones.get(i)?;
            TimelineValue::Scale {
                x: bone.scale_x,
                y: bone.scale_y,
            }
        }
        Channel::SlotAttachment(i) => {
            TimelineValue::Attachment(skeleton.slots.get(i)?.attachment.clone())
        }
        Channel::SlotColor(i) => TimelineValue::Color(skeleton.slots.get(i)?.color),
        Channel::SlotDeform(i) => {
            let slot = skeleton.slots.get(i)?;
            if !slot.deform.is_empty() {
                TimelineValue::Deform(slot.deform.clone())
            } else {
                match skeleton.slot_attachment(i)? {
                    AttachmentData::Mesh(mesh) => TimelineValue::Deform(mesh.setup_deform()),
                    _ => return None,
                }
            }
        }
    })
}

fn mix(from: &TimelineValue, to: &TimelineValue, alpha: f32) -> TimelineValue {
    if alpha >= 1.0 {
        return to.clone();
    }
    if alpha <= 0.0 {
        return from.clone();
    }
    match (from, to) {
        (TimelineValue::Rotate(a), TimelineValue::Rotate(b)) => {
            TimelineValue::Rotate(lerp_rotation(*a, *b, alpha))
        }
        (TimelineValue::Translate { x: x1, y: y1 }, TimelineValue::Translate { x: x2, y: y2 }) => {
            TimelineValue::Translate {
                x: lerp(*x1, *x2, alpha),
                y: lerp(*y1, *y2, alpha),
            }
        }
        (TimelineValue::Scale { x: x1, y: y1 }, TimelineValue::Scale { x: x2, y: y2 }) => {
            TimelineValue::Scale {
                x: lerp(*x1, *x2, alpha),
                y: lerp(*y1, *y2, alpha),
            }
        }
        (TimelineValue::Color(a), TimelineValue::Color(b)) => {
            TimelineValue::Color(lerp_color(*a, *b, alpha))
        }
        (TimelineValue::Deform(a), TimelineValue::Deform(b)) => {
            TimelineValue::Deform(lerp_vertices(a, b, alpha))
        }
        _ => to.clone(),
    }
}

fn write(skeleton: &mut Skeleton, channel: Channel, value: TimelineValue) {
    match (channel, value) {
        (Channel::BoneRotate(i), TimelineValue::Rotate(rotation)) => {
            if let Some(bone) = skeleton.bones.get_mut(i) {
                bone.rotation = rotation;
            }
        }
        (Channel::BoneTranslate(i), TimelineValue::Translate { x, y }) => {
            if let Some(bone) = skeleton.bones.get_mut(i) {
                bone.x = x;
                bone.y = y;
            }
        }
        (Channel::BoneScale(i), TimelineValue::Scale { x, y }) => {
            if let Some(bone) = skeleton.bones.get_mut(i) {
                bone.scale_x = x;
                bone.scale_y = y;
            }
        }
        (Channel::SlotAttachment(i), TimelineValue::Attachment(name)) => {
            let key = name.filter(|n| skeleton.attachment(i, n).is_some());
            if let Some(slot) = skeleton.slots.get_mut(i) {
                if slot.attachment != key {
                    slot.deform.clear();
                }
                slot.attachment = key;
            }
        }
        (Channel::SlotColor(i), TimelineValue::Color(color)) => {
            if let Some(slot) = skeleton.slots.get_mut(i) {
                slot.color = color;
            }
        }
        (Channel::SlotDeform(i), TimelineValue::Deform(vertices)) => {
            if let Some(slot) = skeleton.slots.get_mut(i) {
                slot.deform = vertices;
            }
        }
        (channel, value) => {
            log::debug!("ignoring mismatched value {value:?} for {channel:?}");
        }
    }
}

/// Applies one track. `previous` is the outgoing entry's animation and time while a crossfade
/// is in flight; `alpha` is the crossfade progress in `0..=1`.
pub(crate) fn apply_mixed(
    skeleton: &mut Skeleton,
    current: &Animation,
    current_time: f32,
    previous: Option<(&Animation, f32)>,
    alpha: f32,
) {
    let alpha = if previous.is_some() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let skin = skeleton.skin.clone();
    let incoming = sample_animation(current, current_time, skin.as_deref());
    let outgoing = previous
        .map(|(animation, time)| sample_animation(animation, time, skin.as_deref()))
        .unwrap_or_default();

    // Ordered so attachment switches land before deforms are matched against them.
    let keys: BTreeSet<Key<'_>> = incoming.keys().chain(outgoing.keys()).copied().collect();
    for key @ (channel, attachment) in keys {
        if let Channel::SlotDeform(slot) = channel {
            let current_key = skeleton.slots.get(slot).and_then(|s| s.attachment.as_deref());
            if current_key != attachment {
                continue;
            }
        }

        let value = match (outgoing.get(&key), incoming.get(&key)) {
            (_, Some(to)) if channel.is_discrete() => to.clone(),
            (Some(from), None) if channel.is_discrete() => {
                if alpha >= 1.0 {
                    continue;
                }
                from.clone()
            }
            (Some(from), Some(to)) => mix(from, to, alpha),
            (None, Some(to)) => {
                if alpha >= 1.0 {
                    to.clone()
                } else {
                    let Some(base) = base_value(skeleton, channel) else {
                        continue;
                    };
                    mix(&base, to, alpha)
                }
            }
            (Some(from), None) => {
                let Some(base) = base_value(skeleton, channel) else {
                    continue;
                };
                mix(from, &base, alpha)
            }
            (None, None) => continue,
        };
        write(skeleton, channel, value);
    }

    let draw_order = match (&current.draw_order_timeline, previous) {
        (Some(timeline), _) => Some(timeline.sample_at(current_time)),
        (None, Some((animation, time))) if alpha < 1.0 => animation
            .draw_order_timeline
            .as_ref()
            .map(|timeline| timeline.sample_at(time)),
        _ => None,
    };
    if let Some(order) = draw_order {
        let slot_count = skeleton.slots.len();
        match order {
            Some(order) if order.len() == slot_count => {
                skeleton.draw_order.clear();
                skeleton.draw_order.extend_from_slice(order);
            }
            Some(order) => {
                log::debug!(
                    "ignoring draw order of {} slots for a skeleton with {slot_count}",
                    order.len()
                );
            }
            None => {
                skeleton.draw_order.clear();
                skeleton.draw_order.extend(0..slot_count);
            }
        }
    }
}
