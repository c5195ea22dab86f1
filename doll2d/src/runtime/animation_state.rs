use super::mixing;
use crate::{Animation, Error, Event, Skeleton, SkeletonData};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Track indices address independent animation layers; higher tracks apply on top.
pub const MAX_TRACKS: usize = 16;

/// Crossfade durations between pairs of animations, in seconds.
#[derive(Clone, Debug)]
pub struct MixDurationTable {
    pub skeleton_data: Arc<SkeletonData>,
    pub default_mix: f32,
    mixes: HashMap<(usize, usize), f32>,
}

impl MixDurationTable {
    pub fn new(skeleton_data: Arc<SkeletonData>) -> Self {
        Self {
            skeleton_data,
            default_mix: 0.0,
            mixes: HashMap::new(),
        }
    }

    pub fn set_mix(&mut self, from: &str, to: &str, duration: f32) -> Result<(), Error> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidValue {
                message: "mix duration must be finite and >= 0".to_string(),
            });
        }
        let Some((from_index, _)) = self.skeleton_data.animation(from) else {
            return Err(Error::UnknownAnimation {
                name: from.to_string(),
            });
        };
        let Some((to_index, _)) = self.skeleton_data.animation(to) else {
            return Err(Error::UnknownAnimation {
                name: to.to_string(),
            });
        };
        self.mixes.insert((from_index, to_index), duration);
        Ok(())
    }

    pub fn set_default_mix(&mut self, duration: f32) -> Result<(), Error> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidValue {
                message: "default mix must be finite and >= 0".to_string(),
            });
        }
        self.default_mix = duration;
        Ok(())
    }

    /// Mix duration for `from -> to`; unknown names and unlisted pairs use the default.
    pub fn mix_duration(&self, from: &str, to: &str) -> f32 {
        match (
            self.skeleton_data.animation(from),
            self.skeleton_data.animation(to),
        ) {
            (Some((from, _)), Some((to, _))) => self.mix_duration_by_index(from, to),
            _ => self.default_mix,
        }
    }

    fn mix_duration_by_index(&self, from_index: usize, to_index: usize) -> f32 {
        self.mixes
            .get(&(from_index, to_index))
            .copied()
            .unwrap_or(self.default_mix)
    }
}

#[derive(Clone, Debug)]
pub struct TrackEntry {
    pub track_index: usize,
    pub animation_index: usize,
    pub animation_name: String,
    pub looped: bool,
    pub duration: f32,
    /// Elapsed animation time; wraps when looping, clamps at `duration` otherwise.
    pub time: f32,
    /// Crossfade progress from the track's previous entry. `mix_time <= mix_duration`.
    pub mix_time: f32,
    pub mix_duration: f32,
    last_time: f32,
    completed: bool,
}

impl TrackEntry {
    fn new(track_index: usize, animation_index: usize, animation: &Animation, looped: bool) -> Self {
        Self {
            track_index,
            animation_index,
            animation_name: animation.name.clone(),
            looped,
            duration: animation.duration,
            time: 0.0,
            mix_time: 0.0,
            mix_duration: 0.0,
            last_time: -1.0,
            completed: false,
        }
    }

    /// Blend weight of this entry against the track's previous entry.
    pub fn mix_alpha(&self) -> f32 {
        if self.mix_duration > 0.0 {
            (self.mix_time / self.mix_duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// True once a non-looping entry has reached its end.
    pub fn is_complete(&self) -> bool {
        !self.looped && self.time >= self.duration
    }

    fn advance_time(&mut self, delta: f32) -> f32 {
        let raw = self.time + delta;
        self.time = if self.looped {
            if self.duration > 0.0 {
                raw.rem_euclid(self.duration)
            } else {
                0.0
            }
        } else {
            raw.min(self.duration)
        };
        raw
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimationStateEvent {
    Start,
    Interrupt,
    End,
    Complete,
    Event(Event),
}

/// Notification queued by [`AnimationState`] and drained by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct StateEvent {
    pub track_index: usize,
    pub animation: String,
    pub kind: AnimationStateEvent,
}

/// Two-slot track: the playing entry and, during a crossfade, the entry mixing out.
#[derive(Clone, Debug, Default)]
struct Track {
    current: Option<TrackEntry>,
    previous: Option<TrackEntry>,
}

/// Per-instance playback state: one [`Track`] per layer and a queue of pending events.
#[derive(Clone, Debug)]
pub struct AnimationState {
    data: MixDurationTable,
    tracks: Vec<Track>,
    event_queue: VecDeque<StateEvent>,
}

impl AnimationState {
    pub fn new(data: MixDurationTable) -> Self {
        Self {
            data,
            tracks: Vec::new(),
            event_queue: VecDeque::new(),
        }
    }

    pub fn data(&self) -> &MixDurationTable {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut MixDurationTable {
        &mut self.data
    }

    pub fn tracks_len(&self) -> usize {
        self.tracks.len()
    }

    pub fn current(&self, track_index: usize) -> Option<&TrackEntry> {
        self.tracks.get(track_index)?.current.as_ref()
    }

    /// The entry mixing out on `track_index`, if a crossfade is in flight.
    pub fn previous(&self, track_index: usize) -> Option<&TrackEntry> {
        self.tracks.get(track_index)?.previous.as_ref()
    }

    /// Plays `animation_name` on `track_index`, crossfading from a different animation when the
    /// mix table lists a positive duration for the pair.
    pub fn set_animation(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
    ) -> Result<(), Error> {
        self.set_animation_internal(track_index, animation_name, looped, None)
    }

    /// Like [`AnimationState::set_animation`] but with an explicit crossfade duration.
    pub fn set_animation_with_mix(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
        mix_duration: f32,
    ) -> Result<(), Error> {
        if !mix_duration.is_finite() || mix_duration < 0.0 {
            return Err(Error::InvalidValue {
                message: "mix duration must be finite and >= 0".to_string(),
            });
        }
        self.set_animation_internal(track_index, animation_name, looped, Some(mix_duration))
    }

    fn set_animation_internal(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
        mix_override: Option<f32>,
    ) -> Result<(), Error> {
        if track_index >= MAX_TRACKS {
            return Err(Error::InvalidTrackIndex { index: track_index });
        }
        let skeleton_data = self.data.skeleton_data.clone();
        let (animation_index, animation) =
            skeleton_data
                .animation(animation_name)
                .ok_or_else(|| Error::UnknownAnimation {
                    name: animation_name.to_string(),
                })?;

        self.ensure_track(track_index);
        let mut entry = TrackEntry::new(track_index, animation_index, animation, looped);

        let track = &mut self.tracks[track_index];
        let old_previous = track.previous.take();
        let old_current = track.current.take();
        if let Some(previous) = old_previous {
            queue(&mut self.event_queue, &previous, AnimationStateEvent::End);
        }
        if let Some(current) = old_current {
            let mix = if current.animation_index == animation_index {
                0.0
            } else {
                mix_override.unwrap_or_else(|| {
                    self.data
                        .mix_duration_by_index(current.animation_index, animation_index)
                })
            };
            if mix > 0.0 {
                queue(&mut self.event_queue, &current, AnimationStateEvent::Interrupt);
                entry.mix_duration = mix;
                self.tracks[track_index].previous = Some(current);
            } else {
                queue(&mut self.event_queue, &current, AnimationStateEvent::End);
            }
        }

        log::debug!(
            "track {track_index}: start '{animation_name}' (loop={looped}, mix={})",
            entry.mix_duration
        );
        queue(&mut self.event_queue, &entry, AnimationStateEvent::Start);
        self.tracks[track_index].current = Some(entry);
        Ok(())
    }

    /// Advances every entry by `delta` seconds. Negative or non-finite deltas are ignored.
    pub fn update(&mut self, delta: f32) {
        if !delta.is_finite() || delta < 0.0 {
            return;
        }
        let Self {
            data,
            tracks,
            event_queue,
        } = self;
        let skeleton_data = &data.skeleton_data;

        for track in tracks.iter_mut() {
            let Some(current) = track.current.as_mut() else {
                continue;
            };
            let animation = skeleton_data.animations.get(current.animation_index);
            advance_current(current, animation, delta, event_queue);

            if let Some(previous) = track.previous.as_mut() {
                previous.advance_time(delta);
                current.mix_time = (current.mix_time + delta).min(current.mix_duration);
                if current.mix_time >= current.mix_duration {
                    if let Some(previous) = track.previous.take() {
                        queue(event_queue, &previous, AnimationStateEvent::End);
                    }
                }
            }
        }
    }

    /// Poses `skeleton` from setup plus every track, lowest index first.
    pub fn apply(&self, skeleton: &mut Skeleton) {
        skeleton.set_to_setup_pose();
        let skeleton_data = &self.data.skeleton_data;
        for track in &self.tracks {
            let Some(current) = track.current.as_ref() else {
                continue;
            };
            let Some(animation) = skeleton_data.animations.get(current.animation_index) else {
                continue;
            };
            let previous = track.previous.as_ref().and_then(|p| {
                skeleton_data
                    .animations
                    .get(p.animation_index)
                    .map(|a| (a, p.time))
            });
            mixing::apply_mixed(
                skeleton,
                animation,
                current.time,
                previous,
                current.mix_alpha(),
            );
        }
    }

    pub fn clear_track(&mut self, track_index: usize) {
        let Some(track) = self.tracks.get_mut(track_index) else {
            return;
        };
        for entry in [track.previous.take(), track.current.take()]
            .into_iter()
            .flatten()
        {
            queue(&mut self.event_queue, &entry, AnimationStateEvent::End);
        }
    }

    pub fn clear_tracks(&mut self) {
        for track_index in 0..self.tracks.len() {
            self.clear_track(track_index);
        }
        self.tracks.clear();
    }

    /// Takes every queued notification, oldest first.
    pub fn drain_events(&mut self) -> Vec<StateEvent> {
        self.event_queue.drain(..).collect()
    }

    fn ensure_track(&mut self, track_index: usize) {
        if track_index >= self.tracks.len() {
            self.tracks.resize_with(track_index + 1, Track::default);
        }
    }
}

fn queue(event_queue: &mut VecDeque<StateEvent>, entry: &TrackEntry, kind: AnimationStateEvent) {
    event_queue.push_back(StateEvent {
        track_index: entry.track_index,
        animation: entry.animation_name.clone(),
        kind,
    });
}

/// Advances the playing entry and queues keyed events and completions crossed on the way. A delta
/// spanning several loops reports a single completion.
fn advance_current(
    entry: &mut TrackEntry,
    animation: Option<&Animation>,
    delta: f32,
    event_queue: &mut VecDeque<StateEvent>,
) {
    let after = entry.last_time;
    let raw = entry.advance_time(delta);
    let duration = entry.duration;

    let mut fired = Vec::new();
    let timeline = animation.and_then(|a| a.event_timeline.as_ref());
    let wrapped = entry.looped && duration > 0.0 && raw >= duration;
    if wrapped {
        if let Some(timeline) = timeline {
            timeline.collect(after, duration, &mut fired);
        }
        for event in fired.drain(..) {
            queue(event_queue, entry, AnimationStateEvent::Event(event));
        }
        queue(event_queue, entry, AnimationStateEvent::Complete);
        if let Some(timeline) = timeline {
            timeline.collect(-1.0, entry.time, &mut fired);
        }
    } else if let Some(timeline) = timeline {
        timeline.collect(after, entry.time, &mut fired);
    }
    for event in fired {
        queue(event_queue, entry, AnimationStateEvent::Event(event));
    }

    if !entry.looped && !entry.completed && raw >= duration {
        entry.completed = true;
        queue(event_queue, entry, AnimationStateEvent::Complete);
    }
    entry.last_time = entry.time;
}
