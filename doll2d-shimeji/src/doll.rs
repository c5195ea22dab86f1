use crate::{DollConfig, DollError, PointerState};
use doll2d::{AnimationState, MixDurationTable, Skeleton, SkeletonData};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Held,
}

/// One on-screen character: a pose, its animation state and the drag interaction.
///
/// The anchor is the skeleton position, read as the bottom-center of the hit box.
#[derive(Clone, Debug)]
pub struct Doll {
    skeleton: Skeleton,
    state: AnimationState,
    drag: DragState,
    idle_animation: String,
    pick_animation: String,
    grab_offset: [f32; 2],
    y_down: bool,
}

impl Doll {
    /// Creates a doll at `(x, y)` playing the idle animation.
    pub fn new(
        data: Arc<SkeletonData>,
        mixes: MixDurationTable,
        config: &DollConfig,
        x: f32,
        y: f32,
    ) -> Result<Self, DollError> {
        ensure_animations(&data, config)?;

        let mut skeleton = Skeleton::new(data);
        skeleton.x = x;
        skeleton.y = y;
        if config.y_down {
            skeleton.scale_y = -1.0;
        }

        let mut state = AnimationState::new(mixes);
        state.set_animation(0, &config.idle_animation, true)?;

        let mut doll = Self {
            skeleton,
            state,
            drag: DragState::Idle,
            idle_animation: config.idle_animation.clone(),
            pick_animation: config.pick_animation.clone(),
            grab_offset: config.grab_offset,
            y_down: config.y_down,
        };
        doll.pose();
        Ok(doll)
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn skeleton_mut(&mut self) -> &mut Skeleton {
        &mut self.skeleton
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AnimationState {
        &mut self.state
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_held(&self) -> bool {
        self.drag == DragState::Held
    }

    pub fn anchor(&self) -> (f32, f32) {
        (self.skeleton.x, self.skeleton.y)
    }

    pub fn set_anchor(&mut self, x: f32, y: f32) {
        self.skeleton.x = x;
        self.skeleton.y = y;
    }

    /// Hit box size from the skeleton header, already scaled at load.
    pub fn size(&self) -> (f32, f32) {
        (self.skeleton.data.width, self.skeleton.data.height)
    }

    /// Strict containment in the box extending half the width left and right of the anchor and
    /// the full height above it. "Above" is toward smaller y in y-down screen space.
    pub fn hit_test(&self, px: f32, py: f32) -> bool {
        let (x, y) = self.anchor();
        let (width, height) = self.size();
        let half = width / 2.0;
        let (bottom, top) = if self.y_down {
            (y - height, y)
        } else {
            (y, y + height)
        };
        px > x - half && px < x + half && py > bottom && py < top
    }

    /// Idle -> Held. Does nothing while already held.
    pub fn grab(&mut self) {
        if self.drag == DragState::Held {
            return;
        }
        self.drag = DragState::Held;
        let pick = self.pick_animation.clone();
        self.play(&pick);
    }

    /// Held -> Idle. Does nothing while idle.
    pub fn release(&mut self) {
        if self.drag == DragState::Idle {
            return;
        }
        self.drag = DragState::Idle;
        let idle = self.idle_animation.clone();
        self.play(&idle);
    }

    /// Drag step for a doll that may already be held: follow the pointer, then drop on release.
    pub fn track_pointer(&mut self, pointer: PointerState) {
        if self.drag != DragState::Held {
            return;
        }
        self.set_anchor(
            pointer.x + self.grab_offset[0],
            pointer.y + self.grab_offset[1],
        );
        if !pointer.pressed {
            self.release();
        }
    }

    /// Full single-doll interaction: a press inside grabs, then the pointer is tracked.
    pub fn handle_pointer(&mut self, pointer: PointerState) {
        if pointer.pressed && self.drag == DragState::Idle && self.hit_test(pointer.x, pointer.y)
        {
            self.grab();
        }
        self.track_pointer(pointer);
    }

    /// Advances playback by `delta` seconds and recomputes the pose.
    pub fn advance(&mut self, delta: f32) {
        self.state.update(delta);
        self.pose();
    }

    fn pose(&mut self) {
        self.state.apply(&mut self.skeleton);
        self.skeleton.update_world_transform();
    }

    fn play(&mut self, animation: &str) {
        if let Err(err) = self.state.set_animation(0, animation, true) {
            debug_assert!(false, "doll animation switch failed: {err}");
            log::warn!("ignoring switch to animation '{animation}': {err}");
        }
    }
}

/// Fails with `UnknownAnimation` unless both the idle and pick animations exist.
pub(crate) fn ensure_animations(
    data: &SkeletonData,
    config: &DollConfig,
) -> Result<(), DollError> {
    for name in [&config.idle_animation, &config.pick_animation] {
        if data.animation(name).is_none() {
            return Err(doll2d::Error::UnknownAnimation { name: name.clone() }.into());
        }
    }
    Ok(())
}
