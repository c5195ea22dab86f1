/// Pointer sample taken by the driver once per frame, in screen coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    /// Primary button is down.
    pub pressed: bool,
}

impl PointerState {
    pub fn new(x: f32, y: f32, pressed: bool) -> Self {
        Self { x, y, pressed }
    }

    pub fn released(x: f32, y: f32) -> Self {
        Self::new(x, y, false)
    }

    pub fn pressed(x: f32, y: f32) -> Self {
        Self::new(x, y, true)
    }
}
