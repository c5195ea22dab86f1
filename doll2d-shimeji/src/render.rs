use doll2d::{DrawList, Skeleton};

/// Receives the posed dolls of a frame. Implemented by the windowing/GPU side.
pub trait PoseRenderer {
    fn begin_frame(&mut self) {}

    /// Called once per doll in spawn order. `draw_list` indexes atlas pages the way
    /// [`doll2d::Atlas::pages`] does and is only valid for the duration of the call.
    fn draw_doll(&mut self, doll_index: usize, skeleton: &Skeleton, draw_list: &DrawList);

    fn end_frame(&mut self) {}
}
