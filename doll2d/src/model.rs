use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct BoneData {
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub inherit: Inherit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Inherit {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
}

impl Inherit {
    /// Maps the legacy `inheritRotation`/`inheritScale` flag pair onto an inherit mode.
    pub fn from_flags(inherit_rotation: bool, inherit_scale: bool) -> Self {
        match (inherit_rotation, inherit_scale) {
            (true, true) => Self::Normal,
            (true, false) => Self::NoScale,
            (false, true) => Self::NoRotationOrReflection,
            (false, false) => Self::OnlyTranslation,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlotData {
    pub name: String,
    pub bone: usize,
    pub attachment: Option<String>,
    pub color: [f32; 4],
    pub blend: BlendMode,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

/// Resolved atlas region referenced by a textured attachment.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRegion {
    pub page: usize,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
    pub rotate: bool,
    pub width: f32,
    pub height: f32,
    pub original_width: f32,
    pub original_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Clone, Debug)]
pub struct RegionAttachmentData {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    pub region: TextureRegion,
    /// Bone-local quad corners, counter-clockwise from bottom-left: `x1 y1 .. x4 y4`.
    pub offsets: [f32; 8],
    /// Texture coordinates matching `offsets`.
    pub uvs: [f32; 8],
}

impl RegionAttachmentData {
    pub(crate) fn update_offsets(&mut self) {
        let region = &self.region;
        let region_scale_x = self.width / region.original_width.max(f32::EPSILON) * self.scale_x;
        let region_scale_y = self.height / region.original_height.max(f32::EPSILON) * self.scale_y;
        let local_x = -self.width / 2.0 * self.scale_x + region.offset_x * region_scale_x;
        let local_y = -self.height / 2.0 * self.scale_y + region.offset_y * region_scale_y;
        let local_x2 = local_x + region.width * region_scale_x;
        let local_y2 = local_y + region.height * region_scale_y;

        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        self.offsets = [
            local_x_cos - local_y_sin,
            local_y_cos + local_x_sin,
            local_x_cos - local_y2_sin,
            local_y2_cos + local_x_sin,
            local_x2_cos - local_y2_sin,
            local_y2_cos + local_x2_sin,
            local_x2_cos - local_y_sin,
            local_y_cos + local_x2_sin,
        ];

        let TextureRegion { u, v, u2, v2, .. } = *region;
        self.uvs = if region.rotate {
            [u2, v2, u, v2, u, v, u2, v]
        } else {
            [u, v2, u, v, u2, v, u2, v2]
        };
    }
}

#[derive(Clone, Debug)]
pub struct MeshAttachmentData {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    pub region: TextureRegion,
    pub vertices: MeshVertices,
    /// Normalized UVs as stored in the skeleton, relative to the region.
    pub region_uvs: Vec<[f32; 2]>,
    /// Page-space UVs derived from `region_uvs` and the atlas region.
    pub uvs: Vec<[f32; 2]>,
    pub triangles: Vec<u32>,
    pub hull_length: usize,
    pub edges: Vec<u32>,
    pub width: f32,
    pub height: f32,
}

impl MeshAttachmentData {
    pub(crate) fn update_uvs(&mut self) {
        let region = &self.region;
        let width = region.u2 - region.u;
        let height = region.v2 - region.v;
        self.uvs = self
            .region_uvs
            .iter()
            .map(|&[x, y]| {
                if region.rotate {
                    [region.u + y * width, region.v + height - x * height]
                } else {
                    [region.u + x * width, region.v + y * height]
                }
            })
            .collect();
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Deform vector equivalent to the undeformed mesh: absolute positions for plain meshes and
    /// zero offsets for weighted ones.
    pub fn setup_deform(&self) -> Vec<f32> {
        match &self.vertices {
            MeshVertices::Unweighted(v) => v.iter().flatten().copied().collect(),
            MeshVertices::Weighted(_) => vec![0.0; self.deform_len()],
        }
    }

    /// Number of floats a deform key for this mesh carries.
    pub fn deform_len(&self) -> usize {
        match &self.vertices {
            MeshVertices::Unweighted(v) => v.len() * 2,
            MeshVertices::Weighted(v) => v.iter().map(Vec::len).sum::<usize>() * 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexWeight {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub enum MeshVertices {
    Unweighted(Vec<[f32; 2]>),
    Weighted(Vec<Vec<VertexWeight>>),
}

impl MeshVertices {
    pub fn len(&self) -> usize {
        match self {
            MeshVertices::Unweighted(v) => v.len(),
            MeshVertices::Weighted(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct BoundingBoxAttachmentData {
    pub name: String,
    pub vertices: Vec<[f32; 2]>,
}

#[derive(Clone, Debug)]
pub enum AttachmentData {
    Region(RegionAttachmentData),
    Mesh(MeshAttachmentData),
    BoundingBox(BoundingBoxAttachmentData),
}

impl AttachmentData {
    pub fn name(&self) -> &str {
        match self {
            AttachmentData::Region(a) => a.name.as_str(),
            AttachmentData::Mesh(a) => a.name.as_str(),
            AttachmentData::BoundingBox(a) => a.name.as_str(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SkinData {
    pub name: String,
    /// Indexed by slot; maps attachment key to attachment.
    pub attachments: Vec<HashMap<String, AttachmentData>>,
}

impl SkinData {
    pub fn attachment(&self, slot_index: usize, attachment_name: &str) -> Option<&AttachmentData> {
        self.attachments
            .get(slot_index)
            .and_then(|slot_map| slot_map.get(attachment_name))
    }
}

#[derive(Clone, Debug)]
pub struct EventData {
    pub name: String,
    pub int_value: i32,
    pub float_value: f32,
    pub string: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: f32,
    pub data: usize,
    pub name: String,
    pub int_value: i32,
    pub float_value: f32,
    pub string: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EventTimeline {
    pub events: Vec<Event>,
}

pub(crate) const BEZIER_SEGMENTS: usize = 10;
pub(crate) const BEZIER_POINTS: usize = (BEZIER_SEGMENTS - 1) * 2;

/// Interpolation shape between a keyframe and the next one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Curve {
    Linear,
    Stepped,
    /// Pre-sampled `x, y` points along a normalized cubic bezier.
    Bezier([f32; BEZIER_POINTS]),
}

impl Curve {
    /// Samples the bezier through `(cx1, cy1)` and `(cx2, cy2)` by forward differencing.
    pub fn bezier(cx1: f32, cy1: f32, cx2: f32, cy2: f32) -> Self {
        let subdiv1 = 1.0 / BEZIER_SEGMENTS as f32;
        let subdiv2 = subdiv1 * subdiv1;
        let subdiv3 = subdiv2 * subdiv1;
        let pre1 = 3.0 * subdiv1;
        let pre2 = 3.0 * subdiv2;
        let pre4 = 6.0 * subdiv2;
        let pre5 = 6.0 * subdiv3;
        let tmp1x = -cx1 * 2.0 + cx2;
        let tmp1y = -cy1 * 2.0 + cy2;
        let tmp2x = (cx1 - cx2) * 3.0 + 1.0;
        let tmp2y = (cy1 - cy2) * 3.0 + 1.0;
        let mut dfx = cx1 * pre1 + tmp1x * pre2 + tmp2x * subdiv3;
        let mut dfy = cy1 * pre1 + tmp1y * pre2 + tmp2y * subdiv3;
        let mut ddfx = tmp1x * pre4 + tmp2x * pre5;
        let mut ddfy = tmp1y * pre4 + tmp2y * pre5;
        let dddfx = tmp2x * pre5;
        let dddfy = tmp2y * pre5;

        let mut points = [0.0; BEZIER_POINTS];
        let mut x = dfx;
        let mut y = dfy;
        for pair in points.chunks_exact_mut(2) {
            pair[0] = x;
            pair[1] = y;
            dfx += ddfx;
            dfy += ddfy;
            ddfx += dddfx;
            ddfy += dddfy;
            x += dfx;
            y += dfy;
        }
        Curve::Bezier(points)
    }

    /// Shapes a linear `0..=1` progress value.
    pub fn percent(&self, percent: f32) -> f32 {
        let percent = percent.clamp(0.0, 1.0);
        match self {
            Curve::Linear => percent,
            Curve::Stepped => 0.0,
            Curve::Bezier(points) => {
                let mut prev_x = 0.0;
                let mut prev_y = 0.0;
                for pair in points.chunks_exact(2) {
                    let (x, y) = (pair[0], pair[1]);
                    if x >= percent {
                        if x - prev_x <= f32::EPSILON {
                            return y;
                        }
                        return prev_y + (y - prev_y) * (percent - prev_x) / (x - prev_x);
                    }
                    prev_x = x;
                    prev_y = y;
                }
                prev_y + (1.0 - prev_y) * (percent - prev_x) / (1.0 - prev_x)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RotateFrame {
    pub time: f32,
    pub angle: f32,
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct RotateTimeline {
    pub bone_index: usize,
    pub frames: Vec<RotateFrame>,
}

#[derive(Clone, Debug)]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct TranslateTimeline {
    pub bone_index: usize,
    pub frames: Vec<Vec2Frame>,
}

#[derive(Clone, Debug)]
pub struct ScaleTimeline {
    pub bone_index: usize,
    pub frames: Vec<Vec2Frame>,
}

#[derive(Clone, Debug)]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AttachmentTimeline {
    pub slot_index: usize,
    pub frames: Vec<AttachmentFrame>,
}

#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub time: f32,
    pub color: [f32; 4],
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct ColorTimeline {
    pub slot_index: usize,
    pub frames: Vec<ColorFrame>,
}

#[derive(Clone, Debug)]
pub struct DeformFrame {
    pub time: f32,
    /// Full vertex vector for the attachment (positions for plain meshes, offsets for weighted).
    pub vertices: Vec<f32>,
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct DeformTimeline {
    pub skin: String,
    pub slot_index: usize,
    pub attachment: String,
    pub frames: Vec<DeformFrame>,
}

/// Keyframed channel of one bone or slot. Bone values are stored as local pose values
/// with the setup pose already folded in.
#[derive(Clone, Debug)]
pub enum Timeline {
    Rotate(RotateTimeline),
    Translate(TranslateTimeline),
    Scale(ScaleTimeline),
    Attachment(AttachmentTimeline),
    Color(ColorTimeline),
    Deform(DeformTimeline),
}

impl Timeline {
    pub fn frame_count(&self) -> usize {
        match self {
            Timeline::Rotate(t) => t.frames.len(),
            Timeline::Translate(t) => t.frames.len(),
            Timeline::Scale(t) => t.frames.len(),
            Timeline::Attachment(t) => t.frames.len(),
            Timeline::Color(t) => t.frames.len(),
            Timeline::Deform(t) => t.frames.len(),
        }
    }

    pub fn last_time(&self) -> f32 {
        let last = match self {
            Timeline::Rotate(t) => t.frames.last().map(|f| f.time),
            Timeline::Translate(t) => t.frames.last().map(|f| f.time),
            Timeline::Scale(t) => t.frames.last().map(|f| f.time),
            Timeline::Attachment(t) => t.frames.last().map(|f| f.time),
            Timeline::Color(t) => t.frames.last().map(|f| f.time),
            Timeline::Deform(t) => t.frames.last().map(|f| f.time),
        };
        last.unwrap_or(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct DrawOrderFrame {
    pub time: f32,
    /// Draw order as setup slot indices; `None` restores the setup order.
    pub draw_order: Option<Vec<usize>>,
}

#[derive(Clone, Debug)]
pub struct DrawOrderTimeline {
    pub frames: Vec<DrawOrderFrame>,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub duration: f32,
    pub timelines: Vec<Timeline>,
    pub draw_order_timeline: Option<DrawOrderTimeline>,
    pub event_timeline: Option<EventTimeline>,
}

#[derive(Clone, Debug)]
pub struct SkeletonData {
    pub hash: Option<String>,
    pub version: Option<String>,
    pub images_path: Option<String>,
    pub width: f32,
    pub height: f32,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    /// Skins in file order; the unnamed setup skin is stored as `"default"` and comes first.
    pub skins: Vec<SkinData>,
    pub events: Vec<EventData>,
    pub animations: Vec<Animation>,
    pub animation_index: HashMap<String, usize>,
}

impl SkeletonData {
    pub fn animation(&self, name: &str) -> Option<(usize, &Animation)> {
        let index = *self.animation_index.get(name)?;
        Some((index, self.animations.get(index)?))
    }

    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn default_skin(&self) -> Option<&SkinData> {
        self.skin("default")
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn find_event(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|e| e.name == name)
    }
}
