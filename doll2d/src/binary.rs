//! Binary skeleton loader for the legacy (2.x) export format used by the doll assets.
//!
//! The loader is IO-free: it operates on an in-memory byte slice and an already parsed atlas.

use crate::{
    Animation, Atlas, AtlasRegion, AttachmentData, AttachmentFrame, AttachmentTimeline,
    BlendMode, BoneData, BoundingBoxAttachmentData, ColorFrame, ColorTimeline, Curve,
    DeformFrame, DeformTimeline, DrawOrderFrame, DrawOrderTimeline, Error, Event, EventData,
    EventTimeline, Inherit, MeshAttachmentData, MeshVertices, RegionAttachmentData, RotateFrame,
    RotateTimeline, ScaleTimeline, SkeletonData, SkinData, SlotData, TextureRegion, Timeline,
    TranslateTimeline, Vec2Frame, VertexWeight,
};
use byteorder::{BigEndian, ByteOrder};
use std::collections::HashMap;
use std::sync::Arc;

const CURVE_LINEAR: u8 = 0;
const CURVE_STEPPED: u8 = 1;
const CURVE_BEZIER: u8 = 2;

const ATTACHMENT_REGION: u8 = 0;
const ATTACHMENT_BOUNDING_BOX: u8 = 1;
const ATTACHMENT_MESH: u8 = 2;
const ATTACHMENT_SKINNED_MESH: u8 = 3;

const TIMELINE_SCALE: u8 = 0;
const TIMELINE_ROTATE: u8 = 1;
const TIMELINE_TRANSLATE: u8 = 2;
const TIMELINE_ATTACHMENT: u8 = 3;
const TIMELINE_COLOR: u8 = 4;
const TIMELINE_FLIP_X: u8 = 5;
const TIMELINE_FLIP_Y: u8 = 6;

/// Parses the atlas text and decodes the skeleton binary against it.
pub fn load_skeleton(
    atlas_text: &str,
    skeleton_bytes: &[u8],
    scale: f32,
) -> Result<(Atlas, Arc<SkeletonData>), Error> {
    let atlas = Atlas::parse(atlas_text)?;
    let data = SkeletonData::from_skel_bytes(&atlas, skeleton_bytes, scale)?;
    Ok((atlas, data))
}

struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn malformed(&self, message: impl Into<String>) -> Error {
        Error::MalformedAsset {
            offset: self.cursor,
            message: message.into(),
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let Some(&b) = self.bytes.get(self.cursor) else {
            return Err(self.malformed("unexpected EOF"));
        };
        self.cursor += 1;
        Ok(b)
    }

    fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    fn read_i32_be(&mut self) -> Result<i32, Error> {
        if self.remaining() < 4 {
            return Err(self.malformed("unexpected EOF"));
        }
        let v = BigEndian::read_i32(&self.bytes[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(v)
    }

    fn read_f32_be(&mut self) -> Result<f32, Error> {
        if self.remaining() < 4 {
            return Err(self.malformed("unexpected EOF"));
        }
        let v = BigEndian::read_f32(&self.bytes[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(v)
    }

    fn read_u16_be(&mut self) -> Result<u16, Error> {
        if self.remaining() < 2 {
            return Err(self.malformed("unexpected EOF"));
        }
        let v = BigEndian::read_u16(&self.bytes[self.cursor..self.cursor + 2]);
        self.cursor += 2;
        Ok(v)
    }

    fn read_varint(&mut self, optimize_positive: bool) -> Result<i32, Error> {
        let mut b = self.read_u8()?;
        let mut value: u32 = (b & 0x7F) as u32;
        if (b & 0x80) != 0 {
            b = self.read_u8()?;
            value |= ((b & 0x7F) as u32) << 7;
            if (b & 0x80) != 0 {
                b = self.read_u8()?;
                value |= ((b & 0x7F) as u32) << 14;
                if (b & 0x80) != 0 {
                    b = self.read_u8()?;
                    value |= ((b & 0x7F) as u32) << 21;
                    if (b & 0x80) != 0 {
                        b = self.read_u8()?;
                        value |= ((b & 0x7F) as u32) << 28;
                    }
                }
            }
        }

        if optimize_positive {
            Ok(value as i32)
        } else {
            Ok((value >> 1) as i32 ^ -((value & 1) as i32))
        }
    }

    /// Reads an element count. Every element occupies at least `min_element_size` bytes, so a
    /// count that cannot fit in the remaining input is rejected before anything is allocated.
    fn read_count(&mut self, what: &str, min_element_size: usize) -> Result<usize, Error> {
        let offset = self.cursor;
        let count = self.read_varint(true)? as u32 as usize;
        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(Error::MalformedAsset {
                offset,
                message: format!(
                    "{what} count {count} exceeds remaining input ({} bytes)",
                    self.remaining()
                ),
            });
        }
        Ok(count)
    }

    fn read_index(&mut self, what: &str, len: usize) -> Result<usize, Error> {
        let offset = self.cursor;
        let index = self.read_varint(true)? as u32 as usize;
        if index >= len {
            return Err(Error::MalformedAsset {
                offset,
                message: format!("{what} index {index} out of range (len={len})"),
            });
        }
        Ok(index)
    }

    /// Strings carry `chars + 1` (0 = null, 1 = empty) followed by 1-3 byte UTF-8 characters.
    fn read_string(&mut self) -> Result<Option<String>, Error> {
        let offset = self.cursor;
        let char_count = self.read_varint(true)? as u32 as usize;
        if char_count > self.remaining() + 1 {
            return Err(Error::MalformedAsset {
                offset,
                message: format!("string of {} chars exceeds remaining input", char_count - 1),
            });
        }
        match char_count {
            0 => return Ok(None),
            1 => return Ok(Some(String::new())),
            _ => {}
        }
        let mut out = String::with_capacity(char_count - 1);
        for _ in 1..char_count {
            let b = self.read_u8()? as u32;
            let code = match b >> 4 {
                0..=7 => b,
                12 | 13 => {
                    let b2 = self.read_u8()? as u32;
                    ((b & 0x1F) << 6) | (b2 & 0x3F)
                }
                14 => {
                    let b2 = self.read_u8()? as u32;
                    let b3 = self.read_u8()? as u32;
                    ((b & 0x0F) << 12) | ((b2 & 0x3F) << 6) | (b3 & 0x3F)
                }
                _ => return Err(self.malformed(format!("invalid utf-8 lead byte 0x{b:02x}"))),
            };
            let ch = char::from_u32(code)
                .ok_or_else(|| self.malformed(format!("invalid character U+{code:04X}")))?;
            out.push(ch);
        }
        Ok(Some(out))
    }

    fn read_required_string(&mut self, what: &str) -> Result<String, Error> {
        let offset = self.cursor;
        self.read_string()?.ok_or_else(|| Error::MalformedAsset {
            offset,
            message: format!("missing {what} name"),
        })
    }

    fn read_color_rgba(&mut self) -> Result<[f32; 4], Error> {
        let rgba = self.read_i32_be()? as u32;
        Ok([
            ((rgba >> 24) & 0xFF) as f32 / 255.0,
            ((rgba >> 16) & 0xFF) as f32 / 255.0,
            ((rgba >> 8) & 0xFF) as f32 / 255.0,
            (rgba & 0xFF) as f32 / 255.0,
        ])
    }

    fn read_float_array(&mut self, scale: f32) -> Result<Vec<f32>, Error> {
        let n = self.read_count("float array", 4)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_f32_be()? * scale);
        }
        Ok(out)
    }

    fn read_short_array(&mut self) -> Result<Vec<u32>, Error> {
        let n = self.read_count("short array", 2)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_u16_be()? as u32);
        }
        Ok(out)
    }

    fn read_int_array(&mut self) -> Result<Vec<u32>, Error> {
        let n = self.read_count("int array", 1)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_varint(true)? as u32);
        }
        Ok(out)
    }

    fn read_time(&mut self, previous: Option<f32>) -> Result<f32, Error> {
        let offset = self.cursor;
        let time = self.read_f32_be()?;
        if !time.is_finite() {
            return Err(Error::MalformedAsset {
                offset,
                message: format!("non-finite keyframe time {time}"),
            });
        }
        if previous.is_some_and(|previous| time <= previous) {
            return Err(Error::MalformedAsset {
                offset,
                message: format!("keyframe time {time} does not increase"),
            });
        }
        Ok(time)
    }
}

fn pairs(values: &[f32]) -> Vec<[f32; 2]> {
    values.chunks_exact(2).map(|c| [c[0], c[1]]).collect()
}

fn texture_region(region: &AtlasRegion) -> TextureRegion {
    TextureRegion {
        page: region.page,
        u: region.u,
        v: region.v,
        u2: region.u2,
        v2: region.v2,
        rotate: region.rotate,
        width: region.width as f32,
        height: region.height as f32,
        original_width: region.original_width as f32,
        original_height: region.original_height as f32,
        offset_x: region.offset_x as f32,
        offset_y: region.offset_y as f32,
    }
}

fn resolve_region(atlas: &Atlas, attachment: &str, path: &str) -> Result<TextureRegion, Error> {
    atlas
        .region(path)
        .map(texture_region)
        .ok_or_else(|| Error::MissingAtlasRegion {
            attachment: attachment.to_string(),
            path: path.to_string(),
        })
}

/// Running tally of decoded features that the runtime does not apply.
#[derive(Default)]
struct Ignored {
    ik_constraints: usize,
    ik_timelines: usize,
    flip_timelines: usize,
}

struct Loader<'a> {
    atlas: &'a Atlas,
    scale: f32,
    nonessential: bool,
    ignored: Ignored,
}

impl Loader<'_> {
    fn read_skin(
        &mut self,
        input: &mut BinaryInput<'_>,
        name: String,
        bones: &[BoneData],
        slot_count: usize,
    ) -> Result<Option<SkinData>, Error> {
        let entries = input.read_count("skin slot", 2)?;
        if entries == 0 {
            return Ok(None);
        }
        let mut attachments = vec![HashMap::new(); slot_count];
        for _ in 0..entries {
            let slot_index = input.read_index("slot", slot_count)?;
            let count = input.read_count("attachment", 2)?;
            for _ in 0..count {
                let key = input.read_required_string("attachment key")?;
                let attachment = self.read_attachment(input, &key, bones)?;
                attachments[slot_index].insert(key, attachment);
            }
        }
        Ok(Some(SkinData { name, attachments }))
    }

    fn read_attachment(
        &mut self,
        input: &mut BinaryInput<'_>,
        key: &str,
        bones: &[BoneData],
    ) -> Result<AttachmentData, Error> {
        let scale = self.scale;
        let name = input.read_string()?.unwrap_or_else(|| key.to_string());
        let kind_offset = input.cursor;
        match input.read_u8()? {
            ATTACHMENT_REGION => {
                let path = input.read_string()?.unwrap_or_else(|| name.clone());
                let x = input.read_f32_be()? * scale;
                let y = input.read_f32_be()? * scale;
                let scale_x = input.read_f32_be()?;
                let scale_y = input.read_f32_be()?;
                let rotation = input.read_f32_be()?;
                let width = input.read_f32_be()? * scale;
                let height = input.read_f32_be()? * scale;
                let color = input.read_color_rgba()?;
                let region = resolve_region(self.atlas, &name, &path)?;
                let mut attachment = RegionAttachmentData {
                    name,
                    path,
                    color,
                    x,
                    y,
                    rotation,
                    scale_x,
                    scale_y,
                    width,
                    height,
                    region,
                    offsets: [0.0; 8],
                    uvs: [0.0; 8],
                };
                attachment.update_offsets();
                Ok(AttachmentData::Region(attachment))
            }
            ATTACHMENT_BOUNDING_BOX => {
                let vertices = pairs(&input.read_float_array(scale)?);
                Ok(AttachmentData::BoundingBox(BoundingBoxAttachmentData {
                    name,
                    vertices,
                }))
            }
            kind @ (ATTACHMENT_MESH | ATTACHMENT_SKINNED_MESH) => {
                let path = input.read_string()?.unwrap_or_else(|| name.clone());
                let region_uvs = pairs(&input.read_float_array(1.0)?);
                let triangles = input.read_short_array()?;
                let vertices = if kind == ATTACHMENT_MESH {
                    let positions = pairs(&input.read_float_array(scale)?);
                    if positions.len() != region_uvs.len() {
                        return Err(input.malformed(format!(
                            "mesh '{name}' has {} vertices but {} uvs",
                            positions.len(),
                            region_uvs.len()
                        )));
                    }
                    MeshVertices::Unweighted(positions)
                } else {
                    self.read_weighted_vertices(input, bones, region_uvs.len())?
                };
                let vertex_count = vertices.len();
                if let Some(&bad) = triangles.iter().find(|&&t| t as usize >= vertex_count) {
                    return Err(input.malformed(format!(
                        "mesh '{name}' triangle index {bad} out of range (vertices={vertex_count})"
                    )));
                }
                let color = input.read_color_rgba()?;
                let hull_length = input.read_varint(true)? as u32 as usize;
                let (edges, width, height) = if self.nonessential {
                    let edges = input.read_int_array()?;
                    let width = input.read_f32_be()? * scale;
                    let height = input.read_f32_be()? * scale;
                    (edges, width, height)
                } else {
                    (Vec::new(), 0.0, 0.0)
                };
                let region = resolve_region(self.atlas, &name, &path)?;
                let mut mesh = MeshAttachmentData {
                    name,
                    path,
                    color,
                    region,
                    vertices,
                    region_uvs,
                    uvs: Vec::new(),
                    triangles,
                    hull_length,
                    edges,
                    width,
                    height,
                };
                mesh.update_uvs();
                Ok(AttachmentData::Mesh(mesh))
            }
            other => Err(Error::MalformedAsset {
                offset: kind_offset,
                message: format!("unknown attachment type {other} for '{name}'"),
            }),
        }
    }

    /// Weighted vertices are stored as a flat float run: `boneCount, (bone, x, y, weight)*` per vertex.
    fn read_weighted_vertices(
        &mut self,
        input: &mut BinaryInput<'_>,
        bones: &[BoneData],
        expected_vertices: usize,
    ) -> Result<MeshVertices, Error> {
        let float_count = input.read_count("skinned vertex float", 4)?;
        let mut vertices = Vec::with_capacity(expected_vertices);
        let mut read = 0;
        while read < float_count {
            let bone_count = input.read_f32_be()? as usize;
            read += 1;
            if read.saturating_add(bone_count.saturating_mul(4)) > float_count {
                return Err(input.malformed("skinned vertex runs past its float count"));
            }
            let mut weights = Vec::with_capacity(bone_count);
            for _ in 0..bone_count {
                let offset = input.cursor;
                let bone = input.read_f32_be()? as usize;
                if bone >= bones.len() {
                    return Err(Error::MalformedAsset {
                        offset,
                        message: format!("weighted vertex bone {bone} out of range"),
                    });
                }
                let x = input.read_f32_be()? * self.scale;
                let y = input.read_f32_be()? * self.scale;
                let weight = input.read_f32_be()?;
                weights.push(VertexWeight { bone, x, y, weight });
            }
            read += bone_count * 4;
            vertices.push(weights);
        }
        if vertices.len() != expected_vertices {
            return Err(input.malformed(format!(
                "skinned mesh has {} vertices but {expected_vertices} uvs",
                vertices.len()
            )));
        }
        Ok(MeshVertices::Weighted(vertices))
    }

    fn read_animation(
        &mut self,
        input: &mut BinaryInput<'_>,
        name: String,
        data: &SkeletonData,
        ik_count: usize,
    ) -> Result<Animation, Error> {
        let mut timelines = Vec::new();
        let mut duration: f32 = 0.0;

        // Slot timelines.
        let slot_timeline_groups = input.read_count("slot timeline group", 2)?;
        for _ in 0..slot_timeline_groups {
            let slot_index = input.read_index("slot", data.slots.len())?;
            let count = input.read_count("slot timeline", 2)?;
            for _ in 0..count {
                let kind_offset = input.cursor;
                let kind = input.read_u8()?;
                let frame_count = input.read_count("keyframe", 4)?;
                match kind {
                    TIMELINE_COLOR => {
                        let mut frames: Vec<ColorFrame> = Vec::with_capacity(frame_count);
                        for frame in 0..frame_count {
                            let time = input.read_time(frames.last().map(|f| f.time))?;
                            let color = input.read_color_rgba()?;
                            let curve = read_curve(input, frame + 1 < frame_count)?;
                            frames.push(ColorFrame { time, color, curve });
                        }
                        timelines.push(Timeline::Color(ColorTimeline { slot_index, frames }));
                    }
                    TIMELINE_ATTACHMENT => {
                        let mut frames: Vec<AttachmentFrame> = Vec::with_capacity(frame_count);
                        for _ in 0..frame_count {
                            let time = input.read_time(frames.last().map(|f| f.time))?;
                            let name = input.read_string()?;
                            frames.push(AttachmentFrame { time, name });
                        }
                        timelines.push(Timeline::Attachment(AttachmentTimeline {
                            slot_index,
                            frames,
                        }));
                    }
                    other => {
                        return Err(Error::MalformedAsset {
                            offset: kind_offset,
                            message: format!("unknown slot timeline type {other}"),
                        });
                    }
                }
            }
        }

        // Bone timelines. Keys are baked against the setup pose.
        let bone_timeline_groups = input.read_count("bone timeline group", 2)?;
        for _ in 0..bone_timeline_groups {
            let bone_index = input.read_index("bone", data.bones.len())?;
            let bone = &data.bones[bone_index];
            let count = input.read_count("bone timeline", 2)?;
            for _ in 0..count {
                let kind_offset = input.cursor;
                let kind = input.read_u8()?;
                let frame_count = input.read_count("keyframe", 4)?;
                match kind {
                    TIMELINE_ROTATE => {
                        let mut frames: Vec<RotateFrame> = Vec::with_capacity(frame_count);
                        for frame in 0..frame_count {
                            let time = input.read_time(frames.last().map(|f| f.time))?;
                            let angle = bone.rotation + input.read_f32_be()?;
                            let curve = read_curve(input, frame + 1 < frame_count)?;
                            frames.push(RotateFrame { time, angle, curve });
                        }
                        timelines.push(Timeline::Rotate(RotateTimeline { bone_index, frames }));
                    }
                    TIMELINE_TRANSLATE | TIMELINE_SCALE => {
                        let mut frames: Vec<Vec2Frame> = Vec::with_capacity(frame_count);
                        for frame in 0..frame_count {
                            let time = input.read_time(frames.last().map(|f| f.time))?;
                            let x = input.read_f32_be()?;
                            let y = input.read_f32_be()?;
                            let (x, y) = if kind == TIMELINE_TRANSLATE {
                                (bone.x + x * self.scale, bone.y + y * self.scale)
                            } else {
                                (bone.scale_x * x, bone.scale_y * y)
                            };
                            let curve = read_curve(input, frame + 1 < frame_count)?;
                            frames.push(Vec2Frame { time, x, y, curve });
                        }
                        timelines.push(if kind == TIMELINE_TRANSLATE {
                            Timeline::Translate(TranslateTimeline { bone_index, frames })
                        } else {
                            Timeline::Scale(ScaleTimeline { bone_index, frames })
                        });
                    }
                    TIMELINE_FLIP_X | TIMELINE_FLIP_Y => {
                        let mut last = None;
                        for _ in 0..frame_count {
                            last = Some(input.read_time(last)?);
                            input.read_bool()?;
                        }
                        duration = duration.max(last.unwrap_or(0.0));
                        self.ignored.flip_timelines += 1;
                    }
                    other => {
                        return Err(Error::MalformedAsset {
                            offset: kind_offset,
                            message: format!("unknown bone timeline type {other}"),
                        });
                    }
                }
            }
        }

        // IK timelines.
        let ik_timelines = input.read_count("ik timeline", 2)?;
        for _ in 0..ik_timelines {
            input.read_index("ik constraint", ik_count)?;
            let frame_count = input.read_count("keyframe", 4)?;
            let mut last = None;
            for frame in 0..frame_count {
                last = Some(input.read_time(last)?);
                input.read_f32_be()?;
                input.read_i8()?;
                read_curve(input, frame + 1 < frame_count)?;
            }
            duration = duration.max(last.unwrap_or(0.0));
            self.ignored.ik_timelines += 1;
        }

        // Deform timelines.
        let deform_skins = input.read_count("deform skin", 2)?;
        for _ in 0..deform_skins {
            let skin_index = input.read_index("skin", data.skins.len())?;
            let skin = &data.skins[skin_index];
            let slots = input.read_count("deform slot", 2)?;
            for _ in 0..slots {
                let slot_index = input.read_index("slot", data.slots.len())?;
                let attachments = input.read_count("deform attachment", 2)?;
                for _ in 0..attachments {
                    let attachment = input.read_required_string("deform attachment")?;
                    let Some(AttachmentData::Mesh(mesh)) =
                        skin.attachment(slot_index, &attachment)
                    else {
                        return Err(input.malformed(format!(
                            "deform timeline targets '{attachment}' which is not a mesh in skin '{}'",
                            skin.name
                        )));
                    };
                    let frames = self.read_deform_frames(input, mesh)?;
                    timelines.push(Timeline::Deform(DeformTimeline {
                        skin: skin.name.clone(),
                        slot_index,
                        attachment,
                        frames,
                    }));
                }
            }
        }

        timelines.retain(|t| t.frame_count() > 0);

        let draw_order_timeline = read_draw_order_timeline(input, data.slots.len())?;
        let event_timeline = read_event_timeline(input, &data.events)?;

        for timeline in &timelines {
            duration = duration.max(timeline.last_time());
        }
        if let Some(t) = draw_order_timeline.as_ref().and_then(|t| t.frames.last()) {
            duration = duration.max(t.time);
        }
        if let Some(e) = event_timeline.as_ref().and_then(|t| t.events.last()) {
            duration = duration.max(e.time);
        }

        Ok(Animation {
            name,
            duration,
            timelines,
            draw_order_timeline,
            event_timeline,
        })
    }

    fn read_deform_frames(
        &self,
        input: &mut BinaryInput<'_>,
        mesh: &MeshAttachmentData,
    ) -> Result<Vec<DeformFrame>, Error> {
        let frame_count = input.read_count("keyframe", 4)?;
        let vertex_len = mesh.deform_len();
        let mut frames: Vec<DeformFrame> = Vec::with_capacity(frame_count);
        for frame in 0..frame_count {
            let time = input.read_time(frames.last().map(|f| f.time))?;
            let end = input.read_varint(true)? as u32 as usize;
            let vertices = if end == 0 {
                mesh.setup_deform()
            } else {
                let start = input.read_varint(true)? as u32 as usize;
                if start.saturating_add(end) > vertex_len {
                    return Err(input.malformed(format!(
                        "deform key [{start}, {}) exceeds vertex length {vertex_len} of '{}'",
                        start.saturating_add(end),
                        mesh.name
                    )));
                }
                let mut vertices = vec![0.0; vertex_len];
                for v in &mut vertices[start..start + end] {
                    *v = input.read_f32_be()? * self.scale;
                }
                if let MeshVertices::Unweighted(setup) = &mesh.vertices {
                    for (v, s) in vertices.iter_mut().zip(setup.iter().flatten()) {
                        *v += s;
                    }
                }
                vertices
            };
            let curve = read_curve(input, frame + 1 < frame_count)?;
            frames.push(DeformFrame {
                time,
                vertices,
                curve,
            });
        }
        Ok(frames)
    }
}

fn read_curve(input: &mut BinaryInput<'_>, present: bool) -> Result<Curve, Error> {
    if !present {
        return Ok(Curve::Linear);
    }
    let offset = input.cursor;
    match input.read_u8()? {
        CURVE_LINEAR => Ok(Curve::Linear),
        CURVE_STEPPED => Ok(Curve::Stepped),
        CURVE_BEZIER => {
            let cx1 = input.read_f32_be()?;
            let cy1 = input.read_f32_be()?;
            let cx2 = input.read_f32_be()?;
            let cy2 = input.read_f32_be()?;
            Ok(Curve::bezier(cx1, cy1, cx2, cy2))
        }
        other => Err(Error::MalformedAsset {
            offset,
            message: format!("invalid curve type {other}"),
        }),
    }
}

/// Each key lists only the slots that moved as `(slot, offset)` pairs; every other slot keeps its
/// relative order in the remaining positions.
fn read_draw_order_timeline(
    input: &mut BinaryInput<'_>,
    slot_count: usize,
) -> Result<Option<DrawOrderTimeline>, Error> {
    let frame_count = input.read_count("draw order key", 5)?;
    if frame_count == 0 {
        return Ok(None);
    }
    let mut frames: Vec<DrawOrderFrame> = Vec::with_capacity(frame_count);
    for _ in 0..frame_count {
        let offset_count = input.read_count("draw order offset", 2)?;
        if offset_count > slot_count {
            return Err(input.malformed(format!(
                "draw order key moves {offset_count} slots but only {slot_count} exist"
            )));
        }
        let mut draw_order: Vec<Option<usize>> = vec![None; slot_count];
        let mut unchanged = Vec::with_capacity(slot_count - offset_count);
        let mut original_index = 0;
        for _ in 0..offset_count {
            let slot_index = input.read_index("slot", slot_count)?;
            if slot_index < original_index {
                return Err(input.malformed("draw order offsets are not sorted by slot"));
            }
            while original_index != slot_index {
                unchanged.push(original_index);
                original_index += 1;
            }
            let shift = input.read_varint(true)? as i64;
            let target = original_index as i64 + shift;
            let slot = usize::try_from(target)
                .ok()
                .and_then(|t| draw_order.get_mut(t))
                .filter(|s| s.is_none())
                .ok_or_else(|| input.malformed(format!("draw order target {target} invalid")))?;
            *slot = Some(original_index);
            original_index += 1;
        }
        unchanged.extend(original_index..slot_count);
        let mut unchanged = unchanged.into_iter().rev();
        for entry in draw_order.iter_mut().rev() {
            if entry.is_none() {
                *entry = unchanged.next();
            }
        }
        let draw_order = draw_order
            .into_iter()
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| input.malformed("draw order key leaves slots unassigned"))?;
        let time = input.read_time(frames.last().map(|f| f.time))?;
        frames.push(DrawOrderFrame {
            time,
            draw_order: Some(draw_order),
        });
    }
    Ok(Some(DrawOrderTimeline { frames }))
}

fn read_event_timeline(
    input: &mut BinaryInput<'_>,
    event_defs: &[EventData],
) -> Result<Option<EventTimeline>, Error> {
    let count = input.read_count("event key", 7)?;
    if count == 0 {
        return Ok(None);
    }
    let mut events: Vec<Event> = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = input.cursor;
        let time = input.read_f32_be()?;
        // Several events may share a key time.
        if !time.is_finite() || events.last().is_some_and(|e| time < e.time) {
            return Err(Error::MalformedAsset {
                offset,
                message: format!("event time {time} out of order"),
            });
        }
        let index = input.read_index("event", event_defs.len())?;
        let def = &event_defs[index];
        let int_value = input.read_varint(false)?;
        let float_value = input.read_f32_be()?;
        let string = if input.read_bool()? {
            input.read_string()?
        } else {
            def.string.clone()
        };
        events.push(Event {
            time,
            data: index,
            name: def.name.clone(),
            int_value,
            float_value,
            string,
        });
    }
    Ok(Some(EventTimeline { events }))
}

impl SkeletonData {
    pub fn from_skel_bytes(atlas: &Atlas, bytes: &[u8], scale: f32) -> Result<Arc<Self>, Error> {
        let scale = if scale.is_finite() { scale } else { 1.0 };
        let mut input = BinaryInput::new(bytes);

        let hash = input.read_string()?.filter(|h| !h.is_empty());
        let version = input.read_string()?.filter(|v| !v.is_empty());
        let width = input.read_f32_be()? * scale;
        let height = input.read_f32_be()? * scale;
        let nonessential = input.read_bool()?;
        let images_path = if nonessential {
            input.read_string()?
        } else {
            None
        };

        let mut loader = Loader {
            atlas,
            scale,
            nonessential,
            ignored: Ignored::default(),
        };

        // Bones.
        let bone_count = input.read_count("bone", 30)?;
        let mut bones: Vec<BoneData> = Vec::with_capacity(bone_count);
        for index in 0..bone_count {
            let name = input.read_required_string("bone")?;
            let parent_offset = input.cursor;
            let parent = match input.read_varint(true)? as u32 as usize {
                0 => None,
                p if p - 1 < index => Some(p - 1),
                p => {
                    return Err(Error::MalformedAsset {
                        offset: parent_offset,
                        message: format!(
                            "bone '{name}' (index {index}) has parent index {} which does not precede it",
                            p - 1
                        ),
                    });
                }
            };
            if parent.is_none() && index > 0 {
                return Err(Error::MalformedAsset {
                    offset: parent_offset,
                    message: format!("bone '{name}' is a second root"),
                });
            }
            let x = input.read_f32_be()? * scale;
            let y = input.read_f32_be()? * scale;
            let scale_x = input.read_f32_be()?;
            let scale_y = input.read_f32_be()?;
            let rotation = input.read_f32_be()?;
            let length = input.read_f32_be()? * scale;
            let flip_x = input.read_bool()?;
            let flip_y = input.read_bool()?;
            let inherit_scale = input.read_bool()?;
            let inherit_rotation = input.read_bool()?;
            if nonessential {
                input.read_i32_be()?;
            }
            bones.push(BoneData {
                name,
                parent,
                length,
                x,
                y,
                rotation,
                scale_x: if flip_x { -scale_x } else { scale_x },
                scale_y: if flip_y { -scale_y } else { scale_y },
                shear_x: 0.0,
                shear_y: 0.0,
                inherit: Inherit::from_flags(inherit_rotation, inherit_scale),
            });
        }

        // IK constraints.
        let ik_count = input.read_count("ik constraint", 4)?;
        for _ in 0..ik_count {
            input.read_required_string("ik constraint")?;
            let constrained = input.read_count("ik bone", 1)?;
            for _ in 0..constrained {
                input.read_index("ik bone", bones.len())?;
            }
            input.read_index("ik target", bones.len())?;
            input.read_f32_be()?;
            input.read_i8()?;
        }
        loader.ignored.ik_constraints = ik_count;

        // Slots.
        let slot_count = input.read_count("slot", 8)?;
        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            let name = input.read_required_string("slot")?;
            let bone = input.read_index("bone", bones.len())?;
            let color = input.read_color_rgba()?;
            let attachment = input.read_string()?;
            let blend = if input.read_bool()? {
                BlendMode::Additive
            } else {
                BlendMode::Normal
            };
            slots.push(SlotData {
                name,
                bone,
                attachment,
                color,
                blend,
            });
        }

        // Skins: the unnamed default skin first, then named skins.
        let mut skins = Vec::new();
        if let Some(skin) =
            loader.read_skin(&mut input, "default".to_string(), &bones, slots.len())?
        {
            skins.push(skin);
        }
        let named_skins = input.read_count("skin", 2)?;
        for _ in 0..named_skins {
            let name = input.read_required_string("skin")?;
            let skin = loader
                .read_skin(&mut input, name.clone(), &bones, slots.len())?
                .unwrap_or_else(|| SkinData {
                    name,
                    attachments: vec![HashMap::new(); slots.len()],
                });
            skins.push(skin);
        }

        // Events.
        let event_count = input.read_count("event", 7)?;
        let mut events = Vec::with_capacity(event_count);
        for _ in 0..event_count {
            let name = input.read_required_string("event")?;
            let int_value = input.read_varint(false)?;
            let float_value = input.read_f32_be()?;
            let string = input.read_string()?;
            events.push(EventData {
                name,
                int_value,
                float_value,
                string,
            });
        }

        let mut data = SkeletonData {
            hash,
            version,
            images_path,
            width,
            height,
            bones,
            slots,
            skins,
            events,
            animations: Vec::new(),
            animation_index: HashMap::new(),
        };

        let animation_count = input.read_count("animation", 7)?;
        for index in 0..animation_count {
            let name = input.read_required_string("animation")?;
            let animation = loader.read_animation(&mut input, name, &data, ik_count)?;
            data.animation_index
                .entry(animation.name.clone())
                .or_insert(index);
            data.animations.push(animation);
        }

        if input.remaining() != 0 {
            return Err(input.malformed(format!("{} trailing bytes", input.remaining())));
        }

        let ignored = &loader.ignored;
        if ignored.ik_constraints + ignored.ik_timelines + ignored.flip_timelines > 0 {
            log::warn!(
                "skeleton decoded {} ik constraints, {} ik timelines and {} flip timelines which are not applied",
                ignored.ik_constraints,
                ignored.ik_timelines,
                ignored.flip_timelines
            );
        }
        log::debug!(
            "loaded skeleton version={:?} bones={} slots={} skins={} events={} animations={}",
            data.version,
            data.bones.len(),
            data.slots.len(),
            data.skins.len(),
            data.events.len(),
            data.animations.len()
        );

        Ok(Arc::new(data))
    }
}
