use crate::{AttachmentData, Error, MeshVertices, SkeletonData};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Bone {
    data_index: usize,
    parent: Option<usize>,

    pub inherit: crate::Inherit,

    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,

    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,
}

impl Bone {
    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// World rotation of the local x axis, in degrees.
    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    pub fn local_to_world(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        (
            self.a * local_x + self.b * local_y + self.world_x,
            self.c * local_x + self.d * local_y + self.world_y,
        )
    }

    pub fn world_to_local(&self, world_x: f32, world_y: f32) -> (f32, f32) {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() <= f32::EPSILON {
            return (0.0, 0.0);
        }
        let inv_det = 1.0 / det;
        let x = world_x - self.world_x;
        let y = world_y - self.world_y;
        (
            (x * self.d - y * self.b) * inv_det,
            (y * self.a - x * self.c) * inv_det,
        )
    }

    /// World transform as a `glam` affine (columns `a c`, `b d`, translation).
    #[cfg(feature = "glam")]
    pub fn world_matrix(&self) -> glam::Affine2 {
        glam::Affine2::from_cols_array(&[
            self.a,
            self.c,
            self.b,
            self.d,
            self.world_x,
            self.world_y,
        ])
    }
}

#[derive(Clone, Debug)]
pub struct Slot {
    data_index: usize,
    pub bone: usize,
    /// Attachment key, resolved through the active skin and then the default skin.
    pub attachment: Option<String>,
    /// Deformed vertex vector for the current mesh attachment; empty means undeformed.
    pub deform: Vec<f32>,
    pub color: [f32; 4],
    pub blend: crate::BlendMode,
}

impl Slot {
    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

/// Mutable pose of one skeleton instance.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<SkeletonData>,
    pub bones: Vec<Bone>,
    pub slots: Vec<Slot>,
    pub draw_order: Vec<usize>,
    pub skin: Option<String>,
    pub color: [f32; 4],
    /// Anchor of the root bone's parent space.
    pub x: f32,
    pub y: f32,
    /// Skeleton-level scale; `scale_y = -1` flips the pose into y-down screen space.
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Skeleton {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let bones = data
            .bones
            .iter()
            .enumerate()
            .map(|(data_index, bone)| Bone {
                data_index,
                parent: bone.parent,
                inherit: bone.inherit,
                x: bone.x,
                y: bone.y,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                shear_x: bone.shear_x,
                shear_y: bone.shear_y,
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                world_x: 0.0,
                world_y: 0.0,
            })
            .collect::<Vec<_>>();

        let slots = data
            .slots
            .iter()
            .enumerate()
            .map(|(data_index, slot)| Slot {
                data_index,
                bone: slot.bone,
                attachment: None,
                deform: Vec::new(),
                color: slot.color,
                blend: slot.blend,
            })
            .collect::<Vec<_>>();

        let draw_order = (0..slots.len()).collect::<Vec<_>>();

        let mut skeleton = Self {
            data,
            bones,
            slots,
            draw_order,
            skin: None,
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        skeleton.set_slots_to_setup_pose();
        skeleton
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.data.find_bone(name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.data.find_slot(name)
    }

    pub fn set_to_setup_pose(&mut self) {
        self.set_bones_to_setup_pose();
        self.set_slots_to_setup_pose();
    }

    pub fn set_bones_to_setup_pose(&mut self) {
        for (bone, data) in self.bones.iter_mut().zip(self.data.bones.iter()) {
            bone.inherit = data.inherit;
            bone.x = data.x;
            bone.y = data.y;
            bone.rotation = data.rotation;
            bone.scale_x = data.scale_x;
            bone.scale_y = data.scale_y;
            bone.shear_x = data.shear_x;
            bone.shear_y = data.shear_y;
        }
    }

    /// Restores slot colors, setup attachments, and the setup draw order. Deforms are cleared.
    pub fn set_slots_to_setup_pose(&mut self) {
        self.draw_order.clear();
        self.draw_order.extend(0..self.slots.len());

        for index in 0..self.slots.len() {
            let Some(data) = self.data.slots.get(index) else {
                continue;
            };
            let attachment = data
                .attachment
                .as_deref()
                .filter(|name| self.attachment(index, name).is_some())
                .map(str::to_string);
            let slot = &mut self.slots[index];
            slot.color = data.color;
            slot.blend = data.blend;
            slot.attachment = attachment;
            slot.deform.clear();
        }
    }

    /// Switches the active skin. Slots with no attachment pick up the skin's attachment for their
    /// setup name when switching from no skin; attachment keys shared by both skins resolve
    /// through the new skin automatically.
    pub fn set_skin(&mut self, skin_name: Option<&str>) -> Result<(), Error> {
        let Some(name) = skin_name else {
            self.skin = None;
            return Ok(());
        };
        let Some(new_skin) = self.data.skin(name) else {
            return Err(Error::UnknownSkin {
                name: name.to_string(),
            });
        };

        if self.skin.is_none() {
            for (slot_index, slot) in self.slots.iter_mut().enumerate() {
                let Some(setup_name) = self
                    .data
                    .slots
                    .get(slot_index)
                    .and_then(|s| s.attachment.as_deref())
                else {
                    continue;
                };
                if new_skin.attachment(slot_index, setup_name).is_some() {
                    slot.attachment = Some(setup_name.to_string());
                    slot.deform.clear();
                }
            }
        }

        self.skin = Some(name.to_string());
        Ok(())
    }

    /// Looks up an attachment by key in the active skin, falling back to the default skin.
    pub fn attachment(&self, slot_index: usize, attachment_name: &str) -> Option<&AttachmentData> {
        if let Some(skin) = self.skin.as_deref().and_then(|n| self.data.skin(n)) {
            if let Some(att) = skin.attachment(slot_index, attachment_name) {
                return Some(att);
            }
            if skin.name == "default" {
                return None;
            }
        }
        self.data
            .default_skin()
            .and_then(|s| s.attachment(slot_index, attachment_name))
    }

    pub fn slot_attachment(&self, slot_index: usize) -> Option<&AttachmentData> {
        let key = self.slots.get(slot_index)?.attachment.as_deref()?;
        self.attachment(slot_index, key)
    }

    /// Sets a slot's attachment by key. `None` clears it. Unknown keys are an error.
    pub fn set_attachment(
        &mut self,
        slot_index: usize,
        attachment_name: Option<&str>,
    ) -> Result<(), Error> {
        if slot_index >= self.slots.len() {
            return Err(Error::InvalidValue {
                message: format!("slot index {slot_index} out of range"),
            });
        }
        let key = match attachment_name {
            Some(name) => {
                if self.attachment(slot_index, name).is_none() {
                    return Err(Error::InvalidValue {
                        message: format!("attachment '{name}' not found for slot {slot_index}"),
                    });
                }
                Some(name.to_string())
            }
            None => None,
        };
        let slot = &mut self.slots[slot_index];
        if slot.attachment != key {
            slot.deform.clear();
        }
        slot.attachment = key;
        Ok(())
    }

    /// Recomputes world transforms root to leaves. Bone data is ordered parent-first.
    pub fn update_world_transform(&mut self) {
        let (x, y, scale_x, scale_y) = (self.x, self.y, self.scale_x, self.scale_y);
        for index in 0..self.bones.len() {
            let (before, rest) = self.bones.split_at_mut(index);
            let bone = &mut rest[0];
            match bone.parent.and_then(|p| before.get(p)) {
                Some(parent) => {
                    let parent = ParentTransform::of(parent);
                    update_world_transform_child(bone, scale_x, scale_y, &parent);
                }
                None => update_world_transform_root(bone, x, y, scale_x, scale_y),
            }
        }
    }

    /// World-space positions (`x0 y0 x1 y1 ..`) of the slot's current attachment. Region
    /// attachments yield their four quad corners; meshes honor the slot's deform vector.
    pub fn slot_world_vertices(&self, slot_index: usize) -> Option<Vec<f32>> {
        let slot = self.slots.get(slot_index)?;
        let bone = self.bones.get(slot.bone)?;
        match self.slot_attachment(slot_index)? {
            AttachmentData::Region(region) => {
                let mut out = Vec::with_capacity(8);
                for corner in region.offsets.chunks_exact(2) {
                    let (wx, wy) = bone.local_to_world(corner[0], corner[1]);
                    out.push(wx);
                    out.push(wy);
                }
                Some(out)
            }
            AttachmentData::Mesh(mesh) => Some(self.mesh_world_vertices(slot, &mesh.vertices)),
            AttachmentData::BoundingBox(bbox) => Some(
                bbox.vertices
                    .iter()
                    .flat_map(|&[vx, vy]| {
                        let (wx, wy) = bone.local_to_world(vx, vy);
                        [wx, wy]
                    })
                    .collect(),
            ),
        }
    }

    fn mesh_world_vertices(&self, slot: &Slot, vertices: &MeshVertices) -> Vec<f32> {
        let deform = slot.deform.as_slice();
        match vertices {
            MeshVertices::Unweighted(v) => {
                let Some(bone) = self.bones.get(slot.bone) else {
                    return Vec::new();
                };
                let use_deform = deform.len() == v.len() * 2;
                let mut out = Vec::with_capacity(v.len() * 2);
                for (i, p) in v.iter().enumerate() {
                    let (vx, vy) = if use_deform {
                        (deform[i * 2], deform[i * 2 + 1])
                    } else {
                        (p[0], p[1])
                    };
                    let (wx, wy) = bone.local_to_world(vx, vy);
                    out.push(wx);
                    out.push(wy);
                }
                out
            }
            MeshVertices::Weighted(v) => {
                let mut out = Vec::with_capacity(v.len() * 2);
                let mut f = 0usize;
                for weights in v {
                    let mut wx = 0.0f32;
                    let mut wy = 0.0f32;
                    for wgt in weights {
                        let dx = deform.get(f).copied().unwrap_or(0.0);
                        let dy = deform.get(f + 1).copied().unwrap_or(0.0);
                        f += 2;
                        let Some(b) = self.bones.get(wgt.bone) else {
                            continue;
                        };
                        let (x, y) = b.local_to_world(wgt.x + dx, wgt.y + dy);
                        wx += x * wgt.weight;
                        wy += y * wgt.weight;
                    }
                    out.push(wx);
                    out.push(wy);
                }
                out
            }
        }
    }
}

struct ParentTransform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    world_x: f32,
    world_y: f32,
}

impl ParentTransform {
    fn of(bone: &Bone) -> Self {
        Self {
            a: bone.a,
            b: bone.b,
            c: bone.c,
            d: bone.d,
            world_x: bone.world_x,
            world_y: bone.world_y,
        }
    }
}

/// Local 2x2 from scale, shear and rotation: columns are the rotated, sheared and scaled axes.
fn local_matrix(bone: &Bone, rotation_offset: f32) -> (f32, f32, f32, f32) {
    let rotation_x = (bone.rotation + bone.shear_x - rotation_offset).to_radians();
    let rotation_y = (bone.rotation + 90.0 + bone.shear_y - rotation_offset).to_radians();
    (
        rotation_x.cos() * bone.scale_x,
        rotation_y.cos() * bone.scale_y,
        rotation_x.sin() * bone.scale_x,
        rotation_y.sin() * bone.scale_y,
    )
}

fn update_world_transform_root(bone: &mut Bone, x: f32, y: f32, scale_x: f32, scale_y: f32) {
    let (la, lb, lc, ld) = local_matrix(bone, 0.0);
    bone.a = la * scale_x;
    bone.b = lb * scale_x;
    bone.c = lc * scale_y;
    bone.d = ld * scale_y;
    bone.world_x = bone.x * scale_x + x;
    bone.world_y = bone.y * scale_y + y;
}

fn safe_recip(v: f32) -> f32 {
    if v.abs() > 1.0e-12 { 1.0 / v } else { 0.0 }
}

fn update_world_transform_child(
    bone: &mut Bone,
    skeleton_scale_x: f32,
    skeleton_scale_y: f32,
    parent: &ParentTransform,
) {
    let mut pa = parent.a;
    let mut pb = parent.b;
    let mut pc = parent.c;
    let mut pd = parent.d;

    bone.world_x = pa * bone.x + pb * bone.y + parent.world_x;
    bone.world_y = pc * bone.x + pd * bone.y + parent.world_y;

    match bone.inherit {
        crate::Inherit::Normal => {
            let (la, lb, lc, ld) = local_matrix(bone, 0.0);
            bone.a = pa * la + pb * lc;
            bone.b = pa * lb + pb * ld;
            bone.c = pc * la + pd * lc;
            bone.d = pc * lb + pd * ld;
        }
        crate::Inherit::OnlyTranslation => {
            let (la, lb, lc, ld) = local_matrix(bone, 0.0);
            bone.a = la * skeleton_scale_x;
            bone.b = lb * skeleton_scale_x;
            bone.c = lc * skeleton_scale_y;
            bone.d = ld * skeleton_scale_y;
        }
        crate::Inherit::NoRotationOrReflection => {
            let sx = safe_recip(skeleton_scale_x);
            let sy = safe_recip(skeleton_scale_y);
            pa *= sx;
            pc *= sy;

            let mut s = pa * pa + pc * pc;
            let prx;
            if s > 1.0e-4 {
                s = (pa * pd * sy - pb * sx * pc).abs() / s;
                pb = pc * s;
                pd = pa * s;
                prx = pc.atan2(pa).to_degrees();
            } else {
                pa = 0.0;
                pc = 0.0;
                prx = 90.0 - pd.atan2(pb).to_degrees();
            }

            let (la, lb, lc, ld) = local_matrix(bone, prx);
            bone.a = (pa * la - pb * lc) * skeleton_scale_x;
            bone.b = (pa * lb - pb * ld) * skeleton_scale_x;
            bone.c = (pc * la + pd * lc) * skeleton_scale_y;
            bone.d = (pc * lb + pd * ld) * skeleton_scale_y;
        }
        crate::Inherit::NoScale => {
            let (sin, cos) = bone.rotation.to_radians().sin_cos();
            let za = (pa * cos + pb * sin) * safe_recip(skeleton_scale_x);
            let zc = (pc * cos + pd * sin) * safe_recip(skeleton_scale_y);
            let mut s = (za * za + zc * zc).sqrt();
            if s > 1.0e-5 {
                s = 1.0 / s;
            }
            let za = za * s;
            let zc = zc * s;

            let mut s2 = (za * za + zc * zc).sqrt();
            let det = pa * pd - pb * pc;
            if (det < 0.0) != ((skeleton_scale_x < 0.0) != (skeleton_scale_y < 0.0)) {
                s2 = -s2;
            }

            let rotation = std::f32::consts::FRAC_PI_2 + zc.atan2(za);
            let zb = rotation.cos() * s2;
            let zd = rotation.sin() * s2;

            let shear_x = bone.shear_x.to_radians();
            let shear_y = (90.0 + bone.shear_y).to_radians();
            let la = shear_x.cos() * bone.scale_x;
            let lb = shear_y.cos() * bone.scale_y;
            let lc = shear_x.sin() * bone.scale_x;
            let ld = shear_y.sin() * bone.scale_y;

            bone.a = (za * la + zb * lc) * skeleton_scale_x;
            bone.b = (za * lb + zb * ld) * skeleton_scale_x;
            bone.c = (zc * la + zd * lc) * skeleton_scale_y;
            bone.d = (zc * lb + zd * ld) * skeleton_scale_y;
        }
    }
}
