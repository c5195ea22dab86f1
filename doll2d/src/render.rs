use crate::{AttachmentData, BlendMode, Skeleton};

const QUAD_TRIANGLES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// A run of indices sharing one atlas page and blend mode.
#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub page: usize,
    pub blend: BlendMode,
    pub first_index: usize,
    pub index_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub draws: Vec<Draw>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draws.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Multiply vertex rgb by alpha for premultiplied-alpha textures.
    pub premultiplied_alpha: bool,
}

pub fn build_draw_list(skeleton: &Skeleton) -> DrawList {
    build_draw_list_with_options(skeleton, RenderOptions::default())
}

pub fn build_draw_list_with_options(skeleton: &Skeleton, options: RenderOptions) -> DrawList {
    let mut out = DrawList::default();
    append_draw_list(&mut out, skeleton, options);
    out
}

/// Appends the skeleton's textured attachments in draw order, using current world transforms.
pub fn append_draw_list(out: &mut DrawList, skeleton: &Skeleton, options: RenderOptions) {
    for &slot_index in &skeleton.draw_order {
        let Some(slot) = skeleton.slots.get(slot_index) else {
            continue;
        };
        if slot.color[3] <= 0.0 {
            continue;
        }
        let Some(attachment) = skeleton.slot_attachment(slot_index) else {
            continue;
        };
        let (page, attachment_color, uvs, triangles): (usize, [f32; 4], Vec<[f32; 2]>, &[u32]) =
            match attachment {
                AttachmentData::Region(region) => (
                    region.region.page,
                    region.color,
                    region.uvs.chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
                    &QUAD_TRIANGLES,
                ),
                AttachmentData::Mesh(mesh) => (
                    mesh.region.page,
                    mesh.color,
                    mesh.uvs.clone(),
                    mesh.triangles.as_slice(),
                ),
                AttachmentData::BoundingBox(_) => continue,
            };
        if attachment_color[3] <= 0.0 || triangles.is_empty() {
            continue;
        }
        let Some(positions) = skeleton.slot_world_vertices(slot_index) else {
            continue;
        };

        let color = apply_pma(
            multiply_rgba(multiply_rgba(skeleton.color, slot.color), attachment_color),
            options.premultiplied_alpha,
        );
        let vertices = positions
            .chunks_exact(2)
            .zip(uvs)
            .map(|(p, uv)| Vertex {
                position: [p[0], p[1]],
                uv,
                color,
            })
            .collect::<Vec<_>>();
        append_indexed(out, page, slot.blend, vertices, triangles);
    }
}

fn append_indexed(
    out: &mut DrawList,
    page: usize,
    blend: BlendMode,
    vertices: Vec<Vertex>,
    indices: &[u32],
) {
    if vertices.is_empty() || indices.is_empty() {
        return;
    }
    let vertex_count = vertices.len() as u32;
    if indices.iter().any(|&i| i >= vertex_count) {
        log::debug!("skipping attachment with out-of-range triangle indices");
        return;
    }

    let base = out.vertices.len() as u32;
    out.vertices.extend(vertices);

    let first_index = out.indices.len();
    out.indices.extend(indices.iter().map(|&idx| base + idx));

    if let Some(last) = out.draws.last_mut() {
        let expected = last.first_index + last.index_count;
        if last.page == page && last.blend == blend && expected == first_index {
            last.index_count += indices.len();
            return;
        }
    }

    out.draws.push(Draw {
        page,
        blend,
        first_index,
        index_count: indices.len(),
    });
}

fn apply_pma(mut color: [f32; 4], premultiplied_alpha: bool) -> [f32; 4] {
    if premultiplied_alpha {
        let a = color[3];
        color[0] *= a;
        color[1] *= a;
        color[2] *= a;
    }
    color
}

fn multiply_rgba(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}
