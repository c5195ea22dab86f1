use crate::doll::ensure_animations;
use crate::{Doll, DollConfig, DollError, PointerState, PoseRenderer};
use doll2d::{
    Atlas, AtlasPage, DrawList, MixDurationTable, RenderOptions, SkeletonData, TextureLoader,
    append_draw_list,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Frame context of the desktop overlay: the loaded definition shared by every doll, the dolls
/// themselves and the scratch draw list reused between frames.
#[derive(Debug)]
pub struct Overlay {
    config: DollConfig,
    atlas: Atlas,
    data: Arc<SkeletonData>,
    mixes: MixDurationTable,
    dolls: Vec<Doll>,
    draw_list: DrawList,
}

impl Overlay {
    /// Reads the atlas and skeleton named by `config` from disk.
    pub fn load(config: DollConfig) -> Result<Self, DollError> {
        let atlas_text = read_to_string(&config.atlas_path)?;
        let bytes = std::fs::read(&config.skeleton_path).map_err(|source| DollError::Io {
            path: config.skeleton_path.clone(),
            source,
        })?;
        let (atlas, data) = doll2d::load_skeleton(&atlas_text, &bytes, config.scale)?;
        log::debug!(
            "loaded doll {} ({} atlas pages, {}x{})",
            config.skeleton_path.display(),
            atlas.pages.len(),
            data.width,
            data.height
        );
        Self::new(config, atlas, data)
    }

    /// Builds the mix table from `config` and checks that the idle and pick animations exist.
    pub fn new(
        config: DollConfig,
        atlas: Atlas,
        data: Arc<SkeletonData>,
    ) -> Result<Self, DollError> {
        ensure_animations(&data, &config)?;

        let mut mixes = MixDurationTable::new(data.clone());
        mixes.set_default_mix(config.default_mix)?;
        for mix in &config.mixes {
            mixes.set_mix(&mix.from, &mix.to, mix.duration)?;
        }

        Ok(Self {
            config,
            atlas,
            data,
            mixes,
            dolls: Vec::new(),
            draw_list: DrawList::default(),
        })
    }

    pub fn config(&self) -> &DollConfig {
        &self.config
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn skeleton_data(&self) -> &Arc<SkeletonData> {
        &self.data
    }

    pub fn dolls(&self) -> &[Doll] {
        &self.dolls
    }

    pub fn doll(&self, index: usize) -> Option<&Doll> {
        self.dolls.get(index)
    }

    pub fn doll_mut(&mut self, index: usize) -> Option<&mut Doll> {
        self.dolls.get_mut(index)
    }

    /// Spawns a doll at the configured spawn position.
    pub fn spawn(&mut self) -> Result<usize, DollError> {
        let [x, y] = self.config.spawn;
        self.spawn_at(x, y)
    }

    /// Spawns a doll anchored at `(x, y)` and returns its index. Later dolls draw on top.
    pub fn spawn_at(&mut self, x: f32, y: f32) -> Result<usize, DollError> {
        let doll = Doll::new(self.data.clone(), self.mixes.clone(), &self.config, x, y)?;
        self.dolls.push(doll);
        Ok(self.dolls.len() - 1)
    }

    pub fn despawn(&mut self, index: usize) -> Option<Doll> {
        (index < self.dolls.len()).then(|| self.dolls.remove(index))
    }

    /// Topmost doll under the pointer.
    pub fn doll_at(&self, px: f32, py: f32) -> Option<usize> {
        self.dolls.iter().rposition(|doll| doll.hit_test(px, py))
    }

    /// One frame: route the pointer, advance every doll by `delta` seconds and recompute poses.
    ///
    /// Only one doll is held at a time; a press grabs the topmost doll under the pointer.
    pub fn tick(&mut self, pointer: PointerState, delta: f32) {
        if pointer.pressed && !self.dolls.iter().any(Doll::is_held) {
            if let Some(index) = self.doll_at(pointer.x, pointer.y) {
                log::debug!("grabbed doll {index} at ({}, {})", pointer.x, pointer.y);
                self.dolls[index].grab();
            }
        }
        for doll in &mut self.dolls {
            doll.track_pointer(pointer);
            doll.advance(delta);
        }
    }

    /// Hands every doll's pose and draw list to `renderer`, in spawn order.
    pub fn render<R: PoseRenderer + ?Sized>(&mut self, renderer: &mut R) {
        let options = RenderOptions {
            premultiplied_alpha: self.config.premultiplied_alpha,
        };
        renderer.begin_frame();
        for (index, doll) in self.dolls.iter().enumerate() {
            self.draw_list.clear();
            append_draw_list(&mut self.draw_list, doll.skeleton(), options);
            renderer.draw_doll(index, doll.skeleton(), &self.draw_list);
        }
        renderer.end_frame();
    }

    /// Image file of an atlas page, next to the atlas file.
    pub fn page_path(&self, page: &AtlasPage) -> PathBuf {
        self.config
            .atlas_path
            .parent()
            .unwrap_or(Path::new(""))
            .join(&page.name)
    }

    /// Loads every atlas page through `loader`, indexed like the draw list's `page` field.
    pub fn load_textures<L>(&self, loader: &mut L) -> Result<Vec<L::Texture>, DollError>
    where
        L: TextureLoader,
        L::Error: Display,
    {
        self.atlas
            .load_textures(loader)
            .map_err(|err| DollError::TextureLoad {
                message: err.to_string(),
            })
    }
}

fn read_to_string(path: &Path) -> Result<String, DollError> {
    std::fs::read_to_string(path).map_err(|source| DollError::Io {
        path: path.to_path_buf(),
        source,
    })
}
