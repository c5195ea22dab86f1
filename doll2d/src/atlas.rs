use crate::Error;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Atlas {
    pub pages: Vec<AtlasPage>,
    pub regions: HashMap<String, AtlasRegion>,
}

impl Atlas {
    pub fn parse(input: &str) -> Result<Self, Error> {
        parse_atlas(input)
    }

    pub fn region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.get(name)
    }

    pub fn page(&self, index: usize) -> Option<&AtlasPage> {
        self.pages.get(index)
    }

    /// Hands every page to `loader` in page order. The returned textures are indexed like
    /// [`Atlas::pages`], which is also what [`crate::TextureRegion::page`] refers to.
    pub fn load_textures<L: TextureLoader>(
        &self,
        loader: &mut L,
    ) -> Result<Vec<L::Texture>, L::Error> {
        let mut textures = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            textures.push(loader.load(page)?);
        }
        Ok(textures)
    }
}

/// Renderer-side capability used to upload atlas page images.
pub trait TextureLoader {
    type Texture;
    type Error;

    fn load(&mut self, page: &AtlasPage) -> Result<Self::Texture, Self::Error>;
}

#[derive(Clone, Debug)]
pub struct AtlasPage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub min_filter: AtlasFilter,
    pub mag_filter: AtlasFilter,
    pub wrap_u: AtlasWrap,
    pub wrap_v: AtlasWrap,
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasFilter {
    Nearest,
    #[default]
    Linear,
    MipMap,
    MipMapNearestNearest,
    MipMapNearestLinear,
    MipMapLinearNearest,
    MipMapLinearLinear,
    Other(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AtlasWrap {
    #[default]
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Debug)]
pub struct AtlasRegion {
    pub name: String,
    pub page: usize,
    pub rotate: bool,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub original_width: u32,
    pub original_height: u32,
    pub index: i32,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

impl FromStr for Atlas {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_atlas(s)
    }
}

fn parse_atlas(input: &str) -> Result<Atlas, Error> {
    let mut pages: Vec<AtlasPage> = Vec::new();
    let mut regions = HashMap::new();

    let mut current_page: Option<usize> = None;
    let mut current_region: Option<AtlasRegion> = None;
    let mut expect_new_page = true;
    let mut page_has_regions = false;

    fn finalize_region(mut region: AtlasRegion, page: Option<&AtlasPage>) -> AtlasRegion {
        if region.original_width == 0 {
            region.original_width = region.width;
        }
        if region.original_height == 0 {
            region.original_height = region.height;
        }
        if let Some(page) = page.filter(|p| p.width > 0 && p.height > 0) {
            let pw = page.width as f32;
            let ph = page.height as f32;
            // Rotated regions are packed 90 degrees clockwise, so they span height x width.
            let (packed_w, packed_h) = if region.rotate {
                (region.height, region.width)
            } else {
                (region.width, region.height)
            };
            region.u = region.x as f32 / pw;
            region.v = region.y as f32 / ph;
            region.u2 = (region.x + packed_w) as f32 / pw;
            region.v2 = (region.y + packed_h) as f32 / ph;
        } else {
            region.u = 0.0;
            region.v = 0.0;
            region.u2 = 1.0;
            region.v2 = 1.0;
        }
        region
    }

    fn insert_region(
        regions: &mut HashMap<String, AtlasRegion>,
        region: AtlasRegion,
        pages: &[AtlasPage],
    ) {
        let page = region.page;
        let region = finalize_region(region, pages.get(page));
        // Indexed sequences share a name; lookups resolve to the first one listed.
        regions.entry(region.name.clone()).or_insert(region);
    }

    for raw_line in input.lines() {
        let raw_line = raw_line.trim_end_matches(['\r', '\n']);
        if raw_line.trim().is_empty() {
            if let Some(region) = current_region.take() {
                insert_region(&mut regions, region, &pages);
                page_has_regions = true;
            }
            if current_page.is_some() && page_has_regions {
                expect_new_page = true;
            }
            continue;
        }

        let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
        let line = raw_line.trim();

        if current_page.is_none() || expect_new_page {
            pages.push(AtlasPage {
                name: line.to_string(),
                width: 0,
                height: 0,
                format: String::new(),
                min_filter: AtlasFilter::default(),
                mag_filter: AtlasFilter::default(),
                wrap_u: AtlasWrap::default(),
                wrap_v: AtlasWrap::default(),
            });
            current_page = Some(pages.len() - 1);
            current_region = None;
            expect_new_page = false;
            page_has_regions = false;
            continue;
        }

        let Some(page_index) = current_page else {
            continue;
        };

        if !indented && !line.contains(':') {
            if let Some(region) = current_region.take() {
                insert_region(&mut regions, region, &pages);
                page_has_regions = true;
            }
            current_region = Some(AtlasRegion {
                name: line.to_string(),
                page: page_index,
                rotate: false,
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                offset_x: 0,
                offset_y: 0,
                original_width: 0,
                original_height: 0,
                index: -1,
                u: 0.0,
                v: 0.0,
                u2: 0.0,
                v2: 0.0,
            });
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if let Some(region) = current_region.as_mut() {
            match key {
                "rotate" => {
                    region.rotate = parse_rotate(value);
                }
                "xy" => {
                    let (x, y) = parse_pair::<u32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid region xy: {value}"),
                    })?;
                    region.x = x;
                    region.y = y;
                }
                "size" => {
                    let (w, h) = parse_pair::<u32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid region size: {value}"),
                    })?;
                    region.width = w;
                    region.height = h;
                }
                "bounds" => {
                    let [x, y, w, h] = parse_quad::<u32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid region bounds: {value}"),
                    })?;
                    region.x = x;
                    region.y = y;
                    region.width = w;
                    region.height = h;
                }
                "orig" => {
                    let (w, h) = parse_pair::<u32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid region orig: {value}"),
                    })?;
                    region.original_width = w;
                    region.original_height = h;
                }
                "offset" => {
                    let (x, y) = parse_pair::<i32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid region offset: {value}"),
                    })?;
                    region.offset_x = x;
                    region.offset_y = y;
                }
                "offsets" => {
                    let invalid = || Error::AtlasParse {
                        message: format!("invalid region offsets: {value}"),
                    };
                    let [x, y, w, h] = parse_quad::<i32>(value).ok_or_else(invalid)?;
                    region.offset_x = x;
                    region.offset_y = y;
                    region.original_width = u32::try_from(w).map_err(|_| invalid())?;
                    region.original_height = u32::try_from(h).map_err(|_| invalid())?;
                }
                "index" => {
                    region.index = value.parse().map_err(|_| Error::AtlasParse {
                        message: format!("invalid region index: {value}"),
                    })?;
                }
                // Nine-patch data is irrelevant for skeletal attachments.
                "split" | "pad" => {}
                _ => {}
            }
        } else {
            let Some(page) = pages.get_mut(page_index) else {
                continue;
            };
            match key {
                "size" => {
                    let (w, h) = parse_pair::<u32>(value).ok_or_else(|| Error::AtlasParse {
                        message: format!("invalid page size: {value}"),
                    })?;
                    page.width = w;
                    page.height = h;
                }
                "format" => {
                    page.format = value.to_string();
                }
                "filter" => {
                    let (min, mag) = parse_pair_str(value)
                        .map(|(a, b)| (parse_filter(a), parse_filter(b)))
                        .unwrap_or_else(|| {
                            let f = parse_filter(value);
                            (f.clone(), f)
                        });
                    page.min_filter = min;
                    page.mag_filter = mag;
                }
                "repeat" => {
                    let (wrap_u, wrap_v) = parse_repeat(value);
                    page.wrap_u = wrap_u;
                    page.wrap_v = wrap_v;
                }
                _ => {}
            }
        }
    }

    if let Some(region) = current_region.take() {
        insert_region(&mut regions, region, &pages);
    }

    if pages.is_empty() {
        return Err(Error::AtlasParse {
            message: "empty atlas".to_string(),
        });
    }

    Ok(Atlas { pages, regions })
}

fn parse_pair<T: FromStr>(value: &str) -> Option<(T, T)> {
    let (a, b) = parse_pair_str(value)?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

/// Four comma-separated values, as in `bounds` and `offsets`.
fn parse_quad<T: FromStr>(value: &str) -> Option<[T; 4]> {
    let mut it = value.split(',').map(|s| s.trim().parse::<T>().ok());
    let quad = [it.next()??, it.next()??, it.next()??, it.next()??];
    it.next().is_none().then_some(quad)
}

fn parse_pair_str(value: &str) -> Option<(&str, &str)> {
    let (a, b) = value.split_once(',')?;
    Some((a.trim(), b.trim()))
}

fn parse_rotate(value: &str) -> bool {
    match value {
        "true" => true,
        "false" => false,
        other => other.parse::<i32>().is_ok_and(|deg| deg.rem_euclid(360) == 90),
    }
}

fn parse_filter(value: &str) -> AtlasFilter {
    match value {
        "Nearest" => AtlasFilter::Nearest,
        "Linear" => AtlasFilter::Linear,
        "MipMap" => AtlasFilter::MipMap,
        "MipMapNearestNearest" => AtlasFilter::MipMapNearestNearest,
        "MipMapNearestLinear" => AtlasFilter::MipMapNearestLinear,
        "MipMapLinearNearest" => AtlasFilter::MipMapLinearNearest,
        "MipMapLinearLinear" => AtlasFilter::MipMapLinearLinear,
        other => AtlasFilter::Other(other.to_string()),
    }
}

fn parse_repeat(value: &str) -> (AtlasWrap, AtlasWrap) {
    match value {
        "x" => (AtlasWrap::Repeat, AtlasWrap::ClampToEdge),
        "y" => (AtlasWrap::ClampToEdge, AtlasWrap::Repeat),
        "xy" => (AtlasWrap::Repeat, AtlasWrap::Repeat),
        _ => (AtlasWrap::ClampToEdge, AtlasWrap::ClampToEdge),
    }
}
