//! Font loading for the controls hint and status text.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::debug;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// Characters rasterized into every atlas (printable ASCII).
const ATLAS_CHARS: std::ops::RangeInclusive<u8> = 32..=126;
const PADDING: u32 = 1;
const MIN_ATLAS_SIZE: u32 = 512;

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

/// Glyph metrics for laying out text.
///
/// [`Canvas::text`](crate::Canvas::text) only needs metrics and atlas UVs, so
/// anything that can answer these two questions can be drawn with.
pub trait GlyphSource {
    fn glyph(&self, c: char) -> Option<&GlyphInfo>;

    /// Pixel size the glyph metrics were produced at.
    fn size(&self) -> f32;

    /// Width of `text` at [`size`](GlyphSource::size).
    fn measure(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|c| self.glyph(c))
            .map(|g| g.advance)
            .sum()
    }
}

/// A font atlas containing pre-rasterized glyphs.
pub struct FontAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl FontAtlas {
    /// Load a TTF/OTF file and rasterize it at `size` pixels.
    pub fn from_file(gpu: &GpuContext, path: &Path, size: f32) -> Result<Self, AssetError> {
        let data = std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let atlas = Self::from_bytes(gpu, &data, size)?;
        debug!(path = %path.display(), size, glyphs = atlas.glyphs.len(), "font loaded");
        Ok(atlas)
    }

    /// Create a new font atlas from TTF/OTF data.
    pub fn from_bytes(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self, AssetError> {
        let font = Font::from_bytes(font_data, FontSettings::default()).map_err(AssetError::Font)?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = ATLAS_CHARS
            .map(char::from)
            .map(|c| {
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let layout = pack_rows(&sizes);
        let (atlas_width, atlas_height) = layout.size;

        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::with_capacity(rasterized.len());

        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&layout.origins) {
            let glyph_w = metrics.width as u32;
            let glyph_h = metrics.height as u32;

            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * atlas_width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / atlas_width as f32,
                        y as f32 / atlas_height as f32,
                        glyph_w as f32 / atlas_width as f32,
                        glyph_h as f32 / atlas_height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let extent = wgpu::Extent3d {
            width: atlas_width,
            height: atlas_height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width),
                rows_per_image: Some(atlas_height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_height = font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2);

        Ok(Self {
            texture,
            view,
            sampler,
            glyphs,
            size,
            line_height,
        })
    }

    /// Get glyph info for a character.
    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Get the font size this atlas was created with.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Measure the width of a string.
    pub fn measure(&self, text: &str) -> f32 {
        GlyphSource::measure(self, text)
    }
}

impl GlyphSource for FontAtlas {
    fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    fn size(&self) -> f32 {
        self.size
    }
}

/// Monospace stand-in for a rasterized font: every visible character is a
/// solid block, spaces only advance.
#[cfg(test)]
pub(crate) struct BlockFont {
    size: f32,
    block: GlyphInfo,
    space: GlyphInfo,
}

#[cfg(test)]
impl BlockFont {
    pub(crate) fn new(size: f32) -> Self {
        let block = GlyphInfo {
            uv: [0.0, 0.0, 1.0, 1.0],
            width: size as u32,
            height: size as u32,
            offset_x: 0.0,
            offset_y: 0.0,
            advance: size * 0.6,
        };
        Self {
            size,
            block,
            space: GlyphInfo {
                width: 0,
                height: 0,
                ..block
            },
        }
    }
}

#[cfg(test)]
impl GlyphSource for BlockFont {
    fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        match c {
            ' ' => Some(&self.space),
            c if c.is_ascii_graphic() => Some(&self.block),
            _ => None,
        }
    }

    fn size(&self) -> f32 {
        self.size
    }
}

/// Where each glyph goes in the atlas.
#[derive(Debug, PartialEq)]
struct AtlasLayout {
    size: (u32, u32),
    origins: Vec<(u32, u32)>,
}

/// Row-pack `sizes` left to right, growing the smaller atlas side until
/// everything fits.
fn pack_rows(sizes: &[(u32, u32)]) -> AtlasLayout {
    let (mut width, mut height) = (MIN_ATLAS_SIZE, MIN_ATLAS_SIZE);
    loop {
        if let Some(origins) = try_pack(sizes, width, height) {
            return AtlasLayout {
                size: (width, height),
                origins,
            };
        }
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }
}

fn try_pack(sizes: &[(u32, u32)], width: u32, height: u32) -> Option<Vec<(u32, u32)>> {
    let mut origins = Vec::with_capacity(sizes.len());
    let (mut x, mut y) = (PADDING, PADDING);
    let mut row_height = 0;

    for &(w, h) in sizes {
        if x + w + PADDING > width {
            x = PADDING;
            y += row_height + PADDING;
            row_height = 0;
        }
        if x + w + PADDING > width || y + h + PADDING > height {
            return None;
        }
        origins.push((x, y));
        x += w + PADDING;
        row_height = row_height.max(h);
    }
    Some(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_glyphs_fit_default_atlas() {
        let layout = pack_rows(&[(10, 12), (8, 12), (0, 0), (11, 9)]);
        assert_eq!(layout.size, (512, 512));
        assert_eq!(layout.origins, vec![(1, 1), (12, 1), (21, 1), (22, 1)]);
    }

    #[test]
    fn wraps_to_next_row() {
        let layout = pack_rows(&[(300, 20), (300, 10)]);
        assert_eq!(layout.origins, vec![(1, 1), (1, 22)]);
    }

    #[test]
    fn grows_until_everything_fits() {
        let sizes = vec![(200, 200); 12];
        let layout = pack_rows(&sizes);
        assert_eq!(layout.size, (1024, 1024));
        for (&(x, y), &(w, h)) in layout.origins.iter().zip(&sizes) {
            assert!(x + w < layout.size.0 && y + h < layout.size.1);
        }
    }
}
