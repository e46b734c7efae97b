//! Image-based lighting precomputation.
//!
//! Each distinct environment image is convolved once per renderer: a small diffuse irradiance map
//! rendered into a framebuffer, and a specular pyramid whose levels are rendered at increasing
//! roughness, read back and packed into one mipmapped texture. Entries live until the renderer is
//! destroyed.

use crate::backend::{Backend, ClearOps, DrawCall, DrawGeometry, ImageLevel, RasterState, TargetId};
use crate::config::{DIFFUSE_WIDTH, SPECULAR_SIZE};
use crate::error::Result;
use crate::id::{FramebufferId, ImageId, TextureId};
use crate::image::Image;
use crate::shader::uniforms::filter_uniforms;
use crate::shader::{sources, ProgramCache, Shader, UniformSet};
use crate::state::BlendMode;
use ahash::{HashMap, HashMapExt};
use tracing::debug;

/// Texture name the convolution programs sample the environment from.
const ENVIRONMENT_MAP: &str = "environment_map";

/// Size of the diffuse map for a `width` x `height` source.
pub fn diffuse_size(width: u32, height: u32) -> (u32, u32) {
    let aspect = height as f32 / width.max(1) as f32;
    (DIFFUSE_WIDTH, ((DIFFUSE_WIDTH as f32 * aspect).floor() as u32).max(1))
}

/// `(size, roughness)` of every specular level, largest first.
pub fn specular_levels() -> Vec<(u32, f32)> {
    let max_level = SPECULAR_SIZE.ilog2() as f32;
    (0..=SPECULAR_SIZE.ilog2())
        .map(|level| {
            let size = SPECULAR_SIZE >> level;
            (size, 1.0 - (size as f32).log2() / max_level)
        })
        .collect()
}

/// The program convolving an equirectangular environment into diffuse irradiance.
pub fn diffuse_program() -> Shader {
    Shader::fullscreen(
        "ibl_diffuse",
        &[sources::EQUIRECT, sources::IBL_DIFFUSE_FS],
        filter_uniforms(),
        &[ENVIRONMENT_MAP],
    )
}

/// The program prefiltering one specular level; reads a `roughness` uniform.
pub fn specular_program() -> Shader {
    Shader::fullscreen(
        "ibl_specular",
        &[sources::EQUIRECT, sources::IBL_SPECULAR_FS],
        filter_uniforms(),
        &[ENVIRONMENT_MAP],
    )
}

fn convolution_raster() -> RasterState {
    RasterState {
        blend: BlendMode::Replace,
        depth_test: false,
        depth_write: false,
        ..Default::default()
    }
}

#[derive(Debug, Default)]
pub struct ImageLightCache {
    diffuse: HashMap<ImageId, FramebufferId>,
    specular: HashMap<ImageId, TextureId>,
    diffuse_shader: Option<Shader>,
    specular_shader: Option<Shader>,
}

impl ImageLightCache {
    pub fn new() -> Self {
        Self {
            diffuse: HashMap::new(),
            specular: HashMap::new(),
            diffuse_shader: None,
            specular_shader: None,
        }
    }

    /// The diffuse irradiance framebuffer of `image`, rendering it on first request.
    ///
    /// `source` is the uploaded texture of `image`.
    pub fn diffuse<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        programs: &mut ProgramCache,
        image: &Image,
        source: TextureId,
    ) -> Result<FramebufferId> {
        if let Some(framebuffer) = self.diffuse.get(&image.id()) {
            return Ok(*framebuffer);
        }
        let shader = self
            .diffuse_shader
            .get_or_insert_with(diffuse_program)
            .clone();
        let program = programs.program(backend, &shader)?;

        let (width, height) = diffuse_size(image.width(), image.height());
        let framebuffer = backend.create_framebuffer(width, height, 1.0);
        let target = TargetId::Framebuffer(framebuffer);
        backend.clear(target, &ClearOps::all([0.0; 4]));

        let mut uniforms = UniformSet::new();
        uniforms.set(ENVIRONMENT_MAP, source);
        uniforms.set("canvas_size", [width as f32, height as f32]);
        backend.draw(&DrawCall {
            target,
            program,
            uniforms: &uniforms,
            geometry: DrawGeometry::Fullscreen,
            raster: convolution_raster(),
        });
        debug!(image = image.id().0, width, height, "Diffuse image light rendered");
        self.diffuse.insert(image.id(), framebuffer);
        Ok(framebuffer)
    }

    /// The specular pyramid of `image`, rendering it on first request.
    pub fn specular<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        programs: &mut ProgramCache,
        image: &Image,
        source: TextureId,
    ) -> Result<TextureId> {
        if let Some(texture) = self.specular.get(&image.id()) {
            return Ok(*texture);
        }
        let shader = self
            .specular_shader
            .get_or_insert_with(specular_program)
            .clone();
        let program = programs.program(backend, &shader)?;

        let framebuffer = backend.create_framebuffer(SPECULAR_SIZE, SPECULAR_SIZE, 1.0);
        let target = TargetId::Framebuffer(framebuffer);
        let mut levels = Vec::new();
        for (size, roughness) in specular_levels() {
            backend.resize_framebuffer(framebuffer, size, size, 1.0);
            backend.clear(target, &ClearOps::all([0.0; 4]));
            let mut uniforms = UniformSet::new();
            uniforms.set(ENVIRONMENT_MAP, source);
            uniforms.set("canvas_size", [size as f32, size as f32]);
            uniforms.set("roughness", roughness);
            backend.draw(&DrawCall {
                target,
                program,
                uniforms: &uniforms,
                geometry: DrawGeometry::Fullscreen,
                raster: convolution_raster(),
            });
            levels.push(ImageLevel {
                width: size,
                height: size,
                pixels: backend.read_pixels(target),
            });
        }
        let texture = backend.create_mipmapped_texture(&levels);
        backend.release_framebuffer(framebuffer);
        debug!(image = image.id().0, levels = levels.len(), "Specular image light rendered");
        self.specular.insert(image.id(), texture);
        Ok(texture)
    }

    pub fn len(&self) -> usize {
        self.diffuse.len() + self.specular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffuse.is_empty() && self.specular.is_empty()
    }

    /// Releases every cached framebuffer and texture.
    pub fn clear<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for (_, framebuffer) in self.diffuse.drain() {
            backend.release_framebuffer(framebuffer);
        }
        for (_, texture) in self.specular.drain() {
            backend.release_texture(texture);
        }
    }
}
