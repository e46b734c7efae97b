use super::*;

impl<B: Backend> Renderer<B> {
    /// Starts a frame on the main surface: state is reset to its frame defaults, depth and
    /// stencil are cleared and any clip is dropped. Color is kept.
    pub fn begin_frame(&mut self) {
        if self.states.depth() > 0 {
            warn!(
                depth = self.states.depth(),
                "frame started with unbalanced push(); discarding saved states"
            );
            self.states.reset_depth();
        }
        if self.immediate.is_active() {
            warn!("frame started inside begin_shape(); discarding the shape");
            self.immediate.finish(EndShape::Open);
        }
        self.target = TargetId::Main;
        self.clip.reset();
        self.states.current_mut().reset_for_frame();
        self.backend.clear(
            TargetId::Main,
            &ClearOps {
                color: None,
                depth: Some(1.0),
                stencil: Some(0),
            },
        );
    }

    /// Fills the current target with `color`.
    pub fn background(&mut self, color: impl Into<Color>) {
        let [r, g, b, a] = color.into().0;
        self.backend.clear(
            self.target,
            &ClearOps {
                color: Some([r * a, g * a, b * a, a]),
                depth: Some(1.0),
                stencil: None,
            },
        );
    }

    /// Clears the current target to transparent.
    pub fn clear(&mut self) {
        self.backend
            .clear(self.target, &ClearOps::all(Color::TRANSPARENT.0));
    }

    pub fn clear_depth(&mut self) {
        self.backend.clear(self.target, &ClearOps::depth());
    }

    /// The backend texture of `image`, uploaded on first use. Images larger than the backend
    /// allows are scaled down.
    pub fn texture_for(&mut self, image: &Image) -> TextureId {
        if let Some(texture) = self.textures.get(&image.id()) {
            return *texture;
        }
        let max = self.backend.max_texture_size();
        let (width, height, pixels) = image.fit_within(max);
        if (width, height) != (image.width(), image.height()) {
            warn!(
                image = image.id().0,
                width = image.width(),
                height = image.height(),
                max,
                "image exceeds the maximum texture size; scaling down"
            );
        }
        let texture = self.backend.create_texture(width, height, &pixels);
        debug!(image = image.id().0, %texture, "Uploaded image");
        self.textures.insert(image.id(), texture);
        texture
    }

    /// Resizes the main surface, in logical units. Sizes beyond the backend limit are clamped.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = self.clamp_surface(width, height, self.main.density);
        self.main.width = width;
        self.main.height = height;
        let (physical_width, physical_height) = self.main.physical();
        self.backend.resize_main(physical_width, physical_height);
        if self.target == TargetId::Main {
            self.reset_camera();
        }
    }

    /// Reads back the current target as an RGBA8 image of its physical size.
    pub fn load_pixels(&mut self) -> Image {
        let (width, height) = self.target_surface().physical();
        let pixels = self.backend.read_pixels(self.target);
        Image::from_rgba8(width, height, pixels)
    }

    /// Releases every GPU resource the renderer created. The renderer stays usable; caches
    /// are rebuilt on demand.
    pub fn destroy(&mut self) {
        self.geometry.clear(&mut self.backend);
        for (framebuffer, _) in self.framebuffers.drain() {
            self.backend.release_framebuffer(framebuffer);
        }
        self.filters.release(&mut self.backend);
        self.image_lights.clear(&mut self.backend);
        for (_, texture) in self.textures.drain() {
            self.backend.release_texture(texture);
        }
        self.programs.clear();
        self.tessellator.clear_cache();
        self.target = TargetId::Main;
        self.clip.reset();
        debug!("Renderer resources released");
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{Command, RecordingBackend, TargetId};
    use crate::config::RendererConfig;
    use crate::image::Image;
    use crate::renderer::Renderer;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 100).with_max_texture_size(256),
            100,
            100,
            RendererConfig::default(),
        )
    }

    #[test]
    fn frame_start_balances_the_stack() {
        let mut renderer = renderer();
        renderer.push();
        renderer.translate(1.0, 2.0, 3.0);
        renderer.lights();
        renderer.begin_frame();
        assert_eq!(renderer.stack_depth(), 0);
        assert!(renderer.state().lights.is_empty());
        assert!(renderer.pop().is_err());
    }

    #[test]
    fn background_is_premultiplied() {
        let mut renderer = renderer();
        renderer.background([1.0, 0.5, 0.0, 0.5]);
        let cleared = renderer.backend().commands().iter().find_map(|command| match command {
            Command::Clear { ops, .. } => ops.color,
            _ => None,
        });
        assert_eq!(cleared, Some([0.5, 0.25, 0.0, 0.5]));
    }

    #[test]
    fn large_images_are_scaled_to_fit() {
        let mut renderer = renderer();
        let image = Image::solid(1024, 512, [0, 0, 0, 255]);
        renderer.texture_for(&image);
        assert!(renderer.backend().commands().iter().any(|command| matches!(
            command,
            Command::CreateTexture {
                width: 256,
                height: 128,
                ..
            }
        )));
    }

    #[test]
    fn resize_clamps_and_reaches_the_backend() {
        let mut renderer = renderer();
        renderer.resize(1000, 50);
        assert_eq!(renderer.size(), (256, 50));
        assert_eq!(renderer.backend().target_size(TargetId::Main), Some((256, 50)));
    }

    #[test]
    fn destroy_releases_everything() {
        let mut renderer = renderer();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();
        renderer.create_framebuffer(10, 10);
        renderer.texture_for(&Image::solid(2, 2, [255; 4]));
        renderer.destroy();
        assert_eq!(renderer.backend().live_meshes(), 0);
        assert_eq!(renderer.backend().live_framebuffers(), 0);
        assert_eq!(renderer.compiled_programs(), 0);
    }
}
