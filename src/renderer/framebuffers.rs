use super::*;

impl<B: Backend> Renderer<B> {
    /// An offscreen target at the main surface's pixel density.
    pub fn create_framebuffer(&mut self, width: u32, height: u32) -> FramebufferId {
        self.create_framebuffer_with_density(width, height, self.main.density)
    }

    pub fn create_framebuffer_with_density(
        &mut self,
        width: u32,
        height: u32,
        density: f32,
    ) -> FramebufferId {
        let (width, height) = self.clamp_surface(width, height, density);
        let framebuffer = self.backend.create_framebuffer(width, height, density);
        self.framebuffers.insert(
            framebuffer,
            Surface {
                width,
                height,
                density,
            },
        );
        debug!(%framebuffer, width, height, density, "Created framebuffer");
        framebuffer
    }

    pub fn resize_framebuffer(
        &mut self,
        framebuffer: FramebufferId,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let density = self
            .framebuffers
            .get(&framebuffer)
            .ok_or(RenderError::UnknownFramebuffer(framebuffer))?
            .density;
        let (width, height) = self.clamp_surface(width, height, density);
        self.backend
            .resize_framebuffer(framebuffer, width, height, density);
        self.framebuffers.insert(
            framebuffer,
            Surface {
                width,
                height,
                density,
            },
        );
        Ok(())
    }

    pub fn remove_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<()> {
        if self.target == TargetId::Framebuffer(framebuffer) {
            return Err(RenderError::Backend(format!(
                "framebuffer {framebuffer} is being drawn into"
            )));
        }
        self.framebuffers
            .remove(&framebuffer)
            .ok_or(RenderError::UnknownFramebuffer(framebuffer))?;
        self.backend.release_framebuffer(framebuffer);
        Ok(())
    }

    /// The color texture of `framebuffer`, for `texture_from` or `image_texture`.
    pub fn framebuffer_texture(&self, framebuffer: FramebufferId) -> Result<TextureId> {
        if !self.framebuffers.contains_key(&framebuffer) {
            return Err(RenderError::UnknownFramebuffer(framebuffer));
        }
        self.backend
            .target_texture(TargetId::Framebuffer(framebuffer))
            .ok_or(RenderError::UnknownFramebuffer(framebuffer))
    }

    /// Logical size of `framebuffer`.
    pub fn framebuffer_size(&self, framebuffer: FramebufferId) -> Option<(u32, u32)> {
        self.framebuffers
            .get(&framebuffer)
            .map(|surface| (surface.width, surface.height))
    }

    /// Runs `draw` with `framebuffer` as the target, under a default camera sized to it.
    /// State changes made inside do not leak out.
    pub fn draw_into<T>(
        &mut self,
        framebuffer: FramebufferId,
        draw: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let surface = *self
            .framebuffers
            .get(&framebuffer)
            .ok_or(RenderError::UnknownFramebuffer(framebuffer))?;
        let previous = self.target;
        self.push();
        self.target = TargetId::Framebuffer(framebuffer);
        {
            let state = self.states.current_mut();
            state.camera = Camera::default_for(surface.width as f32, surface.height as f32);
            state.model = Mat4::identity();
        }
        let result = draw(self);
        let popped = self.pop();
        self.target = previous;
        popped?;
        result
    }

    /// Clamps a requested logical size so its physical size fits the backend.
    pub(super) fn clamp_surface(&self, width: u32, height: u32, density: f32) -> (u32, u32) {
        let max = (self.backend.max_texture_size() as f32 / density.max(f32::EPSILON)).floor();
        let max = (max as u32).max(1);
        let clamped = (width.clamp(1, max), height.clamp(1, max));
        if clamped != (width, height) {
            warn!(
                width,
                height,
                max,
                "requested size exceeds the backend limit; clamping"
            );
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{RecordingBackend, TargetId};
    use crate::config::RendererConfig;
    use crate::error::RenderError;
    use crate::id::FramebufferId;
    use crate::renderer::Renderer;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(200, 200).with_max_texture_size(1024),
            100,
            100,
            RendererConfig::default().with_pixel_density(2.0),
        )
    }

    #[test]
    fn framebuffers_inherit_density() {
        let mut renderer = renderer();
        let framebuffer = renderer.create_framebuffer(30, 20);
        assert_eq!(
            renderer
                .backend()
                .target_size(TargetId::Framebuffer(framebuffer)),
            Some((60, 40))
        );
    }

    #[test]
    fn oversized_framebuffers_are_clamped() {
        let mut renderer = renderer();
        let framebuffer = renderer.create_framebuffer(4000, 100);
        assert_eq!(renderer.framebuffer_size(framebuffer), Some((512, 100)));
    }

    #[test]
    fn draws_inside_go_to_the_framebuffer() {
        let mut renderer = renderer();
        let framebuffer = renderer.create_framebuffer(30, 20);
        renderer.translate(50.0, 0.0, 0.0);
        let model_before = renderer.state().model;
        renderer
            .draw_into(framebuffer, |r| {
                assert_eq!(r.current_target(), TargetId::Framebuffer(framebuffer));
                r.rect(0.0, 0.0, 5.0, 5.0)
            })
            .unwrap();
        assert_eq!(renderer.current_target(), TargetId::Main);
        assert_eq!(renderer.state().model, model_before);
        assert!(renderer
            .backend()
            .draws()
            .all(|draw| draw.target == TargetId::Framebuffer(framebuffer)));
        assert_eq!(
            renderer.backend().draws().next().unwrap().uniforms.get("viewport"),
            Some(&crate::shader::UniformValue::Vec2([60.0, 40.0]))
        );
    }

    #[test]
    fn unknown_framebuffers_are_errors() {
        let mut renderer = renderer();
        let missing = FramebufferId(999);
        assert_eq!(
            renderer.resize_framebuffer(missing, 1, 1),
            Err(RenderError::UnknownFramebuffer(missing))
        );
        assert_eq!(
            renderer.framebuffer_texture(missing),
            Err(RenderError::UnknownFramebuffer(missing))
        );
        let framebuffer = renderer.create_framebuffer(10, 10);
        renderer.remove_framebuffer(framebuffer).unwrap();
        assert_eq!(renderer.backend().live_framebuffers(), 0);
    }
}
