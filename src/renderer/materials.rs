use super::*;

impl<B: Backend> Renderer<B> {
    pub fn fill(&mut self, color: impl Into<Color>) {
        let state = self.states.current_mut();
        state.fill = color.into();
        state.do_fill = true;
        state.use_normal_material = false;
        state.texture = None;
    }

    pub fn no_fill(&mut self) {
        self.states.current_mut().do_fill = false;
    }

    pub fn stroke(&mut self, color: impl Into<Color>) {
        let state = self.states.current_mut();
        state.stroke = color.into();
        state.do_stroke = true;
    }

    pub fn no_stroke(&mut self) {
        self.states.current_mut().do_stroke = false;
    }

    /// Stroke width in logical pixels; also the size of points.
    pub fn stroke_weight(&mut self, weight: f32) {
        let state = self.states.current_mut();
        state.stroke_weight = weight.max(0.0);
        state.point_size = weight.max(0.0);
    }

    pub fn stroke_cap(&mut self, cap: StrokeCap) {
        self.states.current_mut().stroke_cap = cap;
    }

    pub fn stroke_join(&mut self, join: StrokeJoin) {
        self.states.current_mut().stroke_join = join;
    }

    pub fn ambient_material(&mut self, color: impl Into<Color>) {
        let state = self.states.current_mut();
        state.ambient_material = color.into();
        state.has_set_ambient = true;
        state.use_normal_material = false;
        state.enable_lighting = true;
    }

    pub fn specular_material(&mut self, color: impl Into<Color>) {
        let state = self.states.current_mut();
        state.specular_material = color.into();
        state.use_specular_material = true;
        state.use_normal_material = false;
        state.enable_lighting = true;
    }

    pub fn emissive_material(&mut self, color: impl Into<Color>) {
        let state = self.states.current_mut();
        state.emissive_material = color.into();
        state.use_emissive_material = true;
        state.use_normal_material = false;
        state.enable_lighting = true;
    }

    /// Sharpness of specular highlights; values below 1 are raised to 1.
    pub fn shininess(&mut self, shininess: f32) {
        self.states.current_mut().shininess = shininess.max(1.0);
    }

    /// How metallic surfaces look, from 0 upwards. Metallic surfaces reflect their fill color
    /// and receive less ambient light.
    pub fn metalness(&mut self, metalness: f32) {
        self.states.current_mut().metalness = metalness.max(0.0);
    }

    /// Colors surfaces by their view-space normal.
    pub fn normal_material(&mut self) {
        let state = self.states.current_mut();
        state.use_normal_material = true;
        state.do_fill = true;
        state.texture = None;
    }

    /// Textures subsequent fills with `image`.
    pub fn texture(&mut self, image: &Image) {
        let texture = self.texture_for(image);
        self.texture_from(texture);
    }

    /// Textures subsequent fills with an existing texture, such as a framebuffer's.
    pub fn texture_from(&mut self, texture: TextureId) {
        let state = self.states.current_mut();
        state.texture = Some(texture);
        state.do_fill = true;
        state.use_normal_material = false;
    }

    pub fn no_texture(&mut self) {
        self.states.current_mut().texture = None;
    }

    pub fn tint(&mut self, color: impl Into<Color>) {
        self.states.current_mut().tint = color.into();
    }

    pub fn no_tint(&mut self) {
        self.states.current_mut().tint = Color::WHITE;
    }

    pub fn blend_mode(&mut self, mode: BlendMode) {
        if self.states.current().erase_restore.is_some() {
            debug!("blend_mode() ignored while erasing");
            return;
        }
        let mode = if mode.is_supported() {
            mode
        } else {
            warn!(?mode, "blend mode is only available in 2D; using Blend");
            BlendMode::Blend
        };
        self.states.current_mut().blend_mode = mode;
    }

    /// Subsequent fills and strokes remove coverage instead of painting. Strengths are in
    /// `[0, 1]`. Erasing is part of the saved state, so `pop()` restores it.
    pub fn erase(&mut self, fill_strength: f32, stroke_strength: f32) {
        let state = self.states.current_mut();
        if state.erase_restore.is_none() {
            state.erase_restore = Some(EraseRestore {
                fill: state.fill,
                stroke: state.stroke,
                blend_mode: state.blend_mode,
            });
        }
        state.fill = Color::from_f32(1.0, 1.0, 1.0, fill_strength.clamp(0.0, 1.0));
        state.stroke = Color::from_f32(1.0, 1.0, 1.0, stroke_strength.clamp(0.0, 1.0));
        state.blend_mode = BlendMode::Remove;
    }

    pub fn no_erase(&mut self) {
        let state = self.states.current_mut();
        let Some(saved) = state.erase_restore.take() else {
            return;
        };
        state.fill = saved.fill;
        state.stroke = saved.stroke;
        state.blend_mode = saved.blend_mode;
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::RecordingBackend;
    use crate::color::Color;
    use crate::config::RendererConfig;
    use crate::renderer::Renderer;
    use crate::state::BlendMode;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(50, 50),
            50,
            50,
            RendererConfig::default(),
        )
    }

    #[test]
    fn pop_restores_erasing_and_no_erase_still_ends_it() {
        let mut renderer = renderer();
        renderer.fill([1.0, 0.0, 0.0, 1.0]);
        renderer.erase(1.0, 1.0);
        renderer.push();
        renderer.no_erase();
        assert_eq!(renderer.state().blend_mode, BlendMode::Blend);
        renderer.pop().unwrap();
        assert_eq!(renderer.state().blend_mode, BlendMode::Remove);

        renderer.no_erase();
        assert_eq!(renderer.state().blend_mode, BlendMode::Blend);
        assert_eq!(renderer.state().fill, Color::from([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn blend_mode_is_ignored_while_erasing() {
        let mut renderer = renderer();
        renderer.erase(0.5, 0.5);
        renderer.blend_mode(BlendMode::Add);
        assert_eq!(renderer.state().blend_mode, BlendMode::Remove);
        renderer.no_erase();
        renderer.blend_mode(BlendMode::Add);
        assert_eq!(renderer.state().blend_mode, BlendMode::Add);
    }
}
