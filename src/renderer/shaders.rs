use super::*;

impl<B: Backend> Renderer<B> {
    /// Uses `shader` for subsequent draws of its kind: stroke and point programs replace the
    /// stroke or point program, everything else the fill program.
    ///
    /// A fill program that cannot serve the current material (say, a color program while
    /// lights are on) is skipped in favour of the built-in one.
    pub fn shader(&mut self, shader: &Shader) {
        let state = self.states.current_mut();
        match shader.class() {
            ShaderClass::Stroke => state.user_stroke_shader = Some(shader.clone()),
            ShaderClass::Point => state.user_point_shader = Some(shader.clone()),
            ShaderClass::Filter => {
                warn!(label = shader.label(), "filter programs are applied with filter()");
            }
            _ => state.user_fill_shader = Some(shader.clone()),
        }
    }

    pub fn stroke_shader(&mut self, shader: &Shader) {
        if !shader.is_stroke_shader() {
            warn!(label = shader.label(), "stroke_shader() given a non-stroke program");
        }
        self.states.current_mut().user_stroke_shader = Some(shader.clone());
    }

    /// Returns every draw to the built-in programs.
    pub fn reset_shader(&mut self) {
        let state = self.states.current_mut();
        state.user_fill_shader = None;
        state.user_stroke_shader = None;
        state.user_point_shader = None;
    }

    /// The built-in lit material program, to derive hooked variants from with
    /// [`Shader::modify`]. Only the per-pixel program has hooks.
    pub fn base_material_shader(&mut self) -> Result<Shader> {
        if !self.config.per_pixel_lighting {
            return Err(RenderError::HooksUnsupported);
        }
        Ok(self.defaults.get(DefaultProgram::Light))
    }

    pub fn base_normal_shader(&mut self) -> Shader {
        self.defaults.get(DefaultProgram::Normal)
    }

    pub fn base_color_shader(&mut self) -> Shader {
        self.defaults.get(DefaultProgram::Color)
    }

    pub fn base_stroke_shader(&mut self) -> Shader {
        self.defaults.get(DefaultProgram::Line)
    }

    pub fn point_shader(&mut self) -> Shader {
        self.defaults.get(DefaultProgram::Point)
    }

    /// A program from a complete WGSL module; see [`Shader::from_wgsl`].
    pub fn create_shader(&mut self, class: ShaderClass, wgsl: &str) -> Result<Shader> {
        Shader::from_wgsl(class, "user", wgsl)
    }

    /// A filter from a fragment stage alone; see [`Shader::filter`].
    pub fn create_filter_shader(&mut self, fragment: &str, extra_uniforms: &[UniformDecl]) -> Shader {
        Shader::filter("user_filter", fragment, extra_uniforms)
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::RecordingBackend;
    use crate::config::RendererConfig;
    use crate::error::RenderError;
    use crate::renderer::Renderer;
    use crate::shader::{HookPoint, HookTable, ShaderClass, UniformValue};

    fn renderer(config: RendererConfig) -> Renderer<RecordingBackend> {
        Renderer::with_backend(RecordingBackend::new(100, 100), 100, 100, config)
    }

    fn labels(renderer: &Renderer<RecordingBackend>) -> Vec<String> {
        renderer
            .backend()
            .draws()
            .map(|draw| draw.program_label.clone())
            .collect()
    }

    #[test]
    fn hooks_need_per_pixel_lighting() {
        let mut renderer = renderer(RendererConfig::default().with_per_pixel_lighting(false));
        assert_eq!(
            renderer.base_material_shader(),
            Err(RenderError::HooksUnsupported)
        );
    }

    #[test]
    fn fill_programs_follow_the_material() {
        let mut renderer = renderer(RendererConfig::default());
        renderer.no_stroke();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();
        renderer.lights();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();
        renderer.normal_material();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(labels(&renderer), ["color", "light", "normal"]);
    }

    #[test]
    fn incapable_user_programs_are_skipped() {
        let mut renderer = renderer(RendererConfig::default());
        let flat = renderer
            .base_color_shader()
            .modify(&HookTable::new().with(
                HookPoint::GetFinalColor,
                "return vec4<f32>(1.0, 0.0, 0.0, 1.0);",
            ))
            .unwrap();
        flat.set_uniform("material_color", [0.0, 1.0, 0.0, 1.0]);
        renderer.shader(&flat);
        renderer.no_stroke();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();
        renderer.lights();
        renderer.rect(0.0, 0.0, 1.0, 1.0).unwrap();

        let draws: Vec<_> = renderer.backend().draws().collect();
        assert_eq!(draws[0].program_label, "color");
        assert_eq!(draws[1].program_label, "light");
        // Renderer values win over the program's own.
        assert_eq!(
            draws[0].uniforms.get("material_color"),
            Some(&UniformValue::Vec4([1.0, 1.0, 1.0, 1.0]))
        );
    }

    #[test]
    fn stroke_programs_go_to_the_stroke_slot() {
        let mut renderer = renderer(RendererConfig::default());
        let thick = renderer
            .base_stroke_shader()
            .modify(&HookTable::new())
            .unwrap();
        renderer.shader(&thick);
        assert_eq!(
            renderer.state().user_stroke_shader.as_ref().map(|s| s.class()),
            Some(ShaderClass::Stroke)
        );
        assert!(renderer.state().user_fill_shader.is_none());
        renderer.reset_shader();
        assert!(renderer.state().user_stroke_shader.is_none());
    }
}
