use super::*;

impl<B: Backend> Renderer<B> {
    /// Starts drawing a clip mask on the current target. Until `end_clip`, fills and strokes
    /// only mark the stencil buffer.
    pub fn begin_clip(&mut self, options: ClipOptions) -> Result<()> {
        self.clip.begin(self.target, options)?;
        self.backend.clear(self.target, &ClearOps::stencil(0));
        self.states.push();
        let state = self.states.current_mut();
        state.user_fill_shader = None;
        state.user_stroke_shader = None;
        state.user_point_shader = None;
        Ok(())
    }

    /// Activates the mask. It stays active until the state pushed before `begin_clip` is
    /// popped, or until the next frame.
    pub fn end_clip(&mut self) -> Result<()> {
        if !self.clip.is_clipping() {
            return Err(RenderError::ClipNotStarted);
        }
        // The mask ends even when the user already popped the state saved by begin_clip.
        let popped = self.states.pop();
        self.clip.end(self.states.depth())?;
        popped.map(|_| ())
    }

    /// Draws the mask with `mask`, then activates it.
    pub fn clip(
        &mut self,
        options: ClipOptions,
        mask: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.begin_clip(options)?;
        let drawn = mask(self);
        self.end_clip()?;
        drawn
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{
        Command, RecordingBackend, StencilCompare, StencilMode, TargetId,
    };
    use crate::clip::ClipOptions;
    use crate::config::RendererConfig;
    use crate::error::RenderError;
    use crate::renderer::Renderer;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 100),
            100,
            100,
            RendererConfig::default(),
        )
    }

    #[test]
    fn mask_draws_write_stencil_without_color() {
        let mut renderer = renderer();
        renderer
            .clip(ClipOptions::default(), |r| r.ellipse(0.0, 0.0, 20.0, 20.0))
            .unwrap();
        renderer.rect(-50.0, -50.0, 100.0, 100.0).unwrap();

        let draws: Vec<_> = renderer.backend().draws().collect();
        let mask = draws[0];
        assert_eq!(mask.raster.stencil, StencilMode::Write { reference: 1 });
        assert!(!mask.raster.color_write);
        assert!(!mask.raster.depth_test);
        let last = draws.last().unwrap();
        assert_eq!(
            last.raster.stencil,
            StencilMode::Test {
                compare: StencilCompare::NotEqual,
                reference: 0
            }
        );
        assert!(last.raster.color_write);
        assert!(last.raster.depth_test);
    }

    #[test]
    fn inverted_masks_keep_the_outside() {
        let mut renderer = renderer();
        renderer
            .clip(ClipOptions { invert: true }, |r| r.rect(0.0, 0.0, 5.0, 5.0))
            .unwrap();
        renderer.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        let last = renderer.backend().draws().last().unwrap();
        assert_eq!(
            last.raster.stencil,
            StencilMode::Test {
                compare: StencilCompare::Equal,
                reference: 0
            }
        );
    }

    #[test]
    fn popping_past_the_clip_retires_it() {
        let mut renderer = renderer();
        renderer.push();
        renderer
            .clip(ClipOptions::default(), |r| r.rect(0.0, 0.0, 5.0, 5.0))
            .unwrap();
        renderer.pop().unwrap();
        renderer.backend_mut().clear_commands();
        renderer.rect(0.0, 0.0, 10.0, 10.0).unwrap();

        assert!(renderer
            .backend()
            .draws()
            .all(|draw| draw.raster.stencil == StencilMode::Disabled));
    }

    #[test]
    fn retiring_clears_the_stencil() {
        let mut renderer = renderer();
        renderer.push();
        renderer.begin_clip(ClipOptions::default()).unwrap();
        renderer.end_clip().unwrap();
        renderer.backend_mut().clear_commands();
        renderer.pop().unwrap();
        assert!(renderer.backend().commands().iter().any(|command| matches!(
            command,
            Command::Clear { target: TargetId::Main, ops } if ops.stencil == Some(0)
        )));
    }

    #[test]
    fn unbalanced_pop_inside_the_mask_still_ends_it() {
        let mut renderer = renderer();
        renderer.begin_clip(ClipOptions::default()).unwrap();
        renderer.pop().unwrap();
        assert_eq!(renderer.end_clip(), Err(RenderError::UnbalancedPop));

        renderer.backend_mut().clear_commands();
        renderer.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        let last = renderer.backend().draws().last().unwrap();
        assert!(last.raster.color_write);
        assert_eq!(
            last.raster.stencil,
            StencilMode::Test {
                compare: StencilCompare::NotEqual,
                reference: 0
            }
        );
        renderer.begin_clip(ClipOptions::default()).unwrap();
    }

    #[test]
    fn end_without_begin_fails() {
        let mut renderer = renderer();
        assert_eq!(renderer.end_clip(), Err(RenderError::ClipNotStarted));
        renderer.begin_clip(ClipOptions::default()).unwrap();
        assert_eq!(
            renderer.begin_clip(ClipOptions::default()),
            Err(RenderError::ClipAlreadyStarted)
        );
    }
}
