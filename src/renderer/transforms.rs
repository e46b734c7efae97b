use super::*;

impl<B: Backend> Renderer<B> {
    /// Saves a snapshot of the render state.
    pub fn push(&mut self) {
        self.states.push();
    }

    /// Restores the last saved state. Leaving the depth at which a clip was applied retires
    /// that clip.
    pub fn pop(&mut self) -> Result<()> {
        let left = self.states.pop()?;
        if self.clip.on_pop(self.target, left) {
            debug!("Clip retired on {:?}", self.target);
            self.backend.clear(self.target, &ClearOps::stencil(0));
        }
        Ok(())
    }

    /// Runs `draw` between `push()` and `pop()`.
    pub fn with_saved_state<T>(&mut self, draw: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.push();
        let result = draw(self);
        self.pop()?;
        result
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        let state = self.states.current_mut();
        state.model = state.model.pre_translate(Vec3::new(x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        let state = self.states.current_mut();
        state.model = state.model.pre_scale(x, y, z);
    }

    /// Rotates by `radians` around `axis`.
    pub fn rotate(&mut self, radians: f32, axis: [f32; 3]) {
        let rotation = math::rotation(Vec3::new(axis[0], axis[1], axis[2]), radians);
        self.apply_matrix(&rotation);
    }

    pub fn rotate_x(&mut self, radians: f32) {
        self.rotate(radians, [1.0, 0.0, 0.0]);
    }

    pub fn rotate_y(&mut self, radians: f32) {
        self.rotate(radians, [0.0, 1.0, 0.0]);
    }

    pub fn rotate_z(&mut self, radians: f32) {
        self.rotate(radians, [0.0, 0.0, 1.0]);
    }

    /// Applies `matrix` to geometry before the current model matrix.
    pub fn apply_matrix(&mut self, matrix: &Mat4) {
        let state = self.states.current_mut();
        state.model = matrix.then(&state.model);
    }

    pub fn reset_matrix(&mut self) {
        self.states.current_mut().model = Mat4::identity();
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.states.current_mut().camera = camera;
    }

    /// Orthographic camera covering the current target.
    pub fn ortho_camera(&mut self) {
        let surface = self.target_surface();
        self.states.current_mut().camera =
            Camera::ortho_for(surface.width as f32, surface.height as f32);
    }

    /// The default perspective camera of the current target.
    pub fn reset_camera(&mut self) {
        let surface = self.target_surface();
        self.states.current_mut().camera =
            Camera::default_for(surface.width as f32, surface.height as f32);
    }

    pub fn camera(&self) -> &Camera {
        &self.states.current().camera
    }

    pub(super) fn target_surface(&self) -> Surface {
        match self.target {
            TargetId::Main => self.main,
            TargetId::Framebuffer(framebuffer) => self
                .framebuffers
                .get(&framebuffer)
                .copied()
                .unwrap_or(self.main),
        }
    }
}
