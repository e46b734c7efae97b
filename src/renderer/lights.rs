use super::*;

impl<B: Backend> Renderer<B> {
    pub fn ambient_light(&mut self, color: impl Into<Color>) {
        let color = color.into();
        let state = self.states.current_mut();
        Lights::push_limited(&mut state.lights.ambient, color.rgb_array(), "ambient");
        state.enable_lighting = true;
    }

    /// A light shining along `direction`, given in world space.
    pub fn directional_light(&mut self, color: impl Into<Color>, direction: [f32; 3]) {
        let color = color.into();
        let state = self.states.current_mut();
        let light = DirectionalLight {
            direction: math::transform_direction(&state.camera.view, direction),
            diffuse: color.rgb_array(),
            specular: state.lights.specular_color,
        };
        Lights::push_limited(&mut state.lights.directional, light, "directional");
        state.enable_lighting = true;
    }

    pub fn point_light(&mut self, color: impl Into<Color>, position: [f32; 3]) {
        let color = color.into();
        let state = self.states.current_mut();
        let light = PointLight {
            position: math::transform_point(&state.camera.view, position),
            diffuse: color.rgb_array(),
            specular: state.lights.specular_color,
        };
        Lights::push_limited(&mut state.lights.point, light, "point");
        state.enable_lighting = true;
    }

    /// A cone of light at `position` along `direction`; `angle` is the half-angle in radians
    /// and `concentration` focuses light towards the cone axis.
    pub fn spot_light(
        &mut self,
        color: impl Into<Color>,
        position: [f32; 3],
        direction: [f32; 3],
        angle: f32,
        concentration: f32,
    ) {
        let color = color.into();
        let state = self.states.current_mut();
        let light = SpotLight {
            position: math::transform_point(&state.camera.view, position),
            direction: math::transform_direction(&state.camera.view, direction),
            diffuse: color.rgb_array(),
            specular: state.lights.specular_color,
            angle_cos: angle.cos(),
            concentration,
        };
        Lights::push_limited(&mut state.lights.spot, light, "spot");
        state.enable_lighting = true;
    }

    /// A default gray ambient light plus a gray directional light facing into the screen.
    pub fn lights(&mut self) {
        self.ambient_light(Color::gray(128));
        self.directional_light(Color::gray(128), [0.0, 0.0, -1.0]);
    }

    pub fn no_lights(&mut self) {
        let state = self.states.current_mut();
        state.lights = Lights::default();
        state.enable_lighting = false;
        state.image_light = None;
        state.attenuation = Attenuation::default();
    }

    pub fn light_falloff(&mut self, constant: f32, linear: f32, quadratic: f32) {
        if constant < 0.0 || linear < 0.0 || quadratic < 0.0 {
            warn!(constant, linear, quadratic, "light falloff values must not be negative");
        }
        self.states.current_mut().attenuation = Attenuation {
            constant: constant.max(0.0),
            linear: linear.max(0.0),
            quadratic: quadratic.max(0.0),
        };
    }

    /// Specular color of lights created after this call.
    pub fn specular_color(&mut self, color: impl Into<Color>) {
        self.states.current_mut().lights.specular_color = color.into().rgb_array();
    }

    /// Lights the scene with an equirectangular environment image.
    pub fn image_light(&mut self, image: &Image) {
        let state = self.states.current_mut();
        state.image_light = Some(image.clone());
        state.enable_lighting = true;
    }
}
