// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Semi-implicit Euler integration.

use crate::math::{Pose, Vec3};

use super::state::BodyState;

/// Outcome of sanitizing a body's velocities before position integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitized {
    /// Velocities were finite.
    Clean,
    /// A NaN or infinite velocity was found and reset to zero.
    Reset,
}

/// Advances dynamic bodies: velocity first, then pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    /// Gravity acceleration applied to every awake dynamic body.
    pub gravity: Vec3,
    /// Upper bound on the angular speed, in rad/s.
    pub max_angular_velocity: f32,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_angular_velocity: 100.0,
        }
    }
}

impl Integrator {
    /// Applies gravity and damping: `v = (v + g·dt) / (1 + d·dt)`.
    pub fn integrate_velocity(&self, state: &mut BodyState, dt: f32) {
        if !state.is_dynamic() {
            return;
        }
        state.linear_velocity += self.gravity * dt;
        state.linear_velocity *= 1.0 / (1.0 + state.linear_damping * dt);
        state.angular_velocity *= 1.0 / (1.0 + state.angular_damping * dt);
        state.angular_velocity = state
            .angular_velocity
            .clamp_length(self.max_angular_velocity);
    }

    /// Zeroes non-finite velocities so one bad body cannot poison the scene.
    pub fn sanitize(&self, state: &mut BodyState) -> Sanitized {
        if state.linear_velocity.is_finite() && state.angular_velocity.is_finite() {
            return Sanitized::Clean;
        }
        state.linear_velocity = Vec3::ZERO;
        state.angular_velocity = Vec3::ZERO;
        Sanitized::Reset
    }

    /// Moves the centre of mass by `v·dt` and rotates the body about it by `ω·dt`.
    pub fn integrate_position(&self, state: &mut BodyState, dt: f32) {
        if !state.is_dynamic() {
            return;
        }
        let center = state.center() + state.linear_velocity * dt;
        let orientation = state.pose.orientation.integrate(state.angular_velocity, dt);
        let position = center - orientation.rotate_vec3(state.local_center);
        state.pose = Pose::new(position, orientation);
        state.refresh_world_inertia();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat3, Quaternion};
    use approx::assert_relative_eq;

    fn free_body() -> BodyState {
        let mut state = BodyState::fixed(Pose::IDENTITY);
        state.inv_mass = 1.0;
        state.inv_inertia_local = Mat3::IDENTITY;
        state.refresh_world_inertia();
        state
    }

    #[test]
    fn free_fall_matches_closed_form() {
        let integrator = Integrator::default();
        let dt = 1.0 / 60.0;
        let mut state = free_body();
        let n = 120;
        for _ in 0..n {
            integrator.integrate_velocity(&mut state, dt);
            integrator.integrate_position(&mut state, dt);
        }
        let g = integrator.gravity.y;
        assert_relative_eq!(state.linear_velocity.y, n as f32 * g * dt, max_relative = 1e-4);
        // Symplectic Euler: y_n = g·dt²·n(n+1)/2.
        let expected_y = g * dt * dt * (n * (n + 1)) as f32 / 2.0;
        assert_relative_eq!(state.pose.position.y, expected_y, max_relative = 1e-3);
    }

    #[test]
    fn damping_scales_velocity() {
        let integrator = Integrator {
            gravity: Vec3::ZERO,
            ..Integrator::default()
        };
        let mut state = free_body();
        state.linear_velocity = Vec3::new(10.0, 0.0, 0.0);
        state.linear_damping = 0.5;
        integrator.integrate_velocity(&mut state, 0.1);
        assert_relative_eq!(state.linear_velocity.x, 10.0 / 1.05, epsilon = 1e-5);
    }

    #[test]
    fn angular_velocity_is_clamped() {
        let integrator = Integrator::default();
        let mut state = free_body();
        state.angular_velocity = Vec3::new(0.0, 500.0, 0.0);
        integrator.integrate_velocity(&mut state, 1.0 / 60.0);
        assert!(state.angular_velocity.length() <= 100.0 + 1e-3);
    }

    #[test]
    fn static_states_never_move() {
        let integrator = Integrator::default();
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::from_axis_angle(Vec3::Y, 0.4));
        let mut state = BodyState::fixed(pose);
        integrator.integrate_velocity(&mut state, 0.5);
        integrator.integrate_position(&mut state, 0.5);
        assert_eq!(state.pose, pose);
        assert_eq!(state.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn non_finite_velocity_is_reset() {
        let integrator = Integrator::default();
        let mut state = free_body();
        state.linear_velocity = Vec3::new(f32::NAN, 0.0, 0.0);
        assert_eq!(integrator.sanitize(&mut state), Sanitized::Reset);
        assert_eq!(state.linear_velocity, Vec3::ZERO);
        assert_eq!(integrator.sanitize(&mut state), Sanitized::Clean);
    }

    #[test]
    fn rotation_happens_about_centre_of_mass() {
        let integrator = Integrator {
            gravity: Vec3::ZERO,
            ..Integrator::default()
        };
        let mut state = free_body();
        state.local_center = Vec3::new(1.0, 0.0, 0.0);
        state.angular_velocity = Vec3::new(0.0, 0.0, std::f32::consts::PI);
        let before = state.center();
        integrator.integrate_position(&mut state, 0.5);
        let after = state.center();
        assert_relative_eq!(before.x, after.x, epsilon = 1e-5);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-5);
        // The body origin swung a quarter turn around the centre of mass.
        assert_relative_eq!(state.pose.position.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(state.pose.position.y, -1.0, epsilon = 1e-5);
    }
}
