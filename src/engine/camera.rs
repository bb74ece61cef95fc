// Fixed viewing camera.
//
// The camera itself never moves: it sits in front of the scene and looks at
// the tree. All apparent motion (auto-spin, gesture orbit) comes from the
// scene's model matrix, so the camera reduces to a view-projection pair.

use glam::{Mat4, Vec3};

pub struct SceneCamera {
    pub eye: Vec3,
    pub look_at: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl SceneCamera {
    pub fn new() -> Self {
        Self {
            eye: Vec3::new(0.0, 6.0, 22.0),
            look_at: Vec3::ZERO,
            fov: 35.0_f32.to_radians(),
            near: 0.1,
            // Far enough to keep the backdrop shell (outer radius 200) visible.
            far: 400.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn scene_center_projects_inside_clip_space() {
        let camera = SceneCamera::new();
        let clip = camera.view_projection(16.0 / 9.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn backdrop_shell_is_inside_the_far_plane() {
        let camera = SceneCamera::new();
        let far_star = Vec4::new(0.0, 0.0, -200.0 + camera.eye.z, 1.0);
        let clip = camera.view_projection(1.0) * far_star;
        let ndc = clip / clip.w;
        assert!(ndc.z < 1.0);
    }
}
