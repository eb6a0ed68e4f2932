//! Pinhole camera in front of the simulated space
//!
//! The projection plane is the screen, `cam_dist` in front of the plane the
//! camera sits. Space reaches `max_z` behind the plane. With a dynamic camera
//! the plane follows the nearest body, but never moves back behind `max_z`.

use crate::simulation::params::UniverseConstants;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraGeometry {
    pub width: usize,
    pub height: usize,
    pub half_width: f64,
    pub half_height: f64,
    pub cam_dist: f64, // camera to projection plane, position units
    pub max_z: f64, // deepest z that is still shown
    pub dyn_max_z: f64, // current depth of the plane, == max_z unless dynamic
    pub dynamic: bool,
}

impl CameraGeometry {
    /// - `fov` is the horizontal field of view in degrees
    /// - `half_x`/`half_y` widen the visible depth when only every second column/row is populated
    pub fn new(u: &UniverseConstants, width: usize, height: usize, fov: f64, half_x: bool, half_y: bool, dynamic: bool) -> Self {
        let half_width = (width / 2) as f64;
        let half_height = (height / 2) as f64;

        let half_fov = (fov / 2.0).to_radians();
        let cam_dist = half_fov.cos() * half_width / half_fov.sin();

        // one AU behind the plane covers one pixel (two when thinned out)
        let max_z_div = if half_x || half_y { 2.0 } else { 1.0 } / u.au_in_pos();
        let max_z = cam_dist / max_z_div - cam_dist;

        Self {
            width,
            height,
            half_width,
            half_height,
            cam_dist,
            max_z,
            dyn_max_z: max_z,
            dynamic,
        }
    }

    /// Scale from plane coordinates to the z = 0 plane
    pub fn zero_div(&self) -> f64 {
        self.cam_dist / (self.max_z + self.cam_dist)
    }

    /// Distance of a body at `pos_z` from the camera along the view axis
    pub fn view_depth(&self, pos_z: f64) -> f64 {
        self.dyn_max_z + self.cam_dist + pos_z
    }

    /// Follow the nearest body. Does nothing unless the camera is dynamic.
    pub fn follow(&mut self, min_z: f64) {
        if self.dynamic {
            self.dyn_max_z = min_z.abs().min(self.max_z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_degrees_puts_the_camera_half_a_screen_away() {
        let cam = CameraGeometry::new(&UniverseConstants::default(), 400, 300, 90.0, false, false, false);
        approx::assert_relative_eq!(cam.cam_dist, 200.0, max_relative = 1e-12);
        assert_eq!(cam.dyn_max_z, cam.max_z);
        assert!(cam.zero_div() < 1.0);
    }

    #[test]
    fn static_camera_ignores_bodies() {
        let mut cam = CameraGeometry::new(&UniverseConstants::default(), 100, 100, 90.0, false, false, false);
        cam.follow(-10.0);
        assert_eq!(cam.dyn_max_z, cam.max_z);
    }

    #[test]
    fn dynamic_camera_never_backs_off_behind_max_z() {
        let mut cam = CameraGeometry::new(&UniverseConstants::default(), 100, 100, 90.0, false, false, true);
        cam.follow(-10.0);
        assert_eq!(cam.dyn_max_z, 10.0);
        cam.follow(cam.max_z * 4.0);
        assert_eq!(cam.dyn_max_z, cam.max_z);
    }
}
