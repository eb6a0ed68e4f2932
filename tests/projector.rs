use std::ops::Range;

use starfield::visualization::compositor::MIN_DUST_RANGE;
use starfield::{
    Body, CameraGeometry, Color, ColorSample, ColorSource, Control, DepthCompositor, NVec3, NoiseField, Outcome,
    Projector, UniverseConstants,
};

const SUN: f64 = 1.99e30;
const SIZE: usize = 64;
const CENTER: usize = 32;

/// Same color and halo for every body
pub struct FlatColors;

impl ColorSource for FlatColors {
    fn color_for(&self, _mass: f64, _z_velocity: f64, _distance: f64, _gamma: f64) -> ColorSample {
        ColorSample {
            color: Color::new(200.0, 180.0, 160.0),
            halo_radius_mod: 1.0,
            halo_range_mod: 2.5,
        }
    }
}

/// No perturbation at all, so footprints are exactly symmetric
pub struct Still;

impl NoiseField for Still {
    fn noise3(&self, _x: f64, _y: f64, _z: f64, _zoom: f64) -> f64 {
        0.0
    }
}

/// A 64x64 screen with a 90 degree camera, the plane 32 units in front of it
pub struct Scene {
    pub universe: UniverseConstants,
    pub camera: CameraGeometry,
}

impl Scene {
    pub fn new() -> Self {
        let universe = UniverseConstants::default();
        let camera = CameraGeometry::new(&universe, SIZE, SIZE, 90.0, false, false, false);
        Self { universe, camera }
    }

    pub fn projector(&self) -> Projector<'_> {
        Projector {
            universe: &self.universe,
            camera: &self.camera,
            colors: &FlatColors,
            noise: &Still,
            cycles_per_frame: 0.5,
        }
    }

    /// Body on the plane at `(x, y)` from the screen center, `pixels` wide
    pub fn body(&self, x: f64, y: f64, pixels: f64, mass: f64) -> Body {
        let mut body = Body::new(&self.universe, NVec3::new(x, y, -self.camera.max_z), SUN, 0.0);
        body.radius = pixels * self.universe.pos_to_m;
        body.mass = mass;
        body
    }

    /// Remnant at the screen center whose core is `pixels` wide
    pub fn remnant(&self, pixels: f64, ring_radius: f64) -> Body {
        let mut body = self.body(0.0, 0.0, pixels, 0.0);
        body.ring_mass = 1.0 + SUN;
        body.ring_radius = ring_radius;
        body
    }

    pub fn project(&self, body: &Body, out: &DepthCompositor, rows: Range<usize>) -> Outcome {
        self.projector().project(body, out, rows, &Control::new(1))
    }
}

pub fn screen() -> DepthCompositor {
    DepthCompositor::new(SIZE, SIZE, MIN_DUST_RANGE).unwrap()
}

pub fn pixels() -> impl Iterator<Item = (usize, usize)> {
    (0..SIZE).flat_map(|y| (0..SIZE).map(move |x| (x, y)))
}

pub fn mass_count(out: &DepthCompositor) -> usize {
    pixels().filter(|&(x, y)| out.mass_depth(x, y).is_some()).count()
}

// ==================================================================================
// Regions
// ==================================================================================

#[test]
fn sun_leaves_an_opaque_disk_inside_its_halo() {
    let scene = Scene::new();
    let out = screen();

    assert!(scene.project(&scene.body(0.0, 0.0, 4.0, SUN), &out, 0..SIZE).is_success());

    // disk
    assert!(out.mass_depth(CENTER, CENTER).is_some());
    assert!(out.mass_depth(CENTER + 3, CENTER).is_some());
    // halo only
    assert!(out.mass_depth(CENTER + 6, CENTER).is_none());
    assert!(out.dust_opacity(CENTER + 6, CENTER) > 0.0);
    // outside
    assert!(out.dust_at(CENTER + 10, CENTER).is_empty());

    // the center is the nearest point of the sphere
    let center = out.mass_depth(CENTER, CENTER).unwrap();
    assert!(center < out.mass_depth(CENTER + 3, CENTER).unwrap());
}

#[test]
fn light_bodies_leave_no_opaque_disk() {
    let scene = Scene::new();
    let out = screen();

    assert!(scene.project(&scene.remnant(4.0, 0.0), &out, 0..SIZE).is_success());

    assert!(out.mass_depth(CENTER, CENTER).is_none());
    assert!(out.mass_depth(CENTER + 2, CENTER + 1).is_none());
    assert!(out.dust_opacity(CENTER, CENTER) > 0.0);
}

#[test]
fn young_ring_is_opaque() {
    let scene = Scene::new();
    let out = screen();

    // core 11 pixels wide, torus from there to 11.5
    assert!(scene.project(&scene.remnant(1.0, 10.0), &out, 0..SIZE).is_success());

    assert!(out.mass_depth(CENTER + 11, CENTER + 2).is_some());
    assert!(out.mass_depth(CENTER, CENTER).is_none());
    assert!(out.dust_opacity(CENTER, CENTER) > 0.0);
}

#[test]
fn faded_ring_is_dust_only() {
    let scene = Scene::new();
    let out = screen();

    assert!(scene.project(&scene.remnant(1.0, 150.0), &out, 0..SIZE).is_success());

    assert_eq!(mass_count(&out), 0);
    assert!(out.dust_opacity(CENTER, CENTER) > 0.0);
}

#[test]
fn finished_rings_are_not_drawn() {
    let scene = Scene::new();
    let out = screen();
    let body = scene.remnant(1.0, scene.universe.ring_radius_max);

    assert!(scene.project(&body, &out, 0..SIZE).is_success());

    assert!(pixels().all(|(x, y)| out.mass_depth(x, y).is_none() && out.dust_at(x, y).is_empty()));
}

// ==================================================================================
// Rings
// ==================================================================================

#[test]
fn rings_grow_by_one_frame() {
    let scene = Scene::new();
    let projector = scene.projector();
    let u = &scene.universe;

    let mut ring = scene.remnant(1.0, 10.0);
    projector.advance_ring(&mut ring);
    assert_eq!(ring.ring_radius, 10.0 + 0.5 * u.ring_growth_per_cycle);

    let mut done = scene.remnant(1.0, u.ring_radius_max);
    projector.advance_ring(&mut done);
    assert_eq!(done.ring_radius, u.ring_radius_max);

    let mut alive = scene.body(0.0, 0.0, 4.0, SUN);
    projector.advance_ring(&mut alive);
    assert_eq!(alive.ring_radius, 0.0);
}

// ==================================================================================
// Footprint
// ==================================================================================

#[test]
fn mirrored_pixels_match() {
    let scene = Scene::new();
    let out = screen();
    assert!(scene.project(&scene.body(0.0, 0.0, 6.0, SUN), &out, 0..SIZE).is_success());

    let c = CENTER as i64;
    for a in 0..14_i64 {
        for b in 0..14_i64 {
            let quarter_turns = [(c + a, c + b), (c - b, c + a), (c - a, c - b), (c + b, c - a)];
            let (x0, y0) = (quarter_turns[0].0 as usize, quarter_turns[0].1 as usize);
            for &(x, y) in &quarter_turns[1..] {
                let (x, y) = (x as usize, y as usize);
                assert_eq!(out.mass_depth(x, y), out.mass_depth(x0, y0), "mass at offset ({a}, {b})");
                assert_eq!(out.dust_at(x, y), out.dust_at(x0, y0), "dust at offset ({a}, {b})");
            }
        }
    }
}

#[test]
fn bands_add_up_to_the_full_screen() {
    let scene = Scene::new();
    let bodies = [scene.body(0.0, 0.0, 5.0, SUN), scene.body(4.0, 3.0, 3.0, 2.0 * SUN)];

    let whole = screen();
    for body in &bodies {
        assert!(scene.project(body, &whole, 0..SIZE).is_success());
    }

    let banded = screen();
    for rows in [0..20, 20..41, 41..SIZE] {
        for body in &bodies {
            assert!(scene.project(body, &banded, rows.clone()).is_success());
        }
    }

    for (x, y) in pixels() {
        assert_eq!(banded.mass_depth(x, y), whole.mass_depth(x, y), "mass at ({x}, {y})");
        assert_eq!(banded.dust_at(x, y), whole.dust_at(x, y), "dust at ({x}, {y})");
    }
}

#[test]
fn band_writes_stay_inside_it() {
    let scene = Scene::new();
    let out = screen();

    assert!(scene.project(&scene.body(0.0, 0.0, 6.0, SUN), &out, 30..34).is_success());

    for (x, y) in pixels() {
        if !(30..34).contains(&y) {
            assert!(out.mass_depth(x, y).is_none() && out.dust_at(x, y).is_empty(), "({x}, {y})");
        }
    }
    assert!(out.mass_depth(CENTER, CENTER).is_some());
}

#[test]
fn body_next_to_the_camera_fills_the_screen() {
    let scene = Scene::new();
    let out = screen();

    // 0.05 units in front of the camera, thousands of pixels wide
    let mut body = scene.body(0.0, 0.0, 3.75, SUN);
    body.pos.z = -scene.camera.max_z - scene.camera.cam_dist + 0.05;

    assert!(scene.project(&body, &out, 0..SIZE).is_success());
    assert_eq!(mass_count(&out), SIZE * SIZE);
}
