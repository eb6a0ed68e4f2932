use approx::{assert_abs_diff_eq, assert_relative_eq};

use starfield::{Color, DepthCompositor, DustPixel};

/// One pixel compositor, masses may go right up to the camera
pub fn one_pixel() -> DepthCompositor {
    DepthCompositor::new(1, 1, 0.0001).unwrap()
}

pub fn white() -> Color {
    Color::new(255.0, 255.0, 255.0)
}

pub fn red() -> Color {
    Color::new(255.0, 0.0, 0.0)
}

/// Live intervals as (start, end), nearest first
pub fn extents(out: &DepthCompositor) -> Vec<(f64, f64)> {
    out.dust_at(0, 0).iter().map(|d| (d.z, d.end())).collect()
}

/// No two intervals share any depth
pub fn assert_disjoint(chain: &[DustPixel]) {
    for pair in chain.windows(2) {
        assert!(
            pair[0].end() <= pair[1].z + 1e-9,
            "overlap: [{}, {}) and [{}, {})",
            pair[0].z,
            pair[0].end(),
            pair[1].z,
            pair[1].end()
        );
    }
}

// ==================================================================================
// Splitting
// ==================================================================================

#[test]
fn inner_write_splits_into_three() {
    let out = one_pixel();
    assert!(out.write_dust(0, 0, 10.0, white(), 4.0, 10.0).unwrap());
    assert!(out.write_dust(0, 0, 11.0, white(), 1.0, 10.0).unwrap());

    let chain = out.dust_at(0, 0);
    assert_eq!(extents(&out), vec![(10.0, 11.0), (11.0, 12.0), (12.0, 14.0)]);
    assert_disjoint(&chain);

    // the middle carries both opacities
    assert_relative_eq!(chain[0].opacity(), 0.1, epsilon = 1e-12);
    assert_relative_eq!(chain[1].opacity(), 0.2, epsilon = 1e-12);
    assert_relative_eq!(chain[2].opacity(), 0.2, epsilon = 1e-12);
}

#[test]
fn engulfing_write_wraps_the_old_interval() {
    let out = one_pixel();
    out.write_dust(0, 0, 11.0, white(), 1.0, 10.0).unwrap();
    out.write_dust(0, 0, 10.0, white(), 4.0, 10.0).unwrap();

    assert_eq!(extents(&out), vec![(10.0, 11.0), (11.0, 12.0), (12.0, 14.0)]);
}

#[test]
fn near_overlap_pushes_old_back() {
    let out = one_pixel();
    out.write_dust(0, 0, 12.0, white(), 4.0, 10.0).unwrap();
    out.write_dust(0, 0, 10.0, white(), 4.0, 10.0).unwrap();

    assert_eq!(extents(&out), vec![(10.0, 12.0), (12.0, 14.0), (14.0, 16.0)]);
}

#[test]
fn blended_color_is_weighted_by_opacity() {
    let out = one_pixel();
    // red is three times as dense as white
    out.write_dust(0, 0, 10.0, red(), 2.0, 4.0).unwrap();
    out.write_dust(0, 0, 10.0, white(), 2.0, 12.0).unwrap();

    let chain = out.dust_at(0, 0);
    assert_eq!(chain.len(), 1);
    assert_relative_eq!(chain[0].opacity(), 0.5 + 1.0 / 6.0, epsilon = 1e-12);
    assert_abs_diff_eq!(chain[0].color, Color::new(255.0, 63.75, 63.75), epsilon = 1e-9);
}

#[test]
fn many_writes_never_overlap() {
    let out = one_pixel();
    for i in 0..300 {
        let i_f = i as f64;
        let z = 10.0 + (i_f * 0.77).sin() * 6.0;
        let range = 0.5 + (i_f * 0.31).cos().abs() * 4.0;
        out.write_dust(0, 0, z, white(), range, 2000.0).unwrap();
        assert_disjoint(&out.dust_at(0, 0));
    }
}

#[test]
fn accumulated_opacity_never_drops() {
    let out = one_pixel();
    let mut last = 0.0;
    for i in 0..200 {
        let i_f = i as f64;
        let z = 5.0 + (i_f * 1.37).sin() * 4.0;
        let range = 0.25 + (i_f * 0.53).cos().abs() * 3.0;
        out.write_dust(0, 0, z, white(), range, 400.0).unwrap();

        let now = out.dust_opacity(0, 0);
        assert!(now >= last - 1e-6, "opacity dropped from {} to {}", last, now);
        last = now;
    }
    assert!(last > 0.0);
}

// ==================================================================================
// Boundaries
// ==================================================================================

#[test]
fn touching_intervals_stay_separate() {
    let out = one_pixel();
    out.write_dust(0, 0, 10.0, white(), 2.0, 10.0).unwrap();
    out.write_dust(0, 0, 12.0, white(), 2.0, 10.0).unwrap();

    assert_eq!(extents(&out), vec![(10.0, 12.0), (12.0, 14.0)]);
}

#[test]
fn identical_intervals_collapse() {
    let out = one_pixel();
    out.write_dust(0, 0, 10.0, white(), 2.0, 10.0).unwrap();
    out.write_dust(0, 0, 10.0, white(), 2.0, 10.0).unwrap();

    let chain = out.dust_at(0, 0);
    assert_eq!(chain.len(), 1);
    assert_relative_eq!(chain[0].opacity(), 0.4, epsilon = 1e-12);
}

#[test]
fn shared_edges_leave_no_slivers() {
    let out = one_pixel();
    // same start, shorter
    out.write_dust(0, 0, 10.0, white(), 4.0, 10.0).unwrap();
    out.write_dust(0, 0, 10.0, white(), 2.0, 10.0).unwrap();
    // same end, later start
    out.write_dust(0, 0, 13.0, white(), 1.0, 10.0).unwrap();

    let chain = out.dust_at(0, 0);
    assert_eq!(extents(&out), vec![(10.0, 12.0), (12.0, 13.0), (13.0, 14.0)]);
    assert!(chain.iter().all(|d| d.range > 1e-6));
}

#[test]
fn tiny_writes_are_rejected() {
    let out = one_pixel();
    assert!(!out.write_dust(0, 0, 10.0, white(), 1e-9, 10.0).unwrap());
    assert!(!out.write_dust(0, 0, 10.0, white(), 1.0, 1e-6).unwrap());
    assert!(out.dust_at(0, 0).is_empty());
}

#[test]
fn dust_behind_the_camera_is_cut() {
    let out = one_pixel();
    assert!(!out.write_dust(0, 0, -5.0, white(), 2.0, 10.0).unwrap());
    assert!(out.write_dust(0, 0, -1.0, white(), 3.0, 10.0).unwrap());

    let chain = out.dust_at(0, 0);
    assert!(chain[0].z > 0.0);
    assert_relative_eq!(chain[0].end(), 2.0, epsilon = 1e-12);
}

// ==================================================================================
// Opaque layers
// ==================================================================================

#[test]
fn mass_must_be_strictly_nearer() {
    let out = one_pixel();
    assert!(out.write_mass(0, 0, 5.0, red()));
    assert!(!out.write_mass(0, 0, 5.0, white()));
    assert!(!out.write_mass(0, 0, 6.0, white()));
    assert!(out.write_mass(0, 0, 4.0, white()));
    assert_eq!(out.mass_depth(0, 0), Some(4.0));
}

#[test]
fn mass_hides_dust_behind_it() {
    let out = one_pixel();
    out.write_dust(0, 0, 10.0, white(), 4.0, 10.0).unwrap();
    out.write_dust(0, 0, 20.0, white(), 4.0, 10.0).unwrap();
    out.write_mass(0, 0, 12.0, red());

    assert_eq!(extents(&out), vec![(10.0, 12.0)]);

    // fully behind: rejected, partly behind: shortened
    assert!(!out.write_dust(0, 0, 13.0, white(), 1.0, 10.0).unwrap());
    assert!(out.write_dust(0, 0, 5.0, white(), 10.0, 20.0).unwrap());
    let chain = out.dust_at(0, 0);
    assert_disjoint(&chain);
    assert!(chain.iter().all(|d| d.end() <= 12.0));
}

#[test]
fn opaque_dust_hides_what_is_behind() {
    let out = one_pixel();
    out.write_dust(0, 0, 20.0, white(), 2.0, 10.0).unwrap();
    out.write_dust(0, 0, 10.0, red(), 2.0, 3.0).unwrap();
    out.write_dust(0, 0, 10.0, red(), 2.0, 3.0).unwrap();

    let chain = out.dust_at(0, 0);
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].opacity(), 1.0);
}

// ==================================================================================
// Resolving
// ==================================================================================

#[test]
fn resolve_blends_dust_over_mass() {
    let out = one_pixel();
    out.write_mass(0, 0, 20.0, red());
    out.write_dust(0, 0, 10.0, white(), 5.0, 10.0).unwrap();

    let c = out.resolve_pixel(0, 0);
    assert_abs_diff_eq!(c, Color::new(255.0, 127.5, 127.5), epsilon = 1e-9);
}

#[test]
fn resolve_drains_the_pixel() {
    let out = one_pixel();
    out.write_mass(0, 0, 20.0, red());
    out.write_dust(0, 0, 10.0, white(), 5.0, 10.0).unwrap();

    assert_ne!(out.resolve_pixel(0, 0), Color::zeros());
    assert_eq!(out.resolve_pixel(0, 0), Color::zeros());
    assert_eq!(out.mass_depth(0, 0), None);
    assert!(out.dust_at(0, 0).is_empty());
}

#[test]
fn cells_are_independent() {
    let out = DepthCompositor::new(3, 2, 0.0001).unwrap();
    out.write_mass(2, 1, 3.0, red());
    assert_eq!(out.mass_depth(2, 1), Some(3.0));
    assert_eq!(out.mass_depth(1, 1), None);
    assert!(out.contains(2, 1));
    assert!(!out.contains(3, 1));
    assert!(!out.contains(-1, 0));

    out.clear();
    assert_eq!(out.mass_depth(2, 1), None);
}
