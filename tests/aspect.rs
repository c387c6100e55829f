use ripple_wasm::pattern::effect_space;

/// Pixel position of a point given in the canonical square, where the
/// shorter side of the surface spans [-1, 1].
fn pixel_from_square(q: (f32, f32), res: (f32, f32)) -> [f32; 2] {
    let short = res.0.min(res.1);
    [(q.0 * short + res.0) / 2.0, (q.1 * short + res.1) / 2.0]
}

fn approx_eq2(a: [f32; 2], b: [f32; 2], eps: f32) -> bool {
    (a[0] - b[0]).abs() < eps && (a[1] - b[1]).abs() < eps
}

#[test]
fn aspect_invariant_square_mapping() {
    // Two different aspect ratios
    let res1 = (1920.0, 1080.0); // wide
    let res2 = (1080.0, 1920.0); // tall
    let scale = 1.0;
    let rot = 135f32.to_radians();

    let samples = [(0.0, 0.0), (0.2, 0.0), (0.0, 0.2), (-0.6, 0.6), (0.6, -0.6)];

    for &q in &samples {
        let p1 = effect_space(pixel_from_square(q, res1), [res1.0, res1.1], scale, rot);
        let p2 = effect_space(pixel_from_square(q, res2), [res2.0, res2.1], scale, rot);
        assert!(approx_eq2(p1, p2, 1e-4), "p1={:?} p2={:?}", p1, p2);
    }
}

#[test]
fn rings_stay_round_on_wide_surfaces() {
    let res = [800.0, 300.0];
    let center = [400.0, 150.0];
    let radius = |p: [f32; 2]| (p[0] * p[0] + p[1] * p[1]).sqrt();

    let across = effect_space([center[0] + 90.0, center[1]], res, 1.0, 0.4);
    let up = effect_space([center[0], center[1] + 90.0], res, 1.0, 0.4);
    assert!((radius(across) - radius(up)).abs() < 1e-5);
    assert!((radius(across) - 0.6).abs() < 1e-5);
}

#[test]
fn scale_shrinks_the_pattern_space() {
    let res = [400.0, 400.0];
    let p1 = effect_space([300.0, 200.0], res, 1.0, 0.0);
    let p2 = effect_space([300.0, 200.0], res, 2.0, 0.0);
    assert!(approx_eq2(p1, [0.5, 0.0], 1e-6));
    assert!(approx_eq2(p2, [0.25, 0.0], 1e-6));
}
