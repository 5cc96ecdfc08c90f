//! Least-squares behaviour on perturbed disparity/inverse-depth samples.

use depthcal_core::Real;
use depthcal_linear::fit_affine;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[test]
fn zero_mean_noise_stays_close_to_truth() {
    let mut rng = StdRng::seed_from_u64(21);
    let (scale, shift) = (1.8, 0.05);
    let pairs: Vec<(Real, Real)> = (0..500)
        .map(|_| {
            let x: Real = rng.random_range(0.0..1.0);
            let noise: Real = rng.random_range(-0.01..0.01);
            (x, scale * x + shift + noise)
        })
        .collect();

    let m = fit_affine(pairs.iter().copied()).expect("well conditioned");
    assert!((m.scale - scale).abs() < 0.01, "{m:?}");
    assert!((m.shift - shift).abs() < 0.01, "{m:?}");

    let rms = (pairs
        .iter()
        .map(|(x, y)| m.squared_residual(*x, *y))
        .sum::<Real>()
        / pairs.len() as Real)
        .sqrt();
    assert!(rms < 0.01);
}

#[test]
fn least_squares_beats_any_perturbed_model() {
    let pairs = [(0.1, 0.3), (0.4, 0.8), (0.5, 1.2), (0.9, 1.7)];
    let m = fit_affine(pairs).expect("fit");
    let cost = |s: Real, b: Real| -> Real {
        pairs
            .iter()
            .map(|(x, y)| (s * x + b - y).powi(2))
            .sum()
    };
    let best = cost(m.scale, m.shift);
    for (ds, db) in [(0.01, 0.0), (-0.01, 0.0), (0.0, 0.01), (0.0, -0.01)] {
        assert!(best <= cost(m.scale + ds, m.shift + db));
    }
}
