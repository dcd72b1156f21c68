//! Property tests for histogram filling and arithmetic

use monox_hist::{Binning, Histogram, Ratio};
use proptest::prelude::*;

fn binning() -> Binning {
    Binning::new(vec![0.0, 1.0, 2.5, 4.0, 7.0, 10.0])
        .unwrap()
        .with_overflow()
}

fn observations() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-1.0f64..15.0, -2.0f64..5.0), 0..200)
}

fn filled(obs: &[(f64, f64)]) -> Histogram {
    let mut h = Histogram::new(binning());
    h.fill_all(obs.iter().copied());
    h
}

fn assert_close(a: &[f64], b: &[f64]) -> Result<(), TestCaseError> {
    prop_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        prop_assert!((x - y).abs() <= 1e-9 * (1.0 + x.abs().max(y.abs())), "{} vs {}", x, y);
    }
    Ok(())
}

// === Edge cases ===

#[test]
fn test_rejects_decreasing_edges() {
    assert!(Binning::new(vec![10.0, 5.0, 20.0]).is_err());
}

#[test]
fn test_ratio_of_self_with_empty_bins() {
    let binning = Binning::new(vec![0.0, 1.0, 2.0]).unwrap();
    let h = Histogram::from_parts(binning, vec![4.0, 0.0], vec![2.0, 0.0]).unwrap();
    let ratio = Ratio::new(&h, &h).unwrap();
    assert_eq!(ratio.content(0), 1.0);
    assert!((ratio.variance(0) - 2.0 * 2.0 / 16.0).abs() < 1e-12);
    assert_eq!(ratio.content(1), 0.0);
}

proptest! {
    #[test]
    fn test_fill_order_independent(obs in observations(), seed in any::<u64>()) {
        let forward = filled(&obs);

        let mut shuffled = obs.clone();
        // deterministic permutation driven by the seed
        let n = shuffled.len();
        if n > 1 {
            let mut state = seed;
            for i in (1..n).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }
        }
        let permuted = filled(&shuffled);

        assert_close(forward.contents(), permuted.contents())?;
        assert_close(forward.variances(), permuted.variances())?;
        prop_assert_eq!(forward.entries(), permuted.entries());
    }

    #[test]
    fn test_merge_matches_single_fill(obs in observations(), split in 0usize..200) {
        let split = split.min(obs.len());
        let (left, right) = obs.split_at(split);

        let mut merged = filled(left);
        merged.add(&filled(right)).unwrap();
        let whole = filled(&obs);

        assert_close(merged.contents(), whole.contents())?;
        assert_close(merged.variances(), whole.variances())?;
    }

    #[test]
    fn test_scale_linear(obs in observations(), k in -5.0f64..5.0) {
        let h = filled(&obs);
        let mut scaled = h.clone();
        scaled.scale(k);

        let expected: Vec<f64> = h.contents().iter().map(|c| c * k).collect();
        let expected_var: Vec<f64> = h.variances().iter().map(|v| v * k * k).collect();
        assert_close(scaled.contents(), &expected)?;
        assert_close(scaled.variances(), &expected_var)?;
    }

    #[test]
    fn test_ratio_of_self(contents in prop::collection::vec(0.5f64..100.0, 6)) {
        let variances: Vec<f64> = contents.iter().map(|c| c * 0.5).collect();
        let h = Histogram::from_parts(binning(), contents.clone(), variances.clone()).unwrap();
        let ratio = Ratio::new(&h, &h).unwrap();

        for i in 0..h.n_bins() {
            prop_assert!((ratio.content(i) - 1.0).abs() < 1e-12);
            let expected = 2.0 * variances[i] / (contents[i] * contents[i]);
            prop_assert!((ratio.variance(i) - expected).abs() <= 1e-9 * expected.max(1.0));
        }
    }

    #[test]
    fn test_clamp_never_touches_variance(obs in observations()) {
        let mut h = filled(&obs);
        let before = h.variances().to_vec();
        h.clamp_non_negative();
        prop_assert!(h.contents().iter().all(|c| *c >= 0.0));
        prop_assert_eq!(h.variances(), before.as_slice());
    }
}
