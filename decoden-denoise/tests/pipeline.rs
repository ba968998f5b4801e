use decoden_core::DecodenError;
use decoden_denoise::{run_hsr, ChunkProjector, Decoden, DenoiseConfig, MixingMatrix};
use decoden_omics::{BinMask, BinMatrix, ConditionLayout, GenomicInterval};

const CONTROL: [f64; 3] = [1.0, 1.3, 0.8];
const A_BACKGROUND: [f64; 2] = [1.1, 0.9];
const A_SPECIFIC: [f64; 2] = [1.0, 1.5];
const B_BACKGROUND: [f64; 3] = [1.2, 1.0, 0.7];
const B_SPECIFIC: [f64; 3] = [1.0, 0.6, 1.4];

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    sxy / (sxx * syy).sqrt()
}

struct Planted {
    coverage: BinMatrix,
    layout: ConditionLayout,
    specific_a: Vec<f64>,
    specific_b: Vec<f64>,
}

/// Noiseless experiment: 3 control replicates, condition A with 2 and
/// condition B with 3 replicates. The background varies mildly across bins;
/// each specific signal is a sparse set of peaks.
fn planted(n_bins: usize) -> Planted {
    let background: Vec<f64> = random_f64(n_bins, 7).iter().map(|u| 4.0 + 2.0 * u).collect();
    let specific_a: Vec<f64> = (0..n_bins).map(|i| if i % 100 == 3 { 10.0 } else { 0.0 }).collect();
    let specific_b: Vec<f64> = (0..n_bins).map(|i| if i % 100 == 57 { 10.0 } else { 0.0 }).collect();

    let rows: Vec<Vec<f64>> = (0..n_bins)
        .map(|i| {
            let b = background[i];
            let mut row: Vec<f64> = CONTROL.iter().map(|c| b * c).collect();
            row.extend((0..2).map(|j| b * A_BACKGROUND[j] + specific_a[i] * A_SPECIFIC[j]));
            row.extend((0..3).map(|j| b * B_BACKGROUND[j] + specific_b[i] * B_SPECIFIC[j]));
            row
        })
        .collect();

    let names: Vec<String> = [
        "control_1", "control_2", "control_3", "H3K4me3_1", "H3K4me3_2", "H3K27ac_1", "H3K27ac_2",
        "H3K27ac_3",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let bins = GenomicInterval::tiles("chr1", 0, 200 * n_bins as u64, 200);
    let coverage = BinMatrix::from_rows(bins, names.clone(), rows).unwrap();
    let layout = ConditionLayout::from_sample_names(
        names,
        vec!["control".into(), "H3K4me3".into(), "H3K27ac".into()],
    )
    .unwrap();

    Planted {
        coverage,
        layout,
        specific_a,
        specific_b,
    }
}

fn config() -> DenoiseConfig {
    // Ratio tolerances below hold for weak regularization only; the default
    // penalties shrink the specific coefficients of H3K27ac by up to a third.
    DenoiseConfig {
        alpha_w: 1e-4,
        alpha_h: 1e-4,
        n_train_bins: 5_000,
        chunk_size: 2_500,
        ..DenoiseConfig::default()
    }
}

fn assert_ratios(label: &str, got: &[f64], planted: &[f64], tol: f64) {
    for (j, (g, p)) in got.iter().zip(planted).enumerate() {
        let got_ratio = g / got[0];
        let planted_ratio = p / planted[0];
        assert!(
            (got_ratio - planted_ratio).abs() / planted_ratio < tol,
            "{label}[{j}]: ratio {got_ratio:.4} vs planted {planted_ratio:.4}"
        );
    }
}

#[test]
fn end_to_end_recovers_planted_components() {
    let exp = planted(10_000);
    let engine = Decoden::new(config()).unwrap();
    let mask = BinMask::all_usable(10_000);
    let out = engine
        .run_consolidated(&exp.coverage, &exp.layout, &mask)
        .unwrap();

    // Shapes
    assert_eq!(out.mixing.shape(), (3, 8));
    assert_eq!(out.signal.shape(), (10_000, 3));
    assert_eq!(out.hsr.shape(), (10_000, 4));
    assert_eq!(
        out.mixing.row_labels(),
        &["background".to_string(), "H3K4me3".into(), "H3K27ac".into()]
    );
    assert_eq!(
        out.signal.column_names(),
        &["control".to_string(), "H3K4me3".into(), "H3K27ac".into()]
    );

    // Non-negativity
    assert!(out.mixing.as_slice().iter().all(|&v| v >= 0.0));
    assert!(out.signal.is_non_negative());
    assert!(out.hsr.is_non_negative());

    // Specific rows are supported exactly on their own condition
    let row_a = out.mixing.row(1).unwrap();
    let row_b = out.mixing.row(2).unwrap();
    assert!(row_a[..3].iter().chain(&row_a[5..]).all(|&v| v == 0.0));
    assert!(row_b[..5].iter().all(|&v| v == 0.0));

    // Mixing coefficients, up to the scale shared by each row
    let planted_background: Vec<f64> = CONTROL
        .iter()
        .chain(&A_BACKGROUND)
        .chain(&B_BACKGROUND)
        .copied()
        .collect();
    assert_ratios("background", out.mixing.background(), &planted_background, 0.10);
    assert_ratios("H3K4me3", &row_a[3..5], &A_SPECIFIC, 0.10);
    assert_ratios("H3K27ac", &row_b[5..8], &B_SPECIFIC, 0.10);

    // Normalized tracks follow the planted specific signals
    let track_a = out.hsr.column_by_name("H3K4me3 HSR Value").unwrap();
    let track_b = out.hsr.column_by_name("H3K27ac HSR Value").unwrap();
    let r_a = pearson(&track_a, &exp.specific_a);
    let r_b = pearson(&track_b, &exp.specific_b);
    assert!(r_a > 0.9, "H3K4me3 r = {r_a}");
    assert!(r_b > 0.9, "H3K27ac r = {r_b}");
}

#[test]
fn replicate_run_tracks_each_replicate() {
    let exp = planted(3_000);
    let engine = Decoden::new(DenoiseConfig {
        n_train_bins: 1_500,
        ..config()
    })
    .unwrap();
    let out = engine
        .run_replicates(&exp.coverage, &exp.layout, &BinMask::all_usable(3_000))
        .unwrap();
    assert_eq!(out.hsr.shape(), (3_000, 10));
    assert_eq!(out.fits.len(), 5);
    assert!(out.hsr.is_non_negative());

    // Peaks of the replicate's own condition stand out of its track
    let track = out.hsr.column_by_name("H3K4me3_2 HSR Value").unwrap();
    let (mut peak_sum, mut peak_n, mut rest_sum, mut rest_n) = (0.0, 0, 0.0, 0);
    for (v, s) in track.iter().zip(&exp.specific_a) {
        if *s > 0.0 {
            peak_sum += v;
            peak_n += 1;
        } else {
            rest_sum += v;
            rest_n += 1;
        }
    }
    let peak_mean = peak_sum / peak_n as f64;
    let rest_mean = rest_sum / rest_n as f64;
    assert!(peak_mean > 10.0 * rest_mean, "peaks {peak_mean} vs rest {rest_mean}");
}

#[test]
fn runs_are_deterministic() {
    let exp = planted(2_000);
    let engine = Decoden::new(DenoiseConfig {
        n_train_bins: 1_000,
        chunk_size: 700,
        ..config()
    })
    .unwrap();
    let mask = BinMask::all_usable(2_000);
    let first = engine.run_consolidated(&exp.coverage, &exp.layout, &mask).unwrap();
    let second = engine.run_consolidated(&exp.coverage, &exp.layout, &mask).unwrap();
    assert_eq!(first.mixing, second.mixing);
    assert_eq!(first.signal, second.signal);
    assert_eq!(first.hsr, second.hsr);
}

#[test]
fn projection_is_chunk_invariant() {
    let exp = planted(1_000);
    let engine = Decoden::new(DenoiseConfig {
        n_train_bins: 800,
        ..config()
    })
    .unwrap();
    let (mixing, _) = engine
        .extract_mixing_matrix(&exp.coverage, &exp.layout)
        .unwrap();

    // A fixed iteration budget makes every bin follow the same trajectory
    let fixed_budget = |chunk_size| DenoiseConfig {
        chunk_size,
        tol: 0.0,
        projection_max_iter: 150,
        ..config()
    };
    let whole = ChunkProjector::new(&exp.coverage, &mixing, &exp.layout, &fixed_budget(1_000))
        .unwrap()
        .project()
        .unwrap();
    let pieces = ChunkProjector::new(&exp.coverage, &mixing, &exp.layout, &fixed_budget(77))
        .unwrap()
        .project()
        .unwrap();

    assert_eq!(whole.chunks.len(), 1);
    assert_eq!(pieces.chunks.len(), 13);
    assert_eq!(whole.signal.bins(), pieces.signal.bins());
    for (a, b) in whole.signal.as_slice().iter().zip(pieces.signal.as_slice()) {
        assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0), "{a} vs {b}");
    }
}

#[test]
fn masked_bins_never_move_the_fit() {
    let exp = planted(2_000);
    let engine = Decoden::new(DenoiseConfig {
        n_train_bins: 1_000,
        min_fit_bins: 10,
        ..config()
    })
    .unwrap();
    let (mixing, _) = engine
        .extract_mixing_matrix(&exp.coverage, &exp.layout)
        .unwrap();
    let (mut signal, _) = engine
        .extract_signal(&exp.coverage, &mixing, &exp.layout)
        .unwrap();

    let flags: Vec<bool> = (0..2_000).map(|i| i % 5 != 0).collect();
    let mask = BinMask::from_flags(flags);
    let before = run_hsr(&signal, &mask, &exp.layout, engine.config()).unwrap();

    for i in (0..2_000).step_by(5) {
        signal.set(i, 0, 1e3 * (i % 13) as f64).unwrap();
        signal.set(i, 1, 0.0).unwrap();
        signal.set(i, 2, 5e4).unwrap();
    }
    let after = run_hsr(&signal, &mask, &exp.layout, engine.config()).unwrap();

    for ((label, fit_before), (_, fit_after)) in before.fits.iter().zip(&after.fits) {
        assert_eq!(fit_before, fit_after, "{label}");
    }
}

#[test]
fn mismatched_layout_fails_before_fitting() {
    let exp = planted(500);
    let engine = Decoden::new(config()).unwrap();
    let shuffled = exp.coverage.select_columns(&[3, 0, 1, 2, 4, 5, 6, 7]).unwrap();
    let err = engine
        .run_consolidated(&shuffled, &exp.layout, &BinMask::all_usable(500))
        .unwrap_err();
    assert!(matches!(err, DecodenError::ShapeMismatch(_)));
}

#[test]
fn mixing_matrix_round_trips_through_projector_checks() {
    let exp = planted(300);
    let foreign = MixingMatrix::new(
        vec!["background".into(), "H3K4me3".into(), "H3K27ac".into()],
        (1..=8).map(|k| format!("s_{k}")).collect(),
        vec![1.0; 24],
    )
    .unwrap();
    assert!(ChunkProjector::new(&exp.coverage, &foreign, &exp.layout, &config()).is_err());
}
