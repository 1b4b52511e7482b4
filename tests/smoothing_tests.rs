//! Tests for the smoothing orchestrator and channel filters


use motion_retarget::{
    config::SmoothingConfig,
    filters::{kalman::KalmanFilter, savgol::SavitzkyGolayFilter, ChannelFilter, Sample, SmoothingMethod},
    landmark::{Axis, Joint},
    smoothing::PoseSmoother,
    Error,
};
use nalgebra::Vector3;
use test_helpers::{build_sequence, noisy_sequence, t_pose};

fn smoother(method: SmoothingMethod) -> PoseSmoother {
    PoseSmoother::new(SmoothingConfig {
        method,
        ..SmoothingConfig::default()
    })
    .unwrap()
}

#[test]
fn test_shape_invariance() {
    let input = noisy_sequence(60, 0.02, 0.1, 7);

    for method in [SmoothingMethod::None, SmoothingMethod::Kalman, SmoothingMethod::Combined] {
        let output = smoother(method).smooth(&input).unwrap().sequence;
        assert_eq!(output.frame_count(), input.frame_count(), "{method}");
        assert_eq!(output.positions().len(), input.positions().len(), "{method}");
        assert_eq!(output.visibilities().len(), input.visibilities().len(), "{method}");

        for (a, b) in output.frames().zip(input.frames()) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.landmarks.len(), Joint::COUNT);
            let joints: Vec<Joint> = a.landmarks.iter().map(|lm| lm.joint).collect();
            assert_eq!(joints, Joint::ALL);
        }
    }
}

#[test]
fn test_input_not_mutated() {
    let input = noisy_sequence(20, 0.05, 0.0, 3);
    let copy = input.clone();
    let _ = smoother(SmoothingMethod::Combined).smooth(&input).unwrap();
    assert_eq!(input, copy);
}

#[test]
fn test_combined_reduces_noise() {
    let input = noisy_sequence(120, 0.05, 0.0, 11);
    let output = smoother(SmoothingMethod::Combined).smooth(&input).unwrap().sequence;

    let error = |channel: &[f64], truth: f64| channel.iter().map(|v| (v - truth).powi(2)).sum::<f64>();
    let truth = t_pose(Joint::LeftWrist).x;
    let before = error(input.channel(Joint::LeftWrist, Axis::X), truth);
    let after = error(output.channel(Joint::LeftWrist, Axis::X), truth);
    assert!(after < before * 0.5, "before {before}, after {after}");
}

#[test]
fn test_savgol_idempotent_on_polynomial() {
    let filter = SavitzkyGolayFilter::new(7, 3, 0.5).unwrap();
    let signal: Vec<f64> = (0..40)
        .map(|i| {
            let t = i as f64 * 0.1;
            0.5 - 1.2 * t + 0.3 * t * t - 0.02 * t * t * t
        })
        .collect();

    let once = filter.smooth(&signal).unwrap();
    let twice = filter.smooth(&once).unwrap();
    for ((raw, a), b) in signal.iter().zip(&once).zip(&twice) {
        assert!((raw - a).abs() < 1e-9);
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_savgol_mode_idempotent_on_sequence() {
    let input = build_sequence(25, |f, joint| {
        let t = f as f64 / 10.0;
        (t_pose(joint) + Vector3::new(t * t, -t, 0.5 * t), 0.9)
    });
    let smoother = smoother(SmoothingMethod::Savgol);

    let once = smoother.smooth(&input).unwrap().sequence;
    let twice = smoother.smooth(&once).unwrap().sequence;
    for (a, b) in once.positions().iter().zip(twice.positions()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_kalman_continuity_across_single_gap() {
    let value = 2.5;
    let mut samples = vec![Sample::new(value, 0.9); 30];
    samples[15] = Sample::new(-100.0, 0.0);

    let output = KalmanFilter::default().apply(&samples).unwrap();
    assert_eq!(output.values.len(), 30);
    assert!((output.values[15] - value).abs() < 1e-9);
    assert!(!output.unreliable[15]);
}

#[test]
fn test_kalman_mode_all_missing_joint() {
    let input = build_sequence(10, |_, joint| (t_pose(joint), if joint == Joint::LeftHeel { 0.0 } else { 0.9 }));
    let output = smoother(SmoothingMethod::Kalman).smooth(&input).unwrap();

    assert!(output.sequence.visibility_channel(Joint::LeftHeel).iter().all(|&v| v == 0.0));
    assert_eq!(output.warnings.len(), 3);
    // Held at the initial value
    let x = output.sequence.channel(Joint::LeftHeel, Axis::X);
    assert!(x.iter().all(|&v| v == t_pose(Joint::LeftHeel).x));
}

#[test]
fn test_passthrough_mode_flags_unobserved_joint() {
    let input = build_sequence(10, |_, joint| (t_pose(joint), if joint == Joint::LeftHeel { 0.3 } else { 0.9 }));
    let output = smoother(SmoothingMethod::None).smooth(&input).unwrap();

    assert!(output.sequence.visibility_channel(Joint::LeftHeel).iter().all(|&v| v == 0.0));
    assert!(output.sequence.visibility_channel(Joint::LeftKnee).iter().all(|&v| v == 0.9));
    assert_eq!(output.warnings.len(), 3);
    assert_eq!(output.sequence.positions(), input.positions());
}

#[test]
fn test_long_gap_marked_unreliable() {
    let input = build_sequence(40, |f, joint| {
        let visibility = if joint == Joint::RightKnee && (10..25).contains(&f) { 0.0 } else { 0.9 };
        (t_pose(joint), visibility)
    });
    let config = SmoothingConfig {
        max_gap: 5,
        ..SmoothingConfig::default()
    };
    let output = PoseSmoother::new(config).unwrap().smooth(&input).unwrap();

    let visibility = output.sequence.visibility_channel(Joint::RightKnee);
    assert!(visibility[10..25].iter().all(|&v| v == 0.0));
    assert!(visibility[..10].iter().chain(&visibility[25..]).all(|&v| v == 0.9));
    assert!(output.warnings.is_empty());
}

#[test]
fn test_savgol_mode_requires_dense_channels() {
    let input = noisy_sequence(30, 0.01, 0.2, 5);
    assert!(matches!(smoother(SmoothingMethod::Savgol).smooth(&input), Err(Error::DataGap(_))));
}
