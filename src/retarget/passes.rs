//! Whole-animation correction passes run after the per-bone scans

use super::transform::BoneTransform;
use log::debug;

/// Solved keys of one bone, one per input frame
pub(crate) type Track = Vec<BoneTransform>;

/// Raise the root so no visible contact bone sinks below the ground plane.
///
/// The shift is applied per frame to the root translation only, so the
/// whole pose moves together. Every bone's `lowest_point` is raised by the
/// same amount to keep later passes consistent. Returns the number of frames
/// that were corrected.
pub(crate) fn apply_ground_contact(
    root: &mut Track,
    others: &mut [&mut Track],
    contacts: &[usize],
    plane_height: f64,
    min_visibility: f64,
) -> usize {
    let frame_count = root.len();
    let mut corrected = 0;

    for f in 0..frame_count {
        let mut lowest = f64::INFINITY;
        for &c in contacts {
            let key = &others[c][f];
            if key.visibility > min_visibility {
                lowest = lowest.min(key.lowest_point);
            }
        }

        if !lowest.is_finite() || lowest >= plane_height {
            continue;
        }

        let penetration = plane_height - lowest;
        root[f].translation.y += penetration;
        root[f].lowest_point += penetration;
        for track in others.iter_mut() {
            track[f].lowest_point += penetration;
        }
        corrected += 1;
    }

    debug!("Ground contact corrected {corrected} of {frame_count} frames");
    corrected
}

/// Drop keys that differ from the last retained key by less than `tolerance`.
///
/// The first key is always kept.
pub(crate) fn reduce_keyframes(track: &[BoneTransform], tolerance: f64) -> Vec<Option<BoneTransform>> {
    let mut last: Option<&BoneTransform> = None;

    track
        .iter()
        .map(|key| match last {
            Some(retained) if key.approx_eq(retained, tolerance) => None,
            _ => {
                last = Some(key);
                Some(*key)
            }
        })
        .collect()
}
