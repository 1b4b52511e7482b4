//! Tests for the retargeting engine


use motion_retarget::{
    config::{GroundContactConfig, RetargetConfig},
    landmark::Joint,
    retarget::{shortest_arc, Retargeter},
    rig::{RestBone, RigFamily, RigProfile, RigProfileTable},
};
use nalgebra::Vector3;
use test_helpers::{build_sequence, t_pose, t_pose_sequence};

fn mixamo() -> RigProfile {
    RigProfileTable::with_builtin().get(RigFamily::Mixamo).cloned().unwrap()
}

fn with_ground(enabled: bool) -> RetargetConfig {
    RetargetConfig {
        ground_contact: GroundContactConfig {
            enabled,
            plane_height: 0.0,
            bones: Vec::new(),
        },
        ..RetargetConfig::default()
    }
}

/// Feet sunk 5 units below the plane in rig space, with some sway
fn sunken_sequence() -> motion_retarget::sequence::PoseSequence {
    build_sequence(12, |f, joint| {
        let sway = Vector3::new(0.0, 0.1 * (f as f64 * 0.5).sin(), 0.0);
        let p = match joint {
            Joint::LeftAnkle | Joint::RightAnkle | Joint::LeftFootIndex | Joint::RightFootIndex => {
                Vector3::new(t_pose(joint).x, 5.0, t_pose(joint).z) + sway
            }
            _ => t_pose(joint) + sway,
        };
        (p, 0.9)
    })
}

#[test]
fn test_ground_contact_lifts_whole_frame() {
    let sequence = sunken_sequence();
    let profile = mixamo();

    let plain = Retargeter::new(&profile, with_ground(false)).unwrap().retarget(&sequence).animation;
    let grounded = Retargeter::new(&profile, with_ground(true)).unwrap().retarget(&sequence).animation;

    let lowest_foot = grounded
        .frames
        .iter()
        .flat_map(|frame| ["LeftFoot", "RightFoot"].map(|bone| frame.bones[bone].lowest_point()))
        .fold(f64::INFINITY, f64::min);
    assert!(lowest_foot >= -1e-9, "lowest foot {lowest_foot}");

    for (before, after) in plain.frames.iter().zip(&grounded.frames) {
        let shift = after.bones["Hips"].translation - before.bones["Hips"].translation;
        let penetration = -before.bones["LeftFoot"].lowest_point().min(before.bones["RightFoot"].lowest_point());
        assert!((shift - Vector3::new(0.0, penetration, 0.0)).norm() < 1e-9);

        // Only the root moves
        for (bone, key) in &before.bones {
            if bone == "Hips" {
                continue;
            }
            let other = after.bones[bone];
            assert_eq!(key.rotation, other.rotation, "{bone}");
            assert_eq!(key.translation, other.translation, "{bone}");
            assert_eq!(key.scale, other.scale, "{bone}");
        }
    }
}

#[test]
fn test_ground_contact_custom_bones() {
    let sequence = sunken_sequence();
    let config = RetargetConfig {
        ground_contact: GroundContactConfig {
            enabled: true,
            plane_height: 1.0,
            bones: vec!["LeftFoot".to_string()],
        },
        ..RetargetConfig::default()
    };
    let animation = Retargeter::new(&mixamo(), config).unwrap().retarget(&sequence).animation;
    for frame in &animation.frames {
        assert!(frame.bones["LeftFoot"].lowest_point() >= 1.0 - 1e-9);
    }
}

#[test]
fn test_rotation_tracks_raised_arm() {
    let sequence = build_sequence(3, |f, joint| {
        let p = match (f, joint) {
            // Forearm pointing straight up from the elbow on the last frame
            (2, Joint::LeftWrist) => t_pose(Joint::LeftElbow) + Vector3::new(0.0, -0.26, 0.0),
            _ => t_pose(joint),
        };
        (p, 0.9)
    });

    let animation = Retargeter::new(&mixamo(), RetargetConfig::default()).unwrap().retarget(&sequence).animation;
    let forearm = animation.frames[2].bones["LeftForeArm"];
    let rest = RestBone::t_pose(Joint::LeftElbow).direction;

    assert!((forearm.rotation * rest - Vector3::y()).norm() < 1e-9);
    assert!((forearm.rotation.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    assert!(animation.frames[1].bones["LeftForeArm"].rotation.angle() < 1e-9);
}

#[test]
fn test_custom_rest_pose_used() {
    let profile = RigProfile::builder("a-pose", RigFamily::Custom)
        .map(Joint::LeftShoulder, "upper_arm")
        .rest_bone(Joint::LeftShoulder, RestBone::new(Vector3::new(1.0, -1.0, 0.0), 0.28))
        .build()
        .unwrap();

    let animation = Retargeter::new(&profile, RetargetConfig::default())
        .unwrap()
        .retarget(&t_pose_sequence(1))
        .animation;
    let expected = shortest_arc(&Vector3::new(1.0, -1.0, 0.0).normalize(), &Vector3::x());
    assert!(animation.frames[0].bones["upper_arm"].rotation.angle_to(&expected) < 1e-6);
}

#[test]
fn test_low_visibility_holds_previous_rotation() {
    let sequence = build_sequence(4, |f, joint| {
        let p = match (f, joint) {
            (_, Joint::RightWrist) if f >= 1 => t_pose(Joint::RightElbow) + Vector3::new(0.0, 0.26, 0.0),
            _ => t_pose(joint),
        };
        let visibility = if f >= 2 && joint == Joint::RightWrist { 0.2 } else { 0.9 };
        (p, visibility)
    });
    let config = RetargetConfig {
        min_visibility: 0.5,
        ..RetargetConfig::default()
    };

    let animation = Retargeter::new(&mixamo(), config).unwrap().retarget(&sequence).animation;
    let track: Vec<_> = animation.track("RightForeArm").map(|(_, key)| *key).collect();
    assert_eq!(track.len(), 4);
    assert!(track[1].rotation.angle() > 1.0);
    assert_eq!(track[2].rotation, track[1].rotation);
    assert_eq!(track[3].rotation, track[1].rotation);
    assert_eq!(track[3].visibility, 0.2);
}

#[test]
fn test_frame_order_and_timestamps() {
    let sequence = t_pose_sequence(5);
    let animation = Retargeter::new(&mixamo(), RetargetConfig::default()).unwrap().retarget(&sequence).animation;

    assert_eq!(animation.frame_rate, 30.0);
    for (i, frame) in animation.frames.iter().enumerate() {
        assert_eq!(frame.frame_index, i);
        assert!((frame.timestamp - i as f64 / 30.0).abs() < 1e-12);
    }
}
