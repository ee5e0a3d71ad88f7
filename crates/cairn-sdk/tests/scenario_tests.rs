// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for the stacked-box scenario.

use std::sync::Arc;

use approx::assert_relative_eq;
use cairn_sdk::{
    stack_offsets, throw_projectile, ErrorKind, PhysicsConfig, PhysicsContext, ScenarioBuilder,
    Vec3,
};

const DT: f32 = 1.0 / 60.0;

fn offline() -> PhysicsConfig {
    let mut config = PhysicsConfig::default();
    config.telemetry.enabled = false;
    config
}

#[test]
fn baseline_body_counts() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let scenario = ScenarioBuilder::baseline().build(context.scene_mut()).unwrap();
    let scene = context.scene();

    assert_eq!(scene.dynamic_count(), 5 * 10 * 11 / 2 + 1);
    assert_eq!(scene.static_count(), 1);
    assert_eq!(scene.body_count(), 277);
    assert_eq!(scenario.stacks.len(), 5);
    assert!(scenario.stacks.iter().all(|s| s.len() == 55));
    assert!(scenario.projectile.is_some());
}

#[test]
fn interactive_world_has_no_projectile() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let scenario = ScenarioBuilder::interactive().build(context.scene_mut()).unwrap();
    assert!(scenario.projectile.is_none());
    assert_eq!(context.scene().dynamic_count(), 275);
    assert_eq!(context.scene().body_count(), 276);

    let thrown = throw_projectile(context.scene_mut(), Arc::clone(&scenario.material)).unwrap();
    let body = context.scene().body(thrown).unwrap();
    assert_eq!(body.pose().position, Vec3::new(0.0, 20.0, 60.0));
    assert!(body.linear_velocity().z < 0.0);
    assert_eq!(context.scene().dynamic_count(), 276);
}

#[test]
fn stacks_follow_the_placement_formula() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let scenario = ScenarioBuilder::interactive().build(context.scene_mut()).unwrap();
    let scene = context.scene();
    let offsets = stack_offsets(10, 2.0);

    for (k, stack) in scenario.stacks.iter().enumerate() {
        let z = -10.0 * k as f32;
        for (handle, offset) in stack.iter().zip(&offsets) {
            let position = scene.pose(*handle).unwrap().position;
            assert_relative_eq!(position.x, offset.x);
            assert_relative_eq!(position.y, offset.y);
            assert_relative_eq!(position.z, z);
        }
    }

    let first = scene.body(scenario.stacks[0][0]).unwrap();
    assert_relative_eq!(first.mass(), 10.0, max_relative = 1e-5);
    assert_eq!(first.pose().position, Vec3::new(-18.0, 2.0, 0.0));
}

#[test]
fn boxes_share_one_shape() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let scenario = ScenarioBuilder::interactive().build(context.scene_mut()).unwrap();
    let scene = context.scene();
    let first = &scene.body(scenario.stacks[0][0]).unwrap().shapes()[0];
    for stack in &scenario.stacks {
        for handle in stack {
            let shape = &scene.body(*handle).unwrap().shapes()[0];
            assert!(Arc::ptr_eq(first, shape));
        }
    }
}

#[test]
fn invalid_material_fails_the_build() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let builder = ScenarioBuilder {
        material: (0.5, 0.5, 1.5),
        ..ScenarioBuilder::baseline()
    };
    let err = builder.build(context.scene_mut()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn zero_extent_boxes_are_invalid_geometry() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let builder = ScenarioBuilder {
        half_extent: 0.0,
        ..ScenarioBuilder::baseline()
    };
    let err = builder.build(context.scene_mut()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidGeometry);
}

#[test]
fn batch_run_of_2500_frames() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let scenario = ScenarioBuilder::baseline().build(context.scene_mut()).unwrap();
    let scene = context.scene_mut();
    let ground_pose = scene.pose(scenario.ground).unwrap();

    for frame in 0..2500 {
        scene
            .simulate(DT)
            .unwrap_or_else(|e| panic!("simulate failed at frame {frame}: {e}"));
        assert!(scene.fetch_results(true).unwrap());
    }

    assert_eq!(scene.step_count(), 2500);
    assert_eq!(scene.pose(scenario.ground).unwrap(), ground_pose);
    for (_, body) in scene.bodies() {
        assert!(body.pose().is_finite());
        assert!(body.linear_velocity().is_finite());
    }
    assert_eq!(scene.stats().steps(), 2500);
    context.shutdown();
}

#[test]
fn ten_row_stack_stays_standing() {
    let mut context = PhysicsContext::new(offline()).unwrap();
    let builder = ScenarioBuilder {
        stack_count: 1,
        projectile: false,
        ..ScenarioBuilder::baseline()
    };
    assert_eq!(builder.stack_size, 10);
    let scenario = builder.build(context.scene_mut()).unwrap();
    let scene = context.scene_mut();

    for frame in 0..600 {
        scene
            .step(DT)
            .unwrap_or_else(|e| panic!("step failed at frame {frame}: {e}"));
    }

    let offsets = stack_offsets(10, 2.0);
    for (index, (handle, offset)) in scenario.stacks[0].iter().zip(&offsets).enumerate() {
        let position = scene.pose(*handle).unwrap().position;
        let drift = Vec3::new(position.x - offset.x, 0.0, position.z).length();
        let sag = offset.y - position.y;
        assert!(drift < 0.1, "box {index} drifted {drift} sideways");
        assert!(sag.abs() < 0.3, "box {index} moved {sag} vertically");
    }
    context.shutdown();
}
