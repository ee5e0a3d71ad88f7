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

//! # Cairn Lanes
//!
//! The stages of a simulation step. The broad phase and island partitioning run
//! on the control thread; each resulting [`physics_lane::IslandTask`] is a
//! self-contained unit of narrow-phase, solve and integration work that a
//! worker thread can execute without touching the scene.

#![warn(missing_docs)]

pub mod physics_lane;

pub use physics_lane::{
    BodyUpdate, BroadphaseLane, CollisionPair, ContactCache, Island, IslandBody, IslandLane,
    IslandOutcome, IslandTask, ManifoldKey, SleepSettings, StepSettings,
};
