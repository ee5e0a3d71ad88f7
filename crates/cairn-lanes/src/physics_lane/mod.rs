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

//! Lanes of the rigid-body step.

mod broadphase_lane;
mod contact_cache;
mod island_lane;
mod island_task;

pub use broadphase_lane::{BroadphaseLane, CollisionPair};
pub use contact_cache::{ContactCache, ManifoldKey};
pub use island_lane::{Island, IslandLane};
pub use island_task::{
    BodyUpdate, IslandBody, IslandOutcome, IslandTask, SleepSettings, StepSettings,
};
