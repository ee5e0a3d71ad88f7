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

//! Runs the stacked-box scenario, either as a fixed-length batch or driven by
//! commands read from standard input.

mod command;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cairn_sdk::{throw_projectile, Material, PhysicsConfig, PhysicsContext, Scene, ScenarioBuilder};
use clap::Parser;
use env_logger::{Builder, Env};

use crate::command::{Command, HELP};

/// Fixed simulation time step.
const DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Rigid-body stacking scenario with optional debugger telemetry")]
struct Args {
    /// Read commands from stdin instead of running a fixed batch
    #[arg(long)]
    interactive: bool,

    /// Frames to simulate in batch mode
    #[arg(long, default_value = "2500")]
    frames: u64,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads (overrides the configuration)
    #[arg(long)]
    workers: Option<usize>,

    /// Telemetry host (overrides the configuration)
    #[arg(long)]
    telemetry_host: Option<String>,

    /// Telemetry port (overrides the configuration)
    #[arg(long)]
    telemetry_port: Option<u16>,

    /// Do not connect to a debugger
    #[arg(long)]
    no_telemetry: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn physics_config(&self) -> Result<PhysicsConfig> {
        let mut config = match &self.config {
            Some(path) => PhysicsConfig::from_file(path)?,
            None => PhysicsConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        if let Some(host) = &self.telemetry_host {
            config.telemetry.host = host.clone();
        }
        if let Some(port) = self.telemetry_port {
            config.telemetry.port = port;
        }
        if self.no_telemetry {
            config.telemetry.enabled = false;
        }
        config.validate().context("invalid command-line overrides")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = args.physics_config()?;
    log::info!("Setting up the physics world...");
    let mut context = PhysicsContext::new(config).context("failed to create the physics context")?;

    let builder = if args.interactive {
        ScenarioBuilder::interactive()
    } else {
        ScenarioBuilder::baseline()
    };
    let scenario = builder
        .build(context.scene_mut())
        .context("failed to build the scenario")?;
    log::info!(
        "World ready: {} bodies ({} dynamic).",
        context.scene().body_count(),
        context.scene().dynamic_count()
    );

    let outcome = if args.interactive {
        run_interactive(context.scene_mut(), &scenario.material)
    } else {
        run_batch(context.scene_mut(), args.frames)
    };

    context.shutdown();
    outcome
}

fn run_batch(scene: &mut Scene, frames: u64) -> Result<()> {
    log::info!("Simulation started: {frames} frames.");
    for _ in 0..frames {
        scene.simulate(DT)?;
        scene.fetch_results(true)?;
    }
    log::info!("Simulation finished after {} steps.", scene.step_count());
    Ok(())
}

fn run_interactive(scene: &mut Scene, material: &Arc<Material>) -> Result<()> {
    log::info!("Interactive mode, {HELP}.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        stdout.flush().context("failed to write the prompt")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Throw) => {
                let handle = throw_projectile(scene, Arc::clone(material))?;
                println!("threw {handle}");
            }
            Ok(Command::Step(n)) => {
                for _ in 0..n {
                    scene.simulate(DT)?;
                    scene.fetch_results(true)?;
                }
                println!("step {}", scene.step_count());
            }
            Ok(Command::Stats) => println!("{}", scene.stats()),
            Ok(Command::Quit) => break,
            Err(message) => println!("{message}; {HELP}"),
        }
    }
    log::info!("Interactive session ended after {} steps.", scene.step_count());
    Ok(())
}
