use anyhow::Context;
use arcade_kernel::{ComponentDef, FnSystem, QuerySpec, Stage, World, WorldError};
use arcade_scene::{ActiveScene, Scene, SceneManager, SceneManagerConfig, Transition};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arcade-cli", about = "CLI tool for arcade core operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run a two-scene demo with a fade between them
    Simulate {
        /// Number of frames to run per scene
        #[arg(short, long, default_value = "10")]
        frames: u32,
        /// Frame delta in milliseconds
        #[arg(short, long, default_value = "16")]
        delta: f64,
        /// Scene manager configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Build a world and print its serialized dump as JSON
    Dump {
        /// Number of entities to spawn
        #[arg(short, long, default_value = "3")]
        entities: u64,
        /// Steps to simulate before dumping
        #[arg(short, long, default_value = "1")]
        steps: u32,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Velocity {
    dx: f64,
    dy: f64,
}

const POSITION: ComponentDef<Position> = ComponentDef::with_default("Position");
const VELOCITY: ComponentDef<Velocity> = ComponentDef::new("Velocity");
const OPACITY: ComponentDef<f64> = ComponentDef::new("Opacity");

/// Spawn `count` moving entities and the system that moves them.
fn populate(world: &mut World, count: u64) -> Result<(), WorldError> {
    for i in 0..count {
        let e = world.create_entity();
        world.add_component(e, &POSITION, Position::default())?;
        world.add_component(
            e,
            &VELOCITY,
            Velocity {
                dx: i as f64 + 1.0,
                dy: 0.5,
            },
        )?;
    }
    world.register_system(
        Stage::Update,
        FnSystem::new("movement", |ctx| {
            let moving = ctx
                .world
                .query(&QuerySpec::new().all([POSITION.name(), VELOCITY.name()]));
            let steps: Vec<_> = moving
                .into_iter()
                .filter_map(|row| Some((row.entity, *row.get(&VELOCITY)?)))
                .collect();
            for (e, v) in steps {
                let p = ctx.world.ensure_component(e, &POSITION)?;
                p.x += v.dx;
                p.y += v.dy;
            }
            Ok(())
        }),
    )?;
    Ok(())
}

struct Level {
    name: &'static str,
}

#[async_trait(?Send)]
impl Scene for Level {
    fn id(&self) -> &str {
        self.name
    }

    async fn on_enter(&mut self, world: &mut World) -> arcade_scene::SceneResult {
        tracing::info!(scene = self.name, entities = world.entity_count(), "entering");
        Ok(())
    }

    async fn on_exit(&mut self, world: &mut World) -> arcade_scene::SceneResult {
        tracing::info!(scene = self.name, time = world.total_time(), "leaving");
        Ok(())
    }
}

/// Writes the fade-in opacity onto a dedicated overlay entity.
struct Fade {
    duration: f64,
}

impl Fade {
    fn set(to: &mut ActiveScene, opacity: f64) {
        let world = to.world_mut();
        let existing = world
            .query(&QuerySpec::new().all([OPACITY.name()]))
            .entities()
            .first()
            .copied();
        let overlay = existing.unwrap_or_else(|| world.create_entity());
        if let Err(err) = world.upsert_component(overlay, &OPACITY, opacity) {
            tracing::warn!(error = %err, "fade could not write opacity");
        }
    }
}

impl Transition for Fade {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn start(&mut self, to: &mut ActiveScene) {
        Self::set(to, 0.0);
    }

    fn update(&mut self, to: &mut ActiveScene, progress: f64) {
        Self::set(to, progress);
    }

    fn finish(&mut self, to: &mut ActiveScene) {
        Self::set(to, 1.0);
    }
}

fn simulate(frames: u32, delta: f64, config: SceneManagerConfig) -> anyhow::Result<()> {
    let mut manager = SceneManager::with_config(config);
    manager.register_transition("fade", Fade { duration: delta * 4.0 });

    pollster::block_on(manager.push_with(
        |world: &mut World| {
            populate(world, 2)?;
            Ok(Level { name: "title" })
        },
        "fade",
    ))?;
    run_frames(&mut manager, frames, delta)?;

    pollster::block_on(manager.replace_with(
        |world: &mut World| {
            populate(world, 4)?;
            Ok(Level { name: "stage-1" })
        },
        "fade",
    ))?;
    run_frames(&mut manager, frames, delta)?;

    for event in manager.drain_events() {
        println!("event: {event:?}");
    }
    if let Some(current) = manager.current() {
        let world = current.world();
        println!(
            "scene={} time={} frames={} entities={}",
            current.id(),
            world.total_time(),
            world.frame(),
            world.entity_count()
        );
    }
    pollster::block_on(manager.clear());
    Ok(())
}

fn run_frames(manager: &mut SceneManager, frames: u32, delta: f64) -> anyhow::Result<()> {
    for _ in 0..frames {
        manager.update(delta)?;
        manager.render(1.0)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("arcade-cli v{}", env!("CARGO_PKG_VERSION"));
            let stages: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
            println!("stages: {}", stages.join(" -> "));
            println!("default transition: {}", SceneManagerConfig::default().default_transition);
        }
        Commands::Simulate {
            frames,
            delta,
            config,
        } => {
            let config = match config {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    SceneManagerConfig::from_json(&text)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => SceneManagerConfig::default(),
            };
            simulate(frames, delta, config)?;
        }
        Commands::Dump { entities, steps } => {
            let mut world = World::new();
            populate(&mut world, entities)?;
            for _ in 0..steps {
                world.step(16.0)?;
            }
            let json = world.serialize().to_json()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
