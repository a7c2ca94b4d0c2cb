//! kinemover CLI - run the mover through demo scenes and inspect configs

use clap::{Parser, Subcommand};
use nalgebra::{Point2, Vector2};
use std::path::PathBuf;
use tracing::Level;

use kinemover::config::MoverConfig;
use kinemover::error::MoverError;
use kinemover::mover::{CharacterMover, KinematicMover, MoverContext, MoverSnapshot};
use kinemover::planar::PlanarMover;
use kinemover::scene::{self, SceneKind};
use kinemover::shape::LayerMask;

#[derive(Parser)]
#[command(name = "kinemover")]
#[command(about = "Kinematic character mover playground", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a character through a demo scene and print each tick
    Simulate {
        /// Scene to build: flat, wall, corner, stairs, slope or rubble
        #[arg(long, default_value = "flat")]
        scene: SceneKind,
        /// Number of ticks to run
        #[arg(long, default_value = "60")]
        ticks: u32,
        /// Seconds per tick
        #[arg(long, default_value = "0.016666668")]
        dt: f32,
        /// Move input (x right, y forward); the planar mover scales it by max_speed
        #[arg(
            long,
            num_args = 2,
            value_names = ["X", "Y"],
            allow_negative_numbers = true,
            default_values_t = [0.0, 1.0]
        )]
        input: Vec<f32>,
        /// Mover configuration file (defaults when omitted)
        #[arg(long, env = "KINEMOVER_CONFIG")]
        config: Option<PathBuf>,
        /// Seed for the rubble scene
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Use the lateral-only planar mover in the XY plane
        #[arg(long)]
        planar: bool,
        /// Print one JSON object per tick
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration as TOML
    Defaults,
    /// Load and validate a configuration file
    Check {
        /// Path to the TOML file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate {
            scene,
            ticks,
            dt,
            input,
            config,
            seed,
            planar,
            json,
        } => simulate(SimulateArgs {
            scene,
            ticks,
            dt,
            input: Vector2::new(input[0], input[1]),
            config,
            seed,
            planar,
            json,
        }),
        Commands::Defaults => print_defaults(),
        Commands::Check { file } => check_config(file),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

// =============================================================================
// Simulate Command
// =============================================================================

struct SimulateArgs {
    scene: SceneKind,
    ticks: u32,
    dt: f32,
    input: Vector2<f32>,
    config: Option<PathBuf>,
    seed: u64,
    planar: bool,
    json: bool,
}

fn load_config(path: Option<&PathBuf>) -> MoverConfig {
    match path {
        Some(path) => MoverConfig::from_file(path).unwrap_or_else(|e| fail(e)),
        None => MoverConfig::default(),
    }
}

fn print_snapshot(snapshot: &MoverSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => fail(e),
        }
        return;
    }
    let [x, y, z] = snapshot.position;
    let [vx, vy, vz] = snapshot.velocity;
    println!(
        "{:>5}  pos ({:>8.3} {:>8.3} {:>8.3})  vel ({:>7.3} {:>7.3} {:>7.3})  {:<8} {:<10} {}",
        snapshot.tick,
        x,
        y,
        z,
        vx,
        vy,
        vz,
        if snapshot.grounded { "grounded" } else { "airborne" },
        format!("{:?}", snapshot.slide).to_lowercase(),
        snapshot
            .regime
            .map(|r| format!("{:?}", r).to_lowercase())
            .unwrap_or_default(),
    );
}

fn spawn_mover(
    planar: bool,
    context: MoverContext,
    input: Vector2<f32>,
    max_speed: f32,
) -> Result<Box<dyn KinematicMover>, MoverError> {
    let spawn = scene::spawn_point();
    if planar {
        // Hover above the floor so the planar mover starts clear of it.
        let mut mover = PlanarMover::new(context, Point2::new(spawn.x, spawn.y + 2.0))?;
        mover.set_velocity(input * max_speed)?;
        Ok(Box::new(mover))
    } else {
        let mut mover = CharacterMover::new(context, spawn)?;
        mover.set_move_input(input)?;
        Ok(Box::new(mover))
    }
}

fn simulate(args: SimulateArgs) {
    let config = load_config(args.config.as_ref());
    let mut world = args.scene.build(args.seed);

    // The mover's own collider lives in the world like any other character's.
    let own = world.add_character_collider("player", &config.shape, [0.0, 0.0, 0.0], LayerMask::CHARACTER);
    let context = config.context().with_self_collider(own);
    let mut mover = spawn_mover(args.planar, context, args.input, config.movement.max_speed)
        .unwrap_or_else(|e| fail(e));
    world.set_collider_pose(own, mover.collider_pose());
    world.refresh();

    let json = args.json;
    mover.on_tick(Box::new(move |snapshot: &MoverSnapshot| print_snapshot(snapshot, json)));

    for _ in 0..args.ticks {
        if let Err(e) = mover.tick(&world, args.dt) {
            fail(e);
        }
        world.set_collider_pose(own, mover.collider_pose());
        world.refresh();
    }

    if !json {
        let last = mover.snapshot();
        println!(
            "scene {} finished after {} ticks, {}",
            args.scene,
            last.tick,
            if mover.is_grounded() { "grounded" } else { "airborne" }
        );
    }
}

// =============================================================================
// Config Commands
// =============================================================================

fn print_defaults() {
    match MoverConfig::default().to_toml_string() {
        Ok(text) => print!("{}", text),
        Err(e) => fail(e),
    }
}

fn check_config(file: PathBuf) {
    let config = MoverConfig::from_file(&file).unwrap_or_else(|e| fail(e));
    println!("{} is valid", file.display());
    println!(
        "  shape radius {:.3}, max speed {:.3}, slope limit {:.1} deg, layers {:#x}",
        config.shape.radius(),
        config.movement.max_speed,
        config.movement.slope_limit,
        config.slide.layers.0
    );
}
