//! Random driver
//!
//! Acquires a tank, subscribes to its camera and reward, and sends random
//! engine and turret controls until the server goes away or the step limit
//! is reached. Set `RUST_LOG=info` to see the rewards.

use clap::Parser;
use log::{error, info, warn};
use rand::Rng;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tankwar_client::{
    ClientConfig, ComponentKind, EntityId, GameClient, ObservationKind, TankControls,
    TurretControls,
};

#[derive(Parser)]
#[command(name = "random_driver")]
#[command(about = "Drive a tank with random controls", long_about = None)]
struct Cli {
    /// RON client configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server address, overrides the config file
    #[arg(long)]
    address: Option<String>,

    /// Directory to write the session recording to
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Number of control steps, runs until disconnected when omitted
    #[arg(long)]
    steps: Option<u64>,

    /// Delay between control steps in milliseconds
    #[arg(long, default_value = "10")]
    interval_ms: u64,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> tankwar_client::Result<()> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(address) = cli.address {
        config.address = address;
    }
    if cli.session_dir.is_some() {
        config.recorder.session_dir = cli.session_dir;
    }

    let client = GameClient::connect(config)?;
    let mut rng = rand::thread_rng();
    let interval = Duration::from_millis(cli.interval_ms);

    let mut tank = acquire(&client)?;
    let mut step = 0u64;
    while cli.steps.map_or(true, |steps| step < steps) {
        if !client.is_running() {
            warn!("Connection terminated: {:?}", client.exit_reason());
            break;
        }
        if client.dead_tanks().contains(&tank) {
            info!("Tank {} died, acquiring another", tank);
            tank = acquire(&client)?;
        }

        client.send_tank_controls(
            tank,
            TankControls::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)),
        )?;
        for turret in client.get_record(tank).turrets() {
            client.send_turret_controls(
                *turret,
                TurretControls::new(rng.gen_range(-1.0..=1.0), rng.gen_bool(0.1)),
            )?;
        }

        let reward = client.pop_reward(tank);
        if reward != 0.0 {
            info!("New reward: {}", reward);
        }

        step += 1;
        thread::sleep(interval);
    }

    let frames = client
        .with_recorder(|r| r.read(tank, ComponentKind::Image).map(|t| t.len()).unwrap_or(0))
        .unwrap_or(0);
    info!("Stopped after {} steps, {} frames recorded for tank {}", step, frames, tank);
    client.close()
}

/// Acquire a tank and subscribe to what the driver watches
fn acquire(client: &GameClient) -> tankwar_client::Result<EntityId> {
    let tank = loop {
        match client.acquire_entity_default()? {
            Some(tank) => break tank,
            None => info!("Waiting for a tank..."),
        }
    };
    info!("Driving tank {}", tank);
    client.subscribe(tank, ObservationKind::Image, Some(Duration::from_millis(100)))?;
    client.subscribe(tank, ObservationKind::Reward, None)?;
    Ok(tank)
}
