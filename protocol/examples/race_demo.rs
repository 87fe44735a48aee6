use std::time::Duration;

use portal_core::{Biome, LevelGenerator, PhysicsConfig, TerrainConfig};
use portal_protocol::{RaceSession, ServerMessage, SessionConfig};
use tokio::sync::{broadcast, mpsc};

// Headless race between bots on a freshly generated level.
#[tokio::main]
async fn main() -> portal_protocol::Result<()> {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let config = TerrainConfig::new(2025, 120.0, 200.0, Biome::Forest);
    let level = LevelGenerator::default().generate_level(&config)?.level_data;

    let mut session = RaceSession::new(level, PhysicsConfig::default(), SessionConfig::default())?;
    for name in ["alpha", "bravo", "charlie", "delta"] {
        session.add_bot(name)?;
    }

    let (tx, rx) = mpsc::channel(16);
    let (events, mut updates) = broadcast::channel(256);
    let race = tokio::spawn(session.run(rx, events));

    let watcher = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ServerMessage::RaceFinished { id, place, ticks }) => {
                    println!("bot {id} finished #{place} after {ticks} ticks");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(20)).await;
    drop(tx);
    let session = race.await.unwrap();
    let _ = watcher.await;

    for (place, id) in session.ranking().into_iter().enumerate() {
        let state = session.player_state(id)?;
        println!("{}. {} ({:.0}%)", place + 1, state.name, state.progress * 100.0);
    }
    Ok(())
}
