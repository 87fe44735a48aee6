use std::time::Duration;

use portal_core::{Biome, Detail, LevelData, LevelGenerator, PhysicsConfig, TerrainConfig};
use portal_protocol::{
    ClientMessage, RaceSession, ServerMessage, SessionCommand, SessionConfig, WireMessage,
};
use tokio::runtime::Builder;
use tokio::sync::{broadcast, mpsc};

fn level() -> LevelData {
    let config = TerrainConfig::new(42, 80.0, 120.0, Biome::Grassland).with_detail(Detail::Low);
    LevelGenerator::default()
        .generate_level(&config)
        .unwrap()
        .level_data
}

#[test]
fn level_message_survives_the_wire() {
    let session =
        RaceSession::new(level(), PhysicsConfig::default(), SessionConfig::default()).unwrap();
    let text = session.level_message().encode().unwrap();

    let ServerMessage::Level { level: received } = ServerMessage::decode(&text).unwrap() else {
        panic!("expected a level message");
    };
    assert_eq!(&received, session.level());

    // a client rebuilds the same surface the server simulates on
    assert_eq!(&received.height_field().unwrap(), session.terrain().field());
    let meshes = LevelGenerator::default()
        .generate_terrain_meshes_from_level(&received)
        .unwrap();
    assert_eq!(meshes.terrain.vertex_count(), 21 * 31);
}

#[test]
fn session_runs_on_a_tokio_interval() {
    let rt = Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    rt.block_on(async {
        let session =
            RaceSession::new(level(), PhysicsConfig::default(), SessionConfig::default()).unwrap();
        let (tx, rx) = mpsc::channel(16);
        let (events, mut updates) = broadcast::channel(4096);
        let handle = tokio::spawn(session.run(rx, events));

        tx.send(SessionCommand {
            player: 7,
            message: ClientMessage::decode(r#"{"type":"join","name":"ada"}"#).unwrap(),
        })
        .await
        .unwrap();
        tx.send(SessionCommand {
            player: 7,
            message: ClientMessage::Input {
                x: 0.0,
                z: 1.0,
                jump: false,
            },
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(tx);
        let session = handle.await.unwrap();

        assert!(session.current_tick() >= 20);
        assert!(session.player_state(7).unwrap().progress > 0.0);

        let mut saw_join = false;
        let mut last_tick = 0;
        while let Ok(event) = updates.try_recv() {
            match event {
                ServerMessage::PlayerJoined { player } => saw_join = player.id == 7,
                ServerMessage::State { tick, .. } => {
                    assert!(tick > last_tick);
                    last_tick = tick;
                }
                _ => {}
            }
        }
        assert!(saw_join);
        assert_eq!(last_tick, session.current_tick());
    });
}

#[test]
fn unknown_players_are_reported_not_fatal() {
    let mut session =
        RaceSession::new(level(), PhysicsConfig::default(), SessionConfig::default()).unwrap();
    let err = session
        .handle(SessionCommand {
            player: 3,
            message: ClientMessage::Leave,
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown player 3");
}
