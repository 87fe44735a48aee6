// Server-authoritative race: one physics body per player, stepped at a fixed
// rate against the level's terrain and obstacles.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use glam::Vec3;
use log::{debug, info, warn};
use portal_core::{LevelData, PhysicsBody, PhysicsConfig, PhysicsEngine, TerrainQuery};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use crate::error::{ProtocolError, Result};
use crate::models::{ClientMessage, PlayerId, PlayerState, ServerMessage};

// Bot ids live well above anything a connection layer hands out.
const BOT_ID_BASE: PlayerId = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_players: usize,
    pub player_radius: f32,
    // xz distance from the end portal that counts as crossing the line
    pub finish_radius: f32,
    pub placement_max_slope: f32,
    pub spawn_spacing: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            player_radius: 0.5,
            finish_radius: 4.0,
            placement_max_slope: 0.5,
            spawn_spacing: 2.0,
        }
    }
}

// A message from one connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCommand {
    pub player: PlayerId,
    pub message: ClientMessage,
}

#[derive(Debug, Clone)]
struct Player {
    name: String,
    // spawn position on the start grid
    slot: usize,
    body: PhysicsBody,
    input: Vec3,
    jump: bool,
    unrestricted: bool,
    is_bot: bool,
    progress: f32,
    finished_at: Option<u64>,
}

struct Obstacle {
    centre: Vec3,
    half_extents: Vec3,
}

pub struct RaceSession {
    level: LevelData,
    config: SessionConfig,
    engine: PhysicsEngine,
    query: TerrainQuery,
    obstacles: Vec<Obstacle>,
    bounds: (Vec3, Vec3),
    players: BTreeMap<PlayerId, Player>,
    finish_order: Vec<PlayerId>,
    next_bot: PlayerId,
    tick: u64,
}

impl RaceSession {
    pub fn new(mut level: LevelData, physics: PhysicsConfig, config: SessionConfig) -> Result<Self> {
        let field = level.height_field()?;
        let (ox, oz) = field.origin();
        let res = field.resolution();
        let bounds = (
            Vec3::new(ox, f32::MIN, oz),
            Vec3::new(
                ox + (field.cols() - 1) as f32 * res,
                f32::MAX,
                oz + (field.rows() - 1) as f32 * res,
            ),
        );

        let obstacles = level
            .geometry
            .obstacles
            .iter()
            .map(|o| Obstacle {
                centre: o.collision_centre(),
                half_extents: o.half_extents(),
            })
            .collect();

        if level.metadata.generated_at.is_none() {
            level.metadata.generated_at = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_millis() as u64);
        }

        Ok(Self {
            query: TerrainQuery::new(field, config.placement_max_slope),
            engine: PhysicsEngine::new(physics),
            level,
            config,
            obstacles,
            bounds,
            players: BTreeMap::new(),
            finish_order: Vec::new(),
            next_bot: BOT_ID_BASE,
            tick: 0,
        })
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn level_message(&self) -> ServerMessage {
        ServerMessage::Level {
            level: self.level.clone(),
        }
    }

    pub fn terrain(&self) -> &TerrainQuery {
        &self.query
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn body(&self, id: PlayerId) -> Option<&PhysicsBody> {
        self.players.get(&id).map(|p| &p.body)
    }

    pub fn join(&mut self, id: PlayerId, name: impl Into<String>) -> Result<ServerMessage> {
        self.spawn(id, name.into(), false)?;
        Ok(ServerMessage::PlayerJoined {
            player: self.player_state(id)?,
        })
    }

    pub fn add_bot(&mut self, name: impl Into<String>) -> Result<PlayerId> {
        let id = self.next_bot;
        self.spawn(id, name.into(), true)?;
        self.next_bot += 1;
        Ok(id)
    }

    fn spawn(&mut self, id: PlayerId, name: String, is_bot: bool) -> Result<()> {
        if let Some(player) = self.players.get_mut(&id) {
            player.name = name;
            return Ok(());
        }
        if self.players.len() >= self.config.max_players {
            return Err(ProtocolError::SessionFull {
                max: self.config.max_players,
            });
        }

        // grid behind the start portal, four lanes wide; lowest free slot
        let slot = (0..)
            .find(|&slot| self.players.values().all(|p| p.slot != slot))
            .unwrap_or_default();
        let spacing = self.config.spawn_spacing;
        let start = self.level.start();
        let x = start.x + ((slot % 4) as f32 - 1.5) * spacing;
        let z = start.z - (slot / 4) as f32 * spacing;
        let ground = self.query.height_at(x, z);
        let radius = self.config.player_radius;
        let body = self
            .engine
            .create_body(Vec3::new(x, ground + radius + 0.5, z), radius);

        info!("{} {} joined as {}", if is_bot { "bot" } else { "player" }, name, id);
        self.players.insert(
            id,
            Player {
                name,
                slot,
                body,
                input: Vec3::ZERO,
                jump: false,
                unrestricted: false,
                is_bot,
                progress: 0.0,
                finished_at: None,
            },
        );
        Ok(())
    }

    pub fn leave(&mut self, id: PlayerId) -> Result<ServerMessage> {
        let player = self
            .players
            .remove(&id)
            .ok_or(ProtocolError::UnknownPlayer(id))?;
        info!("{} ({}) left", player.name, id);
        Ok(ServerMessage::PlayerLeft { id })
    }

    pub fn handle_input(&mut self, id: PlayerId, x: f32, z: f32, jump: bool) -> Result<()> {
        let player = self.player_mut(id)?;
        player.input = Vec3::new(x, 0.0, z);
        player.jump |= jump;
        Ok(())
    }

    // Apply one client message. Joining also resends the level so the newcomer
    // can build its own meshes.
    pub fn handle(&mut self, command: SessionCommand) -> Result<Vec<ServerMessage>> {
        match command.message {
            ClientMessage::Join { name } => {
                let joined = self.join(command.player, name)?;
                Ok(vec![self.level_message(), joined])
            }
            ClientMessage::Input { x, z, jump } => {
                self.handle_input(command.player, x, z, jump)?;
                Ok(Vec::new())
            }
            ClientMessage::Leave => Ok(vec![self.leave(command.player)?]),
        }
    }

    // Debug controls

    pub fn set_unrestricted(&mut self, id: PlayerId, unrestricted: bool) -> Result<()> {
        self.player_mut(id)?.unrestricted = unrestricted;
        debug!("player {id} unrestricted = {unrestricted}");
        Ok(())
    }

    pub fn teleport(&mut self, id: PlayerId, position: Vec3) -> Result<()> {
        let player = self.player_mut(id)?;
        player.body.position = position;
        player.body.velocity = Vec3::ZERO;
        player.body.is_grounded = false;
        debug!("player {id} teleported to {position}");
        Ok(())
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .get_mut(&id)
            .ok_or(ProtocolError::UnknownPlayer(id))
    }

    // Advance the race by one fixed step. Returns the finish events raised
    // during the step followed by a state snapshot.
    pub fn tick(&mut self, dt: f32) -> Vec<ServerMessage> {
        self.tick += 1;
        self.steer_bots();

        for player in self.players.values_mut() {
            if player.finished_at.is_some() {
                player.input = Vec3::ZERO;
            }
            let body = &mut player.body;
            self.engine.apply_movement(body, player.input, player.unrestricted);
            if std::mem::take(&mut player.jump) && player.finished_at.is_none() {
                self.engine.jump(body);
            }
            self.engine.update_body(body, dt, player.unrestricted, &self.query);

            for o in &self.obstacles {
                self.engine.resolve_obstacle_collision(body, o.centre, o.half_extents);
            }
            keep_inside(body, self.bounds);
        }

        // resolved against a snapshot, so map order does not matter
        let mut bodies: Vec<PhysicsBody> = self.players.values().map(|p| p.body).collect();
        if self.engine.resolve_player_collisions(&mut bodies) > 0 {
            for (player, body) in self.players.values_mut().zip(bodies) {
                player.body = body;
                keep_inside(&mut player.body, self.bounds);
                let p = player.body.position;
                let ground = self.query.height_at(p.x, p.z);
                player.body.position.y = p.y.max(ground + body.radius);
            }
        }

        let mut events = Vec::new();
        let (start, end) = (self.level.start(), self.level.end());
        for (&id, player) in self.players.iter_mut() {
            player.progress = progress_along(start, end, player.body.position);
            if player.finished_at.is_none()
                && xz_distance(player.body.position, end) <= self.config.finish_radius
            {
                player.finished_at = Some(self.tick);
                self.finish_order.push(id);
                let place = self.finish_order.len();
                info!("{} finished in place {} after {} ticks", player.name, place, self.tick);
                events.push(ServerMessage::RaceFinished {
                    id,
                    place,
                    ticks: self.tick,
                });
            }
        }

        events.push(self.snapshot());
        events
    }

    // Bots head for the end portal and sidestep the nearest obstacle ahead.
    fn steer_bots(&mut self) {
        let end = self.level.end();
        for player in self.players.values_mut().filter(|p| p.is_bot) {
            let pos = player.body.position;
            let Some(forward) = Vec3::new(end.x - pos.x, 0.0, end.z - pos.z).try_normalize() else {
                player.input = Vec3::ZERO;
                continue;
            };
            let mut dir = forward;
            let blocker = self
                .obstacles
                .iter()
                .map(|o| (o, Vec3::new(o.centre.x - pos.x, 0.0, o.centre.z - pos.z)))
                .filter(|(o, to)| {
                    to.dot(forward) > 0.0
                        && to.length() < o.half_extents.x.max(o.half_extents.z) + 3.0
                })
                .min_by(|a, b| a.1.length_squared().total_cmp(&b.1.length_squared()));
            if let Some((_, to)) = blocker {
                let side = Vec3::new(-forward.z, 0.0, forward.x);
                let away = if to.dot(side) > 0.0 { -side } else { side };
                dir = (forward + away).normalize_or_zero();
            }
            player.input = dir;
        }
    }

    pub fn player_state(&self, id: PlayerId) -> Result<PlayerState> {
        let player = self
            .players
            .get(&id)
            .ok_or(ProtocolError::UnknownPlayer(id))?;
        Ok(state_of(id, player))
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::State {
            tick: self.tick,
            players: self.players.iter().map(|(&id, p)| state_of(id, p)).collect(),
        }
    }

    // Finishers in arrival order, then everyone else by progress.
    pub fn ranking(&self) -> Vec<PlayerId> {
        let mut racing: Vec<(PlayerId, f32)> = self
            .players
            .iter()
            .filter(|(_, p)| p.finished_at.is_none())
            .map(|(&id, p)| (id, p.progress))
            .collect();
        racing.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        self.finish_order
            .iter()
            .copied()
            .filter(|id| self.players.contains_key(id))
            .chain(racing.into_iter().map(|(id, _)| id))
            .collect()
    }

    // Drive the session at the physics tick rate until the command channel
    // closes, broadcasting everything it produces.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        events: broadcast::Sender<ServerMessage>,
    ) -> Self {
        let dt = self.engine.config().fixed_timestep();
        let mut ticker = tokio::time::interval(Duration::from_secs_f32(dt));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("session for {} running at {} Hz", self.level.id, 1.0 / dt);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for event in self.tick(dt) {
                        // no subscribers is fine
                        let _ = events.send(event);
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle(command) {
                        Ok(replies) => {
                            for event in replies {
                                let _ = events.send(event);
                            }
                        }
                        Err(e) => warn!("dropped command: {e}"),
                    }
                }
            }
        }

        info!("session for {} stopped after {} ticks", self.level.id, self.tick);
        self
    }
}

fn state_of(id: PlayerId, p: &Player) -> PlayerState {
    PlayerState {
        id,
        name: p.name.clone(),
        position: p.body.position.into(),
        velocity: p.body.velocity.into(),
        grounded: p.body.is_grounded,
        progress: p.progress,
        finished: p.finished_at.is_some(),
        is_bot: p.is_bot,
    }
}

// Fraction of the start→end portal axis covered, in the xz plane.
fn progress_along(start: Vec3, end: Vec3, position: Vec3) -> f32 {
    let axis = Vec3::new(end.x - start.x, 0.0, end.z - start.z);
    let len_sq = axis.length_squared();
    if len_sq <= f32::EPSILON {
        return 1.0;
    }
    let offset = Vec3::new(position.x - start.x, 0.0, position.z - start.z);
    (offset.dot(axis) / len_sq).clamp(0.0, 1.0)
}

fn xz_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

// Level edges act as walls.
fn keep_inside(body: &mut PhysicsBody, (min, max): (Vec3, Vec3)) {
    if body.position.x < min.x || body.position.x > max.x {
        body.position.x = body.position.x.clamp(min.x, max.x);
        body.velocity.x = 0.0;
    }
    if body.position.z < min.z || body.position.z > max.z {
        body.position.z = body.position.z.clamp(min.z, max.z);
        body.velocity.z = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::{
        Biome, Detail, LevelGenerator, ObstacleData, ObstacleKind, StructureKind, TerrainConfig,
        WorldPoint,
    };

    fn level() -> LevelData {
        let config = TerrainConfig::new(11, 60.0, 80.0, Biome::Desert).with_detail(Detail::Low);
        LevelGenerator::default()
            .generate_level(&config)
            .unwrap()
            .level_data
    }

    fn session() -> RaceSession {
        RaceSession::new(level(), PhysicsConfig::default(), SessionConfig::default()).unwrap()
    }

    #[test]
    fn session_stamps_generation_time() {
        let s = session();
        assert!(s.level().metadata.generated_at.is_some());
    }

    #[test]
    fn join_and_leave() {
        let mut s = session();
        let joined = s.join(1, "ada").unwrap();
        assert!(matches!(joined, ServerMessage::PlayerJoined { ref player } if player.id == 1));
        assert_eq!(s.player_count(), 1);
        assert!(matches!(s.leave(1), Ok(ServerMessage::PlayerLeft { id: 1 })));
        assert!(matches!(s.leave(1), Err(ProtocolError::UnknownPlayer(1))));
    }

    #[test]
    fn session_refuses_extra_players() {
        let config = SessionConfig {
            max_players: 2,
            ..SessionConfig::default()
        };
        let mut s = RaceSession::new(level(), PhysicsConfig::default(), config).unwrap();
        s.join(1, "a").unwrap();
        s.add_bot("b").unwrap();
        assert!(matches!(s.join(3, "c"), Err(ProtocolError::SessionFull { max: 2 })));
        // rejoining is not a new slot
        assert!(s.join(1, "a2").is_ok());
    }

    #[test]
    fn rejoining_player_takes_a_free_spawn_slot() {
        let mut s = session();
        s.join(1, "a").unwrap();
        s.join(2, "b").unwrap();
        s.leave(1).unwrap();
        s.join(3, "c").unwrap();

        let b = s.body(2).unwrap().position;
        let c = s.body(3).unwrap().position;
        let apart = Vec3::new(b.x - c.x, 0.0, b.z - c.z).length();
        assert!(apart >= SessionConfig::default().spawn_spacing - 1e-4);

        // the freed first slot is reused, then the grid continues
        s.join(4, "d").unwrap();
        let d = s.body(4).unwrap().position;
        for other in [b, c] {
            assert!(Vec3::new(d.x - other.x, 0.0, d.z - other.z).length() > 1.0);
        }
    }

    #[test]
    fn players_settle_on_the_ground() {
        let mut s = session();
        s.join(1, "ada").unwrap();
        for _ in 0..120 {
            s.tick(1.0 / 60.0);
        }
        let body = s.body(1).unwrap();
        assert!(body.is_grounded);
        let ground = s.terrain().height_at(body.position.x, body.position.z);
        assert!((body.bottom() - ground).abs() < 1e-3);
    }

    #[test]
    fn input_moves_player_towards_the_end() {
        let mut s = session();
        s.join(1, "ada").unwrap();
        let before = s.player_state(1).unwrap().progress;
        for _ in 0..120 {
            s.handle_input(1, 0.0, 1.0, false).unwrap();
            s.tick(1.0 / 60.0);
        }
        assert!(s.player_state(1).unwrap().progress > before);
        assert!(s.handle_input(9, 0.0, 1.0, false).is_err());
    }

    #[test]
    fn teleport_to_the_end_finishes_the_race() {
        let mut s = session();
        s.join(1, "ada").unwrap();
        s.join(2, "bob").unwrap();
        let end = s.level().end();
        s.teleport(2, end + Vec3::Y).unwrap();
        let events = s.tick(1.0 / 60.0);
        assert!(events.contains(&ServerMessage::RaceFinished {
            id: 2,
            place: 1,
            ticks: 1
        }));
        assert!(matches!(events.last(), Some(ServerMessage::State { tick: 1, .. })));
        assert_eq!(s.ranking(), vec![2, 1]);

        // finishing is reported once
        let again = s.tick(1.0 / 60.0);
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn obstacles_block_players() {
        let mut level = level();
        let wall = ObstacleData {
            id: "wall".into(),
            kind: ObstacleKind::Structure(StructureKind::Barrier),
            // tall enough to span every terrain height
            position: WorldPoint::new(0.0, -10.0, 0.0),
            rotation: 0.0,
            scale: WorldPoint::new(10.0, 20.0, 1.0),
        };
        level.geometry.obstacles = vec![wall];
        let mut s = RaceSession::new(level, PhysicsConfig::default(), SessionConfig::default()).unwrap();
        s.join(1, "ada").unwrap();
        s.teleport(1, Vec3::new(0.0, 5.0, -3.0)).unwrap();
        for _ in 0..180 {
            s.handle_input(1, 0.0, 1.0, false).unwrap();
            s.tick(1.0 / 60.0);
        }
        // barrier half depth is 0.3 at scale 1
        assert!(s.body(1).unwrap().position.z <= -0.3 - 0.5 + 1e-3);
    }

    #[test]
    fn unrestricted_players_outrun_the_speed_cap() {
        let mut s = session();
        s.join(1, "ada").unwrap();
        s.set_unrestricted(1, true).unwrap();
        let mut top = 0.0f32;
        for _ in 0..30 {
            s.handle_input(1, 1.0, 0.0, false).unwrap();
            s.tick(1.0 / 60.0);
            top = top.max(s.body(1).unwrap().horizontal_speed());
        }
        assert!(top > PhysicsConfig::default().max_speed);
    }

    #[test]
    fn bots_make_progress() {
        let mut s = session();
        let bot = s.add_bot("robo").unwrap();
        assert!(bot >= BOT_ID_BASE);
        for _ in 0..300 {
            s.tick(1.0 / 60.0);
        }
        assert!(s.player_state(bot).unwrap().progress > 0.1);
    }

    #[test]
    fn progress_projects_onto_portal_axis() {
        let start = Vec3::new(0.0, 0.0, -10.0);
        let end = Vec3::new(0.0, 0.0, 10.0);
        assert_eq!(progress_along(start, end, Vec3::new(5.0, 3.0, 0.0)), 0.5);
        assert_eq!(progress_along(start, end, Vec3::new(0.0, 0.0, -20.0)), 0.0);
        assert_eq!(progress_along(start, end, Vec3::new(0.0, 0.0, 30.0)), 1.0);
    }
}
