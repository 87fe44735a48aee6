// Sphere-body simulation over a terrain surface.

use glam::Vec3;

use crate::TerrainSurface;
use crate::config::PhysicsConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub mass: f32,
    pub radius: f32,
    pub is_grounded: bool,
    pub last_ground_y: f32,
}

impl PhysicsBody {
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    pub fn bottom(&self) -> f32 {
        self.position.y - self.radius
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhysicsEngine {
    config: PhysicsConfig,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn create_body(&self, position: Vec3, radius: f32) -> PhysicsBody {
        PhysicsBody {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            mass: 1.0,
            radius,
            is_grounded: false,
            last_ground_y: position.y - radius,
        }
    }

    // Horizontal only; a zero direction does nothing.
    pub fn apply_movement(&self, body: &mut PhysicsBody, direction: Vec3, unrestricted: bool) {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        let Some(dir) = flat.try_normalize() else {
            body.acceleration = Vec3::ZERO;
            return;
        };

        let accel = if unrestricted {
            self.config.unrestricted_acceleration
        } else {
            self.config.acceleration
        };
        body.acceleration = dir * accel;
        body.velocity += body.acceleration;

        if !unrestricted {
            self.clamp_horizontal_speed(body);
        }
    }

    pub fn jump(&self, body: &mut PhysicsBody) -> bool {
        if !body.is_grounded {
            return false;
        }
        body.velocity.y = self.config.jump_velocity;
        body.is_grounded = false;
        true
    }

    fn clamp_horizontal_speed(&self, body: &mut PhysicsBody) {
        let speed = body.horizontal_speed();
        let max = self.config.max_speed;
        if speed > max && speed > 0.0 {
            let k = max / speed;
            body.velocity.x *= k;
            body.velocity.z *= k;
        }
    }

    // Advance one tick against the given terrain.
    pub fn update_body(
        &self,
        body: &mut PhysicsBody,
        dt: f32,
        unrestricted: bool,
        terrain: &dyn TerrainSurface,
    ) {
        if !(unrestricted && body.is_grounded) {
            body.velocity.y -= self.config.gravity * dt;
        }

        body.position += body.velocity * dt;

        let ground = terrain.height_at(body.position.x, body.position.z);
        let gap = body.bottom() - ground;

        if gap <= 0.0 {
            // landed or still resting: sit on the surface, drop any downward motion
            body.position.y = ground + body.radius;
            body.velocity.y = body.velocity.y.max(0.0);
            body.is_grounded = true;
            body.last_ground_y = ground;
        } else if gap > self.config.ground_epsilon {
            body.is_grounded = false;
        }

        let damping = if body.is_grounded {
            self.config.ground_friction
        } else {
            self.config.air_resistance
        };
        body.velocity.x *= damping;
        body.velocity.z *= damping;
        body.acceleration = Vec3::ZERO;
    }

    // Sphere vs axis-aligned box overlap, using the closest point on the box.
    pub fn check_obstacle_collision(
        &self,
        body: &PhysicsBody,
        obstacle_centre: Vec3,
        half_extents: Vec3,
    ) -> bool {
        let closest = body
            .position
            .clamp(obstacle_centre - half_extents, obstacle_centre + half_extents);
        closest.distance_squared(body.position) <= body.radius * body.radius
    }

    // Push out along the shallower of x and z and bounce on that axis.
    pub fn resolve_obstacle_collision(
        &self,
        body: &mut PhysicsBody,
        obstacle_centre: Vec3,
        half_extents: Vec3,
    ) -> bool {
        if !self.check_obstacle_collision(body, obstacle_centre, half_extents) {
            return false;
        }

        let delta = body.position - obstacle_centre;
        let pen_x = half_extents.x + body.radius - delta.x.abs();
        let pen_z = half_extents.z + body.radius - delta.z.abs();
        let restitution = self.config.obstacle_restitution;

        let side = |d: f32, v: f32| {
            if d > 0.0 {
                1.0
            } else if d < 0.0 {
                -1.0
            } else if v > 0.0 {
                // dead centre: go back the way we came
                -1.0
            } else {
                1.0
            }
        };

        if pen_x <= pen_z {
            let s = side(delta.x, body.velocity.x);
            body.position.x = obstacle_centre.x + s * (half_extents.x + body.radius);
            if body.velocity.x * s < 0.0 {
                body.velocity.x = -body.velocity.x * restitution;
            }
        } else {
            let s = side(delta.z, body.velocity.z);
            body.position.z = obstacle_centre.z + s * (half_extents.z + body.radius);
            if body.velocity.z * s < 0.0 {
                body.velocity.z = -body.velocity.z * restitution;
            }
        }
        true
    }

    // Pairs are resolved against a snapshot taken before any correction.
    // Returns the number of colliding pairs.
    pub fn resolve_player_collisions(&self, bodies: &mut [PhysicsBody]) -> usize {
        let snapshot: Vec<(Vec3, Vec3, f32, f32)> = bodies
            .iter()
            .map(|b| (b.position, b.velocity, b.mass.max(f32::EPSILON), b.radius))
            .collect();
        let mut dp = vec![Vec3::ZERO; bodies.len()];
        let mut dv = vec![Vec3::ZERO; bodies.len()];
        let e = self.config.player_restitution;
        let mut contacts = 0;

        for i in 0..snapshot.len() {
            for j in (i + 1)..snapshot.len() {
                let (pi, vi, mi, ri) = snapshot[i];
                let (pj, vj, mj, rj) = snapshot[j];
                let offset = pj - pi;
                let dist = offset.length();
                let overlap = ri + rj - dist;
                if overlap <= 0.0 {
                    continue;
                }
                contacts += 1;

                let normal = offset.try_normalize().unwrap_or(Vec3::X);
                dp[i] -= normal * (overlap * 0.5);
                dp[j] += normal * (overlap * 0.5);

                let approach = (vi - vj).dot(normal);
                if approach > 0.0 {
                    let impulse = (1.0 + e) * approach / (1.0 / mi + 1.0 / mj);
                    dv[i] -= normal * (impulse / mi);
                    dv[j] += normal * (impulse / mj);
                }
            }
        }

        for (body, (p, v)) in bodies.iter_mut().zip(dp.into_iter().zip(dv)) {
            body.position += p;
            body.velocity += v;
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatGround;
    use crate::heightfield::HeightField;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn dropped_body_comes_to_rest_on_flat_ground() {
        let engine = PhysicsEngine::default();
        let ground = FlatGround::default();
        let mut body = engine.create_body(Vec3::new(0.0, 10.0, 0.0), 0.5);
        let mut rested_at = None;
        for tick in 0..600 {
            engine.update_body(&mut body, DT, false, &ground);
            if body.is_grounded && rested_at.is_none() {
                rested_at = Some(tick);
            }
        }
        assert!(rested_at.is_some_and(|t| t < 120));
        assert_eq!(body.position.y, 0.5);
        assert!(body.is_grounded);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn body_leaves_ground_when_jumping() {
        let engine = PhysicsEngine::default();
        let ground = FlatGround { height: 2.0 };
        let mut body = engine.create_body(Vec3::new(0.0, 2.5, 0.0), 0.5);
        engine.update_body(&mut body, DT, false, &ground);
        assert!(body.is_grounded);
        assert!(engine.jump(&mut body));
        engine.update_body(&mut body, DT, false, &ground);
        assert!(!body.is_grounded);
        assert!(!engine.jump(&mut body));
    }

    #[test]
    fn horizontal_speed_never_exceeds_max() {
        let engine = PhysicsEngine::default();
        let ground = FlatGround::default();
        let mut body = engine.create_body(Vec3::new(0.0, 0.5, 0.0), 0.5);
        for _ in 0..500 {
            engine.apply_movement(&mut body, Vec3::new(1.0, 0.0, 1.0), false);
            assert!(body.horizontal_speed() <= engine.config().max_speed + 1e-4);
            engine.update_body(&mut body, DT, false, &ground);
            assert!(body.horizontal_speed() <= engine.config().max_speed + 1e-4);
        }
    }

    #[test]
    fn speed_clamp_leaves_vertical_velocity_alone() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::ZERO, 0.5);
        body.velocity = Vec3::new(100.0, 25.0, 0.0);
        engine.apply_movement(&mut body, Vec3::X, false);
        assert_eq!(body.velocity.y, 25.0);
        assert!((body.horizontal_speed() - engine.config().max_speed).abs() < 1e-4);
    }

    #[test]
    fn unrestricted_bodies_are_not_capped() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::ZERO, 0.5);
        for _ in 0..100 {
            engine.apply_movement(&mut body, Vec3::Z, true);
        }
        assert!(body.horizontal_speed() > engine.config().max_speed);
    }

    #[test]
    fn unrestricted_grounded_body_ignores_gravity() {
        let engine = PhysicsEngine::default();
        let ground = FlatGround::default();
        let mut body = engine.create_body(Vec3::new(0.0, 0.5, 0.0), 0.5);
        body.is_grounded = true;
        body.velocity.y = 3.0;
        engine.update_body(&mut body, DT, true, &ground);
        assert!(body.position.y > 0.5);
        assert_eq!(body.velocity.y, 3.0);
    }

    #[test]
    fn zero_direction_is_a_no_op() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::ZERO, 0.5);
        engine.apply_movement(&mut body, Vec3::ZERO, false);
        engine.apply_movement(&mut body, Vec3::new(0.0, 5.0, 0.0), false);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert!(!body.velocity.is_nan());
    }

    #[test]
    fn friction_differs_between_ground_and_air() {
        let engine = PhysicsEngine::default();
        let ground = FlatGround::default();
        let mut grounded = engine.create_body(Vec3::new(0.0, 0.5, 0.0), 0.5);
        grounded.velocity.x = 10.0;
        engine.update_body(&mut grounded, DT, false, &ground);
        let mut airborne = engine.create_body(Vec3::new(0.0, 20.0, 0.0), 0.5);
        airborne.velocity.x = 10.0;
        engine.update_body(&mut airborne, DT, false, &ground);
        assert!((grounded.velocity.x - 10.0 * engine.config().ground_friction).abs() < 1e-4);
        assert!((airborne.velocity.x - 10.0 * engine.config().air_resistance).abs() < 1e-4);
    }

    #[test]
    fn body_follows_rising_terrain() {
        let engine = PhysicsEngine::default();
        // slope rising 0.5 per unit along x
        let heights = (0..21 * 21).map(|i| (i % 21) as f32 * 0.5).collect();
        let field = HeightField::new(21, 21, 1.0, -10.0, -10.0, heights).unwrap();
        let mut body = engine.create_body(Vec3::new(-5.0, 3.0, 0.0), 0.5);
        for _ in 0..120 {
            engine.apply_movement(&mut body, Vec3::X, false);
            engine.update_body(&mut body, DT, false, &field);
            let ground = field.height_at_position(body.position.x, body.position.z);
            assert!(body.bottom() >= ground - 1e-4);
        }
        assert!(body.position.x > -5.0);
    }

    #[test]
    fn obstacle_bounce_pushes_back_and_damps() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::new(1.0, 0.0, 0.0), 0.5);
        body.velocity = Vec3::new(5.0, 0.0, 0.0);
        let centre = Vec3::new(2.0, 0.0, 0.0);
        let half = Vec3::ONE;
        assert!(engine.check_obstacle_collision(&body, centre, half));
        assert!(engine.resolve_obstacle_collision(&mut body, centre, half));
        assert!((body.position.x - 0.5).abs() < 1e-6);
        assert!((body.velocity.x + 2.5).abs() < 1e-6);
        assert!(!engine.check_obstacle_collision(
            &PhysicsBody {
                position: Vec3::new(0.4, 0.0, 0.0),
                ..body
            },
            centre,
            half
        ));
    }

    #[test]
    fn obstacle_resolution_picks_shallow_axis() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::new(0.0, 0.0, 1.3), 0.5);
        body.velocity = Vec3::new(0.0, 0.0, -4.0);
        engine.resolve_obstacle_collision(&mut body, Vec3::ZERO, Vec3::ONE);
        assert!((body.position.z - 1.5).abs() < 1e-6);
        assert_eq!(body.position.x, 0.0);
        assert!((body.velocity.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn non_overlapping_obstacle_is_ignored() {
        let engine = PhysicsEngine::default();
        let mut body = engine.create_body(Vec3::new(5.0, 0.0, 0.0), 0.5);
        let before = body;
        assert!(!engine.resolve_obstacle_collision(&mut body, Vec3::ZERO, Vec3::ONE));
        assert_eq!(body, before);
    }

    #[test]
    fn player_collisions_are_symmetric_and_order_free() {
        let engine = PhysicsEngine::default();
        let mut a = engine.create_body(Vec3::new(-0.4, 0.5, 0.0), 0.5);
        let mut b = engine.create_body(Vec3::new(0.4, 0.5, 0.0), 0.5);
        a.velocity = Vec3::new(3.0, 0.0, 0.0);
        b.velocity = Vec3::new(-1.0, 0.0, 0.0);

        let mut forward = [a, b];
        let mut reversed = [b, a];
        assert_eq!(engine.resolve_player_collisions(&mut forward), 1);
        engine.resolve_player_collisions(&mut reversed);
        assert_eq!(forward[0], reversed[1]);
        assert_eq!(forward[1], reversed[0]);

        // separated, moving apart, momentum conserved
        let [ra, rb] = forward;
        assert!((rb.position.x - ra.position.x - 1.0).abs() < 1e-5);
        assert!(ra.velocity.x < rb.velocity.x);
        assert!((ra.velocity.x + rb.velocity.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn three_body_pileup_is_order_independent() {
        let engine = PhysicsEngine::default();
        let mk = |x: f32, vx: f32| {
            let mut b = engine.create_body(Vec3::new(x, 0.5, 0.0), 0.5);
            b.velocity.x = vx;
            b
        };
        let (a, b, c) = (mk(-0.8, 2.0), mk(0.0, 0.0), mk(0.8, -2.0));
        let mut one = [a, b, c];
        let mut two = [c, a, b];
        assert_eq!(engine.resolve_player_collisions(&mut one), 2);
        engine.resolve_player_collisions(&mut two);
        for (x, y) in [(one[0], two[1]), (one[1], two[2]), (one[2], two[0])] {
            assert!((x.position - y.position).length() < 1e-6);
            assert!((x.velocity - y.velocity).length() < 1e-6);
        }
    }
}
