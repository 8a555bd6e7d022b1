//! External collaborators consumed by the encounter core.
//!
//! Navigation, pooling, path following, animation and line of sight live
//! outside this crate. Each one is a trait stored behind a resource (or, for
//! pools, a spawner component) so a host can plug in its own implementation.
//! The reference implementations here are small enough for the headless
//! harness and the tests.

use std::collections::HashMap;

use bevy::prelude::*;
use tracing::{trace, warn};

/// Walkable surface queries.
pub trait NavMesh: Send + Sync {
    /// Closest walkable point within `max_radius` of `near`.
    fn sample_walkable_point(&self, near: Vec3, max_radius: f32) -> Option<Vec3>;
    /// Vertices of the walkable surface, used as spawn position candidates.
    fn triangulation(&self) -> &[Vec3];
}

/// Pooled inventory of enemy instances for one spawner.
pub trait EnemyPool: Send + Sync {
    fn acquire(&mut self, archetype: usize) -> Option<Entity>;
    fn release(&mut self, instance: Entity);
    fn available(&self, archetype: usize) -> usize;
}

/// Movement / path-follow agent service.
pub trait PathFollower: Send + Sync {
    fn enable(&mut self, agent: Entity);
    fn disable(&mut self, agent: Entity);
    fn warp_to(&mut self, agent: Entity, position: Vec3);
    fn set_destination(&mut self, agent: Entity, destination: Vec3);
    /// Where the agent stands after moving for `dt` seconds, `None` when it is
    /// disabled or unknown.
    fn next_position(&mut self, agent: Entity, dt: f32) -> Option<Vec3>;
}

/// Fire-and-forget animation cues.
pub trait AnimationCues: Send + Sync {
    fn trigger(&mut self, agent: Entity, cue: &str);
    fn set_bool(&mut self, agent: Entity, flag: &str, value: bool);
}

/// Line of sight query for projectile abilities.
pub trait LineOfSight: Send + Sync {
    fn is_obstructed(&self, from: Vec3, to: Vec3, radius: f32) -> bool;
}

#[derive(Resource)]
pub struct NavMeshService(pub Box<dyn NavMesh>);

#[derive(Resource)]
pub struct PathService(pub Box<dyn PathFollower>);

#[derive(Resource)]
pub struct AnimationService(pub Box<dyn AnimationCues>);

#[derive(Resource)]
pub struct SightService(pub Box<dyn LineOfSight>);

/// Spawner-owned pool.
#[derive(Component)]
pub struct EnemyPoolHandle(pub Box<dyn EnemyPool>);

impl Default for NavMeshService {
    fn default() -> Self {
        Self(Box::new(FlatNavMesh::default()))
    }
}

impl Default for PathService {
    fn default() -> Self {
        Self(Box::new(StraightLineFollower::default()))
    }
}

impl Default for AnimationService {
    fn default() -> Self {
        Self(Box::new(CueLog::default()))
    }
}

impl Default for SightService {
    fn default() -> Self {
        Self(Box::new(OpenField))
    }
}

/// Square walkable plane at `y = 0` centred on the origin.
#[derive(Debug, Clone)]
pub struct FlatNavMesh {
    pub half_extent: f32,
    vertices: Vec<Vec3>,
}

impl Default for FlatNavMesh {
    fn default() -> Self {
        Self::new(20.0, 5.0)
    }
}

impl FlatNavMesh {
    pub fn new(half_extent: f32, spacing: f32) -> Self {
        let mut vertices = Vec::new();
        let spacing = spacing.max(0.1);
        let mut x = -half_extent;
        while x <= half_extent {
            let mut z = -half_extent;
            while z <= half_extent {
                vertices.push(Vec3::new(x, 0.0, z));
                z += spacing;
            }
            x += spacing;
        }
        Self { half_extent, vertices }
    }

    pub fn with_vertices(half_extent: f32, vertices: Vec<Vec3>) -> Self {
        Self { half_extent, vertices }
    }
}

impl NavMesh for FlatNavMesh {
    fn sample_walkable_point(&self, near: Vec3, max_radius: f32) -> Option<Vec3> {
        let clamped = Vec3::new(
            near.x.clamp(-self.half_extent, self.half_extent),
            0.0,
            near.z.clamp(-self.half_extent, self.half_extent),
        );
        (clamped.distance(near) <= max_radius).then_some(clamped)
    }

    fn triangulation(&self) -> &[Vec3] {
        &self.vertices
    }
}

/// Pool of pre-spawned dormant shells, one free list per archetype.
#[derive(Debug, Default, Clone)]
pub struct DormantPool {
    free: Vec<Vec<Entity>>,
    owner: HashMap<Entity, usize>,
}

impl DormantPool {
    pub fn new(archetypes: usize) -> Self {
        Self {
            free: vec![Vec::new(); archetypes],
            owner: HashMap::new(),
        }
    }

    /// Registers a shell as a free instance of `archetype`.
    pub fn stock(&mut self, archetype: usize, instance: Entity) {
        if self.free.len() <= archetype {
            self.free.resize(archetype + 1, Vec::new());
        }
        self.owner.insert(instance, archetype);
        self.free[archetype].push(instance);
    }
}

impl EnemyPool for DormantPool {
    fn acquire(&mut self, archetype: usize) -> Option<Entity> {
        self.free.get_mut(archetype)?.pop()
    }

    fn release(&mut self, instance: Entity) {
        let Some(&archetype) = self.owner.get(&instance) else {
            warn!("released {:?} which this pool never owned", instance);
            return;
        };
        let list = &mut self.free[archetype];
        if !list.contains(&instance) {
            list.push(instance);
        }
    }

    fn available(&self, archetype: usize) -> usize {
        self.free.get(archetype).map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Copy)]
struct Agent {
    enabled: bool,
    position: Vec3,
    destination: Option<Vec3>,
}

/// Moves agents in a straight line toward their destination.
#[derive(Debug, Clone)]
pub struct StraightLineFollower {
    pub speed: f32,
    pub stopping_distance: f32,
    agents: HashMap<Entity, Agent>,
}

impl Default for StraightLineFollower {
    fn default() -> Self {
        Self {
            speed: 3.5,
            stopping_distance: 1.0,
            agents: HashMap::new(),
        }
    }
}

impl StraightLineFollower {
    pub fn is_enabled(&self, agent: Entity) -> bool {
        self.agents.get(&agent).is_some_and(|a| a.enabled)
    }
}

impl PathFollower for StraightLineFollower {
    fn enable(&mut self, agent: Entity) {
        self.agents
            .entry(agent)
            .or_insert(Agent {
                enabled: true,
                position: Vec3::ZERO,
                destination: None,
            })
            .enabled = true;
    }

    fn disable(&mut self, agent: Entity) {
        if let Some(state) = self.agents.get_mut(&agent) {
            state.enabled = false;
            state.destination = None;
        }
    }

    fn warp_to(&mut self, agent: Entity, position: Vec3) {
        let state = self.agents.entry(agent).or_insert(Agent {
            enabled: false,
            position,
            destination: None,
        });
        state.position = position;
    }

    fn set_destination(&mut self, agent: Entity, destination: Vec3) {
        if let Some(state) = self.agents.get_mut(&agent) {
            if state.enabled {
                state.destination = Some(destination);
            }
        }
    }

    fn next_position(&mut self, agent: Entity, dt: f32) -> Option<Vec3> {
        let state = self.agents.get_mut(&agent)?;
        if !state.enabled {
            return None;
        }
        if let Some(destination) = state.destination {
            let to_go = destination - state.position;
            let remaining = to_go.length() - self.stopping_distance;
            if remaining > 0.0 {
                let step = (self.speed * dt).min(remaining);
                state.position += to_go.normalize_or_zero() * step;
            }
        }
        Some(state.position)
    }
}

/// Records every cue, handy to assert on in tests.
#[derive(Debug, Default, Clone)]
pub struct CueLog {
    pub triggers: Vec<(Entity, String)>,
    pub flags: HashMap<(Entity, String), bool>,
}

impl AnimationCues for CueLog {
    fn trigger(&mut self, agent: Entity, cue: &str) {
        trace!("cue{{agent={:?} trigger={}}}", agent, cue);
        self.triggers.push((agent, cue.to_string()));
    }

    fn set_bool(&mut self, agent: Entity, flag: &str, value: bool) {
        trace!("cue{{agent={:?} flag={} value={}}}", agent, flag, value);
        self.flags.insert((agent, flag.to_string()), value);
    }
}

/// Nothing ever blocks sight.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenField;

impl LineOfSight for OpenField {
    fn is_obstructed(&self, _from: Vec3, _to: Vec3, _radius: f32) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_navmesh_respects_radius() {
        let mesh = FlatNavMesh::new(10.0, 5.0);
        assert_eq!(
            mesh.sample_walkable_point(Vec3::new(3.0, 0.5, 2.0), 2.0),
            Some(Vec3::new(3.0, 0.0, 2.0))
        );
        assert_eq!(mesh.sample_walkable_point(Vec3::new(15.0, 0.0, 0.0), 2.0), None);
        assert_eq!(
            mesh.sample_walkable_point(Vec3::new(11.0, 0.0, 0.0), 2.0),
            Some(Vec3::new(10.0, 0.0, 0.0))
        );
        assert_eq!(mesh.triangulation().len(), 25);
    }

    #[test]
    fn dormant_pool_hands_out_each_instance_once() {
        let mut world = World::new();
        let mut pool = DormantPool::new(2);
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        pool.stock(0, a);
        pool.stock(1, b);

        assert_eq!(pool.acquire(0), Some(a));
        assert_eq!(pool.acquire(0), None);
        assert_eq!(pool.available(1), 1);

        pool.release(a);
        pool.release(a);
        assert_eq!(pool.available(0), 1);
    }

    #[test]
    fn follower_stops_short_of_destination() {
        let agent = World::new().spawn_empty().id();
        let mut follower = StraightLineFollower {
            speed: 1.0,
            stopping_distance: 1.0,
            ..Default::default()
        };
        follower.warp_to(agent, Vec3::ZERO);
        assert_eq!(follower.next_position(agent, 1.0), None);

        follower.enable(agent);
        follower.set_destination(agent, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(follower.next_position(agent, 1.0), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(follower.next_position(agent, 5.0), Some(Vec3::new(2.0, 0.0, 0.0)));
    }
}
