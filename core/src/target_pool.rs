use beamsweep_shared::config::{GameConfig, TargetKind, TargetTemplate};
use beamsweep_shared::geometry::{add, lerp, scale, Aabb, Vec3};
use rand::Rng;
use std::collections::BTreeMap;

use crate::error::{SpawnError, StartupError};

pub type TargetId = u32;

/// Hand-authored spawn starts, cycled in order.
pub const SPAWN_PATHS: [[f64; 3]; 15] = [
    [1.75723149842901, 1.91167369489659, -8.094368331589704],
    [-0.17926923759259417, 1.5492683069069084, -7.254713426424875],
    [-0.013296800013828491, 2.1477660260686178, -8.601541438900849],
    [2.228704746539703, 0.9637977333363652, -7.183621312117454],
    [-0.1639251238128644, 1.821619897406197, -8.010893563433282],
    [0.26171657558989603, 1.371932443334715, -7.68020636133317],
    [1.3854106312562546, 1.7976989985567755, -7.383548882448866],
    [-0.4627984704543674, 1.4316500929072644, -7.169154476151876],
    [1.112766805791563, 0.8595484066274922, -7.147229496720969],
    [1.210194536657374, 0.8802546383582288, -8.051132737691349],
    [0.06363777289914152, 1.9731726350400147, -8.503837407474947],
    [0.8830826301349972, 1.2552684968436534, -7.760994300660705],
    [0.8917198217167257, 2.0850001111047867, -8.908048018555112],
    [0.4222600671328942, 1.370335319771187, -7.525853388894509],
    [0.47347081110775346, 1.8649301498622406, -8.164641191459626],
];

/// A live target moving along its path
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
    /// Placement position; motion is relative to it
    pub origin: Vec3,
    pub position: Vec3,
    pub half_extents: Vec3,
    /// Seconds since spawn
    pub age: f64,
    pub is_scored: bool,
    /// Path entry used, `None` for a fallback placement
    pub path_index: Option<usize>,
}

impl Target {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }
}

/// Owns every live target, the path cursor and the id counter.
pub struct TargetPool {
    templates: Vec<TargetTemplate>,
    paths: Vec<Vec3>,
    cursor: usize,
    next_id: TargetId,
    live: BTreeMap<TargetId, Target>,
    spawn_offset: Vec3,
    path_delta: Vec3,
    traversal_secs: f64,
    fallback_range: f64,
    max_attempts: u32,
    max_live: usize,
}

impl TargetPool {
    pub fn new(config: &GameConfig) -> Result<Self, StartupError> {
        let paths = SPAWN_PATHS.iter().map(|p| Vec3::from_array(*p)).collect();
        Self::with_paths(config, paths)
    }

    pub fn with_paths(config: &GameConfig, paths: Vec<Vec3>) -> Result<Self, StartupError> {
        if config.templates.is_empty() {
            return Err(StartupError::NoTemplates);
        }
        if paths.is_empty() {
            return Err(StartupError::NoPaths);
        }
        Ok(Self {
            templates: config.templates.clone(),
            paths,
            cursor: 0,
            next_id: 0,
            live: BTreeMap::new(),
            spawn_offset: Vec3::from_array(config.spawn_offset),
            path_delta: Vec3::from_array(config.path_delta),
            traversal_secs: config.traversal_secs,
            fallback_range: config.fallback_range,
            max_attempts: config.max_spawn_attempts,
            max_live: config.max_live_targets,
        })
    }

    /// Place the next target. The first candidate is the path entry at the
    /// cursor; each overlap retries at a random spot in the fallback cube.
    /// The cursor only advances when a placement succeeds.
    pub fn spawn_next<R: Rng>(&mut self, rng: &mut R) -> Result<Target, SpawnError> {
        if self.live.len() >= self.max_live {
            return Err(SpawnError::PoolFull {
                limit: self.max_live,
            });
        }

        let template = self.templates[rng.gen_range(0..self.templates.len())];
        let half_extents = Vec3::from_array(template.half_extents);

        let mut candidate = add(self.paths[self.cursor], self.spawn_offset);
        let mut path_index = Some(self.cursor);

        for _ in 0..self.max_attempts {
            if !self.overlaps_live(&Aabb::new(candidate, half_extents)) {
                let target = Target {
                    id: self.next_id,
                    kind: template.kind,
                    origin: candidate,
                    position: candidate,
                    half_extents,
                    age: 0.0,
                    is_scored: false,
                    path_index,
                };
                self.next_id += 1;
                self.cursor = (self.cursor + 1) % self.paths.len();
                self.live.insert(target.id, target.clone());
                return Ok(target);
            }
            candidate = add(self.random_in_fallback(rng), self.spawn_offset);
            path_index = None;
        }

        Err(SpawnError::PlacementExhausted {
            attempts: self.max_attempts,
        })
    }

    fn random_in_fallback<R: Rng>(&self, rng: &mut R) -> Vec3 {
        let r = self.fallback_range;
        Vec3::new(
            rng.gen_range(-r..=r),
            rng.gen_range(-r..=r),
            rng.gen_range(-r..=r),
        )
    }

    pub fn overlaps_live(&self, bounds: &Aabb) -> bool {
        self.live.values().any(|t| t.bounds().overlaps(bounds))
    }

    /// Move every target along its path. Returns unscored targets that reached
    /// the end of their traversal; they are removed from the pool.
    pub fn advance(&mut self, dt: f64) -> Vec<Target> {
        let mut finished = Vec::new();
        for target in self.live.values_mut() {
            target.age += dt;
            let t = (target.age / self.traversal_secs).min(1.0);
            target.position = lerp(
                target.origin,
                add(target.origin, self.path_delta),
                t,
            );
            if t >= 1.0 && !target.is_scored {
                finished.push(target.id);
            }
        }
        finished
            .into_iter()
            .filter_map(|id| self.live.remove(&id))
            .collect()
    }

    /// Returns false for unknown or already scored targets.
    pub fn mark_scored(&mut self, id: TargetId) -> bool {
        match self.live.get_mut(&id) {
            Some(t) if !t.is_scored => {
                t.is_scored = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: TargetId) -> Option<Target> {
        self.live.remove(&id)
    }

    /// Clear live targets, returning their ids. Cursor and id counter survive.
    pub fn remove_all(&mut self) -> Vec<TargetId> {
        let ids = self.live.keys().copied().collect();
        self.live.clear();
        ids
    }

    /// Full reset: the only place ids start over.
    pub fn reset(&mut self) -> Vec<TargetId> {
        let ids = self.remove_all();
        self.cursor = 0;
        self.next_id = 0;
        ids
    }

    pub fn set_traversal_secs(&mut self, secs: f64) {
        self.traversal_secs = secs;
    }

    pub fn traversal_secs(&self) -> f64 {
        self.traversal_secs
    }

    /// Velocity shared by all targets at the current traversal speed
    pub fn velocity(&self) -> Vec3 {
        scale(self.path_delta, 1.0 / self.traversal_secs)
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.live.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.live.values()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn next_id(&self) -> TargetId {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamsweep_shared::geometry::vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(12345)
    }

    /// Paths far enough apart that nothing ever overlaps
    fn spaced_paths(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| vec3(i as f64 * 10.0, 0.0, -5.0)).collect()
    }

    #[test]
    fn empty_templates_is_fatal() {
        let config = GameConfig {
            templates: vec![],
            ..Default::default()
        };
        assert_eq!(
            TargetPool::new(&config).err(),
            Some(StartupError::NoTemplates)
        );
    }

    #[test]
    fn empty_paths_is_fatal() {
        let result = TargetPool::with_paths(&GameConfig::default(), vec![]);
        assert_eq!(result.err(), Some(StartupError::NoPaths));
    }

    #[test]
    fn first_spawn_uses_first_path_with_offset() {
        let mut pool = TargetPool::new(&GameConfig::default()).unwrap();
        let target = pool.spawn_next(&mut rng()).unwrap();
        assert_eq!(target.id, 0);
        assert_eq!(target.path_index, Some(0));
        let expected = vec3(SPAWN_PATHS[0][0], SPAWN_PATHS[0][1], SPAWN_PATHS[0][2] - 0.7);
        assert_eq!(target.position, expected);
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn five_spawns_never_overlap() {
        let mut pool = TargetPool::new(&GameConfig::default()).unwrap();
        let mut r = rng();
        for _ in 0..5 {
            pool.spawn_next(&mut r).unwrap();
        }
        assert_eq!(pool.len(), 5);
        let targets: Vec<&Target> = pool.iter().collect();
        for (i, a) in targets.iter().enumerate() {
            for b in &targets[i + 1..] {
                assert!(!a.bounds().overlaps(&b.bounds()), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn cursor_cycles_back_after_path_count_spawns() {
        let config = GameConfig::default();
        let mut pool = TargetPool::with_paths(&config, spaced_paths(6)).unwrap();
        let mut r = rng();
        let start = pool.cursor();
        for i in 0..6 {
            let t = pool.spawn_next(&mut r).unwrap();
            assert_eq!(t.path_index, Some(i));
        }
        assert_eq!(pool.cursor(), start);
    }

    #[test]
    fn spawns_are_deterministic_for_same_seed() {
        let config = GameConfig::default();
        let mut a = TargetPool::with_paths(&config, spaced_paths(4)).unwrap();
        let mut b = TargetPool::with_paths(&config, spaced_paths(4)).unwrap();
        let mut ra = rng();
        let mut rb = rng();
        for _ in 0..8 {
            let ta = a.spawn_next(&mut ra).unwrap();
            let tb = b.spawn_next(&mut rb).unwrap();
            assert_eq!(ta, tb);
        }
    }

    #[test]
    fn overlap_falls_back_to_random_cube() {
        let config = GameConfig::default();
        let paths = vec![vec3(0.0, 5.0, -5.0)];
        let mut pool = TargetPool::with_paths(&config, paths).unwrap();
        let mut r = rng();

        let first = pool.spawn_next(&mut r).unwrap();
        assert_eq!(first.path_index, Some(0));

        // Same start again: must land in the fallback cube instead
        let second = pool.spawn_next(&mut r).unwrap();
        assert_eq!(second.path_index, None);
        assert!(second.position.x.abs() <= 1.0);
        assert!(second.position.y.abs() <= 1.0);
        assert!((second.position.z + 0.7).abs() <= 1.0);
        assert!(!first.bounds().overlaps(&second.bounds()));
    }

    #[test]
    fn exhausted_placement_keeps_cursor() {
        let config = GameConfig {
            max_spawn_attempts: 1,
            ..Default::default()
        };
        let paths = vec![vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, -5.0)];
        let mut pool = TargetPool::with_paths(&config, paths).unwrap();
        let mut r = rng();

        pool.spawn_next(&mut r).unwrap();
        assert_eq!(pool.cursor(), 1);

        let err = pool.spawn_next(&mut r).unwrap_err();
        assert_eq!(err, SpawnError::PlacementExhausted { attempts: 1 });
        assert_eq!(pool.cursor(), 1);
        assert_eq!(pool.next_id(), 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn live_limit_is_enforced() {
        let config = GameConfig {
            max_live_targets: 2,
            ..Default::default()
        };
        let mut pool = TargetPool::with_paths(&config, spaced_paths(5)).unwrap();
        let mut r = rng();
        pool.spawn_next(&mut r).unwrap();
        pool.spawn_next(&mut r).unwrap();
        assert_eq!(
            pool.spawn_next(&mut r).unwrap_err(),
            SpawnError::PoolFull { limit: 2 }
        );
    }

    #[test]
    fn advance_moves_along_delta_and_expires() {
        let config = GameConfig {
            traversal_secs: 2.0,
            path_delta: [0.0, 0.0, 4.0],
            ..Default::default()
        };
        let mut pool = TargetPool::with_paths(&config, spaced_paths(3)).unwrap();
        let mut r = rng();
        let t = pool.spawn_next(&mut r).unwrap();

        assert!(pool.advance(1.0).is_empty());
        let moved = pool.get(t.id).unwrap();
        assert!((moved.position.z - (t.origin.z + 2.0)).abs() < 1e-9);

        let expired = pool.advance(1.0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, t.id);
        assert!(pool.is_empty());
    }

    #[test]
    fn scored_targets_do_not_expire() {
        let config = GameConfig {
            traversal_secs: 1.0,
            ..Default::default()
        };
        let mut pool = TargetPool::with_paths(&config, spaced_paths(3)).unwrap();
        let t = pool.spawn_next(&mut rng()).unwrap();
        assert!(pool.mark_scored(t.id));
        assert!(!pool.mark_scored(t.id));
        assert!(pool.advance(5.0).is_empty());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn remove_all_keeps_ids_but_reset_restarts_them() {
        let config = GameConfig::default();
        let mut pool = TargetPool::with_paths(&config, spaced_paths(5)).unwrap();
        let mut r = rng();
        pool.spawn_next(&mut r).unwrap();
        pool.spawn_next(&mut r).unwrap();

        let removed = pool.remove_all();
        assert_eq!(removed, vec![0, 1]);
        assert!(pool.is_empty());
        assert_eq!(pool.spawn_next(&mut r).unwrap().id, 2);

        pool.reset();
        assert_eq!(pool.cursor(), 0);
        assert_eq!(pool.spawn_next(&mut r).unwrap().id, 0);
    }
}
