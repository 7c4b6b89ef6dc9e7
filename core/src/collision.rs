use beamsweep_shared::geometry::Sphere;

use crate::hit_registry::HitRegistry;
use crate::target_pool::{TargetId, TargetPool};

/// Turns probe contacts into scoring decisions via the hit registry.
pub struct CollisionResolver {
    static_shapes: Vec<Sphere>,
    min_hits: u32,
}

impl CollisionResolver {
    pub fn new(min_hits: u32) -> Self {
        Self {
            static_shapes: Vec::new(),
            min_hits,
        }
    }

    /// Extra hit-test volumes checked alongside the probe while emitting.
    pub fn add_static_shape(&mut self, shape: Sphere) {
        self.static_shapes.push(shape);
    }

    pub fn clear_static_shapes(&mut self) {
        self.static_shapes.clear();
    }

    pub fn static_shapes(&self) -> &[Sphere] {
        &self.static_shapes
    }

    /// Test the probe and static shapes against every live, unscored target.
    /// Each target counts at most one contact per call. Returns the ids that
    /// just crossed the hit threshold, in id order.
    pub fn resolve(
        &self,
        probe: &Sphere,
        pool: &TargetPool,
        hits: &mut HitRegistry,
    ) -> Vec<TargetId> {
        let mut to_score = Vec::new();
        for target in pool.iter().filter(|t| !t.is_scored) {
            let bounds = target.bounds();
            let touched = probe.intersects_aabb(&bounds)
                || self.static_shapes.iter().any(|s| s.intersects_aabb(&bounds));
            if touched && hits.record_collision(target.id, self.min_hits) {
                to_score.push(target.id);
            }
        }
        to_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamsweep_shared::config::GameConfig;
    use beamsweep_shared::geometry::{vec3, Vec3};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(paths: Vec<Vec3>) -> (TargetPool, HitRegistry) {
        let mut pool = TargetPool::with_paths(&GameConfig::default(), paths.clone()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..paths.len() {
            pool.spawn_next(&mut rng).unwrap();
        }
        (pool, HitRegistry::new())
    }

    fn target_center(pool: &TargetPool, id: TargetId) -> Vec3 {
        pool.get(id).unwrap().position
    }

    #[test]
    fn probe_inside_target_scores_once() {
        let (pool, mut hits) = setup(vec![vec3(0.0, 0.0, -5.0), vec3(5.0, 0.0, -5.0)]);
        let resolver = CollisionResolver::new(1);
        let probe = Sphere::new(target_center(&pool, 0), 0.1);

        assert_eq!(resolver.resolve(&probe, &pool, &mut hits), vec![0]);
        // Marking is the caller's job; once marked, contacts no longer qualify
        hits.mark_scored(0);
        assert!(resolver.resolve(&probe, &pool, &mut hits).is_empty());
        assert_eq!(hits.get(0).map(|e| e.hit_count), Some(2));
    }

    #[test]
    fn miss_records_nothing() {
        let (pool, mut hits) = setup(vec![vec3(0.0, 0.0, -5.0)]);
        let resolver = CollisionResolver::new(1);
        let probe = Sphere::new(vec3(0.0, 10.0, 0.0), 0.5);
        assert!(resolver.resolve(&probe, &pool, &mut hits).is_empty());
        assert!(hits.is_empty());
    }

    #[test]
    fn scored_targets_are_skipped() {
        let (mut pool, mut hits) = setup(vec![vec3(0.0, 0.0, -5.0)]);
        pool.mark_scored(0);
        let resolver = CollisionResolver::new(1);
        let probe = Sphere::new(target_center(&pool, 0), 0.1);
        assert!(resolver.resolve(&probe, &pool, &mut hits).is_empty());
        assert!(hits.get(0).is_none());
    }

    #[test]
    fn static_shape_hits_count_once_per_call() {
        let (pool, mut hits) = setup(vec![vec3(0.0, 0.0, -5.0), vec3(5.0, 0.0, -5.0)]);
        let mut resolver = CollisionResolver::new(3);
        let center = target_center(&pool, 1);
        resolver.add_static_shape(Sphere::new(center, 0.2));
        let probe = Sphere::new(center, 0.1);

        // Probe and static shape overlap the same target: one contact
        assert!(resolver.resolve(&probe, &pool, &mut hits).is_empty());
        assert_eq!(hits.get(1).map(|e| e.hit_count), Some(1));
    }

    #[test]
    fn multiple_targets_in_one_tick() {
        let (pool, mut hits) = setup(vec![vec3(0.0, 0.0, -5.0), vec3(0.3, 0.0, -5.0)]);
        let resolver = CollisionResolver::new(1);
        let probe = Sphere::new(vec3(0.15, 0.0, -5.7), 0.5);
        assert_eq!(resolver.resolve(&probe, &pool, &mut hits), vec![0, 1]);
    }
}
