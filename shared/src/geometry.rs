/// 3D math for aim poses, probe volumes and target bounds.
/// Vectors are plain values; the free functions mirror the usual vector algebra.

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Shorthand constructor
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Dot product
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Cross product
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

/// Vector length
pub fn length(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// Normalize vector to unit length
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-10 {
        return Vec3::new(1.0, 0.0, 0.0);
    }
    Vec3::new(v.x / len, v.y / len, v.z / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

/// Linear interpolation, t=0 returns a, t=1 returns b.
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    add(a, scale(sub(b, a), t))
}

/// Unit quaternion (x, y, z, w).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = normalize(axis);
        let half = angle * 0.5;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    pub fn from_array(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn dot(self, other: Quat) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn neg(self) -> Quat {
        Quat::new(-self.x, -self.y, -self.z, -self.w)
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Degenerate input collapses to identity.
    pub fn normalize(self) -> Quat {
        let len = self.length();
        if len < 1e-10 || !len.is_finite() {
            return Quat::IDENTITY;
        }
        Quat::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    /// Hamilton product: applying the result rotates by `other` first, then `self`.
    pub fn mul(self, other: Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = scale(cross(u, v), 2.0);
        add(add(v, scale(t, self.w)), cross(u, t))
    }
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Map a point from pose-local space into the parent space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        add(self.position, self.rotation.rotate(local))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn min(&self) -> Vec3 {
        sub(self.center, self.half_extents)
    }

    pub fn max(&self) -> Vec3 {
        add(self.center, self.half_extents)
    }

    /// Touching faces do not count as overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center.x - other.center.x).abs() < self.half_extents.x + other.half_extents.x
            && (self.center.y - other.center.y).abs() < self.half_extents.y + other.half_extents.y
            && (self.center.z - other.center.z).abs() < self.half_extents.z + other.half_extents.z
    }

    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let lo = self.min();
        let hi = self.max();
        Vec3::new(
            p.x.clamp(lo.x, hi.x),
            p.y.clamp(lo.y, hi.y),
            p.z.clamp(lo.z, hi.z),
        )
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let d = sub(aabb.closest_point(self.center), self.center);
        dot(d, d) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
        length(sub(a, b)) < EPSILON
    }

    #[test]
    fn cross_of_basis_vectors() {
        let z = cross(vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0));
        assert!(vec_approx_eq(z, vec3(0.0, 0.0, 1.0)));
    }

    #[test]
    fn normalize_zero_vector_falls_back() {
        let n = normalize(Vec3::ZERO);
        assert!(approx_eq(length(n), 1.0));
    }

    #[test]
    fn lerp_midpoint() {
        let m = lerp(vec3(0.0, 0.0, 0.0), vec3(2.0, -4.0, 6.0), 0.5);
        assert!(vec_approx_eq(m, vec3(1.0, -2.0, 3.0)));
    }

    // --- quaternions ---

    #[test]
    fn identity_rotation_is_noop() {
        let v = vec3(0.3, -1.2, 4.0);
        assert!(vec_approx_eq(Quat::IDENTITY.rotate(v), v));
    }

    #[test]
    fn quarter_turn_about_y_maps_forward_to_left() {
        // -Z rotated +90 degrees around +Y ends up at -X
        let q = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI / 2.0);
        let r = q.rotate(vec3(0.0, 0.0, -1.0));
        assert!(vec_approx_eq(r, vec3(-1.0, 0.0, 0.0)), "got {:?}", r);
    }

    #[test]
    fn quarter_turn_about_x_pitches_forward_up() {
        let q = Quat::from_axis_angle(vec3(1.0, 0.0, 0.0), PI / 2.0);
        let r = q.rotate(vec3(0.0, 0.0, -1.0));
        assert!(vec_approx_eq(r, vec3(0.0, 1.0, 0.0)), "got {:?}", r);
    }

    #[test]
    fn mul_applies_right_operand_first() {
        let yaw = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI / 2.0);
        let pitch = Quat::from_axis_angle(vec3(1.0, 0.0, 0.0), PI / 2.0);
        let v = vec3(0.0, 0.0, -1.0);
        let combined = yaw.mul(pitch).rotate(v);
        let stepwise = yaw.rotate(pitch.rotate(v));
        assert!(vec_approx_eq(combined, stepwise));
    }

    #[test]
    fn normalize_degenerate_quat_is_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
        let q = Quat::new(0.0, 2.0, 0.0, 0.0).normalize();
        assert!(approx_eq(q.length(), 1.0));
    }

    #[test]
    fn pose_transform_point() {
        let pose = Pose::new(
            vec3(1.0, 2.0, 3.0),
            Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI),
        );
        let p = pose.transform_point(vec3(0.0, 0.0, -1.0));
        assert!(vec_approx_eq(p, vec3(1.0, 2.0, 4.0)), "got {:?}", p);
    }

    // --- bounds ---

    #[test]
    fn aabb_overlap_and_separation() {
        let a = Aabb::new(vec3(0.0, 0.0, 0.0), vec3(0.5, 0.5, 0.5));
        let b = Aabb::new(vec3(0.9, 0.0, 0.0), vec3(0.5, 0.5, 0.5));
        let c = Aabb::new(vec3(1.0, 0.0, 0.0), vec3(0.5, 0.5, 0.5));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c), "touching faces are not an overlap");
    }

    #[test]
    fn sphere_hits_box_corner_region() {
        let b = Aabb::new(vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0));
        assert!(Sphere::new(vec3(0.0, 0.0, 0.0), 0.1).intersects_aabb(&b));
        assert!(Sphere::new(vec3(1.5, 0.0, 0.0), 0.6).intersects_aabb(&b));
        // Diagonal distance from (1,1,1) to (1.5,1.5,1.5) is ~0.866
        assert!(!Sphere::new(vec3(1.5, 1.5, 1.5), 0.8).intersects_aabb(&b));
        assert!(Sphere::new(vec3(1.5, 1.5, 1.5), 0.9).intersects_aabb(&b));
    }
}
