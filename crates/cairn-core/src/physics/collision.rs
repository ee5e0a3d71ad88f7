// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Narrow Phase
//!
//! Exact contact generation between pairs of geometries. Routines are selected
//! through a `GeometryKind × GeometryKind` dispatch table; each routine is
//! written once for one ordering and the mirrored entry reuses it with the
//! normal reversed.
//!
//! Every routine reports contacts whose separation is at most the speculative
//! `margin`, so the solver can stop fast bodies before they tunnel.

use crate::math::{Mat3, Pose, Vec3, EPSILON};

use super::contact::{ContactManifold, ContactPoint, MAX_MANIFOLD_POINTS};
use super::geometry::{Geometry, GeometryKind};

/// Signature shared by every pairwise collision routine.
///
/// Returns a manifold whose normal points from the first geometry to the second.
pub type CollisionRoutine = fn(&Geometry, &Pose, &Geometry, &Pose, f32) -> Option<ContactManifold>;

#[derive(Clone, Copy)]
enum Dispatch {
    Direct(CollisionRoutine),
    Mirrored(CollisionRoutine),
    Unsupported,
}

const DISPATCH: [[Dispatch; GeometryKind::COUNT]; GeometryKind::COUNT] = [
    // Box vs (Box, Sphere, Plane)
    [
        Dispatch::Direct(box_box),
        Dispatch::Mirrored(sphere_box),
        Dispatch::Direct(box_plane),
    ],
    // Sphere vs (Box, Sphere, Plane)
    [
        Dispatch::Direct(sphere_box),
        Dispatch::Direct(sphere_sphere),
        Dispatch::Direct(sphere_plane),
    ],
    // Plane vs (Box, Sphere, Plane)
    [
        Dispatch::Mirrored(box_plane),
        Dispatch::Mirrored(sphere_plane),
        Dispatch::Unsupported,
    ],
];

/// Pairwise contact generation driven by the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowPhase {
    margin: f32,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new(0.02)
    }
}

impl NarrowPhase {
    /// Creates a narrow phase that reports contacts separated by at most `margin`.
    pub fn new(margin: f32) -> Self {
        Self {
            margin: margin.max(0.0),
        }
    }

    /// The speculative contact margin.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Returns `true` if the table has a routine for this pair of kinds.
    pub fn supports(a: GeometryKind, b: GeometryKind) -> bool {
        !matches!(DISPATCH[a.index()][b.index()], Dispatch::Unsupported)
    }

    /// Tests two placed geometries and returns their contact manifold, if any.
    /// The normal points from `a` towards `b`.
    pub fn collide(
        &self,
        a: &Geometry,
        pose_a: &Pose,
        b: &Geometry,
        pose_b: &Pose,
    ) -> Option<ContactManifold> {
        match DISPATCH[a.kind().index()][b.kind().index()] {
            Dispatch::Direct(routine) => routine(a, pose_a, b, pose_b, self.margin),
            Dispatch::Mirrored(routine) => {
                routine(b, pose_b, a, pose_a, self.margin).map(ContactManifold::flipped)
            }
            Dispatch::Unsupported => None,
        }
    }
}

/// Outward normal and a point on the surface of a plane placed at `pose`.
#[inline]
fn plane_frame(pose: &Pose) -> (Vec3, Vec3) {
    (pose.transform_vector(Vec3::X), pose.position)
}

/// Sphere against sphere.
pub fn sphere_sphere(
    a: &Geometry,
    pose_a: &Pose,
    b: &Geometry,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let (Geometry::Sphere { radius: ra }, Geometry::Sphere { radius: rb }) = (*a, *b) else {
        return None;
    };
    let delta = pose_b.position - pose_a.position;
    let separation = delta.length() - ra - rb;
    if separation > margin {
        return None;
    }
    // Coincident centres have no preferred direction.
    let normal = delta.try_normalize().unwrap_or(Vec3::Y);
    let on_a = pose_a.position + normal * ra;
    let on_b = pose_b.position - normal * rb;
    Some(ContactManifold::single(
        normal,
        (on_a + on_b) * 0.5,
        -separation,
    ))
}

/// Sphere against box.
pub fn sphere_box(
    a: &Geometry,
    pose_a: &Pose,
    b: &Geometry,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let (Geometry::Sphere { radius }, Geometry::Box { half_extents: h }) = (*a, *b) else {
        return None;
    };
    let center = pose_b.inverse_transform_point(pose_a.position);
    let closest = Vec3::new(
        center.x.clamp(-h.x, h.x),
        center.y.clamp(-h.y, h.y),
        center.z.clamp(-h.z, h.z),
    );
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > EPSILON * EPSILON {
        let dist = dist_sq.sqrt();
        let separation = dist - radius;
        if separation > margin {
            return None;
        }
        let normal = -pose_b.transform_vector(delta / dist);
        let on_box = pose_b.transform_point(closest);
        let on_sphere = pose_a.position + normal * radius;
        return Some(ContactManifold::single(
            normal,
            (on_box + on_sphere) * 0.5,
            -separation,
        ));
    }

    // Centre inside the box: push out through the nearest face.
    let mut axis = 0;
    let mut face_distance = f32::INFINITY;
    for i in 0..3 {
        let d = h[i] - center[i].abs();
        if d < face_distance {
            face_distance = d;
            axis = i;
        }
    }
    let sign = if center[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut local_normal = Vec3::ZERO;
    local_normal[axis] = sign;
    let mut face_point = center;
    face_point[axis] = sign * h[axis];
    Some(ContactManifold::single(
        -pose_b.transform_vector(local_normal),
        pose_b.transform_point(face_point),
        radius + face_distance,
    ))
}

/// Sphere against plane.
pub fn sphere_plane(
    a: &Geometry,
    pose_a: &Pose,
    b: &Geometry,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let (Geometry::Sphere { radius }, Geometry::Plane) = (*a, *b) else {
        return None;
    };
    let (n, origin) = plane_frame(pose_b);
    let dist = n.dot(pose_a.position - origin);
    let separation = dist - radius;
    if separation > margin {
        return None;
    }
    let point = pose_a.position - n * ((dist + radius) * 0.5);
    Some(ContactManifold::single(-n, point, -separation))
}

/// Box against plane: every corner within the margin becomes a contact point.
pub fn box_plane(
    a: &Geometry,
    pose_a: &Pose,
    b: &Geometry,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let (Geometry::Box { half_extents: h }, Geometry::Plane) = (*a, *b) else {
        return None;
    };
    let (n, origin) = plane_frame(pose_b);
    let mut points = Vec::with_capacity(8);
    for corner in 0..8 {
        let local = Vec3::new(
            if corner & 1 == 0 { -h.x } else { h.x },
            if corner & 2 == 0 { -h.y } else { h.y },
            if corner & 4 == 0 { -h.z } else { h.z },
        );
        let world = pose_a.transform_point(local);
        let dist = n.dot(world - origin);
        if dist <= margin {
            points.push(ContactPoint {
                position: world - n * (dist * 0.5),
                depth: -dist,
            });
        }
    }
    if points.is_empty() {
        return None;
    }
    Some(ContactManifold {
        normal: -n,
        points: reduce_points(points),
    })
}

// --- Box against box (separating axis test + face clipping) ---

const FACE_RELATIVE_TOLERANCE: f32 = 0.98;
const FACE_ABSOLUTE_TOLERANCE: f32 = 0.001;
const EDGE_RELATIVE_TOLERANCE: f32 = 0.95;
const EDGE_ABSOLUTE_TOLERANCE: f32 = 0.01;

#[derive(Clone, Copy)]
struct OrientedBox {
    center: Vec3,
    axes: [Vec3; 3],
    half: Vec3,
}

impl OrientedBox {
    fn new(half: Vec3, pose: &Pose) -> Self {
        Self {
            center: pose.position,
            axes: Mat3::from_quat(pose.orientation).cols,
            half,
        }
    }

    /// Half the length of the box's projection onto `axis`.
    #[inline]
    fn projected_radius(&self, axis: Vec3) -> f32 {
        (0..3)
            .map(|i| self.half[i] * self.axes[i].dot(axis).abs())
            .sum()
    }
}

#[derive(Clone, Copy)]
enum Feature {
    FaceA(usize),
    FaceB(usize),
    Edges(usize, usize),
}

#[derive(Clone, Copy)]
struct AxisCandidate {
    separation: f32,
    axis: Vec3,
    feature: Feature,
}

impl AxisCandidate {
    const NONE: Self = Self {
        separation: f32::NEG_INFINITY,
        axis: Vec3::ZERO,
        feature: Feature::FaceA(0),
    };
}

/// Box against box.
pub fn box_box(
    a: &Geometry,
    pose_a: &Pose,
    b: &Geometry,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let (Geometry::Box { half_extents: ha }, Geometry::Box { half_extents: hb }) = (*a, *b) else {
        return None;
    };
    let box_a = OrientedBox::new(ha, pose_a);
    let box_b = OrientedBox::new(hb, pose_b);
    let offset = box_b.center - box_a.center;

    let separation_along = |axis: Vec3| {
        offset.dot(axis).abs() - (box_a.projected_radius(axis) + box_b.projected_radius(axis))
    };

    let mut best_a = AxisCandidate::NONE;
    let mut best_b = AxisCandidate::NONE;
    let mut best_edge = AxisCandidate::NONE;

    for i in 0..3 {
        let axis = box_a.axes[i];
        let separation = separation_along(axis);
        if separation > margin {
            return None;
        }
        if separation > best_a.separation {
            best_a = AxisCandidate {
                separation,
                axis,
                feature: Feature::FaceA(i),
            };
        }
    }
    for j in 0..3 {
        let axis = box_b.axes[j];
        let separation = separation_along(axis);
        if separation > margin {
            return None;
        }
        if separation > best_b.separation {
            best_b = AxisCandidate {
                separation,
                axis,
                feature: Feature::FaceB(j),
            };
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            // Parallel edges give no new axis.
            let Some(axis) = box_a.axes[i].cross(box_b.axes[j]).try_normalize() else {
                continue;
            };
            let separation = separation_along(axis);
            if separation > margin {
                return None;
            }
            if separation > best_edge.separation {
                best_edge = AxisCandidate {
                    separation,
                    axis,
                    feature: Feature::Edges(i, j),
                };
            }
        }
    }

    // Prefer faces of A, then faces of B, then edges, unless a later feature
    // is clearly better.
    let mut best = best_a;
    if best_b.separation > FACE_RELATIVE_TOLERANCE * best.separation + FACE_ABSOLUTE_TOLERANCE {
        best = best_b;
    }
    if best_edge.separation > EDGE_RELATIVE_TOLERANCE * best.separation + EDGE_ABSOLUTE_TOLERANCE {
        best = best_edge;
    }

    let normal = if offset.dot(best.axis) < 0.0 {
        -best.axis
    } else {
        best.axis
    };

    let points = match best.feature {
        Feature::FaceA(i) => clip_incident_face(&box_a, &box_b, i, normal, margin),
        Feature::FaceB(j) => clip_incident_face(&box_b, &box_a, j, -normal, margin),
        Feature::Edges(i, j) => {
            vec![edge_contact(&box_a, &box_b, i, j, normal, best.separation)]
        }
    };
    if points.is_empty() {
        return None;
    }
    Some(ContactManifold {
        normal,
        points: reduce_points(points),
    })
}

/// Clips the face of `incident` most opposed to `ref_normal` against the side
/// planes of the reference face `ref_axis` of `reference`.
fn clip_incident_face(
    reference: &OrientedBox,
    incident: &OrientedBox,
    ref_axis: usize,
    ref_normal: Vec3,
    margin: f32,
) -> Vec<ContactPoint> {
    let mut k = 0;
    let mut best_alignment = f32::NEG_INFINITY;
    for i in 0..3 {
        let alignment = incident.axes[i].dot(ref_normal).abs();
        if alignment > best_alignment {
            best_alignment = alignment;
            k = i;
        }
    }
    let facing = if incident.axes[k].dot(ref_normal) > 0.0 {
        -1.0
    } else {
        1.0
    };
    let face_center = incident.center + incident.axes[k] * (facing * incident.half[k]);
    let u = incident.axes[(k + 1) % 3] * incident.half[(k + 1) % 3];
    let v = incident.axes[(k + 2) % 3] * incident.half[(k + 2) % 3];
    let mut polygon = vec![
        face_center + u + v,
        face_center - u + v,
        face_center - u - v,
        face_center + u - v,
    ];

    for side in [(ref_axis + 1) % 3, (ref_axis + 2) % 3] {
        let axis = reference.axes[side];
        let center = axis.dot(reference.center);
        let extent = reference.half[side];
        polygon = clip_polygon(&polygon, axis, center + extent);
        polygon = clip_polygon(&polygon, -axis, -center + extent);
        if polygon.is_empty() {
            return Vec::new();
        }
    }

    let face_offset = ref_normal.dot(reference.center) + reference.half[ref_axis];
    polygon
        .into_iter()
        .filter_map(|p| {
            let separation = ref_normal.dot(p) - face_offset;
            (separation <= margin).then(|| ContactPoint {
                position: p - ref_normal * (separation * 0.5),
                depth: -separation,
            })
        })
        .collect()
}

/// Keeps the part of `polygon` on the side `normal · p <= offset` (Sutherland–Hodgman).
fn clip_polygon(polygon: &[Vec3], normal: Vec3, offset: f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    let Some(&last) = polygon.last() else {
        return out;
    };
    let mut prev = last;
    let mut prev_dist = normal.dot(prev) - offset;
    for &current in polygon {
        let dist = normal.dot(current) - offset;
        if dist <= 0.0 {
            if prev_dist > 0.0 {
                out.push(prev + (current - prev) * (prev_dist / (prev_dist - dist)));
            }
            out.push(current);
        } else if prev_dist <= 0.0 {
            out.push(prev + (current - prev) * (prev_dist / (prev_dist - dist)));
        }
        prev = current;
        prev_dist = dist;
    }
    out
}

/// Contact point between the closest pair of edges along the separating edge axis.
fn edge_contact(
    box_a: &OrientedBox,
    box_b: &OrientedBox,
    i: usize,
    j: usize,
    normal: Vec3,
    separation: f32,
) -> ContactPoint {
    let mut on_a = box_a.center;
    let mut on_b = box_b.center;
    for k in 0..3 {
        if k != i {
            let s = if box_a.axes[k].dot(normal) > 0.0 { 1.0 } else { -1.0 };
            on_a += box_a.axes[k] * (s * box_a.half[k]);
        }
        if k != j {
            let s = if box_b.axes[k].dot(normal) > 0.0 { -1.0 } else { 1.0 };
            on_b += box_b.axes[k] * (s * box_b.half[k]);
        }
    }

    let dir_a = box_a.axes[i];
    let dir_b = box_b.axes[j];
    let r = on_a - on_b;
    let b = dir_a.dot(dir_b);
    let c = dir_a.dot(r);
    let f = dir_b.dot(r);
    let denom = 1.0 - b * b;
    let mut s = if denom > EPSILON { (b * f - c) / denom } else { 0.0 };
    s = s.clamp(-box_a.half[i], box_a.half[i]);
    let t = (b * s + f).clamp(-box_b.half[j], box_b.half[j]);
    s = (b * t - c).clamp(-box_a.half[i], box_a.half[i]);

    let p = on_a + dir_a * s;
    let q = on_b + dir_b * t;
    ContactPoint {
        position: (p + q) * 0.5,
        depth: -separation,
    }
}

/// Reduces a point cloud to at most [`MAX_MANIFOLD_POINTS`], keeping the
/// deepest point and then greedily the points that spread the patch widest.
fn reduce_points(mut points: Vec<ContactPoint>) -> Vec<ContactPoint> {
    if points.len() <= MAX_MANIFOLD_POINTS {
        return points;
    }
    let mut chosen = Vec::with_capacity(MAX_MANIFOLD_POINTS);
    let deepest = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
        .map_or(0, |(index, _)| index);
    chosen.push(points.swap_remove(deepest));

    while chosen.len() < MAX_MANIFOLD_POINTS && !points.is_empty() {
        let next = points
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let spread = chosen
                    .iter()
                    .map(|c: &ContactPoint| (c.position - candidate.position).length_squared())
                    .fold(f32::INFINITY, f32::min);
                (index, spread)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(index, _)| index);
        chosen.push(points.swap_remove(next));
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quaternion;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    fn at(x: f32, y: f32, z: f32) -> Pose {
        Pose::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn narrow_phases_compare_by_margin() {
        assert_eq!(NarrowPhase::default(), NarrowPhase::new(0.02));
        assert_ne!(NarrowPhase::new(0.05), NarrowPhase::default());
        // Negative margins are clamped to zero.
        assert_eq!(NarrowPhase::new(-1.0), NarrowPhase::new(0.0));
    }

    fn ground() -> Pose {
        // +X of the plane frame mapped onto world +Y.
        Pose::new(Vec3::ZERO, Quaternion::from_rotation_arc(Vec3::X, Vec3::Y))
    }

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-4);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-4);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-4);
    }

    #[test]
    fn overlapping_spheres() {
        let np = NarrowPhase::new(0.0);
        let m = np
            .collide(
                &Geometry::sphere(1.0),
                &at(0.0, 0.0, 0.0),
                &Geometry::sphere(1.0),
                &at(1.5, 0.0, 0.0),
            )
            .unwrap();
        assert_vec_eq(m.normal, Vec3::X);
        assert_relative_eq!(m.points[0].depth, 0.5, epsilon = 1e-5);
        assert_vec_eq(m.points[0].position, Vec3::new(0.75, 0.0, 0.0));
    }

    #[test]
    fn separated_spheres_outside_margin() {
        let np = NarrowPhase::new(0.1);
        let a = Geometry::sphere(1.0);
        assert!(np.collide(&a, &at(0.0, 0.0, 0.0), &a, &at(2.2, 0.0, 0.0)).is_none());
        let speculative = np.collide(&a, &at(0.0, 0.0, 0.0), &a, &at(2.05, 0.0, 0.0));
        assert!(speculative.unwrap().points[0].depth < 0.0);
    }

    #[test]
    fn sphere_resting_on_plane() {
        let np = NarrowPhase::new(0.0);
        let m = np
            .collide(
                &Geometry::sphere(1.0),
                &at(3.0, 0.9, 0.0),
                &Geometry::Plane,
                &ground(),
            )
            .unwrap();
        assert_vec_eq(m.normal, -Vec3::Y);
        assert_relative_eq!(m.points[0].depth, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn box_on_plane_yields_four_corners() {
        let np = NarrowPhase::default();
        let m = np
            .collide(&Geometry::cube(2.0), &at(0.0, 1.99, 0.0), &Geometry::Plane, &ground())
            .unwrap();
        assert_eq!(m.points.len(), 4);
        for p in &m.points {
            assert_relative_eq!(p.depth, 0.01, epsilon = 1e-4);
        }
    }

    #[test]
    fn plane_first_mirrors_normal() {
        let np = NarrowPhase::default();
        let box_first = np
            .collide(&Geometry::cube(1.0), &at(0.0, 0.5, 0.0), &Geometry::Plane, &ground())
            .unwrap();
        let plane_first = np
            .collide(&Geometry::Plane, &ground(), &Geometry::cube(1.0), &at(0.0, 0.5, 0.0))
            .unwrap();
        assert_vec_eq(plane_first.normal, -box_first.normal);
        assert_eq!(plane_first.points, box_first.points);
        assert!(!NarrowPhase::supports(GeometryKind::Plane, GeometryKind::Plane));
    }

    #[test]
    fn sphere_touching_box_face() {
        let np = NarrowPhase::new(0.0);
        let m = np
            .collide(
                &Geometry::sphere(0.5),
                &at(0.0, 1.4, 0.0),
                &Geometry::cube(1.0),
                &at(0.0, 0.0, 0.0),
            )
            .unwrap();
        assert_vec_eq(m.normal, -Vec3::Y);
        assert_relative_eq!(m.points[0].depth, 0.1, epsilon = 1e-5);

        let mirrored = np
            .collide(
                &Geometry::cube(1.0),
                &at(0.0, 0.0, 0.0),
                &Geometry::sphere(0.5),
                &at(0.0, 1.4, 0.0),
            )
            .unwrap();
        assert_vec_eq(mirrored.normal, Vec3::Y);
    }

    #[test]
    fn sphere_centre_inside_box() {
        let np = NarrowPhase::new(0.0);
        let m = np
            .collide(
                &Geometry::sphere(0.5),
                &at(0.8, 0.0, 0.0),
                &Geometry::cube(1.0),
                &at(0.0, 0.0, 0.0),
            )
            .unwrap();
        assert_vec_eq(m.normal, -Vec3::X);
        assert_relative_eq!(m.points[0].depth, 0.7, epsilon = 1e-5);
    }

    #[test]
    fn stacked_boxes_produce_a_face_manifold() {
        let np = NarrowPhase::default();
        let cube = Geometry::cube(2.0);
        let m = np
            .collide(&cube, &at(0.0, 2.0, 0.0), &cube, &at(0.5, 5.95, 0.0))
            .unwrap();
        assert_vec_eq(m.normal, Vec3::Y);
        assert_eq!(m.points.len(), 4);
        for p in &m.points {
            assert_relative_eq!(p.depth, 0.05, epsilon = 1e-4);
            assert!(p.position.x >= -1.5 - 1e-4 && p.position.x <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn side_by_side_boxes_touch_with_zero_depth() {
        let np = NarrowPhase::default();
        let cube = Geometry::cube(2.0);
        let m = np
            .collide(&cube, &at(-2.0, 2.0, 0.0), &cube, &at(2.0, 2.0, 0.0))
            .unwrap();
        assert_vec_eq(m.normal, Vec3::X);
        assert!(m.points.iter().all(|p| p.depth.abs() < 1e-4));
    }

    #[test]
    fn crossed_boxes_meet_edge_to_edge() {
        let np = NarrowPhase::default();
        let bar = Geometry::cuboid(2.0, 0.5, 0.5);
        // Two bars rotated 45° about their long axes, crossed at right angles.
        let lower = Pose::new(
            Vec3::ZERO,
            Quaternion::from_axis_angle(Vec3::X, FRAC_PI_4),
        );
        let upper_rotation = Quaternion::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_2)
            * Quaternion::from_axis_angle(Vec3::X, FRAC_PI_4);
        let reach = 0.5 * std::f32::consts::SQRT_2;
        let upper = Pose::new(Vec3::new(0.0, 2.0 * reach - 0.05, 0.0), upper_rotation);
        let m = np.collide(&bar, &lower, &bar, &upper).unwrap();
        assert_eq!(m.points.len(), 1);
        assert_vec_eq(m.normal, Vec3::Y);
        assert_relative_eq!(m.points[0].depth, 0.05, epsilon = 1e-3);
        assert_vec_eq(m.points[0].position, Vec3::new(0.0, reach - 0.025, 0.0));
    }

    #[test]
    fn distant_boxes_do_not_collide() {
        let np = NarrowPhase::default();
        let cube = Geometry::cube(1.0);
        assert!(np
            .collide(&cube, &at(0.0, 0.0, 0.0), &cube, &at(0.0, 0.0, 2.5))
            .is_none());
    }

    #[test]
    fn reduction_keeps_deepest_point() {
        let points: Vec<ContactPoint> = (0..8)
            .map(|i| ContactPoint {
                position: Vec3::new(i as f32, 0.0, (i % 2) as f32),
                depth: if i == 5 { 1.0 } else { 0.1 },
            })
            .collect();
        let reduced = reduce_points(points);
        assert_eq!(reduced.len(), MAX_MANIFOLD_POINTS);
        assert_eq!(reduced[0].depth, 1.0);
    }
}
