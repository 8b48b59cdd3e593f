//! Collision detection.
//!
//! Broad phase rejects pairs whose bounding spheres (or sphere and plane) do
//! not touch. Narrow phase produces contact points:
//! - polyhedron vs plane: every vertex below the plane
//! - polyhedron vs polyhedron (the die against box walls): separating-axis test
//!   over face normals of both hulls and cross products of their edge
//!   directions; contact points are vertices of either hull lying inside the
//!   other, with the deepest support vertex as fallback for edge-edge hits

use crate::body::{BodyId, RigidBody};
use crate::math::{Point3, Real, Vector3};
use crate::shape::{Polyhedron, Shape};

/// Slack used when testing whether a vertex lies inside the other hull.
const CONTAINMENT_TOLERANCE: Real = 1e-3;

/// Edge axes must beat the best face axis by this factor to be picked.
/// Face contacts are far more stable, so near-ties go to the face.
const EDGE_AXIS_PREFERENCE: Real = 0.95;

/// A contact point between two bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space contact point.
    pub point: Point3<Real>,
    /// Unit normal pointing from `body_b` toward `body_a`: the direction `a` must move.
    pub normal: Vector3<Real>,
    /// Penetration depth, positive when overlapping.
    pub depth: Real,
}

impl Contact {
    /// Swap the bodies and invert the normal.
    #[inline]
    pub fn flip(mut self) -> Self {
        self.normal = -self.normal;
        std::mem::swap(&mut self.body_a, &mut self.body_b);
        self
    }
}

/// Scratch buffers reused across steps so narrow phase does not allocate once warm.
#[derive(Debug, Default)]
pub(crate) struct NarrowPhase {
    verts_a: Vec<Point3<Real>>,
    verts_b: Vec<Point3<Real>>,
}

/// Cheap rejection test on bounding volumes.
pub fn broad_phase_overlap(a: &RigidBody, b: &RigidBody) -> bool {
    match (a.shape().bounding_radius(), b.shape().bounding_radius()) {
        (Some(ra), Some(rb)) => {
            let reach = ra + rb;
            (a.position - b.position).norm_squared() <= reach * reach
        }
        (Some(r), None) => sphere_near_plane(a, r, b),
        (None, Some(r)) => sphere_near_plane(b, r, a),
        (None, None) => false,
    }
}

fn sphere_near_plane(sphere: &RigidBody, radius: Real, plane: &RigidBody) -> bool {
    match plane.shape().as_ref() {
        Shape::Plane { normal } => {
            let n = plane.orientation * normal.into_inner();
            n.dot(&(sphere.position - plane.position)) < radius
        }
        _ => true,
    }
}

impl NarrowPhase {
    /// Append contacts between `a` and `b` to `out`; returns how many were added.
    ///
    /// Normals of the appended contacts point toward `a`.
    pub(crate) fn collide(
        &mut self,
        ia: BodyId,
        a: &RigidBody,
        ib: BodyId,
        b: &RigidBody,
        out: &mut Vec<Contact>,
    ) -> usize {
        match (a.shape().as_ref(), b.shape().as_ref()) {
            (_, Shape::Plane { normal }) => match a.shape().hull() {
                Some(hull) => self.hull_plane(ia, a, hull, ib, b, &normal.into_inner(), out),
                None => 0,
            },
            (Shape::Plane { normal }, _) => match b.shape().hull() {
                Some(hull) => {
                    let start = out.len();
                    let n = self.hull_plane(ib, b, hull, ia, a, &normal.into_inner(), out);
                    for c in &mut out[start..] {
                        *c = c.clone().flip();
                    }
                    n
                }
                None => 0,
            },
            _ => match (a.shape().hull(), b.shape().hull()) {
                (Some(ha), Some(hb)) => self.hull_hull(ia, a, ha, ib, b, hb, out),
                _ => 0,
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn hull_plane(
        &mut self,
        ia: BodyId,
        a: &RigidBody,
        hull: &Polyhedron,
        ib: BodyId,
        plane: &RigidBody,
        normal_local: &Vector3<Real>,
        out: &mut Vec<Contact>,
    ) -> usize {
        let n = plane.orientation * normal_local;
        let offset = n.dot(&plane.position.coords);
        to_world(hull, a, &mut self.verts_a);

        let start = out.len();
        for v in &self.verts_a {
            let dist = n.dot(&v.coords) - offset;
            if dist < 0.0 {
                out.push(Contact {
                    body_a: ia,
                    body_b: ib,
                    point: *v,
                    normal: n,
                    depth: -dist,
                });
            }
        }
        out.len() - start
    }

    #[allow(clippy::too_many_arguments)]
    fn hull_hull(
        &mut self,
        ia: BodyId,
        a: &RigidBody,
        hull_a: &Polyhedron,
        ib: BodyId,
        b: &RigidBody,
        hull_b: &Polyhedron,
        out: &mut Vec<Contact>,
    ) -> usize {
        to_world(hull_a, a, &mut self.verts_a);
        to_world(hull_b, b, &mut self.verts_b);
        let (va, vb) = (&self.verts_a, &self.verts_b);

        let mut best: Option<(Vector3<Real>, Real)> = None;
        let face_axes = hull_a
            .face_normals()
            .iter()
            .map(|n| a.orientation * n)
            .chain(hull_b.face_normals().iter().map(|n| b.orientation * n));
        for axis in face_axes {
            match overlap_on_axis(&axis, va, vb) {
                None => return 0,
                Some((n, depth)) => {
                    if best.map_or(true, |(_, d)| depth < d) {
                        best = Some((n, depth));
                    }
                }
            }
        }

        for ea in hull_a.edge_directions() {
            let ea = a.orientation * ea;
            for eb in hull_b.edge_directions() {
                let axis = ea.cross(&(b.orientation * eb));
                let len = axis.norm();
                if len < 1e-3 {
                    // parallel edges, already covered by the face axes
                    continue;
                }
                match overlap_on_axis(&(axis / len), va, vb) {
                    None => return 0,
                    Some((n, depth)) => {
                        if best.map_or(true, |(_, d)| depth < d * EDGE_AXIS_PREFERENCE) {
                            best = Some((n, depth));
                        }
                    }
                }
            }
        }

        let Some((n, depth)) = best else {
            return 0;
        };
        let min_a = va.iter().map(|v| n.dot(&v.coords)).fold(Real::MAX, Real::min);
        let max_b = vb.iter().map(|v| n.dot(&v.coords)).fold(Real::MIN, Real::max);

        let start = out.len();
        for v in va {
            let d = max_b - n.dot(&v.coords);
            if d > 0.0 && hull_b.contains_local(&to_local(v, b), CONTAINMENT_TOLERANCE) {
                out.push(Contact {
                    body_a: ia,
                    body_b: ib,
                    point: *v,
                    normal: n,
                    depth: d,
                });
            }
        }
        for v in vb {
            let d = n.dot(&v.coords) - min_a;
            if d > 0.0 && hull_a.contains_local(&to_local(v, a), CONTAINMENT_TOLERANCE) {
                out.push(Contact {
                    body_a: ia,
                    body_b: ib,
                    point: *v,
                    normal: n,
                    depth: d,
                });
            }
        }

        if out.len() == start {
            // edge against edge: no vertex is inside, use a's deepest point
            let deepest = va
                .iter()
                .min_by(|p, q| n.dot(&p.coords).total_cmp(&n.dot(&q.coords)));
            if let Some(v) = deepest {
                out.push(Contact {
                    body_a: ia,
                    body_b: ib,
                    point: *v,
                    normal: n,
                    depth,
                });
            }
        }
        out.len() - start
    }
}

/// Project both vertex sets on `axis`.
///
/// Returns `None` if the projections are disjoint, otherwise the direction `a`
/// should move to separate (either `axis` or `-axis`) and the distance needed.
fn overlap_on_axis(
    axis: &Vector3<Real>,
    va: &[Point3<Real>],
    vb: &[Point3<Real>],
) -> Option<(Vector3<Real>, Real)> {
    let (min_a, max_a) = project(axis, va);
    let (min_b, max_b) = project(axis, vb);
    let push_forward = max_b - min_a;
    let push_back = max_a - min_b;
    if push_forward <= 0.0 || push_back <= 0.0 {
        return None;
    }
    if push_forward < push_back {
        Some((*axis, push_forward))
    } else {
        Some((-axis, push_back))
    }
}

fn project(axis: &Vector3<Real>, verts: &[Point3<Real>]) -> (Real, Real) {
    verts.iter().fold((Real::MAX, Real::MIN), |(lo, hi), v| {
        let d = axis.dot(&v.coords);
        (lo.min(d), hi.max(d))
    })
}

fn to_world(hull: &Polyhedron, body: &RigidBody, out: &mut Vec<Point3<Real>>) {
    out.clear();
    out.extend(
        hull.vertices()
            .iter()
            .map(|v| body.orientation * v + body.position.coords),
    );
}

fn to_local(p: &Point3<Real>, body: &RigidBody) -> Point3<Real> {
    Point3::from(body.orientation.inverse_transform_vector(&(p - body.position)))
}
