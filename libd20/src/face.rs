//! Which face is up, and how a face's label is oriented.

use serde::{Deserialize, Serialize};

use crate::error::{DiceError, DiceResult};
use crate::math::{world_up, Point3, Real, UnitQuaternion, Vector3};
use crate::shape::Polyhedron;

/// Outcome of a roll. The printed value is always `face_index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopFaceResult {
    pub face_index: usize,
}

impl TopFaceResult {
    pub fn value(&self) -> u32 {
        self.face_index as u32 + 1
    }
}

/// Picks the face whose outward normal points most nearly at world up.
///
/// The normal table is taken once from the die geometry and never changes.
#[derive(Debug, Clone)]
pub struct TopFaceResolver {
    normals: Vec<Vector3<Real>>,
}

impl TopFaceResolver {
    pub fn new(normals: Vec<Vector3<Real>>) -> DiceResult<Self> {
        if normals.is_empty() {
            return Err(DiceError::NoFaces);
        }
        Ok(Self { normals })
    }

    pub fn from_polyhedron(poly: &Polyhedron) -> Self {
        // a validated polyhedron always has at least one face
        Self {
            normals: poly.face_normals().to_vec(),
        }
    }

    pub fn face_count(&self) -> usize {
        self.normals.len()
    }

    pub fn normals(&self) -> &[Vector3<Real>] {
        &self.normals
    }

    /// Face most aligned with +Y for a body at `orientation`.
    pub fn resolve(&self, orientation: &UnitQuaternion<Real>) -> TopFaceResult {
        resolve_top_face(&self.normals, orientation).unwrap_or(TopFaceResult { face_index: 0 })
    }
}

/// Rotate each body-space normal into the world and return the one with the
/// largest up component. Ties keep the lowest index. `None` for an empty table.
pub fn resolve_top_face(
    normals: &[Vector3<Real>],
    orientation: &UnitQuaternion<Real>,
) -> Option<TopFaceResult> {
    let up = world_up();
    let mut best: Option<(usize, Real)> = None;
    for (i, n) in normals.iter().enumerate() {
        let d = (orientation * n).dot(&up);
        match best {
            Some((_, best_dot)) if d <= best_dot => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(face_index, _)| TopFaceResult { face_index })
}

/// Upright 2D frame for drawing a face's number.
///
/// `up` is world up projected into the face plane, so labels read upright when
/// the die sits in its rest pose. When the face is nearly horizontal the
/// projection vanishes and +Z is projected instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFrame {
    pub centroid: Point3<Real>,
    pub normal: Vector3<Real>,
    pub up: Vector3<Real>,
    pub right: Vector3<Real>,
}

impl FaceFrame {
    pub fn for_face(poly: &Polyhedron, face: usize) -> Option<Self> {
        let centroid = poly.face_centroid(face)?;
        let n = *poly.face_normals().get(face)?;

        let project = |axis: Vector3<Real>| axis - n * axis.dot(&n);
        let mut up = project(world_up());
        if up.norm_squared() < 1e-6 {
            up = project(Vector3::z());
        }
        let up = up.normalize();
        let right = up.cross(&n).normalize();
        let up = n.cross(&right).normalize();

        Some(Self {
            centroid,
            normal: n,
            up,
            right,
        })
    }

    /// Coordinates of `p` in the face plane: (along `right`, along `up`).
    pub fn project(&self, p: &Point3<Real>) -> (Real, Real) {
        let d = p - self.centroid;
        (d.dot(&self.right), d.dot(&self.up))
    }
}
