//! Collision shapes: convex polyhedra (the die), cuboids (tray walls) and planes (the floor).
//!
//! A `Polyhedron` is validated once and then never changes. Everything the
//! simulation derives from the geometry (face normals, face planes, edge
//! directions, bounding radius, mass properties) is computed here in body space.

use crate::error::{DiceError, DiceResult};
use crate::math::{Matrix3, Point3, Real, Unit, UnitQuaternion, Vector3, EPS};

/// Convex polyhedron in body space: vertices and faces (lists of vertex indices).
///
/// Faces are re-wound on construction so that `(b - a) x (c - a)` of their first
/// three vertices points away from the interior.
#[derive(Clone, Debug)]
pub struct Polyhedron {
    vertices: Vec<Point3<Real>>,
    faces: Vec<Vec<usize>>,
    face_normals: Vec<Vector3<Real>>,
    face_offsets: Vec<Real>,
    edge_dirs: Vec<Vector3<Real>>,
    radius: Real,
}

/// Volume, centre of mass and inertia tensor (about the centre of mass).
#[derive(Clone, Debug, PartialEq)]
pub struct MassProperties {
    pub volume: Real,
    pub centroid: Point3<Real>,
    pub inertia: Matrix3<Real>,
}

impl Polyhedron {
    /// Build a polyhedron, checking indices and fixing face winding.
    pub fn new(vertices: Vec<Point3<Real>>, faces: Vec<Vec<usize>>) -> DiceResult<Self> {
        validate(&vertices, &faces)?;

        let interior = vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords)
            / vertices.len() as Real;

        let mut faces = faces;
        let mut face_normals = Vec::with_capacity(faces.len());
        let mut face_offsets = Vec::with_capacity(faces.len());
        for (i, face) in faces.iter_mut().enumerate() {
            let a = vertices[face[0]];
            let b = vertices[face[1]];
            let c = vertices[face[2]];
            let mut n = (b - a).cross(&(c - a));
            if n.norm_squared() < 1e-12 {
                return Err(DiceError::DegenerateFace(i));
            }
            if n.dot(&(a.coords - interior)) < 0.0 {
                face.reverse();
                n = -n;
            }
            let n = n.normalize();
            face_offsets.push(n.dot(&vertices[face[0]].coords));
            face_normals.push(n);
        }

        let mut edge_dirs: Vec<Vector3<Real>> = Vec::new();
        for face in &faces {
            for k in 0..face.len() {
                let e = vertices[face[(k + 1) % face.len()]] - vertices[face[k]];
                let len = e.norm();
                if len < EPS {
                    continue;
                }
                let e = e / len;
                // an edge and its reverse give the same separating axes
                if !edge_dirs.iter().any(|d| d.dot(&e).abs() > 1.0 - 1e-4) {
                    edge_dirs.push(e);
                }
            }
        }

        let radius = vertices
            .iter()
            .map(|v| v.coords.norm())
            .fold(0.0, Real::max);

        Ok(Self {
            vertices,
            faces,
            face_normals,
            face_offsets,
            edge_dirs,
            radius,
        })
    }

    /// Regular icosahedron with circumradius `radius`, centred on the origin.
    ///
    /// Vertex and face order follow the usual golden-rectangle construction used
    /// by WebGL icosahedron geometry, so face `i` carries the label `i + 1`.
    pub fn icosahedron(radius: Real) -> DiceResult<Self> {
        let t = (1.0 + (5.0 as Real).sqrt()) / 2.0;
        let raw = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ];
        let vertices = raw
            .iter()
            .map(|[x, y, z]| Point3::from(Vector3::new(*x, *y, *z).normalize() * radius))
            .collect();

        const FACES: [[usize; 3]; 20] = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];
        let faces = FACES.iter().map(|f| f.to_vec()).collect();

        Self::new(vertices, faces)
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(half_extents: Vector3<Real>) -> DiceResult<Self> {
        for (field, value) in [
            ("half_extents.x", half_extents.x),
            ("half_extents.y", half_extents.y),
            ("half_extents.z", half_extents.z),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(DiceError::InvalidConfig {
                    field,
                    value,
                    reason: "must be finite and > 0",
                });
            }
        }
        let h = half_extents;
        let vertices = vec![
            Point3::new(-h.x, -h.y, -h.z),
            Point3::new(h.x, -h.y, -h.z),
            Point3::new(h.x, h.y, -h.z),
            Point3::new(-h.x, h.y, -h.z),
            Point3::new(-h.x, -h.y, h.z),
            Point3::new(h.x, -h.y, h.z),
            Point3::new(h.x, h.y, h.z),
            Point3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            vec![0, 3, 2, 1], // -Z
            vec![4, 5, 6, 7], // +Z
            vec![0, 1, 5, 4], // -Y
            vec![3, 7, 6, 2], // +Y
            vec![1, 2, 6, 5], // +X
            vec![0, 4, 7, 3], // -X
        ];
        Self::new(vertices, faces)
    }

    /// Same solid with every vertex rotated by `q` about the origin.
    pub fn rotated(&self, q: &UnitQuaternion<Real>) -> DiceResult<Self> {
        let vertices = self.vertices.iter().map(|v| q * v).collect();
        Self::new(vertices, self.faces.clone())
    }

    pub fn vertices(&self) -> &[Point3<Real>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Outward unit normal of every face, body space, in face order.
    pub fn face_normals(&self) -> &[Vector3<Real>] {
        &self.face_normals
    }

    /// Distinct edge directions (unit length, one per parallel class).
    pub fn edge_directions(&self) -> &[Vector3<Real>] {
        &self.edge_dirs
    }

    /// Largest distance from the body origin to a vertex.
    pub fn bounding_radius(&self) -> Real {
        self.radius
    }

    /// Arithmetic mean of a face's vertices.
    pub fn face_centroid(&self, face: usize) -> Option<Point3<Real>> {
        let f = self.faces.get(face)?;
        let sum = f
            .iter()
            .fold(Vector3::zeros(), |acc, &i| acc + self.vertices[i].coords);
        Some(Point3::from(sum / f.len() as Real))
    }

    /// Whether body-space point `p` lies inside (or within `tolerance` of) the solid.
    pub fn contains_local(&self, p: &Point3<Real>, tolerance: Real) -> bool {
        self.face_normals
            .iter()
            .zip(&self.face_offsets)
            .all(|(n, d)| n.dot(&p.coords) <= d + tolerance)
    }

    /// Volume, centroid and inertia for a uniform solid of total `mass`.
    ///
    /// Faces are fan-triangulated and each triangle forms a tetrahedron with the
    /// origin; signed volumes, first moments and covariance are summed, then the
    /// covariance is shifted to the centroid and turned into an inertia tensor.
    pub fn mass_properties(&self, mass: Real) -> DiceResult<MassProperties> {
        let mut volume = 0.0;
        let mut first_moment = Vector3::zeros();
        let mut covariance = Matrix3::zeros();

        for face in &self.faces {
            let v0 = self.vertices[face[0]].coords;
            for k in 1..(face.len() - 1) {
                let v1 = self.vertices[face[k]].coords;
                let v2 = self.vertices[face[k + 1]].coords;
                let det = v0.dot(&v1.cross(&v2));
                let vol = det / 6.0;
                volume += vol;
                first_moment += (v0 + v1 + v2) * (vol / 4.0);

                let sum = v0 + v1 + v2;
                let outer = v0 * v0.transpose() + v1 * v1.transpose() + v2 * v2.transpose();
                covariance += (outer + sum * sum.transpose()) * (det / 120.0);
            }
        }

        if volume.abs() < 1e-9 {
            return Err(DiceError::ZeroVolume);
        }

        let density = mass / volume;
        let centroid = first_moment / volume;
        let covariance_cm = covariance * density - centroid * centroid.transpose() * mass;
        let inertia = Matrix3::identity() * covariance_cm.trace() - covariance_cm;

        Ok(MassProperties {
            volume,
            centroid: Point3::from(centroid),
            inertia,
        })
    }
}

fn validate(vertices: &[Point3<Real>], faces: &[Vec<usize>]) -> DiceResult<()> {
    if vertices.is_empty() {
        return Err(DiceError::NoVertices);
    }
    if faces.is_empty() {
        return Err(DiceError::NoFaces);
    }
    for (i, f) in faces.iter().enumerate() {
        if f.len() < 3 {
            return Err(DiceError::FaceTooSmall {
                face: i,
                count: f.len(),
            });
        }
        if let Some(&index) = f.iter().find(|&&index| index >= vertices.len()) {
            return Err(DiceError::FaceIndexOutOfBounds {
                face: i,
                index,
                vertex_count: vertices.len(),
            });
        }
    }
    Ok(())
}

/// Largest centre-of-mass offset, relative to the hull size, still treated
/// as sitting on the origin.
const CENTROID_TOLERANCE: Real = 1e-3;

/// Geometry attached to a rigid body.
#[derive(Clone, Debug)]
pub enum Shape {
    /// Arbitrary convex polyhedron, e.g. the die.
    Polyhedron(Polyhedron),
    /// Box with the given half extents; `hull` is the same box as a polyhedron.
    Cuboid {
        half_extents: Vector3<Real>,
        hull: Polyhedron,
    },
    /// Infinite half-space through the body origin; solid below `normal`.
    Plane { normal: Unit<Vector3<Real>> },
}

impl Shape {
    pub fn cuboid(half_extents: Vector3<Real>) -> DiceResult<Self> {
        Ok(Shape::Cuboid {
            half_extents,
            hull: Polyhedron::cuboid(half_extents)?,
        })
    }

    pub fn plane(normal: Unit<Vector3<Real>>) -> Self {
        Shape::Plane { normal }
    }

    /// Polyhedral form of bounded shapes; `None` for planes.
    pub fn hull(&self) -> Option<&Polyhedron> {
        match self {
            Shape::Polyhedron(p) => Some(p),
            Shape::Cuboid { hull, .. } => Some(hull),
            Shape::Plane { .. } => None,
        }
    }

    /// Radius of a sphere around the body origin enclosing the shape.
    pub fn bounding_radius(&self) -> Option<Real> {
        self.hull().map(Polyhedron::bounding_radius)
    }

    /// Inertia tensor of a uniform solid of `mass` about its centre of mass,
    /// which must coincide with the body origin.
    pub fn inertia(&self, mass: Real) -> DiceResult<Matrix3<Real>> {
        match self {
            Shape::Polyhedron(p) => {
                let props = p.mass_properties(mass)?;
                let offset = props.centroid.coords.norm();
                if offset > CENTROID_TOLERANCE * p.bounding_radius().max(1.0) {
                    return Err(DiceError::OffCenterShape(offset));
                }
                Ok(props.inertia)
            }
            Shape::Cuboid { half_extents, .. } => {
                let h2 = half_extents.component_mul(half_extents) * 4.0;
                let k = mass / 12.0;
                Ok(Matrix3::from_diagonal(&Vector3::new(
                    k * (h2.y + h2.z),
                    k * (h2.x + h2.z),
                    k * (h2.x + h2.y),
                )))
            }
            Shape::Plane { .. } => Err(DiceError::UnboundedShape),
        }
    }
}

impl From<Polyhedron> for Shape {
    fn from(p: Polyhedron) -> Self {
        Shape::Polyhedron(p)
    }
}
