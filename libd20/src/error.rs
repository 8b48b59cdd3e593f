//! Error types for building dice, bodies and trays.

use thiserror::Error;

use crate::math::Real;

/// Errors raised while constructing geometry, bodies or a tray.
///
/// Stepping the world, rolling and resolving faces never fail; only setup does.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiceError {
    /// Polyhedron has no vertices.
    #[error("polyhedron has no vertices")]
    NoVertices,

    /// Polyhedron has no faces.
    #[error("polyhedron has no faces")]
    NoFaces,

    /// A face lists fewer than three vertices.
    #[error("face {face} has {count} vertices, at least 3 are required")]
    FaceTooSmall { face: usize, count: usize },

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index}, but only {vertex_count} vertices exist")]
    FaceIndexOutOfBounds {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    /// A face whose first three vertices are collinear.
    #[error("face {0} is degenerate")]
    DegenerateFace(usize),

    /// The enclosed volume is zero or the mesh is not closed.
    #[error("polyhedron encloses no volume")]
    ZeroVolume,

    /// The inertia tensor could not be inverted.
    #[error("inertia tensor is singular")]
    SingularInertia,

    /// Dynamic bodies need a finite positive mass.
    #[error("invalid mass {0}: dynamic bodies need a finite mass > 0")]
    InvalidMass(Real),

    /// Planes have no volume and cannot be simulated as dynamic bodies.
    #[error("a dynamic body needs a bounded shape")]
    UnboundedShape,

    /// Dynamic bodies rotate about their origin, so a hull's centre of mass
    /// must sit there.
    #[error("centre of mass is {0} away from the body origin")]
    OffCenterShape(Real),

    /// A configuration value is out of range.
    #[error("invalid configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: Real,
        reason: &'static str,
    },
}

/// Result type for fallible setup operations.
pub type DiceResult<T> = std::result::Result<T, DiceError>;
