use nalgebra::{Isometry3, Matrix4, Point2, Point3, Vector2, Vector3, Vector4};

/// Scalar type used throughout the workspace (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// Homogeneous 3D vector with [`Real`] components.
pub type Vec4 = Vector4<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 4×4 matrix with [`Real`] entries (column-major, OpenGL layout).
pub type Mat4 = Matrix4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Lift a 3D point into homogeneous coordinates `(x, y, z, 1)`.
pub fn to_homogeneous(p: &Pt3) -> Vec4 {
    Vec4::new(p.x, p.y, p.z, 1.0)
}

/// Convert a homogeneous 4-vector back to a 3D point.
///
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec4) -> Pt3 {
    Pt3::new(v.x / v.w, v.y / v.w, v.z / v.w)
}

/// Build a 4×4 matrix from 16 values laid out column by column.
///
/// This is the layout used by OpenGL-style `float[16]` view and projection
/// matrices.
pub fn mat4_from_column_slice(values: &[Real; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}
