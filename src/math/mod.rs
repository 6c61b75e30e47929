//! Math kernel: scalar helpers and the transform builders the pipeline and
//! shader library rely on. Vectors, matrices and quaternions come straight
//! from `nalgebra`; only the graphics-specific constructions live here.

use nalgebra::{Matrix3, Matrix4, Quaternion, Vector2, Vector3, Vector4};

pub type Vec2 = Vector2<f32>;
pub type Vec3 = Vector3<f32>;
pub type Vec4 = Vector4<f32>;
pub type Mat3 = Matrix3<f32>;
pub type Mat4 = Matrix4<f32>;
pub type Quat = Quaternion<f32>;

pub const EPSILON: f32 = 1e-6;
pub const PI: f32 = std::f32::consts::PI;

/* scalar helpers */

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

#[inline]
pub fn from_u8(value: u8) -> f32 {
    value as f32 / 255.0
}

#[inline]
pub fn to_u8(value: f32) -> u8 {
    (value * 255.0) as u8
}

#[inline]
pub fn srgb_to_linear(value: f32) -> f32 {
    value.powf(2.2)
}

#[inline]
pub fn linear_to_srgb(value: f32) -> f32 {
    value.powf(1.0 / 2.2)
}

/// ACES filmic tone mapping curve, fitted by Krzysztof Narkowicz.
pub fn aces(value: f32) -> f32 {
    const A: f32 = 2.51;
    const B: f32 = 0.03;
    const C: f32 = 2.43;
    const D: f32 = 0.59;
    const E: f32 = 0.14;
    saturate((value * (A * value + B)) / (value * (C * value + D) + E))
}

#[inline]
pub fn saturate4(v: Vec4) -> Vec4 {
    v.map(saturate)
}

/* quaternion interpolation */

/// Spherical interpolation along the shorter arc.
///
/// Falls back to plain lerp when the inputs are nearly parallel, where the
/// sine denominator degenerates.
pub fn slerp(a: &Quat, b: &Quat, t: f32) -> Quat {
    let mut b = *b;
    let mut cos_angle = a.coords.dot(&b.coords);
    if cos_angle < 0.0 {
        b.coords = -b.coords;
        cos_angle = -cos_angle;
    }
    if cos_angle > 1.0 - EPSILON {
        Quat::from(a.coords.lerp(&b.coords, t))
    } else {
        let angle = cos_angle.acos();
        let sin_angle = angle.sin();
        let factor_a = ((1.0 - t) * angle).sin() / sin_angle;
        let factor_b = (t * angle).sin() / sin_angle;
        Quat::from(a.coords * factor_a + b.coords * factor_b)
    }
}

/* matrix builders */

fn rotation_from_quat(q: &Quat) -> Mat4 {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);
    let xx = x * x;
    let xy = x * y;
    let xz = x * z;
    let xw = x * w;
    let yy = y * y;
    let yz = y * z;
    let yw = y * w;
    let zz = z * z;
    let zw = z * w;

    Mat4::new(
        1.0 - 2.0 * (yy + zz), 2.0 * (xy - zw), 2.0 * (xz + yw), 0.0,
        2.0 * (xy + zw), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - xw), 0.0,
        2.0 * (xz - yw), 2.0 * (yz + xw), 1.0 - 2.0 * (xx + yy), 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Composes translation, rotation and scale, applied to a column vector in
/// scale-rotate-translate order.
pub fn from_trs(translation: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
    let translation = Mat4::new_translation(translation);
    let rotation = rotation_from_quat(rotation);
    let scale = Mat4::new_nonuniform_scaling(scale);
    translation * rotation * scale
}

/// Inverse of the camera frame: z = normalize(eye - target),
/// x = normalize(up x z), y = z x x.
pub fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    let z_axis = (eye - target).normalize();
    let x_axis = up.cross(&z_axis).normalize();
    let y_axis = z_axis.cross(&x_axis);

    Mat4::new(
        x_axis.x, x_axis.y, x_axis.z, -x_axis.dot(eye),
        y_axis.x, y_axis.y, y_axis.z, -y_axis.dot(eye),
        z_axis.x, z_axis.y, z_axis.z, -z_axis.dot(eye),
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Right-handed perspective projection with OpenGL clip-space conventions:
/// the camera looks down -z and post-divide z lies in [-1, +1].
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    assert!(fovy > 0.0 && aspect > 0.0);
    assert!(near > 0.0 && far > near);
    let y_scale = 1.0 / (fovy / 2.0).tan();
    let x_scale = y_scale / aspect;
    let z_range = far - near;

    Mat4::new(
        x_scale, 0.0, 0.0, 0.0,
        0.0, y_scale, 0.0, 0.0,
        0.0, 0.0, -(near + far) / z_range, -2.0 * near * far / z_range,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// General perspective frustum in the style of `glFrustum`; [`perspective`]
/// is the symmetric special case.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let x_range = right - left;
    let y_range = top - bottom;
    let z_range = far - near;
    assert!(near > 0.0 && far > 0.0);
    assert!(x_range > 0.0 && y_range > 0.0 && z_range > 0.0);

    Mat4::new(
        2.0 * near / x_range, 0.0, (left + right) / x_range, 0.0,
        0.0, 2.0 * near / y_range, (bottom + top) / y_range, 0.0,
        0.0, 0.0, -(near + far) / z_range, -2.0 * near * far / z_range,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Orthographic projection with OpenGL clip-space conventions.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let x_range = right - left;
    let y_range = top - bottom;
    let z_range = far - near;
    assert!(x_range > 0.0 && y_range > 0.0 && z_range > 0.0);

    Mat4::new(
        2.0 / x_range, 0.0, 0.0, -(left + right) / x_range,
        0.0, 2.0 / y_range, 0.0, -(bottom + top) / y_range,
        0.0, 0.0, -2.0 / z_range, -(near + far) / z_range,
        0.0, 0.0, 0.0, 1.0,
    )
}

/* inverses via cofactor expansion */

fn minor4(m: &Mat4, r: usize, c: usize) -> f32 {
    let mut cut = Mat3::zeros();
    for i in 0..3 {
        for j in 0..3 {
            let row = if i < r { i } else { i + 1 };
            let col = if j < c { j } else { j + 1 };
            cut[(i, j)] = m[(row, col)];
        }
    }
    cut.determinant()
}

fn adjoint4(m: &Mat4) -> Mat4 {
    let mut adjoint = Mat4::zeros();
    for r in 0..4 {
        for c in 0..4 {
            let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
            adjoint[(r, c)] = sign * minor4(m, r, c);
        }
    }
    adjoint
}

/// Inverse-transpose of a 4x4 matrix. The determinant must be nonzero; a
/// singular input is a contract violation.
pub fn inverse_transpose(m: &Mat4) -> Mat4 {
    let adjoint = adjoint4(m);
    let mut determinant = 0.0;
    for i in 0..4 {
        determinant += m[(0, i)] * adjoint[(0, i)];
    }
    assert!(determinant != 0.0, "matrix is singular");
    adjoint / determinant
}

/// Inverse of a 4x4 matrix via cofactors. Singular inputs are a contract
/// violation.
pub fn invert(m: &Mat4) -> Mat4 {
    inverse_transpose(m).transpose()
}

fn minor3(m: &Mat3, r: usize, c: usize) -> f32 {
    let mut cut = [[0.0f32; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            let row = if i < r { i } else { i + 1 };
            let col = if j < c { j } else { j + 1 };
            cut[i][j] = m[(row, col)];
        }
    }
    cut[0][0] * cut[1][1] - cut[0][1] * cut[1][0]
}

/// Inverse-transpose of a 3x3 matrix, the normal-matrix construction.
pub fn inverse_transpose3(m: &Mat3) -> Mat3 {
    let mut adjoint = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
            adjoint[(r, c)] = sign * minor3(m, r, c);
        }
    }
    let mut determinant = 0.0;
    for i in 0..3 {
        determinant += m[(0, i)] * adjoint[(0, i)];
    }
    assert!(determinant != 0.0, "matrix is singular");
    adjoint / determinant
}

/// Upper-left 3x3 block of a 4x4 matrix.
#[inline]
pub fn upper_left3(m: &Mat4) -> Mat3 {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

/* weighted blends for skinning */

/// Weighted sum of four matrices; entries with non-positive weight are
/// skipped so unused joint slots never contribute.
pub fn combine4(matrices: &[Mat4; 4], weights: Vec4) -> Mat4 {
    let mut combined = Mat4::zeros();
    for (matrix, &weight) in matrices.iter().zip(weights.iter()) {
        if weight > 0.0 {
            combined += matrix * weight;
        }
    }
    combined
}

/// Weighted sum of four 3x3 matrices, the normal-matrix companion of
/// [`combine4`].
pub fn combine3(matrices: &[Mat3; 4], weights: Vec4) -> Mat3 {
    let mut combined = Mat3::zeros();
    for (matrix, &weight) in matrices.iter().zip(weights.iter()) {
        if weight > 0.0 {
            combined += matrix * weight;
        }
    }
    combined
}
