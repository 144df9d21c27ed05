//! Vector/matrix helpers shared by the physics core.
//!
//! Thin layer over `nalgebra`: type aliases, fixed-precision rounding, outer
//! products and the SVD-based polar decomposition used by shape matching.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, Vector3};

pub type NVec3 = Vector3<f64>;
pub type NMat3 = Matrix3<f64>;
pub type NMat4 = Matrix4<f64>;

/// Decimal digits kept before and after rotation extraction
pub const DEFAULT_ROUNDING_DIGITS: i32 = 5;

/// Iteration cap handed to the SVD so non-finite input cannot spin forever
const SVD_MAX_ITERATIONS: usize = 200;

/// Round `value` to `digits` decimal places. Negative zero comes back as `0.0`.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn round_matrix(m: &NMat3, digits: i32) -> NMat3 {
    m.map(|v| round_to(v, digits))
}

/// Unit vector along `v`, or zero when `v` has no usable length
pub fn normalize_or_zero(v: &NVec3) -> NVec3 {
    let len = v.norm();
    if len > 1e-12 {
        v / len
    } else {
        NVec3::zeros()
    }
}

/// `a bᵀ`
pub fn outer_product(a: &NVec3, b: &NVec3) -> NMat3 {
    a * b.transpose()
}

/// `Σ a_i b_iᵀ`, rounded entry-wise to `digits`.
///
/// Extra entries in the longer slice are ignored.
pub fn outer_product_sum(a: &[NVec3], b: &[NVec3], digits: i32) -> NMat3 {
    let sum = a
        .iter()
        .zip(b.iter())
        .fold(NMat3::zeros(), |acc, (ai, bi)| acc + outer_product(ai, bi));
    round_matrix(&sum, digits)
}

/// Best-fit rotation taking `old_positions` onto `new_positions`.
///
/// Both sets are offsets from their own centers. Builds the cross-covariance
/// `Σ new_i old_iᵀ` and hands it to [`extract_rotation_from_matrix`].
pub fn extract_rotation_from_positions(
    old_positions: &[NVec3],
    new_positions: &[NVec3],
    digits: i32,
) -> NMat3 {
    let a = outer_product_sum(new_positions, old_positions, digits);
    extract_rotation_from_matrix(&a, digits)
}

/// Rotation part of the polar decomposition of `matrix` (`R = U Vᵀ`).
///
/// The input is rounded to `digits` first; tiny asymmetries from float noise
/// otherwise flip singular vectors between steps. Rank-deficient input is
/// completed deterministically:
///
/// - rank 0: identity
/// - rank 1: the Householder reflection mapping `v1` onto `u1`
/// - rank 2: third axes completed with `u1 × u2` and `v1 × v2`
///
/// A full-rank input may still produce `det(R) = -1`; see
/// [`extract_proper_rotation_from_matrix`].
pub fn extract_rotation_from_matrix(matrix: &NMat3, digits: i32) -> NMat3 {
    polar_rotation(matrix, digits, false)
}

/// Same as [`extract_rotation_from_matrix`] but never returns a reflection:
/// when the determinant comes out negative the axis with the smallest
/// singular value is flipped.
pub fn extract_proper_rotation_from_matrix(matrix: &NMat3, digits: i32) -> NMat3 {
    polar_rotation(matrix, digits, true)
}

fn polar_rotation(matrix: &NMat3, digits: i32, proper: bool) -> NMat3 {
    if matrix.iter().any(|v| !v.is_finite()) {
        return NMat3::identity();
    }

    let a = round_matrix(matrix, digits);
    let tolerance = 10f64.powi(-digits);

    let svd = match a.try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS) {
        Some(svd) => svd,
        None => return NMat3::identity(),
    };
    let singular = svd.singular_values;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return NMat3::identity(),
    };

    // descending singular values
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| singular[j].total_cmp(&singular[i]));

    let us = order.map(|i| u.column(i).into_owned());
    let vs = order.map(|i| v_t.row(i).transpose());
    let rank = order.iter().filter(|&&i| singular[i] > tolerance).count();

    let rotation = match rank {
        0 => NMat3::identity(),
        1 => {
            let reflection = householder(&vs[0], &us[0], tolerance);
            if proper && reflection.determinant() < 0.0 {
                minimal_rotation(&vs[0], &us[0])
            } else {
                reflection
            }
        }
        2 => {
            let u3 = us[0].cross(&us[1]);
            let v3 = vs[0].cross(&vs[1]);
            outer_product(&us[0], &vs[0]) + outer_product(&us[1], &vs[1]) + outer_product(&u3, &v3)
        }
        _ => {
            let r = outer_product(&us[0], &vs[0]) + outer_product(&us[1], &vs[1]);
            let last = outer_product(&us[2], &vs[2]);
            if proper && (r + last).determinant() < 0.0 {
                r - last
            } else {
                r + last
            }
        }
    };

    round_matrix(&rotation, digits)
}

/// Reflection `I - 2 w wᵀ / |w|²` with `w = from - to`; identity once the two
/// unit vectors agree within `tolerance`.
fn householder(from: &NVec3, to: &NVec3, tolerance: f64) -> NMat3 {
    let w = from - to;
    let len2 = w.norm_squared();
    if len2 < tolerance {
        return NMat3::identity();
    }
    NMat3::identity() - outer_product(&w, &w) * (2.0 / len2)
}

fn minimal_rotation(from: &NVec3, to: &NVec3) -> NMat3 {
    match Rotation3::rotation_between(from, to) {
        Some(rotation) => rotation.into_inner(),
        None => {
            // antiparallel: half turn about any axis orthogonal to `from`
            let helper = if from.x.abs() < 0.9 { NVec3::x() } else { NVec3::y() };
            let axis = Unit::new_normalize(from.cross(&helper));
            Rotation3::from_axis_angle(&axis, std::f64::consts::PI).into_inner()
        }
    }
}

/// Apply a homogeneous transform to a point.
pub fn transform_point(m: &NMat4, p: &NVec3) -> NVec3 {
    m.transform_point(&Point3::from(*p)).coords
}

/// Largest factor by which `m` stretches any direction: the biggest column
/// norm of its linear part.
pub fn max_scale(m: &NMat4) -> f64 {
    m.fixed_view::<3, 3>(0, 0)
        .column_iter()
        .map(|column| column.norm())
        .fold(0.0, f64::max)
}

/// Arithmetic mean of `points`, `None` when empty.
pub fn mean(points: impl Iterator<Item = NVec3>) -> Option<NVec3> {
    let (sum, count) = points.fold((NVec3::zeros(), 0usize), |(s, n), p| (s + p, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
