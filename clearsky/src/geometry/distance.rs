//! Great-circle distance on a spherical Earth.

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Returns the distance in kilometres between two `(lat, lon)` points.
///
/// Uses the spherical law of cosines:
///
/// ```text
/// d = acos(sin φ1 · sin φ2 + cos φ1 · cos φ2 · cos(λ2 − λ1)) · R
/// ```
///
/// # Arguments
///
/// * `a` - First point as (latitude, longitude) in degrees
/// * `b` - Second point as (latitude, longitude) in degrees
///
/// Identical points return exactly zero; otherwise the cosine term is clamped
/// to [-1, 1] so rounding never produces `NaN`.
#[inline]
pub fn get_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    if a == b {
        return 0.0;
    }

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon2 - lon1).cos();
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
}

/// Kilometres spanned by one degree of latitude.
#[inline]
pub fn km_per_degree_lat() -> f64 {
    get_distance((0.0, 0.0), (1.0, 0.0))
}

/// Kilometres spanned by one degree of longitude at the given latitude.
#[inline]
pub fn km_per_degree_lon(lat: f64) -> f64 {
    get_distance((lat, 0.0), (lat, 1.0))
}
