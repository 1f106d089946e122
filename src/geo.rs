//! Great-circle distance between two positions

use crate::model::Coordinates;

/// Mean Earth radius used for every distance in the crate
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // clamp guards asin against rounding just above 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_same_point_is_zero() {
        let caen = at(49.1829, -0.3707);
        assert_eq!(haversine_km(caen, caen), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(at(0.0, 0.0), at(1.0, 0.0));
        // 6371 * pi / 180
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let caen = at(49.1829, -0.3707);
        let saint_lo = at(49.1157, -1.0906);
        let ab = haversine_km(caen, saint_lo);
        let ba = haversine_km(saint_lo, caen);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 50.0 && ab < 55.0, "got {}", ab);
    }

    #[test]
    fn test_antipodal_is_half_circumference() {
        let d = haversine_km(at(0.0, 0.0), at(0.0, 180.0));
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);
    }
}
