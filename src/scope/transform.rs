//! Window ↔ lat/long affine transforms (spec.md §4.I.1): built fresh each
//! frame from pane center, range, rotation, magnetic variation, and aspect
//! ratio, then used to project aircraft/fix positions into pixel space and
//! to invert mouse clicks back into lat/long.

use crate::geometry::{self, LatLon, Point2D};

#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    center: LatLon,
    /// Nautical miles across the pane's half-height.
    range_nm: f64,
    /// Degrees, clockwise, applied on top of magnetic variation.
    rotation_deg: f32,
    magnetic_variation_deg: f32,
    pane_width: f32,
    pane_height: f32,
}

impl ViewTransform {
    pub fn new(
        center: LatLon,
        range_nm: f64,
        rotation_deg: f32,
        magnetic_variation_deg: f32,
        pane_width: f32,
        pane_height: f32,
    ) -> Self {
        Self {
            center,
            range_nm,
            rotation_deg,
            magnetic_variation_deg,
            pane_width,
            pane_height,
        }
    }

    fn pixels_per_nm(&self) -> f32 {
        if self.range_nm <= 0.0 {
            return 1.0;
        }
        (self.pane_height / 2.0) / self.range_nm as f32
    }

    fn total_rotation(&self) -> f32 {
        geometry::normalize_heading(self.rotation_deg + self.magnetic_variation_deg)
    }

    /// Projects a lat/long position onto the pane, in pixels, origin
    /// top-left.
    pub fn project(&self, position: LatLon) -> Point2D {
        let dlat = position.lat - self.center.lat;
        let dlon = position.lon - self.center.lon;
        let nm_north = dlat * geometry::nm_per_latitude();
        let nm_east = dlon * geometry::nm_per_longitude(self.center.lat);

        let rot = self.total_rotation().to_radians();
        let (sin_r, cos_r) = (rot.sin() as f64, rot.cos() as f64);
        // Rotate so that "up" on screen points along `rotation`.
        let rx = nm_east * cos_r - nm_north * sin_r;
        let ry = nm_east * sin_r + nm_north * cos_r;

        let ppnm = self.pixels_per_nm() as f64;
        Point2D::new(
            self.pane_width / 2.0 + (rx * ppnm) as f32,
            self.pane_height / 2.0 - (ry * ppnm) as f32,
        )
    }

    /// Inverse of [`project`]: pixel coordinates back to lat/long, used to
    /// resolve mouse clicks and drags (spec.md §4.I.9).
    pub fn unproject(&self, point: Point2D) -> LatLon {
        let ppnm = self.pixels_per_nm();
        if ppnm == 0.0 {
            return self.center;
        }
        let rx = ((point.x - self.pane_width / 2.0) / ppnm) as f64;
        let ry = ((self.pane_height / 2.0 - point.y) / ppnm) as f64;

        let rot = -self.total_rotation().to_radians();
        let (sin_r, cos_r) = (rot.sin() as f64, rot.cos() as f64);
        let nm_east = rx * cos_r - ry * sin_r;
        let nm_north = rx * sin_r + ry * cos_r;

        LatLon {
            lat: self.center.lat + nm_north / geometry::nm_per_latitude(),
            lon: self.center.lon + nm_east / geometry::nm_per_longitude(self.center.lat),
        }
    }

    /// Pans the view by a pixel delta, inverse-transformed into lat/long
    /// (spec.md §4.I.9: "secondary-drag pans by inverse-transformed delta").
    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32) {
        let origin = self.unproject(Point2D::new(self.pane_width / 2.0, self.pane_height / 2.0));
        let shifted = self.unproject(Point2D::new(
            self.pane_width / 2.0 - dx,
            self.pane_height / 2.0 - dy,
        ));
        self.center.lat += shifted.lat - origin.lat;
        self.center.lon += shifted.lon - origin.lon;
    }

    /// Zooms around a pixel anchor by `1.05^wheel` (spec.md §4.I.9).
    pub fn zoom_at(&mut self, anchor: Point2D, wheel_delta: f32) {
        let before = self.unproject(anchor);
        self.range_nm *= 1.05_f64.powf(-wheel_delta as f64);
        self.range_nm = self.range_nm.max(0.1);
        let after = self.unproject(anchor);
        self.center.lat += before.lat - after.lat;
        self.center.lon += before.lon - after.lon;
    }

    pub fn range_nm(&self) -> f64 {
        self.range_nm
    }

    pub fn center(&self) -> LatLon {
        self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> ViewTransform {
        ViewTransform::new(LatLon { lat: 40.0, lon: -73.0 }, 20.0, 0.0, 0.0, 800.0, 600.0)
    }

    #[test]
    fn center_projects_to_pane_center() {
        let view = sample();
        let p = view.project(LatLon { lat: 40.0, lon: -73.0 });
        assert_abs_diff_eq!(p.x, 400.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 300.0, epsilon = 1e-3);
    }

    #[test]
    fn project_then_unproject_round_trips() {
        let view = sample();
        let original = LatLon { lat: 40.2, lon: -73.3 };
        let pixel = view.project(original);
        let back = view.unproject(pixel);
        assert_abs_diff_eq!(back.lat, original.lat, epsilon = 1e-6);
        assert_abs_diff_eq!(back.lon, original.lon, epsilon = 1e-6);
    }

    #[test]
    fn zoom_in_keeps_anchor_point_fixed() {
        let mut view = sample();
        let anchor = Point2D::new(500.0, 300.0);
        let before = view.unproject(anchor);
        view.zoom_at(anchor, 5.0);
        let after = view.unproject(anchor);
        assert_abs_diff_eq!(before.lat, after.lat, epsilon = 1e-6);
        assert_abs_diff_eq!(before.lon, after.lon, epsilon = 1e-6);
    }

    #[test]
    fn rotation_turns_north_into_screen_up_offset() {
        let rotated = ViewTransform::new(LatLon { lat: 40.0, lon: -73.0 }, 20.0, 90.0, 0.0, 800.0, 600.0);
        let north = rotated.project(LatLon { lat: 40.1, lon: -73.0 });
        // With a 90 degree clockwise rotation, due-north should now project
        // to the right of center rather than above it.
        assert!(north.x > 400.0);
    }
}
