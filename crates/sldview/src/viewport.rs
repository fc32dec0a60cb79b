//! Surface sizing and camera state.
//!
//! The view box is the single source of truth for the camera: zoom and pan offset are derived
//! from it and every camera operation rewrites it.

use crate::error::Error;
use crate::geom::Bounds;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const VOLTAGE_LEVEL_SVG_TYPE: &str = "voltage-level";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeConstraints {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 1.0,
            min_height: 1.0,
            max_width: 10_000.0,
            max_height: 10_000.0,
        }
    }
}

/// Small content is padded up to `min`; large content is capped at `max`.
pub fn clamp_dimension(natural: f64, min: f64, max: f64) -> f64 {
    if natural < min { min } else { natural.min(max) }
}

impl SizeConstraints {
    pub fn new(min_width: f64, min_height: f64, max_width: f64, max_height: f64) -> Self {
        Self {
            min_width,
            min_height,
            max_width,
            max_height,
        }
    }

    pub fn surface_size(&self, natural_width: f64, natural_height: f64) -> (f64, f64) {
        (
            clamp_dimension(natural_width, self.min_width, self.max_width),
            clamp_dimension(natural_height, self.min_height, self.max_height),
        )
    }

    /// Natural-to-max ratio of the axis overflowing the most, when any axis overflows.
    pub fn overflow_ratio(&self, natural_width: f64, natural_height: f64) -> Option<f64> {
        if natural_width <= self.max_width && natural_height <= self.max_height {
            return None;
        }
        let ratio_x = natural_width / self.max_width;
        let ratio_y = natural_height / self.max_height;
        Some(ratio_x.max(ratio_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Content box padded by `margin` on every side.
    pub fn around(bounds: &Bounds, margin: f64) -> Self {
        Self {
            x: bounds.min_x - margin,
            y: bounds.min_y - margin,
            width: bounds.width() + 2.0 * margin,
            height: bounds.height() + 2.0 * margin,
        }
    }
}

impl std::fmt::Display for ViewBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for ViewBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidViewBox {
            value: s.to_string(),
        };
        let nums = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        let [x, y, width, height] = nums.as_slice() else {
            return Err(invalid());
        };
        if !(*width > 0.0 && *height > 0.0) {
            return Err(invalid());
        }
        Ok(ViewBox::new(*x, *y, *width, *height))
    }
}

/// Interactive zoom bounds and wheel step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ZoomRange {
    /// Voltage-level diagrams are usually well scaled already and get a tighter range;
    /// substation and area diagrams allow deep zoom-out.
    pub fn for_svg_type(svg_type: &str) -> Self {
        if svg_type == VOLTAGE_LEVEL_SVG_TYPE {
            Self {
                min: 0.5,
                max: 10.0,
                step: 0.3,
            }
        } else {
            Self {
                min: 0.1,
                max: 10.0,
                step: 0.15,
            }
        }
    }

    /// Clamps a zoom change from `current` to `level`. When `current` already lies outside the
    /// range the change may head back towards it but never further out.
    pub fn clamp_from(&self, current: f64, level: f64) -> f64 {
        if level < self.min {
            level.max(current.min(self.min))
        } else if level > self.max {
            level.min(current.max(self.max))
        } else {
            level
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub view_box: ViewBox,
    /// Padded content box the viewport was derived from.
    pub natural: ViewBox,
    /// View box restored by [`Viewport::reset`].
    pub home: ViewBox,
    pub zoom_range: ZoomRange,
}

impl Viewport {
    /// Sizes the surface from the natural content box. When the content overflows the maximum
    /// size, zooms out just enough for the most overflowing axis to fit and anchors the view at
    /// the top-left corner of the content.
    pub fn fit(natural: ViewBox, constraints: &SizeConstraints, zoom_range: ZoomRange) -> Self {
        let (width, height) = constraints.surface_size(natural.width, natural.height);
        let mut vp = Self {
            width,
            height,
            view_box: natural,
            natural,
            home: natural,
            zoom_range,
        };
        vp.fit_oversized(constraints);
        vp
    }

    /// Corrective zoom for content larger than `constraints` allow; the result becomes the home
    /// view. Returns whether any correction was applied.
    pub fn fit_oversized(&mut self, constraints: &SizeConstraints) -> bool {
        let natural = self.natural;
        let Some(ratio) = constraints.overflow_ratio(natural.width, natural.height) else {
            return false;
        };
        self.view_box = natural;
        self.zoom_to(1.0 / ratio, (natural.x, natural.y));
        self.home = self.view_box;
        true
    }

    /// Effective scale from content units to surface pixels (uniform, aspect preserving).
    pub fn zoom(&self) -> f64 {
        (self.width / self.view_box.width).min(self.height / self.view_box.height)
    }

    /// Offset of the view box origin from the natural content origin.
    pub fn pan_offset(&self) -> (f64, f64) {
        (
            self.view_box.x - self.natural.x,
            self.view_box.y - self.natural.y,
        )
    }

    /// Sets the zoom level keeping the content point `anchor` fixed on the surface. Not clamped
    /// to the zoom range.
    pub fn zoom_to(&mut self, level: f64, anchor: (f64, f64)) {
        if !(level.is_finite() && level > 0.0) {
            return;
        }
        let old = self.view_box;
        let width = self.width / level;
        let height = self.height / level;
        let (ax, ay) = anchor;
        self.view_box = ViewBox {
            x: ax - (ax - old.x) * width / old.width,
            y: ay - (ay - old.y) * height / old.height,
            width,
            height,
        };
    }

    /// Wheel zoom around a surface point, clamped to the zoom range (see [`ZoomRange::clamp_from`]).
    pub fn zoom_by_wheel(&mut self, delta_y: f64, client: (f64, f64)) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let current = self.zoom();
        let level = current * (1.0 + self.zoom_range.step).powf(-delta_y / 100.0);
        let level = self.zoom_range.clamp_from(current, level);
        if level == current {
            return;
        }
        let anchor = self.client_to_content(client.0, client.1);
        self.zoom_to(level, anchor);
    }

    /// Moves the camera by a surface-pixel delta (content follows the pointer).
    pub fn pan_by_client(&mut self, dx: f64, dy: f64) {
        let z = self.zoom();
        self.view_box.x -= dx / z;
        self.view_box.y -= dy / z;
    }

    /// Maps a surface point to content coordinates, accounting for the centered letterbox of a
    /// view box whose aspect differs from the surface.
    pub fn client_to_content(&self, x: f64, y: f64) -> (f64, f64) {
        let z = self.zoom();
        let offset_x = (self.width - self.view_box.width * z) / 2.0;
        let offset_y = (self.height - self.view_box.height * z) / 2.0;
        (
            self.view_box.x + (x - offset_x) / z,
            self.view_box.y + (y - offset_y) / z,
        )
    }

    pub fn reset(&mut self) {
        self.view_box = self.home;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pads_small_and_caps_large() {
        assert_eq!(clamp_dimension(50.0, 100.0, 800.0), 100.0);
        assert_eq!(clamp_dimension(500.0, 100.0, 800.0), 500.0);
        assert_eq!(clamp_dimension(5000.0, 100.0, 800.0), 800.0);
    }

    #[test]
    fn zoom_range_depends_on_flavor() {
        let vl = ZoomRange::for_svg_type("voltage-level");
        assert_eq!((vl.min, vl.max, vl.step), (0.5, 10.0, 0.3));
        for other in ["substation", "network-area-diagram", ""] {
            let r = ZoomRange::for_svg_type(other);
            assert_eq!((r.min, r.max, r.step), (0.1, 10.0, 0.15));
        }
    }

    #[test]
    fn view_box_round_trips_through_text() {
        let vb: ViewBox = "-20 -20, 140 90".parse().expect("view box");
        assert_eq!(vb, ViewBox::new(-20.0, -20.0, 140.0, 90.0));
        assert_eq!(vb.to_string(), "-20 -20 140 90");
        assert!("1 2 3".parse::<ViewBox>().is_err());
        assert!("0 0 0 10".parse::<ViewBox>().is_err());
    }

    #[test]
    fn fitting_content_keeps_natural_view_box() {
        let natural = ViewBox::new(-20.0, -20.0, 300.0, 200.0);
        let vp = Viewport::fit(
            natural,
            &SizeConstraints::new(400.0, 100.0, 800.0, 700.0),
            ZoomRange::for_svg_type("voltage-level"),
        );
        assert_eq!((vp.width, vp.height), (400.0, 200.0));
        assert_eq!(vp.view_box, natural);
        assert_eq!(vp.pan_offset(), (0.0, 0.0));
    }

    #[test]
    fn wheel_zoom_is_clamped_and_panning_follows_pointer() {
        let natural = ViewBox::new(0.0, 0.0, 400.0, 400.0);
        let mut vp = Viewport::fit(
            natural,
            &SizeConstraints::new(1.0, 1.0, 1000.0, 1000.0),
            ZoomRange::for_svg_type("voltage-level"),
        );
        for _ in 0..50 {
            vp.zoom_by_wheel(100.0, (200.0, 200.0));
        }
        assert!((vp.zoom() - 0.5).abs() < 1e-9);

        vp.reset();
        assert_eq!(vp.view_box, natural);

        // Below the range, as after an oversize correction: out is refused, in is allowed.
        vp.zoom_to(0.4, (0.0, 0.0));
        let below = vp.view_box;
        vp.zoom_by_wheel(100.0, (200.0, 200.0));
        assert_eq!(vp.view_box, below);
        vp.zoom_by_wheel(-100.0, (0.0, 0.0));
        assert!((vp.zoom() - 0.52).abs() < 1e-9);

        vp.reset();
        vp.zoom_to(2.0, (0.0, 0.0));
        vp.pan_by_client(20.0, -10.0);
        assert_eq!(vp.pan_offset(), (-10.0, 5.0));
    }
}
