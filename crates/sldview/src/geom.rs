//! Bounds, affine transforms and the SVG attribute parsing the viewer relies on.

use serde::{Deserialize, Serialize};
use svgtypes::{PathParser, PathSegment};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.include_point(x, y);
        }
        Some(b)
    }

    pub fn include_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Maps the four corners through `t` and re-bounds them.
    pub fn transformed(&self, t: &AffineTransform) -> Bounds {
        let corners = [
            t.apply(self.min_x, self.min_y),
            t.apply(self.max_x, self.min_y),
            t.apply(self.min_x, self.max_y),
            t.apply(self.max_x, self.max_y),
        ];
        // Four corners, never empty.
        let mut b = Bounds {
            min_x: corners[0].0,
            min_y: corners[0].1,
            max_x: corners[0].0,
            max_y: corners[0].1,
        };
        for (x, y) in &corners[1..] {
            b.include_point(*x, *y);
        }
        b
    }
}

/// SVG 2D affine matrix in the same form as `matrix(a b c d e f)`:
///
/// ```text
///   [a c e]
///   [b d f]
///   [0 0 1]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(x: f64, y: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: x,
            f: y,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn rotate(angle_deg: f64) -> Self {
        let rad = angle_deg.to_radians();
        let (sin, cos) = rad.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self * rhs`: `rhs` is applied to points first.
    pub fn multiply(self, rhs: AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Parses a full SVG transform list. Unknown functions are ignored; a malformed list yields
    /// the transforms parsed so far.
    pub fn parse_list(transform: &str) -> AffineTransform {
        let mut out = AffineTransform::identity();
        for (name, args) in TransformFunctions::new(transform) {
            let Some(args) = args else {
                break;
            };
            let arg = |i: usize, default: f64| args.get(i).copied().unwrap_or(default);
            let op = match name {
                "translate" => AffineTransform::translate(arg(0, 0.0), arg(1, 0.0)),
                "scale" => {
                    let sx = arg(0, 1.0);
                    AffineTransform::scale(sx, arg(1, sx))
                }
                "rotate" => {
                    let r = AffineTransform::rotate(arg(0, 0.0));
                    match (args.get(1), args.get(2)) {
                        (Some(&cx), Some(&cy)) => AffineTransform::translate(cx, cy)
                            .multiply(r)
                            .multiply(AffineTransform::translate(-cx, -cy)),
                        _ => r,
                    }
                }
                "skewX" => AffineTransform {
                    c: arg(0, 0.0).to_radians().tan(),
                    ..AffineTransform::identity()
                },
                "skewY" => AffineTransform {
                    b: arg(0, 0.0).to_radians().tan(),
                    ..AffineTransform::identity()
                },
                "matrix" if args.len() == 6 => AffineTransform {
                    a: args[0],
                    b: args[1],
                    c: args[2],
                    d: args[3],
                    e: args[4],
                    f: args[5],
                },
                _ => continue,
            };
            out = out.multiply(op);
        }
        out
    }
}

/// Reads the anchor position of an element from its `transform` attribute.
///
/// Contract: the two leading numeric tokens of the first `translate(...)` function of the list.
/// A single token means `y = 0`. Other functions around it (`rotate`, `scale`, ...) are ignored,
/// so `translate(10,20) rotate(90)` and `rotate(90) translate(10,20)` both anchor at `(10, 20)`.
pub fn parse_translate(transform: &str) -> Option<(f64, f64)> {
    for (name, args) in TransformFunctions::new(transform) {
        if name != "translate" {
            continue;
        }
        let args = args?;
        return match args.as_slice() {
            [x] => Some((*x, 0.0)),
            [x, y, ..] => Some((*x, *y)),
            [] => None,
        };
    }
    None
}

/// Iterates `name(args)` groups of a transform list. `args` is `None` when a token is not a
/// number. Iteration stops at the first group without a closing parenthesis.
struct TransformFunctions<'a> {
    rest: &'a str,
}

impl<'a> TransformFunctions<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for TransformFunctions<'a> {
    type Item = (&'a str, Option<Vec<f64>>);

    fn next(&mut self) -> Option<Self::Item> {
        let s = self.rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if s.is_empty() {
            return None;
        }
        let open = s.find('(')?;
        let name = s[..open].trim();
        let inner_and_rest = &s[open + 1..];
        let close = inner_and_rest.find(')')?;
        let inner = &inner_and_rest[..close];
        self.rest = &inner_and_rest[close + 1..];

        let args = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>();
        Some((name, args))
    }
}

/// Parses a length attribute (`"12"`, `"12px"`). Percentages and other units are rejected.
pub fn parse_length(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_suffix("px").unwrap_or(s).trim();
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Parses `points="x1,y1 x2,y2 ..."` of polylines and polygons.
pub fn parse_points(raw: &str) -> Vec<(f64, f64)> {
    let nums = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<f64>().ok())
        .collect::<Vec<_>>();
    nums.chunks_exact(2).map(|p| (p[0], p[1])).collect()
}

/// Tight bounds of path data, including curve extrema.
pub fn path_bounds(d: &str) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    let mut include = |x: f64, y: f64| {
        bounds
            .get_or_insert(Bounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            })
            .include_point(x, y)
    };

    let (mut cx, mut cy) = (0.0_f64, 0.0_f64);
    let (mut start_x, mut start_y) = (0.0_f64, 0.0_f64);
    // Reflected control point of the previous cubic / quadratic segment.
    let mut prev_cubic: Option<(f64, f64)> = None;
    let mut prev_quad: Option<(f64, f64)> = None;

    for seg in PathParser::from(d) {
        let Ok(seg) = seg else {
            break;
        };
        let rel = |abs: bool, x: f64, y: f64, cx: f64, cy: f64| {
            if abs { (x, y) } else { (cx + x, cy + y) }
        };
        let mut next_cubic = None;
        let mut next_quad = None;
        match seg {
            PathSegment::MoveTo { abs, x, y } => {
                (cx, cy) = rel(abs, x, y, cx, cy);
                (start_x, start_y) = (cx, cy);
                include(cx, cy);
            }
            PathSegment::LineTo { abs, x, y } => {
                (cx, cy) = rel(abs, x, y, cx, cy);
                include(cx, cy);
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                cx = if abs { x } else { cx + x };
                include(cx, cy);
            }
            PathSegment::VerticalLineTo { abs, y } => {
                cy = if abs { y } else { cy + y };
                include(cx, cy);
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let p1 = rel(abs, x1, y1, cx, cy);
                let p2 = rel(abs, x2, y2, cx, cy);
                let p3 = rel(abs, x, y, cx, cy);
                include_cubic(&mut include, (cx, cy), p1, p2, p3);
                next_cubic = Some(p2);
                (cx, cy) = p3;
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let p1 = prev_cubic.map_or((cx, cy), |(px, py)| (2.0 * cx - px, 2.0 * cy - py));
                let p2 = rel(abs, x2, y2, cx, cy);
                let p3 = rel(abs, x, y, cx, cy);
                include_cubic(&mut include, (cx, cy), p1, p2, p3);
                next_cubic = Some(p2);
                (cx, cy) = p3;
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let q = rel(abs, x1, y1, cx, cy);
                let p = rel(abs, x, y, cx, cy);
                include_quadratic(&mut include, (cx, cy), q, p);
                next_quad = Some(q);
                (cx, cy) = p;
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let q = prev_quad.map_or((cx, cy), |(px, py)| (2.0 * cx - px, 2.0 * cy - py));
                let p = rel(abs, x, y, cx, cy);
                include_quadratic(&mut include, (cx, cy), q, p);
                next_quad = Some(q);
                (cx, cy) = p;
            }
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let end = rel(abs, x, y, cx, cy);
                for (px, py) in
                    arc_samples((cx, cy), end, rx, ry, x_axis_rotation, large_arc, sweep)
                {
                    include(px, py);
                }
                (cx, cy) = end;
            }
            PathSegment::ClosePath { .. } => {
                (cx, cy) = (start_x, start_y);
            }
        }
        prev_cubic = next_cubic;
        prev_quad = next_quad;
    }
    bounds
}

fn include_cubic(
    include: &mut impl FnMut(f64, f64),
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
) {
    include(p0.0, p0.1);
    include(p3.0, p3.1);
    let eval = |a: f64, b: f64, c: f64, d: f64, t: f64| {
        let mt = 1.0 - t;
        mt * mt * mt * a + 3.0 * mt * mt * t * b + 3.0 * mt * t * t * c + t * t * t * d
    };
    for t in cubic_extrema(p0.0, p1.0, p2.0, p3.0)
        .into_iter()
        .chain(cubic_extrema(p0.1, p1.1, p2.1, p3.1))
        .flatten()
    {
        include(
            eval(p0.0, p1.0, p2.0, p3.0, t),
            eval(p0.1, p1.1, p2.1, p3.1, t),
        );
    }
}

fn include_quadratic(
    include: &mut impl FnMut(f64, f64),
    p0: (f64, f64),
    q: (f64, f64),
    p: (f64, f64),
) {
    // Degree elevation to a cubic.
    let c1 = (p0.0 + 2.0 / 3.0 * (q.0 - p0.0), p0.1 + 2.0 / 3.0 * (q.1 - p0.1));
    let c2 = (p.0 + 2.0 / 3.0 * (q.0 - p.0), p.1 + 2.0 / 3.0 * (q.1 - p.1));
    include_cubic(include, p0, c1, c2, p);
}

/// Parameters in `(0, 1)` where the derivative of a 1D cubic Bezier vanishes.
fn cubic_extrema(p0: f64, p1: f64, p2: f64, p3: f64) -> [Option<f64>; 2] {
    const EPS: f64 = 1e-12;
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 2.0 * (p0 - 2.0 * p1 + p2);
    let c = p1 - p0;
    let in_range = |t: f64| (t > 0.0 && t < 1.0).then_some(t);

    if a.abs() <= EPS {
        if b.abs() <= EPS {
            return [None, None];
        }
        return [in_range(-c / b), None];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let s = disc.sqrt();
    [in_range((-b + s) / (2.0 * a)), in_range((-b - s) / (2.0 * a))]
}

/// Points along an elliptical arc (endpoint parameterization, SVG 1.1 F.6.5).
fn arc_samples(
    from: (f64, f64),
    to: (f64, f64),
    rx: f64,
    ry: f64,
    x_axis_rotation: f64,
    large_arc: bool,
    sweep: bool,
) -> Vec<(f64, f64)> {
    const SAMPLES: usize = 16;
    let (mut rx, mut ry) = (rx.abs(), ry.abs());
    if rx == 0.0 || ry == 0.0 || from == to {
        return vec![to];
    }

    let (sin_phi, cos_phi) = x_axis_rotation.to_radians().sin_cos();
    let dx2 = (from.0 - to.0) / 2.0;
    let dy2 = (from.1 - to.1) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let mut coef = if den == 0.0 {
        0.0
    } else {
        (num / den).max(0.0).sqrt()
    };
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;
    let center_x = cos_phi * cxp - sin_phi * cyp + (from.0 + to.0) / 2.0;
    let center_y = sin_phi * cxp + cos_phi * cyp + (from.1 + to.1) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| {
        let dot = ux * vx + uy * vy;
        let len = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
        let mut a = (dot / len).clamp(-1.0, 1.0).acos();
        if ux * vy - uy * vx < 0.0 {
            a = -a;
        }
        a
    };
    let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut delta = angle(
        (x1p - cxp) / rx,
        (y1p - cyp) / ry,
        (-x1p - cxp) / rx,
        (-y1p - cyp) / ry,
    );
    let two_pi = std::f64::consts::TAU;
    if !sweep && delta > 0.0 {
        delta -= two_pi;
    } else if sweep && delta < 0.0 {
        delta += two_pi;
    }

    (0..=SAMPLES)
        .map(|i| {
            let t = theta1 + delta * (i as f64 / SAMPLES as f64);
            let (sin_t, cos_t) = t.sin_cos();
            (
                center_x + rx * cos_t * cos_phi - ry * sin_t * sin_phi,
                center_y + rx * cos_t * sin_phi + ry * sin_t * cos_phi,
            )
        })
        .collect()
}
