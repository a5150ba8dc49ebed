//! Exporting a [`Scene`] of geometric primitives to SVG.
//!
//! The only persisted format this crate knows about (crate design §6). A
//! [`Scene`] is a flat, ordered list of primitives; `export_svg` writes a
//! single `<svg>` document the way `scene.py`'s `export_svg` does — one
//! `<style>` block up front, then one element per primitive, in order.
//! There is no reader: nothing in this crate ever parses SVG back in.

use std::io::{self, Write};

use crate::geometry::{LineSegment, Point, Polyline};

const STYLE_BLOCK: &str = r#"<style type="text/css">
.primitives {
   stroke: black;
}
.cp {
   fill: none;
   stroke: orange;
}
</style>"#;

/// Half the side length of the square marker drawn for a [`Point`], in
/// the exported SVG's own coordinate units (after scaling).
const POINT_MARKER_HALF_WIDTH: f64 = 5.0;

/// A drawable geometric primitive, owning (or referencing) the
/// [`crate::geometry`] value it renders.
///
/// `drawables.py`'s `Drawable` is a one-method abstract base with two
/// concrete subclasses (`Point`, `LineSegment`); this is the same
/// dispatch modeled as a closed enum rather than a class hierarchy, in
/// the spirit of the crate's `ExprKind`/`ConstraintKind` tagged-sum
/// dispatch (crate design §9).
#[derive(Debug, Clone)]
pub enum Primitive {
    /// A single point, drawn as a centered square marker.
    Point(Point),
    /// A segment between two points, drawn as a line.
    Segment(LineSegment),
    /// A closed ring of points, drawn as its constituent segments (a
    /// supplement over the original `primitives.py`, which never
    /// modeled polylines as a drawable — see `SPEC_FULL.md` §6).
    Polyline(Polyline),
}

impl From<Point> for Primitive {
    fn from(point: Point) -> Self {
        Self::Point(point)
    }
}

impl From<LineSegment> for Primitive {
    fn from(segment: LineSegment) -> Self {
        Self::Segment(segment)
    }
}

impl From<Polyline> for Primitive {
    fn from(polyline: Polyline) -> Self {
        Self::Polyline(polyline)
    }
}

impl Primitive {
    fn export_svg(&self, writer: &mut impl Write, scale: f64) -> io::Result<()> {
        match self {
            Self::Point(point) => write_point(writer, point, scale),
            Self::Segment(segment) => write_segment(writer, segment, scale),
            Self::Polyline(polyline) => {
                for segment in polyline.segments() {
                    write_segment(writer, segment, scale)?;
                }
                Ok(())
            }
        }
    }
}

fn write_point(writer: &mut impl Write, point: &Point, scale: f64) -> io::Result<()> {
    let x = point.x.value() * scale;
    let y = point.y.value() * scale;
    let w = POINT_MARKER_HALF_WIDTH;
    writeln!(
        writer,
        r#"<rect x="{}" y="{}" width="{}" height="{}" class="cp" />"#,
        x - w,
        y - w,
        2.0 * w,
        2.0 * w
    )
}

fn write_segment(writer: &mut impl Write, segment: &LineSegment, scale: f64) -> io::Result<()> {
    writeln!(
        writer,
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" class="primitives" />"#,
        segment.a.x.value() * scale,
        segment.a.y.value() * scale,
        segment.b.x.value() * scale,
        segment.b.y.value() * scale
    )
}

/// An ordered collection of primitives, rendered to SVG in insertion
/// order. Holds no constraints and no solver state — a scene only reads
/// the current values of whatever variables its primitives reference.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
}

impl Scene {
    /// An empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self { primitives: Vec::new() }
    }

    /// Appends a primitive, accepting anything convertible via
    /// [`Primitive`]'s `From` impls (`Point`, `LineSegment`, `Polyline`,
    /// or a [`Primitive`] directly).
    pub fn add(&mut self, primitive: impl Into<Primitive>) {
        self.primitives.push(primitive.into());
    }

    /// How many primitives this scene holds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether this scene holds no primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Writes a single `<svg>` document: the shared `<style>` block,
    /// then every primitive's element in insertion order, then the
    /// closing tag. Coordinates are each primitive's current variable
    /// values multiplied by `scale`.
    ///
    /// # Errors
    /// Propagates any I/O error from `writer`.
    pub fn export_svg(&self, writer: &mut impl Write, scale: f64) -> io::Result<()> {
        writeln!(writer, r#"<svg xmlns="http://www.w3.org/2000/svg">"#)?;
        writeln!(writer, "{STYLE_BLOCK}")?;
        for primitive in &self.primitives {
            primitive.export_svg(writer, scale)?;
        }
        writeln!(writer, "</svg>")
    }
}
