//! Rebuilds the tree picture from a flat frame.
//!
//! The controller only sends a linear color list plus (usually once) the layout
//! metadata. Everything here is a pure transform of that input: colors are never
//! reordered or rewritten, only placed.

use shared::{
    domain::{parse_hex_color, BranchId, Layout, PixelLocation, Rgb, Side},
    protocol::Frame,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("no layout metadata received yet")]
    MissingMeta,
    #[error("invalid layout metadata: {0}")]
    InvalidLayout(String),
    #[error("frame carries {actual} colors, layout expects {expected}")]
    ColorCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Trunk,
    Branch(BranchId),
}

/// Cell coordinates: `x` is 0 on the trunk, negative to the left and positive
/// to the right; `y` is the trunk row, growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedPixel {
    /// Position in the frame's color list.
    pub index: usize,
    pub segment: Segment,
    pub point: GridPoint,
    pub color: Rgb,
}

/// Geometry recovered for one branch from its placed pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchGeometry {
    pub anchor: u16,
    pub side: Side,
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub layout: Layout,
    pub on: Option<bool>,
    pub brightness: Option<u8>,
    pub pixels: Vec<PlacedPixel>,
}

impl Scene {
    pub fn segment(&self, segment: Segment) -> impl Iterator<Item = &PlacedPixel> + '_ {
        self.pixels.iter().filter(move |pixel| pixel.segment == segment)
    }

    /// Reads anchor, side and direction back out of the drawing. Direction is
    /// only observable with two or more pixels per branch.
    pub fn branch_geometry(&self, branch: BranchId) -> Option<BranchGeometry> {
        let mut pixels = self.segment(Segment::Branch(branch));
        let first = pixels.next()?;
        let last = pixels.last().unwrap_or(first);
        let anchor = u16::try_from(first.point.y).ok()?;
        let side = if first.point.x < 0 {
            Side::Left
        } else {
            Side::Right
        };
        Some(BranchGeometry {
            anchor,
            side,
            reversed: first.point.x.abs() > last.point.x.abs(),
        })
    }

    pub fn render_ascii(&self) -> String {
        render_ascii(self)
    }
}

/// Grid cell for linear index `index`, or `None` past the end of the layout.
pub fn place(layout: &Layout, index: usize) -> Option<(Segment, GridPoint)> {
    match layout.locate(index)? {
        PixelLocation::Trunk { row } => Some((
            Segment::Trunk,
            GridPoint {
                x: 0,
                y: row as i32,
            },
        )),
        PixelLocation::Branch { branch, offset } => {
            let reach = draw_position(layout, branch, offset) as i32 + 1;
            let x = match branch.side() {
                Side::Left => -reach,
                Side::Right => reach,
            };
            Some((
                Segment::Branch(branch),
                GridPoint {
                    x,
                    y: i32::from(layout.anchor(branch)),
                },
            ))
        }
    }
}

/// Distance from the trunk in cells, 0 being adjacent. Reversed branches are
/// wired outer-to-inner.
fn draw_position(layout: &Layout, branch: BranchId, offset: usize) -> usize {
    let len = usize::from(layout.branch_len);
    if layout.is_reversed(branch) {
        len.saturating_sub(1 + offset)
    } else {
        offset
    }
}

/// Caches the layout from the first frame that carries metadata and places
/// every later frame against it.
#[derive(Debug, Default)]
pub struct Reconstructor {
    layout: Option<Layout>,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: Layout) -> Result<Self, GeometryError> {
        layout
            .validate()
            .map_err(|err| GeometryError::InvalidLayout(err.message))?;
        Ok(Self {
            layout: Some(layout),
        })
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn reconstruct(&mut self, frame: &Frame) -> Result<Scene, GeometryError> {
        if self.layout.is_none() {
            if let Some(meta) = &frame.meta {
                let layout = Layout::from(meta);
                layout
                    .validate()
                    .map_err(|err| GeometryError::InvalidLayout(err.message))?;
                self.layout = Some(layout);
            }
        }
        let layout = self.layout.as_ref().ok_or(GeometryError::MissingMeta)?;

        let expected = layout.pixel_count();
        if frame.colors.len() != expected {
            return Err(GeometryError::ColorCountMismatch {
                expected,
                actual: frame.colors.len(),
            });
        }

        let pixels = frame
            .colors
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let (segment, point) = place(layout, index)?;
                Some(PlacedPixel {
                    index,
                    segment,
                    point,
                    color: parse_hex_color(raw).unwrap_or_default(),
                })
            })
            .collect();

        Ok(Scene {
            layout: layout.clone(),
            on: frame.on,
            brightness: frame.b,
            pixels,
        })
    }
}

/// Pixel math of the browser viewer: square cells with a fixed gap, trunk
/// centered horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasGeometry {
    pub width: i32,
    pub cell: i32,
    pub gap: i32,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self {
            width: 600,
            cell: 6,
            gap: 2,
        }
    }
}

impl CanvasGeometry {
    pub fn step(&self) -> i32 {
        self.cell + self.gap
    }

    pub fn trunk_x(&self) -> i32 {
        self.width / 2 - self.cell / 2
    }

    /// Top-left corner of the cell drawn for `point`.
    pub fn origin(&self, point: GridPoint) -> (i32, i32) {
        let y = point.y * self.step();
        let reach = point.x.abs() * self.step();
        let x = match point.x {
            0 => self.trunk_x(),
            x if x > 0 => self.trunk_x() + self.cell + self.gap + reach,
            _ => self.trunk_x() - self.gap - reach - self.cell,
        };
        (x, y)
    }
}

fn render_ascii(scene: &Scene) -> String {
    let reach = i32::from(scene.layout.branch_len);
    let width = (2 * reach + 1) as usize;
    let mut rows = vec![vec![' '; width]; usize::from(scene.layout.trunk_len)];

    for pixel in &scene.pixels {
        let lit = pixel.color != Rgb::default();
        let glyph = match (pixel.segment, lit) {
            (Segment::Trunk, true) => '#',
            (Segment::Trunk, false) => '|',
            (Segment::Branch(_), true) => '*',
            (Segment::Branch(_), false) => '-',
        };
        let column = (pixel.point.x + reach) as usize;
        if let Some(cell) = rows
            .get_mut(pixel.point.y as usize)
            .and_then(|row| row.get_mut(column))
        {
            *cell = glyph;
        }
    }

    rows.into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "tests/geometry_tests.rs"]
mod tests;
