//! Owned snapshot of a region's visual tree.
//!
//! A snapshot is taken for every capture pass, masked and normalized on its own
//! and painted into an off-screen pixmap; the live tree it came from is never
//! touched. Layout is plain block flow (rows lay their cells out side by side)
//! and text is drawn as greeked line bars, which is enough for page geometry
//! and print proofs.

use crate::chunk::VisibilityMask;
use crate::error::CaptureError;
use crate::raster::RasterImage;
use crate::types::Color;
use tiny_skia::{Paint, Pixmap, Rect, Transform};

pub const CHAR_WIDTH_PX: f64 = 7.0;
pub const LINE_HEIGHT_PX: f64 = 18.0;
const TEXT_BAR_PX: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Plain,
    Section(usize),
    Row { section: usize, row: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Block,
    Row,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub padding: f64,
    pub background: Option<Color>,
    pub color: Color,
    pub border_bottom: Option<Color>,
    pub positioned: bool,
    pub offset_x: f64,
    pub offset_y: f64,
    pub transformed: bool,
    pub hidden: bool,
    pub flow: Flow,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            padding: 0.0,
            background: None,
            color: Color::BLACK,
            border_bottom: None,
            positioned: false,
            offset_x: 0.0,
            offset_y: 0.0,
            transformed: false,
            hidden: false,
            flow: Flow::Block,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneChild {
    Element(SceneElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub tag: String,
    pub role: Role,
    pub style: BoxStyle,
    pub children: Vec<SceneChild>,
}

impl SceneElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            role: Role::Plain,
            style: BoxStyle::default(),
            children: Vec::new(),
        }
    }

    pub fn count_rows(&self) -> usize {
        let own = usize::from(matches!(self.role, Role::Row { .. }));
        own + self
            .children
            .iter()
            .map(|child| match child {
                SceneChild::Element(el) => el.count_rows(),
                SceneChild::Text(_) => 0,
            })
            .sum::<usize>()
    }

    pub fn contains_section(&self, index: usize) -> bool {
        self.children.iter().any(|child| match child {
            SceneChild::Element(el) => el.role == Role::Section(index) || el.contains_section(index),
            SceneChild::Text(_) => false,
        })
    }
}

/// Drop the sub-sections and rows the mask hides. Everything else in the region
/// stays, and a hidden section or row that encloses the shown section is kept
/// as its ancestor.
pub fn apply_mask(root: &mut SceneElement, mask: &VisibilityMask) {
    let VisibilityMask::Section { index: shown, .. } = *mask else {
        return;
    };
    retain_children(root, mask, shown);
}

fn retain_children(el: &mut SceneElement, mask: &VisibilityMask, shown: usize) {
    el.children.retain_mut(|child| match child {
        SceneChild::Text(_) => true,
        SceneChild::Element(child) => retain_element(child, mask, shown),
    });
}

fn retain_element(el: &mut SceneElement, mask: &VisibilityMask, shown: usize) -> bool {
    let visible = match el.role {
        Role::Plain => true,
        Role::Section(index) => mask.shows_section(index),
        Role::Row { section, row } => mask.shows_row(section, row),
    };
    if !visible && !el.contains_section(shown) {
        return false;
    }
    retain_children(el, mask, shown);
    true
}

/// Force the root into deterministic layout regardless of how the live page
/// positions it (off-screen placement, transforms, hidden wrappers).
pub fn normalize_root(root: &mut SceneElement, css_width: f64) {
    root.style.positioned = false;
    root.style.offset_x = 0.0;
    root.style.offset_y = 0.0;
    root.style.transformed = false;
    root.style.hidden = false;
    root.style.width = Some(css_width);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FillOp {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    color: Color,
}

struct Layout {
    ops: Vec<FillOp>,
}

impl Layout {
    fn fill(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) -> usize {
        self.ops.push(FillOp {
            x,
            y,
            width,
            height,
            color,
        });
        self.ops.len() - 1
    }

    fn set_height(&mut self, index: usize, value: f64) {
        self.ops[index].height = value;
    }

    fn element(&mut self, el: &SceneElement, x: f64, y: f64, avail_width: f64) -> f64 {
        let style = &el.style;
        if style.hidden {
            return 0.0;
        }
        let (x, y) = if style.positioned {
            (x + style.offset_x, y + style.offset_y)
        } else {
            (x, y)
        };
        let width = style.width.unwrap_or(avail_width).max(0.0);
        let background = style
            .background
            .map(|color| self.fill(x, y, width, 0.0, color));

        let pad = style.padding.max(0.0);
        let inner_x = x + pad;
        let inner_y = y + pad;
        let inner_width = (width - 2.0 * pad).max(0.0);

        let content_height = match style.flow {
            Flow::Block => {
                let mut cursor = inner_y;
                for child in &el.children {
                    cursor += match child {
                        SceneChild::Element(child) => self.element(child, inner_x, cursor, inner_width),
                        SceneChild::Text(text) => {
                            self.text(text, inner_x, cursor, inner_width, style.color)
                        }
                    };
                }
                cursor - inner_y
            }
            Flow::Row => {
                // Loose text between cells lays out as an anonymous cell.
                let cells: Vec<&SceneChild> = el
                    .children
                    .iter()
                    .filter(|child| match child {
                        SceneChild::Element(cell) => !cell.style.hidden,
                        SceneChild::Text(_) => true,
                    })
                    .collect();
                let cell_width = if cells.is_empty() {
                    0.0
                } else {
                    inner_width / cells.len() as f64
                };
                let mut tallest: f64 = 0.0;
                for (i, cell) in cells.iter().enumerate() {
                    let cell_x = inner_x + cell_width * i as f64;
                    let cell_height = match cell {
                        SceneChild::Element(cell) => self.element(cell, cell_x, inner_y, cell_width),
                        SceneChild::Text(text) => {
                            self.text(text, cell_x, inner_y, cell_width, style.color)
                        }
                    };
                    tallest = tallest.max(cell_height);
                }
                tallest
            }
        };

        let height = style.height.unwrap_or(content_height + 2.0 * pad).max(0.0);
        if let Some(index) = background {
            self.set_height(index, height);
        }
        if let Some(color) = style.border_bottom {
            if height >= 1.0 {
                self.fill(x, y + height - 1.0, width, 1.0, color);
            }
        }
        height
    }

    fn text(&mut self, text: &str, x: f64, y: f64, width: f64, color: Color) -> f64 {
        let lines = wrap_line_lengths(text, width);
        for (i, chars) in lines.iter().enumerate() {
            let bar_width = (*chars as f64 * CHAR_WIDTH_PX).min(width);
            let bar_y = y + i as f64 * LINE_HEIGHT_PX + (LINE_HEIGHT_PX - TEXT_BAR_PX) / 2.0;
            self.fill(x, bar_y, bar_width, TEXT_BAR_PX, color);
        }
        lines.len() as f64 * LINE_HEIGHT_PX
    }
}

// Greedy word wrap; returns the character count of every line.
pub fn wrap_line_lengths(text: &str, width: f64) -> Vec<usize> {
    let per_line = ((width / CHAR_WIDTH_PX).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current > 0 && current + 1 + len > per_line {
            lines.push(current);
            current = 0;
        }
        current = if current == 0 { len } else { current + 1 + len };
    }
    if current > 0 {
        lines.push(current);
    }
    lines
}

/// Layout height in CSS pixels of `root` laid out at `css_width`.
pub fn measure_height(root: &SceneElement, css_width: f64) -> f64 {
    let mut layout = Layout { ops: Vec::new() };
    layout.element(root, 0.0, 0.0, css_width)
}

/// Paint a normalized snapshot at `scale` onto an opaque background.
pub fn render(
    root: &SceneElement,
    css_width: f64,
    scale: f64,
    background: Color,
) -> Result<RasterImage, CaptureError> {
    let mut layout = Layout { ops: Vec::new() };
    let height = layout.element(root, 0.0, 0.0, css_width);

    let width_px = (css_width * scale).ceil();
    let height_px = (height * scale).ceil();
    if !(width_px >= 1.0 && height_px >= 1.0) {
        return Err(CaptureError::Degenerate {
            width: width_px.max(0.0) as u32,
            height: height_px.max(0.0) as u32,
        });
    }
    let mut pixmap = Pixmap::new(width_px as u32, height_px as u32).ok_or_else(|| {
        CaptureError::Raster(format!(
            "raster size {}x{} exceeds pixmap limits",
            width_px, height_px
        ))
    })?;
    pixmap.fill(background.to_skia());

    let transform = Transform::from_scale(scale as f32, scale as f32);
    let mut paint = Paint::default();
    paint.anti_alias = false;
    for op in &layout.ops {
        let FillOp {
            x,
            y,
            width,
            height,
            color,
        } = *op;
        let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) else {
            continue;
        };
        paint.set_color(color.to_skia());
        pixmap.fill_rect(rect, &paint, transform, None);
    }

    Ok(RasterImage::from_pixmap(pixmap, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: f64, color: Color) -> SceneElement {
        let mut el = SceneElement::new("div");
        el.style.height = Some(height);
        el.style.background = Some(color);
        el
    }

    fn table(rows: usize) -> SceneElement {
        let mut root = SceneElement::new("section");
        let mut heading = SceneElement::new("h2");
        heading.children.push(SceneChild::Text("Findings".into()));
        root.children.push(SceneChild::Element(heading));
        for section in 0..2 {
            let mut sec = SceneElement::new("table");
            sec.role = Role::Section(section);
            for row in 0..rows {
                let mut tr = block(10.0, Color::BLACK);
                tr.role = Role::Row { section, row };
                sec.children.push(SceneChild::Element(tr));
            }
            root.children.push(SceneChild::Element(sec));
        }
        root
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        // 70px -> 10 chars per line
        assert_eq!(wrap_line_lengths("aaaa bbbb cccc", 70.0), vec![9, 4]);
        assert!(wrap_line_lengths("   ", 70.0).is_empty());
    }

    #[test]
    fn block_flow_stacks_children() {
        let mut root = SceneElement::new("div");
        root.style.padding = 5.0;
        root.children.push(SceneChild::Element(block(20.0, Color::BLACK)));
        root.children.push(SceneChild::Element(block(30.0, Color::BLACK)));
        assert_eq!(measure_height(&root, 500.0), 60.0);
    }

    #[test]
    fn row_flow_uses_tallest_cell() {
        let mut row = SceneElement::new("tr");
        row.style.flow = Flow::Row;
        row.children.push(SceneChild::Element(block(12.0, Color::BLACK)));
        row.children.push(SceneChild::Element(block(40.0, Color::BLACK)));
        assert_eq!(measure_height(&row, 300.0), 40.0);
    }

    #[test]
    fn mask_keeps_only_requested_rows_of_one_section() {
        let mut root = table(5);
        apply_mask(
            &mut root,
            &VisibilityMask::Section {
                index: 1,
                rows: Some(1..3),
            },
        );
        // heading stays, section 0 dropped
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.count_rows(), 2);
        assert_eq!(measure_height(&root, 500.0), LINE_HEIGHT_PX + 20.0);
    }

    fn nested() -> SceneElement {
        // outer section 0 holds two rows; the first wraps inner section 1.
        let mut inner = SceneElement::new("table");
        inner.role = Role::Section(1);
        for row in 0..3 {
            let mut tr = block(5.0, Color::BLACK);
            tr.role = Role::Row { section: 1, row };
            inner.children.push(SceneChild::Element(tr));
        }
        let mut host_row = SceneElement::new("div");
        host_row.role = Role::Row { section: 0, row: 0 };
        host_row.children.push(SceneChild::Element(block(10.0, Color::BLACK)));
        host_row.children.push(SceneChild::Element(inner));
        let mut plain_row = block(10.0, Color::BLACK);
        plain_row.role = Role::Row { section: 0, row: 1 };
        let mut outer = SceneElement::new("div");
        outer.role = Role::Section(0);
        outer.children.push(SceneChild::Element(host_row));
        outer.children.push(SceneChild::Element(plain_row));
        let mut root = SceneElement::new("div");
        root.children.push(SceneChild::Element(outer));
        root
    }

    #[test]
    fn inner_section_pass_keeps_enclosing_section_and_row() {
        let mut root = nested();
        apply_mask(
            &mut root,
            &VisibilityMask::Section {
                index: 1,
                rows: Some(0..2),
            },
        );
        assert!(root.contains_section(1));
        // enclosing row keeps its own cell, the sibling outer row is gone
        assert_eq!(root.count_rows(), 1 + 2);
        assert_eq!(measure_height(&root, 100.0), 10.0 + 2.0 * 5.0);
    }

    #[test]
    fn outer_section_pass_hides_inner_section() {
        let mut root = nested();
        apply_mask(
            &mut root,
            &VisibilityMask::Section {
                index: 0,
                rows: Some(0..2),
            },
        );
        assert!(!root.contains_section(1));
        assert_eq!(root.count_rows(), 2);
        assert_eq!(measure_height(&root, 100.0), 20.0);
    }

    #[test]
    fn loose_text_in_a_row_is_an_anonymous_cell() {
        let mut row = SceneElement::new("div");
        row.style.flow = Flow::Row;
        row.children.push(SceneChild::Text("status".into()));
        row.children.push(SceneChild::Element(block(12.0, Color::BLACK)));
        assert_eq!(measure_height(&row, 300.0), LINE_HEIGHT_PX);

        let raster = render(&row, 300.0, 1.0, Color::WHITE).unwrap();
        let pixels = raster.pixels().unwrap();
        // text bar sits in the first half, centred in its line
        assert_eq!(pixels.get_pixel(10, 9).0, [0, 0, 0, 255]);
    }

    #[test]
    fn whole_mask_is_a_no_op() {
        let mut root = table(3);
        let before = root.clone();
        apply_mask(&mut root, &VisibilityMask::Whole);
        assert_eq!(root, before);
    }

    #[test]
    fn section_without_rows_keeps_static_content() {
        let mut root = SceneElement::new("div");
        let mut sec = SceneElement::new("div");
        sec.role = Role::Section(0);
        sec.children.push(SceneChild::Text("No findings".into()));
        root.children.push(SceneChild::Element(sec));
        apply_mask(&mut root, &VisibilityMask::Section { index: 0, rows: None });
        assert_eq!(measure_height(&root, 500.0), LINE_HEIGHT_PX);
    }

    #[test]
    fn normalization_pulls_offscreen_root_back() {
        let mut root = block(10.0, Color::BLACK);
        root.style.positioned = true;
        root.style.offset_x = -10000.0;
        root.style.transformed = true;
        normalize_root(&mut root, 100.0);
        let raster = render(&root, 100.0, 1.0, Color::WHITE).unwrap();
        let pixels = raster.pixels().unwrap();
        assert_eq!(pixels.get_pixel(50, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn render_scales_dimensions() {
        let root = block(25.0, Color::BLACK);
        let raster = render(&root, 100.0, 2.0, Color::WHITE).unwrap();
        assert_eq!((raster.width(), raster.height()), (200, 50));
        assert_eq!(raster.scale(), 2.0);
    }

    #[test]
    fn empty_content_is_degenerate() {
        let root = SceneElement::new("div");
        let err = render(&root, 100.0, 2.0, Color::WHITE).unwrap_err();
        assert!(matches!(err, CaptureError::Degenerate { height: 0, .. }));
    }

    #[test]
    fn background_fills_unpainted_area() {
        let mut root = SceneElement::new("div");
        root.style.height = Some(10.0);
        let bg = Color::from_rgb8(240, 240, 250);
        let raster = render(&root, 20.0, 1.0, bg).unwrap();
        assert_eq!(raster.pixels().unwrap().get_pixel(3, 3).0, [240, 240, 250, 255]);
    }
}
