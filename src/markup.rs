use crate::chunk::CaptureJob;
use crate::error::{CaptureError, PagecastError};
use crate::host::{CaptureHost, CaptureParams, Region, SectionOutline};
use crate::raster::RasterImage;
use crate::scene::{self, BoxStyle, Flow, Role, SceneChild, SceneElement};
use crate::types::Color;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};
use lightningcss::properties::Property;
use lightningcss::properties::display::{Display, DisplayInside, DisplayKeyword};
use lightningcss::properties::position::Position as CssPosition;
use lightningcss::stylesheet::{ParserOptions, StyleAttribute};
use lightningcss::values::color::{CssColor, SRGB};
use lightningcss::values::length::{LengthPercentage, LengthPercentageOrAuto};
use std::cell::Cell;
use std::path::Path;

pub const DENSE_ATTR: &str = "data-pdf-dense";
pub const SECTION_ATTR: &str = "data-pdf-section";
pub const ROW_ATTR: &str = "data-pdf-row";

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "template", "noscript"];
const CELL_PADDING_PX: f64 = 4.0;

/// Capture host over parsed HTML markup.
///
/// Regions are elements addressed by `id`. Dense regions are marked with
/// `data-pdf-dense` or contain `data-pdf-section` elements whose repeating
/// children carry `data-pdf-row`.
pub struct MarkupHost {
    document: NodeRef,
    viewport_width: f64,
    frames: Cell<u64>,
    ticks: Cell<u64>,
}

struct Outline {
    dense_marker: bool,
    rows: Vec<usize>,
}

impl MarkupHost {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            frames: Cell::new(0),
            ticks: Cell::new(0),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PagecastError> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::parse(&html))
    }

    pub fn with_viewport_width(mut self, width: f64) -> Self {
        if width.is_finite() && width > 0.0 {
            self.viewport_width = width;
        }
        self
    }

    /// Settle points awaited so far, as (frames, ticks).
    pub fn settle_counts(&self) -> (u64, u64) {
        (self.frames.get(), self.ticks.get())
    }

    fn find_region(&self, key: &str) -> Option<NodeRef> {
        let candidates = self.document.select("[id]").ok()?;
        for candidate in candidates {
            let matches = candidate.attributes.borrow().get("id") == Some(key);
            if matches {
                return Some(candidate.as_node().clone());
            }
        }
        None
    }

    /// Owned copy of the region's visual tree, roles assigned from its markers.
    pub fn snapshot(&self, key: &str) -> Option<SceneElement> {
        let node = self.find_region(key)?;
        snapshot_region(&node).map(|(root, _)| root)
    }
}

impl CaptureHost for MarkupHost {
    fn region(&self, key: &str) -> Option<Region> {
        let node = self.find_region(key)?;
        let (root, outline) = snapshot_region(&node)?;
        let css_width = root.style.width.unwrap_or(self.viewport_width);
        let mut measured = root;
        scene::normalize_root(&mut measured, css_width);
        let css_height = scene::measure_height(&measured, css_width);
        Some(Region {
            key: key.to_string(),
            css_width,
            css_height,
            is_dense: outline.dense_marker || !outline.rows.is_empty(),
            sections: outline
                .rows
                .into_iter()
                .map(|rows| SectionOutline { rows })
                .collect(),
        })
    }

    async fn next_frame(&self) {
        self.frames.set(self.frames.get() + 1);
        tokio::task::yield_now().await;
    }

    async fn next_tick(&self) {
        self.ticks.set(self.ticks.get() + 1);
        tokio::task::yield_now().await;
    }

    fn rasterize(
        &self,
        job: &CaptureJob,
        params: &CaptureParams,
    ) -> Result<RasterImage, CaptureError> {
        let node = self
            .find_region(&job.region_key)
            .ok_or_else(|| CaptureError::RegionGone(job.region_key.clone()))?;
        let (mut root, _) = snapshot_region(&node)
            .ok_or_else(|| CaptureError::RegionGone(job.region_key.clone()))?;
        scene::apply_mask(&mut root, &job.mask);
        scene::normalize_root(&mut root, params.css_width);
        scene::render(&root, params.css_width, params.scale, params.background)
    }
}

fn snapshot_region(node: &NodeRef) -> Option<(SceneElement, Outline)> {
    let dense_marker = node
        .as_element()
        .is_some_and(|el| el.attributes.borrow().contains(DENSE_ATTR));
    let mut outline = Outline {
        dense_marker,
        rows: Vec::new(),
    };
    let root = snapshot_element(node, &mut outline, None)?;
    Some((root, outline))
}

fn snapshot_element(
    node: &NodeRef,
    outline: &mut Outline,
    section: Option<usize>,
) -> Option<SceneElement> {
    let element = node.as_element()?;
    let tag = element.name.local.to_string();
    if SKIPPED_TAGS.contains(&tag.as_str()) {
        return None;
    }

    let mut section = section;
    let mut el = SceneElement::new(tag);
    {
        let attrs = element.attributes.borrow();
        el.style = style_for(&el.tag, attrs.get("style"), attrs.contains("hidden"));
        if attrs.contains(SECTION_ATTR) {
            let index = outline.rows.len();
            outline.rows.push(0);
            el.role = Role::Section(index);
            section = Some(index);
        } else if attrs.contains(ROW_ATTR) {
            if let Some(index) = section {
                let row = outline.rows[index];
                outline.rows[index] += 1;
                el.role = Role::Row {
                    section: index,
                    row,
                };
            }
        }
    }

    for child in node.children() {
        match child.data() {
            NodeData::Element(_) => {
                if let Some(child_el) = snapshot_element(&child, outline, section) {
                    el.children.push(SceneChild::Element(child_el));
                }
            }
            NodeData::Text(text) => {
                let text = text.borrow();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    el.children.push(SceneChild::Text(trimmed.to_string()));
                }
            }
            _ => {}
        }
    }
    Some(el)
}

fn style_for(tag: &str, inline: Option<&str>, hidden_attr: bool) -> BoxStyle {
    let mut style = BoxStyle {
        hidden: hidden_attr,
        ..BoxStyle::default()
    };
    match tag {
        "tr" => style.flow = Flow::Row,
        "td" | "th" => style.padding = CELL_PADDING_PX,
        _ => {}
    }
    let Some(inline) = inline else {
        return style;
    };
    let Ok(attr) = StyleAttribute::parse(inline, ParserOptions::default()) else {
        return style;
    };
    for prop in attr
        .declarations
        .declarations
        .iter()
        .chain(attr.declarations.important_declarations.iter())
    {
        apply_property(&mut style, prop);
    }
    style
}

fn apply_property(style: &mut BoxStyle, prop: &Property) {
    match prop {
        Property::Width(size) => style.width = size_to_px(size),
        Property::Height(size) => style.height = size_to_px(size),
        Property::Padding(value) => {
            if let Some(px) = lpa_to_px(&value.top) {
                style.padding = px;
            }
        }
        Property::PaddingTop(value) => {
            if let Some(px) = lpa_to_px(value) {
                style.padding = px;
            }
        }
        Property::BackgroundColor(color) => style.background = css_color_to_color(color),
        Property::Background(layers) => {
            if let Some(layer) = layers.last() {
                style.background = css_color_to_color(&layer.color);
            }
        }
        Property::Color(color) => {
            if let Some(color) = css_color_to_color(color) {
                style.color = color;
            }
        }
        Property::BorderBottomColor(color) => style.border_bottom = css_color_to_color(color),
        Property::BorderBottom(border) => style.border_bottom = css_color_to_color(&border.color),
        Property::Position(position) => {
            style.positioned = !matches!(position, CssPosition::Static);
        }
        Property::Left(value) => style.offset_x = lpa_to_px(value).unwrap_or(0.0),
        Property::Top(value) => style.offset_y = lpa_to_px(value).unwrap_or(0.0),
        Property::Transform(..) => style.transformed = true,
        Property::Display(display) => match display {
            Display::Keyword(DisplayKeyword::None) => style.hidden = true,
            Display::Keyword(DisplayKeyword::TableRow) => style.flow = Flow::Row,
            Display::Pair(pair) if matches!(pair.inside, DisplayInside::Flex(_)) => {
                style.flow = Flow::Row;
            }
            _ => style.flow = Flow::Block,
        },
        _ => {}
    }
}

fn size_to_px(size: &lightningcss::properties::size::Size) -> Option<f64> {
    match size {
        lightningcss::properties::size::Size::LengthPercentage(value) => lp_to_px(value),
        _ => None,
    }
}

fn lpa_to_px(value: &LengthPercentageOrAuto) -> Option<f64> {
    match value {
        LengthPercentageOrAuto::LengthPercentage(value) => lp_to_px(value),
        LengthPercentageOrAuto::Auto => None,
    }
}

fn lp_to_px(value: &LengthPercentage) -> Option<f64> {
    match value {
        LengthPercentage::Dimension(length) => length.to_px().map(f64::from),
        _ => None,
    }
}

fn css_color_to_color(color: &CssColor) -> Option<Color> {
    if let CssColor::RGBA(rgba) = color {
        let alpha = rgba.alpha as f32 / 255.0;
        // Preblend over white; captures are always opaque.
        let r = (rgba.red as f32 / 255.0) * alpha + (1.0 - alpha);
        let g = (rgba.green as f32 / 255.0) * alpha + (1.0 - alpha);
        let b = (rgba.blue as f32 / 255.0) * alpha + (1.0 - alpha);
        return Some(Color::rgb(r, g, b));
    }
    if let Ok(srgb) = SRGB::try_from(color) {
        return Some(Color::rgb(srgb.r, srgb.g, srgb.b));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{VisibilityMask, plan_jobs};

    const REPORT: &str = r#"<!doctype html>
<html><head><style>body { margin: 0 }</style></head>
<body>
  <div id="summary" style="width: 1000px; padding: 10px; background-color: #eef">
    <h1 style="height: 40px">Scan summary</h1>
    <p>Three hosts scanned, two findings.</p>
  </div>
  <div id="findings" style="position: absolute; left: -10000px; width: 1200px">
    <h2>Findings</h2>
    <table data-pdf-section>
      <tr data-pdf-row style="height: 20px"><td>a</td><td>b</td></tr>
      <tr data-pdf-row style="height: 20px"><td>c</td><td>d</td></tr>
      <tr data-pdf-row style="height: 20px"><td>e</td><td>f</td></tr>
    </table>
    <div data-pdf-section><p>No open ports.</p></div>
  </div>
  <div id="empty-dense" data-pdf-dense></div>
</body></html>"#;

    #[test]
    fn resolves_plain_region_with_inline_width() {
        let host = MarkupHost::parse(REPORT);
        let region = host.region("summary").expect("summary region");
        assert_eq!(region.css_width, 1000.0);
        assert!(!region.is_dense);
        // 10 + 40 + one text line + 10
        assert_eq!(region.css_height, 10.0 + 40.0 + scene::LINE_HEIGHT_PX + 10.0);
    }

    #[test]
    fn missing_region_resolves_to_none() {
        let host = MarkupHost::parse(REPORT);
        assert!(host.region("nope").is_none());
    }

    #[test]
    fn dense_region_exposes_sections_and_rows() {
        let host = MarkupHost::parse(REPORT);
        let region = host.region("findings").unwrap();
        assert!(region.is_dense);
        assert_eq!(
            region.sections,
            vec![SectionOutline { rows: 3 }, SectionOutline { rows: 0 }]
        );
        assert_eq!(plan_jobs(&region).len(), 2);
    }

    #[test]
    fn dense_marker_without_sections_is_still_dense() {
        let host = MarkupHost::parse(REPORT);
        let region = host.region("empty-dense").unwrap();
        assert!(region.is_dense);
        assert!(region.sections.is_empty());
    }

    #[test]
    fn viewport_width_applies_without_inline_width() {
        let html = r#"<div id="r"><p>hello</p></div>"#;
        let host = MarkupHost::parse(html).with_viewport_width(960.0);
        assert_eq!(host.region("r").unwrap().css_width, 960.0);
    }

    #[test]
    fn masked_capture_renders_only_the_row_chunk() {
        let host = MarkupHost::parse(REPORT);
        let job = CaptureJob {
            region_key: "findings".into(),
            mask: VisibilityMask::Section {
                index: 0,
                rows: Some(1..3),
            },
        };
        let params = CaptureParams {
            scale: 2.0,
            css_width: 1200.0,
            background: Color::WHITE,
        };
        let raster = host.rasterize(&job, &params).unwrap();
        assert_eq!(raster.width(), 2400);
        // heading line plus two 20px rows
        assert_eq!(raster.height(), ((scene::LINE_HEIGHT_PX + 40.0) * 2.0) as u32);
    }

    #[test]
    fn dense_region_heading_is_captured_with_its_rows() {
        let html = r#"<div id="f" style="width: 1000px">
            <h2 style="height: 40px; background-color: #203060"></h2>
            <table data-pdf-section><tr data-pdf-row style="height: 20px"><td>a</td></tr></table>
        </div>"#;
        let host = MarkupHost::parse(html);
        let region = host.region("f").unwrap();
        assert_eq!(region.css_height, 60.0);
        let jobs = plan_jobs(&region);
        assert_eq!(jobs.len(), 1);
        let params = CaptureParams {
            scale: 1.0,
            css_width: 1000.0,
            background: Color::WHITE,
        };
        let raster = host.rasterize(&jobs[0], &params).unwrap();
        assert_eq!(raster.height(), 60);
        assert_eq!(raster.pixels().unwrap().get_pixel(500, 20).0, [0x20, 0x30, 0x60, 255]);
    }

    #[test]
    fn nested_section_rows_are_captured_by_their_own_pass() {
        let html = r#"<div id="n" style="width: 1000px">
            <div data-pdf-section>
              <div data-pdf-row>
                <p style="height: 10px"></p>
                <table data-pdf-section><tr data-pdf-row style="height: 20px"><td>x</td></tr></table>
              </div>
            </div>
        </div>"#;
        let host = MarkupHost::parse(html);
        let region = host.region("n").unwrap();
        assert_eq!(
            region.sections,
            vec![SectionOutline { rows: 1 }, SectionOutline { rows: 1 }]
        );
        let params = CaptureParams {
            scale: 1.0,
            css_width: 1000.0,
            background: Color::WHITE,
        };
        let heights: Vec<u32> = plan_jobs(&region)
            .iter()
            .map(|job| host.rasterize(job, &params).unwrap().height())
            .collect();
        // outer pass hides the inner table; inner pass keeps the enclosing row
        assert_eq!(heights, vec![10, 30]);
    }

    #[test]
    fn offscreen_region_is_captured_in_place() {
        let host = MarkupHost::parse(REPORT);
        let job = CaptureJob::whole("findings");
        let params = CaptureParams {
            scale: 1.0,
            css_width: 1200.0,
            background: Color::WHITE,
        };
        let raster = host.rasterize(&job, &params).unwrap();
        let pixels = raster.pixels().unwrap();
        let inked = pixels.pixels().any(|p| p.0 != [255, 255, 255, 255]);
        assert!(inked, "normalized copy should paint inside the raster");
    }

    #[test]
    fn rasterizing_an_unmounted_region_fails_softly() {
        let host = MarkupHost::parse(REPORT);
        let params = CaptureParams {
            scale: 1.0,
            css_width: 900.0,
            background: Color::WHITE,
        };
        let err = host.rasterize(&CaptureJob::whole("gone"), &params).unwrap_err();
        assert_eq!(err, CaptureError::RegionGone("gone".into()));
    }

    #[test]
    fn display_none_hides_and_table_rows_flow_horizontally() {
        let style = style_for("div", Some("display: none"), false);
        assert!(style.hidden);
        let style = style_for("tr", None, false);
        assert_eq!(style.flow, Flow::Row);
        let style = style_for("div", Some("display: flex; padding: 6px"), false);
        assert_eq!(style.flow, Flow::Row);
        assert_eq!(style.padding, 6.0);
    }

    #[test]
    fn inline_colors_are_parsed() {
        let style = style_for("div", Some("background-color: #ff0000; color: rgb(0, 0, 255)"), false);
        assert_eq!(style.background.map(|c| c.to_rgb8()), Some([255, 0, 0]));
        assert_eq!(style.color.to_rgb8(), [0, 0, 255]);
    }
}
