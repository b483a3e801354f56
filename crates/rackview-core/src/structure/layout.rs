//! Layout document codec.
//!
//! Document format:
//! ```xml
//! <layout width="200" height="100">
//!   <shape type="rectangle" x="10" y="10" width="50" height="20" name="slot1" isSlot="true"/>
//!   <shape type="label" x="0" y="0" width="40" height="10" label="PSU" fontSize="8"/>
//!   <shape type="custom" id="42" x="60" y="10" width="50" height="20"/>
//! </layout>
//! ```
//!
//! Decoding is split in two steps.  [`LayoutDocument::parse`] reads the raw,
//! unscaled shapes in document order; [`LayoutDocument::place`] maps them into
//! a [`RenderFrame`], which is where proportional scaling happens.  Custom
//! shapes are kept as references; expanding them needs the inventory and is
//! done by the engine.
//!
//! # Scaling (for beginners)
//!
//! A layout is authored on a canvas of its own (`width`/`height` of the
//! `<layout>` element).  To draw it into a rectangle of a different size every
//! coordinate is multiplied by `target / declared` on its axis, rounded half
//! up, and shifted by the frame origin:
//!
//! ```text
//! x' = round(x * scale_x) + origin.x        w' = round(w * scale_x)
//! ```

use roxmltree::Node;
use thiserror::Error;

use super::push_attr;
use crate::domain::shape::{Bounds, Point, Rgb, Shape, ShapeKind, ShapeType, DEFAULT_BORDER_SIZE};

/// Errors produced while decoding an XML document.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    /// The bytes are not UTF-8 or not well-formed XML.
    #[error("the document seems corrupted and could not be loaded: {0}")]
    Corrupted(String),
}

/// A decoded layout document with its shapes still in document coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutDocument {
    /// Declared canvas width (0 when absent).
    pub width: i32,
    /// Declared canvas height (0 when absent).
    pub height: i32,
    pub shapes: Vec<Shape>,
}

/// Where and how large a layout is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFrame {
    /// Added to every scaled `x`/`y`.
    pub origin: Point,
    /// Only `width`/`height` take part in scaling.
    pub target: Bounds,
    /// When set the document is drawn at scale 1.
    pub original_size: bool,
}

impl RenderFrame {
    /// Draws the document at its declared size with its origin at `origin`.
    pub fn original(origin: Point) -> Self {
        Self {
            origin,
            target: Bounds::default(),
            original_size: true,
        }
    }

    /// Scales the document to fill `bounds`.
    pub fn fit(bounds: Bounds) -> Self {
        Self {
            origin: bounds.origin(),
            target: bounds,
            original_size: false,
        }
    }

    /// The frame of the layout nested in a custom shape: the shape's corner is
    /// the origin and its size, offset by the border, is the target.
    pub fn nested_in(shape: &Shape) -> Self {
        Self {
            origin: Point::new(shape.x, shape.y),
            target: Bounds::new(
                -DEFAULT_BORDER_SIZE,
                -DEFAULT_BORDER_SIZE,
                shape.width,
                shape.height,
            ),
            original_size: false,
        }
    }

    /// Horizontal and vertical scale factors for `document`.
    ///
    /// Falls back to 1 on an axis whose declared size is zero or negative.
    pub fn scale(&self, document: &LayoutDocument) -> (f64, f64) {
        if self.original_size {
            return (1.0, 1.0);
        }
        (
            axis_scale(self.target.width, document.width),
            axis_scale(self.target.height, document.height),
        )
    }
}

fn axis_scale(target: i32, declared: i32) -> f64 {
    if declared <= 0 {
        1.0
    } else {
        f64::from(target) / f64::from(declared)
    }
}

/// Rounds half up, the way the stored layouts were authored.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

impl LayoutDocument {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    /// Decodes a layout document.
    ///
    /// Elements are visited in document order.  Shapes with a missing or
    /// unknown `type` are skipped.  Malformed numbers read as 0.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Corrupted`] when the bytes are not UTF-8 or not
    /// well-formed XML.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Corrupted(e.to_string()))?;
        let xml =
            roxmltree::Document::parse(text).map_err(|e| ParseError::Corrupted(e.to_string()))?;

        let mut document = LayoutDocument::default();
        for node in xml.descendants().filter(Node::is_element) {
            match node.tag_name().name() {
                "layout" => {
                    document.width = int_attr(&node, "width");
                    document.height = int_attr(&node, "height");
                }
                "shape" => {
                    if let Some(shape) = decode_shape(&node) {
                        document.shapes.push(shape);
                    }
                }
                _ => {}
            }
        }
        Ok(document)
    }

    /// Returns the shapes mapped into `frame`.
    ///
    /// Widths and heights never go below zero.
    pub fn place(&self, frame: &RenderFrame) -> Vec<Shape> {
        let (scale_x, scale_y) = frame.scale(self);
        self.shapes
            .iter()
            .map(|raw| {
                let mut shape = raw.clone();
                shape.x = round_half_up(f64::from(raw.x) * scale_x) + frame.origin.x;
                shape.y = round_half_up(f64::from(raw.y) * scale_y) + frame.origin.y;
                shape.width = round_half_up(f64::from(raw.width) * scale_x).max(0);
                shape.height = round_half_up(f64::from(raw.height) * scale_y).max(0);
                shape
            })
            .collect()
    }

    /// Serializes the document back to its stored XML form.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(64 + self.shapes.len() * 128);
        out.push_str("<layout");
        push_attr(&mut out, "width", &self.width.to_string());
        push_attr(&mut out, "height", &self.height.to_string());
        out.push('>');
        for shape in &self.shapes {
            encode_shape(&mut out, shape);
        }
        out.push_str("</layout>");
        out
    }
}

/// Decodes `bytes` and maps the shapes into `frame` in one step.
///
/// # Examples
///
/// ```rust
/// use rackview_core::{parse_layout, Bounds, RenderFrame};
///
/// let xml = br#"<layout width="200" height="100">
///   <shape type="rectangle" x="10" y="10" width="50" height="20" name="slot1"/>
/// </layout>"#;
/// let shapes = parse_layout(xml, &RenderFrame::fit(Bounds::new(0, 0, 100, 50))).unwrap();
/// assert_eq!((shapes[0].x, shapes[0].y, shapes[0].width, shapes[0].height), (5, 5, 25, 10));
/// ```
pub fn parse_layout(bytes: &[u8], frame: &RenderFrame) -> Result<Vec<Shape>, ParseError> {
    Ok(LayoutDocument::parse(bytes)?.place(frame))
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

fn decode_shape(node: &Node<'_, '_>) -> Option<Shape> {
    let type_name = node.attribute("type").unwrap_or_default();
    let Some(shape_type) = ShapeType::parse(type_name) else {
        tracing::debug!(shape_type = type_name, "skipping shape of unknown type");
        return None;
    };

    let mut shape = Shape::new(ShapeKind::default_for(shape_type));
    shape.x = int_attr(node, "x");
    shape.y = int_attr(node, "y");
    shape.width = int_attr(node, "width");
    shape.height = int_attr(node, "height");
    shape.opaque = bool_attr(node, "opaque");
    shape.name = node.attribute("name").unwrap_or_default().to_string();
    shape.is_equipment = bool_attr(node, "isEquipment");

    if shape_type != ShapeType::Custom && shape_type != ShapeType::Container {
        shape.color = color_attr(node, "color");
        shape.border_color = color_attr(node, "borderColor");
    }

    match &mut shape.kind {
        ShapeKind::Rectangle { is_slot } => *is_slot = bool_attr(node, "isSlot"),
        ShapeKind::Label {
            text,
            text_color,
            font_size,
        } => {
            *text = node.attribute("label").unwrap_or_default().to_string();
            *text_color = color_attr(node, "textColor");
            if node.has_attribute("fontSize") {
                *font_size = int_attr(node, "fontSize");
            }
        }
        ShapeKind::Circle {
            ellipse_color,
            oval_color,
        } => {
            *ellipse_color = color_attr(node, "ellipseColor");
            *oval_color = color_attr(node, "ovalColor");
        }
        ShapeKind::Polygon {
            interior_color,
            outline_color,
        } => {
            *interior_color = color_attr(node, "interiorColor");
            *outline_color = color_attr(node, "outlineColor");
        }
        ShapeKind::Custom { model_id, class_name } => {
            *model_id = node.attribute("id").unwrap_or_default().to_string();
            *class_name = node.attribute("className").map(str::to_string);
        }
        ShapeKind::Container => {}
    }
    Some(shape)
}

fn int_attr(node: &Node<'_, '_>, name: &str) -> i32 {
    let Some(raw) = node.attribute(name) else {
        return 0;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::debug!(attribute = name, value = raw, "malformed integer attribute, using 0");
        0
    })
}

fn bool_attr(node: &Node<'_, '_>, name: &str) -> bool {
    node.attribute(name)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn color_attr(node: &Node<'_, '_>, name: &str) -> Option<Rgb> {
    let raw = node.attribute(name)?;
    match raw.trim().parse::<i32>() {
        Ok(argb) => Some(Rgb::from_argb(argb)),
        Err(_) => {
            tracing::debug!(attribute = name, value = raw, "malformed color attribute ignored");
            None
        }
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

fn encode_shape(out: &mut String, shape: &Shape) {
    out.push_str("<shape");
    push_attr(out, "type", shape.shape_type().as_str());
    push_attr(out, "x", &shape.x.to_string());
    push_attr(out, "y", &shape.y.to_string());
    push_attr(out, "width", &shape.width.to_string());
    push_attr(out, "height", &shape.height.to_string());
    push_attr(out, "opaque", bool_text(shape.opaque));
    push_attr(out, "name", &shape.name);
    push_attr(out, "isEquipment", bool_text(shape.is_equipment));
    push_color(out, "color", shape.color);
    push_color(out, "borderColor", shape.border_color);

    match &shape.kind {
        ShapeKind::Rectangle { is_slot } => push_attr(out, "isSlot", bool_text(*is_slot)),
        ShapeKind::Label {
            text,
            text_color,
            font_size,
        } => {
            push_attr(out, "label", text);
            push_color(out, "textColor", *text_color);
            push_attr(out, "fontSize", &font_size.to_string());
        }
        ShapeKind::Circle {
            ellipse_color,
            oval_color,
        } => {
            push_color(out, "ellipseColor", *ellipse_color);
            push_color(out, "ovalColor", *oval_color);
        }
        ShapeKind::Polygon {
            interior_color,
            outline_color,
        } => {
            push_color(out, "interiorColor", *interior_color);
            push_color(out, "outlineColor", *outline_color);
        }
        ShapeKind::Custom { model_id, class_name } => {
            push_attr(out, "id", model_id);
            if let Some(class_name) = class_name {
                push_attr(out, "className", class_name);
            }
        }
        ShapeKind::Container => {}
    }
    out.push_str("/>");
}

fn push_color(out: &mut String, name: &str, color: Option<Rgb>) {
    if let Some(color) = color {
        push_attr(out, name, &color.to_argb().to_string());
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SLOT_DOC: &[u8] = br#"<layout width="200" height="100">
        <shape type="rectangle" x="10" y="10" width="50" height="20" name="slot1"/>
    </layout>"#;

    #[test]
    fn test_parse_reads_declared_canvas() {
        let doc = LayoutDocument::parse(SLOT_DOC).unwrap();
        assert_eq!((doc.width, doc.height), (200, 100));
        assert_eq!(doc.shapes.len(), 1);
    }

    #[test]
    fn test_parse_scales_into_target_bounds() {
        let shapes = parse_layout(SLOT_DOC, &RenderFrame::fit(Bounds::new(0, 0, 100, 50))).unwrap();
        let s = &shapes[0];
        assert_eq!((s.x, s.y, s.width, s.height), (5, 5, 25, 10));
        assert_eq!(s.name, "slot1");
    }

    #[test]
    fn test_original_size_keeps_coordinates_and_adds_origin() {
        let shapes = parse_layout(SLOT_DOC, &RenderFrame::original(Point::new(7, 3))).unwrap();
        let s = &shapes[0];
        assert_eq!((s.x, s.y, s.width, s.height), (17, 13, 50, 20));
    }

    #[test]
    fn test_zero_declared_size_falls_back_to_unit_scale() {
        let xml = br#"<layout><shape type="container" x="4" y="4" width="8" height="8"/></layout>"#;
        let shapes = parse_layout(xml, &RenderFrame::fit(Bounds::new(0, 0, 500, 500))).unwrap();
        assert_eq!((shapes[0].width, shapes[0].height), (8, 8));
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(2.49), 2);
    }

    #[test]
    fn test_unknown_and_missing_types_are_skipped() {
        let xml = br#"<layout width="10" height="10">
            <shape type="hexagon" x="1"/>
            <shape x="2"/>
            <shape type="circle" x="3"/>
        </layout>"#;
        let doc = LayoutDocument::parse(xml).unwrap();
        assert_eq!(doc.shapes.len(), 1);
        assert_eq!(doc.shapes[0].x, 3);
    }

    #[test]
    fn test_malformed_numbers_default_to_zero() {
        let xml = br#"<layout width="abc" height="10">
            <shape type="rectangle" x="1.5" y="" width="5" height="oops"/>
        </layout>"#;
        let doc = LayoutDocument::parse(xml).unwrap();
        let s = &doc.shapes[0];
        assert_eq!(doc.width, 0);
        assert_eq!((s.x, s.y, s.width, s.height), (0, 0, 5, 0));
    }

    #[test]
    fn test_booleans_are_case_insensitive() {
        let xml = br#"<layout>
            <shape type="rectangle" isSlot="TRUE" opaque="yes" isEquipment="True"/>
        </layout>"#;
        let s = &LayoutDocument::parse(xml).unwrap().shapes[0];
        assert!(s.is_slot());
        assert!(!s.opaque);
        assert!(s.is_equipment);
    }

    #[test]
    fn test_every_shape_starts_with_negative_border() {
        let doc = LayoutDocument::parse(SLOT_DOC).unwrap();
        assert_eq!(doc.shapes[0].border_width, -DEFAULT_BORDER_SIZE);
    }

    #[test]
    fn test_label_fields_and_colors() {
        let xml = br#"<layout>
            <shape type="label" label="PSU &amp; fans" textColor="-16777216" fontSize="8"
                   color="-65536"/>
        </layout>"#;
        let s = &LayoutDocument::parse(xml).unwrap().shapes[0];
        assert_eq!(s.color, Some(Rgb::new(255, 0, 0)));
        assert_eq!(
            s.kind,
            ShapeKind::Label {
                text: "PSU & fans".into(),
                text_color: Some(Rgb::new(0, 0, 0)),
                font_size: 8,
            }
        );
    }

    #[test]
    fn test_custom_shapes_ignore_colors_and_keep_reference() {
        let xml = br#"<layout>
            <shape type="custom" id="42" className="CustomShape" color="-65536" x="1"/>
        </layout>"#;
        let doc = LayoutDocument::parse(xml).unwrap();
        let s = &doc.shapes[0];
        assert_eq!(s.color, None);
        assert_eq!(s.custom_model_id(), Some("42"));
    }

    #[test]
    fn test_corrupted_documents_are_reported() {
        assert!(matches!(
            LayoutDocument::parse(b"<layout><shape"),
            Err(ParseError::Corrupted(_))
        ));
        assert!(matches!(
            LayoutDocument::parse(&[0xff, 0xfe, 0x00]),
            Err(ParseError::Corrupted(_))
        ));
    }

    #[test]
    fn test_nested_frame_uses_shape_corner_and_size() {
        let mut host = Shape::new(ShapeKind::default_for(ShapeType::Custom));
        host.x = 40;
        host.y = 60;
        host.width = 100;
        host.height = 50;
        let frame = RenderFrame::nested_in(&host);
        assert_eq!(frame.origin, Point::new(40, 60));
        assert_eq!((frame.target.width, frame.target.height), (100, 50));
        assert!(!frame.original_size);
    }

    #[test]
    fn test_to_xml_decodes_to_the_same_document() {
        let xml = br#"<layout width="300" height="120">
            <shape type="rectangle" x="1" y="2" width="3" height="4" name="a&quot;b"
                   isSlot="true" color="-16711936"/>
            <shape type="label" x="5" y="5" width="20" height="10" label="&lt;PSU&gt;"
                   fontSize="12"/>
            <shape type="circle" x="0" y="0" width="9" height="9" ellipseColor="-1"
                   ovalColor="-16777216"/>
            <shape type="polygon" x="0" y="0" width="9" height="9" interiorColor="-256"/>
            <shape type="container" x="0" y="0" width="300" height="120" opaque="true"/>
            <shape type="custom" id="m-7" className="CustomShape" x="10" y="10" width="50"
                   height="50" isEquipment="true"/>
        </layout>"#;
        let doc = LayoutDocument::parse(xml).unwrap();
        let again = LayoutDocument::parse(doc.to_xml().as_bytes()).unwrap();
        assert_eq!(again, doc);
    }
}
