//! Shape records produced by the layout parser.
//!
//! A [`Shape`] is a positioned, sized rectangle-ish element with a handful of
//! common styling fields plus kind-specific data carried by [`ShapeKind`].
//! Shapes are created while decoding a layout document and discarded once the
//! painter has consumed them; nothing here is persisted.

use serde::Serialize;

/// Magnitude used whenever a shape does not declare an explicit border.
///
/// Freshly parsed shapes store `-DEFAULT_BORDER_SIZE` in `border_width`; the
/// negative sign marks "no explicit border" for the painter.
pub const DEFAULT_BORDER_SIZE: i32 = 4;

/// Font size given to labels that do not declare one.
pub const DEFAULT_FONT_SIZE: i32 = 10;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from a packed ARGB integer, as stored in layout
    /// documents.  The alpha byte is ignored.
    pub fn from_argb(value: i32) -> Self {
        let v = value as u32;
        Self {
            r: ((v >> 16) & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: (v & 0xFF) as u8,
        }
    }

    /// Packs the color as a fully opaque ARGB integer.
    pub fn to_argb(self) -> i32 {
        (0xFF00_0000u32 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b))
            as i32
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let packed = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::from_argb(packed as i32))
    }
}

/// A point in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Returns the top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// The value of a shape element's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Rectangle,
    Label,
    Circle,
    Polygon,
    Container,
    Custom,
}

impl ShapeType {
    /// Maps a `type` attribute to a shape type; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "rectangle" => Some(Self::Rectangle),
            "label" => Some(Self::Label),
            "circle" => Some(Self::Circle),
            "polygon" => Some(Self::Polygon),
            "container" => Some(Self::Container),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Label => "label",
            Self::Circle => "circle",
            Self::Polygon => "polygon",
            Self::Container => "container",
            Self::Custom => "custom",
        }
    }
}

/// Kind-specific shape data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle {
        is_slot: bool,
    },
    Label {
        text: String,
        text_color: Option<Rgb>,
        font_size: i32,
    },
    Circle {
        ellipse_color: Option<Rgb>,
        oval_color: Option<Rgb>,
    },
    Polygon {
        interior_color: Option<Rgb>,
        outline_color: Option<Rgb>,
    },
    Container,
    /// A reference to another model's layout document, resolved recursively.
    Custom {
        model_id: String,
        class_name: Option<String>,
    },
}

impl ShapeKind {
    /// Returns the kind with every field at its default value.
    pub fn default_for(shape_type: ShapeType) -> Self {
        match shape_type {
            ShapeType::Rectangle => Self::Rectangle { is_slot: false },
            ShapeType::Label => Self::Label {
                text: String::new(),
                text_color: None,
                font_size: DEFAULT_FONT_SIZE,
            },
            ShapeType::Circle => Self::Circle {
                ellipse_color: None,
                oval_color: None,
            },
            ShapeType::Polygon => Self::Polygon {
                interior_color: None,
                outline_color: None,
            },
            ShapeType::Container => Self::Container,
            ShapeType::Custom => Self::Custom {
                model_id: String::new(),
                class_name: None,
            },
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Rectangle { .. } => ShapeType::Rectangle,
            Self::Label { .. } => ShapeType::Label,
            Self::Circle { .. } => ShapeType::Circle,
            Self::Polygon { .. } => ShapeType::Polygon,
            Self::Container => ShapeType::Container,
            Self::Custom { .. } => ShapeType::Custom,
        }
    }
}

/// The atomic geometric unit of a layout.
///
/// `x`/`y` are scene coordinates once the shape has been placed by a
/// [`crate::RenderFrame`]; before that they hold the raw document values.
/// A `None` color means "not specified": the painter falls back to the
/// device class color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub color: Option<Rgb>,
    pub border_color: Option<Rgb>,
    /// Negative values mean "no explicit border".
    pub border_width: i32,
    pub opaque: bool,
    /// Empty for decorative shapes that never correlate with a device.
    pub name: String,
    pub is_equipment: bool,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl Shape {
    /// Creates a zero-sized shape of the given kind with no explicit border.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            color: None,
            border_color: None,
            border_width: -DEFAULT_BORDER_SIZE,
            opaque: false,
            name: String::new(),
            is_equipment: false,
            kind,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }

    /// `true` when the shape has no name and therefore never maps to a device.
    pub fn is_decorative(&self) -> bool {
        self.name.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// `true` for rectangles flagged as slots, whose matched device renders
    /// its children inside the rectangle.
    pub fn is_slot(&self) -> bool {
        matches!(self.kind, ShapeKind::Rectangle { is_slot: true })
    }

    /// The referenced model id of a custom shape.
    pub fn custom_model_id(&self) -> Option<&str> {
        match &self.kind {
            ShapeKind::Custom { model_id, .. } => Some(model_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_argb_ignores_alpha() {
        // opaque rgb(12, 34, 56) as stored
        let packed = 0xFF0C_2238u32 as i32;
        assert_eq!(Rgb::from_argb(packed), Rgb::new(12, 34, 56));
    }

    #[test]
    fn test_rgb_to_argb_sets_full_alpha() {
        let argb = Rgb::new(255, 0, 0).to_argb();
        assert_eq!(argb, -65536);
    }

    #[test]
    fn test_rgb_from_hex_accepts_optional_hash() {
        assert_eq!(Rgb::from_hex("#00ff80"), Some(Rgb::new(0, 255, 128)));
        assert_eq!(Rgb::from_hex("00FF80"), Some(Rgb::new(0, 255, 128)));
        assert_eq!(Rgb::from_hex("#fff"), None);
    }

    #[test]
    fn test_shape_type_parse_rejects_unknown_names() {
        assert_eq!(ShapeType::parse("rectangle"), Some(ShapeType::Rectangle));
        assert_eq!(ShapeType::parse("custom"), Some(ShapeType::Custom));
        assert_eq!(ShapeType::parse("hexagon"), None);
        assert_eq!(ShapeType::parse("Rectangle"), None);
    }

    #[test]
    fn test_new_shape_has_negative_border_sentinel() {
        let shape = Shape::new(ShapeKind::Container);
        assert_eq!(shape.border_width, -DEFAULT_BORDER_SIZE);
    }

    #[test]
    fn test_is_slot_only_for_slot_rectangles() {
        let slot = Shape::new(ShapeKind::Rectangle { is_slot: true });
        let plain = Shape::new(ShapeKind::Rectangle { is_slot: false });
        let label = Shape::new(ShapeKind::default_for(ShapeType::Label));
        assert!(slot.is_slot());
        assert!(!plain.is_slot());
        assert!(!label.is_slot());
    }
}
