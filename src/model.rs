use eframe::egui;
use serde::{Deserialize, Serialize};

pub type ElementId = u64;
pub type ConnectionId = u64;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_vec2(self) -> egui::Vec2 {
        egui::vec2(self.width, self.height)
    }
}

/// Color stored as straight (unpremultiplied) RGBA and serialized as a
/// `#rrggbb` / `#rrggbbaa` hex string.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s).ok_or_else(|| format!("invalid color `{s}`, expected #rrggbb"))
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> Self {
        c.to_hex()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub color: Rgba,
}

fn default_font_size() -> f32 {
    14.0
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_weight: FontWeight::Normal,
            text_align: TextAlign::Left,
            color: Rgba::BLACK,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStyle {
    Line,
    #[default]
    Arrow,
    DoubleArrow,
}

impl ConnectionStyle {
    pub const ALL: [ConnectionStyle; 3] = [
        ConnectionStyle::Line,
        ConnectionStyle::Arrow,
        ConnectionStyle::DoubleArrow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConnectionStyle::Line => "── Line",
            ConnectionStyle::Arrow => "──▶ Arrow",
            ConnectionStyle::DoubleArrow => "◀──▶ Double Arrow",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(default)]
    pub style: ConnectionStyle,
}

impl Connection {
    pub fn touches(&self, id: ElementId) -> bool {
        self.source_id == id || self.target_id == id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Element {
    pub id: ElementId,
    #[serde(flatten)]
    pub position: Point,
    #[serde(flatten)]
    pub size: Size,
    #[serde(flatten)]
    pub kind: ElementKind,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ElementKind {
    Icon {
        glyph: String,
        name: String,
        #[serde(default)]
        rotation: f32,
    },
    Image {
        content: String,
        name: String,
        #[serde(default)]
        rotation: f32,
    },
    Text {
        content: String,
        #[serde(default)]
        style: TextStyle,
        #[serde(default)]
        rotation: f32,
        #[serde(default, skip_serializing)]
        editing: bool,
    },
    TimelineLine {
        #[serde(default = "default_timeline_stroke")]
        stroke: Rgba,
    },
    TimelineLabel {
        content: String,
        #[serde(default)]
        style: TextStyle,
        #[serde(default)]
        coupled_id: Option<ElementId>,
        #[serde(default, skip_serializing)]
        editing: bool,
    },
}

pub(crate) fn default_timeline_stroke() -> Rgba {
    Rgba::rgb(0x6b, 0x72, 0x80)
}

impl Element {
    pub fn bounds(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.position.to_pos2(), self.size.to_vec2())
    }

    pub fn center(&self) -> egui::Pos2 {
        self.bounds().center()
    }

    /// Rotation in degrees. Timeline kinds are never rotated.
    pub fn rotation(&self) -> f32 {
        match &self.kind {
            ElementKind::Icon { rotation, .. }
            | ElementKind::Image { rotation, .. }
            | ElementKind::Text { rotation, .. } => *rotation,
            ElementKind::TimelineLine { .. } | ElementKind::TimelineLabel { .. } => 0.0,
        }
    }

    pub fn is_timeline(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::TimelineLine { .. } | ElementKind::TimelineLabel { .. }
        )
    }

    pub fn is_timeline_line(&self) -> bool {
        matches!(self.kind, ElementKind::TimelineLine { .. })
    }

    pub fn is_connectable(&self) -> bool {
        !self.is_timeline()
    }

    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Text { .. } | ElementKind::TimelineLabel { .. }
        )
    }

    pub fn is_editing(&self) -> bool {
        match &self.kind {
            ElementKind::Text { editing, .. } | ElementKind::TimelineLabel { editing, .. } => {
                *editing
            }
            _ => false,
        }
    }

    /// Sets the edit flag on text-bearing kinds; other kinds are left alone.
    pub(crate) fn set_editing(&mut self, value: bool) {
        if let ElementKind::Text { editing, .. } | ElementKind::TimelineLabel { editing, .. } =
            &mut self.kind
        {
            *editing = value;
        }
    }

    pub fn coupled_id(&self) -> Option<ElementId> {
        match &self.kind {
            ElementKind::TimelineLabel { coupled_id, .. } => *coupled_id,
            _ => None,
        }
    }

    pub fn text(&self) -> Option<(&str, &TextStyle)> {
        match &self.kind {
            ElementKind::Text { content, style, .. }
            | ElementKind::TimelineLabel { content, style, .. } => Some((content, style)),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match &self.kind {
            ElementKind::Icon { name, .. } | ElementKind::Image { name, .. } => name,
            ElementKind::Text { content, .. } | ElementKind::TimelineLabel { content, .. } => {
                content
            }
            ElementKind::TimelineLine { .. } => "Timeline",
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match &self.kind {
            ElementKind::Icon { .. } => "Icon",
            ElementKind::Image { .. } => "Image",
            ElementKind::Text { .. } => "Text",
            ElementKind::TimelineLine { .. } => "Timeline line",
            ElementKind::TimelineLabel { .. } => "Timeline label",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_hex_round_trip() {
        let c = Rgba::from_hex("#3b82f6").unwrap();
        assert_eq!(c, Rgba::rgb(0x3b, 0x82, 0xf6));
        assert_eq!(c.to_hex(), "#3b82f6");

        let translucent = Rgba::from_hex("#10b98180").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#10b98180");
    }

    #[test]
    fn test_rgba_rejects_malformed_hex() {
        assert!(Rgba::from_hex("3b82f6").is_none());
        assert!(Rgba::from_hex("#3b82").is_none());
        assert!(Rgba::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn test_element_json_shape() {
        let json = r##"{
            "id": 7,
            "type": "timelineLabel",
            "x": 170.0, "y": 90.0, "width": 60.0, "height": 24.0,
            "content": "Day 0",
            "style": { "fontSize": 12.0, "fontWeight": "bold", "textAlign": "center", "color": "#374151" },
            "coupledId": 6
        }"##;
        let element: Element = serde_json::from_str(json).unwrap();
        assert_eq!(element.id, 7);
        assert_eq!(element.position, Point::new(170.0, 90.0));
        assert_eq!(element.coupled_id(), Some(6));
        assert!(element.is_text_bearing());
        assert!(!element.is_connectable());
        assert!(!element.is_editing());
        let (content, style) = element.text().unwrap();
        assert_eq!(content, "Day 0");
        assert_eq!(style.font_weight, FontWeight::Bold);
        assert_eq!(style.text_align, TextAlign::Center);
    }

    #[test]
    fn test_timeline_kinds_report_zero_rotation() {
        let line = Element {
            id: 1,
            position: Point::new(200.0, 120.0),
            size: Size::new(2.0, 320.0),
            kind: ElementKind::TimelineLine {
                stroke: default_timeline_stroke(),
            },
        };
        assert_eq!(line.rotation(), 0.0);
        assert!(line.is_timeline_line());
        assert_eq!(line.display_name(), "Timeline");
    }

    #[test]
    fn test_connection_style_serializes_camel_case() {
        let json = serde_json::to_string(&ConnectionStyle::DoubleArrow).unwrap();
        assert_eq!(json, "\"doubleArrow\"");
    }
}
