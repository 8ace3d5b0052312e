use eframe::egui;

use crate::geometry;
use crate::interaction::{Interaction, Tool};
use crate::model::{self, Element, ElementKind, FontWeight, Rgba, TextAlign};
use crate::scene::Scene;

const CONNECTOR_COLOR: &str = "#3b82f6";
const SELECTION_COLOR: &str = "#3b82f6";
const SOURCE_COLOR: &str = "#10b981";
const GRID_COLOR: &str = "#f3f4f6";
const PADDING: f32 = 24.0;
/// Gap between an element's box and its highlight rectangle.
const HIGHLIGHT_MARGIN: f32 = 5.0;

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn fill_attrs(color: Rgba) -> String {
    if color.a == 255 {
        format!(r#"fill="{}""#, color.to_hex())
    } else {
        format!(
            r#"fill="{}" fill-opacity="{:.3}""#,
            Rgba { a: 255, ..color }.to_hex(),
            color.a as f32 / 255.0
        )
    }
}

fn svg_text_anchor(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "start",
        TextAlign::Center => "middle",
        TextAlign::Right => "end",
    }
}

fn svg_font_weight(weight: FontWeight) -> &'static str {
    match weight {
        FontWeight::Normal => "normal",
        FontWeight::Bold => "bold",
    }
}

fn text_anchor_x(rect: egui::Rect, align: TextAlign) -> f32 {
    match align {
        TextAlign::Left => rect.left(),
        TextAlign::Center => rect.center().x,
        TextAlign::Right => rect.right(),
    }
}

fn rotate_attr(e: &Element) -> String {
    let c = e.center();
    format!(
        r#" transform="rotate({:.3}, {:.3}, {:.3})""#,
        e.rotation(),
        c.x,
        c.y
    )
}

fn content_bounds(scene: &Scene) -> egui::Rect {
    scene
        .elements()
        .iter()
        .map(|e| {
            let b = e.bounds();
            if e.rotation() == 0.0 {
                b
            } else {
                egui::Rect::from_points(&geometry::rotated_rect_points(
                    b,
                    e.rotation().to_radians(),
                ))
            }
        })
        .reduce(|a, b| a.union(b))
        .unwrap_or_else(|| egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0)))
}

fn push_defs(out: &mut String, grid: Option<f32>) {
    out.push_str("<defs>\n");
    if let Some(g) = grid {
        out.push_str(&format!(
            r#"<pattern id="grid" width="{g}" height="{g}" patternUnits="userSpaceOnUse"><path d="M {g} 0 L 0 0 0 {g}" fill="none" stroke="{GRID_COLOR}" stroke-width="1"/></pattern>"#
        ));
        out.push('\n');
    }
    out.push_str(&format!(
        r#"<marker id="arrowhead" markerWidth="10" markerHeight="7" refX="9" refY="3.5" orient="auto"><polygon points="0 0, 10 3.5, 0 7" fill="{CONNECTOR_COLOR}"/></marker>"#
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<marker id="arrowhead-start" markerWidth="10" markerHeight="7" refX="1" refY="3.5" orient="auto"><polygon points="10 0, 0 3.5, 10 7" fill="{CONNECTOR_COLOR}"/></marker>"#
    ));
    out.push('\n');
    out.push_str("</defs>\n");
}

fn push_connection(out: &mut String, scene: &Scene, connection: &model::Connection) {
    let Some(segment) = geometry::connection_segment(scene.elements(), connection) else {
        return;
    };
    let markers = geometry::marker_selection(connection.style);
    let mut attrs = String::new();
    if markers.start {
        attrs.push_str(r#" marker-start="url(#arrowhead-start)""#);
    }
    if markers.end {
        attrs.push_str(r#" marker-end="url(#arrowhead)""#);
    }
    out.push_str(&format!(
        r#"<path d="{}" stroke="{CONNECTOR_COLOR}" stroke-width="2" fill="none"{attrs}/>"#,
        segment.path_data()
    ));
    out.push('\n');
}

fn push_element(out: &mut String, e: &Element) {
    let r = e.bounds();
    match &e.kind {
        ElementKind::Icon { glyph, .. } => {
            let c = r.center();
            out.push_str(&format!(
                r#"<text x="{:.3}" y="{:.3}" text-anchor="middle" dominant-baseline="middle" font-size="{:.3}"{}>{}</text>"#,
                c.x,
                c.y,
                r.width() * 0.6,
                rotate_attr(e),
                escape_xml(glyph)
            ));
        }
        ElementKind::Image { content, .. } => {
            out.push_str(&format!(
                r#"<image x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" href="{}"{}/>"#,
                r.min.x,
                r.min.y,
                r.width(),
                r.height(),
                escape_xml(content),
                rotate_attr(e)
            ));
        }
        ElementKind::Text { content, style, .. }
        | ElementKind::TimelineLabel { content, style, .. } => {
            out.push_str(&format!(
                r#"<text x="{:.3}" y="{:.3}" text-anchor="{}" dominant-baseline="middle" font-size="{:.3}" font-weight="{}" {}{}>{}</text>"#,
                text_anchor_x(r, style.text_align),
                r.center().y,
                svg_text_anchor(style.text_align),
                style.font_size,
                svg_font_weight(style.font_weight),
                fill_attrs(style.color),
                rotate_attr(e),
                escape_xml(content)
            ));
        }
        ElementKind::TimelineLine { stroke } => {
            let x = r.center().x;
            out.push_str(&format!(
                r#"<line x1="{x:.3}" y1="{:.3}" x2="{x:.3}" y2="{:.3}" stroke="{}" stroke-width="{:.3}"/>"#,
                r.top(),
                r.bottom(),
                stroke.to_hex(),
                r.width()
            ));
        }
    }
    out.push('\n');
}

fn push_highlight(out: &mut String, e: &Element, stroke: &str, width: f32, dashed: bool) {
    let r = e.bounds().expand(HIGHLIGHT_MARGIN);
    let dash = if dashed { r#" stroke-dasharray="5,5""# } else { "" };
    out.push_str(&format!(
        r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" rx="4" fill="none" stroke="{stroke}" stroke-width="{width}"{dash}/>"#,
        r.min.x,
        r.min.y,
        r.width(),
        r.height()
    ));
    out.push('\n');
}

/// Renders the scene the way the canvas shows it: grid (spacing `grid`, none
/// when `None`), timeline lines, connections, then the remaining elements,
/// each followed by its selection or connect-source highlight.
pub fn document_to_svg(scene: &Scene, interaction: &Interaction, grid: Option<f32>) -> String {
    let bounds = content_bounds(scene).expand(PADDING);

    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.3} {:.3} {:.3} {:.3}" width="{:.3}" height="{:.3}">"#,
        bounds.min.x,
        bounds.min.y,
        bounds.width(),
        bounds.height(),
        bounds.width(),
        bounds.height()
    ));
    out.push('\n');
    push_defs(&mut out, grid);
    out.push_str(&format!(
        r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="white"/>"#,
        bounds.min.x,
        bounds.min.y,
        bounds.width(),
        bounds.height()
    ));
    out.push('\n');
    if grid.is_some() {
        out.push_str(&format!(
            r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="url(#grid)"/>"#,
            bounds.min.x,
            bounds.min.y,
            bounds.width(),
            bounds.height()
        ));
        out.push('\n');
    }

    let (lines, others) = geometry::paint_order(scene.elements());
    let selected = interaction
        .selected()
        .filter(|_| interaction.tool() == Tool::Select);
    let source = interaction.connect_source();
    let push_with_highlights = |out: &mut String, e: &Element| {
        push_element(out, e);
        if selected == Some(e.id) {
            push_highlight(out, e, SELECTION_COLOR, 2.0, true);
        }
        if source == Some(e.id) {
            push_highlight(out, e, SOURCE_COLOR, 3.0, false);
        }
    };

    for e in lines {
        push_with_highlights(&mut out, e);
    }
    for c in scene.connections() {
        push_connection(&mut out, scene, c);
    }
    for e in others {
        push_with_highlights(&mut out, e);
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectionStyle, Point};
    use crate::scene::{ElementPatch, ElementPayload};

    fn icon(scene: &mut Scene, x: f32, y: f32) -> model::ElementId {
        scene.create_element(
            ElementPayload::Icon {
                glyph: "🧠".to_string(),
                name: "Brain".to_string(),
            },
            Some(Point::new(x, y)),
        )
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"a<b & "c"'"#), "a&lt;b &amp; &quot;c&quot;&apos;");
    }

    #[test]
    fn test_empty_scene_is_valid_document() {
        let svg = document_to_svg(&Scene::new(), &Interaction::default(), Some(20.0));
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"<marker id="arrowhead""#));
        assert!(svg.contains(r#"<marker id="arrowhead-start""#));
        assert!(svg.contains(r#"fill="url(#grid)""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_grid_follows_setting() {
        let scene = Scene::new();
        let ui = Interaction::default();
        let svg = document_to_svg(&scene, &ui, Some(40.0));
        assert!(svg.contains(r#"<pattern id="grid" width="40" height="40""#));
        assert!(svg.contains(r#"fill="url(#grid)""#));

        let svg = document_to_svg(&scene, &ui, None);
        assert!(!svg.contains(r#"id="grid""#));
        assert!(!svg.contains("url(#grid)"));
        assert!(svg.contains(r#"<marker id="arrowhead""#));
    }

    #[test]
    fn test_markers_follow_connection_style() {
        let mut scene = Scene::new();
        let a = icon(&mut scene, 100.0, 100.0);
        let b = icon(&mut scene, 300.0, 100.0);
        let c = icon(&mut scene, 300.0, 300.0);
        scene.create_connection(a, b, ConnectionStyle::Line).unwrap();
        scene.create_connection(b, c, ConnectionStyle::DoubleArrow).unwrap();
        let svg = document_to_svg(&scene, &Interaction::default(), Some(20.0));

        let paths: Vec<_> = svg.lines().filter(|l| l.starts_with("<path d=")).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].starts_with(r#"<path d="M 168.000 130.000 L 292.000 130.000""#));
        assert!(!paths[0].contains("marker"));
        assert!(paths[1].contains(r#"marker-start="url(#arrowhead-start)""#));
        assert!(paths[1].contains(r#"marker-end="url(#arrowhead)""#));
    }

    #[test]
    fn test_timeline_lines_paint_before_connections_and_icons() {
        let mut scene = Scene::new();
        let a = icon(&mut scene, 0.0, 0.0);
        let b = icon(&mut scene, 200.0, 0.0);
        scene.create_connection(a, b, ConnectionStyle::Arrow).unwrap();
        scene.create_timeline_marker(100.0, "Day 0");
        let svg = document_to_svg(&scene, &Interaction::default(), Some(20.0));

        let line = svg.find("<line").unwrap();
        let path = svg.find(r#"<path d="M 6"#).unwrap();
        let glyph = svg.find("🧠").unwrap();
        let label = svg.find("Day 0").unwrap();
        assert!(line < path);
        assert!(path < glyph);
        assert!(glyph < label);
        assert!(svg.contains(r##"stroke="#6b7280""##));
    }

    #[test]
    fn test_rotation_and_text_style() {
        let mut scene = Scene::new();
        let t = scene.create_element(ElementPayload::text_box(), Some(Point::new(10.0, 20.0)));
        scene.update_element(
            t,
            &ElementPatch {
                content: Some("Dose <1 Gy>".to_string()),
                rotation: Some(90.0),
                text_align: Some(TextAlign::Right),
                font_weight: Some(FontWeight::Bold),
                ..ElementPatch::default()
            },
        );
        let svg = document_to_svg(&scene, &Interaction::default(), Some(20.0));
        assert!(svg.contains(r#"transform="rotate(90.000, 85.000, 35.000)""#));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(svg.contains(r#"font-weight="bold""#));
        assert!(svg.contains("Dose &lt;1 Gy&gt;"));
    }

    #[test]
    fn test_highlights() {
        let mut scene = Scene::new();
        let a = icon(&mut scene, 0.0, 0.0);
        let b = icon(&mut scene, 200.0, 0.0);
        let mut ui = Interaction::default();
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.pointer_up();
        let svg = document_to_svg(&scene, &ui, Some(20.0));
        assert!(svg.contains(r#"stroke-dasharray="5,5""#));
        assert!(svg.contains(r#"<rect x="-5.000" y="-5.000" width="70.000" height="70.000""#));

        ui.select_tool(&mut scene, Tool::Connect);
        ui.pointer_down(&mut scene, Some(b), egui::pos2(201.0, 1.0));
        let svg = document_to_svg(&scene, &ui, Some(20.0));
        assert!(!svg.contains("stroke-dasharray"));
        assert!(svg.contains(&format!(r#"stroke="{SOURCE_COLOR}" stroke-width="3""#)));
    }
}
