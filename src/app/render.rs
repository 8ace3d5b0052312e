use crate::geometry;
use crate::interaction::{Interaction, Tool};
use crate::model::{self, Element, ElementKind, FontWeight, Rgba, TextAlign};
use crate::scene::{ElementPatch, Scene};
use eframe::egui;

use super::Textures;

const CONNECTOR_COLOR: egui::Color32 = egui::Color32::from_rgb(0x3b, 0x82, 0xf6);
const SELECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(0x3b, 0x82, 0xf6);
const SOURCE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x10, 0xb9, 0x81);
const GRID_COLOR: egui::Color32 = egui::Color32::from_rgb(0xf3, 0xf4, 0xf6);

/// Maps canvas coordinates to the screen. The canvas is scaled about its top
/// left corner.
#[derive(Clone, Copy, Debug)]
pub(super) struct View {
    pub origin: egui::Pos2,
    pub zoom: f32,
}

impl View {
    pub fn to_screen(&self, p: egui::Pos2) -> egui::Pos2 {
        self.origin + p.to_vec2() * self.zoom
    }

    pub fn rect_to_screen(&self, r: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.to_screen(r.min), self.to_screen(r.max))
    }
}

pub(super) fn tool_button(ui: &mut egui::Ui, label: &str, tool: Tool, active: Tool) -> bool {
    ui.selectable_label(active == tool, label).clicked()
}

fn color_row(ui: &mut egui::Ui, rgba: Rgba) -> Option<Rgba> {
    let mut picked = None;
    ui.horizontal(|ui| {
        let presets = [
            egui::Color32::from_rgb(0, 0, 0),
            egui::Color32::from_rgb(0x37, 0x41, 0x51),
            egui::Color32::from_rgb(0x6b, 0x72, 0x80),
            egui::Color32::from_rgb(0xb9, 0x1c, 0x1c),
            egui::Color32::from_rgb(0x04, 0x78, 0x57),
            egui::Color32::from_rgb(0x1d, 0x4e, 0xd8),
        ];
        for c in presets {
            if ui
                .add_sized([18.0, 18.0], egui::Button::new("").fill(c))
                .clicked()
            {
                picked = Some(Rgba::from_color32(c));
            }
        }
        let mut arr = [rgba.r, rgba.g, rgba.b, rgba.a];
        if ui.color_edit_button_srgba_unmultiplied(&mut arr).changed() {
            picked = Some(Rgba {
                r: arr[0],
                g: arr[1],
                b: arr[2],
                a: arr[3],
            });
        }
    });
    picked
}

fn text_controls(ui: &mut egui::Ui, style: &model::TextStyle, patch: &mut ElementPatch) {
    let mut size = style.font_size;
    if ui
        .add(egui::Slider::new(&mut size, 10.0..=48.0).text("Font size"))
        .changed()
    {
        patch.font_size = Some(size);
    }
    ui.horizontal(|ui| {
        ui.label("Weight:");
        let mut weight = style.font_weight;
        egui::ComboBox::from_id_salt("font_weight")
            .selected_text(match weight {
                FontWeight::Normal => "Normal",
                FontWeight::Bold => "Bold",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut weight, FontWeight::Normal, "Normal");
                ui.selectable_value(&mut weight, FontWeight::Bold, "Bold");
            });
        if weight != style.font_weight {
            patch.font_weight = Some(weight);
        }
    });
    ui.horizontal(|ui| {
        ui.label("Align:");
        let mut align = style.text_align;
        ui.selectable_value(&mut align, TextAlign::Left, "Left");
        ui.selectable_value(&mut align, TextAlign::Center, "Center");
        ui.selectable_value(&mut align, TextAlign::Right, "Right");
        if align != style.text_align {
            patch.text_align = Some(align);
        }
    });
    ui.label("Color");
    if let Some(c) = color_row(ui, style.color) {
        patch.color = Some(c);
    }
}

fn rotation_slider(ui: &mut egui::Ui, element: &Element, patch: &mut ElementPatch) {
    let mut rotation = element.rotation();
    if ui
        .add(egui::Slider::new(&mut rotation, 0.0..=360.0).text("Rotation"))
        .changed()
    {
        patch.rotation = Some(rotation);
    }
}

/// Property controls for `element`. Returns the edits made this frame.
pub(super) fn property_editor(ui: &mut egui::Ui, element: &Element) -> Option<ElementPatch> {
    let mut patch = ElementPatch::default();
    ui.label(egui::RichText::new(element.kind_label()).strong());
    match &element.kind {
        ElementKind::Icon { .. } => {
            let mut size = element.size.width;
            if ui
                .add(egui::Slider::new(&mut size, 30.0..=150.0).text("Size"))
                .changed()
            {
                patch = ElementPatch::size(size, size);
            }
            rotation_slider(ui, element, &mut patch);
        }
        ElementKind::Image { .. } => {
            let mut w = element.size.width;
            let mut h = element.size.height;
            if ui
                .add(egui::Slider::new(&mut w, 30.0..=200.0).text("Width"))
                .changed()
            {
                patch.width = Some(w);
            }
            if ui
                .add(egui::Slider::new(&mut h, 30.0..=200.0).text("Height"))
                .changed()
            {
                patch.height = Some(h);
            }
            rotation_slider(ui, element, &mut patch);
        }
        ElementKind::Text { style, .. } => {
            text_controls(ui, style, &mut patch);
            rotation_slider(ui, element, &mut patch);
        }
        ElementKind::TimelineLabel { style, .. } => {
            text_controls(ui, style, &mut patch);
        }
        ElementKind::TimelineLine { stroke } => {
            ui.label("Stroke");
            if let Some(c) = color_row(ui, *stroke) {
                patch.color = Some(c);
            }
        }
    }
    (patch != ElementPatch::default()).then_some(patch)
}

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect, view: &View, grid: Option<f32>) {
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
    let Some(spacing) = grid else {
        return;
    };
    let spacing_screen = spacing * view.zoom;
    if spacing_screen < 4.0 {
        return;
    }
    let stroke = egui::Stroke::new(1.0, GRID_COLOR);
    let mut x = rect.min.x;
    while x < rect.max.x {
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
        x += spacing_screen;
    }
    let mut y = rect.min.y;
    while y < rect.max.y {
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
        y += spacing_screen;
    }
}

/// Paints the scene in canvas order: timeline lines, connections, then every
/// other element with its highlight.
pub(super) fn draw_scene(
    painter: &egui::Painter,
    view: &View,
    scene: &Scene,
    interaction: &Interaction,
    textures: &Textures,
) {
    let (lines, others) = geometry::paint_order(scene.elements());
    for element in lines {
        draw_element(painter, view, element, textures);
        draw_highlight(painter, view, element, interaction);
    }
    for connection in scene.connections() {
        draw_connection(painter, view, scene.elements(), connection);
    }
    for element in others {
        draw_element(painter, view, element, textures);
        draw_highlight(painter, view, element, interaction);
    }
}

fn draw_connection(
    painter: &egui::Painter,
    view: &View,
    elements: &[Element],
    connection: &model::Connection,
) {
    let Some(segment) = geometry::connection_segment(elements, connection) else {
        return;
    };
    if segment.length() <= f32::EPSILON {
        return;
    }
    let a = view.to_screen(segment.from);
    let b = view.to_screen(segment.to);
    let stroke = egui::Stroke::new(2.0 * view.zoom, CONNECTOR_COLOR);
    painter.line_segment([a, b], stroke);
    let markers = geometry::marker_selection(connection.style);
    if markers.end {
        draw_arrowhead(painter, a, b, stroke, view.zoom);
    }
    if markers.start {
        draw_arrowhead(painter, b, a, stroke, view.zoom);
    }
}

fn draw_element(painter: &egui::Painter, view: &View, element: &Element, textures: &Textures) {
    let rect = view.rect_to_screen(element.bounds());
    let rotation = element.rotation().to_radians();
    match &element.kind {
        ElementKind::Icon { glyph, .. } => {
            draw_rotated_text(
                painter,
                rect,
                glyph,
                egui::FontId::proportional(rect.width() * 0.6),
                egui::Color32::BLACK,
                TextAlign::Center,
                rotation,
            );
        }
        ElementKind::Image { content, name, .. } => match textures.get(content) {
            Some(texture) => {
                let mut mesh = egui::Mesh::with_texture(texture.id());
                mesh.add_rect_with_uv(
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
                let center = rect.center();
                for vertex in &mut mesh.vertices {
                    vertex.pos = center + geometry::rotate_vec2(vertex.pos - center, rotation);
                }
                painter.add(egui::Shape::mesh(mesh));
            }
            None => {
                let points = geometry::rotated_rect_points(rect, rotation).to_vec();
                painter.add(egui::Shape::convex_polygon(
                    points,
                    egui::Color32::from_gray(235),
                    egui::Stroke::new(1.0, egui::Color32::from_gray(160)),
                ));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    name,
                    egui::FontId::proportional(11.0 * view.zoom),
                    egui::Color32::DARK_GRAY,
                );
            }
        },
        ElementKind::Text { content, style, .. }
        | ElementKind::TimelineLabel { content, style, .. } => {
            if element.is_editing() {
                // The inline editor draws the text.
                return;
            }
            let font = egui::FontId::proportional(style.font_size * view.zoom);
            let color = style.color.to_color32();
            draw_rotated_text(painter, rect, content, font.clone(), color, style.text_align, rotation);
            if style.font_weight == FontWeight::Bold {
                // Default fonts ship no bold face; overstrike half a pixel right.
                let shifted = rect.translate(geometry::rotate_vec2(egui::vec2(0.5 * view.zoom, 0.0), rotation));
                draw_rotated_text(painter, shifted, content, font, color, style.text_align, rotation);
            }
        }
        ElementKind::TimelineLine { stroke } => {
            let x = rect.center().x;
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                egui::Stroke::new(rect.width().max(1.0), stroke.to_color32()),
            );
        }
    }
}

fn draw_highlight(painter: &egui::Painter, view: &View, element: &Element, interaction: &Interaction) {
    let rect = view.rect_to_screen(element.bounds()).expand(5.0 * view.zoom);
    let selected = interaction.tool() == Tool::Select && interaction.selected() == Some(element.id);
    if selected {
        let s = egui::Stroke::new(2.0, SELECTION_COLOR);
        let corners = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
            rect.left_top(),
        ];
        for pair in corners.windows(2) {
            draw_dashed_line(painter, pair[0], pair[1], s, 5.0, 5.0);
        }
    }
    if interaction.connect_source() == Some(element.id) {
        painter.rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(3.0, SOURCE_COLOR),
            egui::StrokeKind::Middle,
        );
    }
}

/// Lays out `text` inside `rect` with the given alignment, then rotates it
/// about the rect center.
fn draw_rotated_text(
    painter: &egui::Painter,
    rect: egui::Rect,
    text: &str,
    font_id: egui::FontId,
    color: egui::Color32,
    align: TextAlign,
    rotation: f32,
) {
    let galley = painter.layout_no_wrap(text.to_string(), font_id, color);
    let size = galley.size();
    let x = match align {
        TextAlign::Left => rect.left(),
        TextAlign::Center => rect.center().x - size.x * 0.5,
        TextAlign::Right => rect.right() - size.x,
    };
    let text_pos = egui::pos2(x, rect.center().y - size.y * 0.5);

    if rotation.abs() <= f32::EPSILON {
        painter.galley(text_pos, galley, color);
        return;
    }
    let center = rect.center();
    let mut shape = egui::Shape::galley(text_pos, galley, color);
    if let egui::Shape::Text(ref mut text_shape) = shape {
        text_shape.pos = center + geometry::rotate_vec2(text_pos - center, rotation);
        text_shape.angle = rotation;
    }
    painter.add(shape);
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let seg_len = if drawing { dash_len } else { gap_len };
        let next_pos = (pos + seg_len).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next_pos], stroke);
        }
        pos = next_pos;
        drawing = !drawing;
    }
}

fn draw_arrowhead(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    zoom: f32,
) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let length = 10.0 * zoom;
    let half_width = 3.5 * zoom;
    let perp = egui::vec2(-dir.y, dir.x);
    let base = b - dir * length;
    painter.add(egui::Shape::convex_polygon(
        vec![b, base + perp * half_width, base - perp * half_width],
        stroke.color,
        egui::Stroke::NONE,
    ));
}
