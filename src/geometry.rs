//! Connector routing and hit testing.
//!
//! Connectors are routed between element centers and clipped to a circle of
//! radius `width / 2 + CONNECTOR_PADDING` around each end, whatever the
//! element's actual shape. Every connector therefore keeps the same visual
//! clearance from the shapes it joins.

use crate::model::{self, ConnectionStyle, ElementId};
use eframe::egui;

/// Gap between an element's anchor circle and the connector end.
pub const CONNECTOR_PADDING: f32 = 8.0;

/// Pointer slack around hit targets, in screen pixels.
const HIT_SLOP_SCREEN: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: egui::Pos2,
    pub to: egui::Pos2,
}

impl Segment {
    pub fn length(&self) -> f32 {
        (self.to - self.from).length()
    }

    /// SVG path data for the segment.
    pub fn path_data(&self) -> String {
        format!(
            "M {:.3} {:.3} L {:.3} {:.3}",
            self.from.x, self.from.y, self.to.x, self.to.y
        )
    }
}

/// Which ends of a connector carry an arrowhead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Markers {
    pub start: bool,
    pub end: bool,
}

pub fn anchor_point(bounds: egui::Rect, angle: f32, padding: f32) -> egui::Pos2 {
    let radius = bounds.width() * 0.5 + padding;
    bounds.center() + egui::vec2(angle.cos(), angle.sin()) * radius
}

pub fn connector_path(source: egui::Rect, target: egui::Rect) -> Segment {
    let d = target.center() - source.center();
    // atan2(0, 0) is 0, so coincident centers still give a finite segment.
    let angle = d.y.atan2(d.x);
    Segment {
        from: anchor_point(source, angle, CONNECTOR_PADDING),
        to: anchor_point(target, angle + std::f32::consts::PI, CONNECTOR_PADDING),
    }
}

pub fn marker_selection(style: ConnectionStyle) -> Markers {
    match style {
        ConnectionStyle::Line => Markers::default(),
        ConnectionStyle::Arrow => Markers {
            start: false,
            end: true,
        },
        ConnectionStyle::DoubleArrow => Markers {
            start: true,
            end: true,
        },
    }
}

/// Resolves a connection against the current elements. `None` when either
/// endpoint is gone.
pub fn connection_segment(
    elements: &[model::Element],
    connection: &model::Connection,
) -> Option<Segment> {
    let source = elements.iter().find(|e| e.id == connection.source_id)?;
    let target = elements.iter().find(|e| e.id == connection.target_id)?;
    Some(connector_path(source.bounds(), target.bounds()))
}

pub fn rotate_vec2(v: egui::Vec2, angle: f32) -> egui::Vec2 {
    let sin = angle.sin();
    let cos = angle.cos();
    egui::vec2(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

pub fn rotated_rect_points(rect: egui::Rect, rotation: f32) -> [egui::Pos2; 4] {
    let center = rect.center();
    [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
    .map(|p| center + rotate_vec2(p - center, rotation))
}

fn hit_test_rotated_rect(
    rect: egui::Rect,
    rotation: f32,
    world_pos: egui::Pos2,
    threshold_world: f32,
) -> bool {
    let center = rect.center();
    let half = rect.size() * 0.5;
    let local = rotate_vec2(world_pos - center, -rotation);
    local.x.abs() <= half.x + threshold_world && local.y.abs() <= half.y + threshold_world
}

/// Hit slack in canvas units at `zoom`, so thin timeline lines stay easy to
/// grab at any zoom.
pub fn hit_threshold(zoom: f32) -> f32 {
    HIT_SLOP_SCREEN / zoom
}

pub fn hit_test_element(
    element: &model::Element,
    world_pos: egui::Pos2,
    threshold_world: f32,
) -> bool {
    hit_test_rotated_rect(
        element.bounds(),
        element.rotation().to_radians(),
        world_pos,
        threshold_world,
    )
}

/// Elements in paint order: timeline lines first, then everything else in
/// scene order. Connections are painted between the two groups.
pub fn paint_order(
    elements: &[model::Element],
) -> (Vec<&model::Element>, Vec<&model::Element>) {
    elements.iter().partition(|e| e.is_timeline_line())
}

/// Topmost element under `world_pos`, honoring [`paint_order`].
pub fn topmost_hit(
    elements: &[model::Element],
    world_pos: egui::Pos2,
    threshold_world: f32,
) -> Option<ElementId> {
    let (lines, others) = paint_order(elements);
    others
        .into_iter()
        .rev()
        .chain(lines.into_iter().rev())
        .find(|e| hit_test_element(e, world_pos, threshold_world))
        .map(|e| e.id)
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::model::{Element, ElementKind, Point, Size};

    fn icon(id: ElementId, x: f32, y: f32, size: f32) -> Element {
        Element {
            id,
            position: Point::new(x, y),
            size: Size::new(size, size),
            kind: ElementKind::Icon {
                glyph: "🧬".to_string(),
                name: "DNA".to_string(),
                rotation: 0.0,
            },
        }
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(w, h))
    }

    #[test]
    fn test_anchor_point_uses_half_width_plus_padding() {
        let p = anchor_point(rect(0.0, 0.0, 60.0, 60.0), 0.0, CONNECTOR_PADDING);
        assert_approx_eq!(f32, p.x, 68.0, epsilon = 1e-4);
        assert_approx_eq!(f32, p.y, 30.0, epsilon = 1e-4);

        // Height never enters the radius.
        let p = anchor_point(
            rect(0.0, 0.0, 60.0, 200.0),
            std::f32::consts::FRAC_PI_2,
            CONNECTOR_PADDING,
        );
        assert_approx_eq!(f32, p.x, 30.0, epsilon = 1e-4);
        assert_approx_eq!(f32, p.y, 100.0 + 38.0, epsilon = 1e-4);
    }

    #[test]
    fn test_connector_path_insets_both_ends() {
        let seg = connector_path(rect(100.0, 100.0, 60.0, 60.0), rect(300.0, 100.0, 60.0, 60.0));
        assert_approx_eq!(f32, seg.from.x, 130.0 + 38.0, epsilon = 1e-3);
        assert_approx_eq!(f32, seg.to.x, 330.0 - 38.0, epsilon = 1e-3);
        assert_approx_eq!(f32, seg.from.y, 130.0, epsilon = 1e-3);
        assert_approx_eq!(f32, seg.to.y, 130.0, epsilon = 1e-3);
        assert_approx_eq!(f32, seg.length(), 124.0, epsilon = 1e-3);
    }

    #[test]
    fn test_connector_path_diagonal() {
        let seg = connector_path(rect(0.0, 0.0, 20.0, 20.0), rect(100.0, 100.0, 40.0, 40.0));
        let centers = (egui::pos2(120.0, 120.0) - egui::pos2(10.0, 10.0)).length();
        assert_approx_eq!(f32, seg.length(), centers - 18.0 - 28.0, epsilon = 1e-3);
    }

    #[test]
    fn test_connector_path_coincident_centers_is_finite() {
        let r = rect(50.0, 50.0, 60.0, 60.0);
        let seg = connector_path(r, r);
        assert!(seg.from.x.is_finite() && seg.from.y.is_finite());
        assert!(seg.to.x.is_finite() && seg.to.y.is_finite());
        // Both ends sit on the same circle, on opposite sides.
        assert_approx_eq!(f32, (seg.from - r.center()).length(), 38.0, epsilon = 1e-3);
        assert_approx_eq!(f32, (seg.to - r.center()).length(), 38.0, epsilon = 1e-3);
    }

    #[test]
    fn test_marker_selection() {
        assert_eq!(marker_selection(ConnectionStyle::Line), Markers::default());
        assert_eq!(
            marker_selection(ConnectionStyle::Arrow),
            Markers {
                start: false,
                end: true
            }
        );
        assert_eq!(
            marker_selection(ConnectionStyle::DoubleArrow),
            Markers {
                start: true,
                end: true
            }
        );
    }

    #[test]
    fn test_path_data_format() {
        let seg = Segment {
            from: egui::pos2(1.0, 2.0),
            to: egui::pos2(3.5, 4.25),
        };
        assert_eq!(seg.path_data(), "M 1.000 2.000 L 3.500 4.250");
    }

    #[test]
    fn test_hit_test_respects_rotation() {
        let mut e = icon(1, 0.0, 0.0, 100.0);
        e.size = Size::new(100.0, 20.0);
        // A point above the horizontal bar misses...
        assert!(!hit_test_element(&e, egui::pos2(50.0, -30.0), 0.0));
        // ...but hits once the bar is turned upright.
        if let ElementKind::Icon { rotation, .. } = &mut e.kind {
            *rotation = 90.0;
        }
        assert!(hit_test_element(&e, egui::pos2(50.0, -30.0), 0.0));
    }

    #[test]
    fn test_topmost_hit_prefers_later_elements_over_lines() {
        let a = icon(1, 0.0, 0.0, 60.0);
        let b = icon(2, 20.0, 20.0, 60.0);
        let line = Element {
            id: 3,
            position: Point::new(30.0, 0.0),
            size: Size::new(2.0, 300.0),
            kind: ElementKind::TimelineLine {
                stroke: crate::model::default_timeline_stroke(),
            },
        };
        let elements = vec![a, line, b];
        assert_eq!(topmost_hit(&elements, egui::pos2(40.0, 40.0), 0.0), Some(2));
        assert_eq!(topmost_hit(&elements, egui::pos2(5.0, 5.0), 0.0), Some(1));
        assert_eq!(topmost_hit(&elements, egui::pos2(31.0, 200.0), 0.0), Some(3));
        assert_eq!(topmost_hit(&elements, egui::pos2(500.0, 500.0), 0.0), None);
    }

    #[test]
    fn test_thin_line_hit_slack_scales_with_zoom() {
        let line = Element {
            id: 7,
            position: Point::new(30.0, 0.0),
            size: Size::new(2.0, 300.0),
            kind: ElementKind::TimelineLine {
                stroke: crate::model::default_timeline_stroke(),
            },
        };
        let elements = vec![line];
        let near = egui::pos2(36.0, 100.0);
        assert_eq!(topmost_hit(&elements, near, 0.0), None);
        assert_eq!(topmost_hit(&elements, near, hit_threshold(1.0)), Some(7));
        // Six screen pixels are only two canvas units at zoom 3.
        assert_approx_eq!(f32, hit_threshold(3.0), 2.0);
        assert_eq!(topmost_hit(&elements, near, hit_threshold(3.0)), None);
    }
}
