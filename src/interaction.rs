//! Pointer/tool state machine.
//!
//! [`Interaction`] holds only transient state (tool, selection, pending
//! connection source, drag anchor, zoom). Scene data lives in [`Scene`] and is
//! passed in by the owner of both; every scene change made here goes through
//! the store's public operations.
//!
//! Pointer positions handed to this module are canvas-relative screen
//! coordinates, i.e. already offset by the canvas origin but not divided by
//! the zoom factor.

use eframe::egui;
use log::{debug, trace};

use crate::error::SceneError;
use crate::model::{ConnectionId, ConnectionStyle, ElementId, Point};
use crate::scene::{ElementPayload, Scene};

pub const ZOOM_MIN: f32 = 0.25;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Connect,
    /// One-shot: adds a text box and leaves the active tool unchanged.
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectPhase {
    AwaitingFirstEndpoint,
    AwaitingSecondEndpoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Connecting(ConnectPhase),
    EditingText,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    element_id: ElementId,
    /// Pointer minus the element origin scaled by `zoom`. Both axes are kept
    /// even for timeline lines, which only honor x.
    offset: egui::Vec2,
    /// Zoom at drag start; used for the whole gesture.
    zoom: f32,
}

#[derive(Clone, Debug)]
pub struct Interaction {
    tool: Tool,
    selected: Option<ElementId>,
    connect_source: Option<ElementId>,
    drag: Option<Drag>,
    zoom: f32,
    connection_style: ConnectionStyle,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            selected: None,
            connect_source: None,
            drag: None,
            zoom: 1.0,
            connection_style: ConnectionStyle::default(),
        }
    }
}

impl Interaction {
    pub fn new(connection_style: ConnectionStyle) -> Self {
        Self {
            connection_style,
            ..Self::default()
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    pub fn connect_source(&self) -> Option<ElementId> {
        self.connect_source
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn connection_style(&self) -> ConnectionStyle {
        self.connection_style
    }

    pub fn set_connection_style(&mut self, style: ConnectionStyle) {
        self.connection_style = style;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn phase(&self, scene: &Scene) -> Phase {
        if self.drag.is_some() {
            Phase::Dragging
        } else if scene.editing_id().is_some() {
            Phase::EditingText
        } else if self.tool == Tool::Connect {
            Phase::Connecting(if self.connect_source.is_some() {
                ConnectPhase::AwaitingSecondEndpoint
            } else {
                ConnectPhase::AwaitingFirstEndpoint
            })
        } else {
            Phase::Idle
        }
    }

    /// Switches tools. `Tool::Text` adds a text box and returns its id
    /// without changing the active tool.
    pub fn select_tool(&mut self, scene: &mut Scene, tool: Tool) -> Option<ElementId> {
        match tool {
            Tool::Select => {
                self.connect_source = None;
                self.tool = Tool::Select;
                None
            }
            Tool::Connect => {
                self.connect_source = None;
                self.selected = None;
                self.drag = None;
                self.tool = Tool::Connect;
                None
            }
            Tool::Text => Some(scene.create_element(ElementPayload::text_box(), None)),
        }
    }

    pub fn cancel_connection(&mut self) {
        self.connect_source = None;
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn screen_to_canvas(&self, pointer: egui::Pos2) -> egui::Pos2 {
        (pointer.to_vec2() / self.zoom).to_pos2()
    }

    /// Pointer pressed over `target` (or over empty canvas when `None`).
    /// Returns the outcome when the press completed a connection attempt.
    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        target: Option<ElementId>,
        pointer: egui::Pos2,
    ) -> Option<Result<ConnectionId, SceneError>> {
        let target = target.and_then(|id| scene.element(id));
        match (self.tool, target) {
            (Tool::Select, Some(element)) => {
                let offset =
                    pointer.to_vec2() - element.position.to_pos2().to_vec2() * self.zoom;
                self.selected = Some(element.id);
                self.drag = Some(Drag {
                    element_id: element.id,
                    offset,
                    zoom: self.zoom,
                });
                trace!(element_id = element.id; "Drag started");
            }
            (Tool::Select, None) => {
                self.selected = None;
            }
            (Tool::Connect, Some(element)) => match self.connect_source {
                None if element.is_connectable() => {
                    self.connect_source = Some(element.id);
                    self.selected = None;
                }
                None => {
                    trace!(element_id = element.id; "Ignored non-connectable connect source");
                }
                Some(source) if source == element.id => {
                    self.connect_source = None;
                }
                Some(source) => {
                    if element.is_connectable() {
                        let target_id = element.id;
                        // The gesture ends whether or not the store accepts it.
                        self.connect_source = None;
                        return Some(scene.create_connection(
                            source,
                            target_id,
                            self.connection_style,
                        ));
                    }
                }
            },
            (Tool::Connect, None) => {
                self.connect_source = None;
            }
            (Tool::Text, _) => {}
        }
        None
    }

    /// Pointer moved. Returns `true` when an element was repositioned.
    pub fn pointer_move(&mut self, scene: &mut Scene, pointer: egui::Pos2) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let Some(element) = scene.element(drag.element_id) else {
            self.drag = None;
            return false;
        };
        let p = ((pointer - drag.offset).to_vec2() / drag.zoom).to_pos2();
        let to = if element.is_timeline_line() {
            Point::new(p.x, element.position.y)
        } else {
            Point::from_pos2(p)
        };
        scene.move_element(drag.element_id, to)
    }

    /// Ends any drag; harmless when none is active.
    pub fn pointer_up(&mut self) {
        if let Some(drag) = self.drag.take() {
            trace!(element_id = drag.element_id; "Drag ended");
        }
    }

    /// Double click opens the inline editor on text-bearing elements.
    pub fn double_click(&mut self, scene: &mut Scene, target: Option<ElementId>) -> bool {
        let Some(id) = target else {
            return false;
        };
        let opened = scene.begin_editing(id);
        if opened {
            self.drag = None;
            debug!(element_id = id; "Editing text");
        }
        opened
    }

    /// The inline editor lost focus. Content is already live in the scene.
    pub fn blur(&mut self, scene: &mut Scene, id: ElementId) {
        scene.end_editing(id);
    }

    /// Sets the zoom, clamped and snapped to [`ZOOM_STEP`]. Refused while a
    /// drag is in progress.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if self.drag.is_some() {
            trace!("Zoom change refused while dragging");
            return false;
        }
        let snapped = (zoom / ZOOM_STEP).round() * ZOOM_STEP;
        self.zoom = snapped.clamp(ZOOM_MIN, ZOOM_MAX);
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.zoom - ZOOM_STEP)
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.set_zoom(1.0)
    }

    /// Drops references to elements that no longer exist.
    pub fn forget(&mut self, removed: &[ElementId]) {
        if self.selected.is_some_and(|id| removed.contains(&id)) {
            self.selected = None;
        }
        if self.connect_source.is_some_and(|id| removed.contains(&id)) {
            self.connect_source = None;
        }
        if self.drag.is_some_and(|d| removed.contains(&d.element_id)) {
            self.drag = None;
        }
    }

    /// Clears selection, drag and pending connection; tool and zoom stay.
    pub fn clear_transient(&mut self) {
        self.selected = None;
        self.connect_source = None;
        self.drag = None;
    }

    pub fn status_hint(&self, scene: &Scene) -> String {
        match (self.tool, self.connect_source.and_then(|id| scene.element(id))) {
            (Tool::Connect, Some(source)) => format!(
                "Click another icon to connect from \"{}\"",
                source.display_name()
            ),
            (Tool::Connect, None) => "Click an icon to start connecting".to_string(),
            _ => "Select and drag to move icons".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::error::ConnectionRejection;
    use crate::model::Size;

    fn icon_at(scene: &mut Scene, x: f32, y: f32) -> ElementId {
        scene.create_element(
            ElementPayload::Icon {
                glyph: "🐭".to_string(),
                name: "Mouse".to_string(),
            },
            Some(Point::new(x, y)),
        )
    }

    #[test]
    fn test_drag_divides_by_zoom() {
        let mut scene = Scene::new();
        let id = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        assert!(ui.set_zoom(2.0));

        ui.pointer_down(&mut scene, Some(id), egui::pos2(50.0, 50.0));
        assert_eq!(ui.phase(&scene), Phase::Dragging);
        assert_eq!(ui.selected(), Some(id));
        assert!(ui.pointer_move(&mut scene, egui::pos2(150.0, 150.0)));
        assert_eq!(scene.element(id).unwrap().position, Point::new(50.0, 50.0));

        ui.pointer_up();
        assert_eq!(ui.phase(&scene), Phase::Idle);
        assert!(!ui.pointer_move(&mut scene, egui::pos2(400.0, 400.0)));
    }

    #[test]
    fn test_drag_keeps_grab_point() {
        let mut scene = Scene::new();
        let id = icon_at(&mut scene, 100.0, 100.0);
        let mut ui = Interaction::default();

        ui.pointer_down(&mut scene, Some(id), egui::pos2(120.0, 110.0));
        ui.pointer_move(&mut scene, egui::pos2(220.0, 310.0));
        assert_eq!(scene.element(id).unwrap().position, Point::new(200.0, 300.0));
    }

    #[test]
    fn test_zoom_locked_during_drag() {
        let mut scene = Scene::new();
        let id = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.pointer_down(&mut scene, Some(id), egui::pos2(10.0, 10.0));
        assert!(!ui.zoom_in());
        assert_approx_eq!(f32, ui.zoom(), 1.0);
        ui.pointer_up();
        assert!(ui.zoom_in());
        assert_approx_eq!(f32, ui.zoom(), 1.25);
    }

    #[test]
    fn test_zoom_clamps_and_snaps() {
        let mut ui = Interaction::default();
        for _ in 0..20 {
            ui.zoom_in();
        }
        assert_approx_eq!(f32, ui.zoom(), ZOOM_MAX);
        for _ in 0..20 {
            ui.zoom_out();
        }
        assert_approx_eq!(f32, ui.zoom(), ZOOM_MIN);
        ui.set_zoom(1.6);
        assert_approx_eq!(f32, ui.zoom(), 1.5);
        ui.reset_zoom();
        assert_approx_eq!(f32, ui.zoom(), 1.0);
    }

    #[test]
    fn test_line_drag_ignores_vertical_motion() {
        let mut scene = Scene::new();
        let (line, label) = scene.create_timeline_marker(200.0, "Day 0");
        let mut ui = Interaction::default();

        ui.pointer_down(&mut scene, Some(line), egui::pos2(201.0, 200.0));
        ui.pointer_move(&mut scene, egui::pos2(301.0, 260.0));
        let line_el = scene.element(line).unwrap();
        assert_eq!(line_el.position, Point::new(300.0, 120.0));
        assert_eq!(scene.element(label).unwrap().position, Point::new(270.0, 90.0));
    }

    #[test]
    fn test_label_drag_moves_line_x() {
        let mut scene = Scene::new();
        let (line, label) = scene.create_timeline_marker(200.0, "Day 0");
        let mut ui = Interaction::default();

        ui.pointer_down(&mut scene, Some(label), egui::pos2(180.0, 100.0));
        ui.pointer_move(&mut scene, egui::pos2(310.0, 70.0));
        assert_eq!(scene.element(label).unwrap().position, Point::new(300.0, 60.0));
        assert_eq!(scene.element(line).unwrap().position, Point::new(330.0, 120.0));
    }

    #[test]
    fn test_pointer_up_is_idempotent() {
        let mut ui = Interaction::default();
        ui.pointer_up();
        ui.pointer_up();
        assert!(!ui.is_dragging());
    }

    #[test]
    fn test_empty_canvas_click_clears_selection() {
        let mut scene = Scene::new();
        let id = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.pointer_down(&mut scene, Some(id), egui::pos2(5.0, 5.0));
        ui.pointer_up();
        ui.pointer_down(&mut scene, None, egui::pos2(500.0, 500.0));
        assert_eq!(ui.selected(), None);
    }

    #[test]
    fn test_connect_gesture() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 100.0, 100.0);
        let b = icon_at(&mut scene, 300.0, 100.0);
        let mut ui = Interaction::default();
        ui.pointer_down(&mut scene, Some(a), egui::pos2(110.0, 110.0));
        ui.pointer_up();
        assert_eq!(ui.selected(), Some(a));

        ui.select_tool(&mut scene, Tool::Connect);
        assert_eq!(ui.selected(), None);
        assert_eq!(
            ui.phase(&scene),
            Phase::Connecting(ConnectPhase::AwaitingFirstEndpoint)
        );

        ui.pointer_down(&mut scene, Some(a), egui::pos2(110.0, 110.0));
        assert_eq!(ui.connect_source(), Some(a));
        assert_eq!(
            ui.phase(&scene),
            Phase::Connecting(ConnectPhase::AwaitingSecondEndpoint)
        );
        assert_eq!(ui.status_hint(&scene), "Click another icon to connect from \"Mouse\"");

        let created = ui.pointer_down(&mut scene, Some(b), egui::pos2(310.0, 110.0));
        assert_eq!(created, Some(Ok(scene.connections()[0].id)));
        assert_eq!(ui.connect_source(), None);
        assert_eq!(scene.connections().len(), 1);
        let conn = &scene.connections()[0];
        assert_eq!((conn.source_id, conn.target_id), (a, b));
        assert_eq!(conn.style, ConnectionStyle::Arrow);
        // Connect mode never drags.
        assert!(!ui.is_dragging());
    }

    #[test]
    fn test_connect_uses_selected_style() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let b = icon_at(&mut scene, 200.0, 0.0);
        let mut ui = Interaction::new(ConnectionStyle::Line);
        ui.set_connection_style(ConnectionStyle::DoubleArrow);
        ui.select_tool(&mut scene, Tool::Connect);
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.pointer_down(&mut scene, Some(b), egui::pos2(201.0, 1.0));
        assert_eq!(scene.connections()[0].style, ConnectionStyle::DoubleArrow);
    }

    #[test]
    fn test_rejected_connection_is_returned_and_ends_gesture() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let b = icon_at(&mut scene, 200.0, 0.0);
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);
        assert_eq!(ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0)), None);

        // The source vanishes behind the interaction's back.
        scene.delete_element(a);
        let result = ui.pointer_down(&mut scene, Some(b), egui::pos2(201.0, 1.0));
        assert_eq!(
            result,
            Some(Err(SceneError::InvalidConnection(
                ConnectionRejection::MissingEndpoint(a)
            )))
        );
        assert_eq!(ui.connect_source(), None);
        assert!(scene.connections().is_empty());
    }

    #[test]
    fn test_clicking_source_again_cancels() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        assert_eq!(ui.connect_source(), None);
        assert!(scene.connections().is_empty());
    }

    #[test]
    fn test_canvas_click_cancels_pending_connection() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.pointer_down(&mut scene, None, egui::pos2(900.0, 900.0));
        assert_eq!(ui.connect_source(), None);
        assert_eq!(ui.status_hint(&scene), "Click an icon to start connecting");
    }

    #[test]
    fn test_timeline_elements_are_not_connect_sources_or_targets() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let (line, label) = scene.create_timeline_marker(300.0, "Day 0");
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);

        ui.pointer_down(&mut scene, Some(line), egui::pos2(301.0, 200.0));
        assert_eq!(ui.connect_source(), None);

        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.pointer_down(&mut scene, Some(label), egui::pos2(280.0, 95.0));
        assert_eq!(ui.connect_source(), Some(a));
        assert!(scene.connections().is_empty());
    }

    #[test]
    fn test_switching_to_select_clears_source_keeps_tool_state() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        ui.select_tool(&mut scene, Tool::Select);
        assert_eq!(ui.connect_source(), None);
        assert_eq!(ui.tool(), Tool::Select);
        assert_eq!(ui.status_hint(&scene), "Select and drag to move icons");
    }

    #[test]
    fn test_text_tool_is_one_shot() {
        let mut scene = Scene::new();
        let mut ui = Interaction::default();
        ui.select_tool(&mut scene, Tool::Connect);
        let id = ui.select_tool(&mut scene, Tool::Text).unwrap();
        assert_eq!(ui.tool(), Tool::Connect);
        let element = scene.element(id).unwrap();
        assert!(element.is_text_bearing());
        assert_eq!(element.size, Size::new(150.0, 30.0));
    }

    #[test]
    fn test_double_click_and_blur() {
        let mut scene = Scene::new();
        let a = scene.create_element(ElementPayload::text_box(), None);
        let b = scene.create_element(ElementPayload::text_box(), None);
        let i = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();

        assert!(ui.double_click(&mut scene, Some(a)));
        assert_eq!(ui.phase(&scene), Phase::EditingText);
        assert!(ui.double_click(&mut scene, Some(b)));
        assert_eq!(scene.editing_id(), Some(b));
        assert!(!ui.double_click(&mut scene, Some(i)));
        assert!(!ui.double_click(&mut scene, None));

        // Keystrokes land directly in the store.
        scene.update_element(b, &crate::scene::ElementPatch::content("Day 14"));
        ui.blur(&mut scene, b);
        assert_eq!(scene.editing_id(), None);
        assert_eq!(scene.element(b).unwrap().display_name(), "Day 14");
        assert_eq!(ui.phase(&scene), Phase::Idle);
    }

    #[test]
    fn test_forget_removed_ids() {
        let mut scene = Scene::new();
        let a = icon_at(&mut scene, 0.0, 0.0);
        let mut ui = Interaction::default();
        ui.pointer_down(&mut scene, Some(a), egui::pos2(1.0, 1.0));
        let removed = scene.delete_element(a);
        ui.forget(&removed);
        assert_eq!(ui.selected(), None);
        assert!(!ui.is_dragging());
    }

    proptest! {
        #[test]
        fn prop_drag_lands_at_pointer_delta_over_zoom(
            steps in 0usize..12,
            x in -400.0f32..400.0,
            y in -400.0f32..400.0,
            dx in -400.0f32..400.0,
            dy in -400.0f32..400.0,
        ) {
            let mut scene = Scene::new();
            let id = icon_at(&mut scene, x, y);
            let mut ui = Interaction::default();
            ui.set_zoom(ZOOM_MIN + steps as f32 * ZOOM_STEP);
            let zoom = ui.zoom();

            let grab = egui::pos2(x * zoom + 5.0, y * zoom + 5.0);
            ui.pointer_down(&mut scene, Some(id), grab);
            ui.pointer_move(&mut scene, grab + egui::vec2(dx, dy));
            let pos = scene.element(id).unwrap().position;
            prop_assert!((pos.x - (x + dx / zoom)).abs() < 1e-2);
            prop_assert!((pos.y - (y + dy / zoom)).abs() < 1e-2);
        }
    }
}
