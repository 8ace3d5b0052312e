//! The scene store: owns elements and connections and keeps the referential
//! and coupling invariants on every mutation path.

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::coupling;
use crate::error::{ConnectionRejection, SceneError};
use crate::model::{
    Connection, ConnectionId, ConnectionStyle, Element, ElementId, ElementKind, FontWeight,
    Point, Rgba, Size, TextAlign, TextStyle, default_timeline_stroke,
};

/// Spacing of the cascade used when an element is created without a
/// position.
const CASCADE_STEP: f32 = 20.0;

pub const DEFAULT_TEXT: &str = "Double click to edit";

/// Top of the timeline band.
const TIMELINE_TOP: f32 = 120.0;
const TIMELINE_HEIGHT: f32 = 320.0;
const TIMELINE_LABEL_Y: f32 = 90.0;

/// Content for a new element. Timeline kinds are created in pairs through
/// [`Scene::create_timeline_marker`].
#[derive(Clone, Debug, PartialEq)]
pub enum ElementPayload {
    Icon { glyph: String, name: String },
    Image { content: String, name: String },
    Text { content: String },
}

impl ElementPayload {
    pub fn text_box() -> Self {
        Self::Text {
            content: DEFAULT_TEXT.to_string(),
        }
    }

    fn default_size(&self) -> Size {
        match self {
            ElementPayload::Icon { .. } => Size::new(60.0, 60.0),
            ElementPayload::Image { .. } => Size::new(80.0, 80.0),
            ElementPayload::Text { .. } => Size::new(150.0, 30.0),
        }
    }

    fn cascade_base(&self) -> f32 {
        match self {
            ElementPayload::Icon { .. } | ElementPayload::Image { .. } => 100.0,
            ElementPayload::Text { .. } => 150.0,
        }
    }

    fn into_kind(self) -> ElementKind {
        match self {
            ElementPayload::Icon { glyph, name } => ElementKind::Icon {
                glyph,
                name,
                rotation: 0.0,
            },
            ElementPayload::Image { content, name } => ElementKind::Image {
                content,
                name,
                rotation: 0.0,
            },
            ElementPayload::Text { content } => ElementKind::Text {
                content,
                style: TextStyle::default(),
                rotation: 0.0,
                editing: false,
            },
        }
    }
}

/// A partial update. Fields that do not apply to the target's kind are
/// ignored. Position is not part of a patch; moves go through
/// [`Scene::move_element`] so timeline pairs stay coupled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementPatch {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub text_align: Option<TextAlign>,
    /// Text color for text-bearing kinds, stroke for timeline lines.
    pub color: Option<Rgba>,
}

impl ElementPatch {
    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    fn apply(&self, element: &mut Element) {
        if let Some(w) = self.width {
            element.size.width = w;
        }
        if let Some(h) = self.height {
            element.size.height = h;
        }
        match &mut element.kind {
            ElementKind::Icon { name, rotation, .. } | ElementKind::Image { name, rotation, .. } => {
                if let Some(n) = &self.name {
                    name.clone_from(n);
                }
                if let Some(r) = self.rotation {
                    *rotation = r;
                }
            }
            ElementKind::Text {
                content,
                style,
                rotation,
                ..
            } => {
                if let Some(r) = self.rotation {
                    *rotation = r;
                }
                self.apply_text(content, style);
            }
            ElementKind::TimelineLabel { content, style, .. } => self.apply_text(content, style),
            ElementKind::TimelineLine { stroke } => {
                if let Some(c) = self.color {
                    *stroke = c;
                }
            }
        }
    }

    fn apply_text(&self, content: &mut String, style: &mut TextStyle) {
        if let Some(c) = &self.content {
            content.clone_from(c);
        }
        if let Some(s) = self.font_size {
            style.font_size = s;
        }
        if let Some(w) = self.font_weight {
            style.font_weight = w;
        }
        if let Some(a) = self.text_align {
            style.text_align = a;
        }
        if let Some(c) = self.color {
            style.color = c;
        }
    }
}

#[derive(Clone, Debug)]
pub struct Scene {
    elements: Vec<Element>,
    connections: Vec<Connection>,
    next_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            connections: Vec::new(),
            next_id: 1,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn create_element(&mut self, payload: ElementPayload, position: Option<Point>) -> ElementId {
        let position = position.unwrap_or_else(|| {
            let offset = payload.cascade_base() + self.elements.len() as f32 * CASCADE_STEP;
            Point::new(offset, offset)
        });
        let id = self.allocate_id();
        let element = Element {
            id,
            position,
            size: payload.default_size(),
            kind: payload.into_kind(),
        };
        debug!(element_id = id, kind = element.kind_label(); "Created element");
        self.elements.push(element);
        id
    }

    /// Adds a timeline line at `x` together with its coupled label.
    /// Returns `(line_id, label_id)`.
    pub fn create_timeline_marker(&mut self, x: f32, text: &str) -> (ElementId, ElementId) {
        let line_id = self.allocate_id();
        let label_id = self.allocate_id();
        self.elements.push(Element {
            id: line_id,
            position: Point::new(x, TIMELINE_TOP),
            size: Size::new(2.0, TIMELINE_HEIGHT),
            kind: ElementKind::TimelineLine {
                stroke: default_timeline_stroke(),
            },
        });
        self.elements.push(Element {
            id: label_id,
            position: Point::new(coupling::label_x_for_line(x), TIMELINE_LABEL_Y),
            size: Size::new(coupling::LABEL_OFFSET * 2.0, 24.0),
            kind: ElementKind::TimelineLabel {
                content: text.to_string(),
                style: TextStyle {
                    font_size: 12.0,
                    font_weight: FontWeight::Bold,
                    text_align: TextAlign::Center,
                    color: Rgba::rgb(0x37, 0x41, 0x51),
                },
                coupled_id: Some(line_id),
                editing: false,
            },
        });
        debug!(line_id, label_id; "Created timeline marker");
        (line_id, label_id)
    }

    /// Merges `patch` into the element. Missing ids are a no-op.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let Some(element) = self.element_mut(id) else {
            trace!(element_id = id; "Update ignored, element not found");
            return false;
        };
        patch.apply(element);
        true
    }

    /// Moves an element's origin, carrying its timeline partner along.
    pub fn move_element(&mut self, id: ElementId, to: Point) -> bool {
        let moves = match coupling::resolve_move(&self.elements, id, to) {
            Ok(moves) => moves,
            Err(err) => {
                trace!(element_id = id; "Move ignored: {err}");
                return false;
            }
        };
        for (target, position) in moves {
            if let Some(element) = self.element_mut(target) {
                element.position = position;
            }
        }
        true
    }

    /// Deletes an element, its coupled partner and every connection touching
    /// either. Returns the removed element ids; empty when `id` is unknown.
    pub fn delete_element(&mut self, id: ElementId) -> Vec<ElementId> {
        let removed = coupling::removal_set(&self.elements, id);
        if removed.is_empty() {
            trace!(element_id = id; "Delete ignored, element not found");
            return removed;
        }
        let before = self.connections.len();
        self.elements.retain(|e| !removed.contains(&e.id));
        self.connections
            .retain(|c| !removed.iter().any(|&r| c.touches(r)));
        debug!(
            element_id = id,
            elements_removed = removed.len(),
            connections_removed = before - self.connections.len();
            "Deleted element"
        );
        removed
    }

    pub fn validate_connection(
        &self,
        source_id: ElementId,
        target_id: ElementId,
    ) -> Result<(), ConnectionRejection> {
        if source_id == target_id {
            return Err(ConnectionRejection::SelfLoop(source_id));
        }
        for id in [source_id, target_id] {
            let element = self
                .element(id)
                .ok_or(ConnectionRejection::MissingEndpoint(id))?;
            if !element.is_connectable() {
                return Err(ConnectionRejection::TimelineEndpoint(id));
            }
        }
        Ok(())
    }

    pub fn create_connection(
        &mut self,
        source_id: ElementId,
        target_id: ElementId,
        style: ConnectionStyle,
    ) -> Result<ConnectionId, SceneError> {
        if let Err(reason) = self.validate_connection(source_id, target_id) {
            warn!(source_id, target_id; "Rejected connection: {reason}");
            return Err(reason.into());
        }
        let id = self.allocate_id();
        self.connections.push(Connection {
            id,
            source_id,
            target_id,
            style,
        });
        debug!(connection_id = id, source_id, target_id; "Created connection");
        Ok(id)
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        before != self.connections.len()
    }

    /// Substitutes the whole scene. Duplicate ids and broken couplings are
    /// rejected before anything changes. Connections that would break the
    /// connection rules are dropped; the id counter resumes above every
    /// loaded id.
    pub fn replace_all(
        &mut self,
        mut elements: Vec<Element>,
        connections: Vec<Connection>,
    ) -> Result<(), SceneError> {
        check_unique_ids(&elements, &connections)?;
        coupling::check(&elements)?;

        for element in &mut elements {
            element.set_editing(false);
        }
        self.elements = elements;
        self.connections = Vec::with_capacity(connections.len());
        for connection in connections {
            match self.validate_connection(connection.source_id, connection.target_id) {
                Ok(()) => self.connections.push(connection),
                Err(reason) => {
                    warn!(connection_id = connection.id; "Dropped connection on load: {reason}")
                }
            }
        }
        let max_id = self
            .elements
            .iter()
            .map(|e| e.id)
            .chain(self.connections.iter().map(|c| c.id))
            .max()
            .unwrap_or(0);
        self.next_id = max_id + 1;
        Ok(())
    }

    pub fn editing_id(&self) -> Option<ElementId> {
        self.elements.iter().find(|e| e.is_editing()).map(|e| e.id)
    }

    /// Opens the text editor on `id` and closes it everywhere else. Only
    /// text-bearing elements can be edited.
    pub fn begin_editing(&mut self, id: ElementId) -> bool {
        if !self.element(id).is_some_and(Element::is_text_bearing) {
            return false;
        }
        for element in &mut self.elements {
            element.set_editing(element.id == id);
        }
        true
    }

    pub fn end_editing(&mut self, id: ElementId) -> bool {
        match self.element_mut(id) {
            Some(element) if element.is_editing() => {
                element.set_editing(false);
                true
            }
            _ => false,
        }
    }

    pub fn check_invariants(&self) -> Result<(), SceneError> {
        check_unique_ids(&self.elements, &self.connections)?;
        coupling::check(&self.elements)?;
        for connection in &self.connections {
            self.validate_connection(connection.source_id, connection.target_id)
                .map_err(|reason| {
                    SceneError::InvariantViolation(format!(
                        "connection {} is invalid: {reason}",
                        connection.id
                    ))
                })?;
        }
        let editors = self.elements.iter().filter(|e| e.is_editing()).count();
        if editors > 1 {
            return Err(SceneError::InvariantViolation(format!(
                "{editors} elements are in edit mode"
            )));
        }
        Ok(())
    }
}

/// Elements and connections draw from one id counter, so an id may appear
/// only once across both lists.
fn check_unique_ids(elements: &[Element], connections: &[Connection]) -> Result<(), SceneError> {
    let mut seen = HashSet::with_capacity(elements.len() + connections.len());
    for id in elements
        .iter()
        .map(|e| e.id)
        .chain(connections.iter().map(|c| c.id))
    {
        if !seen.insert(id) {
            return Err(SceneError::InvariantViolation(format!("id {id} is used twice")));
        }
    }
    Ok(())
}
