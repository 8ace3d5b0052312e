//! Timeline line ↔ label pairing.
//!
//! A `TimelineLabel` carries the id of its `TimelineLine`; the line has no
//! back-reference and finds its label by scanning. Every move or delete of a
//! timeline kind goes through this module so both halves stay in step.

use log::{error, trace};

use crate::error::SceneError;
use crate::model::{Element, ElementId, Point};

/// Horizontal distance from a label's left edge to its line.
pub const LABEL_OFFSET: f32 = 30.0;

pub fn label_x_for_line(line_x: f32) -> f32 {
    line_x - LABEL_OFFSET
}

pub fn line_x_for_label(label_x: f32) -> f32 {
    label_x + LABEL_OFFSET
}

fn find(elements: &[Element], id: ElementId) -> Option<&Element> {
    elements.iter().find(|e| e.id == id)
}

/// The other half of a timeline pair, if `id` is coupled.
pub fn partner(elements: &[Element], id: ElementId) -> Option<ElementId> {
    let element = find(elements, id)?;
    if element.is_timeline_line() {
        elements
            .iter()
            .find(|e| e.coupled_id() == Some(id))
            .map(|e| e.id)
    } else {
        element
            .coupled_id()
            .and_then(|line_id| find(elements, line_id))
            .map(|line| line.id)
    }
}

/// Positions to write when `id` is moved to `to`.
///
/// A line only ever moves along x; its label follows at
/// [`label_x_for_line`] and keeps its own y. A label moves freely and drags
/// its line's x along with it.
pub fn resolve_move(
    elements: &[Element],
    id: ElementId,
    to: Point,
) -> Result<Vec<(ElementId, Point)>, SceneError> {
    let element = find(elements, id).ok_or(SceneError::NotFound(id))?;
    let mut moves = Vec::with_capacity(2);

    if element.is_timeline_line() {
        moves.push((id, Point::new(to.x, element.position.y)));
        if let Some(label) = partner(elements, id).and_then(|pid| find(elements, pid)) {
            moves.push((
                label.id,
                Point::new(label_x_for_line(to.x), label.position.y),
            ));
        }
    } else {
        moves.push((id, to));
        if let Some(line) = partner(elements, id).and_then(|pid| find(elements, pid)) {
            moves.push((line.id, Point::new(line_x_for_label(to.x), line.position.y)));
        }
    }

    trace!(element_id = id, moves = moves.len(); "Resolved move");
    Ok(moves)
}

/// Ids removed together with `id`: the element itself plus its coupled
/// partner. Empty when `id` does not exist.
pub fn removal_set(elements: &[Element], id: ElementId) -> Vec<ElementId> {
    if find(elements, id).is_none() {
        return Vec::new();
    }
    let mut ids = vec![id];
    ids.extend(partner(elements, id));
    ids
}

/// Verifies that every label points at an existing line and that no line is
/// claimed by two labels.
pub fn check(elements: &[Element]) -> Result<(), SceneError> {
    let mut claimed: Vec<ElementId> = Vec::new();
    for label in elements.iter() {
        let Some(line_id) = label.coupled_id() else {
            continue;
        };
        let violation = match find(elements, line_id) {
            None => Some(format!(
                "label {} is coupled to missing element {line_id}",
                label.id
            )),
            Some(line) if !line.is_timeline_line() => Some(format!(
                "label {} is coupled to {} which is not a timeline line",
                label.id, line_id
            )),
            Some(_) if claimed.contains(&line_id) => Some(format!(
                "timeline line {line_id} is coupled to more than one label"
            )),
            Some(_) => None,
        };
        if let Some(msg) = violation {
            error!(label_id = label.id; "{msg}");
            return Err(SceneError::InvariantViolation(msg));
        }
        claimed.push(line_id);
    }
    Ok(())
}
