//! Single owner of the scene and the interaction state.
//!
//! The shell talks to [`Editor`] only; every gesture is forwarded to
//! [`Interaction`] together with the scene it acts on, and every operation
//! that removes elements also scrubs the transient state that referenced
//! them.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use eframe::egui;
use log::{debug, info};

use crate::catalog::{PaletteIcon, UploadLibrary, UploadedImage};
use crate::error::SceneError;
use crate::interaction::{Interaction, Tool};
use crate::model::{ConnectionId, ConnectionStyle, ElementId, Point};
use crate::scene::{ElementPatch, ElementPayload, Scene};
use crate::svg;
use crate::template::{self, TemplateError};

/// Where a freshly uploaded image is dropped.
const UPLOAD_POSITION: Point = Point::new(100.0, 100.0);

const FIRST_MARKER_X: f32 = 580.0;
const MARKER_SPACING: f32 = 120.0;

pub fn image_mime(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 `data:` URI into its mime type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(&str, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}

#[derive(Clone, Debug, Default)]
pub struct Editor {
    scene: Scene,
    interaction: Interaction,
    uploads: UploadLibrary,
}

impl Editor {
    pub fn new(connection_style: ConnectionStyle) -> Self {
        Self {
            scene: Scene::new(),
            interaction: Interaction::new(connection_style),
            uploads: UploadLibrary::default(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn uploads(&self) -> &UploadLibrary {
        &self.uploads
    }

    pub fn status_hint(&self) -> String {
        self.interaction.status_hint(&self.scene)
    }

    pub fn add_icon(&mut self, icon: &PaletteIcon) -> ElementId {
        self.scene.create_element(
            ElementPayload::Icon {
                glyph: icon.glyph.to_string(),
                name: icon.name.to_string(),
            },
            None,
        )
    }

    pub fn add_text_box(&mut self) -> Option<ElementId> {
        self.interaction.select_tool(&mut self.scene, Tool::Text)
    }

    /// Stores an uploaded file in the library and drops it on the canvas.
    /// `None` when the file name does not look like an image.
    pub fn upload_image(&mut self, name: &str, bytes: &[u8]) -> Option<ElementId> {
        let mime = image_mime(name)?;
        let content = data_uri(mime, bytes);
        let fresh = self.uploads.remember(UploadedImage {
            name: name.to_string(),
            data_uri: content.clone(),
        });
        debug!(name, bytes = bytes.len(), fresh; "Uploaded image");
        Some(self.scene.create_element(
            ElementPayload::Image {
                content,
                name: name.to_string(),
            },
            Some(UPLOAD_POSITION),
        ))
    }

    /// Places a library image again, cascading like any new element.
    pub fn add_uploaded_image(&mut self, name: &str) -> Option<ElementId> {
        let image = self.uploads.get(name)?.clone();
        Some(self.scene.create_element(
            ElementPayload::Image {
                content: image.data_uri,
                name: image.name,
            },
            None,
        ))
    }

    /// Adds a timeline marker to the right of the existing ones.
    pub fn add_timeline_marker(&mut self, text: &str) -> (ElementId, ElementId) {
        let x = self
            .scene
            .elements()
            .iter()
            .filter(|e| e.is_timeline_line())
            .map(|e| e.position.x)
            .reduce(f32::max)
            .map_or(FIRST_MARKER_X, |x| x + MARKER_SPACING);
        self.scene.create_timeline_marker(x, text)
    }

    pub fn load_template(&mut self, key: &str) -> Result<(), TemplateError> {
        template::load(&mut self.scene, key)?;
        self.interaction.clear_transient();
        Ok(())
    }

    pub fn delete_element(&mut self, id: ElementId) -> Vec<ElementId> {
        let removed = self.scene.delete_element(id);
        self.interaction.forget(&removed);
        removed
    }

    pub fn delete_selected(&mut self) -> Vec<ElementId> {
        let Some(id) = self.interaction.selected() else {
            return Vec::new();
        };
        let removed = self.delete_element(id);
        self.interaction.clear_selection();
        removed
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        self.scene.delete_connection(id)
    }

    pub fn update_selected(&mut self, patch: &ElementPatch) -> bool {
        match self.interaction.selected() {
            Some(id) => self.scene.update_element(id, patch),
            None => false,
        }
    }

    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        self.scene.update_element(id, patch)
    }

    pub fn select_tool(&mut self, tool: Tool) -> Option<ElementId> {
        self.interaction.select_tool(&mut self.scene, tool)
    }

    pub fn set_connection_style(&mut self, style: ConnectionStyle) {
        self.interaction.set_connection_style(style);
    }

    pub fn cancel_connection(&mut self) {
        self.interaction.cancel_connection();
    }

    pub fn pointer_down(
        &mut self,
        target: Option<ElementId>,
        pointer: egui::Pos2,
    ) -> Option<Result<ConnectionId, SceneError>> {
        self.interaction.pointer_down(&mut self.scene, target, pointer)
    }

    pub fn pointer_move(&mut self, pointer: egui::Pos2) -> bool {
        self.interaction.pointer_move(&mut self.scene, pointer)
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    pub fn double_click(&mut self, target: Option<ElementId>) -> bool {
        self.interaction.double_click(&mut self.scene, target)
    }

    pub fn blur(&mut self, id: ElementId) {
        self.interaction.blur(&mut self.scene, id);
    }

    pub fn zoom_in(&mut self) -> bool {
        self.interaction.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.interaction.zoom_out()
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.interaction.reset_zoom()
    }

    /// `grid` is the background grid spacing, `None` to leave it out.
    pub fn export_svg(&self, grid: Option<f32>) -> String {
        let svg = svg::document_to_svg(&self.scene, &self.interaction, grid);
        info!(
            elements = self.scene.elements().len(),
            connections = self.scene.connections().len(),
            bytes = svg.len();
            "Exported SVG"
        );
        svg
    }
}
