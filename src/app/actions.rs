use crate::editor::{self, Editor};
use crate::model::ElementKind;
use eframe::egui;
use log::{debug, error, warn};
use std::collections::HashSet;

use super::{GraphicAbstractApp, settings};

/// Decodes an image `data:` URI into pixels egui can upload.
pub(super) fn decode_image(uri: &str) -> Result<egui::ColorImage, String> {
    let (mime, bytes) =
        editor::decode_data_uri(uri).ok_or_else(|| "not a base64 data URI".to_string())?;
    let image = image::load_from_memory(&bytes).map_err(|e| format!("{mime}: {e}"))?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Data URIs still referenced by an image element or the upload library.
fn live_image_uris(editor: &Editor) -> HashSet<&str> {
    let placed = editor
        .scene()
        .elements()
        .iter()
        .filter_map(|e| match &e.kind {
            ElementKind::Image { content, .. } => Some(content.as_str()),
            _ => None,
        });
    let library = editor.uploads().images().iter().map(|i| i.data_uri.as_str());
    placed.chain(library).collect()
}

impl GraphicAbstractApp {
    /// Uploads textures for image elements that do not have one yet and
    /// drops the ones nothing refers to anymore.
    pub(super) fn ensure_textures(&mut self, ctx: &egui::Context) {
        let live = live_image_uris(&self.editor);
        let before = self.textures.len();
        self.textures.retain(|uri, _| live.contains(uri.as_str()));
        self.broken_images.retain(|uri| live.contains(uri.as_str()));
        if self.textures.len() != before {
            debug!(dropped = before - self.textures.len(); "Pruned image textures");
        }

        for element in self.editor.scene().elements() {
            let ElementKind::Image { content, name, .. } = &element.kind else {
                continue;
            };
            if self.textures.contains_key(content) || self.broken_images.contains(content) {
                continue;
            }
            match decode_image(content) {
                Ok(pixels) => {
                    let texture = ctx.load_texture(name, pixels, egui::TextureOptions::LINEAR);
                    self.textures.insert(content.clone(), texture);
                }
                Err(e) => {
                    warn!(name = name.as_str(); "Cannot display image: {e}");
                    self.broken_images.insert(content.clone());
                }
            }
        }
    }

    pub(super) fn upload_image_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "svg"])
            .pick_file()
        else {
            return;
        };
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        match std::fs::read(&path) {
            Ok(bytes) => match self.editor.upload_image(&name, &bytes) {
                Some(_) => self.status = Some(format!("Added {name}")),
                None => self.status = Some(format!("{name} is not an image")),
            },
            Err(e) => {
                error!(name = name.as_str(); "Upload failed: {e}");
                self.status = Some(format!("Upload failed: {e}"));
            }
        }
    }

    pub(super) fn export_svg_dialog(&mut self) {
        let default_name = std::path::Path::new(&self.settings.svg_path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("graphical-abstract.svg")
            .to_string();
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("SVG", &["svg"])
            .save_file()
        {
            let path_str = path.display().to_string();
            let grid = self.settings.show_grid.then_some(self.settings.grid_size);
            let svg = self.editor.export_svg(grid);
            match std::fs::write(&path, svg) {
                Ok(()) => {
                    self.settings.svg_path = path_str.clone();
                    self.status = Some(format!("Saved {}", path_str));
                }
                Err(e) => {
                    error!(path = path_str.as_str(); "SVG export failed: {e}");
                    self.status = Some(format!("SVG save failed: {e}"));
                }
            }
        }
    }

    pub(super) fn load_template(&mut self, key: &str) {
        self.inline_edit = None;
        match self.editor.load_template(key) {
            Ok(()) => self.status = Some(format!("Loaded template {key}")),
            Err(e) => {
                error!(template = key; "Template load failed: {e}");
                self.status = Some(format!("Template failed: {e}"));
            }
        }
    }

    pub(super) fn delete_selected(&mut self) {
        let removed = self.editor.delete_selected();
        if self
            .inline_edit
            .as_ref()
            .is_some_and(|edit| removed.contains(&edit.element_id))
        {
            self.inline_edit = None;
        }
    }

    pub(super) fn save_settings(&mut self) {
        self.settings.connection_style = self.editor.interaction().connection_style();
        match settings::save_settings(&self.settings_path, &self.settings) {
            Ok(()) => self.status = Some(format!("Saved settings to {}", self.settings_path)),
            Err(e) => self.status = Some(format!("Settings save failed: {e}")),
        }
    }
}
