use crate::editor::Editor;
use crate::model::ElementId;
use eframe::egui;
use log::info;
use std::collections::{HashMap, HashSet};

mod actions;
mod render;
mod settings;
mod update;

/// GPU textures for image elements, keyed by their data URI.
type Textures = HashMap<String, egui::TextureHandle>;

/// Text being typed into the inline editor of one element.
struct InlineEdit {
    element_id: ElementId,
    buffer: String,
    focused: bool,
}

pub struct GraphicAbstractApp {
    editor: Editor,
    textures: Textures,
    broken_images: HashSet<String>,
    settings: settings::EditorSettings,
    settings_path: String,
    status: Option<String>,
    marker_text: String,
    inline_edit: Option<InlineEdit>,
}

impl GraphicAbstractApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings_path: Option<String>,
        template: Option<String>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let settings_path = settings_path
            .or_else(settings::config_path)
            .unwrap_or_else(|| "settings.toml".to_string());
        let settings = settings::load_settings(&settings_path).unwrap_or_default();
        info!(path = settings_path.as_str(); "Loaded settings");

        let mut app = Self {
            editor: Editor::new(settings.connection_style),
            textures: Textures::new(),
            broken_images: HashSet::new(),
            settings_path,
            status: None,
            marker_text: "Day 0".to_string(),
            inline_edit: None,
            settings,
        };
        if let Some(key) = template.or_else(|| app.settings.initial_template.clone()) {
            app.load_template(&key);
        }
        app
    }
}
