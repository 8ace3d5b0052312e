use crate::catalog::{ARROW_SHAPES, ORGANIZATION_ICONS, PaletteIcon};
use crate::geometry;
use crate::interaction::{ConnectPhase, Phase, Tool};
use crate::model::ConnectionStyle;
use crate::scene::ElementPatch;
use crate::template;
use eframe::egui;

use super::render::{View, draw_background, draw_scene, property_editor, tool_button};
use super::{GraphicAbstractApp, InlineEdit};

fn palette_grid(ui: &mut egui::Ui, id: &str, icons: &[PaletteIcon]) -> Option<PaletteIcon> {
    let mut picked = None;
    egui::Grid::new(id).spacing([4.0, 4.0]).show(ui, |ui| {
        for (i, icon) in icons.iter().enumerate() {
            let button = egui::Button::new(egui::RichText::new(icon.glyph).size(22.0));
            if ui
                .add_sized([40.0, 40.0], button)
                .on_hover_text(icon.name)
                .clicked()
            {
                picked = Some(*icon);
            }
            if i % 4 == 3 {
                ui.end_row();
            }
        }
    });
    picked
}

impl eframe::App for GraphicAbstractApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_textures(ctx);

        let skip_shortcuts = ctx.wants_keyboard_input() || self.inline_edit.is_some();
        if !skip_shortcuts {
            let (delete, escape, zoom_in, zoom_out, zoom_reset) = ctx.input_mut(|i| {
                (
                    i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                        || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace),
                    i.consume_key(egui::Modifiers::NONE, egui::Key::Escape),
                    i.consume_key(egui::Modifiers::COMMAND, egui::Key::Plus)
                        || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Equals),
                    i.consume_key(egui::Modifiers::COMMAND, egui::Key::Minus),
                    i.consume_key(egui::Modifiers::COMMAND, egui::Key::Num0),
                )
            });
            if delete {
                self.delete_selected();
            }
            if escape {
                self.editor.cancel_connection();
                self.editor.select_tool(Tool::Select);
            }
            if zoom_in {
                self.editor.zoom_in();
            }
            if zoom_out {
                self.editor.zoom_out();
            }
            if zoom_reset {
                self.editor.reset_zoom();
            }
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Graphical Abstract");
                ui.separator();
                ui.label(self.editor.status_hint());
                if self.editor.interaction().connect_source().is_some()
                    && ui.button("Cancel connection").clicked()
                {
                    self.editor.cancel_connection();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Export SVG").clicked() {
                        self.export_svg_dialog();
                    }
                    ui.separator();
                    if ui.button("Reset").clicked() {
                        self.editor.reset_zoom();
                    }
                    if ui.button("+").clicked() {
                        self.editor.zoom_in();
                    }
                    ui.label(format!("{:.0}%", self.editor.interaction().zoom() * 100.0));
                    if ui.button("−").clicked() {
                        self.editor.zoom_out();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.status {
                    Some(status) => ui.label(status),
                    None => ui.label("Ready"),
                };
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(match self.editor.interaction().phase(self.editor.scene()) {
                        Phase::Idle => "Idle",
                        Phase::Dragging => "Dragging",
                        Phase::Connecting(ConnectPhase::AwaitingFirstEndpoint) => "Pick source",
                        Phase::Connecting(ConnectPhase::AwaitingSecondEndpoint) => "Pick target",
                        Phase::EditingText => "Editing text",
                    });
                    ui.separator();
                    ui.label(format!(
                        "Connections: {}",
                        self.editor.scene().connections().len()
                    ));
                    ui.separator();
                    ui.label(format!("Elements: {}", self.editor.scene().elements().len()));
                });
            });
        });

        egui::SidePanel::left("tools_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.side_panel(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::new())
            .show(ctx, |ui| self.canvas(ctx, ui));
    }
}

impl GraphicAbstractApp {
    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tools");
        let active = self.editor.interaction().tool();
        ui.horizontal(|ui| {
            if tool_button(ui, "Select", Tool::Select, active) {
                self.editor.select_tool(Tool::Select);
            }
            if tool_button(ui, "Connect", Tool::Connect, active) {
                self.editor.select_tool(Tool::Connect);
            }
            if ui.button("Add Text").clicked() {
                self.editor.add_text_box();
            }
        });

        ui.add_space(4.0);
        ui.label("Connection style");
        let mut style = self.editor.interaction().connection_style();
        egui::ComboBox::from_id_salt("connection_style")
            .selected_text(style.label())
            .show_ui(ui, |ui| {
                for s in ConnectionStyle::ALL {
                    ui.selectable_value(&mut style, s, s.label());
                }
            });
        if style != self.editor.interaction().connection_style() {
            self.editor.set_connection_style(style);
        }

        ui.separator();
        if ui.button("Upload image...").clicked() {
            self.upload_image_dialog();
        }

        ui.separator();
        ui.label("Organization");
        if let Some(icon) = palette_grid(ui, "org_icons", ORGANIZATION_ICONS) {
            self.editor.add_icon(&icon);
        }
        ui.label("Arrows");
        if let Some(icon) = palette_grid(ui, "arrow_shapes", ARROW_SHAPES) {
            self.editor.add_icon(&icon);
        }

        if !self.editor.uploads().images().is_empty() {
            ui.separator();
            ui.label("Uploaded images");
            let names: Vec<String> = self
                .editor
                .uploads()
                .images()
                .iter()
                .map(|i| i.name.clone())
                .collect();
            for name in names {
                if ui.button(&name).clicked() {
                    self.editor.add_uploaded_image(&name);
                }
            }
        }

        ui.separator();
        ui.label("Timeline");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.marker_text).desired_width(90.0));
            if ui.button("Add marker").clicked() {
                let text = self.marker_text.clone();
                self.editor.add_timeline_marker(&text);
            }
        });

        ui.separator();
        ui.label("Templates");
        for t in template::BUILTIN {
            if ui.button(t.title).clicked() {
                self.load_template(t.key);
            }
        }

        ui.separator();
        ui.collapsing("Settings", |ui| {
            ui.checkbox(&mut self.settings.show_grid, "Show grid");
            ui.add(egui::Slider::new(&mut self.settings.grid_size, 5.0..=100.0).text("Grid"));
            ui.label("Settings file:");
            ui.text_edit_singleline(&mut self.settings_path);
            if ui.button("Save settings").clicked() {
                self.save_settings();
            }
        });

        ui.separator();
        ui.heading("Properties");
        let selected = self
            .editor
            .interaction()
            .selected()
            .and_then(|id| self.editor.scene().element(id));
        match selected {
            Some(element) => {
                let id = element.id;
                let patch = property_editor(ui, element);
                if let Some(patch) = patch {
                    self.editor.update_selected(&patch);
                }
                if ui.button("Delete").clicked() {
                    self.delete_selected();
                }
                let touching: Vec<(u64, String)> = self
                    .editor
                    .scene()
                    .connections()
                    .iter()
                    .filter(|c| c.touches(id))
                    .map(|c| {
                        let other = if c.source_id == id { c.target_id } else { c.source_id };
                        let name = self
                            .editor
                            .scene()
                            .element(other)
                            .map_or("?", |e| e.display_name());
                        let arrow = if c.source_id == id { "→" } else { "←" };
                        (c.id, format!("{arrow} {name}"))
                    })
                    .collect();
                if !touching.is_empty() {
                    ui.label("Connections");
                }
                for (connection_id, label) in touching {
                    ui.horizontal(|ui| {
                        ui.label(label);
                        if ui.small_button("✕").clicked() {
                            self.editor.delete_connection(connection_id);
                        }
                    });
                }
            }
            None => {
                ui.label("Nothing selected");
            }
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let view = View {
            origin: rect.min,
            zoom: self.editor.interaction().zoom(),
        };

        // Canvas-relative screen position; the interaction divides by zoom.
        let pointer = ctx
            .input(|i| i.pointer.interact_pos())
            .map(|p| (p - rect.min).to_pos2());
        let hit = pointer.and_then(|p| {
            let world = self.editor.interaction().screen_to_canvas(p);
            let threshold_world = geometry::hit_threshold(self.editor.interaction().zoom());
            geometry::topmost_hit(self.editor.scene().elements(), world, threshold_world)
        });

        let pressed = response.hovered() && ctx.input(|i| i.pointer.primary_pressed());
        let released = ctx.input(|i| i.pointer.primary_released());

        if let Some(p) = pointer {
            if pressed {
                match self.editor.pointer_down(hit, p) {
                    Some(Ok(_)) => self.status = Some("Connected".to_string()),
                    Some(Err(e)) => self.status = Some(format!("Cannot connect: {e}")),
                    None => {}
                }
            }
            if self.editor.interaction().is_dragging() {
                self.editor.pointer_move(p);
                ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
            } else if hit.is_some() && self.editor.interaction().tool() == Tool::Select {
                ctx.set_cursor_icon(egui::CursorIcon::Grab);
            }
        }
        if released {
            self.editor.pointer_up();
        }
        if response.double_clicked() && self.editor.double_click(hit) {
            self.inline_edit = None;
        }

        let painter = ui.painter_at(rect);
        let grid = self.settings.show_grid.then_some(self.settings.grid_size);
        draw_background(&painter, rect, &view, grid);
        draw_scene(
            &painter,
            &view,
            self.editor.scene(),
            self.editor.interaction(),
            &self.textures,
        );

        self.inline_editor(ctx, ui, &view);
    }

    fn inline_editor(&mut self, ctx: &egui::Context, ui: &egui::Ui, view: &View) {
        let Some(element) = self
            .editor
            .scene()
            .editing_id()
            .and_then(|id| self.editor.scene().element(id))
        else {
            self.inline_edit = None;
            return;
        };
        let Some((content, style)) = element.text() else {
            return;
        };
        let (content, style) = (content.to_string(), *style);
        let id = element.id;
        let screen_rect = view.rect_to_screen(element.bounds());

        if self.inline_edit.as_ref().is_none_or(|e| e.element_id != id) {
            self.inline_edit = Some(InlineEdit {
                element_id: id,
                buffer: content,
                focused: false,
            });
        }
        let Some(edit) = self.inline_edit.as_mut() else {
            return;
        };

        let mut changed = false;
        let mut finished = false;
        egui::Area::new(ui.id().with("inline_text_edit"))
            .fixed_pos(screen_rect.min)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_min_size(screen_rect.size());
                let text_edit = egui::TextEdit::singleline(&mut edit.buffer)
                    .desired_width(screen_rect.width())
                    .font(egui::FontId::proportional(style.font_size * view.zoom))
                    .text_color(style.color.to_color32())
                    .horizontal_align(match style.text_align {
                        crate::model::TextAlign::Left => egui::Align::Min,
                        crate::model::TextAlign::Center => egui::Align::Center,
                        crate::model::TextAlign::Right => egui::Align::Max,
                    })
                    .frame(false);
                let response = ui.add(text_edit);
                if !edit.focused {
                    response.request_focus();
                    edit.focused = true;
                }
                changed = response.changed();
                finished = response.lost_focus();
            });

        if changed {
            let patch = ElementPatch::content(edit.buffer.clone());
            self.editor.update_element(id, &patch);
        }
        if finished {
            self.editor.blur(id);
            self.inline_edit = None;
        }
    }
}
