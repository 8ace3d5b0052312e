//! Static palette shown in the side panel.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteIcon {
    pub glyph: &'static str,
    pub name: &'static str,
}

const fn icon(glyph: &'static str, name: &'static str) -> PaletteIcon {
    PaletteIcon { glyph, name }
}

pub const ORGANIZATION_ICONS: &[PaletteIcon] = &[
    icon("🧬", "DNA"),
    icon("🔬", "Cell"),
    icon("⚛️", "Molecule"),
    icon("🦠", "Virus"),
    icon("🧪", "Lab"),
    icon("🧠", "Brain"),
    icon("❤️", "Heart"),
    icon("💊", "Medicine"),
    icon("🐭", "Mouse"),
    icon("☢️", "Radiation"),
    icon("💉", "Injection"),
    icon("📅", "Calendar"),
];

pub const ARROW_SHAPES: &[PaletteIcon] = &[
    icon("→", "Right arrow"),
    icon("←", "Left arrow"),
    icon("↑", "Up arrow"),
    icon("↓", "Down arrow"),
    icon("↔", "Double arrow"),
    icon("↻", "Cycle"),
];

/// Image the user uploaded this session, kept so it can be placed again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    pub name: String,
    /// `data:` URI with the base64 payload.
    pub data_uri: String,
}

/// Uploaded images keyed by file name; re-uploading a name keeps the first.
#[derive(Clone, Debug, Default)]
pub struct UploadLibrary {
    images: Vec<UploadedImage>,
}

impl UploadLibrary {
    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    pub fn get(&self, name: &str) -> Option<&UploadedImage> {
        self.images.iter().find(|i| i.name == name)
    }

    /// Returns `true` when the image was new.
    pub fn remember(&mut self, image: UploadedImage) -> bool {
        if self.get(&image.name).is_some() {
            return false;
        }
        self.images.push(image);
        true
    }
}
