//! Label widths measured against the configured font family, resolved through
//! the system font database. Callers fall back to the width table when no face
//! matches.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static MEASURER: Lazy<Mutex<FontMeasurer>> = Lazy::new(|| Mutex::new(FontMeasurer::new()));

/// Width in pixels of `text` set in the first family of the CSS-style
/// `font_family` list that the system provides. `None` when no face matches.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontMeasurer {
    db: Database,
    system_fonts_loaded: bool,
    faces: HashMap<String, Option<FaceMetrics>>,
}

impl FontMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_fonts_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(font_family);
            if face.is_none() {
                tracing::debug!(family = %key, "no system font matched, using width table");
            }
            self.faces.insert(key.clone(), face);
        }
        self.faces
            .get_mut(&key)
            .and_then(Option::as_mut)?
            .width(text, font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<FaceMetrics> {
        let names = family_names(font_family);
        let families: Vec<Family<'_>> = names.iter().map(FamilyName::as_family).collect();

        if !self.system_fonts_loaded {
            self.db.load_system_fonts();
            self.system_fonts_loaded = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FaceMetrics::parse(data.to_vec(), index))
            .flatten()
    }
}

enum FamilyName {
    Generic(Family<'static>),
    Named(String),
}

impl FamilyName {
    fn as_family(&self) -> Family<'_> {
        match self {
            Self::Generic(family) => *family,
            Self::Named(name) => Family::Name(name.as_str()),
        }
    }
}

fn family_names(font_family: &str) -> Vec<FamilyName> {
    let mut names: Vec<FamilyName> = font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "serif" => FamilyName::Generic(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                FamilyName::Generic(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => FamilyName::Generic(Family::Monospace),
            "cursive" => FamilyName::Generic(Family::Cursive),
            "fantasy" => FamilyName::Generic(Family::Fantasy),
            _ => FamilyName::Named(raw.to_string()),
        })
        .collect();
    if names.is_empty() {
        names.push(FamilyName::Generic(Family::SansSerif));
    }
    names
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Horizontal advances of one face. ASCII advances are read up front; other
/// characters are looked up on first use and cached.
struct FaceMetrics {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii_advances: [u16; 128],
    advances: HashMap<char, Option<u16>>,
}

impl FaceMetrics {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = f32::from(face.units_per_em().max(1));
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advances: HashMap::new(),
        })
    }

    fn width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em;
        let missing = font_size * 0.56;
        let mut width = 0.0f32;
        let mut face: Option<Face<'_>> = None;

        for ch in text.chars().filter(|ch| *ch != '\n') {
            let ch = if ch == '\t' { ' ' } else { ch };
            let advance = if ch.is_ascii() {
                Some(self.ascii_advances[ch as usize]).filter(|advance| *advance > 0)
            } else if let Some(cached) = self.advances.get(&ch) {
                *cached
            } else {
                if face.is_none() {
                    face = Some(Face::parse(&self.data, self.index).ok()?);
                }
                let advance = face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                });
                self.advances.insert(ch, advance);
                advance
            };
            width += advance.map_or(missing, |advance| f32::from(advance) * scale);
        }
        Some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_list_maps_generic_names() {
        let names = family_names("\"Amazon Ember\", Arial, sans-serif");
        assert_eq!(names.len(), 3);
        assert!(matches!(&names[0], FamilyName::Named(name) if name == "Amazon Ember"));
        assert!(matches!(names[2], FamilyName::Generic(Family::SansSerif)));
        assert!(matches!(
            family_names(" , ")[0],
            FamilyName::Generic(Family::SansSerif)
        ));
    }

    #[test]
    fn empty_text_measures_zero() {
        assert_eq!(measure_text_width("", 14.0, "Arial"), Some(0.0));
        assert_eq!(measure_text_width("User", 0.0, "Arial"), Some(0.0));
    }

    #[test]
    fn measured_width_grows_with_text() {
        // Hosts without fonts return None; the layout then uses the width table.
        let short = measure_text_width("User", 14.0, "sans-serif");
        let long = measure_text_width("User with iam:PassRole", 14.0, "sans-serif");
        if let (Some(short), Some(long)) = (short, long) {
            assert!(short > 0.0);
            assert!(long > short);
        }
    }
}
