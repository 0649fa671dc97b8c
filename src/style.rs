//! Per-category formatting rules derived from a reference document.
//!
//! A `StyleProfile` maps each content category to a `StyleDescriptor`. It is
//! built once per formatting request (see `template`), read-only afterwards,
//! and discarded at request end. There is deliberately no cross-request
//! caching: re-extracting trades a little latency for never serving stale
//! styles after the reference document changes.

/// The content categories the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Title,
    Speaker,
    Scripture,
    Music,
    Narration,
}

/// Paragraph alignment, kept abstract from the output format's own enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justified,
}

/// Paragraph indentation in twips (1/20 pt; 720 twips = 0.5").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    None,
    /// Indent of the whole paragraph from the left margin.
    Start(i32),
    /// Indent of the first line only.
    FirstLine(i32),
}

/// The formatting decisions applied to one category of content.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDescriptor {
    pub font_family: String,
    pub point_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub alignment: Alignment,
    pub indent: Indent,
}

impl StyleDescriptor {
    fn new(point_size: f32, bold: bool, italic: bool, alignment: Alignment, indent: Indent) -> Self {
        Self {
            font_family: DEFAULT_FONT.to_string(),
            point_size,
            bold,
            italic,
            alignment,
            indent,
        }
    }
}

const DEFAULT_FONT: &str = "Calibri";

/// Mapping from content category to style descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProfile {
    pub title: StyleDescriptor,
    pub speaker: StyleDescriptor,
    pub scripture: StyleDescriptor,
    pub music: StyleDescriptor,
    pub narration: StyleDescriptor,
}

impl StyleProfile {
    /// The documented fallback profile, used whenever the reference document
    /// is missing, unreadable, or has no example of a category.
    pub fn default_profile() -> Self {
        Self {
            title: StyleDescriptor::new(18.0, true, false, Alignment::Center, Indent::None),
            speaker: StyleDescriptor::new(12.0, true, false, Alignment::Left, Indent::None),
            scripture: StyleDescriptor::new(12.0, true, false, Alignment::Left, Indent::Start(720)),
            music: StyleDescriptor::new(12.0, false, true, Alignment::Center, Indent::None),
            narration: StyleDescriptor::new(
                12.0,
                false,
                false,
                Alignment::Left,
                Indent::FirstLine(360),
            ),
        }
    }

    /// Look up the descriptor for a category.
    pub fn descriptor(&self, category: Category) -> &StyleDescriptor {
        match category {
            Category::Title => &self.title,
            Category::Speaker => &self.speaker,
            Category::Scripture => &self.scripture,
            Category::Music => &self.music,
            Category::Narration => &self.narration,
        }
    }

    pub(crate) fn descriptor_mut(&mut self, category: Category) -> &mut StyleDescriptor {
        match category {
            Category::Title => &mut self.title,
            Category::Speaker => &mut self.speaker,
            Category::Scripture => &mut self.scripture,
            Category::Music => &mut self.music,
            Category::Narration => &mut self.narration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_documented_values() {
        let profile = StyleProfile::default_profile();
        assert_eq!(profile.title.point_size, 18.0);
        assert!(profile.title.bold);
        assert_eq!(profile.title.alignment, Alignment::Center);
        assert_eq!(profile.scripture.indent, Indent::Start(720));
        assert_eq!(profile.narration.indent, Indent::FirstLine(360));
        assert!(profile.music.italic);
        assert_eq!(profile.narration.font_family, "Calibri");
    }

    #[test]
    fn descriptor_lookup_covers_every_category() {
        let profile = StyleProfile::default_profile();
        for category in [
            Category::Title,
            Category::Speaker,
            Category::Scripture,
            Category::Music,
            Category::Narration,
        ] {
            // Every category resolves to a usable descriptor.
            assert!(profile.descriptor(category).point_size > 0.0);
        }
    }
}
