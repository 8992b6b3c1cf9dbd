/// Synthesis timbre of a note layer, resolved once from its instrument tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timbre {
    Percussive,
    Bass,
    Lead,
}

/// Keyword → timbre lookup, checked in order. Percussive comes first so a
/// "bass drum" is a drum.
pub const TIMBRE_KEYWORDS: &[(&str, Timbre)] = &[
    ("kick", Timbre::Percussive),
    ("drum", Timbre::Percussive),
    ("bass", Timbre::Bass),
];

impl Timbre {
    /// Case-insensitive substring match against [`TIMBRE_KEYWORDS`], falling
    /// back to [`Timbre::Lead`].
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.to_lowercase();
        TIMBRE_KEYWORDS
            .iter()
            .find(|(keyword, _)| tag.contains(keyword))
            .map(|&(_, timbre)| timbre)
            .unwrap_or(Timbre::Lead)
    }
}
