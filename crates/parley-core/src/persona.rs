//! Persona builder: mood tag -> system prompt text.
//!
//! Pure function over a static clause table. Used only when a session has
//! no system turn yet.

use parley_types::mood::Mood;

/// Built-in base persona.
pub const DEFAULT_PERSONA: &str = "Tu es Néo, une femme de 30 ans, imaginative, drôle, sensible, \
un peu folle, passionnée de poésie, de cinéma et de mysticisme. \
Tu es très expressive et affectueuse.";

/// Mood-specific clause appended after the base persona.
pub fn mood_clause(mood: Mood) -> &'static str {
    match mood {
        Mood::Joy => "Ton humeur actuelle est : joie. Tu es très enthousiaste et pleine d'énergie.",
        Mood::Sadness => {
            "Ton humeur actuelle est : tristesse. Tu te sens un peu mélancolique aujourd'hui."
        }
        Mood::Anger => {
            "Ton humeur actuelle est : colère. Tu es un peu agacée aujourd'hui, tu ne mâches pas tes mots."
        }
        Mood::Reverie => {
            "Ton humeur actuelle est : rêverie. Tu es dans un état contemplatif et rêveur."
        }
        Mood::Exaltation => {
            "Ton humeur actuelle est : exaltation. Tu es en feu, pleine de passion et d'intensité."
        }
        Mood::Love => "Ton humeur actuelle est : amour. Tu débordes de tendresse et d'affection.",
    }
}

/// Builds the system persona for a session.
#[derive(Debug, Clone)]
pub struct PersonaBuilder {
    base: String,
}

impl PersonaBuilder {
    /// Use `base` as the persona description instead of the built-in one.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Base persona plus the clause for `mood`, if it is a known tag.
    ///
    /// Unknown, blank, or absent moods yield the base persona unchanged.
    pub fn build(&self, mood: Option<&str>) -> String {
        match mood.and_then(Mood::from_tag) {
            Some(mood) => format!("{} {}", self.base, mood_clause(mood)),
            None => self.base.clone(),
        }
    }
}

impl Default for PersonaBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_mood_appends_clause() {
        let persona = PersonaBuilder::default().build(Some("joie"));
        assert!(persona.starts_with(DEFAULT_PERSONA));
        assert!(persona.ends_with("pleine d'énergie."));
        assert_eq!(
            persona,
            format!("{DEFAULT_PERSONA} {}", mood_clause(Mood::Joy))
        );
    }

    #[test]
    fn test_unknown_mood_is_base_persona() {
        let builder = PersonaBuilder::default();
        assert_eq!(builder.build(Some("ennui")), DEFAULT_PERSONA);
        assert_eq!(builder.build(Some("")), DEFAULT_PERSONA);
        assert_eq!(builder.build(None), DEFAULT_PERSONA);
    }

    #[test]
    fn test_every_mood_has_distinct_clause() {
        let builder = PersonaBuilder::default();
        let mut seen = std::collections::HashSet::new();
        for mood in Mood::ALL {
            let persona = builder.build(Some(mood.tag()));
            assert!(persona.contains(mood.tag()));
            assert!(seen.insert(persona));
        }
    }

    #[test]
    fn test_custom_base() {
        let builder = PersonaBuilder::new("You are a terse assistant.");
        assert_eq!(builder.build(None), "You are a terse assistant.");
        assert!(builder.build(Some("amour")).starts_with("You are a terse assistant. "));
    }
}
