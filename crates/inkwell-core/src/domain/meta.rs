use serde::Serialize;

/// Human-readable label and help text of a model field, used when
/// rendering forms and record listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub name: &'static str,
    pub verbose_name: &'static str,
    pub help_text: &'static str,
}

impl FieldMeta {
    pub const fn new(name: &'static str, verbose_name: &'static str) -> Self {
        Self {
            name,
            verbose_name,
            help_text: "",
        }
    }

    pub const fn with_help(mut self, help_text: &'static str) -> Self {
        self.help_text = help_text;
        self
    }
}

/// Entities that describe their fields.
pub trait FieldMetadata {
    const FIELDS: &'static [FieldMeta];

    fn field(name: &str) -> Option<&'static FieldMeta> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}
