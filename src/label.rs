//! Document label vocabulary and the text-kind mapping used for routing.
//!
//! Classifiers report one of the sixteen RVL-CDIP document classes. We keep that vocabulary as a
//! closed enum (plus an explicit `Unmapped` variant for anything else) so the mapping onto
//! [`TextKind`] is an exhaustive `match` rather than a chain of string comparisons.

use std::fmt;

/// A raw document class as reported by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentClass {
    Letter,
    Form,
    Email,
    Handwritten,
    Advertisement,
    ScientificReport,
    ScientificPublication,
    Specification,
    FileFolder,
    NewsArticle,
    Budget,
    Invoice,
    Presentation,
    Questionnaire,
    Resume,
    Memo,

    /// A generic "report" label emitted by some label sets; not one of the RVL-CDIP classes.
    Report,

    /// A label outside the known vocabulary, kept verbatim (lowercased) for diagnostics.
    Unmapped(String),
}

/// The RVL-CDIP classes in the id order used by the standard fine-tuned checkpoints.
pub const RVL_CDIP_CLASSES: [DocumentClass; 16] = [
    DocumentClass::Letter,
    DocumentClass::Form,
    DocumentClass::Email,
    DocumentClass::Handwritten,
    DocumentClass::Advertisement,
    DocumentClass::ScientificReport,
    DocumentClass::ScientificPublication,
    DocumentClass::Specification,
    DocumentClass::FileFolder,
    DocumentClass::NewsArticle,
    DocumentClass::Budget,
    DocumentClass::Invoice,
    DocumentClass::Presentation,
    DocumentClass::Questionnaire,
    DocumentClass::Resume,
    DocumentClass::Memo,
];

impl DocumentClass {
    /// Parse a classifier label. Matching ignores case, surrounding whitespace, and `_`/`-`
    /// separators; anything unknown becomes [`DocumentClass::Unmapped`].
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "letter" => Self::Letter,
            "form" => Self::Form,
            "email" => Self::Email,
            "handwritten" => Self::Handwritten,
            "advertisement" => Self::Advertisement,
            "scientific report" => Self::ScientificReport,
            "report" => Self::Report,
            "scientific publication" => Self::ScientificPublication,
            "specification" => Self::Specification,
            "file folder" => Self::FileFolder,
            "news article" => Self::NewsArticle,
            "budget" => Self::Budget,
            "invoice" => Self::Invoice,
            "presentation" => Self::Presentation,
            "questionnaire" => Self::Questionnaire,
            "resume" => Self::Resume,
            "memo" => Self::Memo,
            _ => Self::Unmapped(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Letter => "letter",
            Self::Form => "form",
            Self::Email => "email",
            Self::Handwritten => "handwritten",
            Self::Advertisement => "advertisement",
            Self::ScientificReport => "scientific report",
            Self::ScientificPublication => "scientific publication",
            Self::Specification => "specification",
            Self::FileFolder => "file folder",
            Self::NewsArticle => "news article",
            Self::Budget => "budget",
            Self::Invoice => "invoice",
            Self::Presentation => "presentation",
            Self::Questionnaire => "questionnaire",
            Self::Resume => "resume",
            Self::Memo => "memo",
            Self::Report => "report",
            Self::Unmapped(label) => label,
        }
    }

    /// Map this class onto the text kind the router works with.
    pub fn text_kind(&self) -> TextKind {
        match self {
            Self::Handwritten => TextKind::Handwritten,

            Self::Letter
            | Self::Form
            | Self::Email
            | Self::Memo
            | Self::Resume
            | Self::ScientificPublication
            | Self::Specification
            | Self::NewsArticle
            | Self::Invoice
            | Self::Report => TextKind::Typewritten,

            Self::Advertisement
            | Self::Budget
            | Self::FileFolder
            | Self::Presentation
            | Self::Questionnaire
            | Self::ScientificReport
            | Self::Unmapped(_) => TextKind::OtherDocument,
        }
    }
}

impl From<&str> for DocumentClass {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of text dominates an image, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Handwritten,
    Typewritten,

    /// A confidently recognized document class whose text style isn't the defining trait
    /// (advertisements, budgets, presentations, ...).
    OtherDocument,

    /// No trustworthy classification: the classifier failed or was not confident enough.
    Undetermined,
}

impl TextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TextKind::Handwritten => "handwritten",
            TextKind::Typewritten => "typewritten",
            TextKind::OtherDocument => "other_document_type",
            TextKind::Undetermined => "undetermined",
        }
    }
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
