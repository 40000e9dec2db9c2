//! Category module - content classes for analysed posts

use std::fmt;

/// Category assigned to a post by the classifier
///
/// The model is only asked to choose between the first three. The last two
/// are produced locally when its answer cannot be used:
/// - Unknown: the answer was not valid JSON or named no known category
/// - Error: the model call itself failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A factual statement that can be checked
    Claim,

    /// A question rather than an assertion
    Question,

    /// Humour, irony or sarcasm
    MemeOrSarcasm,

    /// The model answered but the answer could not be interpreted
    Unknown,

    /// The model could not be reached or rejected the request
    Error,
}

impl Category {
    /// Get the wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Claim => "claim",
            Category::Question => "question",
            Category::MemeOrSarcasm => "meme/sarcasm",
            Category::Unknown => "unknown",
            Category::Error => "error",
        }
    }

    /// Parse a category label as written by the model
    ///
    /// Matching ignores case and surrounding whitespace. The meme class
    /// accepts the spellings models commonly produce for it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "claim" => Some(Category::Claim),
            "question" => Some(Category::Question),
            "meme/sarcasm" | "meme" | "sarcasm" | "meme-or-sarcasm" | "meme_sarcasm"
            | "meme or sarcasm" => Some(Category::MemeOrSarcasm),
            "unknown" => Some(Category::Unknown),
            "error" => Some(Category::Error),
            _ => None,
        }
    }

    /// Whether this category triggers a fact-check
    pub fn is_claim(&self) -> bool {
        matches!(self, Category::Claim)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid category: {}", s))
    }
}
