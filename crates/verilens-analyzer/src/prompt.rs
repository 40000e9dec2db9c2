//! LLM prompt engineering for classification and fact-checking

/// Which question the prompt asks the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Decide between claim, question and meme/sarcasm
    Classify,
    /// Score the truthfulness of a claim
    FactCheck,
}

/// Builds prompts for the model
pub struct PromptBuilder {
    text: String,
}

impl PromptBuilder {
    /// Create a new prompt builder around the post text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Build the complete prompt for `task`
    pub fn build(&self, task: TaskKind) -> String {
        let (instructions, label, format) = match task {
            TaskKind::Classify => (CLASSIFY_INSTRUCTIONS, "Post", CLASSIFY_FORMAT),
            TaskKind::FactCheck => (FACT_CHECK_INSTRUCTIONS, "Statement", FACT_CHECK_FORMAT),
        };

        let mut prompt = String::new();
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("{}: \"{}\"\n\n", label, self.text));
        prompt.push_str(format);
        prompt
    }
}

const CLASSIFY_INSTRUCTIONS: &str = r#"Classify this social media post into exactly one of the following categories:
- claim
- question
- meme/sarcasm"#;

const CLASSIFY_FORMAT: &str = r#"Return strictly in JSON, with no additional text:
{"type": "<claim|question|meme/sarcasm>", "reason": "<short explanation>"}"#;

const FACT_CHECK_INSTRUCTIONS: &str =
    "Evaluate the truthfulness of the following statement on a scale from 0 (false) to 100 (true).";

const FACT_CHECK_FORMAT: &str = r#"Return strictly in JSON, with no additional text:
{"score": <0-100>, "explanation": "<short reasoning>"}"#;
