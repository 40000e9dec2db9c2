//! VeriLens Domain Layer
//!
//! Core vocabulary shared by every VeriLens crate. It has ZERO external
//! dependencies and defines the content categories a post can fall into,
//! plus the trait interfaces for the two external collaborators: the
//! text-generation model and the OCR engine.
//!
//! ## Key Concepts
//!
//! - **Category**: What kind of post the model thinks it is looking at
//! - **LlmProvider**: Anything that turns a prompt into generated text
//! - **TextRecognizer**: Anything that reads text out of an image file
//!
//! Infrastructure implementations live in `verilens-llm` and
//! `verilens-analyzer`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod traits;

// Re-exports for convenience
pub use category::Category;
pub use traits::{LlmProvider, TextRecognizer};
