//! Core domain types for ferrule.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

pub mod command;
pub mod document;
pub mod environment;
pub mod ids;
pub mod settings;
pub mod text;

pub use command::{EditorCommand, MissingExample, Profile, ToolCommand, UnknownCommand};
pub use document::{Document, SOURCE_EXTENSION, TARGET_LANGUAGE_ID, is_eligible};
pub use environment::{RUST_SRC_PATH, ToolEnvironment};
pub use ids::DocumentId;
pub use settings::{CheckWith, EffectiveSettings, ErrorFormat};
pub use text::{EditError, Position, Range, TextEdit, apply_edits};
