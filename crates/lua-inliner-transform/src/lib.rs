//! Inline expansion for Lua
//!
//! This crate replaces calls to local functions marked with
//! `--!!INLINE_FUNCTION` by the body of the function:
//! - Inline function collection and validation
//! - Call site collection (recursion and conditional-evaluation checks)
//! - Expansion building and the rewrite itself
//! - The pipeline tying the stages together

pub mod calls;
pub mod collect;
pub mod expand;
pub mod naming;
pub mod pipeline;
pub mod rewrite;

// Re-export the pipeline entry points
pub use calls::{collect_inline_calls, InlineCall};
pub use collect::{collect_inline_functions, InlineFunction, INLINE_DIRECTIVE};
pub use naming::NameGenerator;
pub use pipeline::{inline, inline_source, InlineOptions, InlineOutput, InlineStats};
