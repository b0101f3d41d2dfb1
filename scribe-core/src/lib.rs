//! Scribe core library: symbol index, strategy selection, prompting, import
//! resolution, and the verify/repair loop.
//!
//! The main entry point is [`pipeline::ScribePipeline`], which runs
//! Index → Analyze → Classify → Generate/Verify/Repair over every source
//! file of a Java project and returns a [`pipeline::RunReport`].

pub mod artifact;
pub mod config;
pub mod discover;
pub mod error;
pub mod imports;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod repair;
pub mod strategy;
pub mod symbols;
pub mod verify;

#[cfg(test)]
mod test_support;
