// SPDX-License-Identifier: MIT

//! sentinel-rs - refund triage workflow with human-in-the-loop approval
//!
//! - [adk] - model plumbing shared by every LLM-backed capability
//! - [sentinel] - the support workflow: state, steps, routing, suspend/resume

pub mod adk;
pub mod sentinel;
