//! Integration tests for skindex-service.
//!
//! These tests drive the real HTTP provider client against a local mock
//! pricing provider:
//! - Startup sequence (catalog sync, prebuilt regeneration)
//! - Index valuation end to end
//! - Persistence across restarts

pub mod common;
