//! # sr-core
//!
//! Shared types, configuration, and logging for the signal relay.
//!
//! This crate holds the building blocks every other crate depends on: the
//! exchange-agnostic [`types::OrderRequest`], market constraints, credential
//! wrappers that never print their contents, millisecond timestamps, the
//! layered [`config::AppConfig`], and tracing initialization.

pub mod config;
pub mod logging;
pub mod types;
