// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for nickel-refl crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`cache_store`] - In-memory cache store fake for testing without filesystem
//! - [`ast`] - Scripted AST provider and cursor builders

pub mod ast;
pub mod cache_store;

pub use ast::{
    annotation, class, ctor, enum_decl, field, method, namespace, param, struct_decl,
    translation_unit, CursorBuilder, ScriptedAstProvider,
};
pub use cache_store::InMemoryCacheStore;
