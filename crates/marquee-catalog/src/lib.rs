//! Catalog service implementation.
//!
//! This crate provides the movie detail assembler and the service that
//! implements [`marquee_core::Catalog`] on top of any store.

pub mod assembler;
pub mod service;

pub use assembler::DetailAssembler;
pub use service::CatalogService;
