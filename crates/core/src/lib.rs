//! `wabulk-core` — domain building blocks for template broadcasts.
//!
//! This crate contains **pure domain** types (no I/O, no runtime): contacts and
//! their phone normalization, template descriptors with per-contact
//! placeholders, and job identifiers.

pub mod contact;
pub mod error;
pub mod id;
pub mod template;

pub use contact::{Contact, normalize_phone};
pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use template::{
    ComponentKind, ComponentSpec, DEFAULT_TEMPLATE_LANGUAGE, ParameterSpec, Placeholder,
    TemplateRequest, TextParameter, TextTag,
};
