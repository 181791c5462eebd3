//! Core data models for generation requests and their results.

mod request;
mod result;

pub use request::{GenerationRequest, ModelCredential, ProjectProfile, ReferenceItem, WritingLanguage};
pub use result::{
    CanonicalResult, ModelInfo, ModelListing, Module, SearchRecord, UnknownModule,
    DEFAULT_RECORD_YEAR, MAX_TITLES,
};
