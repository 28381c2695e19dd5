//! Infrastructure services

mod rag_service;

pub use rag_service::{
    QueryDetail, QueryOutcome, QueryRequest, RagService, RagServiceTrait, Readiness,
    ScopeDeletion,
};
