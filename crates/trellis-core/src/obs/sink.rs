//! Diagnostics sink boundary.
//!
//! Lowering logic MUST NOT depend on a concrete logging backend.
//! All structured warnings flow through DiagnosticEvent and
//! DiagnosticsSink; the embedding pipeline decides where they go.

use crate::shape::CollectionId;
use serde::Serialize;

///
/// DiagnosticEvent
///
/// Structured, warning-level conditions surfaced during lowering.
/// This enum is intentionally extensible.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum DiagnosticEvent {
    /// A collection was lowered as part of a single query while the
    /// caller expressed no splitting preference. Compilation proceeds;
    /// the implicit choice is made observable here.
    ImplicitSingleQuery {
        collection_id: CollectionId,
        navigation: Option<String>,
    },
}

///
/// DiagnosticsSink
///

pub trait DiagnosticsSink {
    fn record(&self, event: DiagnosticEvent);
}

///
/// SilentSink
/// Default sink that drops every event.
///

pub struct SilentSink;

impl DiagnosticsSink for SilentSink {
    fn record(&self, _: DiagnosticEvent) {}
}
