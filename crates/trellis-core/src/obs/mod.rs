//! Observability wiring; must not implement lowering logic.

mod sink;

pub use sink::{DiagnosticEvent, DiagnosticsSink, SilentSink};
