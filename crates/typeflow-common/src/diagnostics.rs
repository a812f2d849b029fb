//! The diagnostics-sink collaborator the engine consumes (spec §6).
//!
//! The engine itself renders no end-user output (spec §7); it only
//! reports non-fatal events — an unresolvable upper-bound class, debug
//! traces when `should_log` is on — through this trait so the embedder
//! can route them into its own diagnostics surface.

/// A severity for a non-fatal engine message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// A debug trace, only emitted when the engine's `should_log` switch is on.
    Trace,
    /// A resolution gap or other condition the embedder should know about,
    /// but that does not abort the analysis (e.g. an unresolvable bound
    /// class demoted to a universal filter, per spec §4.7).
    Warning,
}

/// Receives non-fatal messages from the engine.
///
/// Implementations must not block; the engine's dispatch loop is a tight
/// run-to-quiescence loop with no suspension points (spec §5).
pub trait DiagnosticsSink {
    fn report(&self, level: DiagnosticLevel, message: &str);
}

/// A `DiagnosticsSink` that discards everything.
///
/// Used as the default when an embedder does not supply a sink, and in
/// tests that don't care about diagnostic output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl DiagnosticsSink for NullDiagnostics {
    fn report(&self, _level: DiagnosticLevel, _message: &str) {}
}
