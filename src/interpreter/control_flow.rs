// File: src/interpreter/control_flow.rs
//
// Pending break/continue signal. Statement execution checks it after every
// statement of a block and loops consume it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlow {
    None,
    /// Exit the innermost loop
    Break,
    /// Skip to the innermost loop's next iteration
    Continue,
}
