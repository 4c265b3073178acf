//! The command vocabulary submitted by the UI to the Motion Worker (§3 `CommandEnvelope`).
//!
//! A tagged match replaces the source's string-keyed `function_map` dispatch table (§9
//! design notes: dynamic dispatch table becomes a static match), preserving the same
//! extensibility without reflective lookup.

/// One of the four fixed focusing positions, or the sample center, derived from the
/// Settings center point (§4.4 `go_to_focus_location`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTag {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

/// A command submitted to the Motion Worker's inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEnvelope {
    GoToFocusLocation(FocusTag),
    PrintPhasePlate,
    CloseConnection,
    OpenShutter,
    CloseShutter,
    SendLaserCommand(String),
}
