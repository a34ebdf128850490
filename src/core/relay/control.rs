/// Category of a reserved control prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Telemetry,
    Position,
    MoveScope,
    Log,
}

/// Reserved prefixes, longest first. The first entry that is a byte prefix
/// of the message decides its route.
pub const CONTROL_PREFIXES: [(&str, ControlKind); 4] = [
    ("ALTAIRDATA: ", ControlKind::Telemetry),
    ("ALTAIRPOS: ", ControlKind::Position),
    ("MOVESCOPE: ", ControlKind::MoveScope),
    ("LOG:", ControlKind::Log),
];

/// A subscriber message after prefix classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage<'a> {
    /// Whole message, prefix included
    Log(&'a str),
    /// Payload for the motor controller
    MoveScope(&'a str),
    /// Payload for the position snapshot
    Position(&'a str),
    /// Payload for the telemetry snapshot
    Telemetry(&'a str),
    /// No reserved prefix; goes to the device verbatim
    Passthrough(&'a str),
}

impl<'a> ControlMessage<'a> {
    pub fn parse(message: &'a str) -> Self {
        for (prefix, kind) in CONTROL_PREFIXES {
            if let Some(payload) = message.strip_prefix(prefix) {
                return match kind {
                    ControlKind::Telemetry => ControlMessage::Telemetry(payload),
                    ControlKind::Position => ControlMessage::Position(payload),
                    ControlKind::MoveScope => ControlMessage::MoveScope(payload),
                    ControlKind::Log => ControlMessage::Log(message),
                };
            }
        }
        ControlMessage::Passthrough(message)
    }
}
