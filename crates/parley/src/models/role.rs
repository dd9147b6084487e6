use serde::{Deserialize, Serialize};

/// The author of a canonical turn.
///
/// The canonical model only distinguishes the model's own turns from
/// everything else: any non-`Model` role lands on the `user` side of both
/// wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// The role string both chat APIs expect for this turn.
    pub fn as_wire_role(&self) -> &'static str {
        match self {
            Role::Model => "assistant",
            Role::User => "user",
        }
    }
}
