//! Thread identity and the per-participant accept/read state machine.

use missive_types::models::ConversationState;

/// Symmetric thread id: both addresses lowercased, greater one first.
pub fn conversation_id(a: &str, b: &str) -> String {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    if a >= b {
        format!("{}{}", a, b)
    } else {
        format!("{}{}", b, a)
    }
}

/// Whether `id` has the shape `conversation_id` produces: two `0x`
/// addresses back to back, any case.
pub fn is_pair_id(id: &str) -> bool {
    fn is_address(s: &str) -> bool {
        s.len() == 42 && s.starts_with("0x") && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
    }
    id.len() == 84 && id.is_char_boundary(42) && is_address(&id[..42]) && is_address(&id[42..])
}

/// Events that touch one participant's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The counterpart sent a message into the thread.
    Receive,
    /// The row owner sent a message.
    Send,
    Accept,
    MarkRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationFlags {
    pub accepted: bool,
    pub read: bool,
}

impl ConversationFlags {
    /// Flags of a row created by `transition`.
    pub fn initial(transition: Transition) -> Self {
        match transition {
            Transition::Receive => Self { accepted: false, read: false },
            Transition::Send | Transition::Accept | Transition::MarkRead => {
                Self { accepted: true, read: true }
            }
        }
    }

    /// Flags after applying `transition` to an existing row.
    pub fn apply(self, transition: Transition) -> Self {
        match transition {
            // keeps acceptance: an accepted thread goes unread, never unaccepted
            Transition::Receive => Self { accepted: self.accepted, read: false },
            Transition::Send | Transition::Accept | Transition::MarkRead => {
                Self { accepted: true, read: true }
            }
        }
    }

    pub fn state(self) -> ConversationState {
        ConversationState::from_flags(self.accepted, self.read)
    }
}

/// Fold a sequence of transitions over a row that does not exist yet.
pub fn replay(transitions: &[Transition]) -> Option<ConversationFlags> {
    transitions.iter().fold(None, |row, &t| match row {
        None => Some(ConversationFlags::initial(t)),
        Some(flags) => Some(flags.apply(t)),
    })
}
