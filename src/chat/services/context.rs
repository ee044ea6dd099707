//! Prompt assembly from system instructions and recent history.

use crate::chat::domain::Session;

/// Number of history turns included when none is configured.
pub const DEFAULT_CONTEXT_WINDOW: usize = 4;

/// Label preceding the rendered history block.
pub const HISTORY_HEADING: &str = "Previous conversation:";

/// Renders the prompt sent to the generation service.
///
/// The layout is the system instructions, the labelled history block
/// holding at most `window` of the session's newest turns (oldest first),
/// the new user message, and a trailing assistant cue. The result depends
/// only on the arguments.
///
/// # Examples
///
/// ```
/// use parley::chat::domain::{Role, Session, SessionId};
/// use parley::chat::services::build_prompt;
/// use mockable::DefaultClock;
///
/// let clock = DefaultClock;
/// let mut session = Session::new(SessionId::mint(&clock), &clock);
/// session.append(Role::User, "Hi", &clock);
/// session.append(Role::Assistant, "Hello!", &clock);
///
/// let prompt = build_prompt("Be brief.", &session, "Prices?", 4);
/// assert_eq!(
///     prompt,
///     "Be brief.\n\nPrevious conversation:\nUser: Hi\nAssistant: Hello!\n\nUser: Prices?\n\nAssistant:"
/// );
/// ```
#[must_use]
pub fn build_prompt(
    system_instructions: &str,
    session: &Session,
    new_user_message: &str,
    window: usize,
) -> String {
    let history = session
        .recent(window)
        .iter()
        .map(crate::chat::domain::Turn::render)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{system_instructions}\n\n{HISTORY_HEADING}\n{history}\n\nUser: {new_user_message}\n\nAssistant:"
    )
}

/// Holds the injected system instructions and window size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBuilder {
    system_instructions: String,
    window: usize,
}

impl ContextBuilder {
    /// Creates a builder with the given instructions and window size.
    #[must_use]
    pub fn new(system_instructions: impl Into<String>, window: usize) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            window,
        }
    }

    /// Returns the configured window size.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Returns the configured system instructions.
    #[must_use]
    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    /// Renders the prompt for `new_user_message` against `session`.
    #[must_use]
    pub fn build(&self, session: &Session, new_user_message: &str) -> String {
        build_prompt(
            &self.system_instructions,
            session,
            new_user_message,
            self.window,
        )
    }
}
