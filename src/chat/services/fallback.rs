//! Canned replies used when no generated text is available.

use rand::Rng;
use rand::seq::SliceRandom;

const CONTACT_US_REPLY: &str = "I'm here to help! For detailed inquiries about our services, \
please email or call our team directly, or browse the website for more information.";

const FAULT_REPLY: &str = "Hello! Thanks for getting in touch. For immediate assistance, \
please email or call our team directly. We're happy to help with all your digital needs!";

const UNAVAILABLE_REPLIES: [&str; 3] = [
    "Thanks for reaching out! We specialise in website design, mobile apps and digital \
marketing. How can I help you today?",
    "Hello! I'm here to assist with information about our services. Are you looking for \
website development, mobile apps, or something else?",
    "Welcome! We offer custom software development and digital services. Feel free to ask \
about our pricing or portfolio.",
];

/// Replies substituted for generated text.
///
/// - `contact_us`: no credential is configured
/// - `unavailable`: the external call failed; one is chosen at random
/// - `fault`: an internal fault interrupted the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReplies {
    contact_us: String,
    unavailable: Vec<String>,
    fault: String,
}

impl Default for FallbackReplies {
    fn default() -> Self {
        Self {
            contact_us: CONTACT_US_REPLY.to_owned(),
            unavailable: UNAVAILABLE_REPLIES.iter().map(|s| (*s).to_owned()).collect(),
            fault: FAULT_REPLY.to_owned(),
        }
    }
}

impl FallbackReplies {
    /// Creates a reply set from explicit texts.
    #[must_use]
    pub fn new(
        contact_us: impl Into<String>,
        unavailable: impl IntoIterator<Item = String>,
        fault: impl Into<String>,
    ) -> Self {
        Self {
            contact_us: contact_us.into(),
            unavailable: unavailable.into_iter().collect(),
            fault: fault.into(),
        }
    }

    /// Returns the reply used when the service is not configured.
    #[must_use]
    pub fn contact_us(&self) -> &str {
        &self.contact_us
    }

    /// Returns the reply used after an internal fault.
    #[must_use]
    pub fn fault(&self) -> &str {
        &self.fault
    }

    /// Returns every reply that may follow a failed external call.
    #[must_use]
    pub fn unavailable(&self) -> &[String] {
        &self.unavailable
    }

    /// Picks one reply for a failed external call.
    ///
    /// Falls back to [`Self::contact_us`] when the set is empty.
    #[must_use]
    pub fn pick_unavailable(&self, rng: &mut impl Rng) -> &str {
        self.unavailable
            .choose(rng)
            .map_or(self.contact_us.as_str(), String::as_str)
    }
}
