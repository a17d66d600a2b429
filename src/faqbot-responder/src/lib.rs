//! Rule-based responder for faqbot.
//!
//! The responder holds an ordered table of rules. Each rule pairs a list of
//! triggers (literal substrings or regular expressions) with the delivery
//! contexts it listens in and a canned response. For every inbound message
//! the first matching rule wins and is rendered into a [`Reply`]; delivering
//! that reply is left to the caller.
//!
//! # Example
//!
//! ```rust
//! use faqbot_responder::{IncomingMessage, Responder, Response, Scope, Trigger};
//!
//! let responder = Responder::builder()
//!     .hears(
//!         vec![Trigger::pattern("hello")?, Trigger::pattern("hi")?],
//!         [Scope::Mention, Scope::DirectMessage],
//!         Response::plain("Hello!"),
//!     )?
//!     .build();
//!
//! let message = IncomingMessage::new(Scope::DirectMessage, "hi");
//! let reply = responder.match_message(&message).expect("greeting matches");
//! assert_eq!(reply.text, "Hello!");
//! # Ok::<(), faqbot_responder::ResponderError>(())
//! ```
//!
//! # Rule files
//!
//! Rule tables can also be loaded from TOML, see [`RuleSet`]. The bot ships
//! with a built-in table available through [`RuleSet::builtin`].

pub mod config;
pub mod error;
pub mod message;
pub mod responder;
pub mod rule;
pub mod scope;
pub mod trigger;

// Re-export main types
pub use config::{FallbackSpec, RuleSet, RuleSpec, TriggerSpec};
pub use error::{ResponderError, ResponderResult};
pub use message::{IncomingMessage, MessageRef, Reply};
pub use responder::{Fallback, Responder, ResponderBuilder};
pub use rule::{DeliveryMode, Response, Rule};
pub use scope::Scope;
pub use trigger::Trigger;
