//! # parley-shared
//!
//! Domain values shared by the store and the client: identifiers, chats and
//! messages, per-chat rules and their evaluator, the delivery-status policy,
//! remote deltas, and the JSON wire types.

pub mod clock;
pub mod constants;
pub mod delivery;
pub mod delta;
pub mod models;
pub mod protocol;
pub mod rules;
pub mod types;
pub mod validation;

mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{DeliveryStatusPolicy, InvalidTransition, StandardDeliveryPolicy};
pub use delta::{ChatDelta, ChatListDelta};
pub use error::ProtocolError;
pub use models::*;
pub use rules::{Action, Rule, RuleEngine, RuleSet, RuleViolation};
pub use types::*;
