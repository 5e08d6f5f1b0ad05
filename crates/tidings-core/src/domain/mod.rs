//! Domain model (type keys, tokens, IDs, errors, stats).

pub mod errors;
pub mod ids;
pub mod stats;
pub mod token;
pub mod type_key;

pub use self::errors::{BoxError, BusError, HandlerError, InvalidHandlerError};
pub use self::ids::SubscriptionId;
pub use self::stats::BusStats;
pub use self::token::Token;
pub use self::type_key::{MethodId, NotificationType};
