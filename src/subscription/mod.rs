//! Subscription protocol
//!
//! Drives subscribe/unsubscribe requests per connection: public channels
//! join directly, private and presence channels pass through the
//! authorization gateway, presence channels additionally broadcast
//! membership changes. The close sweep runs the same unsubscribe transition
//! for every channel a closing connection still belongs to.

pub mod coordinator;

pub use coordinator::SubscriptionCoordinator;
