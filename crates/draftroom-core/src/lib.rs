// Draft engine core: domain model, turn computation, persistence, and the
// interfaces of the collaborators the engine talks to.

pub mod access;
pub mod catalog;
pub mod chat;
pub mod clock;
pub mod error;
pub mod events;
pub mod model;
pub mod order;
pub mod store;

pub use error::{DraftError, DraftResult};
