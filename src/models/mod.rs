pub mod user;
pub mod repository;
pub mod commit;
pub mod issue;
pub mod event;
pub mod snapshot;
pub mod metrics;

pub use user::*;
pub use repository::*;
pub use commit::*;
pub use issue::*;
pub use event::{Event, EventKind, EventPayload, EventRepo};
pub use snapshot::*;
pub use metrics::*;
