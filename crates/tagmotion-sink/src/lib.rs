//! Hand-off of gateway output to storage and publish collaborators, and
//! the historical query path over what was stored.

pub mod collaborator;
pub mod error;
pub mod handler;
pub mod memory;
pub mod query;
pub mod record;
pub mod sink;

pub use collaborator::{IdentityLookup, Publisher, SampleStore};
pub use error::{CollaboratorError, QueryError};
pub use handler::GatewayHandler;
pub use memory::{LogPublisher, MemoryStore, StaticIdentity};
pub use query::WindowQuery;
pub use record::{Axes, EnrichedSample};
pub use sink::MetricsSink;
