// Event source adapters: the paged query contract, the GraphQL
// implementation, and the registry of configured networks.

pub mod graphql;
pub mod memory;
pub mod registry;
pub mod source;
pub mod wire;

pub use graphql::{GraphQlConnector, GraphQlSource, FLAGS_QUERY};
pub use memory::{MemoryConnector, MemorySource};
pub use registry::{NetworkConfig, NetworkRegistry, RegistryError};
pub use source::{Connector, EventSource, SourceError};
