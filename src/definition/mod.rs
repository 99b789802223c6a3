/// Definition document model, structural validation and live registry

pub mod registry;
pub mod types;
pub mod validator;

pub use registry::{DefinitionRegistry, Listener, ListenerId, RegistryEvent};
pub use types::{ChannelMap, ConnectionMap, ConnectionTarget, Definition, Node, Settings};
pub use validator::{DefinitionValidator, ValidationResult};
