mod builder;
mod container;
mod extractor;
mod resolver;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use extractor::{FromScope, Inject};
pub use resolver::{Provider, Resolver, Scope};
