//! Document tree: slotmap-backed elements with states, styles, attributes
//! and bounds, declared through a static element registry.

pub mod document;
pub mod element;
pub mod registry;

pub use document::Document;
pub use element::{Element, ElementId};
pub use registry::{ElementRegistry, ElementRegistryBuilder, ElementType};
