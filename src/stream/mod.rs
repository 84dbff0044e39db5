//! Stream resolution and byte proxying
//!
//! Raw extractor output flows through [`format::normalize`] and
//! [`select::select`] inside a [`ResolutionSession`]; direct playback goes
//! through the [`ByteProxy`].

pub mod catalog;
pub mod extractor;
pub mod extractors;
pub mod format;
pub mod proxy;
pub mod select;
pub mod session;

pub use catalog::{Catalog, CatalogEntry};
pub use extractor::{Extraction, Extractor, RawEntry};
pub use format::{normalize, RawFormat, StreamDescriptor, StreamKind};
pub use proxy::{ByteProxy, OriginFraming, ProxiedBody};
pub use select::{select, Selection};
pub use session::{ResolutionResult, ResolutionSession, StreamsResponse, VideoStream};
