//! Tiled images: tile grid geometry, lazy tile sources and checkout tracking

mod layout;
mod observer;
mod source;
mod tiled;

pub use layout::{TileIndex, TileLayout, TileRange};
pub use observer::TileObserver;
pub use source::{ConstantSource, TileSource};
pub use tiled::TiledImage;
