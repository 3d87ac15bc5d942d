//! Tile checkout notifications

use crate::image::TileIndex;

/// Receives writable-state transitions of the tiles of an image.
///
/// `will_be_writable` is `true` when the first writer acquires a tile and
/// `false` when the last writer releases it. Nested acquisitions of an
/// already writable tile are not reported.
pub trait TileObserver: Send + Sync {
    fn tile_update(&self, tile: TileIndex, will_be_writable: bool);
}
