//! Reading and writing tiled images

mod native;

pub use native::{
    open_tiff, open_tiff_from_buffer, write_tiff, write_tiff_to_buffer, TiffOptions, TiffTileSource,
};
