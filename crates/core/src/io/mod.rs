//! GeoTIFF reading and writing

mod native;

pub use native::{read_geotiff, read_geotiff_bands, write_geotiff, write_geotiff_u8, Compression};
