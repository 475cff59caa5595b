//! Geometric value types shared by the raster and projection layers.
//!
//! # Example
//!
//! ```
//! use flood_risk::types::{BoundingBox, GeoTransform};
//!
//! let transform = GeoTransform::from_origin(0.0, 100.0, 10.0, 10.0);
//! let bounds: BoundingBox = transform.bounds(10, 10);
//!
//! assert_eq!(bounds.as_tuple(), (0.0, 0.0, 100.0, 100.0));
//! assert_eq!(transform.resolution().as_tuple(), (10.0, 10.0));
//! ```

mod bounds;
mod resolution;
mod transform;

pub use bounds::BoundingBox;
pub use resolution::Resolution;
pub use transform::GeoTransform;
