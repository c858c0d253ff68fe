//! Geometry, placement rules and state for wall plates carrying socket
//! groups. Rendering and I/O live in the other workspace crates.

pub mod constants;
pub mod controls;
pub mod drag;
pub mod geometry;
pub mod layout;
pub mod models;
pub mod persist;
pub mod placement;
pub mod store;
pub mod units;

pub use geometry::{Rect, Size};
pub use layout::{Composition, Layout, ViewTransform};
pub use models::{Dimension, Direction, GroupPatch, Plate, Point, SocketGroup, Unit, total_price_eur};
pub use placement::{Rejection, validate};
pub use store::{PlateStore, SocketError, SocketStore, UnitStore};
pub use units::{InputError, format_eur};
