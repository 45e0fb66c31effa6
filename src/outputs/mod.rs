//! Output generation: trip pages, index files and JSON records.
//!
//! # Submodules
//!
//! - [`page`]: Renders a `TripRecord` through the page template
//! - [`indexes`]: Keeps the per-country and global HTML indexes up to date
//! - [`json`]: Writes `TripRecord` data as JSON
//!
//! # Output Structure
//!
//! ```text
//! docs/
//! ├── index.html             # Global index, one entry per country
//! └── jpn/
//!     ├── index.html         # Country index, one entry per trip
//!     ├── giappone-360.html
//!     └── tour-hokkaido.html
//! ```

pub mod indexes;
pub mod json;
pub mod page;
