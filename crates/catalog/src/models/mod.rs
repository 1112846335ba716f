mod catalog;
mod entry;
mod record;
mod scalar;
mod season;

pub use self::catalog::{Catalog, Category};
pub use self::entry::{CatalogEntry, Nested};
pub use self::record::{CategoryRecord, EMPTY_LIST, Record};
pub use self::scalar::{Coercion, Scalar};
pub use self::season::{EpisodeRecord, SeasonGroup};
