/// Encoded form of an empty nested list.
pub const EMPTY_LIST: &str = "[]";

/// One normalized row: either a standalone item or an aggregated series.
///
/// The three blobs are self-contained JSON documents. A series record keeps
/// `servers` at [`EMPTY_LIST`] and `duration` empty; both live on episodes
/// inside the `seasons` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub sub_category: String,
    pub country: String,
    pub description: String,
    pub poster: String,
    pub thumbnail: String,
    pub rating: String,
    pub duration: String,
    pub year: String,
    pub main_category: String,
    pub servers: String,
    pub seasons: String,
    pub related: String,
}
impl Default for Record {
    fn default() -> Self {
        Self {
            title: String::new(),
            sub_category: String::new(),
            country: String::new(),
            description: String::new(),
            poster: String::new(),
            thumbnail: String::new(),
            rating: "0".to_string(),
            duration: String::new(),
            year: "0".to_string(),
            main_category: String::new(),
            servers: EMPTY_LIST.to_string(),
            seasons: EMPTY_LIST.to_string(),
            related: EMPTY_LIST.to_string(),
        }
    }
}
impl Record {
    /// Number of stored columns, excluding the surrogate id.
    pub const COLUMNS: usize = 13;

    /// Column values in storage order.
    pub fn columns(&self) -> [&str; Self::COLUMNS] {
        [
            &self.title,
            &self.sub_category,
            &self.country,
            &self.description,
            &self.poster,
            &self.thumbnail,
            &self.rating,
            &self.duration,
            &self.year,
            &self.main_category,
            &self.servers,
            &self.seasons,
            &self.related,
        ]
    }
}

/// A category row, kept alongside the records for category browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub main_category: String,
    /// Encoded list of sub-category names.
    pub sub_categories: String,
}
