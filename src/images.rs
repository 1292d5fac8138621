pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "w780";

/// Builds image CDN URLs from the relative paths the catalog returns.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn poster(&self, path: Option<&str>) -> Option<String> {
        self.sized(path, POSTER_SIZE)
    }

    pub fn backdrop(&self, path: Option<&str>) -> Option<String> {
        self.sized(path, BACKDROP_SIZE)
    }

    pub fn sized(&self, path: Option<&str>, size: &str) -> Option<String> {
        let path = path.filter(|p| !p.is_empty())?;
        let path = path.trim_start_matches('/');
        Some(format!("{}/{size}/{path}", self.base))
    }
}
