use std::fmt;

/// Keys under which the content repository caches serialized views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey<'a> {
    /// One page of the public feed: `list:page:{page}:limit:{limit}`.
    PostList { page: u32, limit: u32 },
    /// A single post by slug: `slug:{slug}`.
    PostBySlug(&'a str),
}

impl CacheKey<'_> {
    /// Shared by every feed page, so one prefix sweep drops them all.
    pub const LIST_PREFIX: &'static str = "list:";
    pub const SLUG_PREFIX: &'static str = "slug:";

    pub fn kind(&self) -> &'static str {
        match self {
            CacheKey::PostList { .. } => "list",
            CacheKey::PostBySlug(_) => "post",
        }
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::PostList { page, limit } => {
                write!(f, "{}page:{page}:limit:{limit}", Self::LIST_PREFIX)
            }
            CacheKey::PostBySlug(slug) => write!(f, "{}{slug}", Self::SLUG_PREFIX),
        }
    }
}
