use url::Url;

use crate::error::{AppError, Result};

use super::contract::{items, BASE_URI, CONTENT_AUTHORITY};

/// The resources the content router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `content://com.example.xyzreader/items`
    Items,
    /// `content://com.example.xyzreader/items/<_id>`
    ItemsId(i64),
}

impl Route {
    /// Resolve an address. A non-numeric id segment is a format error, not a
    /// miss.
    pub fn match_uri(uri: &str) -> Result<Self> {
        let parsed = Url::parse(uri).map_err(|_| AppError::UnknownUri(uri.to_string()))?;
        if parsed.scheme() != "content" || parsed.host_str() != Some(CONTENT_AUTHORITY) {
            return Err(AppError::UnknownUri(uri.to_string()));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [path] if *path == items::PATH => Ok(Route::Items),
            [path, id] if *path == items::PATH => id
                .parse::<i64>()
                .map(Route::ItemsId)
                .map_err(|source| AppError::InvalidItemId {
                    segment: id.to_string(),
                    source,
                }),
            _ => Err(AppError::UnknownUri(uri.to_string())),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            Route::Items => build_dir_uri(),
            Route::ItemsId(id) => build_item_uri(*id),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Route::Items => items::CONTENT_TYPE,
            Route::ItemsId(_) => items::CONTENT_ITEM_TYPE,
        }
    }

    pub fn default_sort(&self) -> Option<&'static str> {
        match self {
            Route::Items => Some(items::DEFAULT_SORT),
            Route::ItemsId(_) => None,
        }
    }
}

/// Matches `/items/`.
pub fn build_dir_uri() -> String {
    format!("{}/{}", BASE_URI, items::PATH)
}

/// Matches `/items/<_id>/`.
pub fn build_item_uri(id: i64) -> String {
    format!("{}/{}/{}", BASE_URI, items::PATH, id)
}

/// Read the item id out of an item address.
pub fn item_id(uri: &str) -> Result<i64> {
    match Route::match_uri(uri)? {
        Route::ItemsId(id) => Ok(id),
        Route::Items => Err(AppError::UnknownUri(uri.to_string())),
    }
}
