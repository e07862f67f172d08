//! Names shared by the schema, the content router and its callers.

pub const CONTENT_AUTHORITY: &str = "com.example.xyzreader";
pub const BASE_URI: &str = "content://com.example.xyzreader";

pub mod tables {
    pub const ITEMS: &str = "items";
}

pub mod items {
    /// INTEGER PRIMARY KEY AUTOINCREMENT
    pub const ID: &str = "_id";
    /// TEXT
    pub const SERVER_ID: &str = "server_id";
    /// TEXT NOT NULL
    pub const TITLE: &str = "title";
    /// TEXT NOT NULL
    pub const AUTHOR: &str = "author";
    /// TEXT NOT NULL
    pub const BODY: &str = "body";
    /// TEXT NOT NULL
    pub const THUMB_URL: &str = "thumb_url";
    /// TEXT NOT NULL
    pub const PHOTO_URL: &str = "photo_url";
    /// REAL NOT NULL DEFAULT 1.5
    pub const ASPECT_RATIO: &str = "aspect_ratio";
    /// INTEGER NOT NULL DEFAULT 0
    pub const PUBLISHED_DATE: &str = "published_date";

    pub const PATH: &str = "items";
    pub const DEFAULT_SORT: &str = "published_date DESC";
    pub const DEFAULT_ASPECT_RATIO: f64 = 1.5;

    pub const CONTENT_TYPE: &str = "vnd.android.cursor.dir/vnd.com.example.xyzreader.items";
    pub const CONTENT_ITEM_TYPE: &str = "vnd.android.cursor.item/vnd.com.example.xyzreader.items";

    /// Column order expected by `article_from_row`.
    pub const PROJECTION: [&str; 9] = [
        ID,
        SERVER_ID,
        TITLE,
        AUTHOR,
        BODY,
        THUMB_URL,
        PHOTO_URL,
        ASPECT_RATIO,
        PUBLISHED_DATE,
    ];
}
