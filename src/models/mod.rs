mod article;

pub use article::{article_from_row, Article, NewArticle};
