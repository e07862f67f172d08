use std::path::PathBuf;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};
use tokio::sync::{broadcast, OnceCell};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{article_from_row, Article};

use super::contract::{items, tables};
use super::schema::{self, DATABASE_VERSION};
use super::selection::SelectionBuilder;
use super::uri::Route;
use super::values::ContentValues;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// One step of [`ItemsProvider::apply_batch`].
#[derive(Debug, Clone)]
pub enum Operation {
    Insert {
        uri: String,
        values: ContentValues,
    },
    Update {
        uri: String,
        values: ContentValues,
        selection: Option<String>,
        selection_args: Vec<Value>,
    },
    Delete {
        uri: String,
        selection: Option<String>,
        selection_args: Vec<Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Address of the inserted row.
    Uri(String),
    /// Rows touched by an update or delete.
    Count(usize),
}

enum PreparedOperation {
    Insert(ContentValues),
    Update(SelectionBuilder, ContentValues),
    Delete(SelectionBuilder),
}

/// Routes content addresses to operations on the items table.
///
/// The database is opened on first use and shared by every call after that.
/// Writers broadcast the collection address to subscribers once they commit.
pub struct ItemsProvider {
    db_path: PathBuf,
    conn: OnceCell<Connection>,
    changes: broadcast::Sender<String>,
}

impl ItemsProvider {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db_path: db_path.into(),
            conn: OnceCell::new(),
            changes,
        }
    }

    async fn db(&self) -> Result<&Connection> {
        self.conn
            .get_or_try_init(|| async {
                tracing::debug!("Opening database at {}", self.db_path.display());
                let conn = Connection::open(&self.db_path).await?;
                conn.call(|conn| Ok(schema::open_helper(conn, DATABASE_VERSION)))
                    .await??;
                Ok::<_, AppError>(conn)
            })
            .await
    }

    /// Receive the collection address after every committed write.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn notify_change(&self) {
        // No receivers is fine; nobody is watching.
        let _ = self.changes.send(Route::Items.uri());
    }

    pub fn get_type(&self, uri: &str) -> Result<&'static str> {
        Ok(Route::match_uri(uri)?.content_type())
    }

    /// Builder preconfigured for `route`. Every operation goes through here.
    fn build_selection(route: Route) -> Result<SelectionBuilder> {
        let mut builder = SelectionBuilder::new();
        match route {
            Route::Items => {
                builder.table(tables::ITEMS);
            }
            Route::ItemsId(id) => {
                builder
                    .table(tables::ITEMS)
                    .and_where(&format!("{} = ?", items::ID), [id])?;
            }
        }
        Ok(builder)
    }

    fn selection_for(
        uri: &str,
        selection: Option<&str>,
        selection_args: Vec<Value>,
    ) -> Result<(Route, SelectionBuilder)> {
        let route = Route::match_uri(uri)?;
        let mut builder = Self::build_selection(route)?;
        builder.and_where(selection.unwrap_or_default(), selection_args)?;
        Ok((route, builder))
    }

    pub async fn query<T, F>(
        &self,
        uri: &str,
        projection: Option<Vec<String>>,
        selection: Option<&str>,
        selection_args: Vec<Value>,
        sort_order: Option<&str>,
        map_row: F,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        let (route, builder) = Self::selection_for(uri, selection, selection_args)?;
        let order_by = sort_order
            .filter(|s| !s.is_empty())
            .or(route.default_sort())
            .map(str::to_string);

        let rows = self
            .db()
            .await?
            .call(move |conn| {
                Ok(builder.query(conn, projection.as_deref(), order_by.as_deref(), map_row))
            })
            .await??;
        Ok(rows)
    }

    /// Articles at `uri` in the canonical projection and default order.
    pub async fn query_articles(&self, uri: &str) -> Result<Vec<Article>> {
        let projection = items::PROJECTION.iter().map(|c| c.to_string()).collect();
        self.query(uri, Some(projection), None, Vec::new(), None, article_from_row)
            .await
    }

    /// Insert one row at the collection address and return its item address.
    /// Existing rows are kept; use [`Self::bulk_insert`] to replace them.
    pub async fn insert(&self, uri: &str, values: ContentValues) -> Result<String> {
        Self::insert_route(uri)?;

        let id = self
            .db()
            .await?
            .call(move |conn| Ok(insert_values(conn, &values)))
            .await??;

        self.notify_change();
        Ok(Route::ItemsId(id).uri())
    }

    /// Replace every row of the collection with `rows` in one transaction.
    pub async fn bulk_insert(&self, uri: &str, rows: Vec<ContentValues>) -> Result<usize> {
        Self::insert_route(uri)?;

        let count = self
            .db()
            .await?
            .call(move |conn| Ok(replace_all(conn, &rows)))
            .await??;

        tracing::debug!("Replaced items with {} rows", count);
        self.notify_change();
        Ok(count)
    }

    pub async fn update(
        &self,
        uri: &str,
        values: ContentValues,
        selection: Option<&str>,
        selection_args: Vec<Value>,
    ) -> Result<usize> {
        let (_, builder) = Self::selection_for(uri, selection, selection_args)?;

        let count = self
            .db()
            .await?
            .call(move |conn| Ok(builder.update(conn, &values)))
            .await??;

        self.notify_change();
        Ok(count)
    }

    pub async fn delete(
        &self,
        uri: &str,
        selection: Option<&str>,
        selection_args: Vec<Value>,
    ) -> Result<usize> {
        let (_, builder) = Self::selection_for(uri, selection, selection_args)?;

        let count = self
            .db()
            .await?
            .call(move |conn| Ok(builder.delete(conn)))
            .await??;

        self.notify_change();
        Ok(count)
    }

    /// Run `operations` in order inside one transaction. Nothing is applied
    /// if any of them fails.
    pub async fn apply_batch(&self, operations: Vec<Operation>) -> Result<Vec<OperationResult>> {
        let prepared = operations
            .into_iter()
            .map(|operation| -> Result<PreparedOperation> {
                match operation {
                    Operation::Insert { uri, values } => {
                        Self::insert_route(&uri)?;
                        Ok(PreparedOperation::Insert(values))
                    }
                    Operation::Update {
                        uri,
                        values,
                        selection,
                        selection_args,
                    } => {
                        let (_, builder) =
                            Self::selection_for(&uri, selection.as_deref(), selection_args)?;
                        Ok(PreparedOperation::Update(builder, values))
                    }
                    Operation::Delete {
                        uri,
                        selection,
                        selection_args,
                    } => {
                        let (_, builder) =
                            Self::selection_for(&uri, selection.as_deref(), selection_args)?;
                        Ok(PreparedOperation::Delete(builder))
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let results = self
            .db()
            .await?
            .call(move |conn| Ok(apply_prepared(conn, &prepared)))
            .await??;

        self.notify_change();
        Ok(results)
    }

    fn insert_route(uri: &str) -> Result<()> {
        match Route::match_uri(uri)? {
            Route::Items => Ok(()),
            Route::ItemsId(_) => Err(AppError::UnknownUri(uri.to_string())),
        }
    }
}

fn insert_values(conn: &rusqlite::Connection, values: &ContentValues) -> Result<i64> {
    if values.is_empty() {
        return Err(AppError::InvalidArgument(
            "Empty values passed to insert".to_string(),
        ));
    }

    let columns = values.columns().collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        tables::ITEMS,
        columns,
        placeholders
    );

    conn.execute(&sql, params_from_iter(values.values()))?;
    Ok(conn.last_insert_rowid())
}

fn replace_all(conn: &mut rusqlite::Connection, rows: &[ContentValues]) -> Result<usize> {
    let tx = conn.transaction()?;
    ItemsProvider::build_selection(Route::Items)?.delete(&tx)?;
    for values in rows {
        insert_values(&tx, values)?;
    }
    tx.commit()?;
    Ok(rows.len())
}

fn apply_prepared(
    conn: &mut rusqlite::Connection,
    operations: &[PreparedOperation],
) -> Result<Vec<OperationResult>> {
    let tx = conn.transaction()?;
    let mut results = Vec::with_capacity(operations.len());
    for operation in operations {
        let result = match operation {
            PreparedOperation::Insert(values) => {
                OperationResult::Uri(Route::ItemsId(insert_values(&tx, values)?).uri())
            }
            PreparedOperation::Update(builder, values) => {
                OperationResult::Count(builder.update(&tx, values)?)
            }
            PreparedOperation::Delete(builder) => OperationResult::Count(builder.delete(&tx)?),
        };
        results.push(result);
    }
    tx.commit()?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{build_dir_uri, build_item_uri};
    use crate::models::NewArticle;

    fn article(title: &str, published_date: i64) -> NewArticle {
        NewArticle {
            server_id: None,
            title: title.to_string(),
            author: "B".to_string(),
            body: "C".to_string(),
            thumb_url: "t".to_string(),
            photo_url: "p".to_string(),
            aspect_ratio: None,
            published_date,
        }
    }

    fn memory_provider() -> ItemsProvider {
        ItemsProvider::new(":memory:")
    }

    async fn seed(provider: &ItemsProvider, rows: &[(&str, i64)]) {
        let rows = rows
            .iter()
            .map(|(title, date)| article(title, *date).to_values())
            .collect();
        provider.bulk_insert(&build_dir_uri(), rows).await.unwrap();
    }

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_collection_defaults_to_newest_first() {
        let provider = memory_provider();
        seed(&provider, &[("old", 100), ("newest", 300), ("middle", 200)]).await;

        let articles = provider.query_articles(&build_dir_uri()).await.unwrap();
        assert_eq!(titles(&articles), vec!["newest", "middle", "old"]);
    }

    #[tokio::test]
    async fn test_caller_sort_order_overrides_default() {
        let provider = memory_provider();
        seed(&provider, &[("b", 100), ("a", 300), ("c", 200)]).await;

        let rows = provider
            .query(
                &build_dir_uri(),
                Some(vec![items::TITLE.to_string()]),
                None,
                Vec::new(),
                Some("title ASC"),
                |row| row.get::<_, String>(0),
            )
            .await
            .unwrap();
        assert_eq!(rows, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_item_address_selects_one_row() {
        let provider = memory_provider();
        let uri = provider
            .insert(&build_dir_uri(), article("only", 5).to_values())
            .await
            .unwrap();
        provider
            .insert(&build_dir_uri(), article("other", 6).to_values())
            .await
            .unwrap();

        let articles = provider.query_articles(&uri).await.unwrap();
        assert_eq!(titles(&articles), vec!["only"]);
        assert_eq!(articles[0].aspect_ratio, items::DEFAULT_ASPECT_RATIO);
        assert_eq!(build_item_uri(articles[0].id), uri);

        let all = provider.query_articles(&build_dir_uri()).await.unwrap();
        assert_eq!(titles(&all), vec!["other", "only"]);
    }

    #[tokio::test]
    async fn test_query_combines_route_and_caller_selection() {
        let provider = memory_provider();
        seed(&provider, &[("a", 100), ("b", 200), ("c", 300)]).await;

        let rows = provider
            .query(
                &build_dir_uri(),
                None,
                Some("published_date >= ?"),
                vec![Value::Integer(200)],
                None,
                article_from_row,
            )
            .await
            .unwrap();
        assert_eq!(titles(&rows), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_non_numeric_item_is_format_error() {
        let provider = memory_provider();
        seed(&provider, &[("a", 100)]).await;

        let err = provider
            .query_articles("content://com.example.xyzreader/items/abc")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidItemId { .. }));
    }

    #[tokio::test]
    async fn test_args_without_selection_are_rejected() {
        let provider = memory_provider();

        let err = provider
            .delete(&build_dir_uri(), None, vec![Value::Integer(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_bulk_insert_replaces_rows() {
        let provider = memory_provider();
        seed(&provider, &[("a", 1), ("b", 2)]).await;
        seed(&provider, &[("c", 3)]).await;

        let articles = provider.query_articles(&build_dir_uri()).await.unwrap();
        assert_eq!(titles(&articles), vec!["c"]);
    }

    #[tokio::test]
    async fn test_bulk_insert_failure_keeps_previous_rows() {
        let provider = memory_provider();
        seed(&provider, &[("a", 1)]).await;

        let mut broken = ContentValues::new();
        broken.put(items::TITLE, "missing columns".to_string());
        let rows = vec![article("b", 2).to_values(), broken];

        assert!(provider.bulk_insert(&build_dir_uri(), rows).await.is_err());

        let articles = provider.query_articles(&build_dir_uri()).await.unwrap();
        assert_eq!(titles(&articles), vec!["a"]);
    }

    #[tokio::test]
    async fn test_insert_on_item_address_is_unknown() {
        let provider = memory_provider();

        let err = provider
            .insert(&build_item_uri(1), article("a", 1).to_values())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownUri(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_by_item_address() {
        let provider = memory_provider();
        let uri = provider
            .insert(&build_dir_uri(), article("draft", 1).to_values())
            .await
            .unwrap();
        provider
            .insert(&build_dir_uri(), article("keep", 2).to_values())
            .await
            .unwrap();

        let mut values = ContentValues::new();
        values.put(items::TITLE, "final".to_string());
        assert_eq!(provider.update(&uri, values, None, Vec::new()).await.unwrap(), 1);
        assert_eq!(
            titles(&provider.query_articles(&uri).await.unwrap()),
            vec!["final"]
        );

        assert_eq!(provider.delete(&uri, None, Vec::new()).await.unwrap(), 1);
        assert_eq!(
            titles(&provider.query_articles(&build_dir_uri()).await.unwrap()),
            vec!["keep"]
        );
    }

    #[tokio::test]
    async fn test_writes_notify_collection_address() {
        let provider = memory_provider();
        let mut changes = provider.subscribe();

        let uri = provider
            .insert(&build_dir_uri(), article("a", 1).to_values())
            .await
            .unwrap();
        assert_eq!(changes.recv().await.unwrap(), build_dir_uri());

        provider.delete(&uri, None, Vec::new()).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), build_dir_uri());
    }

    #[tokio::test]
    async fn test_apply_batch_runs_in_order() {
        let provider = memory_provider();
        let dir = build_dir_uri();

        let mut rename = ContentValues::new();
        rename.put(items::TITLE, "renamed".to_string());

        let results = provider
            .apply_batch(vec![
                Operation::Delete {
                    uri: dir.clone(),
                    selection: None,
                    selection_args: Vec::new(),
                },
                Operation::Insert {
                    uri: dir.clone(),
                    values: article("a", 1).to_values(),
                },
                Operation::Update {
                    uri: dir.clone(),
                    values: rename,
                    selection: Some("title = ?".to_string()),
                    selection_args: vec![Value::Text("a".to_string())],
                },
            ])
            .await
            .unwrap();

        assert_eq!(results[0], OperationResult::Count(0));
        assert!(matches!(&results[1], OperationResult::Uri(uri) if uri.starts_with(&dir)));
        assert_eq!(results[2], OperationResult::Count(1));

        let articles = provider.query_articles(&dir).await.unwrap();
        assert_eq!(titles(&articles), vec!["renamed"]);
    }

    #[tokio::test]
    async fn test_apply_batch_rolls_back_on_failure() {
        let provider = memory_provider();
        seed(&provider, &[("a", 1)]).await;
        let dir = build_dir_uri();

        let result = provider
            .apply_batch(vec![
                Operation::Delete {
                    uri: dir.clone(),
                    selection: None,
                    selection_args: Vec::new(),
                },
                Operation::Insert {
                    uri: dir.clone(),
                    values: ContentValues::new(),
                },
            ])
            .await;
        assert!(result.is_err());

        let articles = provider.query_articles(&dir).await.unwrap();
        assert_eq!(titles(&articles), vec!["a"]);
    }

    #[tokio::test]
    async fn test_get_type() {
        let provider = memory_provider();

        assert_eq!(
            provider.get_type(&build_dir_uri()).unwrap(),
            items::CONTENT_TYPE
        );
        assert_eq!(
            provider.get_type(&build_item_uri(3)).unwrap(),
            items::CONTENT_ITEM_TYPE
        );
    }

    #[tokio::test]
    async fn test_database_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DATABASE_NAME);

        {
            let provider = ItemsProvider::new(&path);
            seed(&provider, &[("persisted", 10)]).await;
        }

        let provider = ItemsProvider::new(&path);
        let articles = provider.query_articles(&build_dir_uri()).await.unwrap();
        assert_eq!(titles(&articles), vec!["persisted"]);
    }
}
