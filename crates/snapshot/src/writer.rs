//! Bulk insertion into a freshly created store.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use marquee_catalog::RecordSet;
use tracing::instrument;

/// Insert every record, category and metadata pair in one transaction.
///
/// Records are inserted in the order given, so surrogate ids follow the
/// record set's order.
#[instrument(level = "debug", skip_all, fields(records = set.records.len(), categories = set.categories.len()))]
pub(crate) async fn insert_all(db: &Database, set: &RecordSet, metadata: &[(&str, &str)]) -> Result<()> {
    let mut tx = db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
    for record in &set.records {
        let mut query = sqlx::query(include_str!("../queries/insert_entry.sql"));
        for column in record.columns() {
            query = query.bind(column);
        }
        query.execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
    }
    for category in &set.categories {
        sqlx::query(include_str!("../queries/insert_category.sql"))
            .bind(category.main_category.as_str())
            .bind(category.sub_categories.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    for (key, value) in metadata {
        sqlx::query(include_str!("../queries/insert_metadata.sql"))
            .bind(*key)
            .bind(*value)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    tx.commit().await.or_raise(|| ErrorKind::Database)?;
    Ok(())
}
