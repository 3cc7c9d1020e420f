//! Merging retrieved primary keys into the working dataset

use crate::error::{LoadError, LoadResult};
use fk_core::Dataset;
use fk_sql::RetrieveQuery;

/// Left-join the rows of `retrieved` onto `working` by the retrieve
/// query's dataset columns, adding its key column.
///
/// Fails when the join adds rows and `allow_duplication` is off, or when
/// any row is left without a key.
pub fn merge_keys(
    working: &Dataset,
    retrieved: Dataset,
    query: &RetrieveQuery,
    allow_duplication: bool,
) -> LoadResult<Dataset> {
    let retrieved = retrieved.coerce_like(working);
    let before = working.row_count();
    let merged = working.left_join(&retrieved, &query.dataset_columns)?;
    let after = merged.row_count();

    if after > before {
        if !allow_duplication {
            return Err(LoadError::Duplication {
                table: query.table.to_string(),
                before,
                after,
            });
        }
        log::warn!(
            "Merging ids of '{}' duplicated rows: {before} -> {after}",
            query.table
        );
    }

    let missing = merged
        .column_values(&query.key_alias)?
        .into_iter()
        .filter(|v| v.is_null())
        .count();
    if missing > 0 {
        return Err(LoadError::MissingKeys {
            table: query.table.to_string(),
            alias: query.key_alias.clone(),
            rows: missing,
        });
    }

    log::debug!(
        "Merged '{}' into {} rows of the working dataset",
        query.key_alias,
        merged.row_count()
    );
    Ok(merged)
}
