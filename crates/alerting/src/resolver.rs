//! Threshold scope resolution.
//!
//! Order is deterministic: server-specific thresholds, then global ones,
//! then each directly containing group's thresholds in group id order.
//! Duplicates are dropped by threshold id, keeping the first occurrence.

use std::collections::HashSet;

use servwatch_core::types::DbId;
use servwatch_db::models::threshold::AlertThreshold;

use crate::error::StoreError;
use crate::store::AlertStore;

/// Thresholds applicable to `server_id`.
///
/// A failing direct lookup is returned as an error. A failing group lookup
/// is logged and resolution continues with what it has, so direct and
/// global thresholds still apply.
pub async fn resolve_applicable(
    store: &dyn AlertStore,
    server_id: DbId,
) -> Result<Vec<AlertThreshold>, StoreError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for threshold in store.direct_thresholds(server_id).await? {
        if seen.insert(threshold.id) {
            resolved.push(threshold);
        }
    }

    let group_ids = match store.group_ids_for_server(server_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(
                server_id,
                error = %e,
                "Group membership lookup failed, using direct and global thresholds only"
            );
            return Ok(resolved);
        }
    };

    for group_id in group_ids {
        match store.group_thresholds(group_id).await {
            Ok(rows) => {
                for threshold in rows {
                    if seen.insert(threshold.id) {
                        resolved.push(threshold);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    server_id,
                    group_id,
                    error = %e,
                    "Group threshold lookup failed, skipping group"
                );
            }
        }
    }

    Ok(resolved)
}
