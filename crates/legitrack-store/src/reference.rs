//! Reference tables: situations, tracking types, themes.

use std::collections::HashMap;

use duckdb::params;
use legitrack_core::{ReferenceItem, ReferenceKind};

use crate::{DuckStore, StoreError};

/// Rows to write to one reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceChanges {
    pub inserts: Vec<ReferenceItem>,
    pub updates: Vec<ReferenceItem>,
}

impl ReferenceChanges {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

impl DuckStore {
    /// All rows of a reference table, keyed by id.
    pub fn reference_map(&self, kind: ReferenceKind) -> Result<HashMap<i64, String>, StoreError> {
        Ok(self
            .list_references(kind)?
            .into_iter()
            .map(|item| (item.id, item.description))
            .collect())
    }

    /// All rows of a reference table, ordered by id.
    pub fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, StoreError> {
        let sql = format!(
            "SELECT {id}, {ds} FROM {table} ORDER BY {id}",
            id = kind.id_column(),
            ds = kind.description_column(),
            table = kind.table(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ReferenceItem {
                id: row.get(0)?,
                description: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Write inserts and updates for one table in a single transaction.
    /// Nothing is written if any statement fails.
    pub fn apply_reference_changes(
        &mut self,
        kind: ReferenceKind,
        changes: &ReferenceChanges,
    ) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let insert_sql = format!(
            "INSERT INTO {table} ({id}, {ds}) VALUES (?, ?)",
            table = kind.table(),
            id = kind.id_column(),
            ds = kind.description_column(),
        );
        let update_sql = format!(
            "UPDATE {table} SET {ds} = ? WHERE {id} = ?",
            table = kind.table(),
            id = kind.id_column(),
            ds = kind.description_column(),
        );

        let tx = self.conn.transaction()?;
        for item in &changes.inserts {
            tx.execute(&insert_sql, params![item.id, item.description])?;
        }
        for item in &changes.updates {
            tx.execute(&update_sql, params![item.description, item.id])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, description: &str) -> ReferenceItem {
        ReferenceItem {
            id,
            description: description.into(),
        }
    }

    #[test]
    fn insert_then_read_back() {
        let mut store = DuckStore::open().unwrap();
        let changes = ReferenceChanges {
            inserts: vec![item(40, "Educação"), item(34, "Administração Pública")],
            updates: vec![],
        };
        store
            .apply_reference_changes(ReferenceKind::Theme, &changes)
            .unwrap();

        let themes = store.list_references(ReferenceKind::Theme).unwrap();
        assert_eq!(themes, vec![item(34, "Administração Pública"), item(40, "Educação")]);
        assert!(store.list_references(ReferenceKind::Situation).unwrap().is_empty());
    }

    #[test]
    fn update_changes_description() {
        let mut store = DuckStore::open().unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::Situation,
                &ReferenceChanges {
                    inserts: vec![item(1140, "Arquivada")],
                    updates: vec![],
                },
            )
            .unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::Situation,
                &ReferenceChanges {
                    inserts: vec![],
                    updates: vec![item(1140, "Arquivada definitivamente")],
                },
            )
            .unwrap();

        let map = store.reference_map(ReferenceKind::Situation).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1140], "Arquivada definitivamente");
    }

    #[test]
    fn failed_batch_rolls_back() {
        let mut store = DuckStore::open().unwrap();
        // Duplicate primary key in the same batch.
        let changes = ReferenceChanges {
            inserts: vec![item(1, "Recebimento"), item(1, "Recebimento (dup)")],
            updates: vec![],
        };
        let result = store.apply_reference_changes(ReferenceKind::TrackingType, &changes);
        assert!(result.is_err());
        assert!(
            store
                .list_references(ReferenceKind::TrackingType)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn empty_changes_are_noop() {
        let mut store = DuckStore::open().unwrap();
        store
            .apply_reference_changes(ReferenceKind::Theme, &ReferenceChanges::default())
            .unwrap();
        assert!(store.reference_map(ReferenceKind::Theme).unwrap().is_empty());
    }
}
