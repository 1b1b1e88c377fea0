//! Bills, their tracking history, and bill/theme links.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use duckdb::{Connection, params};
use legitrack_core::{
    BillDetail, BillRecord, BillStatus, BillSummary, ReferenceItem, TrackingEntry, TrackingRow,
};
use tracing::debug;

use crate::duck::optional;
use crate::{DuckStore, StoreError};

/// Everything the worker learned about one bill in a cycle.
#[derive(Debug, Clone)]
pub struct BillSync {
    pub record: BillRecord,
    /// Replaces the stored status when present; otherwise the stored status is kept.
    pub status: Option<BillStatus>,
    pub tracking: Vec<TrackingEntry>,
    pub themes: Vec<i64>,
}

/// What [`DuckStore::write_bill`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillWriteOutcome {
    /// The bill did not exist before.
    pub created: bool,
    pub tracking_added: usize,
    pub themes_linked: usize,
    /// Theme ids that have no row in `camara.tp_temas`; not linked.
    pub unknown_themes: Vec<i64>,
}

/// Filter and page for [`DuckStore::list_bills`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillFilter {
    /// Match bills linked to any of these themes. Empty matches every bill.
    pub themes: Vec<i64>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl Default for BillFilter {
    fn default() -> Self {
        Self {
            themes: Vec::new(),
            page: 1,
            per_page: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillPage {
    /// Matching bills across all pages.
    pub total: usize,
    pub bills: Vec<BillSummary>,
}

impl DuckStore {
    /// Upsert a bill and append whatever history and theme links are new, in
    /// one transaction. Tracking entries whose sequence is already stored are
    /// left alone; history is never rewritten.
    pub fn write_bill(&mut self, sync: &BillSync) -> Result<BillWriteOutcome, StoreError> {
        let id = sync.record.id;
        let tx = self.conn.transaction()?;
        let mut outcome = BillWriteOutcome::default();

        let exists: i64 = tx.query_row(
            "SELECT count(*) FROM camara.tb_projeto WHERE id_projeto = ?",
            params![id],
            |row| row.get(0),
        )?;
        outcome.created = exists == 0;

        upsert_bill(&tx, &sync.record, sync.status.as_ref(), outcome.created)?;

        let mut sequences = stored_sequences(&tx, id)?;
        for entry in &sync.tracking {
            if !sequences.insert(entry.sequence) {
                continue;
            }
            tx.execute(
                "INSERT INTO camara.rl_tramitacoes \
                 (id_projeto, sequencia, data_hora, sigla_orgao, despacho, id_situacao, id_tramitacao) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    entry.sequence,
                    entry.at,
                    entry.organ,
                    entry.dispatch,
                    entry.situation_id,
                    entry.tracking_type_id
                ],
            )?;
            outcome.tracking_added += 1;
        }

        let mut linked = linked_themes(&tx, id)?;
        for &theme in &sync.themes {
            if linked.contains(&theme) {
                continue;
            }
            let known: i64 = tx.query_row(
                "SELECT count(*) FROM camara.tp_temas WHERE id_tema = ?",
                params![theme],
                |row| row.get(0),
            )?;
            if known == 0 {
                if !outcome.unknown_themes.contains(&theme) {
                    outcome.unknown_themes.push(theme);
                }
                continue;
            }
            tx.execute(
                "INSERT INTO camara.rl_temas (id_projeto, id_tema) VALUES (?, ?)",
                params![id, theme],
            )?;
            linked.insert(theme);
            outcome.themes_linked += 1;
        }

        tx.commit()?;
        debug!(
            bill = id,
            created = outcome.created,
            tracking_added = outcome.tracking_added,
            themes_linked = outcome.themes_linked,
            "bill written"
        );
        Ok(outcome)
    }

    pub fn bill_exists(&self, id: i64) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM camara.tb_projeto WHERE id_projeto = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Bills matching the filter, most recently moved first.
    pub fn list_bills(&self, filter: &BillFilter) -> Result<BillPage, StoreError> {
        let where_clause = if filter.themes.is_empty() {
            "TRUE".to_string()
        } else {
            let ids: Vec<String> = filter.themes.iter().map(i64::to_string).collect();
            format!(
                "p.id_projeto IN (SELECT id_projeto FROM camara.rl_temas WHERE id_tema IN ({}))",
                ids.join(", ")
            )
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT count(*) FROM camara.tb_projeto p WHERE {where_clause}"),
            [],
            |row| row.get(0),
        )?;

        let per_page = filter.per_page.max(1);
        let offset = u64::from(filter.page.max(1) - 1) * u64::from(per_page);
        let sql = format!(
            "SELECT p.id_projeto, p.titulo_projeto, p.descricao, p.ano_inicio, p.data_hora, s.ds_situacao
             FROM camara.tb_projeto p
             LEFT JOIN camara.tp_situacao s ON s.id_situacao = p.id_ultima_situacao
             WHERE {where_clause}
             ORDER BY p.data_hora DESC NULLS LAST, p.id_projeto DESC
             LIMIT {per_page} OFFSET {offset}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(BillSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                label: row.get(2)?,
                start_year: row.get(3)?,
                status_at: row.get(4)?,
                situation: row.get(5)?,
            })
        })?;
        let bills = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(BillPage {
            total: total as usize,
            bills,
        })
    }

    /// Fetch a single bill with its status descriptions and themes.
    ///
    /// Returns [`StoreError::NoResults`] when the bill is unknown.
    pub fn get_bill(&self, id: i64) -> Result<BillDetail, StoreError> {
        let detail = optional(self.conn.query_row(
            "SELECT p.id_projeto, p.titulo_projeto, p.descricao, p.ano_inicio, p.data_hora,
                    p.sigla_orgao, p.despacho,
                    p.id_ultima_situacao, s.ds_situacao,
                    p.id_ultima_tramitacao, t.ds_tramitacao
             FROM camara.tb_projeto p
             LEFT JOIN camara.tp_situacao s ON s.id_situacao = p.id_ultima_situacao
             LEFT JOIN camara.tp_tramitacao t ON t.id_tramitacao = p.id_ultima_tramitacao
             WHERE p.id_projeto = ?",
            params![id],
            |row| {
                Ok(BillDetail {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    label: row.get(2)?,
                    start_year: row.get(3)?,
                    status_at: row.get(4)?,
                    organ: row.get(5)?,
                    dispatch: row.get(6)?,
                    situation_id: row.get(7)?,
                    situation: row.get(8)?,
                    tracking_type_id: row.get(9)?,
                    tracking_type: row.get(10)?,
                    themes: Vec::new(),
                })
            },
        ))?;

        let mut detail = detail.ok_or(StoreError::NoResults)?;
        detail.themes = self.bill_themes(id)?;
        Ok(detail)
    }

    /// Themes linked to a bill, ordered by theme id.
    pub fn bill_themes(&self, id: i64) -> Result<Vec<ReferenceItem>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id_tema, t.ds_tema
             FROM camara.rl_temas r
             JOIN camara.tp_temas t ON t.id_tema = r.id_tema
             WHERE r.id_projeto = ?
             ORDER BY t.id_tema",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(ReferenceItem {
                id: row.get(0)?,
                description: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Stored tracking history of a bill, ordered by sequence.
    ///
    /// Returns [`StoreError::NoResults`] when the bill is unknown; a known
    /// bill without history yields an empty list.
    pub fn tracking_history(&self, id: i64) -> Result<Vec<TrackingRow>, StoreError> {
        if !self.bill_exists(id)? {
            return Err(StoreError::NoResults);
        }
        let mut stmt = self.conn.prepare(
            "SELECT r.sequencia, r.data_hora, r.id_situacao, s.ds_situacao,
                    r.id_tramitacao, t.ds_tramitacao
             FROM camara.rl_tramitacoes r
             LEFT JOIN camara.tp_situacao s ON s.id_situacao = r.id_situacao
             LEFT JOIN camara.tp_tramitacao t ON t.id_tramitacao = r.id_tramitacao
             WHERE r.id_projeto = ?
             ORDER BY r.sequencia",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(TrackingRow {
                sequence: row.get(0)?,
                at: row.get::<_, NaiveDateTime>(1)?,
                situation_id: row.get(2)?,
                situation: row.get(3)?,
                tracking_type_id: row.get(4)?,
                tracking_type: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn upsert_bill(
    conn: &Connection,
    record: &BillRecord,
    status: Option<&BillStatus>,
    create: bool,
) -> Result<(), StoreError> {
    match (create, status) {
        (true, Some(s)) => conn.execute(
            "INSERT INTO camara.tb_projeto
             (id_projeto, titulo_projeto, descricao, ano_inicio,
              data_hora, sigla_orgao, despacho, id_ultima_situacao, id_ultima_tramitacao)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.title,
                record.label,
                record.start_year,
                s.at,
                s.organ,
                s.dispatch,
                s.situation_id,
                s.tracking_type_id
            ],
        )?,
        (true, None) => conn.execute(
            "INSERT INTO camara.tb_projeto (id_projeto, titulo_projeto, descricao, ano_inicio)
             VALUES (?, ?, ?, ?)",
            params![record.id, record.title, record.label, record.start_year],
        )?,
        (false, Some(s)) => conn.execute(
            "UPDATE camara.tb_projeto
             SET titulo_projeto = ?, descricao = ?, ano_inicio = ?,
                 data_hora = ?, sigla_orgao = ?, despacho = ?,
                 id_ultima_situacao = ?, id_ultima_tramitacao = ?
             WHERE id_projeto = ?",
            params![
                record.title,
                record.label,
                record.start_year,
                s.at,
                s.organ,
                s.dispatch,
                s.situation_id,
                s.tracking_type_id,
                record.id
            ],
        )?,
        (false, None) => conn.execute(
            "UPDATE camara.tb_projeto
             SET titulo_projeto = ?, descricao = ?, ano_inicio = ?
             WHERE id_projeto = ?",
            params![record.title, record.label, record.start_year, record.id],
        )?,
    };
    Ok(())
}

fn stored_sequences(conn: &Connection, id: i64) -> Result<HashSet<i64>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT sequencia FROM camara.rl_tramitacoes WHERE id_projeto = ?")?;
    let rows = stmt.query_map(params![id], |row| row.get(0))?;
    Ok(rows.collect::<Result<HashSet<i64>, _>>()?)
}

fn linked_themes(conn: &Connection, id: i64) -> Result<HashSet<i64>, StoreError> {
    let mut stmt = conn.prepare("SELECT id_tema FROM camara.rl_temas WHERE id_projeto = ?")?;
    let rows = stmt.query_map(params![id], |row| row.get(0))?;
    Ok(rows.collect::<Result<HashSet<i64>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceChanges;
    use chrono::NaiveDate;
    use legitrack_core::ReferenceKind;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn seeded() -> DuckStore {
        let mut store = DuckStore::open().unwrap();
        let refs = |items: &[(i64, &str)]| ReferenceChanges {
            inserts: items
                .iter()
                .map(|&(id, ds)| ReferenceItem {
                    id,
                    description: ds.into(),
                })
                .collect(),
            updates: vec![],
        };
        store
            .apply_reference_changes(
                ReferenceKind::Situation,
                &refs(&[(1120, "Aguardando Parecer"), (1140, "Arquivada")]),
            )
            .unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::TrackingType,
                &refs(&[(100, "Apresentação"), (500, "Recebimento")]),
            )
            .unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::Theme,
                &refs(&[(40, "Educação"), (42, "Direitos Humanos"), (46, "Saúde")]),
            )
            .unwrap();
        store
    }

    fn record(id: i64, label: &str) -> BillRecord {
        BillRecord {
            id,
            title: Some(format!("Ementa {id}")),
            label: label.into(),
            start_year: Some(2024),
        }
    }

    fn entry(sequence: i64, day: u32, situation: Option<i64>, kind: i64) -> TrackingEntry {
        TrackingEntry {
            sequence,
            at: at(day, 10),
            organ: Some("PLEN".into()),
            dispatch: None,
            situation_id: situation,
            tracking_type_id: Some(kind),
        }
    }

    fn bill(id: i64, day: u32, themes: Vec<i64>) -> BillSync {
        BillSync {
            record: record(id, &format!("PL {id}/2024")),
            status: Some(BillStatus {
                at: at(day, 12),
                organ: Some("CCJC".into()),
                dispatch: Some("Despacho".into()),
                situation_id: Some(1120),
                tracking_type_id: Some(500),
            }),
            tracking: vec![entry(1, day, None, 100), entry(2, day, Some(1120), 500)],
            themes,
        }
    }

    #[test]
    fn write_new_bill() {
        let mut store = seeded();
        let outcome = store.write_bill(&bill(10, 1, vec![40, 42])).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.tracking_added, 2);
        assert_eq!(outcome.themes_linked, 2);
        assert!(outcome.unknown_themes.is_empty());

        let detail = store.get_bill(10).unwrap();
        assert_eq!(detail.label.as_deref(), Some("PL 10/2024"));
        assert_eq!(detail.situation.as_deref(), Some("Aguardando Parecer"));
        assert_eq!(detail.tracking_type.as_deref(), Some("Recebimento"));
        assert_eq!(detail.organ.as_deref(), Some("CCJC"));
        assert_eq!(detail.status_at, Some(at(1, 12)));
        let theme_ids: Vec<i64> = detail.themes.iter().map(|t| t.id).collect();
        assert_eq!(theme_ids, vec![40, 42]);
    }

    #[test]
    fn rewrite_only_appends_new_history() {
        let mut store = seeded();
        store.write_bill(&bill(10, 1, vec![40])).unwrap();

        let mut again = bill(10, 2, vec![40, 46]);
        again.record.title = Some("Ementa revisada".into());
        again.tracking.push(entry(3, 2, Some(1140), 500));
        let outcome = store.write_bill(&again).unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.tracking_added, 1);
        assert_eq!(outcome.themes_linked, 1);
        assert_eq!(store.tracking_count().unwrap(), 3);
        assert_eq!(store.bill_count().unwrap(), 1);
        assert_eq!(
            store.get_bill(10).unwrap().title.as_deref(),
            Some("Ementa revisada")
        );
    }

    #[test]
    fn stored_history_is_not_rewritten() {
        let mut store = seeded();
        store.write_bill(&bill(10, 1, vec![])).unwrap();

        let mut changed = bill(10, 1, vec![]);
        changed.tracking = vec![entry(1, 9, Some(1140), 500)];
        store.write_bill(&changed).unwrap();

        let history = store.tracking_history(10).unwrap();
        assert_eq!(history[0].at, at(1, 10));
        assert_eq!(history[0].situation_id, None);
    }

    #[test]
    fn duplicate_sequences_in_payload_inserted_once() {
        let mut store = seeded();
        let mut sync = bill(11, 1, vec![]);
        sync.tracking.push(entry(2, 3, None, 100));
        let outcome = store.write_bill(&sync).unwrap();
        assert_eq!(outcome.tracking_added, 2);
    }

    #[test]
    fn unknown_themes_reported_not_linked() {
        let mut store = seeded();
        let outcome = store.write_bill(&bill(12, 1, vec![40, 999, 999])).unwrap();
        assert_eq!(outcome.themes_linked, 1);
        assert_eq!(outcome.unknown_themes, vec![999]);
        assert_eq!(store.bill_themes(12).unwrap().len(), 1);
    }

    #[test]
    fn missing_status_keeps_stored_status() {
        let mut store = seeded();
        store.write_bill(&bill(13, 1, vec![])).unwrap();

        let mut listing_only = bill(13, 1, vec![]);
        listing_only.status = None;
        listing_only.tracking.clear();
        store.write_bill(&listing_only).unwrap();

        let detail = store.get_bill(13).unwrap();
        assert_eq!(detail.organ.as_deref(), Some("CCJC"));
        assert_eq!(detail.situation_id, Some(1120));
    }

    #[test]
    fn new_bill_without_status() {
        let mut store = seeded();
        let mut sync = bill(14, 1, vec![]);
        sync.status = None;
        store.write_bill(&sync).unwrap();
        let detail = store.get_bill(14).unwrap();
        assert_eq!(detail.status_at, None);
        assert_eq!(detail.situation, None);
    }

    #[test]
    fn get_unknown_bill() {
        let store = seeded();
        assert!(matches!(store.get_bill(404), Err(StoreError::NoResults)));
        assert!(matches!(
            store.tracking_history(404),
            Err(StoreError::NoResults)
        ));
    }

    #[test]
    fn history_joined_with_descriptions() {
        let mut store = seeded();
        store.write_bill(&bill(15, 1, vec![])).unwrap();
        let history = store.tracking_history(15).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 1);
        assert_eq!(history[0].situation, None);
        assert_eq!(history[0].tracking_type.as_deref(), Some("Apresentação"));
        assert_eq!(history[1].situation.as_deref(), Some("Aguardando Parecer"));
    }

    #[test]
    fn list_filters_by_any_theme() {
        let mut store = seeded();
        store.write_bill(&bill(1, 1, vec![40])).unwrap();
        store.write_bill(&bill(2, 2, vec![42])).unwrap();
        store.write_bill(&bill(3, 3, vec![40, 42])).unwrap();
        store.write_bill(&bill(4, 4, vec![46])).unwrap();

        let page = store
            .list_bills(&BillFilter {
                themes: vec![40, 42],
                ..BillFilter::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<i64> = page.bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let all = store.list_bills(&BillFilter::default()).unwrap();
        assert_eq!(all.total, 4);
    }

    #[test]
    fn list_paginates_and_orders_undated_last() {
        let mut store = seeded();
        for id in 1..=5 {
            store.write_bill(&bill(id, id as u32, vec![])).unwrap();
        }
        let mut undated = bill(6, 1, vec![]);
        undated.status = None;
        store.write_bill(&undated).unwrap();

        let first = store
            .list_bills(&BillFilter {
                themes: vec![],
                page: 1,
                per_page: 4,
            })
            .unwrap();
        assert_eq!(first.total, 6);
        let ids: Vec<i64> = first.bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2]);

        let second = store
            .list_bills(&BillFilter {
                themes: vec![],
                page: 2,
                per_page: 4,
            })
            .unwrap();
        let ids: Vec<i64> = second.bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 6]);
        assert_eq!(second.bills[1].status_at, None);

        let beyond = store
            .list_bills(&BillFilter {
                themes: vec![],
                page: 9,
                per_page: 4,
            })
            .unwrap();
        assert_eq!(beyond.total, 6);
        assert!(beyond.bills.is_empty());
    }

    #[test]
    fn list_with_unmatched_theme_is_empty() {
        let mut store = seeded();
        store.write_bill(&bill(1, 1, vec![40])).unwrap();
        let page = store
            .list_bills(&BillFilter {
                themes: vec![46],
                ..BillFilter::default()
            })
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.bills.is_empty());
    }
}
