//! Terminal rendering for bills, themes and sync reports.
//!
//! Cards are grouped into sections; a section with nothing to show is
//! omitted entirely.

use legitrack_core::{BillDetail, ReferenceItem, TrackingRow, format_timestamp};
use legitrack_store::BillPage;
use legitrack_sync::CycleReport;

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print a bill as a vertical card followed by its latest tracking entries.
pub fn print_bill_card(bill: &BillDetail, tracking: &[TrackingRow]) {
    print!("{}", bill_card(bill, tracking));
}

pub fn print_bill_table(page: &BillPage, page_no: u32, per_page: u32) {
    print!("{}", bill_table(page, page_no, per_page));
}

pub fn print_themes(themes: &[ReferenceItem]) {
    println!("{} themes", themes.len());
    for theme in themes {
        println!("  {:>6}  {}", theme.id, theme.description);
    }
}

pub fn print_cycle_report(report: &CycleReport) {
    print!("{}", cycle_report(report));
}

// ── Formatting ──

fn bill_card(bill: &BillDetail, tracking: &[TrackingRow]) -> String {
    let mut out = String::new();
    let label = bill.label.as_deref().unwrap_or("-");
    out.push_str(&format!("=== {} ({}) ===\n", label, bill.id));
    if let Some(title) = bill.title.as_deref().filter(|t| !t.is_empty()) {
        out.push_str(title);
        out.push('\n');
    }
    out.push('\n');

    section(
        &mut out,
        "Identity",
        &[
            ("id", Some(bill.id.to_string())),
            ("descricao", bill.label.clone()),
            ("ano_inicio", bill.start_year.map(|y| y.to_string())),
        ],
    );
    section(
        &mut out,
        "Current Status",
        &[
            ("data_hora", bill.status_at.as_ref().map(format_timestamp)),
            ("sigla_orgao", bill.organ.clone()),
            ("situacao", described(bill.situation_id, &bill.situation)),
            ("tramitacao", described(bill.tracking_type_id, &bill.tracking_type)),
            ("despacho", bill.dispatch.clone()),
        ],
    );

    if !bill.themes.is_empty() {
        let names: Vec<&str> = bill.themes.iter().map(|t| t.description.as_str()).collect();
        out.push_str("Themes\n");
        out.push_str(&format!("  {:<26} {}\n\n", "temas", names.join(", ")));
    }

    if !tracking.is_empty() {
        out.push_str(&format!("Tracking ({}):\n", tracking.len()));
        let skip = tracking.len().saturating_sub(MAX_LIST_ITEMS);
        if skip > 0 {
            out.push_str(&format!("  ... {skip} earlier entries\n"));
        }
        for row in &tracking[skip..] {
            let what = row
                .tracking_type
                .as_deref()
                .or(row.situation.as_deref())
                .unwrap_or("-");
            out.push_str(&format!(
                "  {:>4}  {}  {}\n",
                row.sequence,
                format_timestamp(&row.at),
                what
            ));
        }
        out.push('\n');
    }
    out
}

fn bill_table(page: &BillPage, page_no: u32, per_page: u32) -> String {
    let mut out = format!(
        "page {page_no} ({per_page} per page), {} bills total\n",
        page.total
    );
    for bill in &page.bills {
        out.push_str(&format!(
            "  {:>8}  {:<16}  {:<19}  {}\n",
            bill.id,
            bill.label.as_deref().unwrap_or("-"),
            bill.status_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".into()),
            bill.situation.as_deref().unwrap_or("-"),
        ));
    }
    out
}

fn cycle_report(report: &CycleReport) -> String {
    let mut out = String::from("Reference tables\n");
    for (kind, stats) in &report.references {
        let line = match stats {
            Some(s) => format!(
                "inserted {}, updated {}, skipped {}",
                s.inserted, s.updated, s.skipped
            ),
            None => "failed".to_string(),
        };
        out.push_str(&format!("  {:<26} {}\n", kind.table(), line));
    }
    let b = &report.bills;
    out.push_str("\nBills\n");
    for (name, value) in [
        ("new", b.new),
        ("updated", b.updated),
        ("tracking_added", b.tracking_added),
        ("failed", b.failed),
        ("skipped", b.skipped),
    ] {
        out.push_str(&format!("  {:<26} {}\n", name, value));
    }
    out
}

fn section(out: &mut String, header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    out.push_str(header);
    out.push('\n');
    for (name, value) in rows {
        if let Some(value) = value {
            out.push_str(&format!("  {:<26} {}\n", name, value));
        }
    }
    out.push('\n');
}

/// `"Arquivada (1140)"`, or just the code when the description is unknown.
fn described(id: Option<i64>, description: &Option<String>) -> Option<String> {
    match (id, description) {
        (Some(id), Some(ds)) => Some(format!("{ds} ({id})")),
        (Some(id), None) => Some(id.to_string()),
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use legitrack_core::{BillSummary, ReferenceKind};
    use legitrack_sync::{BillStats, ReferenceStats};

    use super::*;

    fn ts(day: u32) -> TrackingRow {
        TrackingRow {
            sequence: i64::from(day),
            at: legitrack_core::parse_api_timestamp(&format!("2024-01-{day:02}T10:00")).unwrap(),
            situation_id: None,
            situation: None,
            tracking_type_id: Some(100),
            tracking_type: Some("Apresentação".into()),
        }
    }

    fn detail() -> BillDetail {
        BillDetail {
            id: 2401,
            title: Some("Dispõe sobre escolas.".into()),
            label: Some("PL 10/2024".into()),
            start_year: Some(2024),
            status_at: None,
            organ: None,
            dispatch: None,
            situation_id: Some(1140),
            situation: None,
            tracking_type_id: None,
            tracking_type: None,
            themes: vec![ReferenceItem {
                id: 40,
                description: "Educação".into(),
            }],
        }
    }

    #[test]
    fn card_sections() {
        let card = bill_card(&detail(), &[]);
        assert!(card.starts_with("=== PL 10/2024 (2401) ===\nDispõe sobre escolas.\n"));
        assert!(card.contains("Current Status\n"));
        assert!(card.contains(&format!("  {:<26} 1140\n", "situacao")));
        assert!(!card.contains("despacho"));
        assert!(card.contains("Educação"));
        assert!(!card.contains("Tracking"));
    }

    #[test]
    fn card_truncates_tracking() {
        let rows: Vec<TrackingRow> = (1..=12).map(ts).collect();
        let card = bill_card(&detail(), &rows);
        assert!(card.contains("Tracking (12):"));
        assert!(card.contains("... 2 earlier entries"));
        assert!(card.contains("2024-01-12T10:00:00"));
        assert!(!card.contains("2024-01-02T10:00:00"));
    }

    #[test]
    fn table_lines() {
        let page = BillPage {
            total: 31,
            bills: vec![BillSummary {
                id: 7,
                title: None,
                label: Some("PEC 3/2024".into()),
                start_year: Some(2024),
                status_at: None,
                situation: Some("Arquivada".into()),
            }],
        };
        let table = bill_table(&page, 2, 15);
        assert!(table.starts_with("page 2 (15 per page), 31 bills total\n"));
        assert!(table.contains("PEC 3/2024"));
        assert!(table.trim_end().ends_with("Arquivada"));
    }

    #[test]
    fn report_marks_failed_tables() {
        let report = CycleReport {
            references: vec![
                (
                    ReferenceKind::Situation,
                    Some(ReferenceStats {
                        inserted: 3,
                        updated: 1,
                        skipped: 0,
                    }),
                ),
                (ReferenceKind::Theme, None),
            ],
            bills: BillStats {
                new: 5,
                ..BillStats::default()
            },
        };
        let text = cycle_report(&report);
        assert!(text.contains("inserted 3, updated 1, skipped 0"));
        assert!(text.contains(&format!("  {:<26} failed\n", "camara.tp_temas")));
        assert!(text.contains(&format!("  {:<26} 5\n", "new")));
    }
}
