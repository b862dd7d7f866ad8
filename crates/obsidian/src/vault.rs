use anyhow::{Context, Result};
use fleet_core::StatusLabel;
use fleet_core::feed::group_by_plate;
use fleet_core::schema::{DocumentView, UpcomingDocument, VehicleSummary};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use time::Date;
use tracing::debug;

pub struct VaultPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub vehicles_dir: PathBuf,
}

impl VaultPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_dir: root.join("00_Index"),
            vehicles_dir: root.join("Vehicles"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir)?;
        fs::create_dir_all(&self.vehicles_dir)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultStats {
    pub vehicle_notes: usize,
    pub upcoming_documents: usize,
}

pub fn build_vault(
    summaries: &[VehicleSummary],
    feed: &[UpcomingDocument],
    today: Date,
    vault_root: &Path,
) -> Result<VaultStats> {
    let paths = VaultPaths::new(vault_root);
    paths
        .ensure()
        .with_context(|| format!("creating vault at {}", vault_root.display()))?;

    let names = NoteNames::assign(summaries);

    // 1) One note per vehicle
    for summary in summaries {
        let note_path = paths
            .vehicles_dir
            .join(format!("{}.md", names.for_vehicle(summary)));
        fs::write(&note_path, render_vehicle_note(summary, today))?;
        debug!("wrote {}", note_path.display());
    }

    // 2) Vehicle MOC
    let moc_path = paths.index_dir.join("MOC - Vehicles.md");
    fs::write(moc_path, render_vehicle_index(summaries, &names))?;

    // 3) Upcoming expiries
    let upcoming_path = paths.index_dir.join("Upcoming.md");
    fs::write(upcoming_path, render_upcoming(feed, today, &names))?;

    Ok(VaultStats {
        vehicle_notes: summaries.len(),
        upcoming_documents: feed.len(),
    })
}

/// Human wording of a signed day count.
pub fn format_days_label(days: Option<i64>) -> String {
    match days {
        None => "-".to_string(),
        Some(d) if d < 0 => format!("{} days overdue", -d),
        Some(0) => "due today".to_string(),
        Some(1) => "1 day left".to_string(),
        Some(d) => format!("{d} days left"),
    }
}

/// Plates may contain spaces or slashes; note names keep only
/// alphanumerics and `-`.
pub fn note_stem(plate: &str) -> String {
    let stem: String = plate
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Note file names for one export. Plates that clean up to the same stem get
/// the vehicle id appended, so every vehicle keeps its own note.
#[derive(Debug, Default)]
pub struct NoteNames {
    by_id: BTreeMap<i64, String>,
    by_plate: BTreeMap<String, String>,
}

impl NoteNames {
    pub fn assign(summaries: &[VehicleSummary]) -> Self {
        let mut names = Self::default();
        let mut taken: HashSet<String> = HashSet::new();
        for summary in summaries {
            let base = note_stem(&summary.plate);
            let mut stem = base.clone();
            let mut attempt = 0;
            while taken.contains(&stem) {
                stem = match attempt {
                    0 => format!("{base}-{}", summary.id),
                    n => format!("{base}-{}-{n}", summary.id),
                };
                attempt += 1;
            }
            taken.insert(stem.clone());
            names
                .by_plate
                .entry(summary.plate.clone())
                .or_insert_with(|| stem.clone());
            names.by_id.insert(summary.id, stem);
        }
        names
    }

    pub fn for_vehicle(&self, summary: &VehicleSummary) -> String {
        match self.by_id.get(&summary.id) {
            Some(stem) => stem.clone(),
            None => note_stem(&summary.plate),
        }
    }

    pub fn for_plate(&self, plate: &str) -> String {
        match self.by_plate.get(plate) {
            Some(stem) => stem.clone(),
            None => note_stem(plate),
        }
    }
}

fn status_text(status: Option<StatusLabel>) -> &'static str {
    match status {
        Some(status) => status.as_str(),
        None => "no documents",
    }
}

pub fn render_vehicle_note(summary: &VehicleSummary, today: Date) -> String {
    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&format!("id: {}\n", summary.id));
    md.push_str(&format!("plate: \"{}\"\n", yaml_escape(&summary.plate)));
    md.push_str(&format!("next_status: {}\n", status_text(summary.next_status)));
    if let Some(next) = &summary.next_valid_to {
        md.push_str(&format!("next_valid_to: {next}\n"));
    }
    if let Some(days) = summary.days_left {
        md.push_str(&format!("days_left: {days}\n"));
    }
    md.push_str(&format!("document_count: {}\n", summary.document_count));
    if let Some(km) = summary.last_odometer_km {
        md.push_str(&format!("last_odometer_km: {km}\n"));
    }
    md.push_str(&format!("generated_on: {today}\n"));
    md.push_str("---\n\n");

    md.push_str(&format!("# {}\n\n", summary.plate));

    let vehicle_line: Vec<String> = [
        summary.make.clone(),
        summary.model.clone(),
        summary.year.map(|y| y.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !vehicle_line.is_empty() {
        md.push_str(&format!("{}\n\n", vehicle_line.join(" ")));
    }

    md.push_str("## Next Due\n");
    match (&summary.next_valid_to, summary.next_status) {
        (Some(valid_to), Some(status)) => {
            md.push_str(&format!(
                "- `{status}` on {valid_to} ({})\n",
                format_days_label(summary.days_left)
            ));
        }
        (None, Some(status)) => md.push_str(&format!("- `{status}`, no usable expiry date\n")),
        _ => md.push_str("_No documents recorded._\n"),
    }
    if let Some(km) = summary.last_odometer_km {
        md.push_str(&format!("- Last odometer: {km} km\n"));
    }
    md.push('\n');

    md.push_str("## Documents\n");
    if summary.documents.is_empty() {
        md.push_str("_No documents recorded._\n");
    } else {
        md.push_str("| Type | Valid from | Valid to | Status | Days | Note |\n");
        md.push_str("|---|---|---|---|---|---|\n");
        let mut documents: Vec<&DocumentView> = summary.documents.iter().collect();
        documents.sort_by(|a, b| a.valid_to.cmp(&b.valid_to).then(a.id.cmp(&b.id)));
        for doc in documents {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                table_cell(Some(&doc.doc_label)),
                doc.valid_from.as_deref().unwrap_or("-"),
                doc.valid_to.as_deref().unwrap_or("-"),
                doc.status,
                format_days_label(doc.days_left),
                table_cell(doc.note.as_deref()),
            ));
        }
    }
    md
}

pub fn render_vehicle_index(summaries: &[VehicleSummary], names: &NoteNames) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# MOC - Vehicles".to_string());
    lines.push(String::new());
    lines.push("This index is generated. Do not edit manually.".to_string());
    lines.push(String::new());

    let mut status_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for summary in summaries {
        lines.push(format!(
            "- [[Vehicles/{}|{}]] `{}` {}",
            names.for_vehicle(summary),
            summary.plate,
            status_text(summary.next_status),
            format_days_label(summary.days_left)
        ));
        *status_counts.entry(status_text(summary.next_status)).or_insert(0) += 1;
    }
    if summaries.is_empty() {
        lines.push("_No vehicles found._".to_string());
    }

    lines.push(String::new());
    lines.push("## Status Counts".to_string());
    lines.push(String::new());
    let mut counts: Vec<(&str, usize)> = status_counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if counts.is_empty() {
        lines.push("_Nothing to count._".to_string());
    } else {
        for (status, count) in counts {
            lines.push(format!("- {status} ({count})"));
        }
    }
    lines.join("\n")
}

pub fn render_upcoming(feed: &[UpcomingDocument], today: Date, names: &NoteNames) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Upcoming Expiries".to_string());
    lines.push(String::new());
    lines.push(format!("Generated on {today}. Do not edit manually."));
    lines.push(String::new());

    let groups = group_by_plate(feed);
    if groups.is_empty() {
        lines.push("_No documents expire in this window._".to_string());
    }
    for group in groups {
        lines.push(format!(
            "## [[Vehicles/{}|{}]] `{}`",
            names.for_plate(&group.plate),
            group.plate,
            group.worst_status
        ));
        lines.push(String::new());
        for doc in &group.documents {
            lines.push(format!(
                "- {} until {} `{}` {}",
                doc.doc_label,
                doc.valid_to,
                doc.status,
                format_days_label(Some(doc.days_left))
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn yaml_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn table_cell(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.replace('|', "\\|").replace('\n', " "),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::doc_types::DocTypeCatalog;
    use fleet_core::feed::upcoming;
    use fleet_core::rollup::summarize_fleet;
    use fleet_core::schema::{Document, Vehicle};
    use fleet_core::Thresholds;
    use time::macros::date;

    const TODAY: Date = date!(2024 - 03 - 15);

    fn fleet() -> Vec<Vehicle> {
        vec![
            Vehicle {
                id: 1,
                plate: "34 ABC 123".to_string(),
                make: Some("Ford".to_string()),
                model: Some("Transit".to_string()),
                year: Some(2019),
                responsible_email: None,
                created_at: None,
                documents: vec![
                    Document {
                        id: 10,
                        doc_type: "inspection".to_string(),
                        valid_from: None,
                        valid_to: Some("2024-03-20".to_string()),
                        note: None,
                    },
                    Document {
                        id: 11,
                        doc_type: "service_oil".to_string(),
                        valid_from: Some("2024-01-05".to_string()),
                        valid_to: Some("2024-01-05".to_string()),
                        note: Some("km=120000; oil | filter".to_string()),
                    },
                ],
            },
            Vehicle {
                id: 2,
                plate: "06AAA01".to_string(),
                make: None,
                model: None,
                year: None,
                responsible_email: None,
                created_at: None,
                documents: Vec::new(),
            },
        ]
    }

    #[test]
    fn days_label_wording() {
        assert_eq!(format_days_label(None), "-");
        assert_eq!(format_days_label(Some(-3)), "3 days overdue");
        assert_eq!(format_days_label(Some(0)), "due today");
        assert_eq!(format_days_label(Some(1)), "1 day left");
        assert_eq!(format_days_label(Some(12)), "12 days left");
    }

    #[test]
    fn note_stem_sanitizes_plate() {
        assert_eq!(note_stem(" 34 ABC/123 "), "34-ABC-123");
        assert_eq!(note_stem("  "), "unnamed");
    }

    #[test]
    fn vehicle_note_has_frontmatter_and_table() {
        let summaries = summarize_fleet(
            &fleet(),
            TODAY,
            &Thresholds::default(),
            &DocTypeCatalog::default(),
        );
        let ford = summaries.iter().find(|s| s.id == 1).unwrap();
        let md = render_vehicle_note(ford, TODAY);
        assert!(md.starts_with("---\nid: 1\nplate: \"34 ABC 123\"\nnext_status: critical\n"));
        assert!(md.contains("last_odometer_km: 120000\n"));
        assert!(md.contains("Ford Transit 2019"));
        assert!(md.contains("- `critical` on 2024-03-20 (5 days left)"));
        assert!(md.contains("| Oil Service | 2024-01-05 | 2024-01-05 | expired | 70 days overdue | km=120000; oil \\| filter |"));

        let empty = summaries.iter().find(|s| s.id == 2).unwrap();
        let md = render_vehicle_note(empty, TODAY);
        assert!(md.contains("next_status: no documents\n"));
        assert!(md.contains("_No documents recorded._"));
    }

    #[test]
    fn build_vault_writes_index_and_notes() {
        let dir = tempfile::tempdir().unwrap();
        let vehicles = fleet();
        let thresholds = Thresholds::default();
        let catalog = DocTypeCatalog::default();
        let summaries = summarize_fleet(&vehicles, TODAY, &thresholds, &catalog);
        let feed = upcoming(&vehicles, TODAY, 60, &thresholds, &catalog);

        let stats = build_vault(&summaries, &feed, TODAY, dir.path()).unwrap();
        assert_eq!(
            stats,
            VaultStats {
                vehicle_notes: 2,
                upcoming_documents: 1
            }
        );

        let index = fs::read_to_string(dir.path().join("00_Index/MOC - Vehicles.md")).unwrap();
        assert!(index.contains("- [[Vehicles/06AAA01|06AAA01]] `no documents` -"));
        assert!(index.contains("- [[Vehicles/34-ABC-123|34 ABC 123]] `critical` 5 days left"));
        assert!(index.contains("- critical (1)"));

        let upcoming_md = fs::read_to_string(dir.path().join("00_Index/Upcoming.md")).unwrap();
        assert!(upcoming_md.contains("## [[Vehicles/34-ABC-123|34 ABC 123]] `critical`"));
        assert!(upcoming_md.contains("- Inspection until 2024-03-20 `critical` 5 days left"));

        assert!(dir.path().join("Vehicles/34-ABC-123.md").exists());
        assert!(dir.path().join("Vehicles/06AAA01.md").exists());
    }

    #[test]
    fn plates_with_the_same_stem_keep_separate_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut vehicles = fleet();
        vehicles[1].plate = "34-ABC-123".to_string();
        let thresholds = Thresholds::default();
        let catalog = DocTypeCatalog::default();
        let summaries = summarize_fleet(&vehicles, TODAY, &thresholds, &catalog);
        let feed = upcoming(&vehicles, TODAY, 60, &thresholds, &catalog);

        let stats = build_vault(&summaries, &feed, TODAY, dir.path()).unwrap();
        assert_eq!(stats.vehicle_notes, 2);
        assert_eq!(fs::read_dir(dir.path().join("Vehicles")).unwrap().count(), 2);

        let first = fs::read_to_string(dir.path().join("Vehicles/34-ABC-123.md")).unwrap();
        assert!(first.contains("plate: \"34 ABC 123\"\nnext_status: critical\n"));
        let second = fs::read_to_string(dir.path().join("Vehicles/34-ABC-123-2.md")).unwrap();
        assert!(second.contains("plate: \"34-ABC-123\"\n"));

        let index = fs::read_to_string(dir.path().join("00_Index/MOC - Vehicles.md")).unwrap();
        assert!(index.contains("- [[Vehicles/34-ABC-123|34 ABC 123]] `critical`"));
        assert!(index.contains("- [[Vehicles/34-ABC-123-2|34-ABC-123]] `no documents`"));

        let upcoming_md = fs::read_to_string(dir.path().join("00_Index/Upcoming.md")).unwrap();
        assert!(upcoming_md.contains("## [[Vehicles/34-ABC-123|34 ABC 123]] `critical`"));
    }

    #[test]
    fn frontmatter_and_table_are_escaped() {
        let mut vehicles = fleet();
        vehicles[0].plate = "34 \"ABC\" 123".to_string();
        vehicles[0].documents[0].doc_type = "permit|b".to_string();
        let summaries = summarize_fleet(
            &vehicles,
            TODAY,
            &Thresholds::default(),
            &DocTypeCatalog::default(),
        );
        let md = render_vehicle_note(&summaries[1], TODAY);
        assert!(md.contains("plate: \"34 \\\"ABC\\\" 123\"\n"));
        assert!(md.contains("| permit\\|b | - | 2024-03-20 |"));
    }
}
