use std::fs::File;
use std::io::Write;

use crate::allocate::{AllocationReport, Assignment};
use crate::catalog::RoomCatalog;
use crate::week::{weekday_label, Week};

/// Renders the week as a resource × weekday grid. Cells hold the occupants
/// seated there; unassigned cells read "Vacant".
pub fn render_week_grid(catalog: &RoomCatalog, assignments: &[Assignment], week: &Week) -> String {
    let rooms: Vec<&str> = catalog
        .project_rooms
        .iter()
        .chain(catalog.pools.iter())
        .map(|r| r.name.as_str())
        .collect();

    let name_width = rooms
        .iter()
        .map(|n| n.len())
        .chain(std::iter::once("Resource".len()))
        .max()
        .unwrap_or(8);

    let mut out = String::new();
    // Header row
    out.push_str(&format!("{:<width$}", "Resource", width = name_width));
    for &(day, _) in week.days() {
        out.push_str(&format!(" | {}", weekday_label(day)));
    }
    out.push('\n');

    for room in rooms {
        out.push_str(&format!("{:<width$}", room, width = name_width));
        for &(_, date) in week.days() {
            let occupants: Vec<&str> = assignments
                .iter()
                .filter(|a| a.resource_name == room && a.date == date)
                .map(|a| a.occupant_id.as_str())
                .collect();
            if occupants.is_empty() {
                out.push_str(" | Vacant");
            } else {
                out.push_str(&format!(" | {}", occupants.join(", ")));
            }
        }
        out.push('\n');
    }
    out
}

/// Writes the week grid to a file.
pub fn write_grid_to_file(
    catalog: &RoomCatalog,
    assignments: &[Assignment],
    week: &Week,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;
    writeln!(file, "** Week of {} **", week.anchor())?;
    write!(file, "{}", render_week_grid(catalog, assignments, week))?;
    Ok(())
}

/// Prints a run report in a readable format.
pub fn print_run_report(report: &AllocationReport) {
    println!("\n=== Allocation Run: week of {} ===", report.week_anchor);
    println!("Scope: {:?}", report.scope);
    println!(
        "Wrote {} assignment(s), replaced {} prior one(s)",
        report.written, report.replaced
    );
    if report.unplaced.is_empty() {
        println!("Everyone with a submission was seated.");
    } else {
        println!("⚠️  Unplaced occupants ({}):", report.unplaced.len());
        for occupant in &report.unplaced {
            println!("  - {} could not be placed on any day", occupant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Room;
    use chrono::NaiveDate;

    #[test]
    fn test_grid_marks_vacant_cells() {
        let catalog = RoomCatalog::from_rooms(
            vec![
                Room {
                    name: "Room A".to_string(),
                    capacity: 4,
                    is_shared_pool: false,
                },
                Room {
                    name: "Oasis".to_string(),
                    capacity: 8,
                    is_shared_pool: false,
                },
            ],
            "Oasis",
        )
        .unwrap();
        let week = Week::from_anchor(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()).unwrap();
        let assignments = vec![
            Assignment {
                occupant_id: "Alpha".to_string(),
                resource_name: "Room A".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            },
            Assignment {
                occupant_id: "dana".to_string(),
                resource_name: "Oasis".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            },
            Assignment {
                occupant_id: "eve".to_string(),
                resource_name: "Oasis".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            },
        ];

        let grid = render_week_grid(&catalog, &assignments, &week);
        let lines: Vec<&str> = grid.lines().collect();
        assert!(lines[0].starts_with("Resource"));
        assert!(lines[0].contains("Monday") && lines[0].contains("Friday"));
        assert!(lines[1].contains("Alpha"));
        assert!(lines[2].contains("dana, eve"));
        // Four of five days in Room A are vacant
        assert_eq!(lines[1].matches("Vacant").count(), 4);
    }
}
