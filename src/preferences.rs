use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc, Weekday};
use csv::{Reader, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::week::{parse_weekday, weekday_label};

/// A team's weekly submission: who they are, how many seats they need, and
/// which days they would like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPreference {
    pub occupant_id: String,
    pub contact: Option<String>,
    pub party_size: u32,
    pub preferred_days: Vec<Weekday>,
    pub submitted_at: DateTime<Utc>,
}

/// An individual's sign-up for the shared pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OasisPreference {
    pub occupant_id: String,
    pub preferred_days: Vec<Weekday>,
    pub submitted_at: DateTime<Utc>,
}

/// Parses a delimited day list ("Monday, Wednesday") into weekdays, deduped
/// in submission order. Returns the labels that failed to parse alongside.
pub fn parse_preferred_days(raw: &str) -> (Vec<Weekday>, Vec<String>) {
    let mut days = Vec::new();
    let mut bad = Vec::new();
    for part in raw.split(',') {
        let label = part.trim();
        if label.is_empty() {
            continue;
        }
        match parse_weekday(label) {
            Some(day) => {
                if !days.contains(&day) {
                    days.push(day);
                }
            }
            None => bad.push(label.to_string()),
        }
    }
    (days, bad)
}

/// Renders a day list back to the form vocabulary.
pub fn format_preferred_days(days: &[Weekday]) -> String {
    days.iter()
        .map(|&d| weekday_label(d))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Loads team preferences from a CSV file.
///
/// Columns are located by header name, so column order does not matter.
/// Malformed rows (empty team name, unparsable size or day labels) are
/// skipped and reported in the second return value, never silently dropped.
/// A later row for the same team replaces the earlier one (re-submission).
pub fn load_team_preferences<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<TeamPreference>, Vec<String>), AllocationError> {
    let mut reader = Reader::from_path(&path).map_err(|e| {
        AllocationError::Config(format!(
            "cannot read preferences {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let headers = reader
        .headers()
        .map_err(|e| AllocationError::Config(format!("bad CSV header: {}", e)))?;

    // Find column indices by header name
    let name_col = headers
        .iter()
        .position(|h| h.contains("team_name") || h.contains("team"))
        .unwrap_or(0);
    let contact_col = headers.iter().position(|h| h.contains("contact"));
    let size_col = headers
        .iter()
        .position(|h| h.contains("size"))
        .unwrap_or(1);
    let days_col = headers
        .iter()
        .position(|h| h.contains("day"))
        .unwrap_or(2);
    let time_col = headers
        .iter()
        .position(|h| h.contains("time") || h.contains("submitted"));

    let mut order: Vec<TeamPreference> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for (row_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skipped.push(format!("row {}: unreadable record ({})", row_num + 2, e));
                continue;
            }
        };
        let occupant_id = record.get(name_col).unwrap_or("").trim().to_string();
        if occupant_id.is_empty() {
            skipped.push(format!("row {}: missing team name", row_num + 2));
            continue;
        }
        let party_size: u32 = match record.get(size_col).unwrap_or("").trim().parse() {
            Ok(n) if n >= 1 => n,
            _ => {
                skipped.push(format!("{}: invalid team size", occupant_id));
                continue;
            }
        };
        let (preferred_days, bad_labels) =
            parse_preferred_days(record.get(days_col).unwrap_or(""));
        if !bad_labels.is_empty() {
            skipped.push(format!(
                "{}: unknown day label(s) {}",
                occupant_id,
                bad_labels.join(", ")
            ));
            continue;
        }
        if preferred_days.is_empty() {
            skipped.push(format!("{}: no preferred days", occupant_id));
            continue;
        }
        let contact = contact_col
            .and_then(|c| record.get(c))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let submitted_at = time_col
            .and_then(|c| record.get(c))
            .map(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let pref = TeamPreference {
            occupant_id: occupant_id.clone(),
            contact,
            party_size,
            preferred_days,
            submitted_at,
        };
        // Re-submissions replace the earlier row for the same team
        match index.get(&occupant_id) {
            Some(&i) => order[i] = pref,
            None => {
                index.insert(occupant_id, order.len());
                order.push(pref);
            }
        }
    }

    Ok((order, skipped))
}

/// Loads shared-pool sign-ups from a CSV file. Same conventions as
/// [`load_team_preferences`]: header-located columns, skipped rows reported,
/// re-submissions replace.
pub fn load_oasis_preferences<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<OasisPreference>, Vec<String>), AllocationError> {
    let mut reader = Reader::from_path(&path).map_err(|e| {
        AllocationError::Config(format!(
            "cannot read preferences {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let headers = reader
        .headers()
        .map_err(|e| AllocationError::Config(format!("bad CSV header: {}", e)))?;

    let name_col = headers
        .iter()
        .position(|h| h.contains("person") || h.contains("name"))
        .unwrap_or(0);
    let days_col = headers
        .iter()
        .position(|h| h.contains("day"))
        .unwrap_or(1);
    let time_col = headers
        .iter()
        .position(|h| h.contains("time") || h.contains("submitted"));

    let mut order: Vec<OasisPreference> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for (row_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skipped.push(format!("row {}: unreadable record ({})", row_num + 2, e));
                continue;
            }
        };
        let occupant_id = record.get(name_col).unwrap_or("").trim().to_string();
        if occupant_id.is_empty() {
            skipped.push(format!("row {}: missing person name", row_num + 2));
            continue;
        }
        let (preferred_days, bad_labels) =
            parse_preferred_days(record.get(days_col).unwrap_or(""));
        if !bad_labels.is_empty() {
            skipped.push(format!(
                "{}: unknown day label(s) {}",
                occupant_id,
                bad_labels.join(", ")
            ));
            continue;
        }
        if preferred_days.is_empty() {
            skipped.push(format!("{}: no preferred days", occupant_id));
            continue;
        }
        let submitted_at = time_col
            .and_then(|c| record.get(c))
            .map(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let pref = OasisPreference {
            occupant_id: occupant_id.clone(),
            preferred_days,
            submitted_at,
        };
        match index.get(&occupant_id) {
            Some(&i) => order[i] = pref,
            None => {
                index.insert(occupant_id, order.len());
                order.push(pref);
            }
        }
    }

    Ok((order, skipped))
}

/// Appends a team submission to the preferences CSV, writing the header first
/// if the file is new.
pub fn append_team_preference_csv<P: AsRef<Path>>(
    path: P,
    pref: &TeamPreference,
) -> Result<(), AllocationError> {
    let path = path.as_ref();
    let file_exists = path.exists();
    if !file_exists {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AllocationError::Persistence(e.to_string()))?;
        }
        let mut header_file =
            std::fs::File::create(path).map_err(|e| AllocationError::Persistence(e.to_string()))?;
        writeln!(
            header_file,
            "team_name,contact_person,team_size,preferred_days,submission_time"
        )
        .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(&[
        &pref.occupant_id,
        &pref.contact.clone().unwrap_or_default(),
        &pref.party_size.to_string(),
        &format_preferred_days(&pref.preferred_days),
        &pref.submitted_at.to_rfc3339(),
    ])
    .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    wtr.flush()
        .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    Ok(())
}

/// Appends a shared-pool sign-up to the oasis preferences CSV.
pub fn append_oasis_preference_csv<P: AsRef<Path>>(
    path: P,
    pref: &OasisPreference,
) -> Result<(), AllocationError> {
    let path = path.as_ref();
    let file_exists = path.exists();
    if !file_exists {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AllocationError::Persistence(e.to_string()))?;
        }
        let mut header_file =
            std::fs::File::create(path).map_err(|e| AllocationError::Persistence(e.to_string()))?;
        writeln!(header_file, "person_name,preferred_days,submission_time")
            .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(&[
        &pref.occupant_id,
        &format_preferred_days(&pref.preferred_days),
        &pref.submitted_at.to_rfc3339(),
    ])
    .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    wtr.flush()
        .map_err(|e| AllocationError::Persistence(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preferred_days_dedup_and_order() {
        let (days, bad) = parse_preferred_days("Wednesday, Monday, monday");
        assert_eq!(days, vec![Weekday::Wed, Weekday::Mon]);
        assert!(bad.is_empty());
    }

    #[test]
    fn test_parse_preferred_days_reports_bad_labels() {
        let (days, bad) = parse_preferred_days("Monday, Blursday");
        assert_eq!(days, vec![Weekday::Mon]);
        assert_eq!(bad, vec!["Blursday".to_string()]);
    }

    #[test]
    fn test_load_team_preferences_skips_and_reports() {
        let dir = std::env::temp_dir().join("allocator-prefs-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("teams.csv");
        std::fs::write(
            &path,
            "team_name,contact_person,team_size,preferred_days,submission_time\n\
             Alpha,ann,4,\"Monday,Wednesday\",2025-06-01T10:00:00Z\n\
             ,bob,3,Monday,2025-06-01T10:01:00Z\n\
             Beta,eve,zero,Tuesday,2025-06-01T10:02:00Z\n\
             Gamma,kim,2,\"Monday,Blursday\",2025-06-01T10:03:00Z\n\
             Alpha,ann,5,\"Tuesday,Thursday\",2025-06-01T10:04:00Z\n",
        )
        .unwrap();

        let (prefs, skipped) = load_team_preferences(&path).unwrap();
        // Alpha's re-submission replaced the first row
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].occupant_id, "Alpha");
        assert_eq!(prefs[0].party_size, 5);
        assert_eq!(prefs[0].preferred_days, vec![Weekday::Tue, Weekday::Thu]);
        // Every bad row is accounted for
        assert_eq!(skipped.len(), 3);
        assert!(skipped.iter().any(|s| s.contains("missing team name")));
        assert!(skipped.iter().any(|s| s.contains("Beta")));
        assert!(skipped.iter().any(|s| s.contains("Gamma")));
    }

    #[test]
    fn test_append_then_load_round_trip() {
        let dir = std::env::temp_dir().join("allocator-prefs-append");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("oasis.csv");
        let pref = OasisPreference {
            occupant_id: "dana".to_string(),
            preferred_days: vec![Weekday::Mon, Weekday::Fri],
            submitted_at: Utc::now(),
        };
        append_oasis_preference_csv(&path, &pref).unwrap();
        let (loaded, skipped) = load_oasis_preferences(&path).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].occupant_id, "dana");
        assert_eq!(loaded[0].preferred_days, vec![Weekday::Mon, Weekday::Fri]);
    }
}
