//! ---
//! cep_section: "02-ingestion"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Raw schedule extraction into the staging project table."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{IngestError, Result};

const PROJECT_ID_COLUMN: usize = 0;
const PROJECT_NAME_COLUMN: usize = 1;
const BOROUGH_COLUMN: usize = 3;
const TARGET_DATE_COLUMN: usize = 5;

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Row of the staging project table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub project_name: String,
    pub borough: String,
    pub target_date: Option<NaiveDate>,
}

/// Normalise a schedule date string. Missing or unrecognised values yield `None`.
pub fn parse_schedule_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    // Four-digit year formats also accept short years, so implausible years are
    // skipped and later formats get a chance.
    let plausible = |date: &NaiveDate| date.year() >= 1000;
    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .find(plausible)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|timestamp| timestamp.date())
                .find(plausible)
        })
}

/// Extract the staging columns from a raw schedule CSV (header row expected).
///
/// The header must reach the target date column. Rows without a project
/// identifier are skipped; shorter rows keep their leading fields and leave
/// the rest empty.
pub fn normalize_schedule<R: Read>(reader: R) -> Result<Vec<ProjectRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let width = reader.headers()?.len();
    if width <= TARGET_DATE_COLUMN {
        return Err(IngestError::NarrowSchedule {
            found: width,
            required: TARGET_DATE_COLUMN + 1,
        });
    }

    let mut projects = Vec::new();
    let mut skipped = 0usize;
    let mut undated = 0usize;
    let mut short = 0usize;
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|pos| pos.line()).unwrap_or_default();
        let project_id = column(&row, PROJECT_ID_COLUMN);
        if project_id.is_empty() {
            warn!(line, "schedule row without project id skipped");
            skipped += 1;
            continue;
        }
        if row.len() <= TARGET_DATE_COLUMN {
            debug!(line, fields = row.len(), "short schedule row padded");
            short += 1;
        }
        let raw_date = column(&row, TARGET_DATE_COLUMN);
        let target_date = parse_schedule_date(raw_date);
        if target_date.is_none() {
            if !raw_date.is_empty() {
                debug!(line, raw_date, "unparseable target date");
            }
            undated += 1;
        }
        projects.push(ProjectRecord {
            project_id: project_id.to_owned(),
            project_name: column(&row, PROJECT_NAME_COLUMN).to_owned(),
            borough: column(&row, BOROUGH_COLUMN).to_owned(),
            target_date,
        });
    }
    if short > 0 {
        warn!(rows = short, "schedule rows with missing trailing fields");
    }
    info!(
        records = projects.len(),
        skipped, undated, "schedule normalised"
    );
    Ok(projects)
}

fn column(row: &StringRecord, index: usize) -> &str {
    row.get(index).unwrap_or_default()
}

/// Read and normalise the raw schedule file at `path`.
pub fn load_schedule(path: &Path) -> Result<Vec<ProjectRecord>> {
    if !path.exists() {
        return Err(IngestError::ScheduleNotFound(path.to_path_buf()));
    }
    info!(path = %path.display(), "loading capital project schedule");
    normalize_schedule(File::open(path)?)
}

/// Replace the staging table at `path` with `projects`.
pub fn write_staging(path: &Path, projects: &[ProjectRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = Writer::from_path(path)?;
    for project in projects {
        writer.serialize(project)?;
    }
    writer.flush()?;
    info!(path = %path.display(), records = projects.len(), "staging table replaced");
    Ok(projects.len())
}

/// Load the staging table written by [`write_staging`].
pub fn read_staging(path: &Path) -> Result<Vec<ProjectRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let projects = reader
        .deserialize::<ProjectRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    const SCHEDULE: &str = "\
Project ID,Project Name,Description,Borough,Phase,Current End Date,Budget
 850-1001 ,Harlem River Park,Rehab,Manhattan,Construction,06/30/2025,1000
850-1002,Queens Library,New build,Queens,Design,2024-11-15,2000
,Orphan Row,None,Bronx,Design,01/01/2024,5
850-1003,Bronx Pier,Repair,Bronx,Scope,not a date,3000
";

    #[test]
    fn extracts_positional_columns() {
        let projects = normalize_schedule(SCHEDULE.as_bytes()).unwrap();
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[0].project_id, "850-1001");
        assert_eq!(projects[0].project_name, "Harlem River Park");
        assert_eq!(projects[0].borough, "Manhattan");
        assert_eq!(
            projects[0].target_date,
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
        assert_eq!(
            projects[1].target_date,
            NaiveDate::from_ymd_opt(2024, 11, 15)
        );
        assert_eq!(projects[2].target_date, None);
    }

    #[test]
    fn short_rows_keep_leading_fields() {
        let input = "a,b,c,d,e,f\nP1,Park,Desc,Bronx,Design,01/02/2024\nP2,Pool\nP3,Pier,Desc,Queens\n";
        let projects = normalize_schedule(input.as_bytes()).unwrap();
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[1].project_id, "P2");
        assert_eq!(projects[1].project_name, "Pool");
        assert_eq!(projects[1].borough, "");
        assert_eq!(projects[1].target_date, None);
        assert_eq!(projects[2].borough, "Queens");
        assert_eq!(projects[2].target_date, None);
    }

    #[test]
    fn narrow_header_is_rejected() {
        let input = "a,b,c,d\nP1,Park,Desc,Bronx\n";
        let err = normalize_schedule(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::NarrowSchedule {
                found: 4,
                required: 6
            }
        ));
    }

    #[test]
    fn parses_common_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 7);
        for raw in [
            "03/07/2023",
            "2023-03-07",
            "3/7/23",
            "07-Mar-2023",
            "March 7, 2023",
            "03/07/2023 12:00:00 AM",
            "2023-03-07T08:15:00",
            "2023-03-07T08:15:00-05:00",
        ] {
            assert_eq!(parse_schedule_date(raw), expected, "{raw}");
        }
    }

    #[test]
    fn rejects_blank_and_garbage_dates() {
        assert_eq!(parse_schedule_date(""), None);
        assert_eq!(parse_schedule_date("   "), None);
        assert_eq!(parse_schedule_date("TBD"), None);
        assert_eq!(parse_schedule_date("13/45/2023"), None);
    }

    #[test]
    fn staging_is_replaced_on_each_write() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("staging/raw_nyc_projects.csv");
        let projects = normalize_schedule(SCHEDULE.as_bytes())?;
        write_staging(&path, &projects)?;
        write_staging(&path, &projects[..1])?;
        let loaded = read_staging(&path)?;
        assert_eq!(loaded, projects[..1].to_vec());
        Ok(())
    }

    #[test]
    fn missing_schedule_is_a_distinct_error() {
        let err = load_schedule(Path::new("no/such/schedule.csv")).unwrap_err();
        assert!(matches!(err, IngestError::ScheduleNotFound(_)));
    }
}
