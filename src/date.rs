use chrono::{Datelike, Utc};

use crate::error::{Error, Result};

/// First year covered by the POWER climatology archive.
pub const EARLIEST_YEAR: i32 = 1981;

/// Year range check against today's date.
pub fn validate_years(start: Option<i32>, end: Option<i32>) -> Result<()> {
    validate_years_at(start, end, Utc::now().year())
}

pub(crate) fn validate_years_at(start: Option<i32>, end: Option<i32>, current_year: i32) -> Result<()> {
    let (start, end) = match (start, end) {
        (None, None) => return Ok(()),
        (Some(s), Some(e)) => (s, e),
        (Some(_), None) | (None, Some(_)) => {
            return Err(Error::InvalidRequest(
                "start and end years must be given together".into(),
            ));
        }
    };

    if start > end {
        return Err(Error::InvalidRequest(format!(
            "start year {start} is after end year {end}"
        )));
    }
    if start < EARLIEST_YEAR {
        return Err(Error::InvalidRequest(format!(
            "start year {start} is before {EARLIEST_YEAR}, the first year with data"
        )));
    }
    if end > current_year {
        return Err(Error::InvalidRequest(format!(
            "end year {end} is in the future (current year is {current_year})"
        )));
    }

    Ok(())
}
