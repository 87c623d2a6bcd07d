//! Location resolver: search, deduplicate, pick.
//!
//! Search flow:  Geocoder → empty check → dedup → user choice

use std::io::{BufRead, Write};

use super::providers::Geocoder;
use super::types::{Location, LocationError};
use tracing::debug;

/// Resolves place names through a [`Geocoder`].
pub struct LocationResolver<G> {
    geocoder: G,
}

impl<G: Geocoder> LocationResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self { geocoder }
    }

    /// Search for `query` and return the matches without duplicates.
    pub fn find(&self, query: &str) -> Result<Vec<Location>, LocationError> {
        let matches = self.geocoder.search(query)?;
        if matches.is_empty() {
            return Err(LocationError::NotFound(query.to_string()));
        }

        let before = matches.len();
        let unique = dedup(matches);
        debug!(before, after = unique.len(), "deduplicated geocoding matches");
        Ok(unique)
    }
}

/// Drop locations that overlap an earlier one. Order is preserved and the
/// first occurrence wins.
///
/// O(n²), which is fine for the handful of matches the API returns.
pub fn dedup(matches: Vec<Location>) -> Vec<Location> {
    if matches.len() < 2 {
        return matches;
    }

    let mut unique: Vec<Location> = Vec::with_capacity(matches.len());
    for candidate in matches {
        if !unique.iter().any(|kept| candidate.overlaps(kept)) {
            unique.push(candidate);
        }
    }
    unique
}

/// Let the user pick one of several matches.
///
/// A single match is returned without prompting. Otherwise the matches are
/// listed on `output` and a 1-based index is read from `input`.
pub fn choose<R: BufRead, W: Write>(
    mut matches: Vec<Location>,
    mut input: R,
    mut output: W,
) -> Result<Location, LocationError> {
    match matches.len() {
        0 => return Err(LocationError::InvalidChoice("no matches to choose from".into())),
        1 => return Ok(matches.remove(0)),
        _ => {}
    }

    writeln!(output, "Multiple matches found:")?;
    for (i, loc) in matches.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, loc)?;
    }
    write!(output, "Choose location [1-{}]: ", matches.len())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();

    match answer.parse::<usize>() {
        Ok(n) if (1..=matches.len()).contains(&n) => Ok(matches.swap_remove(n - 1)),
        _ => Err(LocationError::InvalidChoice(answer.to_string())),
    }
}
