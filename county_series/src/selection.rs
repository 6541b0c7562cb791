use log::debug;
use snafu::prelude::*;

use crate::config::*;

/// Parses the display form `"<county>, <state>"` of a location.
///
/// The county is everything before the first comma, which allows state
/// names to contain commas but not county names.
pub fn parse_location(display: &str) -> Result<LocationKey, SeriesError> {
    let (county, state) = display.split_once(',').context(InvalidSelectionSnafu {
        field: "location",
        value: display,
    })?;
    let (county, state) = (county.trim(), state.trim());
    ensure!(
        !county.is_empty() && !state.is_empty(),
        InvalidSelectionSnafu {
            field: "location",
            value: display,
        }
    );
    Ok(LocationKey::new(county, state))
}

/// The locations picked by the user, in the order they were added.
///
/// Adding a location twice keeps the first position.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SelectedLocations {
    locations: Vec<LocationKey>,
}

impl SelectedLocations {
    pub fn new() -> SelectedLocations {
        SelectedLocations::default()
    }

    /// Returns false if the location was already selected.
    pub fn add(&mut self, location: LocationKey) -> bool {
        if self.locations.contains(&location) {
            debug!("add: {} already selected", location);
            false
        } else {
            self.locations.push(location);
            true
        }
    }

    pub fn add_display(&mut self, display: &str) -> Result<bool, SeriesError> {
        parse_location(display).map(|l| self.add(l))
    }

    pub fn clear(&mut self) {
        self.locations.clear();
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn as_slice(&self) -> &[LocationKey] {
        &self.locations
    }

    pub fn into_vec(self) -> Vec<LocationKey> {
        self.locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_strings() {
        assert_eq!(
            parse_location("Travis, Texas"),
            Ok(LocationKey::new("Travis", "Texas"))
        );
        assert_eq!(
            "New York City, New York".parse::<LocationKey>(),
            Ok(LocationKey::new_york_city())
        );
        assert!(parse_location("Travis").is_err());
        assert!(parse_location(", Texas").is_err());
        assert!(parse_location("Travis, ").is_err());
    }

    #[test]
    fn display_round_trips() {
        let l = LocationKey::new("Doña Ana", "New Mexico");
        assert_eq!(parse_location(&l.to_string()), Ok(l));
    }

    #[test]
    fn keeps_insertion_order_without_duplicates() {
        let mut selected = SelectedLocations::new();
        assert!(selected.add_display("Travis, Texas").unwrap());
        assert!(selected.add_display("Cook, Illinois").unwrap());
        assert!(!selected.add_display("Travis, Texas").unwrap());
        assert_eq!(
            selected.as_slice(),
            &[
                LocationKey::new("Travis", "Texas"),
                LocationKey::new("Cook", "Illinois")
            ]
        );
        selected.clear();
        assert!(selected.is_empty());
    }
}
