use crate::config::LocationKey;

/// The categorical palette cycled through by the selected locations.
///
/// These are the first colors of the glasbey extension of Category10. Only
/// these 10 are carried: the 11th location takes the color of the first.
pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// New York City is not a county, and always stands out in gray.
pub const NEW_YORK_CITY_COLOR: &str = "gray";

/// The color of the location at `index` in the selection.
pub fn color_for(index: usize, location: &LocationKey) -> &'static str {
    if location.is_new_york_city() {
        NEW_YORK_CITY_COLOR
    } else {
        CATEGORY10[index % CATEGORY10.len()]
    }
}

/// Assigns a color to each location, in selection order.
pub fn assign_colors(locations: &[LocationKey]) -> Vec<&'static str> {
    locations
        .iter()
        .enumerate()
        .map(|(idx, location)| color_for(idx, location))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_after_ten_colors() {
        let locations: Vec<LocationKey> = (0..12)
            .map(|i| LocationKey::new(&format!("County {}", i), "Texas"))
            .collect();
        let colors = assign_colors(&locations);
        assert_eq!(colors[0], "#1f77b4");
        assert_eq!(colors[9], "#17becf");
        assert_eq!(&colors[..10], &CATEGORY10[..]);
        assert_eq!(colors[10], colors[0]);
        assert_eq!(colors[11], colors[1]);
    }

    #[test]
    fn new_york_city_is_always_gray() {
        for position in 0..12 {
            let mut locations: Vec<LocationKey> = (0..12)
                .map(|i| LocationKey::new(&format!("County {}", i), "New York"))
                .collect();
            locations[position] = LocationKey::new_york_city();
            let colors = assign_colors(&locations);
            assert_eq!(colors[position], NEW_YORK_CITY_COLOR);
            // The other locations keep their position in the cycle.
            for (idx, c) in colors.iter().enumerate() {
                if idx != position {
                    assert_eq!(*c, CATEGORY10[idx % 10]);
                }
            }
        }
    }
}
