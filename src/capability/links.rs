use super::location::LocationSample;

pub fn tel_url(number: &str) -> String {
    format!("tel:{}", number)
}

/// Web map centered on a sample
pub fn map_url(base: &str, sample: &LocationSample) -> String {
    format!(
        "{}?q={},{}",
        base.trim_end_matches('/'),
        sample.latitude,
        sample.longitude
    )
}

pub fn mailto_url(address: &str) -> String {
    format!("mailto:{}", address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_external_links() {
        let sample = LocationSample {
            latitude: 19.5,
            longitude: -99.25,
            accuracy: 10.0,
            timestamp: 0,
        };

        assert_eq!(tel_url("911"), "tel:911");
        assert_eq!(
            map_url("https://www.google.com/maps/", &sample),
            "https://www.google.com/maps?q=19.5,-99.25"
        );
        assert_eq!(mailto_url("support@safealert.com"), "mailto:support@safealert.com");
    }
}
