//! IP to country lookup.

use crate::config::GeoEntry;
use ipnet::IpNet;
use std::net::IpAddr;

/// Country code reported when nothing matches.
pub const UNKNOWN_COUNTRY: &str = "XX";

pub trait GeoLookup: Send {
    /// Two-letter country code for `ip`.
    fn country(&self, ip: IpAddr) -> String;
}

/// Longest-prefix match over the `[[geo]]` table.
#[derive(Debug, Default)]
pub struct CidrGeoLookup {
    table: Vec<(IpNet, String)>,
}

impl CidrGeoLookup {
    pub fn new(entries: &[GeoEntry]) -> Self {
        let mut table: Vec<(IpNet, String)> = entries
            .iter()
            .map(|e| (e.cidr, e.country.to_ascii_uppercase()))
            .collect();
        table.sort_by(|a, b| b.0.prefix_len().cmp(&a.0.prefix_len()));
        Self { table }
    }
}

impl GeoLookup for CidrGeoLookup {
    fn country(&self, ip: IpAddr) -> String {
        self.table
            .iter()
            .find(|(net, _)| net.contains(&ip))
            .map_or_else(|| UNKNOWN_COUNTRY.to_string(), |(_, c)| c.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_range_wins() {
        let geo = CidrGeoLookup::new(&[
            GeoEntry {
                cidr: "10.0.0.0/8".parse().unwrap(),
                country: "de".into(),
            },
            GeoEntry {
                cidr: "10.1.0.0/16".parse().unwrap(),
                country: "FR".into(),
            },
        ]);
        assert_eq!(geo.country("10.1.2.3".parse().unwrap()), "FR");
        assert_eq!(geo.country("10.2.2.3".parse().unwrap()), "DE");
        assert_eq!(geo.country("192.0.2.1".parse().unwrap()), UNKNOWN_COUNTRY);
    }
}
