use super::GeoPoint;

/// Offline lookup table consulted before any geocoding request.
#[derive(Debug, Clone)]
pub struct KnownLocations {
    entries: Vec<(String, GeoPoint)>,
}

impl Default for KnownLocations {
    fn default() -> Self {
        Self::standard()
    }
}

impl KnownLocations {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, GeoPoint)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, point)| (normalize(name.as_ref()), point))
                .filter(|(name, _)| !name.is_empty())
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Depots, yards, and hubs the dispatch desk refers to by name.
    pub fn standard() -> Self {
        Self::new([
            ("o'hare", GeoPoint::new(41.9742, -87.9073)),
            ("midway", GeoPoint::new(41.7868, -87.7522)),
            ("the loop", GeoPoint::new(41.8837, -87.6289)),
            ("downtown", GeoPoint::new(41.8781, -87.6298)),
            ("joliet", GeoPoint::new(41.5250, -88.0817)),
            ("naperville", GeoPoint::new(41.7508, -88.1535)),
            ("schaumburg", GeoPoint::new(42.0334, -88.0834)),
            ("gary", GeoPoint::new(41.5934, -87.3464)),
            ("evanston", GeoPoint::new(42.0451, -87.6877)),
            ("aurora", GeoPoint::new(41.7606, -88.3201)),
            ("cicero", GeoPoint::new(41.8456, -87.7539)),
            ("elk grove", GeoPoint::new(42.0039, -87.9703)),
        ])
    }

    /// First entry whose name appears inside the query, in table order.
    pub fn lookup(&self, query: &str) -> Option<GeoPoint> {
        let query = normalize(query);
        if query.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|(name, _)| query.contains(name.as_str()))
            .map(|(_, point)| *point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn normalize(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}
