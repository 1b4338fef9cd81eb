/// Text matching helpers
pub mod text {
    /// Case-insensitive substring test. `needle_lower` must already be lowercase.
    pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
        haystack.to_lowercase().contains(needle_lower)
    }

    /// Trim a free-form field; blank becomes `None`.
    pub fn non_blank(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Timestamp parsing and day labels
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use std::fmt::Display;

    /// Parse an ISO-8601 timestamp or a bare `YYYY-MM-DD` date.
    ///
    /// Bare dates and offset-less date-times are read as UTC. Returns `None`
    /// for anything else; callers decide what a bad timestamp means.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// `M/D/YYYY` in the given zone, the way a US-locale date string reads.
    pub fn day_label<Tz>(instant: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        instant.with_timezone(tz).format("%-m/%-d/%Y").to_string()
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Stable article id derived from its link.
    pub fn article_id_from_url(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str.trim()).ok()?;
        match url.scheme() {
            "http" | "https" => Some(url.to_string()),
            _ => None,
        }
    }

    pub fn is_http_url(url_str: &str) -> bool {
        article_id_from_url(url_str).is_some()
    }
}
