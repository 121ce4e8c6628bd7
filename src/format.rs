use jiff::Timestamp;
use jiff::tz::TimeZone;

/// Renders store timestamps for display in a fixed time zone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    time_zone: TimeZone,
}

impl DateFormatter {
    pub fn new(time_zone: TimeZone) -> Self {
        Self { time_zone }
    }

    pub fn system() -> Self {
        Self::new(TimeZone::system())
    }

    /// Format a timestamp as "dd/mm/yy at HH:MM"
    pub fn format(&self, timestamp: Timestamp) -> String {
        timestamp
            .to_zoned(self.time_zone.clone())
            .strftime("%d/%m/%y at %H:%M")
            .to_string()
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::system()
    }
}
