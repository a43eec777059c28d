//! Peak selection over an hourly rain series.

use chrono::{NaiveDateTime, Timelike};

use crate::types::{HourFormat, RainPeak, RainSeries};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

impl RainSeries {
    /// Highest probability of the series and the hour it first occurs.
    ///
    /// The scan starts from 0 and only moves on a strictly greater value, so
    /// ties keep the earliest hour and an all-zero day has no hour at all.
    pub fn peak(&self, format: HourFormat) -> RainPeak {
        let mut probability = 0;
        let mut peak_index = None;

        for (index, value) in self.probabilities.iter().enumerate() {
            if let Some(value) = *value {
                if value > probability {
                    probability = value;
                    peak_index = Some(index);
                }
            }
        }

        let hour_label = peak_index
            .and_then(|index| self.times.get(index))
            .and_then(|time| format_hour(time, format));

        RainPeak {
            probability,
            hour_label,
        }
    }
}

/// Format a provider timestamp (local time, no offset) as an hour label.
/// Returns `None` when the timestamp can't be parsed.
pub fn format_hour(timestamp: &str, format: HourFormat) -> Option<String> {
    let parsed = TIMESTAMP_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(timestamp, f).ok());

    let Some(time) = parsed else {
        tracing::debug!("Unparseable forecast timestamp: {}", timestamp);
        return None;
    };

    let label = match format {
        HourFormat::TwentyFourHour => time.format("%H:%M").to_string(),
        HourFormat::TwelveHour => {
            let suffix = if time.hour() < 12 { "a.m." } else { "p.m." };
            format!("{} {}", time.format("%I:%M"), suffix)
        }
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(probabilities: &[u8]) -> RainSeries {
        let times = (0..probabilities.len())
            .map(|h| format!("2024-01-01T{:02}:00", h))
            .collect();
        RainSeries::new(times, probabilities.iter().copied().map(Some).collect())
    }

    #[test]
    fn test_unique_maximum() {
        let peak = series(&[10, 30, 90, 40]).peak(HourFormat::TwentyFourHour);
        assert_eq!(peak.probability, 90);
        assert_eq!(peak.hour_label.as_deref(), Some("02:00"));
    }

    #[test]
    fn test_ties_keep_earliest_hour() {
        let peak = series(&[20, 80, 80, 10]).peak(HourFormat::TwentyFourHour);
        assert_eq!(peak.probability, 80);
        assert_eq!(peak.hour_label.as_deref(), Some("01:00"));
    }

    #[test]
    fn test_empty_series() {
        let peak = RainSeries::default().peak(HourFormat::TwentyFourHour);
        assert_eq!(peak, RainPeak::default());
    }

    #[test]
    fn test_all_zero_has_no_hour() {
        let peak = series(&[0, 0, 0]).peak(HourFormat::TwentyFourHour);
        assert_eq!(peak.probability, 0);
        assert_eq!(peak.hour_label, None);
    }

    #[test]
    fn test_null_probabilities_are_skipped() {
        let s = RainSeries::new(
            vec!["2024-01-01T00:00".into(), "2024-01-01T01:00".into()],
            vec![None, Some(15)],
        );
        let peak = s.peak(HourFormat::TwentyFourHour);
        assert_eq!(peak.probability, 15);
        assert_eq!(peak.hour_label.as_deref(), Some("01:00"));
    }

    #[test]
    fn test_missing_timestamp_keeps_probability() {
        let s = RainSeries::new(vec!["2024-01-01T00:00".into()], vec![Some(5), Some(60)]);
        let peak = s.peak(HourFormat::TwentyFourHour);
        assert_eq!(peak.probability, 60);
        assert_eq!(peak.hour_label, None);
    }

    #[test]
    fn test_twelve_hour_labels() {
        assert_eq!(
            format_hour("2024-01-01T14:00", HourFormat::TwelveHour).as_deref(),
            Some("02:00 p.m.")
        );
        assert_eq!(
            format_hour("2024-01-01T00:00", HourFormat::TwelveHour).as_deref(),
            Some("12:00 a.m.")
        );
    }

    #[test]
    fn test_seconds_are_accepted() {
        assert_eq!(
            format_hour("2024-01-01T23:00:00", HourFormat::TwentyFourHour).as_deref(),
            Some("23:00")
        );
    }

    #[test]
    fn test_garbage_timestamp() {
        assert_eq!(format_hour("tomorrow", HourFormat::TwentyFourHour), None);
    }
}
