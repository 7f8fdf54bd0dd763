//! Temporal classification of festivals relative to a given instant.

use super::models::{
    ClassifiedFestival, Festival, FestivalKind, FestivalPhase, FestivalStatus, NewFestival,
};
use crate::data_error::DataError;
use anyhow::{bail, Result};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc,
};

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Years a festival date may fall in. Anything outside is treated as
/// unparseable so calendar arithmetic on stored dates cannot overflow.
const FESTIVAL_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Formats carrying their own UTC offset, tried after RFC 3339.
const OFFSET_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Formats without an offset, interpreted in the classifier's local offset.
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Festivals of one tab, plus the ones that could not be classified.
#[derive(Debug, Clone)]
pub struct TabListing {
    pub festivals: Vec<ClassifiedFestival>,
    pub rejected: Vec<DataError>,
}

/// Classifies festivals as upcoming, ongoing or ended.
///
/// Calendar days (the fallback end of a festival without `end_date` and
/// the `D-Day` check) are evaluated in `local_offset`.
#[derive(Debug, Clone, Copy)]
pub struct FestivalClassifier {
    local_offset: FixedOffset,
}

impl FestivalClassifier {
    pub fn new(local_offset: FixedOffset) -> Self {
        FestivalClassifier { local_offset }
    }

    pub fn local_offset(&self) -> FixedOffset {
        self.local_offset
    }

    /// Parses a stored festival date. Dates outside years 1 to 9999 are
    /// refused.
    pub fn parse_timestamp(&self, raw: &str) -> Option<DateTime<Utc>> {
        self.parse_any_timestamp(raw.trim())
            .filter(|instant| FESTIVAL_YEARS.contains(&instant.year()))
    }

    fn parse_any_timestamp(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Some(parsed) = OFFSET_DATE_TIME_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(raw, format).ok())
        {
            return Some(parsed.with_timezone(&Utc));
        }

        let naive = NAIVE_DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;
        self.local_offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
    }

    fn offset_delta(&self) -> Duration {
        Duration::seconds(self.local_offset.local_minus_utc() as i64)
    }

    /// Wall clock time of `instant` in the local offset, `None` past the
    /// representable range.
    fn local_wall_clock(&self, instant: DateTime<Utc>) -> Option<NaiveDateTime> {
        instant.naive_utc().checked_add_signed(self.offset_delta())
    }

    /// Last millisecond of the local calendar day containing `instant`,
    /// `None` when that day ends past the representable range.
    pub fn end_of_calendar_day(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next_midnight = self
            .local_wall_clock(instant)?
            .date()
            .succ_opt()?
            .and_hms_opt(0, 0, 0)?;
        next_midnight
            .checked_sub_signed(Duration::milliseconds(1))?
            .checked_sub_signed(self.offset_delta())
            .map(|utc| utc.and_utc())
    }

    /// The explicit end if there is one, otherwise the end of the start day.
    pub fn effective_end(
        &self,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match ends_at {
            Some(ends_at) => Some(ends_at),
            None => self.end_of_calendar_day(starts_at),
        }
    }

    pub fn classify(
        &self,
        festival: &Festival,
        now: DateTime<Utc>,
    ) -> Result<FestivalStatus, DataError> {
        let starts_at = self
            .parse_timestamp(&festival.start_date)
            .ok_or_else(|| DataError::InvalidStartDate {
                festival_id: festival.id,
                value: festival.start_date.clone(),
            })?;

        let ends_at = match festival.end_date.as_deref() {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(self.parse_timestamp(raw).ok_or_else(|| {
                DataError::InvalidEndDate {
                    festival_id: festival.id,
                    value: raw.to_string(),
                }
            })?),
        };

        let effective_end = self.effective_end(starts_at, ends_at).ok_or_else(|| {
            DataError::InvalidStartDate {
                festival_id: festival.id,
                value: festival.start_date.clone(),
            }
        })?;
        if festival.kind.is_none() {
            return Err(DataError::UnknownFestivalType {
                festival_id: festival.id,
            });
        }

        let phase = if now > effective_end {
            FestivalPhase::Ended
        } else if starts_at <= now {
            FestivalPhase::Ongoing
        } else {
            FestivalPhase::Upcoming
        };

        Ok(FestivalStatus {
            phase,
            d_day: self.d_day(phase, starts_at, now),
            starts_at,
            effective_end,
        })
    }

    fn d_day(&self, phase: FestivalPhase, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
        match phase {
            FestivalPhase::Ended => "END".to_string(),
            FestivalPhase::Ongoing => "NOW".to_string(),
            FestivalPhase::Upcoming => {
                let start_day = self.local_wall_clock(starts_at).map(|t| t.date());
                let today = self.local_wall_clock(now).map(|t| t.date());
                if start_day.is_some() && start_day == today {
                    return "D-Day".to_string();
                }
                let remaining = (starts_at - now).num_milliseconds();
                let days = (remaining + DAY_MILLIS - 1) / DAY_MILLIS;
                format!("D-{}", days)
            }
        }
    }

    /// Festivals belonging to `tab`, in listing order.
    ///
    /// - ended: most recent start first.
    /// - ongoing: input order.
    /// - upcoming: school festivals first, then by start ascending.
    ///
    /// Festivals whose dates cannot be parsed appear in no tab and are
    /// returned in `rejected`.
    pub fn listing_order(
        &self,
        festivals: &[Festival],
        tab: FestivalPhase,
        now: DateTime<Utc>,
    ) -> TabListing {
        let mut listed = Vec::new();
        let mut rejected = Vec::new();

        for festival in festivals {
            match self.classify(festival, now) {
                Ok(status) if status.phase == tab => listed.push(ClassifiedFestival {
                    festival: festival.clone(),
                    status,
                }),
                Ok(_) => {}
                Err(err) => rejected.push(err),
            }
        }

        match tab {
            FestivalPhase::Ended => {
                listed.sort_by(|a, b| b.status.starts_at.cmp(&a.status.starts_at));
            }
            FestivalPhase::Ongoing => {}
            FestivalPhase::Upcoming => {
                listed.sort_by(|a, b| {
                    let a_external = a.festival.kind != Some(FestivalKind::School);
                    let b_external = b.festival.kind != Some(FestivalKind::School);
                    a_external
                        .cmp(&b_external)
                        .then(a.status.starts_at.cmp(&b.status.starts_at))
                });
            }
        }

        TabListing {
            festivals: listed,
            rejected,
        }
    }
}

impl NewFestival {
    /// Checks a festival about to be written, so that stored rows always
    /// classify.
    pub fn validate(&self, classifier: &FestivalClassifier) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Festival name cannot be empty");
        }
        let Some(starts_at) = classifier.parse_timestamp(&self.start_date) else {
            bail!("Invalid start_date {:?}", self.start_date);
        };
        if let Some(raw_end) = self.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            let Some(ends_at) = classifier.parse_timestamp(raw_end) else {
                bail!("Invalid end_date {:?}", raw_end);
            };
            if ends_at < starts_at {
                bail!("end_date cannot be before start_date");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_classifier() -> FestivalClassifier {
        FestivalClassifier::new(FixedOffset::east_opt(0).unwrap())
    }

    fn seoul_classifier() -> FestivalClassifier {
        FestivalClassifier::new(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn festival(id: i64, start: &str, end: Option<&str>, kind: FestivalKind) -> Festival {
        Festival {
            id,
            name: format!("Festival {}", id),
            location: "Seoul".to_string(),
            start_date: start.to_string(),
            end_date: end.map(|s| s.to_string()),
            kind: Some(kind),
            description: None,
            poster_url: None,
            ticket_url: None,
            created_at: at("2026-01-01T00:00:00Z"),
        }
    }

    fn ids(listing: &TabListing) -> Vec<i64> {
        listing.festivals.iter().map(|f| f.festival.id).collect()
    }

    #[test]
    fn classifies_reference_instants() {
        let now = at("2026-03-10T12:00:00Z");
        for classifier in [utc_classifier(), seoul_classifier()] {
            let ongoing = festival(
                1,
                "2026-03-10T09:00:00Z",
                Some("2026-03-10T18:00:00Z"),
                FestivalKind::External,
            );
            let status = classifier.classify(&ongoing, now).unwrap();
            assert_eq!(status.phase, FestivalPhase::Ongoing);
            assert_eq!(status.d_day, "NOW");

            let ended = festival(
                2,
                "2026-03-10T09:00:00Z",
                Some("2026-03-09T18:00:00Z"),
                FestivalKind::External,
            );
            let status = classifier.classify(&ended, now).unwrap();
            assert_eq!(status.phase, FestivalPhase::Ended);
            assert_eq!(status.d_day, "END");

            let upcoming = festival(3, "2026-03-15T00:00:00Z", None, FestivalKind::External);
            let status = classifier.classify(&upcoming, now).unwrap();
            assert_eq!(status.phase, FestivalPhase::Upcoming);
            assert_eq!(status.d_day, "D-5");
        }
    }

    #[test]
    fn missing_end_falls_back_to_end_of_local_day() {
        let classifier = seoul_classifier();
        // 10:00 in Seoul on March 10th.
        let fest = festival(1, "2026-03-10T01:00:00Z", None, FestivalKind::School);

        let status = classifier
            .classify(&fest, at("2026-03-10T14:59:59Z"))
            .unwrap();
        assert_eq!(status.phase, FestivalPhase::Ongoing);
        assert_eq!(status.effective_end, at("2026-03-10T14:59:59.999Z"));

        // Midnight in Seoul.
        let status = classifier
            .classify(&fest, at("2026-03-10T15:00:00Z"))
            .unwrap();
        assert_eq!(status.phase, FestivalPhase::Ended);
    }

    #[test]
    fn explicit_end_is_inclusive() {
        let classifier = utc_classifier();
        let fest = festival(
            1,
            "2026-03-10T09:00:00Z",
            Some("2026-03-10T18:00:00Z"),
            FestivalKind::External,
        );
        let status = classifier.classify(&fest, at("2026-03-10T18:00:00Z")).unwrap();
        assert_eq!(status.phase, FestivalPhase::Ongoing);

        let status = classifier.classify(&fest, at("2026-03-10T09:00:00Z")).unwrap();
        assert_eq!(status.phase, FestivalPhase::Ongoing);
    }

    #[test]
    fn d_day_on_the_same_local_day() {
        let classifier = seoul_classifier();
        // 08:00 Seoul, festival at 19:00 Seoul the same day.
        let fest = festival(1, "2026-05-01T10:00:00Z", None, FestivalKind::School);
        let status = classifier.classify(&fest, at("2026-04-30T23:00:00Z")).unwrap();
        assert_eq!(status.phase, FestivalPhase::Upcoming);
        assert_eq!(status.d_day, "D-Day");
    }

    #[test]
    fn d_day_rounds_partial_days_up() {
        let classifier = utc_classifier();
        let fest = festival(1, "2026-05-02T01:00:00Z", None, FestivalKind::School);
        let status = classifier.classify(&fest, at("2026-05-01T23:00:00Z")).unwrap();
        assert_eq!(status.d_day, "D-1");

        let status = classifier.classify(&fest, at("2026-04-29T01:00:00Z")).unwrap();
        assert_eq!(status.d_day, "D-3");
    }

    #[test]
    fn parses_naive_timestamps_in_local_offset() {
        let classifier = seoul_classifier();
        assert_eq!(
            classifier.parse_timestamp("2026-03-10T09:00"),
            Some(at("2026-03-10T00:00:00Z"))
        );
        assert_eq!(
            classifier.parse_timestamp("2026-03-10 09:00:00"),
            Some(at("2026-03-10T00:00:00Z"))
        );
        assert_eq!(
            classifier.parse_timestamp("2026-03-10"),
            Some(at("2026-03-09T15:00:00Z"))
        );
        assert_eq!(
            classifier.parse_timestamp("2026-03-10 09:00:00+00"),
            Some(at("2026-03-10T09:00:00Z"))
        );
        assert_eq!(classifier.parse_timestamp("next friday"), None);
        assert_eq!(classifier.parse_timestamp(""), None);
    }

    #[test]
    fn unparseable_start_is_a_data_error() {
        let classifier = utc_classifier();
        let fest = festival(42, "soon", None, FestivalKind::External);
        assert_eq!(
            classifier.classify(&fest, at("2026-03-10T12:00:00Z")),
            Err(DataError::InvalidStartDate {
                festival_id: 42,
                value: "soon".to_string()
            })
        );
    }

    #[test]
    fn unparseable_end_is_a_data_error() {
        let classifier = utc_classifier();
        let fest = festival(7, "2026-03-10", Some("later"), FestivalKind::External);
        assert!(matches!(
            classifier.classify(&fest, at("2026-03-10T12:00:00Z")),
            Err(DataError::InvalidEndDate { festival_id: 7, .. })
        ));
    }

    #[test]
    fn upcoming_tab_puts_school_festivals_first() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        let festivals = vec![
            festival(1, "2026-03-12T00:00:00Z", None, FestivalKind::External),
            festival(2, "2026-04-01T00:00:00Z", None, FestivalKind::School),
            festival(3, "2026-03-20T00:00:00Z", None, FestivalKind::School),
            festival(4, "2026-03-11T00:00:00Z", None, FestivalKind::External),
        ];

        let listing = classifier.listing_order(&festivals, FestivalPhase::Upcoming, now);
        assert_eq!(ids(&listing), vec![3, 2, 4, 1]);
        assert!(listing.rejected.is_empty());
    }

    #[test]
    fn ended_tab_lists_most_recent_start_first() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        let festivals = vec![
            festival(1, "2026-01-01", None, FestivalKind::School),
            festival(2, "2026-03-01", None, FestivalKind::External),
            festival(3, "2026-02-01", None, FestivalKind::School),
            festival(4, "2026-03-20", None, FestivalKind::School),
        ];

        let listing = classifier.listing_order(&festivals, FestivalPhase::Ended, now);
        assert_eq!(ids(&listing), vec![2, 3, 1]);
    }

    #[test]
    fn ongoing_tab_keeps_input_order() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        let festivals = vec![
            festival(1, "2026-03-10T10:00:00Z", None, FestivalKind::External),
            festival(2, "2026-03-09T00:00:00Z", Some("2026-03-11T00:00:00Z"), FestivalKind::School),
            festival(3, "2026-03-10T11:00:00Z", None, FestivalKind::School),
        ];

        let listing = classifier.listing_order(&festivals, FestivalPhase::Ongoing, now);
        assert_eq!(ids(&listing), vec![1, 2, 3]);
    }

    #[test]
    fn malformed_festivals_are_excluded_from_every_tab() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        let festivals = vec![
            festival(1, "tbd", None, FestivalKind::School),
            festival(2, "2026-03-20", None, FestivalKind::School),
        ];

        for tab in [FestivalPhase::Upcoming, FestivalPhase::Ongoing, FestivalPhase::Ended] {
            let listing = classifier.listing_order(&festivals, tab, now);
            assert!(!ids(&listing).contains(&1));
            assert_eq!(listing.rejected.len(), 1);
        }
    }

    #[test]
    fn empty_input_gives_empty_tabs() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        for tab in [FestivalPhase::Upcoming, FestivalPhase::Ongoing, FestivalPhase::Ended] {
            let listing = classifier.listing_order(&[], tab, now);
            assert!(listing.festivals.is_empty());
            assert!(listing.rejected.is_empty());
        }
    }

    #[test]
    fn validates_new_festival_dates() {
        let classifier = utc_classifier();
        let mut new_festival = NewFestival {
            name: "Spring".to_string(),
            location: "Campus".to_string(),
            start_date: "2026-05-01".to_string(),
            end_date: Some("2026-05-03".to_string()),
            kind: FestivalKind::School,
            description: None,
            poster_url: None,
            ticket_url: None,
        };
        assert!(new_festival.validate(&classifier).is_ok());

        new_festival.end_date = Some("2026-04-30".to_string());
        assert!(new_festival.validate(&classifier).is_err());

        new_festival.end_date = None;
        new_festival.start_date = "whenever".to_string();
        assert!(new_festival.validate(&classifier).is_err());

        new_festival.start_date = "+262142-12-31".to_string();
        assert!(new_festival.validate(&classifier).is_err());
    }

    #[test]
    fn far_out_dates_are_rejected_at_every_offset() {
        let now = at("2026-03-10T12:00:00Z");
        for offset_hours in [-12, 0, 14] {
            let classifier =
                FestivalClassifier::new(FixedOffset::east_opt(offset_hours * 3600).unwrap());

            for raw in ["+262142-12-31T23:59:59.999+00:00", "+262142-12-31", "10000-01-01"] {
                let far = festival(1, raw, None, FestivalKind::External);
                assert_eq!(
                    classifier.classify(&far, now),
                    Err(DataError::InvalidStartDate {
                        festival_id: 1,
                        value: raw.to_string(),
                    })
                );
            }

            let far_end = festival(2, "2026-03-01", Some("+262142-12-31"), FestivalKind::School);
            assert!(matches!(
                classifier.classify(&far_end, now),
                Err(DataError::InvalidEndDate { festival_id: 2, .. })
            ));

            let listing = classifier.listing_order(
                &[
                    festival(1, "+262142-12-31", None, FestivalKind::External),
                    festival(3, "2026-03-20", None, FestivalKind::School),
                ],
                FestivalPhase::Upcoming,
                now,
            );
            assert_eq!(ids(&listing), vec![3]);
            assert_eq!(listing.rejected.len(), 1);
        }
    }

    #[test]
    fn end_of_calendar_day_stops_at_the_last_representable_day() {
        let classifier = utc_classifier();
        assert_eq!(
            classifier.end_of_calendar_day(NaiveDateTime::MAX.and_utc()),
            None
        );
        assert_eq!(
            classifier.end_of_calendar_day(at("9999-12-31T10:00:00Z")),
            Some(at("9999-12-31T23:59:59.999Z"))
        );
        assert_eq!(
            seoul_classifier().end_of_calendar_day(at("2026-03-10T15:00:00Z")),
            Some(at("2026-03-11T14:59:59.999Z"))
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let classifier = utc_classifier();
        let now = at("2026-03-10T12:00:00Z");
        let mut club = festival(4, "2026-03-20", None, FestivalKind::External);
        club.kind = None;

        assert_eq!(
            classifier.classify(&club, now),
            Err(DataError::UnknownFestivalType { festival_id: 4 })
        );
        let listing = classifier.listing_order(&[club], FestivalPhase::Upcoming, now);
        assert!(listing.festivals.is_empty());
        assert_eq!(listing.rejected.len(), 1);
    }
}
