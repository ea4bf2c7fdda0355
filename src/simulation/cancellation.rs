use crate::airport::{Airport, AirportId};
use crate::error::ParseError;
use crate::flight::{FlightTemplate, InstanceId, instance_id};
use crate::simulation::event::{Event, EventKind};
use crate::simulation::store::TimelineStore;
use crate::time::{Period, Time, parse_hhmm};
use chrono::{NaiveTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// `dd.ORIG-DEST-HH:MM`: the day of the period and the origin-local
/// departure of the cancelled leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationRecord {
    pub day: u32,
    pub origin_id: AirportId,
    pub destination_id: AirportId,
    pub departure: u32,
}

impl FromStr for CancellationRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::Cancellation(s.to_string());
        let (day, rest) = s.trim().split_once('.').ok_or_else(err)?;
        let mut parts = rest.splitn(3, '-');
        let (Some(origin), Some(destination), Some(hhmm)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(err());
        };
        let day = day.trim().parse::<u32>().map_err(|_| err())?;
        if day == 0 || day > 31 || origin.is_empty() || destination.is_empty() {
            return Err(err());
        }
        Ok(CancellationRecord {
            day,
            origin_id: Arc::from(origin.trim()),
            destination_id: Arc::from(destination.trim()),
            departure: parse_hhmm(hhmm).map_err(|_| err())?,
        })
    }
}

impl Display for CancellationRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}.{}-{}-{:02}:{:02}",
            self.day,
            self.origin_id,
            self.destination_id,
            self.departure / 60,
            self.departure % 60
        )
    }
}

/// One record per line; blank lines and `#` comments are skipped.
pub fn parse_cancellations(text: &str) -> Result<Vec<CancellationRecord>, ParseError> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::parse)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancellationSummary {
    /// Load and arrival events already in the timeline that ride a newly cancelled instance.
    pub affected: usize,
    pub cancelled: Vec<InstanceId>,
    pub unresolved: Vec<CancellationRecord>,
    pub version: u64,
}

/// Appends cancellation events. Committed capacity is left untouched;
/// recovering stranded goods is up to the replanner.
pub struct CancellationProcessor<'a> {
    store: &'a TimelineStore,
    airports: &'a HashMap<AirportId, Airport>,
    templates: &'a [FlightTemplate],
    period: Period,
}

impl<'a> CancellationProcessor<'a> {
    pub fn new(
        store: &'a TimelineStore,
        airports: &'a HashMap<AirportId, Airport>,
        templates: &'a [FlightTemplate],
        period: Period,
    ) -> CancellationProcessor<'a> {
        CancellationProcessor {
            store,
            airports,
            templates,
            period,
        }
    }

    /// Instance id and UTC departure the record refers to, if its template exists.
    pub fn resolve(&self, record: &CancellationRecord) -> Option<(InstanceId, Time)> {
        if !self
            .templates
            .iter()
            .any(|t| t.matches(&record.origin_id, &record.destination_id, record.departure))
        {
            return None;
        }
        let origin = self.airports.get(&record.origin_id)?;
        let date = self.period.date(record.day)?;
        let local = date.and_time(NaiveTime::from_hms_opt(record.departure / 60, record.departure % 60, 0)?);
        let at = origin.zone().from_local_datetime(&local).single()?.with_timezone(&Utc);
        Some((
            instance_id(&record.origin_id, &record.destination_id, record.departure, date),
            Time::from_utc(at),
        ))
    }

    pub fn apply(&self, records: &[CancellationRecord]) -> CancellationSummary {
        let base = self.store.events();
        let mut seen = base
            .iter()
            .filter(|e| e.kind == EventKind::Cancellation)
            .filter_map(|e| e.flight_id.clone())
            .collect::<HashSet<_>>();

        let mut unresolved = Vec::new();
        let mut events = Vec::new();
        for record in records {
            match self.resolve(record) {
                Some((id, at)) => {
                    if seen.insert(id.clone()) {
                        events.push(Event::cancellation(at, &id, &record.origin_id));
                    }
                }
                None => {
                    warn!(record = %record, "cancellation does not match any scheduled leg");
                    unresolved.push(record.clone());
                }
            }
        }

        let cancelled = events.iter().filter_map(|e| e.flight_id.clone()).collect::<Vec<_>>();
        let ids = cancelled.iter().collect::<HashSet<_>>();
        let affected = base
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Load | EventKind::Arrival))
            .filter(|e| e.flight_id.as_ref().is_some_and(|f| ids.contains(f)))
            .count();

        let version = if events.is_empty() {
            self.store.version()
        } else {
            self.store.append(events)
        };
        info!(
            cancelled = cancelled.len(),
            affected,
            unresolved = unresolved.len(),
            version,
            "cancellations applied"
        );
        CancellationSummary {
            affected,
            cancelled,
            unresolved,
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let r: CancellationRecord = "03.SKBO-SEQM-07:05".parse().unwrap();
        assert_eq!(3, r.day);
        assert_eq!("SKBO", &*r.origin_id);
        assert_eq!("SEQM", &*r.destination_id);
        assert_eq!(7 * 60 + 5, r.departure);
        assert_eq!("03.SKBO-SEQM-07:05", r.to_string());
    }

    #[test]
    fn test_parse_rejects_malformed_records() {
        for bad in ["", "SKBO-SEQM-07:05", "00.SKBO-SEQM-07:05", "03.SKBO-07:05", "03.SKBO-SEQM-7", "xx.SKBO-SEQM-07:05"] {
            assert_eq!(
                Err(ParseError::Cancellation(bad.to_string())),
                bad.parse::<CancellationRecord>(),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_file_skips_comments() {
        let text = "# day.orig-dest-hh:mm\n01.SKBO-SEQM-03:34\n\n  02.SEQM-SKBO-14:10  \n";
        let records = parse_cancellations(text).unwrap();
        assert_eq!(2, records.len());
        assert_eq!(2, records[1].day);
        assert!(parse_cancellations("01.SKBO-SEQM-03:34\nnonsense").is_err());
    }
}
