//! Typed facility-booking requests.
//!
//! Each request maps to one operation code and a comma-separated payload
//! understood by the facility server.

use chrono::{NaiveTime, TimeDelta, Timelike, Weekday};

use crate::envelope::Operation;

/// A bookable interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self { day, start, end }
    }

    /// Moves both ends by `offset`. Returns `None` if either end would leave
    /// the day.
    pub fn shifted(&self, offset: TimeDelta) -> Option<Self> {
        let (start, start_wrap) = self.start.overflowing_add_signed(offset);
        let (end, end_wrap) = self.end.overflowing_add_signed(offset);
        if start_wrap != 0 || end_wrap != 0 {
            return None;
        }
        Some(Self {
            day: self.day,
            start,
            end,
        })
    }
}

/// Requests understood by the facility server.
#[derive(Debug, Clone, PartialEq)]
pub enum FacilityRequest {
    /// Names of every facility.
    FacilityNames,
    /// Free slots of a facility on the given days.
    Availability { facility: String, days: Vec<Weekday> },
    Book { facility: String, slot: TimeSlot },
    QueryBooking { booking_id: String },
    /// Replaces a booking with the given (already shifted) slot.
    UpdateBooking {
        booking_id: String,
        facility: String,
        slot: TimeSlot,
    },
    DeleteBooking { booking_id: String, facility: String },
    /// Registers for availability updates over `duration_secs`.
    Monitor { facility: String, duration_secs: u64 },
    Rate { facility: String, rating: f32 },
    QueryRating { facility: String },
    Echo { text: String },
}

impl FacilityRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::FacilityNames
            | Self::Availability { .. }
            | Self::QueryBooking { .. }
            | Self::QueryRating { .. } => Operation::Read,
            Self::Book { .. } => Operation::Write,
            Self::UpdateBooking { .. } | Self::Rate { .. } => Operation::Update,
            Self::DeleteBooking { .. } => Operation::Delete,
            Self::Monitor { .. } => Operation::Monitor,
            Self::Echo { .. } => Operation::Echo,
        }
    }

    /// Payload text sent in the envelope.
    pub fn payload(&self) -> String {
        match self {
            Self::FacilityNames => "facility,ALL".to_owned(),
            Self::Availability { facility, days } => {
                let mut payload = format!("facility,{facility}");
                for day in days {
                    payload.push(',');
                    payload.push_str(day_name(*day));
                }
                payload
            }
            // Booking times are zero-padded, updates are not.
            Self::Book { facility, slot } => format!(
                "{facility},{},{:02},{:02},{:02},{:02}",
                day_name(slot.day),
                slot.start.hour(),
                slot.start.minute(),
                slot.end.hour(),
                slot.end.minute()
            ),
            Self::QueryBooking { booking_id } => format!("booking,{booking_id}"),
            Self::UpdateBooking {
                booking_id,
                facility,
                slot,
            } => format!(
                "booking,{booking_id},{facility},{},{},{},{},{}",
                day_name(slot.day),
                slot.start.hour(),
                slot.start.minute(),
                slot.end.hour(),
                slot.end.minute()
            ),
            Self::DeleteBooking {
                booking_id,
                facility,
            } => format!("{booking_id},{facility}"),
            Self::Monitor {
                facility,
                duration_secs,
            } => format!("register,{facility},{duration_secs}"),
            Self::Rate { facility, rating } => format!("rating,{facility},{rating:.6}"),
            Self::QueryRating { facility } => format!("rating,{facility}"),
            Self::Echo { text } => text.clone(),
        }
    }
}

/// Upper-case English day name used on the wire.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot() -> TimeSlot {
        TimeSlot::new(Weekday::Tue, time(9, 5), time(11, 0))
    }

    #[test]
    fn payloads() {
        let requests = [
            FacilityRequest::FacilityNames,
            FacilityRequest::Availability {
                facility: "LT1".into(),
                days: vec![Weekday::Mon, Weekday::Sun],
            },
            FacilityRequest::Book {
                facility: "LT1".into(),
                slot: slot(),
            },
            FacilityRequest::QueryBooking {
                booking_id: "42".into(),
            },
            FacilityRequest::UpdateBooking {
                booking_id: "42".into(),
                facility: "LT1".into(),
                slot: slot(),
            },
            FacilityRequest::DeleteBooking {
                booking_id: "42".into(),
                facility: "LT1".into(),
            },
            FacilityRequest::Monitor {
                facility: "LT1".into(),
                duration_secs: 90,
            },
            FacilityRequest::Rate {
                facility: "LT1".into(),
                rating: 4.5,
            },
            FacilityRequest::QueryRating {
                facility: "LT1".into(),
            },
            FacilityRequest::Echo {
                text: "hello, server".into(),
            },
        ];
        let rendered = requests
            .iter()
            .map(|r| format!("{} {}", r.operation(), r.payload()))
            .collect::<Vec<_>>()
            .join("\n");

        insta::assert_snapshot!(rendered, @r"
        READ facility,ALL
        READ facility,LT1,MONDAY,SUNDAY
        WRITE LT1,TUESDAY,09,05,11,00
        READ booking,42
        UPDATE booking,42,LT1,TUESDAY,9,5,11,0
        DELETE 42,LT1
        MONITOR register,LT1,90
        UPDATE rating,LT1,4.500000
        READ rating,LT1
        ECHO hello, server
        ");
    }

    #[test]
    fn availability_without_days() {
        let request = FacilityRequest::Availability {
            facility: "Gym".into(),
            days: Vec::new(),
        };
        assert_eq!(request.payload(), "facility,Gym");
    }

    #[test]
    fn shift_within_the_day() {
        let later = slot().shifted(TimeDelta::minutes(70)).unwrap();
        assert_eq!(later.start, time(10, 15));
        assert_eq!(later.end, time(12, 10));
        assert_eq!(later.day, Weekday::Tue);

        let earlier = slot().shifted(TimeDelta::minutes(-65)).unwrap();
        assert_eq!(earlier.start, time(8, 0));
    }

    #[test]
    fn shift_across_midnight_is_refused() {
        assert_eq!(slot().shifted(TimeDelta::hours(13)), None);
        assert_eq!(slot().shifted(TimeDelta::hours(-10)), None);
    }
}
