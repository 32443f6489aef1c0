//! Facility booking commands.

use std::time::Duration;

use chrono::TimeDelta;
use facility_protocol::{FacilityRequest, TimeSlot};
use tracing::info;

use crate::cli::Command;
use crate::error::{ClientError, ClientResult};
use crate::rpc::{MonitorEvent, RpcClient};
use crate::transport::Transport;

/// Builds the request for a one-shot command.
///
/// Returns `None` for commands that do not map to a single request
/// (`monitor`, `config`).
pub fn build_request(command: &Command) -> ClientResult<Option<FacilityRequest>> {
    let request = match command {
        Command::Names => FacilityRequest::FacilityNames,
        Command::Availability { facility, days } => FacilityRequest::Availability {
            facility: facility.clone(),
            days: days.clone(),
        },
        Command::Book {
            facility,
            day,
            start,
            end,
        } => FacilityRequest::Book {
            facility: facility.clone(),
            slot: slot(*day, *start, *end)?,
        },
        Command::Booking { id } => FacilityRequest::QueryBooking {
            booking_id: id.clone(),
        },
        Command::Update {
            id,
            facility,
            day,
            start,
            end,
            offset,
        } => {
            let current = slot(*day, *start, *end)?;
            let shifted = TimeDelta::try_minutes(*offset)
                .and_then(|delta| current.shifted(delta))
                .ok_or_else(|| {
                    ClientError::InvalidArgument(format!(
                        "shifting by {offset} minutes leaves the day"
                    ))
                })?;
            FacilityRequest::UpdateBooking {
                booking_id: id.clone(),
                facility: facility.clone(),
                slot: shifted,
            }
        }
        Command::Delete { id, facility } => FacilityRequest::DeleteBooking {
            booking_id: id.clone(),
            facility: facility.clone(),
        },
        Command::Rate { facility, rating } => FacilityRequest::Rate {
            facility: facility.clone(),
            rating: *rating,
        },
        Command::Rating { facility } => FacilityRequest::QueryRating {
            facility: facility.clone(),
        },
        Command::Echo { text } => FacilityRequest::Echo { text: text.join(" ") },
        Command::Monitor { .. } | Command::Config { .. } => return Ok(None),
    };
    Ok(Some(request))
}

fn slot(
    day: chrono::Weekday,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> ClientResult<TimeSlot> {
    if start >= end {
        return Err(ClientError::InvalidArgument(format!(
            "start {start} is not before end {end}"
        )));
    }
    Ok(TimeSlot::new(day, start, end))
}

/// Sends one request and prints the reply payload.
pub async fn execute<T: Transport>(
    client: &mut RpcClient<T>,
    request: &FacilityRequest,
) -> ClientResult<()> {
    let reply = client.request(request).await?;
    println!("{reply}");
    Ok(())
}

/// Registers for updates on `facility` and prints them until `duration` ends.
pub async fn monitor<T: Transport>(
    client: &mut RpcClient<T>,
    facility: &str,
    duration: Duration,
) -> ClientResult<()> {
    let outcome = client
        .monitor(facility, duration, |event| match event {
            MonitorEvent::Registered(text) => println!("{text}"),
            MonitorEvent::Update(text) => println!("update: {text}"),
        })
        .await?;
    info!(
        accepted = outcome.accepted,
        updates = outcome.updates,
        "monitoring finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn request(args: &[&str]) -> ClientResult<Option<FacilityRequest>> {
        let cli = Cli::try_parse_from(std::iter::once("facility").chain(args.iter().copied()))
            .unwrap();
        build_request(&cli.command)
    }

    fn payload(args: &[&str]) -> String {
        request(args).unwrap().unwrap().payload()
    }

    #[test]
    fn commands_map_to_payloads() {
        assert_eq!(payload(&["names"]), "facility,ALL");
        assert_eq!(
            payload(&["availability", "LT1", "mon", "wed"]),
            "facility,LT1,MONDAY,WEDNESDAY"
        );
        assert_eq!(
            payload(&["book", "LT1", "fri", "0800", "0930"]),
            "LT1,FRIDAY,08,00,09,30"
        );
        assert_eq!(payload(&["booking", "12"]), "booking,12");
        assert_eq!(payload(&["delete", "12", "LT1"]), "12,LT1");
        assert_eq!(payload(&["rate", "LT1", "3"]), "rating,LT1,3.000000");
        assert_eq!(payload(&["rating", "LT1"]), "rating,LT1");
        assert_eq!(payload(&["echo", "hello", "there"]), "hello there");
    }

    #[test]
    fn update_shifts_the_slot() {
        assert_eq!(
            payload(&["update", "12", "LT1", "mon", "0900", "1000", "--offset", "-45"]),
            "booking,12,LT1,MONDAY,8,15,9,15"
        );
    }

    #[test]
    fn update_past_midnight_is_rejected() {
        let err = request(&["update", "12", "LT1", "mon", "2200", "2330", "--offset", "60"])
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn inverted_slot_is_rejected() {
        assert!(request(&["book", "LT1", "mon", "1000", "0900"]).is_err());
    }

    #[test]
    fn monitor_and_config_have_no_single_request() {
        assert_eq!(request(&["monitor", "LT1"]).unwrap(), None);
        assert_eq!(request(&["config", "path"]).unwrap(), None);
    }
}
