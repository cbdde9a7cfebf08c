//! Maps wire commands onto the slot engine

use slotkeeper_api::{
    API_VERSION, CalendarSnapshot, ClientInfo, Command, DEFAULT_SEARCH_COUNT, ErrorCode, ErrorInfo,
    EventPayload, HealthStatus, Response, ResponsePayload, SlotView,
};
use slotkeeper_core::{Booking, Slot, SlotEngine, SlotKey};
use slotkeeper_util::{format_date, parse_date, parse_time_of_day, today};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What a command produced: the reply for the caller and, when the calendar
/// changed, the event to broadcast.
pub struct Dispatch {
    pub response: Response,
    pub event: Option<EventPayload>,
}

impl Dispatch {
    fn reply(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            response: Response::success(request_id, payload),
            event: None,
        }
    }

    fn changed(request_id: u64, payload: ResponsePayload, event: EventPayload) -> Self {
        Self {
            response: Response::success(request_id, payload),
            event: Some(event),
        }
    }

    fn error(request_id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            response: Response::error(request_id, ErrorInfo::new(code, message)),
            event: None,
        }
    }
}

pub async fn handle_command(
    engine: &RwLock<SlotEngine>,
    client: &ClientInfo,
    request_id: u64,
    command: Command,
) -> Dispatch {
    match command {
        Command::FindSlots { date, desired, count } => {
            let date = match date.filter(|d| !d.trim().is_empty()) {
                Some(d) => match parse_date(&d) {
                    Ok(date) => date,
                    Err(e) => return Dispatch::error(request_id, ErrorCode::InvalidRequest, e.to_string()),
                },
                None => today(),
            };
            let desired = match parse_time_of_day(&desired) {
                Ok(t) => t,
                Err(e) => return Dispatch::error(request_id, ErrorCode::InvalidRequest, e.to_string()),
            };
            let count = search_count(count);

            let slots = engine.read().await.find_closest(date, desired, count);
            Dispatch::reply(request_id, ResponsePayload::Slots { slots: views(&slots) })
        }

        Command::Book {
            date,
            start_time,
            client: name,
            description,
            advisor,
        } => {
            let date = date_or_today(date);
            let booking = Booking::new(
                name.unwrap_or_default(),
                description.unwrap_or_default(),
                advisor.unwrap_or_default(),
            );

            match engine.read().await.book_slot(&date, &start_time, booking) {
                Some(slot) => Dispatch::changed(
                    request_id,
                    ResponsePayload::Booked,
                    EventPayload::SlotBooked { slot: slot.to_view() },
                ),
                None => Dispatch::error(
                    request_id,
                    ErrorCode::Conflict,
                    "Failed to book: slot not found or already booked",
                ),
            }
        }

        Command::Cancel {
            date,
            start_time,
            client: name,
        } => {
            if start_time.trim().is_empty() || name.trim().is_empty() {
                return Dispatch::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "start_time and client are required",
                );
            }
            let date = date_or_today(date);

            if !engine.read().await.cancel(&date, &start_time, &name) {
                return Dispatch::error(
                    request_id,
                    ErrorCode::Conflict,
                    "Failed to cancel: no matching booking",
                );
            }

            match SlotKey::parse(&date, &start_time) {
                Ok(key) => Dispatch::changed(
                    request_id,
                    ResponsePayload::Cancelled,
                    EventPayload::SlotCancelled {
                        date: key.date,
                        start_time: key.start,
                    },
                ),
                Err(_) => Dispatch::reply(request_id, ResponsePayload::Cancelled),
            }
        }

        Command::GetCalendar => {
            let engine = engine.read().await;
            let snapshot = CalendarSnapshot {
                api_version: API_VERSION,
                first_day: engine.first_day(),
                horizon_days: engine.config().horizon_days,
                slots: views(&engine.snapshot()),
            };
            Dispatch::reply(request_id, ResponsePayload::Calendar(snapshot))
        }

        Command::ResetCalendar => {
            if !client.role.can_reset_calendar() {
                warn!(client_id = %client.client_id, uid = ?client.uid, "Calendar reset refused");
                return Dispatch::error(
                    request_id,
                    ErrorCode::PermissionDenied,
                    "Resetting the calendar requires admin role",
                );
            }

            let slot_count = {
                let mut engine = engine.write().await;
                engine.initialize();
                engine.len()
            };
            info!(client_id = %client.client_id, slot_count, "Calendar reset");

            Dispatch::changed(
                request_id,
                ResponsePayload::CalendarReset { slot_count },
                EventPayload::CalendarReset { slot_count },
            )
        }

        Command::SubscribeEvents => {
            debug!(client_id = %client.client_id, "Client subscribed to events");
            Dispatch::reply(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client.client_id.clone(),
                },
            )
        }

        Command::UnsubscribeEvents => {
            debug!(client_id = %client.client_id, "Client unsubscribed from events");
            Dispatch::reply(request_id, ResponsePayload::Unsubscribed)
        }

        Command::GetHealth => {
            let engine = engine.read().await;
            let slot_count = engine.len();
            Dispatch::reply(
                request_id,
                ResponsePayload::Health(HealthStatus {
                    live: true,
                    ready: slot_count > 0,
                    slot_count,
                    booked_count: engine.booked_count(),
                }),
            )
        }

        Command::Ping => Dispatch::reply(request_id, ResponsePayload::Pong),
    }
}

/// Absent or blank means today
fn date_or_today(date: Option<String>) -> String {
    match date {
        Some(d) if !d.trim().is_empty() => d,
        _ => format_date(today()),
    }
}

/// Absent or non-positive counts fall back to the default
fn search_count(count: Option<i64>) -> usize {
    match count {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => DEFAULT_SEARCH_COUNT,
    }
}

fn views(slots: &[Slot]) -> Vec<SlotView> {
    slots.iter().map(Slot::to_view).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use slotkeeper_api::{ClientRole, ResponseResult};
    use slotkeeper_config::CalendarConfig;

    fn engine() -> RwLock<SlotEngine> {
        let mut engine = SlotEngine::new(CalendarConfig::default());
        engine.initialize();
        RwLock::new(engine)
    }

    fn client() -> ClientInfo {
        ClientInfo::new(ClientRole::Client)
    }

    fn ok(dispatch: &Dispatch) -> &ResponsePayload {
        match &dispatch.response.result {
            ResponseResult::Ok(payload) => payload,
            ResponseResult::Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    fn err_code(dispatch: &Dispatch) -> ErrorCode {
        match &dispatch.response.result {
            ResponseResult::Err(e) => e.code,
            ResponseResult::Ok(p) => panic!("unexpected success: {:?}", p),
        }
    }

    fn book(start_time: &str, name: &str) -> Command {
        Command::Book {
            date: None,
            start_time: start_time.into(),
            client: Some(name.into()),
            description: Some("Consultation".into()),
            advisor: None,
        }
    }

    #[test]
    fn test_search_count() {
        assert_eq!(search_count(None), DEFAULT_SEARCH_COUNT);
        assert_eq!(search_count(Some(0)), DEFAULT_SEARCH_COUNT);
        assert_eq!(search_count(Some(-3)), DEFAULT_SEARCH_COUNT);
        assert_eq!(search_count(Some(2)), 2);
    }

    #[test]
    fn test_date_or_today() {
        let today = format_date(today());
        assert_eq!(date_or_today(None), today);
        assert_eq!(date_or_today(Some("  ".into())), today);
        assert_eq!(date_or_today(Some("2025-03-14".into())), "2025-03-14");
    }

    #[tokio::test]
    async fn test_find_slots_defaults() {
        let engine = engine();
        let command = Command::FindSlots {
            date: None,
            desired: "09:07".into(),
            count: None,
        };
        let dispatch = handle_command(&engine, &client(), 1, command).await;

        let ResponsePayload::Slots { slots } = ok(&dispatch) else {
            panic!("expected slots");
        };
        assert_eq!(slots.len(), DEFAULT_SEARCH_COUNT);
        assert!(dispatch.event.is_none());
    }

    #[tokio::test]
    async fn test_find_slots_bad_input() {
        let engine = engine();
        let bad_time = Command::FindSlots {
            date: None,
            desired: "noon".into(),
            count: Some(1),
        };
        let dispatch = handle_command(&engine, &client(), 1, bad_time).await;
        assert_eq!(err_code(&dispatch), ErrorCode::InvalidRequest);

        let bad_date = Command::FindSlots {
            date: Some("14/03/2025".into()),
            desired: "10:00".into(),
            count: Some(1),
        };
        let dispatch = handle_command(&engine, &client(), 2, bad_date).await;
        assert_eq!(err_code(&dispatch), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_book_then_conflict() {
        let engine = engine();

        let dispatch = handle_command(&engine, &client(), 1, book("10:00", "Alice")).await;
        assert!(matches!(ok(&dispatch), ResponsePayload::Booked));
        match &dispatch.event {
            Some(EventPayload::SlotBooked { slot }) => {
                assert!(slot.booked);
                assert_eq!(slot.client, "Alice");
                assert_eq!(slot.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
                assert_eq!(slot.description, "Consultation");
                assert_eq!(slot.advisor, "");
            }
            other => panic!("expected SlotBooked, got {:?}", other),
        }

        let dispatch = handle_command(&engine, &client(), 2, book("10:00", "Carol")).await;
        assert_eq!(err_code(&dispatch), ErrorCode::Conflict);
        assert!(dispatch.event.is_none());
    }

    #[tokio::test]
    async fn test_book_missing_client_conflicts() {
        let engine = engine();
        let command = Command::Book {
            date: None,
            start_time: "10:00".into(),
            client: None,
            description: None,
            advisor: None,
        };
        let dispatch = handle_command(&engine, &client(), 1, command).await;
        assert_eq!(err_code(&dispatch), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_cancel_flow() {
        let engine = engine();
        handle_command(&engine, &client(), 1, book("11:00", "Alice")).await;

        let blank = Command::Cancel {
            date: None,
            start_time: "11:00".into(),
            client: " ".into(),
        };
        let dispatch = handle_command(&engine, &client(), 2, blank).await;
        assert_eq!(err_code(&dispatch), ErrorCode::InvalidRequest);

        let stranger = Command::Cancel {
            date: None,
            start_time: "11:00".into(),
            client: "Mallory".into(),
        };
        let dispatch = handle_command(&engine, &client(), 3, stranger).await;
        assert_eq!(err_code(&dispatch), ErrorCode::Conflict);

        let owner = Command::Cancel {
            date: None,
            start_time: "11:00".into(),
            client: "Alice".into(),
        };
        let dispatch = handle_command(&engine, &client(), 4, owner).await;
        assert!(matches!(ok(&dispatch), ResponsePayload::Cancelled));
        assert!(matches!(dispatch.event, Some(EventPayload::SlotCancelled { .. })));
        assert_eq!(engine.read().await.booked_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_requires_admin() {
        let engine = engine();
        handle_command(&engine, &client(), 1, book("12:00", "Alice")).await;

        let dispatch = handle_command(&engine, &client(), 2, Command::ResetCalendar).await;
        assert_eq!(err_code(&dispatch), ErrorCode::PermissionDenied);
        assert_eq!(engine.read().await.booked_count(), 1);

        let admin = ClientInfo::new(ClientRole::Admin);
        let dispatch = handle_command(&engine, &admin, 3, Command::ResetCalendar).await;
        assert!(matches!(ok(&dispatch), ResponsePayload::CalendarReset { slot_count: 448 }));
        assert_eq!(engine.read().await.booked_count(), 0);
    }

    #[tokio::test]
    async fn test_calendar_and_health() {
        let engine = engine();
        handle_command(&engine, &client(), 1, book("09:00", "Alice")).await;

        let dispatch = handle_command(&engine, &client(), 2, Command::GetCalendar).await;
        let ResponsePayload::Calendar(snapshot) = ok(&dispatch) else {
            panic!("expected calendar");
        };
        assert_eq!(snapshot.slots.len(), 448);
        assert_eq!(snapshot.booked_count(), 1);
        assert_eq!(snapshot.first_day, Some(today()));
        assert!(snapshot.slots.windows(2).all(|w| (w[0].date, w[0].start_time) < (w[1].date, w[1].start_time)));

        let dispatch = handle_command(&engine, &client(), 3, Command::GetHealth).await;
        let ResponsePayload::Health(health) = ok(&dispatch) else {
            panic!("expected health");
        };
        assert!(health.live && health.ready);
        assert_eq!(health.booked_count, 1);
    }
}
