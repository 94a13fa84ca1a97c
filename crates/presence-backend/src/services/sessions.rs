use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeDelta};
use chrono_tz::Tz;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use presence::data::{LoginRequest, SessionRecord};
use presence::errors::SessionError;
use presence::id::SessionId;
use presence::log;

use crate::clock::Clock;
use crate::network::{ClientAddress, HostNetwork};

/// A trait for managing the lifecycle of login sessions.
///
/// Sessions are created on login, touched by updates and status checks, and
/// removed on logout. There is no expiry: a session lives until it is deleted
/// or the process exits.
#[async_trait]
pub trait SessionService {
    /// The error type returned by operations on this service.
    type Error;

    /// Creates a session for a login.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `email`, `nickname` or `macAddress` is
    /// missing or empty. Nothing is stored in that case.
    async fn create(
        &self,
        login: LoginRequest,
        client: &ClientAddress,
    ) -> Result<SessionRecord, Self::Error>;

    /// Removes a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session doesn't exist, including when it was
    /// already removed.
    async fn delete(&self, session_id: &SessionId) -> Result<(), Self::Error>;

    /// Overwrites the supplied, non-empty fields and touches the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session doesn't exist.
    async fn update(
        &self,
        session_id: &SessionId,
        email: Option<&str>,
        nickname: Option<&str>,
    ) -> Result<SessionRecord, Self::Error>;

    /// Retrieves a session. This counts as an access and touches it.
    ///
    /// # Errors
    ///
    /// Returns an error if no session exists with the given ID.
    async fn get(&self, session_id: &SessionId) -> Result<SessionRecord, Self::Error>;

    /// Returns every live session in creation order, without touching them.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when there are no sessions at all.
    async fn list(&self) -> Result<Vec<(SessionId, SessionRecord)>, Self::Error>;

    /// Number of live sessions.
    async fn count(&self) -> usize;
}

struct StoredSession {
    seq: u64,
    record: SessionRecord,
}

/// An in-memory implementation of the `SessionService` trait.
///
/// Sessions live in a `DashMap`. Touches run while holding the entry's write
/// guard, so concurrent requests against the same session are serialized.
/// Each entry carries an insertion sequence number used to list sessions in
/// creation order.
pub struct SessionServiceInMemory {
    sessions: DashMap<SessionId, StoredSession>,
    next_seq: AtomicU64,
    timezone: Tz,
    clock: Arc<dyn Clock>,
    network: Arc<dyn HostNetwork>,
}

impl SessionServiceInMemory {
    pub fn with_collaborators(
        timezone: Tz,
        clock: Arc<dyn Clock>,
        network: Arc<dyn HostNetwork>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            next_seq: AtomicU64::new(0),
            timezone,
            clock,
            network,
        }
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock
            .now()
            .with_timezone(&self.timezone)
            .fixed_offset()
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, SessionError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SessionError::Validation(format!("missing required field `{field}`")))
}

fn not_found(session_id: &SessionId) -> SessionError {
    SessionError::NotFound(format!("session {session_id}"))
}

#[async_trait]
impl SessionService for SessionServiceInMemory {
    type Error = SessionError;

    async fn create(
        &self,
        login: LoginRequest,
        client: &ClientAddress,
    ) -> Result<SessionRecord, Self::Error> {
        let email = required(login.email, "email")?;
        let nickname = required(login.nickname, "nickname")?;
        let mac_address = required(login.mac_address, "macAddress")?;

        let (server_ip, server_mac) = match self.network.primary_interface()? {
            Some(iface) => (Some(iface.ip.to_string()), iface.mac),
            None => {
                log::warn!("No external IPv4 interface found, server address left empty");
                (None, None)
            }
        };

        let now = self.local_now();
        let client_ip = client.resolve();

        // A v4 collision is not expected, but an existing id is never reissued.
        let (session_id, slot) = loop {
            let session_id = SessionId::new();
            if let Entry::Vacant(slot) = self.sessions.entry(session_id.clone()) {
                break (session_id, slot);
            }
        };

        let record = SessionRecord {
            session_id,
            email,
            nickname,
            mac_address,
            client_ip,
            server_ip,
            server_mac,
            date_created: now,
            last_accessed: now,
            duration: TimeDelta::zero(),
            inactivity_time: TimeDelta::zero(),
            status: true,
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        slot.insert(StoredSession {
            seq,
            record: record.clone(),
        });

        log::info!(
            "Session {} created for {} from {:?}",
            record.session_id,
            record.email,
            record.client_ip
        );
        Ok(record)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), Self::Error> {
        self.sessions
            .remove(session_id)
            .ok_or_else(|| not_found(session_id))?;
        log::info!("Session {} removed", session_id);
        Ok(())
    }

    async fn update(
        &self,
        session_id: &SessionId,
        email: Option<&str>,
        nickname: Option<&str>,
    ) -> Result<SessionRecord, Self::Error> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| not_found(session_id))?;
        // Read under the guard so touches on one session apply in clock order.
        let now = self.local_now();

        let record = &mut entry.record;
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            record.email = email.to_string();
        }
        if let Some(nickname) = nickname.filter(|n| !n.is_empty()) {
            record.nickname = nickname.to_string();
        }
        record.touch(now);

        log::debug!("Session {} updated", session_id);
        Ok(record.clone())
    }

    async fn get(&self, session_id: &SessionId) -> Result<SessionRecord, Self::Error> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| not_found(session_id))?;
        let now = self.local_now();

        entry.record.touch(now);
        log::debug!(
            "Session {} accessed, inactive for {}s",
            session_id,
            entry.record.inactivity_time.num_seconds()
        );
        Ok(entry.record.clone())
    }

    async fn list(&self) -> Result<Vec<(SessionId, SessionRecord)>, Self::Error> {
        let mut sessions: Vec<(u64, SessionId, SessionRecord)> = self
            .sessions
            .iter()
            .map(|entry| (entry.seq, entry.key().clone(), entry.record.clone()))
            .collect();

        if sessions.is_empty() {
            return Err(SessionError::NotFound("no active sessions".to_string()));
        }

        sessions.sort_by_key(|(seq, _, _)| *seq);
        Ok(sessions
            .into_iter()
            .map(|(_, id, record)| (id, record))
            .collect())
    }

    async fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::config::DEFAULT_TIMEZONE;
    use crate::network::testing::FixedNetwork;
    use std::collections::HashSet;

    fn service_with(clock: Arc<ManualClock>, network: FixedNetwork) -> SessionServiceInMemory {
        SessionServiceInMemory::with_collaborators(DEFAULT_TIMEZONE, clock, Arc::new(network))
    }

    fn login(email: &str, nickname: &str, mac: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            nickname: Some(nickname.to_string()),
            mac_address: Some(mac.to_string()),
        }
    }

    fn client() -> ClientAddress {
        ClientAddress {
            forwarded_for: Some("::ffff:10.0.0.7".to_string()),
            peer: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_fresh_record() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(clock.clone(), FixedNetwork::lan());

        let created = service
            .create(login("a@b.com", "A", "AA:BB:CC:DD:EE:FF"), &client())
            .await
            .unwrap();
        let fetched = service.get(&created.session_id).await.unwrap();

        assert_eq!(fetched.email, "a@b.com");
        assert_eq!(fetched.nickname, "A");
        assert_eq!(fetched.mac_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(fetched.client_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(fetched.server_ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(fetched.server_mac.as_deref(), Some("00:11:22:33:44:55"));
        assert!(fetched.status);
        assert_eq!(fetched.duration, TimeDelta::zero());
        assert_eq!(fetched.inactivity_time, TimeDelta::zero());
        assert_eq!(fetched.date_created, fetched.last_accessed);
    }

    #[tokio::test]
    async fn timestamps_use_configured_zone() {
        let service = SessionServiceInMemory::with_collaborators(
            chrono_tz::Asia::Tokyo,
            Arc::new(ManualClock::new()),
            Arc::new(FixedNetwork::lan()),
        );

        let created = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap();

        assert_eq!(created.date_created.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(created.date_created.to_rfc3339(), "2024-05-02T01:00:00+09:00");
    }

    #[tokio::test]
    async fn thousand_creates_yield_distinct_ids() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::Absent);

        let mut ids = HashSet::new();
        for i in 0..1000 {
            let record = service
                .create(login(&format!("user{i}@b.com"), "U", "AA"), &client())
                .await
                .unwrap();
            ids.insert(record.session_id);
        }

        assert_eq!(ids.len(), 1000);
        assert_eq!(service.count().await, 1000);
    }

    #[tokio::test]
    async fn create_rejects_missing_or_empty_fields() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::lan());

        let cases = [
            LoginRequest {
                email: None,
                ..login("a@b.com", "A", "AA")
            },
            LoginRequest {
                nickname: None,
                ..login("a@b.com", "A", "AA")
            },
            LoginRequest {
                mac_address: None,
                ..login("a@b.com", "A", "AA")
            },
            login("", "A", "AA"),
        ];

        for case in cases {
            let result = service.create(case, &client()).await;
            assert!(matches!(result, Err(SessionError::Validation(_))));
        }
        assert_eq!(service.count().await, 0);
    }

    #[tokio::test]
    async fn missing_host_interface_is_not_an_error() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::Absent);

        let record = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap();

        assert_eq!(record.server_ip, None);
        assert_eq!(record.server_mac, None);
    }

    #[tokio::test]
    async fn failing_interface_enumeration_is_internal() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::Failing);

        let result = service.create(login("a@b.com", "A", "AA"), &client()).await;

        assert!(matches!(result, Err(SessionError::Internal(_))));
        assert_eq!(service.count().await, 0);
    }

    #[tokio::test]
    async fn deleted_sessions_stay_deleted() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::lan());
        let id = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap()
            .session_id;

        service.delete(&id).await.unwrap();

        assert!(matches!(service.get(&id).await, Err(SessionError::NotFound(_))));
        assert!(matches!(service.delete(&id).await, Err(SessionError::NotFound(_))));
        assert!(matches!(
            service.delete(&SessionId::from("")).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(clock.clone(), FixedNetwork::lan());
        let id = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap()
            .session_id;

        clock.advance(TimeDelta::seconds(40));
        let updated = service.update(&id, Some("e2@b.com"), Some("")).await.unwrap();

        assert_eq!(updated.email, "e2@b.com");
        assert_eq!(updated.nickname, "A");
        assert_eq!(updated.mac_address, "AA");
        assert_eq!(updated.duration, TimeDelta::seconds(40));
        assert_eq!(updated.inactivity_time, TimeDelta::seconds(40));

        let fetched = service.get(&id).await.unwrap();
        assert_eq!(fetched.email, "e2@b.com");
        assert_eq!(fetched.nickname, "A");
    }

    #[tokio::test]
    async fn update_unknown_session_fails() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::lan());

        let result = service.update(&SessionId::new(), Some("x@y.com"), None).await;

        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn consecutive_gets_track_inactivity() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(clock.clone(), FixedNetwork::lan());
        let created = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap();

        clock.advance(TimeDelta::seconds(10));
        let first = service.get(&created.session_id).await.unwrap();
        clock.advance(TimeDelta::seconds(25));
        let second = service.get(&created.session_id).await.unwrap();

        assert_eq!(first.inactivity_time, TimeDelta::seconds(10));
        assert_eq!(second.inactivity_time, TimeDelta::seconds(25));
        assert_eq!(second.duration, TimeDelta::seconds(35));
        assert_eq!(second.date_created, created.date_created);
        assert!(second.last_accessed > first.last_accessed);
    }

    #[tokio::test]
    async fn list_is_ordered_and_read_only() {
        let clock = Arc::new(ManualClock::new());
        let service = service_with(clock.clone(), FixedNetwork::lan());

        assert!(matches!(service.list().await, Err(SessionError::NotFound(_))));

        let mut created = Vec::new();
        for name in ["first", "second", "third"] {
            let record = service
                .create(login(&format!("{name}@b.com"), name, "AA"), &client())
                .await
                .unwrap();
            created.push(record.session_id);
            clock.advance(TimeDelta::seconds(1));
        }

        clock.advance(TimeDelta::seconds(60));
        let listed = service.list().await.unwrap();

        let ids: Vec<SessionId> = listed.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, created);
        for (id, record) in &listed {
            assert_eq!(&record.session_id, id);
            assert_eq!(record.duration, TimeDelta::zero());
            assert_eq!(record.last_accessed, record.date_created);
        }
    }

    #[tokio::test]
    async fn list_with_single_session() {
        let service = service_with(Arc::new(ManualClock::new()), FixedNetwork::lan());
        let id = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap()
            .session_id;

        let listed = service.list().await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_touches_on_one_session_stay_ordered() {
        let clock = Arc::new(ManualClock::new());
        let service = Arc::new(service_with(clock.clone(), FixedNetwork::lan()));
        let id = service
            .create(login("a@b.com", "A", "AA"), &client())
            .await
            .unwrap()
            .session_id;

        let mut tasks = Vec::new();
        for task in 0..8 {
            let service = service.clone();
            let clock = clock.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    clock.advance(TimeDelta::seconds(1));
                    let record = if task % 2 == 0 {
                        service.get(&id).await.unwrap()
                    } else {
                        service.update(&id, Some("x@b.com"), None).await.unwrap()
                    };
                    seen.push(record);
                }
                seen
            }));
        }

        let mut total_inactivity = TimeDelta::zero();
        for task in tasks {
            let seen = task.await.unwrap();
            for pair in seen.windows(2) {
                assert!(pair[1].last_accessed >= pair[0].last_accessed);
            }
            for record in &seen {
                assert!(record.inactivity_time >= TimeDelta::zero());
                assert!(record.last_accessed >= record.date_created);
                assert_eq!(record.duration, record.last_accessed - record.date_created);
                total_inactivity += record.inactivity_time;
            }
        }

        let (_, last) = service.list().await.unwrap().remove(0);
        assert_eq!(total_inactivity, last.last_accessed - last.date_created);
        assert_eq!(last.duration, TimeDelta::seconds(400));
    }
}
