//! Request/reply client over a datagram transport.
//!
//! A call moves through `Idle -> Sending -> AwaitingReply` and ends in
//! `Delivered` or `Failed`, passing through `Retrying` after each timed-out
//! attempt. The correlation id is allocated once per call and every retry
//! resends the identical frame.
//!
//! While a call waits, datagrams that fail to decode and replies carrying
//! another correlation id are dropped without ending the wait; only the
//! attempt deadline does. Send and non-timeout receive failures end the call
//! at once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use facility_protocol::{
    Codec, Envelope, FacilityRequest, Operation, STATUS_ERROR, STATUS_SUCCESS, TypeRegistry,
};
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::config::{ClientConfig, RpcSettings};
use crate::error::{ClientError, ClientResult};
use crate::transport::{self, Transport, TransportError, UdpTransport};

/// Where a call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Sending,
    AwaitingReply,
    Retrying,
    Delivered,
    Failed,
}

/// Bookkeeping for the call in flight.
#[derive(Debug, Clone, Copy)]
struct PendingCall {
    correlation_id: i32,
    /// 0-based.
    attempt: u32,
    deadline: Instant,
}

/// What the monitoring callback receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent<'a> {
    /// Reply to the registration call, delivered whatever its status.
    Registered(&'a str),
    /// A datagram pushed by the server during the monitoring window.
    Update(&'a str),
}

impl MonitorEvent<'_> {
    pub fn text(&self) -> &str {
        match self {
            Self::Registered(text) | Self::Update(text) => text,
        }
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Result of a monitoring session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    /// Payload of the registration reply.
    pub registration: String,
    /// Whether the server accepted the registration.
    pub accepted: bool,
    /// Updates delivered to the callback.
    pub updates: usize,
}

/// RPC client owning one transport.
///
/// One call is in flight at a time; every method takes `&mut self`.
#[derive(Debug)]
pub struct RpcClient<T> {
    transport: T,
    server: SocketAddr,
    settings: RpcSettings,
    codec: Codec,
    last_id: i32,
    state: CallState,
    recv_buf: Vec<u8>,
}

impl RpcClient<UdpTransport> {
    /// Resolves the configured server and binds a UDP socket.
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let settings = config.rpc_settings()?;
        let server = transport::resolve(&config.server.host, config.server.port).await?;
        let socket = UdpTransport::bind(config.client.bind_port, settings.timeout).await?;
        info!(%server, local = %socket.local_addr()?, "facility client ready");
        Ok(Self::new(socket, server, settings))
    }
}

impl<T: Transport> RpcClient<T> {
    /// Creates a client that knows the envelope type only.
    pub fn new(transport: T, server: SocketAddr, settings: RpcSettings) -> Self {
        let codec = Codec::new(Arc::new(TypeRegistry::with_builtin()));
        Self::with_codec(transport, server, settings, codec)
    }

    pub fn with_codec(
        mut transport: T,
        server: SocketAddr,
        settings: RpcSettings,
        codec: Codec,
    ) -> Self {
        transport.set_receive_timeout(settings.timeout);
        Self {
            transport,
            server,
            settings,
            codec,
            last_id: 0,
            state: CallState::Idle,
            recv_buf: vec![0; settings.buffer_size],
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn settings(&self) -> &RpcSettings {
        &self.settings
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Correlation id of the most recent call.
    pub fn last_correlation_id(&self) -> i32 {
        self.last_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sends a typed facility request and returns the reply payload.
    pub async fn request(&mut self, request: &FacilityRequest) -> ClientResult<String> {
        self.call(request.operation(), request.payload()).await
    }

    /// Performs one call and returns the reply payload.
    pub async fn call(&mut self, op: Operation, payload: impl Into<String>) -> ClientResult<String> {
        Ok(self.call_envelope(op, payload.into()).await?.into_payload())
    }

    /// Performs one call and returns the whole reply envelope.
    ///
    /// # Errors
    /// `Wire` if the request cannot be encoded, `Transport` on socket
    /// failure, `RetriesExhausted` once every attempt has timed out.
    pub async fn call_envelope(&mut self, op: Operation, payload: String) -> ClientResult<Envelope> {
        self.last_id = self.last_id.wrapping_add(1);
        let correlation_id = self.last_id;
        let span = debug_span!("call", correlation_id, op = %op);

        let request = Envelope::new(op, correlation_id, payload);
        let frame = match self.codec.encode(&request) {
            Ok(frame) => frame,
            Err(e) => {
                self.state = CallState::Failed;
                return Err(e.into());
            }
        };

        let result = self.exchange(&frame, correlation_id).instrument(span).await;
        self.transport.set_receive_timeout(self.settings.timeout);
        result
    }

    async fn exchange(&mut self, frame: &[u8], correlation_id: i32) -> ClientResult<Envelope> {
        let mut pending = PendingCall {
            correlation_id,
            attempt: 0,
            deadline: Instant::now(),
        };

        loop {
            self.enter(CallState::Sending, &pending);
            if let Err(e) = self.transport.send_to(frame, self.server).await {
                self.enter(CallState::Failed, &pending);
                warn!(error = %e, "send failed");
                return Err(e.into());
            }
            debug!(bytes = frame.len(), attempt = pending.attempt, "request sent");

            pending.deadline = Instant::now() + self.settings.timeout;
            self.enter(CallState::AwaitingReply, &pending);

            match self.await_reply(&pending).await {
                Ok(reply) => {
                    self.enter(CallState::Delivered, &pending);
                    return Ok(reply);
                }
                Err(ClientError::Timeout { attempt, .. })
                    if attempt + 1 < self.settings.max_retries =>
                {
                    pending.attempt += 1;
                    self.enter(CallState::Retrying, &pending);
                    warn!(attempt = pending.attempt, "no reply, retrying");
                }
                Err(ClientError::Timeout { attempt, .. }) => {
                    self.enter(CallState::Failed, &pending);
                    warn!(attempts = attempt + 1, "no reply, giving up");
                    return Err(ClientError::RetriesExhausted {
                        correlation_id,
                        attempts: attempt + 1,
                    });
                }
                Err(e) => {
                    self.enter(CallState::Failed, &pending);
                    return Err(e);
                }
            }
        }
    }

    /// Waits for the reply matching `pending` until its deadline.
    async fn await_reply(&mut self, pending: &PendingCall) -> ClientResult<Envelope> {
        let timed_out = || ClientError::Timeout {
            correlation_id: pending.correlation_id,
            attempt: pending.attempt,
        };

        loop {
            let remaining = pending.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out());
            }
            self.transport.set_receive_timeout(remaining);

            let (len, from) = match self.transport.recv_from(&mut self.recv_buf).await {
                Ok(received) => received,
                Err(TransportError::TimedOut(_)) => return Err(timed_out()),
                Err(e) => return Err(e.into()),
            };

            match self.codec.decode::<Envelope>(&self.recv_buf[..len]) {
                Err(e) => {
                    warn!(%from, bytes = len, error = %e, "dropping malformed datagram");
                }
                Ok(reply) if reply.correlation_id != pending.correlation_id => {
                    debug!(
                        %from,
                        expected = pending.correlation_id,
                        received = reply.correlation_id,
                        "dropping reply for another request"
                    );
                }
                Ok(reply) => {
                    debug!(%from, bytes = len, "reply received");
                    return Ok(reply);
                }
            }
        }
    }

    fn enter(&mut self, state: CallState, pending: &PendingCall) {
        debug!(
            correlation_id = pending.correlation_id,
            attempt = pending.attempt,
            from = ?self.state,
            to = ?state,
            "call state"
        );
        self.state = state;
    }

    /// Registers interest in `facility` and listens for pushed updates.
    ///
    /// `on_update` always sees the registration reply first. When the
    /// registration call itself fails it sees a `status:ERROR` description of
    /// the failure instead, and the error is returned. Only a reply reporting
    /// success makes the client block for the window, handing every datagram
    /// that arrives to `on_update`. The window is `duration` rounded up to
    /// whole seconds, the unit the server is told. The receive timeout is
    /// restored afterwards.
    ///
    /// # Errors
    /// The registration call's error, or a socket failure while listening.
    pub async fn monitor<F>(
        &mut self,
        facility: &str,
        duration: Duration,
        mut on_update: F,
    ) -> ClientResult<MonitorOutcome>
    where
        F: FnMut(MonitorEvent<'_>),
    {
        let duration_secs = whole_seconds(duration);
        let request = FacilityRequest::Monitor {
            facility: facility.to_owned(),
            duration_secs,
        };
        let registration = match self.request(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                let text = format!("{STATUS_ERROR}\nmessage:{e}");
                on_update(MonitorEvent::Registered(&text));
                return Err(e);
            }
        };
        on_update(MonitorEvent::Registered(&registration));

        let accepted = registration.starts_with(STATUS_SUCCESS);
        let mut outcome = MonitorOutcome {
            registration,
            accepted,
            updates: 0,
        };
        if !accepted {
            info!(facility, "monitor registration refused");
            return Ok(outcome);
        }

        let window = Duration::from_secs(duration_secs);
        info!(facility, ?window, "monitoring");
        let listened = self.listen(window, &mut on_update).await;
        self.transport.set_receive_timeout(self.settings.timeout);
        outcome.updates = listened?;
        Ok(outcome)
    }

    async fn listen<F>(&mut self, duration: Duration, on_update: &mut F) -> ClientResult<usize>
    where
        F: FnMut(MonitorEvent<'_>),
    {
        let deadline = Instant::now() + duration;
        let mut updates = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.transport.set_receive_timeout(remaining);

            match self.transport.recv_from(&mut self.recv_buf).await {
                Ok((len, from)) => {
                    let text = self.push_text(len);
                    debug!(%from, bytes = len, "update received");
                    on_update(MonitorEvent::Update(&text));
                    updates += 1;
                }
                Err(TransportError::TimedOut(_)) => break,
                Err(e) => return Err(e.into()),
            }
        }
        debug!(updates, "monitoring window closed");
        Ok(updates)
    }

    /// Text of a pushed datagram: the envelope payload when it decodes as
    /// one, the raw bytes otherwise.
    fn push_text(&self, len: usize) -> String {
        let bytes = &self.recv_buf[..len];
        match self.codec.decode::<Envelope>(bytes) {
            Ok(envelope) => envelope.into_payload(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// `duration` in seconds, any fraction counting as a full second.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
