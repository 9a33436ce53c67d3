//! Door controller event loop.
//!
//! # Event Handling
//!
//! | Input                     | Action                                    |
//! |---------------------------|-------------------------------------------|
//! | Card frame, allow-listed  | unlock                                    |
//! | Card frame, unlisted      | remote check on a spawned task            |
//! | Card frame, check pending | dropped                                   |
//! | `DoorOpened`              | revert a recent lock                      |
//! | `DoorClosed`              | lock                                      |
//! | `ManualUnlock`            | force unlock                              |
//! | `ManualLock`              | force lock                                |
//! | Tick                      | advance lock, expire partial reader frame |
//!
//! All state lives in the controller and is only touched from the task
//! running [`DoorController::run`]. The synchronous handlers are public so
//! the same logic can be driven step by step.

use std::future::Future;
use std::time::{Duration, Instant};

use latchkey_auth::{AllowList, AuthorizationService, RemoteAuthority};
use latchkey_core::{AuthorizationDecision, CardIdentifier, ControllerConfig};
use latchkey_hardware::{Actuator, DoorEvent};
use latchkey_lock::{LockTarget, LockTransitionController};
use latchkey_reader::CardFrameAssembler;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scheduler::TickScheduler;

/// What happened to a card read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOutcome {
    /// Decided without leaving the event loop.
    Decided(AuthorizationDecision),

    /// Forwarded to the remote authority.
    Pending,

    /// Ignored because another check is in flight.
    Dropped,
}

/// Counters kept by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub cards_granted: u64,
    pub cards_denied: u64,
    pub cards_dropped: u64,
    pub auto_relocks: u64,
}

/// Input channels for [`DoorController::run`].
///
/// A missing or closed channel simply stops contributing events.
#[derive(Debug, Default)]
pub struct ControllerInputs {
    pub bytes: Option<mpsc::Receiver<Vec<u8>>>,
    pub door_events: Option<mpsc::Receiver<DoorEvent>>,
}

#[derive(Debug)]
struct PendingCheck {
    card: CardIdentifier,
    handle: JoinHandle<AuthorizationDecision>,
}

/// Owns the reader assembler, authorization service and lock controller.
pub struct DoorController<A, R> {
    assembler: CardFrameAssembler,
    auth: AuthorizationService<R>,
    lock: LockTransitionController<A>,
    tick_period: Duration,
    auto_relock_ticks: Option<u32>,
    /// Set when a card unlock starts; the countdown begins once it settles.
    relock_armed: bool,
    relock_countdown: Option<u32>,
    pending: Option<PendingCheck>,
    stats: ControllerStats,
}

impl<A: Actuator, R: RemoteAuthority> DoorController<A, R> {
    pub fn new(
        assembler: CardFrameAssembler,
        auth: AuthorizationService<R>,
        lock: LockTransitionController<A>,
        tick_period: Duration,
    ) -> Self {
        Self {
            assembler,
            auth,
            lock,
            tick_period,
            auto_relock_ticks: None,
            relock_armed: false,
            relock_countdown: None,
            pending: None,
            stats: ControllerStats::default(),
        }
    }

    /// Build every component from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed allow-list entries or servo angles out
    /// of range.
    pub fn from_config(config: &ControllerConfig, actuator: A, remote: R) -> Result<Self> {
        let assembler = CardFrameAssembler::from_config(&config.reader);
        let auth = AuthorizationService::new(AllowList::from_config(&config.auth)?, remote);
        let lock = LockTransitionController::from_config(actuator, &config.lock)?;

        Ok(Self::new(assembler, auth, lock, config.lock.tick_period())
            .with_auto_relock(config.lock.auto_relock_ticks()))
    }

    /// Relock this many ticks after a card unlock settles unless the door is
    /// opened first.
    #[must_use]
    pub fn with_auto_relock(mut self, ticks: Option<u32>) -> Self {
        self.auto_relock_ticks = ticks;
        self
    }

    /// Run until `shutdown` completes.
    ///
    /// A pending remote check is aborted on shutdown. The lock is left where
    /// it is.
    pub async fn run(&mut self, inputs: ControllerInputs, shutdown: impl Future<Output = ()>) {
        let ControllerInputs {
            mut bytes,
            mut door_events,
        } = inputs;
        let mut scheduler = TickScheduler::new(self.tick_period);
        tokio::pin!(shutdown);

        info!(
            tick = ?self.tick_period,
            allow_list = self.auth.allow_list().len(),
            remote = self.auth.has_remote(),
            "Door controller started"
        );

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Door controller shutting down");
                    break;
                }

                now = scheduler.tick() => {
                    self.tick(now);
                }

                result = wait_pending(&mut self.pending) => {
                    let Some(PendingCheck { card, .. }) = self.pending.take() else {
                        continue;
                    };
                    let decision = result.unwrap_or_else(|e| {
                        warn!(card = %card, "Remote check task failed: {}", e);
                        AuthorizationDecision::remote_unavailable()
                    });
                    self.apply_decision(card, decision);
                }

                chunk = recv_or_pending(&mut bytes) => match chunk {
                    Some(chunk) => {
                        self.handle_bytes(&chunk, tokio::time::Instant::now().into_std());
                    }
                    None => {
                        debug!("Card reader channel closed");
                        bytes = None;
                    }
                },

                event = recv_or_pending(&mut door_events) => match event {
                    Some(event) => self.handle_door_event(event),
                    None => {
                        debug!("Door event channel closed");
                        door_events = None;
                    }
                },
            }
        }

        if let Some(pending) = self.pending.take() {
            debug!(card = %pending.card, "Aborting pending remote check");
            pending.handle.abort();
        }
    }

    /// Feed reader bytes received at `now`.
    pub fn handle_bytes(&mut self, bytes: &[u8], now: Instant) -> Vec<CardOutcome> {
        self.assembler
            .on_bytes_received(bytes, now)
            .into_iter()
            .map(|card| self.handle_card(card))
            .collect()
    }

    /// Authorize a card read.
    ///
    /// Remote checks run on the current Tokio runtime. Outside a runtime the
    /// remote authority counts as unavailable.
    pub fn handle_card(&mut self, card: CardIdentifier) -> CardOutcome {
        if self.pending.is_some() {
            debug!(card = %card, "Remote check in flight, dropping card read");
            self.stats.cards_dropped += 1;
            return CardOutcome::Dropped;
        }

        if let Some(decision) = self.auth.authorize_locally(&card) {
            self.apply_decision(card, decision);
            return CardOutcome::Decided(decision);
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(card = %card, "No async runtime for the remote check");
            let decision = AuthorizationDecision::remote_unavailable();
            self.apply_decision(card, decision);
            return CardOutcome::Decided(decision);
        };

        debug!(card = %card, "Card not in allow-list, asking remote authority");
        let auth = self.auth.clone();
        let handle = runtime.spawn(async move { auth.authorize_remotely(&card).await });
        self.pending = Some(PendingCheck { card, handle });
        CardOutcome::Pending
    }

    /// Act on an authorization decision.
    ///
    /// The entry report is sent on the current Tokio runtime and skipped
    /// outside one.
    pub fn apply_decision(&mut self, card: CardIdentifier, decision: AuthorizationDecision) {
        if !decision.is_granted() {
            info!(card = %card, source = %decision.source, "Access denied");
            self.stats.cards_denied += 1;
            return;
        }

        info!(card = %card, source = %decision.source, "Access granted");
        self.stats.cards_granted += 1;

        if !self.lock.request_unlock() {
            return;
        }

        self.relock_armed = self.auto_relock_ticks.is_some();
        self.relock_countdown = None;

        if self.auth.has_remote() {
            match Handle::try_current() {
                Ok(runtime) => {
                    let auth = self.auth.clone();
                    runtime.spawn(async move { auth.report_entry(&card).await });
                }
                Err(_) => warn!(card = %card, "No async runtime, entry report skipped"),
            }
        }
    }

    pub fn handle_door_event(&mut self, event: DoorEvent) {
        debug!(%event, lock = %self.lock.state(), "Door event");
        self.relock_armed = false;
        self.relock_countdown = None;

        match event {
            DoorEvent::DoorOpened => {
                self.lock.revert_if_within_window();
            }
            DoorEvent::DoorClosed => {
                self.lock.request_lock();
            }
            DoorEvent::ManualUnlock => self.lock.force_unlock(),
            DoorEvent::ManualLock => self.lock.force_lock(),
        }
    }

    /// Advance every state machine by one tick.
    pub fn tick(&mut self, now: Instant) {
        match self.lock.on_tick() {
            Some(LockTarget::Unlocked) if self.relock_armed => {
                self.relock_armed = false;
                self.relock_countdown = self.auto_relock_ticks;
            }
            Some(LockTarget::Locked) => self.relock_countdown = None,
            _ => self.advance_relock(),
        }

        self.assembler.on_tick(now);
    }

    fn advance_relock(&mut self) {
        let Some(remaining) = self.relock_countdown else {
            return;
        };

        if remaining > 1 {
            self.relock_countdown = Some(remaining - 1);
            return;
        }

        self.relock_countdown = None;
        if self.lock.request_lock() {
            info!("Door not opened after unlock, relocking");
            self.stats.auto_relocks += 1;
        }
    }

    pub fn lock(&self) -> &LockTransitionController<A> {
        &self.lock
    }

    pub fn assembler(&self) -> &CardFrameAssembler {
        &self.assembler
    }

    pub fn auth(&self) -> &AuthorizationService<R> {
        &self.auth
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Whether a remote check is in flight.
    pub fn has_pending_check(&self) -> bool {
        self.pending.is_some()
    }
}

async fn wait_pending(
    pending: &mut Option<PendingCheck>,
) -> std::result::Result<AuthorizationDecision, tokio::task::JoinError> {
    match pending {
        Some(check) => (&mut check.handle).await,
        None => std::future::pending().await,
    }
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_auth::NoRemote;
    use latchkey_hardware::mock::{RecordingActuator, RecordingActuatorHandle};
    use latchkey_hardware::{ActuatorCommand, ServoPosition};
    use latchkey_lock::{LockState, LockTiming};
    use latchkey_reader::FrameFormat;

    const FULL: u32 = 20;
    const WINDOW: u32 = 60;
    const CARD: &[u8] = b"00AB12CD34";

    /// Remote authority that grants every card.
    struct GrantingRemote;

    impl RemoteAuthority for GrantingRemote {
        async fn check_card(&self, _card: &CardIdentifier) -> latchkey_auth::Result<bool> {
            Ok(true)
        }

        async fn report_opened(&self, _card: &CardIdentifier) -> latchkey_auth::Result<()> {
            Ok(())
        }
    }

    fn controller(
        auto_relock: Option<u32>,
    ) -> (
        DoorController<RecordingActuator, NoRemote>,
        RecordingActuatorHandle,
    ) {
        controller_with(NoRemote, auto_relock)
    }

    fn controller_with<R: RemoteAuthority>(
        remote: R,
        auto_relock: Option<u32>,
    ) -> (DoorController<RecordingActuator, R>, RecordingActuatorHandle) {
        let (actuator, handle) = RecordingActuator::new();
        let lock = LockTransitionController::new(
            actuator,
            LockTiming {
                transition_ticks: FULL,
                drift_compensation_ticks: 2,
                revert_window_ticks: WINDOW,
            },
            ServoPosition::new(0).unwrap(),
            ServoPosition::new(180).unwrap(),
        );
        let auth = AuthorizationService::new(
            AllowList::new(["00AB12CD34".parse().unwrap()]),
            remote,
        );
        let assembler = CardFrameAssembler::new(FrameFormat::Plain, Duration::from_millis(20));
        let controller = DoorController::new(assembler, auth, lock, Duration::from_millis(1))
            .with_auto_relock(auto_relock);
        (controller, handle)
    }

    fn tick_n(controller: &mut DoorController<RecordingActuator, NoRemote>, n: u32) {
        let now = Instant::now();
        for _ in 0..n {
            controller.tick(now);
        }
    }

    #[test]
    fn test_listed_card_unlocks() {
        let (mut controller, handle) = controller(None);

        let outcomes = controller.handle_bytes(CARD, Instant::now());
        assert_eq!(
            outcomes,
            vec![CardOutcome::Decided(AuthorizationDecision::local_grant())]
        );
        assert_eq!(controller.lock().state().target(), LockTarget::Unlocked);

        tick_n(&mut controller, FULL);
        assert_eq!(controller.lock().state(), LockState::Unlocked);
        assert_eq!(
            handle.commands(),
            vec![
                ActuatorCommand::MoveTo(ServoPosition::new(180).unwrap()),
                ActuatorCommand::Release
            ]
        );
        assert_eq!(controller.stats().cards_granted, 1);
    }

    #[test]
    fn test_unlisted_card_without_remote_is_denied() {
        let (mut controller, handle) = controller(None);

        let outcomes = controller.handle_bytes(b"9999999999", Instant::now());
        assert_eq!(
            outcomes,
            vec![CardOutcome::Decided(AuthorizationDecision::local_deny())]
        );
        assert_eq!(controller.lock().state(), LockState::Locked);
        assert_eq!(handle.command_count(), 0);
        assert_eq!(controller.stats().cards_denied, 1);
    }

    #[test]
    fn test_repeated_frames_do_not_restart_unlock() {
        let (mut controller, handle) = controller(None);

        controller.handle_bytes(CARD, Instant::now());
        tick_n(&mut controller, 5);
        controller.handle_bytes(CARD, Instant::now());

        assert_eq!(controller.lock().remaining_ticks(), FULL - 5);
        assert_eq!(handle.command_count(), 1);
        assert_eq!(controller.stats().cards_granted, 2);
    }

    #[test]
    fn test_door_events_map_to_lock_operations() {
        let (mut controller, _handle) = controller(None);
        controller.handle_bytes(CARD, Instant::now());
        tick_n(&mut controller, FULL);

        controller.handle_door_event(DoorEvent::DoorClosed);
        assert_eq!(controller.lock().state().target(), LockTarget::Locked);
        assert_eq!(controller.lock().revert_window_remaining(), WINDOW);

        tick_n(&mut controller, 5);
        controller.handle_door_event(DoorEvent::DoorOpened);
        assert_eq!(
            controller.lock().state(),
            LockState::Transitioning {
                target: LockTarget::Unlocked,
                remaining_ticks: 5
            }
        );

        controller.handle_door_event(DoorEvent::ManualLock);
        assert_eq!(controller.lock().remaining_ticks(), FULL);
        assert_eq!(controller.lock().revert_window_remaining(), 0);

        controller.handle_door_event(DoorEvent::ManualUnlock);
        assert_eq!(controller.lock().state().target(), LockTarget::Unlocked);
        assert_eq!(controller.lock().remaining_ticks(), FULL);
    }

    #[test]
    fn test_tick_expires_partial_frame() {
        let (mut controller, _handle) = controller(None);
        let start = Instant::now();

        assert!(controller.handle_bytes(b"00AB1", start).is_empty());
        controller.tick(start + Duration::from_millis(25));
        assert!(controller.assembler().is_idle());

        let outcomes = controller.handle_bytes(CARD, start + Duration::from_millis(30));
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn test_auto_relock_after_settle() {
        let (mut controller, _handle) = controller(Some(10));
        controller.handle_bytes(CARD, Instant::now());

        tick_n(&mut controller, FULL + 9);
        assert_eq!(controller.lock().state(), LockState::Unlocked);

        tick_n(&mut controller, 1);
        assert_eq!(controller.lock().state().target(), LockTarget::Locked);
        assert_eq!(controller.stats().auto_relocks, 1);
    }

    #[test]
    fn test_door_opening_cancels_auto_relock() {
        let (mut controller, _handle) = controller(Some(10));
        controller.handle_bytes(CARD, Instant::now());
        tick_n(&mut controller, FULL + 5);

        controller.handle_door_event(DoorEvent::DoorOpened);
        tick_n(&mut controller, 50);
        assert_eq!(controller.lock().state(), LockState::Unlocked);
        assert_eq!(controller.stats().auto_relocks, 0);
    }

    #[test]
    fn test_manual_unlock_does_not_arm_auto_relock() {
        let (mut controller, _handle) = controller(Some(10));
        controller.handle_door_event(DoorEvent::ManualUnlock);
        tick_n(&mut controller, FULL + 50);
        assert_eq!(controller.lock().state(), LockState::Unlocked);
    }

    #[test]
    fn test_remote_check_without_runtime_counts_as_unavailable() {
        let (mut controller, handle) = controller_with(GrantingRemote, None);

        let outcomes = controller.handle_bytes(b"1122334455", Instant::now());
        assert_eq!(
            outcomes,
            vec![CardOutcome::Decided(AuthorizationDecision::remote_unavailable())]
        );
        assert!(!controller.has_pending_check());
        assert_eq!(controller.stats().cards_denied, 1);
        assert_eq!(handle.command_count(), 0);
    }

    #[test]
    fn test_grant_without_runtime_unlocks_and_skips_report() {
        let (mut controller, _handle) = controller_with(GrantingRemote, None);

        let card = "1122334455".parse().unwrap();
        controller.apply_decision(card, AuthorizationDecision::remote_grant());
        assert_eq!(controller.lock().state().target(), LockTarget::Unlocked);
        assert_eq!(controller.stats().cards_granted, 1);
    }

    #[tokio::test]
    async fn test_remote_check_spawns_inside_runtime() {
        let (mut controller, _handle) = controller_with(GrantingRemote, None);

        let outcomes = controller.handle_bytes(b"1122334455", Instant::now());
        assert_eq!(outcomes, vec![CardOutcome::Pending]);
        assert!(controller.has_pending_check());
    }
}
