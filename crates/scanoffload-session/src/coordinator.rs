//! The scan coordinator (domain service).
//!
//! `ScanCoordinator` owns all mutable scan state for one attached device and
//! drives every session transition: admission, dwell computation, command
//! encoding, the synchronous send, the stop handshake and (in
//! [`crate::reconciler`]) the asynchronous notification side.
//!
//! Locking follows a single-writer discipline: one coarse async lock guards
//! the [`ScanRegistry`], held for the full duration of any transition,
//! including the synchronous command send and the bounded stop-wait. The
//! notification path resolves stop-waiters before taking the lock, which is
//! what keeps the handshake deadlock-free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps, FwGeneration};
use scanoffload_core::error::{ScanError, ScanResult, TransportError};
use scanoffload_core::port::{CommandId, CommandTransport, DeviceState, UpperStack};
use scanoffload_core::types::{
    ScanIes, ScanParams, ScanRequest, ScheduleLine, SessionType, Vif,
};
use scanoffload_wire::config::{encode_scan_config, encode_sched_profiles};
use scanoffload_wire::format::{select_format, ScanCommandFormat};
use scanoffload_wire::probe::{build_probe_template, max_ie_room};
use scanoffload_wire::ssid::MAX_DIRECT_SSIDS;

use crate::admission::{admit, Admission};
use crate::dwell::compute_dwell;
use crate::ebs::ebs_eligible;
use crate::registry::ScanRegistry;
use crate::wait::ScanDoneWaiters;

/// Iterations on the fast schedule line of a periodic scan.
const FAST_SCHED_SCAN_ITERATIONS: u8 = 3;
/// Full-scan substitution multiplier on the slow schedule line.
const FULL_SCAN_MULTIPLIER: u8 = 3;
/// Status word the legacy abort command answers when it actually aborts
/// something.
const ABORT_ACCEPTED_STATUS: u32 = 1;

/// Drives scan sessions against one device's firmware.
pub struct ScanCoordinator {
    pub(crate) caps: FirmwareCaps,
    pub(crate) config: DeviceConfig,
    pub(crate) format: Box<dyn ScanCommandFormat>,
    pub(crate) transport: Arc<dyn CommandTransport>,
    pub(crate) stack: Arc<dyn UpperStack>,
    pub(crate) device: Arc<dyn DeviceState>,
    pub(crate) state: Mutex<ScanRegistry>,
    pub(crate) waiters: ScanDoneWaiters,
    iter_notify: AtomicBool,
}

impl ScanCoordinator {
    /// Creates a coordinator for a freshly attached device. The command
    /// format is resolved here, once, from the capability bits.
    #[must_use]
    pub fn new(
        caps: FirmwareCaps,
        config: DeviceConfig,
        transport: Arc<dyn CommandTransport>,
        stack: Arc<dyn UpperStack>,
        device: Arc<dyn DeviceState>,
    ) -> Self {
        let format = select_format(&caps);
        let state = Mutex::new(ScanRegistry::new(caps.max_scans));
        Self {
            caps,
            config,
            format,
            transport,
            stack,
            device,
            state,
            waiters: ScanDoneWaiters::default(),
            iter_notify: AtomicBool::new(false),
        }
    }

    /// Activates offloaded scanning. Current-generation firmware requires a
    /// configuration command before the first scan; the legacy generation
    /// needs nothing.
    pub async fn configure(&self) -> ScanResult<()> {
        if self.caps.generation() != FwGeneration::Umac {
            return Ok(());
        }
        let cmd = encode_scan_config(&self.caps, &self.config)?;
        tracing::debug!("sending scan configuration");
        self.transport.send(cmd).await?;
        Ok(())
    }

    /// Starts a regular (one-shot) scan.
    pub async fn start_scan(
        &self,
        vif: &Vif,
        request: &ScanRequest,
        ies: &ScanIes,
    ) -> ScanResult<()> {
        let mut registry = self.state.lock().await;
        self.start_locked(&mut registry, vif, request, ies, SessionType::Regular)
            .await
    }

    /// Starts a scheduled or net-detect scan.
    ///
    /// # Errors
    ///
    /// Besides the start-path errors, fails with
    /// [`ScanError::InvariantViolation`] when called with
    /// [`SessionType::Regular`].
    pub async fn start_sched_scan(
        &self,
        vif: &Vif,
        request: &ScanRequest,
        ies: &ScanIes,
        session: SessionType,
    ) -> ScanResult<()> {
        if session == SessionType::Regular {
            return Err(ScanError::InvariantViolation {
                message: "regular scans start through start_scan".into(),
            });
        }
        let mut registry = self.state.lock().await;
        self.start_locked(&mut registry, vif, request, ies, session)
            .await
    }

    /// Stops a session of the given type. A no-op when nothing of that type
    /// runs. `notify` controls whether the upper stack hears about the stop.
    pub async fn stop_scan(&self, session: SessionType, notify: bool) -> ScanResult<()> {
        let mut registry = self.state.lock().await;
        self.stop_locked(&mut registry, session, notify).await
    }

    /// Opts in or out of per-iteration completion notifications.
    pub fn set_iteration_notifications(&self, enabled: bool) {
        self.iter_notify.store(enabled, Ordering::Relaxed);
    }

    /// Probe-IE room available to the management layer.
    #[must_use]
    pub fn max_scan_ie_len(&self) -> usize {
        max_ie_room(self.caps.ds_param_set_ie)
    }

    /// Upper bound of the encoded scan command for this device.
    #[must_use]
    pub fn scan_command_len(&self) -> usize {
        self.format.max_command_len(&self.caps)
    }

    async fn start_locked(
        &self,
        registry: &mut ScanRegistry,
        vif: &Vif,
        request: &ScanRequest,
        ies: &ScanIes,
        session: SessionType,
    ) -> ScanResult<()> {
        if self.caps.lar && !self.device.regulatory_ready() {
            tracing::error!(?session, "scan requested while regulatory domain is not set");
            return Err(ScanError::RegulatoryNotReady);
        }

        // One active instance per type, independent of free firmware slots.
        if registry.is_active(session) {
            return Err(ScanError::Busy(session));
        }

        match admit(registry, self.caps.max_scans, session) {
            Admission::Admit => {}
            Admission::Busy(busy) => return Err(ScanError::Busy(busy)),
            Admission::Preempt(other) => {
                let stopped = self.stop_locked(registry, other, true).await;
                if session == SessionType::Regular {
                    stopped?;
                } else if let Err(err) = stopped {
                    tracing::debug!(%err, ?other, "best-effort preemption stop failed");
                }
            }
        }

        self.check_fits(request, ies)?;

        let params = self.build_params(registry, vif, request, ies, session)?;

        if session != SessionType::Regular {
            let profiles = encode_sched_profiles(&request.match_sets, &self.caps)?;
            tracing::debug!("sending scheduled scan profile config");
            self.transport.send(profiles).await?;
        }

        if session == SessionType::Regular {
            self.device.ref_scan();
        }

        let uid = match self.caps.generation() {
            FwGeneration::Umac => match registry.alloc_uid(session) {
                Ok(uid) => Some(uid),
                Err(err) => {
                    self.release_reservation(registry, session, None);
                    return Err(err);
                }
            },
            FwGeneration::Lmac => None,
        };

        let cmd = match self
            .format
            .encode_scan_request(&params, &self.caps, &self.config, uid)
        {
            Ok(cmd) => cmd,
            Err(err) => {
                self.release_reservation(registry, session, uid);
                return Err(err);
            }
        };

        match self.transport.send(cmd).await {
            Ok(()) => {
                registry.set_running(session);
                tracing::debug!(?session, ?uid, "scan request sent");
                Ok(())
            }
            Err(err) => {
                // A rejected start usually means the firmware could not
                // allocate the time events for the excursion.
                tracing::error!(%err, ?session, "scan request failed");
                self.release_reservation(registry, session, uid);
                Err(err.into())
            }
        }
    }

    fn release_reservation(
        &self,
        registry: &mut ScanRegistry,
        session: SessionType,
        uid: Option<u32>,
    ) {
        if let Some(uid) = uid {
            registry.free_uid(uid);
        }
        if session == SessionType::Regular {
            self.device.unref_scan();
        }
    }

    fn check_fits(&self, request: &ScanRequest, ies: &ScanIes) -> ScanResult<()> {
        if request.channels.is_empty() {
            return Err(ScanError::InvalidRequest {
                message: "scan request carries no channels".into(),
            });
        }
        if request.ssids.len() > MAX_DIRECT_SSIDS {
            return Err(ScanError::Size {
                needed: request.ssids.len(),
                limit: MAX_DIRECT_SSIDS,
            });
        }
        if request.channels.len() > self.caps.max_scan_channels {
            return Err(ScanError::Size {
                needed: request.channels.len(),
                limit: self.caps.max_scan_channels,
            });
        }
        let room = max_ie_room(self.caps.ds_param_set_ie);
        if ies.total_len() > room {
            return Err(ScanError::Size {
                needed: ies.total_len(),
                limit: room,
            });
        }
        Ok(())
    }

    fn build_params(
        &self,
        registry: &mut ScanRegistry,
        vif: &Vif,
        request: &ScanRequest,
        ies: &ScanIes,
        session: SessionType,
    ) -> ScanResult<ScanParams> {
        let conditions = self.device.link_conditions();
        let dwell = compute_dwell(&conditions, request.flags, vif.kind, &self.caps);
        tracing::debug!(
            max_out_time = dwell.max_out_time,
            suspend_time = dwell.suspend_time,
            passive_fragmented = dwell.passive_fragmented,
            "scan timing computed"
        );

        let (schedule, interval_secs, delay_secs, pass_all, no_cck) = match session {
            SessionType::Regular => (
                [
                    ScheduleLine {
                        iterations: 1,
                        full_scan_mul: 0,
                    },
                    ScheduleLine::default(),
                ],
                0,
                0,
                true,
                request.no_cck,
            ),
            SessionType::Scheduled | SessionType::NetDetect => {
                let filtering = request
                    .match_sets
                    .first()
                    .is_some_and(|set| !set.ssid.is_empty());
                (
                    [
                        ScheduleLine {
                            iterations: FAST_SCHED_SCAN_ITERATIONS,
                            full_scan_mul: 1,
                        },
                        ScheduleLine {
                            iterations: 0xff,
                            full_scan_mul: FULL_SCAN_MULTIPLIER,
                        },
                    ],
                    clamp_secs(request.interval.as_secs(), "interval"),
                    clamp_secs(request.delay.as_secs(), "delay"),
                    !filtering,
                    false,
                )
            }
        };

        let probe = build_probe_template(vif, ies, request, self.caps.ds_param_set_ie)?;

        let mut params = ScanParams {
            session,
            ssids: request.ssids.clone(),
            channels: request.channels.clone(),
            match_sets: request.match_sets.clone(),
            pass_all,
            no_cck,
            flags: request.flags,
            dwell,
            schedule,
            interval_secs,
            delay_secs,
            use_ebs: false,
            iter_notify: self.iter_notify.load(Ordering::Relaxed),
            tx_ant: [
                registry.next_scan_antenna(self.config.valid_tx_ant),
                registry.next_scan_antenna(self.config.valid_tx_ant),
            ],
            probe,
        };
        params.use_ebs = ebs_eligible(
            &self.caps,
            registry.last_ebs_usable(),
            params.total_iterations(),
            vif.kind,
        );

        Ok(params)
    }

    pub(crate) async fn stop_locked(
        &self,
        registry: &mut ScanRegistry,
        session: SessionType,
        notify: bool,
    ) -> ScanResult<()> {
        if !registry.is_running(session) {
            return Ok(());
        }

        let mut result = Ok(());
        if self.device.radio_killed() {
            tracing::debug!(?session, "radio is killed; treating scan as already stopped");
        } else {
            result = self.stop_wait(registry, session).await;
            if result.is_ok() {
                // The notification already fired our waiter; mark the type
                // stopping so the deferred reconciler pass stays silent.
                registry.set_stopping(session);
            }
        }

        // Clear the running bit regardless of the outcome, so the next start
        // of this type succeeds and any late notification is recognized as
        // part of this stop.
        registry.clear_running(session);

        if session == SessionType::Regular {
            // The reconciler will not run for this session anymore; drop the
            // device-active reference here.
            self.device.unref_scan();
            if notify {
                self.stack.scan_completed(true);
            }
        } else if notify {
            self.stack.sched_scan_stopped();
        }

        result
    }

    async fn stop_wait(
        &self,
        registry: &mut ScanRegistry,
        session: SessionType,
    ) -> ScanResult<()> {
        let done = self.waiters.register();
        tracing::debug!(?session, "preparing to stop scan");

        match self.caps.generation() {
            FwGeneration::Umac => {
                let uid = registry.uid_of(session).ok_or_else(|| {
                    ScanError::InvariantViolation {
                        message: format!("no scan UID recorded for {session:?}"),
                    }
                })?;
                let cmd = self.format.encode_abort(Some(uid))?;
                tracing::debug!(uid, "sending scan abort");
                self.transport.send(cmd).await?;
                registry.mark_uid_stopping(uid);
            }
            FwGeneration::Lmac => {
                let cmd = self.format.encode_abort(None)?;
                let status = self.transport.send_for_status(cmd).await?;
                if status != ABORT_ACCEPTED_STATUS {
                    // The firmware answers a failure status when it is not
                    // scanning anymore, e.g. when the abort crossed paths
                    // with the completion notification.
                    tracing::debug!(status, "scan abort rejected");
                    return Err(TransportError::Rejected {
                        id: CommandId::LmacScanAbort.opcode(),
                        status,
                    }
                    .into());
                }
            }
        }

        match tokio::time::timeout(self.config.stop_timeout, done).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(?session, "timed out waiting for scan-complete notification");
                Err(ScanError::StopTimeout)
            }
        }
    }
}

fn clamp_secs(secs: u64, what: &str) -> u16 {
    match u16::try_from(secs) {
        Ok(secs) => secs,
        Err(_) => {
            tracing::debug!("{what} value is over 16 bits, set to max possible");
            u16::MAX
        }
    }
}
