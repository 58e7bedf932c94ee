//! Timeout-bounded calls to external collaborators.
//!
//! Each subsystem (light, power, actuator, ledger) gets a [`Gateway`]: a
//! worker thread that owns the real implementation and executes one call at a
//! time. The control thread submits a call and waits at most the configured
//! timeout. On timeout the call stays outstanding on the worker; further calls
//! on that subsystem fail fast with [`ExternalError::Busy`] until the late
//! reply arrives, which is then discarded.
//!
//! Gateways sharing a [`CallTimeout`] also share its tick budget, so the
//! calls of one tick together stay within it.
//!
//! Replies carry the sequence number of their request, so a stale reply can
//! never be mistaken for the answer to a newer call and results are applied
//! on the control thread in submission order.
//!
//! Gateways implement the same traits as the collaborators they wrap, so the
//! controller cannot tell them apart.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::power::PowerTier;
use crate::core::sampling::LightPattern;
use crate::error::ExternalError;
use crate::hardware::{Actuator, LightSensor, PowerMonitor};
use crate::ledger::DurationRecorder;

/// Call timeout shared by every gateway, adjustable on config reload.
///
/// The host can also open a tick budget with [`CallTimeout::begin_tick`]:
/// calls then wait no longer than what is left of it, and a call started
/// after it ran out fails as a timeout without being submitted.
#[derive(Debug, Clone)]
pub struct CallTimeout {
    millis: Arc<AtomicU64>,
    tick_deadline: Arc<Mutex<Option<Instant>>>,
}

impl CallTimeout {
    pub fn new(timeout: Duration) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(timeout.as_millis() as u64)),
            tick_deadline: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set(&self, timeout: Duration) {
        self.millis.store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }

    /// Bound every call made in the next `budget`.
    pub fn begin_tick(&self, budget: Duration) {
        let mut deadline = self.tick_deadline.lock().unwrap_or_else(|e| e.into_inner());
        *deadline = Some(Instant::now() + budget);
    }

    /// Same per-call timeout, but outside any tick budget.
    pub fn without_tick_budget(&self) -> Self {
        Self {
            millis: self.millis.clone(),
            tick_deadline: Arc::new(Mutex::new(None)),
        }
    }

    /// How long a call starting now may wait.
    pub fn allowance(&self) -> Duration {
        let per_call = self.get();
        let deadline = *self.tick_deadline.lock().unwrap_or_else(|e| e.into_inner());
        match deadline {
            Some(at) => per_call.min(at.saturating_duration_since(Instant::now())),
            None => per_call,
        }
    }
}

impl From<Duration> for CallTimeout {
    fn from(timeout: Duration) -> Self {
        Self::new(timeout)
    }
}

type Job<S, R> = Box<dyn FnOnce(&mut S) -> Result<R, ExternalError> + Send>;

pub struct Gateway<S, R> {
    subsystem: &'static str,
    timeout: CallTimeout,
    jobs: Sender<(u64, Job<S, R>)>,
    replies: Receiver<(u64, Result<R, ExternalError>)>,
    next_seq: u64,
    outstanding: Option<u64>,
}

impl<S, R> Gateway<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
{
    /// Move `service` onto a dedicated worker thread.
    pub fn spawn(
        subsystem: &'static str,
        service: S,
        timeout: impl Into<CallTimeout>,
    ) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<(u64, Job<S, R>)>();
        let (reply_tx, reply_rx) = mpsc::channel();

        thread::Builder::new()
            .name(format!("growlight-{subsystem}"))
            .spawn(move || {
                let mut service = service;
                for (seq, job) in job_rx {
                    let result = job(&mut service);
                    if reply_tx.send((seq, result)).is_err() {
                        break;
                    }
                }
            })
            .with_context(|| format!("Failed to spawn {subsystem} worker"))?;

        Ok(Self {
            subsystem,
            timeout: timeout.into(),
            jobs: job_tx,
            replies: reply_rx,
            next_seq: 0,
            outstanding: None,
        })
    }

    /// Whether a timed-out call is still running on the worker.
    pub fn is_busy(&mut self) -> bool {
        self.drain_stale();
        self.outstanding.is_some()
    }

    /// Run `job` on the worker and wait for its reply.
    pub fn call<F>(&mut self, job: F) -> Result<R, ExternalError>
    where
        F: FnOnce(&mut S) -> Result<R, ExternalError> + Send + 'static,
    {
        self.drain_stale();
        if self.outstanding.is_some() {
            return Err(ExternalError::Busy(self.subsystem));
        }

        let timeout = self.timeout.allowance();
        if timeout.is_zero() {
            return Err(ExternalError::Timeout {
                subsystem: self.subsystem,
                millis: 0,
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.jobs.send((seq, Box::new(job))).map_err(|_| {
            ExternalError::Communication(format!("{} worker has stopped", self.subsystem))
        })?;
        self.outstanding = Some(seq);

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply_seq, result)) if reply_seq == seq => {
                    self.outstanding = None;
                    return result;
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ExternalError::Timeout {
                        subsystem: self.subsystem,
                        millis: timeout.as_millis() as u64,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.outstanding = None;
                    return Err(ExternalError::Communication(format!(
                        "{} worker has stopped",
                        self.subsystem
                    )));
                }
            }
        }
    }

    // Discard replies that arrived after their caller gave up.
    fn drain_stale(&mut self) {
        while let Ok((seq, _)) = self.replies.try_recv() {
            if self.outstanding == Some(seq) {
                self.outstanding = None;
            }
        }
    }
}

impl LightSensor for Gateway<Box<dyn LightSensor>, LightPattern> {
    fn sample_light(&mut self, try_mode: bool) -> Result<LightPattern, ExternalError> {
        self.call(move |sensor| sensor.sample_light(try_mode))
    }
}

impl PowerMonitor for Gateway<Box<dyn PowerMonitor>, PowerTier> {
    fn read_power(&mut self, try_mode: bool) -> Result<PowerTier, ExternalError> {
        self.call(move |monitor| monitor.read_power(try_mode))
    }
}

impl Actuator for Gateway<Box<dyn Actuator>, ()> {
    fn set_led(&mut self, on: bool, try_mode: bool) -> Result<(), ExternalError> {
        self.call(move |actuator| actuator.set_led(on, try_mode))
    }
}

impl DurationRecorder for Gateway<Box<dyn DurationRecorder>, ()> {
    fn record_duration(&mut self, label: &str, minutes: u32) -> Result<(), ExternalError> {
        let label = label.to_string();
        self.call(move |recorder| recorder.record_duration(&label, minutes))
    }
}
