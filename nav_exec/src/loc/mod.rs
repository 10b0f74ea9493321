//! # Localisation module
//!
//! The localisation reader pushes notifications asynchronously from whatever thread its client
//! runs on. This module turns that stream into a single pose slot which the control loop can
//! snapshot once per cycle.
//!
//! The slot is a mutex-protected `Option<Pose>`, so a reader always sees a consistent position
//! and heading. It is `None` until the first valid fix arrives, and is never cleared afterwards:
//! a missed read keeps the last known pose. A condition variable is signalled on the first fix so
//! the control loop can sleep until localisation is available rather than polling for it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Point2;
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex,
    },
    time::Duration,
};

// Internal
use comms_if::eqpt::loc::{IdHandler, IdNotification, PoseFix};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and heading on the mat) of the cube.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Pose {
    /// Position along the mat X axis.
    ///
    /// Units: millimeters
    pub x_mm: i32,

    /// Position along the mat Y axis.
    ///
    /// Units: millimeters
    pub y_mm: i32,

    /// Heading measured from the mat X axis towards the mat Y axis.
    ///
    /// Units: degrees, in the range [0, 360)
    pub heading_deg: i32,
}

/// Shared slot holding the latest pose.
///
/// Cloning the slot gives another handle onto the same pose.
#[derive(Clone, Default)]
pub struct PoseSlot {
    inner: Arc<(Mutex<Option<Pose>>, Condvar)>,
}

/// Receives notifications about the fix stream, for counting or logging by the caller.
pub trait FixObserver: Send + Sync {
    /// Called for every valid fix, after the pose slot has been updated.
    fn on_fix(&self, _pose: &Pose) {}

    /// Called for every missed read with the total number of misses so far.
    fn on_missed(&self, _num_missed: u64) {}
}

/// Localisation client, turns the notification stream into the pose slot.
#[derive(Clone, Default)]
pub struct LocClient {
    shared: Arc<LocShared>,
}

#[derive(Default)]
struct LocShared {
    slot: PoseSlot,
    num_fixes: AtomicU64,
    num_missed: AtomicU64,
    num_other: AtomicU64,
    observer: Option<Arc<dyn FixObserver>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Build a pose from a fix, wrapping the heading into [0, 360).
    pub fn from_fix(fix: &PoseFix) -> Self {
        Self {
            x_mm: fix.x_mm,
            y_mm: fix.y_mm,
            heading_deg: fix.heading_deg.rem_euclid(360),
        }
    }

    /// Position of the cube as a point on the mat.
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x_mm as f64, self.y_mm as f64)
    }

    /// Euclidian distance from the cube to the given point.
    pub fn distance_to(&self, point: &Point2<f64>) -> f64 {
        nalgebra::distance(&self.position(), point)
    }
}

impl PoseSlot {
    /// Overwrite the pose, waking anyone waiting for the first fix.
    pub fn store(&self, pose: Pose) {
        let (lock, cvar) = &*self.inner;
        let mut slot = lock.lock().expect("PoseSlot: pose mutex poisoned");

        let first = slot.is_none();
        *slot = Some(pose);

        if first {
            cvar.notify_all();
        }
    }

    /// Get a copy of the latest pose, or `None` if no fix has been received yet.
    pub fn snapshot(&self) -> Option<Pose> {
        let (lock, _) = &*self.inner;
        *lock.lock().expect("PoseSlot: pose mutex poisoned")
    }

    /// Block until the first pose is available or the timeout elapses.
    ///
    /// Returns immediately if a pose is already present.
    pub fn wait_first(&self, timeout: Duration) -> Option<Pose> {
        let (lock, cvar) = &*self.inner;
        let slot = lock.lock().expect("PoseSlot: pose mutex poisoned");

        let (slot, _) = cvar
            .wait_timeout_while(slot, timeout, |p| p.is_none())
            .expect("PoseSlot: pose mutex poisoned");

        *slot
    }
}

impl LocClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client which reports to the given observer.
    pub fn with_observer(observer: Arc<dyn FixObserver>) -> Self {
        Self {
            shared: Arc::new(LocShared {
                observer: Some(observer),
                ..Default::default()
            }),
        }
    }

    /// Build a handler to be registered with a localisation source.
    pub fn handler(&self) -> IdHandler {
        let shared = self.shared.clone();
        Arc::new(move |notif| shared.handle(notif))
    }

    /// Process a single notification.
    pub fn handle(&self, notif: IdNotification) {
        self.shared.handle(notif)
    }

    /// The pose slot written by this client.
    pub fn slot(&self) -> &PoseSlot {
        &self.shared.slot
    }

    /// Get a copy of the latest pose.
    pub fn pose(&self) -> Option<Pose> {
        self.shared.slot.snapshot()
    }

    pub fn num_fixes(&self) -> u64 {
        self.shared.num_fixes.load(Ordering::Relaxed)
    }

    pub fn num_missed(&self) -> u64 {
        self.shared.num_missed.load(Ordering::Relaxed)
    }

    pub fn num_other(&self) -> u64 {
        self.shared.num_other.load(Ordering::Relaxed)
    }
}

impl LocShared {
    fn handle(&self, notif: IdNotification) {
        match notif {
            IdNotification::ValidFix(fix) => {
                let pose = Pose::from_fix(&fix);
                self.slot.store(pose);

                if self.num_fixes.fetch_add(1, Ordering::Relaxed) == 0 {
                    info!(
                        "First fix received: ({}, {}) heading {} deg",
                        pose.x_mm, pose.y_mm, pose.heading_deg
                    );
                }

                if let Some(ref o) = self.observer {
                    o.on_fix(&pose);
                }
            }
            IdNotification::Missed => {
                let num_missed = self.num_missed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Missed fix ({} total), keeping last known pose", num_missed);

                if let Some(ref o) = self.observer {
                    o.on_missed(num_missed);
                }
            }
            IdNotification::Other => {
                self.num_other.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
