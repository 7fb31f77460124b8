//! Background analysis thread.
//!
//! At most one analysis runs at a time. Submitting a new image flags the
//! running task as cancelled and joins its thread before the next one starts,
//! so events for an older request always arrive before events for a newer one.

use chrono::{DateTime, Local};
use image::RgbImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::ocr::{analyze_image, AnalysisSettings, TextDetector, TickerRateMap};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Progress of one analysis request.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    Status {
        request: u64,
        message: String,
    },
    /// Final result. Empty when the detector failed or panicked.
    Completed {
        request: u64,
        rates: TickerRateMap,
        finished_at: DateTime<Local>,
    },
    /// A newer request replaced this one; its result was discarded.
    Cancelled {
        request: u64,
    },
}

impl AnalysisEvent {
    pub fn request(&self) -> u64 {
        match self {
            AnalysisEvent::Status { request, .. }
            | AnalysisEvent::Completed { request, .. }
            | AnalysisEvent::Cancelled { request } => *request,
        }
    }
}

struct RunningTask {
    request: u64,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the detector and the single in-flight analysis thread.
pub struct AnalysisRunner {
    detector: Arc<dyn TextDetector>,
    settings: Arc<AnalysisSettings>,
    events: Sender<AnalysisEvent>,
    next_request: u64,
    current: Option<RunningTask>,
}

impl AnalysisRunner {
    /// Creates a runner and the receiving end of its event channel.
    pub fn new(
        detector: Arc<dyn TextDetector>,
        settings: AnalysisSettings,
    ) -> (Self, Receiver<AnalysisEvent>) {
        let (events, receiver) = channel();
        let runner = Self {
            detector,
            settings: Arc::new(settings),
            events,
            next_request: 0,
            current: None,
        };
        (runner, receiver)
    }

    /// Starts analyzing `image`, replacing any analysis still running.
    ///
    /// Blocks until the previous task's thread has exited.
    pub fn submit(&mut self, image: RgbImage) -> u64 {
        self.cancel_current();

        self.next_request += 1;
        let request = self.next_request;
        let cancel = Arc::new(AtomicBool::new(false));

        let detector = Arc::clone(&self.detector);
        let settings = Arc::clone(&self.settings);
        let events = self.events.clone();
        let task_cancel = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            run_analysis(request, detector.as_ref(), &settings, &image, &task_cancel, &events);
        });

        self.current = Some(RunningTask {
            request,
            cancel,
            handle,
        });
        request
    }

    /// Waits for the running analysis to finish without cancelling it.
    pub fn wait(&mut self) {
        if let Some(task) = self.current.take() {
            if task.handle.join().is_err() {
                warn!("Analysis thread {} exited abnormally", task.request);
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Blocks until `request` completes and returns its rates.
    ///
    /// Status messages are logged. Returns `None` when the request was
    /// cancelled, or when its thread is gone without having reported.
    pub fn await_result(
        &mut self,
        events: &Receiver<AnalysisEvent>,
        request: u64,
    ) -> Option<TickerRateMap> {
        let result = loop {
            match events.recv_timeout(EVENT_POLL_INTERVAL) {
                Ok(event) => {
                    if let Some(outcome) = outcome_for(event, request) {
                        break outcome;
                    }
                }
                Err(RecvTimeoutError::Timeout) if self.is_busy() => {}
                // Thread finished; whatever it sent is already queued
                Err(_) => break events.try_iter().find_map(|e| outcome_for(e, request)).flatten(),
            }
        };
        self.wait();
        result
    }

    /// Tells the running analysis to stop and joins its thread.
    pub fn cancel_current(&mut self) {
        if let Some(task) = self.current.take() {
            debug!("Cancelling analysis {}", task.request);
            task.cancel.store(true, Ordering::SeqCst);
            if task.handle.join().is_err() {
                warn!("Analysis thread {} exited abnormally", task.request);
            }
        }
    }
}

impl Drop for AnalysisRunner {
    fn drop(&mut self) {
        self.cancel_current();
    }
}

/// `Some(outcome)` once `event` ends `request`.
fn outcome_for(event: AnalysisEvent, request: u64) -> Option<Option<TickerRateMap>> {
    if event.request() != request {
        return None;
    }
    match event {
        AnalysisEvent::Status { message, .. } => {
            info!("{}", message);
            None
        }
        AnalysisEvent::Completed { rates, .. } => Some(Some(rates)),
        AnalysisEvent::Cancelled { .. } => Some(None),
    }
}

fn run_analysis(
    request: u64,
    detector: &dyn TextDetector,
    settings: &AnalysisSettings,
    image: &RgbImage,
    cancel: &AtomicBool,
    events: &Sender<AnalysisEvent>,
) {
    // Send failures mean nobody is listening anymore; the work is moot then
    let _ = events.send(AnalysisEvent::Status {
        request,
        message: format!("Analyzing image with {}...", detector.name()),
    });

    if cancel.load(Ordering::SeqCst) {
        let _ = events.send(AnalysisEvent::Cancelled { request });
        return;
    }

    let rates = match catch_unwind(AssertUnwindSafe(|| analyze_image(detector, image, settings))) {
        Ok(rates) => rates,
        Err(_) => {
            error!("Analysis {} panicked, reporting no rates", request);
            TickerRateMap::new()
        }
    };

    if cancel.load(Ordering::SeqCst) {
        info!("Analysis {} superseded, discarding {} rates", request, rates.len());
        let _ = events.send(AnalysisEvent::Cancelled { request });
        return;
    }

    info!("Analysis {} finished: {} tickers", request, rates.len());
    let _ = events.send(AnalysisEvent::Completed {
        request,
        rates,
        finished_at: Local::now(),
    });
}
