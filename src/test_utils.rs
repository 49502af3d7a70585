//! Test utilities: a decoder whose behavior is scripted step by step
//!
//! [`ScriptedDecoder`] lets tests dictate exactly which opens succeed and what
//! each frame read returns, while a cloned [`ScriptHandle`] observes how the
//! decoder was driven.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::decoder::{Decoder, StreamProperty, TransportOptions};
use crate::types::{Frame, StreamEndpoint};
use crate::{CaptureError, Result};

/// Default simulated time each read takes (25 fps)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// Outcome of one scripted frame read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStep {
    /// Return a decoded frame
    Frame,
    /// Return `Ok(None)`
    Empty,
    /// Return a transient `CaptureError::Read`
    Fail,
    /// Return an unexpected `CaptureError::Decoder`
    Error,
    /// Panic inside the decoder
    Panic,
    /// Never complete
    Hang,
}

#[derive(Debug)]
struct Script {
    opens: VecDeque<bool>,
    default_open: bool,
    reads: VecDeque<ReadStep>,
    default_read: ReadStep,
    frame_interval: Duration,
    metadata: (Option<f64>, Option<f64>, Option<f64>),
    open_calls: u32,
    close_calls: u32,
    read_calls: u32,
    is_open: bool,
    last_options: Option<TransportOptions>,
}

/// Shared view of a scripted decoder's script and call counters
#[derive(Debug, Clone)]
pub struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptHandle {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue results for upcoming opens
    pub fn push_opens(&self, results: &[bool]) -> &Self {
        self.lock().opens.extend(results.iter().copied());
        self
    }

    /// Result for opens once the queue is empty
    pub fn set_default_open(&self, succeed: bool) -> &Self {
        self.lock().default_open = succeed;
        self
    }

    /// Queue `count` repetitions of `step`
    pub fn push_reads(&self, step: ReadStep, count: usize) -> &Self {
        self.lock().reads.extend(std::iter::repeat_n(step, count));
        self
    }

    /// Read outcome once the queue is empty
    pub fn set_default_read(&self, step: ReadStep) -> &Self {
        self.lock().default_read = step;
        self
    }

    /// Simulated duration of every read
    pub fn set_frame_interval(&self, interval: Duration) -> &Self {
        self.lock().frame_interval = interval;
        self
    }

    /// Properties reported after open
    pub fn set_metadata(&self, fps: Option<f64>, width: Option<f64>, height: Option<f64>) -> &Self {
        self.lock().metadata = (fps, width, height);
        self
    }

    pub fn open_calls(&self) -> u32 {
        self.lock().open_calls
    }

    pub fn close_calls(&self) -> u32 {
        self.lock().close_calls
    }

    pub fn read_calls(&self) -> u32 {
        self.lock().read_calls
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    pub fn last_options(&self) -> Option<TransportOptions> {
        self.lock().last_options.clone()
    }
}

/// Decoder driven entirely by a [`ScriptHandle`]
#[derive(Debug)]
pub struct ScriptedDecoder {
    script: ScriptHandle,
    sequence: u64,
}

impl ScriptedDecoder {
    /// Decoder that opens successfully and yields frames until told otherwise
    pub fn new() -> (Self, ScriptHandle) {
        let script = ScriptHandle(Arc::new(Mutex::new(Script {
            opens: VecDeque::new(),
            default_open: true,
            reads: VecDeque::new(),
            default_read: ReadStep::Frame,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            metadata: (Some(25.0), Some(640.0), Some(480.0)),
            open_calls: 0,
            close_calls: 0,
            read_calls: 0,
            is_open: false,
            last_options: None,
        })));
        (Self { script: script.clone(), sequence: 0 }, script)
    }
}

#[async_trait::async_trait]
impl Decoder for ScriptedDecoder {
    async fn open(&mut self, endpoint: &StreamEndpoint, options: &TransportOptions) -> Result<()> {
        let mut script = self.script.lock();
        script.open_calls += 1;
        script.last_options = Some(options.clone());
        let succeed = script.opens.pop_front().unwrap_or(script.default_open);
        script.is_open = succeed;
        if succeed {
            Ok(())
        } else {
            Err(CaptureError::connect_failed(endpoint.redacted(), "scripted open failure"))
        }
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let (step, interval) = {
            let mut script = self.script.lock();
            script.read_calls += 1;
            let step = script.reads.pop_front().unwrap_or(script.default_read);
            (step, script.frame_interval)
        };

        if step == ReadStep::Hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(interval).await;

        match step {
            ReadStep::Frame => {
                self.sequence += 1;
                Ok(Some(Frame::new(vec![self.sequence as u8; 12], 2, 2, self.sequence)))
            }
            ReadStep::Empty => Ok(None),
            ReadStep::Fail => Err(CaptureError::read_failed("scripted read failure")),
            ReadStep::Error => Err(CaptureError::decoder("scripted decoder failure")),
            ReadStep::Panic => panic!("scripted decoder panic"),
            ReadStep::Hang => unreachable!("hang never completes"),
        }
    }

    fn property(&self, property: StreamProperty) -> Option<f64> {
        let script = self.script.lock();
        if !script.is_open {
            return None;
        }
        match property {
            StreamProperty::Fps => script.metadata.0,
            StreamProperty::FrameWidth => script.metadata.1,
            StreamProperty::FrameHeight => script.metadata.2,
        }
    }

    fn is_open(&self) -> bool {
        self.script.lock().is_open
    }

    async fn close(&mut self) -> Result<()> {
        let mut script = self.script.lock();
        script.close_calls += 1;
        script.is_open = false;
        Ok(())
    }
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
