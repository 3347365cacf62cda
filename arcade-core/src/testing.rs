//! Test helpers shared by the unit tests.

extern crate std;

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::vec::Vec;

use crate::dispatch::{ReportTransport, TransportError};
use crate::lifecycle::{ConnectionState, LinkState};

/// Run a future that never pends to completion.
pub fn block_on<F: Future>(f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = pin!(f);

    match f.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("Mock future returned Pending unexpectedly"),
    }
}

/// Transport that records every report and can be told to fail.
pub struct MockTransport<'a> {
    pub sent: Vec<Vec<u8>>,
    pub wakeups: usize,
    pub states_seen: Vec<ConnectionState>,
    failures: Vec<TransportError>,
    link: Option<&'a LinkState>,
}

impl<'a> MockTransport<'a> {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            wakeups: 0,
            states_seen: Vec::new(),
            failures: Vec::new(),
            link: None,
        }
    }

    /// Fail the next transmit with `error` (queued, first in first out).
    pub fn fail_next(&mut self, error: TransportError) {
        self.failures.push(error);
    }

    /// Record the link's connection state on every transmit.
    pub fn observe_link(&mut self, link: &'a LinkState) {
        self.link = Some(link);
    }
}

impl ReportTransport for MockTransport<'_> {
    fn transmit(&mut self, report: &[u8]) -> impl Future<Output = Result<(), TransportError>> {
        if let Some(link) = self.link {
            self.states_seen.push(link.connection());
        }
        let result = if self.failures.is_empty() {
            self.sent.push(report.to_vec());
            Ok(())
        } else {
            Err(self.failures.remove(0))
        };
        core::future::ready(result)
    }

    fn remote_wakeup(&mut self) -> Result<(), TransportError> {
        self.wakeups += 1;
        Ok(())
    }
}
