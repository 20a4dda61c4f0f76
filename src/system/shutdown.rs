//! Shutdown Signal
//!
//! A single broadcast stop flag. Unlike an embassy `Signal`, which hands its
//! value to one waiter, every task waiting on `Shutdown::wait` is woken when
//! the flag is raised. `raise` may be called from any thread, including the
//! OS signal handler thread.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Maximum number of concurrent waiters before older wakers are flushed
const MAX_WAITERS: usize = 8;

struct State {
    raised: bool,
    wakers: MultiWakerRegistration<MAX_WAITERS>,
}

/// Broadcast stop signal observed by every task
pub struct Shutdown {
    state: Mutex<CriticalSectionRawMutex, RefCell<State>>,
}

impl Shutdown {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                raised: false,
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Raises the stop flag and wakes every waiter. Idempotent.
    pub fn raise(&self) {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            s.raised = true;
            s.wakers.wake();
        });
    }

    pub fn is_raised(&self) -> bool {
        self.state.lock(|s| s.borrow().raised)
    }

    /// Resolves once the flag is raised; immediately if it already is
    pub async fn wait(&self) {
        poll_fn(|cx| {
            self.state.lock(|s| {
                let mut s = s.borrow_mut();
                if s.raised {
                    Poll::Ready(())
                } else {
                    s.wakers.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
