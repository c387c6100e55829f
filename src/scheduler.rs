//! Cooperative per-display-frame loop.
//!
//! `Idle → Running → Cancelled`. Cancelled is terminal; a paused effect is a
//! cancelled scheduler followed later by a fresh one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::ScheduleError;
use crate::host::FrameClock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Cancelled,
}

type OnFrame = Box<dyn FnMut(f64)>;

struct Shared<C: FrameClock> {
    clock: C,
    state: Cell<SchedulerState>,
    pending: RefCell<Option<C::Handle>>,
    last_timestamp: Cell<Option<f64>>,
    on_frame: RefCell<Option<OnFrame>>,
}

pub struct AnimationScheduler<C: FrameClock + 'static> {
    shared: Rc<Shared<C>>,
}

impl<C: FrameClock + 'static> AnimationScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            shared: Rc::new(Shared {
                clock,
                state: Cell::new(SchedulerState::Idle),
                pending: RefCell::new(None),
                last_timestamp: Cell::new(None),
                on_frame: RefCell::new(None),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state.get()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.shared.pending.borrow().is_some()
    }

    /// Begin calling `on_frame(dt)` once per display refresh, `dt` being the
    /// seconds elapsed since the previous call (zero for the first).
    pub fn start(&mut self, on_frame: impl FnMut(f64) + 'static) -> Result<(), ScheduleError> {
        match self.state() {
            SchedulerState::Idle => {}
            SchedulerState::Running => {
                log::warn!("animation scheduler already running");
                return Ok(());
            }
            SchedulerState::Cancelled => {
                return Err(ScheduleError("scheduler was cancelled".to_owned()));
            }
        }

        *self.shared.on_frame.borrow_mut() = Some(Box::new(on_frame));
        self.shared.state.set(SchedulerState::Running);
        if let Err(err) = Shared::schedule(&self.shared) {
            self.cancel();
            return Err(err);
        }
        Ok(())
    }

    /// Stop the loop. A frame already queued by the display will find the
    /// scheduler cancelled and do nothing. No-op unless running.
    pub fn cancel(&mut self) {
        if self.state() != SchedulerState::Running {
            return;
        }
        self.shared.state.set(SchedulerState::Cancelled);
        if let Some(handle) = self.shared.pending.borrow_mut().take() {
            self.shared.clock.cancel_frame(handle);
        }
        self.shared.on_frame.borrow_mut().take();
    }
}

impl<C: FrameClock + 'static> Drop for AnimationScheduler<C> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<C: FrameClock + 'static> Shared<C> {
    fn schedule(this: &Rc<Self>) -> Result<(), ScheduleError> {
        let weak = Rc::downgrade(this);
        let handle = this.clock.request_frame(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                Shared::tick(&shared, timestamp);
            }
        }))?;
        *this.pending.borrow_mut() = Some(handle);
        Ok(())
    }

    fn tick(this: &Rc<Self>, timestamp: f64) {
        this.pending.borrow_mut().take();
        if this.state.get() != SchedulerState::Running {
            return;
        }

        let dt = match this.last_timestamp.replace(Some(timestamp)) {
            Some(previous) => ((timestamp - previous) / 1000.0).max(0.0),
            None => 0.0,
        };

        // Taken out for the call so the callback may cancel us.
        let callback = this.on_frame.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(dt);
            if this.state.get() == SchedulerState::Running {
                *this.on_frame.borrow_mut() = Some(callback);
            }
        }

        if this.state.get() == SchedulerState::Running {
            if let Err(err) = Shared::schedule(this) {
                log::error!("animation loop stopped: {err}");
                this.state.set(SchedulerState::Cancelled);
                this.on_frame.borrow_mut().take();
            }
        }
    }
}
