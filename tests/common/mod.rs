#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ripple_wasm::error::{CompileError, ContextError, ObserveError, ScheduleError, ShaderStage};
use ripple_wasm::host::{
    BoxObserver, BoxSize, FrameCallback, FrameClock, GpuBackend, ResizeCallback, StyleSource,
    SurfaceHost,
};
use ripple_wasm::uniforms::UniformValue;

/// Everything the doubles did, plus switches to make them fail.
pub struct Ledger {
    pub contexts_created: Cell<usize>,
    pub contexts_released: Cell<usize>,
    pub programs_compiled: Cell<usize>,
    pub programs_deleted: Cell<usize>,
    pub quads_created: Cell<usize>,
    pub quads_deleted: Cell<usize>,
    pub draws: Cell<usize>,
    pub viewport: Cell<(u32, u32)>,
    pub uploads: RefCell<HashMap<String, UniformValue>>,
    pub observations_started: Cell<usize>,
    pub observers: RefCell<HashMap<u32, ResizeCallback>>,
    pub frames: RefCell<Vec<(u32, FrameCallback)>>,
    pub frames_requested: Cell<usize>,
    next_id: Cell<u32>,
    pub box_size: Cell<BoxSize>,
    pub background: RefCell<Option<String>>,
    pub properties: RefCell<HashMap<String, String>>,
    pub fail_context: Cell<bool>,
    pub fail_compile: Cell<bool>,
    pub fail_observe: Cell<bool>,
    pub fail_schedule: Cell<bool>,
}

impl Ledger {
    fn new(size: BoxSize) -> Self {
        Self {
            contexts_created: Cell::new(0),
            contexts_released: Cell::new(0),
            programs_compiled: Cell::new(0),
            programs_deleted: Cell::new(0),
            quads_created: Cell::new(0),
            quads_deleted: Cell::new(0),
            draws: Cell::new(0),
            viewport: Cell::new((0, 0)),
            uploads: RefCell::new(HashMap::new()),
            observations_started: Cell::new(0),
            observers: RefCell::new(HashMap::new()),
            frames: RefCell::new(Vec::new()),
            frames_requested: Cell::new(0),
            next_id: Cell::new(0),
            box_size: Cell::new(size),
            background: RefCell::new(None),
            properties: RefCell::new(HashMap::new()),
            fail_context: Cell::new(false),
            fail_compile: Cell::new(false),
            fail_observe: Cell::new(false),
            fail_schedule: Cell::new(false),
        }
    }

    fn id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts_created.get() - self.contexts_released.get()
    }

    pub fn live_programs(&self) -> usize {
        self.programs_compiled.get() - self.programs_deleted.get()
    }

    pub fn live_quads(&self) -> usize {
        self.quads_created.get() - self.quads_deleted.get()
    }

    pub fn active_observers(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn open_resources(&self) -> usize {
        self.live_contexts()
            + self.live_programs()
            + self.live_quads()
            + self.active_observers()
            + self.pending_frames()
    }

    /// Run the oldest queued frame callback at `timestamp` (ms).
    pub fn fire_frame(&self, timestamp: f64) -> bool {
        let next = {
            let mut frames = self.frames.borrow_mut();
            if frames.is_empty() {
                None
            } else {
                Some(frames.remove(0))
            }
        };
        match next {
            Some((_, callback)) => {
                callback(timestamp);
                true
            }
            None => false,
        }
    }

    /// Change the container box and notify every live observation.
    pub fn resize_container(&self, size: BoxSize) {
        self.box_size.set(size);
        let ids: Vec<u32> = self.observers.borrow().keys().copied().collect();
        for id in ids {
            let callback = self.observers.borrow_mut().remove(&id);
            if let Some(mut callback) = callback {
                callback(size);
                self.observers.borrow_mut().insert(id, callback);
            }
        }
    }

    pub fn uploaded(&self, name: &str) -> Option<UniformValue> {
        self.uploads.borrow().get(name).copied()
    }
}

#[derive(Clone)]
pub struct FakeHost {
    pub ledger: Rc<Ledger>,
}

impl FakeHost {
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> (Self, Rc<Ledger>) {
        let ledger = Rc::new(Ledger::new(BoxSize::new(width, height, pixel_ratio)));
        (
            Self {
                ledger: ledger.clone(),
            },
            ledger,
        )
    }

    pub fn sharing(ledger: &Rc<Ledger>) -> Self {
        Self {
            ledger: ledger.clone(),
        }
    }
}

impl StyleSource for FakeHost {
    fn custom_property(&self, name: &str) -> Option<String> {
        self.ledger.properties.borrow().get(name).cloned()
    }
}

impl SurfaceHost for FakeHost {
    type Backend = FakeBackend;
    type Clock = FakeClock;
    type Observer = FakeObserver;

    fn create_context(&self) -> Result<FakeBackend, ContextError> {
        if self.ledger.fail_context.get() {
            return Err(ContextError::Unavailable("no GPU in this test".into()));
        }
        self.ledger
            .contexts_created
            .set(self.ledger.contexts_created.get() + 1);
        Ok(FakeBackend {
            ledger: self.ledger.clone(),
        })
    }

    fn frame_clock(&self) -> FakeClock {
        FakeClock {
            ledger: self.ledger.clone(),
        }
    }

    fn box_observer(&self) -> FakeObserver {
        FakeObserver {
            ledger: self.ledger.clone(),
        }
    }

    fn set_background(&self, color: Option<&str>) {
        *self.ledger.background.borrow_mut() = color.map(str::to_owned);
    }
}

pub struct FakeBackend {
    ledger: Rc<Ledger>,
}

impl GpuBackend for FakeBackend {
    type Program = u32;
    type Quad = u32;
    type Location = String;

    fn compile_program(&self, _vertex: &str, _fragment: &str) -> Result<u32, CompileError> {
        if self.ledger.fail_compile.get() {
            return Err(CompileError::Stage {
                stage: ShaderStage::Fragment,
                log: "ERROR: 0:1: syntax error".into(),
            });
        }
        self.ledger
            .programs_compiled
            .set(self.ledger.programs_compiled.get() + 1);
        Ok(self.ledger.id())
    }

    fn create_quad(&self, _program: &u32) -> Result<u32, CompileError> {
        self.ledger
            .quads_created
            .set(self.ledger.quads_created.get() + 1);
        Ok(self.ledger.id())
    }

    fn uniform_location(&self, _program: &u32, name: &str) -> Option<String> {
        Some(name.to_owned())
    }

    fn use_program(&self, _program: &u32, _quad: &u32) {}

    fn set_uniform(&self, location: &String, value: UniformValue) {
        self.ledger
            .uploads
            .borrow_mut()
            .insert(location.clone(), value);
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.ledger.viewport.set((width, height));
    }

    fn draw_quad(&self) {
        self.ledger.draws.set(self.ledger.draws.get() + 1);
    }

    fn delete_program(&self, _program: u32) {
        self.ledger
            .programs_deleted
            .set(self.ledger.programs_deleted.get() + 1);
    }

    fn delete_quad(&self, _quad: u32) {
        self.ledger
            .quads_deleted
            .set(self.ledger.quads_deleted.get() + 1);
    }

    fn release(&self) {
        self.ledger
            .contexts_released
            .set(self.ledger.contexts_released.get() + 1);
    }
}

pub struct FakeClock {
    ledger: Rc<Ledger>,
}

impl FrameClock for FakeClock {
    type Handle = u32;

    fn request_frame(&self, callback: FrameCallback) -> Result<u32, ScheduleError> {
        if self.ledger.fail_schedule.get() {
            return Err(ScheduleError("frames disabled in this test".into()));
        }
        let id = self.ledger.id();
        self.ledger
            .frames_requested
            .set(self.ledger.frames_requested.get() + 1);
        self.ledger.frames.borrow_mut().push((id, callback));
        Ok(id)
    }

    fn cancel_frame(&self, handle: u32) {
        self.ledger
            .frames
            .borrow_mut()
            .retain(|(id, _)| *id != handle);
    }
}

pub struct FakeObserver {
    ledger: Rc<Ledger>,
}

impl BoxObserver for FakeObserver {
    type Subscription = u32;

    fn current_size(&self) -> BoxSize {
        self.ledger.box_size.get()
    }

    fn observe(&self, callback: ResizeCallback) -> Result<u32, ObserveError> {
        if self.ledger.fail_observe.get() {
            return Err(ObserveError("ResizeObserver is not defined".into()));
        }
        let id = self.ledger.id();
        self.ledger
            .observations_started
            .set(self.ledger.observations_started.get() + 1);
        self.ledger.observers.borrow_mut().insert(id, callback);
        Ok(id)
    }

    fn unobserve(&self, subscription: u32) {
        self.ledger.observers.borrow_mut().remove(&subscription);
    }
}
