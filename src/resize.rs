use crate::error::ObserveError;
use crate::host::{BoxObserver, BoxSize};

/// Watches the container's box and forwards changes, starting with the size
/// it has when the watch begins. Repeats of the last delivered size are
/// swallowed.
pub struct ResizeWatcher<O: BoxObserver> {
    observer: O,
    subscription: Option<O::Subscription>,
}

impl<O: BoxObserver> ResizeWatcher<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            subscription: None,
        }
    }

    pub fn current_size(&self) -> BoxSize {
        self.observer.current_size()
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn start(&mut self, mut on_resize: impl FnMut(BoxSize) + 'static) -> Result<(), ObserveError> {
        self.stop();

        let initial = self.observer.current_size();
        on_resize(initial);

        let mut last = initial;
        let subscription = self.observer.observe(Box::new(move |size| {
            if size != last {
                last = size;
                on_resize(size);
            }
        }))?;
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Safe before `start` and after an earlier `stop`.
    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.observer.unobserve(subscription);
            log::debug!("resize observation stopped");
        }
    }
}

impl<O: BoxObserver> Drop for ResizeWatcher<O> {
    fn drop(&mut self) {
        self.stop();
    }
}
