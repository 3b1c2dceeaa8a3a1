//! Explicit subscription lists for host events.
//!
//! Host callbacks (window resizes, display refresh ticks) are registered on an
//! [`EventHub`]. Every registration returns a [`Subscription`] that can be used
//! to remove the handler again; removed handlers are dropped on the next emit.

use std::{cell::Cell, rc::Rc};

type Handler<C, A> = Box<dyn FnMut(&mut C, &A) -> anyhow::Result<()>>;

/// Handle of a registered handler.
#[derive(Clone, Debug)]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            active: Rc::new(Cell::new(true)),
        }
    }

    /// Stop the handler from being called. Unsubscribing twice is harmless.
    pub fn unsubscribe(&self) {
        self.active.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Handlers receiving a mutable context `C` and an event argument `A`.
pub struct EventHub<C, A> {
    handlers: Vec<(Rc<Cell<bool>>, Handler<C, A>)>,
}

impl<C, A> EventHub<C, A> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&mut C, &A) -> anyhow::Result<()> + 'static,
    ) -> Subscription {
        let subscription = Subscription::new();
        self.handlers
            .push((subscription.active.clone(), Box::new(handler)));
        subscription
    }

    /// Call every active handler in registration order.
    ///
    /// Stops at the first failing handler and returns its error. On success the
    /// number of invoked handlers is returned.
    pub fn emit(&mut self, ctx: &mut C, arg: &A) -> anyhow::Result<usize> {
        self.handlers.retain(|(active, _)| active.get());
        let mut invoked = 0;
        for (active, handler) in self.handlers.iter_mut() {
            // a handler may unsubscribe one registered after it
            if !active.get() {
                continue;
            }
            handler(ctx, arg)?;
            invoked += 1;
        }
        Ok(invoked)
    }

    /// Number of handlers that are still subscribed.
    pub fn len(&self) -> usize {
        self.handlers.iter().filter(|(active, _)| active.get()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C, A> Default for EventHub<C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A> std::fmt::Debug for EventHub<C, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub").field("handlers", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_run_in_registration_order() {
        let mut hub: EventHub<Vec<u32>, u32> = EventHub::new();
        hub.subscribe(|log, n| {
            log.push(*n);
            Ok(())
        });
        hub.subscribe(|log, n| {
            log.push(n * 10);
            Ok(())
        });
        let mut log = Vec::new();
        assert_eq!(hub.emit(&mut log, &3).unwrap(), 2);
        assert_eq!(log, vec![3, 30]);
    }

    #[test]
    fn unsubscribed_handlers_are_not_called() {
        let mut hub: EventHub<u32, ()> = EventHub::new();
        let first = hub.subscribe(|count, _| {
            *count += 1;
            Ok(())
        });
        hub.subscribe(|count, _| {
            *count += 100;
            Ok(())
        });
        first.unsubscribe();
        first.unsubscribe();
        assert!(!first.is_active());
        assert_eq!(hub.len(), 1);

        let mut count = 0;
        hub.emit(&mut count, &()).unwrap();
        assert_eq!(count, 100);
    }

    #[test]
    fn errors_stop_the_emit() {
        let mut hub: EventHub<u32, ()> = EventHub::new();
        hub.subscribe(|_, _| anyhow::bail!("broken"));
        hub.subscribe(|count, _| {
            *count += 1;
            Ok(())
        });
        let mut count = 0;
        let err = hub.emit(&mut count, &()).unwrap_err();
        assert_eq!(err.to_string(), "broken");
        assert_eq!(count, 0);
    }

    #[test]
    fn empty_hub_emits_nothing() {
        let mut hub: EventHub<(), ()> = EventHub::default();
        assert!(hub.is_empty());
        assert_eq!(hub.emit(&mut (), &()).unwrap(), 0);
    }
}
