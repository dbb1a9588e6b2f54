//! Bounds how many frames load at once.
//!
//! With queuing enabled, units of render work run one at a time in the
//! order they were added; each unit signals completion through its [`Next`]
//! handle. With queuing disabled every unit starts as soon as it is added.

use futures::{
    FutureExt,
    channel::oneshot,
    future::{LocalBoxFuture, Shared},
};
use std::{cell::RefCell, rc::Rc};

use crate::browser::Browser;

/// Completion handle of a queued unit.
///
/// Calling it more than once is harmless. Dropping every clone without
/// calling it also completes the unit, so a unit that fails can never stall
/// the queue.
#[derive(Clone, Default)]
pub struct Next(Rc<RefCell<Option<oneshot::Sender<()>>>>);

impl Next {
    fn new(sender: oneshot::Sender<()>) -> Self {
        Self(Rc::new(RefCell::new(Some(sender))))
    }

    /// Let the next unit start
    pub fn call(&self) {
        if let Some(sender) = self.0.borrow_mut().take() {
            let _ = sender.send(());
        }
    }
}

/// Serialises render work across embeds.
pub struct RenderQueue<B: Browser> {
    browser: Rc<B>,
    tail: RefCell<Option<Shared<LocalBoxFuture<'static, ()>>>>,
}

impl<B: Browser> RenderQueue<B> {
    /// Create an empty queue scheduling work on `browser`
    pub fn new(browser: Rc<B>) -> Self {
        Self {
            browser,
            tail: RefCell::new(None),
        }
    }

    /// Schedule `work`. When `queued` is false it starts right away;
    /// otherwise it starts once every earlier queued unit has completed.
    pub fn add<F>(&self, queued: bool, work: F)
    where
        F: FnOnce(Next) -> LocalBoxFuture<'static, ()> + 'static,
    {
        if !queued {
            self.browser.spawn(work(Next::default()));
            return;
        }

        let (sender, receiver) = oneshot::channel();
        let done = receiver.map(|_| ()).boxed_local().shared();
        let previous = self.tail.borrow_mut().replace(done);

        self.browser.spawn(
            async move {
                if let Some(previous) = previous {
                    previous.await;
                }
                work(Next::new(sender)).await;
            }
            .boxed_local(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::memory::MemoryBrowser;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn unit(
        log: &Log,
        name: &'static str,
        hold: &Rc<RefCell<Vec<Next>>>,
    ) -> impl FnOnce(Next) -> LocalBoxFuture<'static, ()> + 'static {
        let log = log.clone();
        let hold = hold.clone();
        move |next| {
            async move {
                log.borrow_mut().push(name);
                hold.borrow_mut().push(next);
            }
            .boxed_local()
        }
    }

    #[test]
    fn it_runs_queued_units_one_at_a_time_in_order() {
        let browser = MemoryBrowser::new("http://app/");
        let queue = RenderQueue::new(browser.clone());
        let log: Log = Rc::default();
        let held = Rc::new(RefCell::new(Vec::new()));

        queue.add(true, unit(&log, "first", &held));
        queue.add(true, unit(&log, "second", &held));
        queue.add(true, unit(&log, "third", &held));
        browser.run();
        assert_eq!(*log.borrow(), vec!["first"]);

        held.borrow()[0].call();
        held.borrow()[0].call();
        browser.run();
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        held.borrow()[1].call();
        browser.run();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn it_releases_the_queue_when_a_unit_gives_up() {
        let browser = MemoryBrowser::new("http://app/");
        let queue = RenderQueue::new(browser.clone());
        let log: Log = Rc::default();
        let held = Rc::new(RefCell::new(Vec::new()));

        {
            let log = log.clone();
            queue.add(true, move |_next| {
                async move { log.borrow_mut().push("failed") }.boxed_local()
            });
        }
        queue.add(true, unit(&log, "after", &held));
        browser.run();

        assert_eq!(*log.borrow(), vec!["failed", "after"]);
    }

    #[test]
    fn it_runs_units_immediately_when_disabled() {
        let browser = MemoryBrowser::new("http://app/");
        let queue = RenderQueue::new(browser.clone());
        let log: Log = Rc::default();
        let held = Rc::new(RefCell::new(Vec::new()));

        queue.add(false, unit(&log, "first", &held));
        queue.add(false, unit(&log, "second", &held));
        browser.run();

        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }
}
