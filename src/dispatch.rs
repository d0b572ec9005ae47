//! Routes decoded events to handler collaborators.

use log::debug;

use crate::event::{
    ChangeAbandonedEvent, ChangeMergedEvent, ChangeRestoredEvent, CommentAddedEvent, Event,
    PatchsetCreatedEvent, RefUpdatedEvent,
};

/// Implemented by anything that wants to react to gerrit events: ticket
/// systems, chat bots, CI triggers, you name it.
///
/// Every capability defaults to a no-op, so a handler only implements the
/// events it cares about. Handlers are invoked sequentially from a single
/// thread and must not assume concurrent re-entry.
pub trait Handler {
    /// A patch set was uploaded.
    fn patchset_created(&mut self, _event: &PatchsetCreatedEvent) {}

    /// A change was abandoned.
    fn change_abandoned(&mut self, _event: &ChangeAbandonedEvent) {}

    /// A change was restored.
    fn change_restored(&mut self, _event: &ChangeRestoredEvent) {}

    /// A change was merged.
    fn change_merged(&mut self, _event: &ChangeMergedEvent) {}

    /// A review comment was published.
    fn comment_added(&mut self, _event: &CommentAddedEvent) {}

    /// A reference was updated.
    fn ref_updated(&mut self, _event: &RefUpdatedEvent) {}
}

/// Fans each event out to every registered handler.
///
/// The dispatcher holds nothing but its ordered handler list; routing does
/// no buffering and no retries.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn Handler + Send>>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher {
            handlers: Vec::new(),
        }
    }

    /// Handlers are invoked in the order they were added.
    pub fn add_handler(&mut self, handler: Box<dyn Handler + Send>) {
        self.handlers.push(handler);
    }

    /// Invokes the capability matching the event's kind, once per handler.
    pub fn dispatch(&mut self, event: &Event) {
        debug!("dispatching {} event", event.kind());
        for handler in &mut self.handlers {
            match event {
                Event::PatchsetCreated(event) => handler.patchset_created(event),
                Event::ChangeAbandoned(event) => handler.change_abandoned(event),
                Event::ChangeRestored(event) => handler.change_restored(event),
                Event::ChangeMerged(event) => handler.change_merged(event),
                Event::CommentAdded(event) => handler.comment_added(event),
                Event::RefUpdated(event) => handler.ref_updated(event),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::{Arc, Mutex};

    use spectral::prelude::*;

    use crate::object::{Account, Approval, ApprovalKind, Change, PatchSet, RefUpdate};

    type CallLog = Arc<Mutex<Vec<(&'static str, &'static str)>>>;

    struct RecordingHandler {
        name: &'static str,
        log: CallLog,
    }

    impl RecordingHandler {
        fn record(&self, capability: &'static str) {
            self.log.lock().unwrap().push((self.name, capability));
        }
    }

    impl Handler for RecordingHandler {
        fn patchset_created(&mut self, _event: &PatchsetCreatedEvent) {
            self.record("patchset_created");
        }
        fn change_abandoned(&mut self, _event: &ChangeAbandonedEvent) {
            self.record("change_abandoned");
        }
        fn change_restored(&mut self, _event: &ChangeRestoredEvent) {
            self.record("change_restored");
        }
        fn change_merged(&mut self, _event: &ChangeMergedEvent) {
            self.record("change_merged");
        }
        fn comment_added(&mut self, _event: &CommentAddedEvent) {
            self.record("comment_added");
        }
        fn ref_updated(&mut self, _event: &RefUpdatedEvent) {
            self.record("ref_updated");
        }
    }

    /// Only cares about comments; everything else is the default no-op.
    struct CommentOnlyHandler {
        log: CallLog,
    }

    impl Handler for CommentOnlyHandler {
        fn comment_added(&mut self, _event: &CommentAddedEvent) {
            self.log.lock().unwrap().push(("comment_only", "comment_added"));
        }
    }

    fn account() -> Account {
        Account {
            name: "Alice".to_string(),
            email: "alice@example.org".to_string(),
        }
    }

    fn change() -> Change {
        Change {
            project: "demo".to_string(),
            branch: "master".to_string(),
            change_id: "Iabc".to_string(),
            number: 1,
            subject: "subject".to_string(),
            owner: account(),
            url: "https://gerrit.example.org/1".to_string(),
        }
    }

    fn patch_set() -> PatchSet {
        PatchSet {
            number: 2,
            revision: "deadbeef".to_string(),
            reference: "refs/changes/01/1/2".to_string(),
            uploader: account(),
            created_on: 1_553_631_812,
        }
    }

    fn comment_added_event() -> Event {
        Event::CommentAdded(CommentAddedEvent {
            approvals: vec![Approval {
                value: 2,
                kind: ApprovalKind::CodeReview,
                description: "Code Review".to_string(),
            }],
            comment: "looks good".to_string(),
            change: change(),
            author: account(),
            patch_set: patch_set(),
        })
    }

    fn ref_updated_event() -> Event {
        Event::RefUpdated(RefUpdatedEvent {
            ref_update: RefUpdate {
                old_rev: "a".to_string(),
                new_rev: "b".to_string(),
                ref_name: "refs/heads/x".to_string(),
                project: "p".to_string(),
            },
        })
    }

    #[test]
    fn test_dispatch_reaches_every_handler_in_registration_order() {
        let log = CallLog::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(Box::new(RecordingHandler {
            name: "first",
            log: log.clone(),
        }));
        dispatcher.add_handler(Box::new(RecordingHandler {
            name: "second",
            log: log.clone(),
        }));

        dispatcher.dispatch(&comment_added_event());

        let calls = log.lock().unwrap();
        assert_that!(*calls)
            .is_equal_to(vec![("first", "comment_added"), ("second", "comment_added")]);
    }

    #[test]
    fn test_dispatch_invokes_exactly_one_capability() {
        let log = CallLog::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(Box::new(RecordingHandler {
            name: "only",
            log: log.clone(),
        }));

        dispatcher.dispatch(&ref_updated_event());

        let calls = log.lock().unwrap();
        assert_that!(*calls).is_equal_to(vec![("only", "ref_updated")]);
    }

    #[test]
    fn test_unimplemented_capability_is_a_no_op() {
        let log = CallLog::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(Box::new(CommentOnlyHandler { log: log.clone() }));

        dispatcher.dispatch(&ref_updated_event());
        assert_that!(log.lock().unwrap().len()).is_equal_to(0);

        dispatcher.dispatch(&comment_added_event());
        assert_that!(*log.lock().unwrap())
            .is_equal_to(vec![("comment_only", "comment_added")]);
    }
}
