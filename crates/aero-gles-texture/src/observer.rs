//! State-change notifications between GL objects.
//!
//! A [`Subject`] holds weak references to its observers; dropping an observer unregisters it
//! implicitly. Every notification is a [`SubjectMessage`] tagged with the [`SubjectIndex`] the
//! observer registered under, delivered through [`Observer::on_subject_state_change`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubjectMessage {
    /// Contents changed but storage did not.
    ContentsChanged,
    /// New dirty bits need to be synced before the next use.
    DirtyBitsFlagged,
    /// Storage was respecified; dependents must revalidate.
    SubjectChanged,
    /// Backing storage was released (e.g. a swapchain image went away).
    StorageReleased,
    /// The backend finished initializing every image.
    InitializationComplete,
    /// The backend reallocated internal memory.
    InternalMemoryAllocationChanged,
    SubjectMapped,
    SubjectUnmapped,
    BindingChanged,
    FoveatedRenderingStateChanged,
    /// The texture's name was deleted by the application.
    TextureIdDeleted,
}

/// Which of an observer's subjects a message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubjectIndex {
    /// The texture's backend implementation.
    TextureImpl,
    /// The buffer backing a buffer texture.
    Buffer,
    /// Caller-defined slot, e.g. a framebuffer attachment point.
    Binding(u32),
}

pub trait Observer {
    fn on_subject_state_change(&mut self, index: SubjectIndex, message: SubjectMessage);
}

pub type ObserverRef = Rc<RefCell<dyn Observer>>;

#[derive(Default)]
pub struct Subject {
    observers: Vec<(SubjectIndex, Weak<RefCell<dyn Observer>>)>,
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, index: SubjectIndex, observer: &ObserverRef) {
        self.observers.push((index, Rc::downgrade(observer)));
    }

    pub fn add_weak_observer(
        &mut self,
        index: SubjectIndex,
        observer: Weak<RefCell<dyn Observer>>,
    ) {
        self.observers.push((index, observer));
    }

    pub fn remove_observer(&mut self, observer: &Weak<RefCell<dyn Observer>>) {
        self.observers
            .retain(|(_, registered)| !Weak::ptr_eq(registered, observer));
    }

    pub fn has_observers(&self) -> bool {
        self.observers
            .iter()
            .any(|(_, observer)| observer.strong_count() > 0)
    }

    /// Snapshot of live observers. Delivering from a snapshot lets observers unregister while
    /// being notified.
    pub fn live_observers(&self) -> Vec<(SubjectIndex, ObserverRef)> {
        self.observers
            .iter()
            .filter_map(|(index, observer)| observer.upgrade().map(|o| (*index, o)))
            .collect()
    }

    pub fn on_state_change(&self, message: SubjectMessage) {
        for (index, observer) in self.live_observers() {
            observer.borrow_mut().on_subject_state_change(index, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        messages: Vec<(SubjectIndex, SubjectMessage)>,
    }

    impl Observer for Recorder {
        fn on_subject_state_change(&mut self, index: SubjectIndex, message: SubjectMessage) {
            self.messages.push((index, message));
        }
    }

    #[test]
    fn delivers_with_registered_index() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let observer: ObserverRef = recorder.clone();
        let mut subject = Subject::new();
        subject.add_observer(SubjectIndex::Binding(3), &observer);

        subject.on_state_change(SubjectMessage::ContentsChanged);

        assert_eq!(
            recorder.borrow().messages,
            vec![(SubjectIndex::Binding(3), SubjectMessage::ContentsChanged)]
        );
    }

    #[test]
    fn dropped_observers_are_skipped() {
        let mut subject = Subject::new();
        {
            let observer: ObserverRef = Rc::new(RefCell::new(Recorder::default()));
            subject.add_observer(SubjectIndex::Buffer, &observer);
            assert!(subject.has_observers());
        }
        assert!(!subject.has_observers());
        subject.on_state_change(SubjectMessage::SubjectChanged);
    }

    #[test]
    fn remove_observer_by_identity() {
        let observer: ObserverRef = Rc::new(RefCell::new(Recorder::default()));
        let mut subject = Subject::new();
        subject.add_observer(SubjectIndex::Buffer, &observer);
        subject.remove_observer(&Rc::downgrade(&observer));
        assert!(!subject.has_observers());
    }
}
