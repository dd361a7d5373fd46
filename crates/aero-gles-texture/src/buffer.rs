//! Buffer objects as seen by buffer textures.
//!
//! Only what a buffer texture reads is modelled: size, content init state, and the observer
//! lists used to propagate resizes and writes to bound textures.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::image_desc::InitState;
use crate::observer::{Observer, ObserverRef, Subject, SubjectIndex, SubjectMessage};
use crate::texture::TextureId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug)]
struct BufferInner {
    id: BufferId,
    size: u64,
    init_state: InitState,
    mapped: bool,
    subject: Subject,
    contents_observers: Vec<TextureId>,
}

/// Shared handle to a buffer object.
#[derive(Clone, Debug)]
pub struct Buffer {
    inner: Rc<RefCell<BufferInner>>,
}

impl Buffer {
    pub fn new(id: BufferId, size: u64, init_state: InitState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BufferInner {
                id,
                size,
                init_state,
                mapped: false,
                subject: Subject::new(),
                contents_observers: Vec::new(),
            })),
        }
    }

    pub fn id(&self) -> BufferId {
        self.inner.borrow().id
    }

    pub fn size(&self) -> u64 {
        self.inner.borrow().size
    }

    pub fn init_state(&self) -> InitState {
        self.inner.borrow().init_state
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.borrow().mapped
    }

    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Respecifies the data store (`glBufferData`).
    pub fn set_data(&self, size: u64, init_state: InitState) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.size = size;
            inner.init_state = init_state;
        }
        self.notify(SubjectMessage::SubjectChanged);
    }

    /// Overwrites part of the data store (`glBufferSubData`).
    pub fn write(&self) {
        self.notify(SubjectMessage::ContentsChanged);
    }

    pub fn map(&self) {
        self.inner.borrow_mut().mapped = true;
        self.notify(SubjectMessage::SubjectMapped);
    }

    pub fn unmap(&self) {
        self.inner.borrow_mut().mapped = false;
        self.notify(SubjectMessage::SubjectUnmapped);
    }

    pub fn add_observer(&self, observer: Weak<RefCell<dyn Observer>>) {
        self.inner
            .borrow_mut()
            .subject
            .add_weak_observer(SubjectIndex::Buffer, observer);
    }

    pub fn remove_observer(&self, observer: &Weak<RefCell<dyn Observer>>) {
        self.inner.borrow_mut().subject.remove_observer(observer);
    }

    pub fn add_contents_observer(&self, texture: TextureId) {
        let mut inner = self.inner.borrow_mut();
        if !inner.contents_observers.contains(&texture) {
            inner.contents_observers.push(texture);
        }
    }

    pub fn remove_contents_observer(&self, texture: TextureId) {
        self.inner
            .borrow_mut()
            .contents_observers
            .retain(|&id| id != texture);
    }

    pub fn has_contents_observer(&self, texture: TextureId) -> bool {
        self.inner.borrow().contents_observers.contains(&texture)
    }

    fn notify(&self, message: SubjectMessage) {
        // Release the borrow before delivery; observers read the buffer back.
        let observers: Vec<(SubjectIndex, ObserverRef)> =
            self.inner.borrow().subject.live_observers();
        for (index, observer) in observers {
            observer.borrow_mut().on_subject_state_change(index, message);
        }
    }
}

/// A buffer binding with an optional sub-range. `size == 0` binds everything past `offset`.
#[derive(Clone, Debug, Default)]
pub struct OffsetBindingPointer {
    buffer: Option<Buffer>,
    offset: u64,
    size: u64,
}

impl OffsetBindingPointer {
    pub fn set(&mut self, buffer: Option<Buffer>, offset: u64, size: u64) {
        self.buffer = buffer;
        self.offset = offset;
        self.size = size;
    }

    pub fn get(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes of the bound buffer actually visible through this binding.
    pub fn available_size(&self) -> u64 {
        let Some(buffer) = &self.buffer else {
            return 0;
        };
        let remaining = buffer.size().saturating_sub(self.offset);
        if self.size == 0 {
            remaining
        } else {
            self.size.min(remaining)
        }
    }
}
