//! Unit kinds, lifecycle states and the poolable unit shell

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use crate::runtime::context::{ExcInfo, FrameInfo};
use crate::runtime::pool::Recycle;

/// Which variant a unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Generator,
    Coroutine,
    AsyncGenerator,
}

impl UnitKind {
    pub const ALL: [UnitKind; 3] = [
        UnitKind::Generator,
        UnitKind::Coroutine,
        UnitKind::AsyncGenerator,
    ];

    /// Stable index, used to address per-variant pools
    #[inline]
    pub fn index(self) -> usize {
        match self {
            UnitKind::Generator => 0,
            UnitKind::Coroutine => 1,
            UnitKind::AsyncGenerator => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Generator => "generator",
            UnitKind::Coroutine => "coroutine",
            UnitKind::AsyncGenerator => "async generator",
        }
    }

    /// Name used by `Display` of a unit
    pub fn type_name(self) -> &'static str {
        match self {
            UnitKind::Generator => "generator",
            UnitKind::Coroutine => "coroutine",
            UnitKind::AsyncGenerator => "async_generator",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Created, code not entered yet
    JustStarted,
    /// Paused at a yield point
    Suspended,
    /// Currently executing
    Running,
    /// Returned, raised, or shut down
    Completed,
}

/// Coroutine-only fields
#[derive(Debug, Default)]
pub(crate) struct CoroutineState {
    pub(crate) origin: RefCell<Option<Vec<FrameInfo>>>,
    pub(crate) creator: RefCell<Option<FrameInfo>>,
}

/// AsyncGenerator-only fields
#[derive(Debug, Default)]
pub(crate) struct AsyncGenState {
    pub(crate) closed: Cell<bool>,
    pub(crate) running_async: Cell<bool>,
    pub(crate) hooks_inited: Cell<bool>,
}

#[derive(Debug)]
pub(crate) enum VariantState {
    Generator { iterable_coroutine: Cell<bool> },
    Coroutine(CoroutineState),
    AsyncGenerator(AsyncGenState),
}

impl VariantState {
    fn fresh(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Generator => VariantState::Generator {
                iterable_coroutine: Cell::new(false),
            },
            UnitKind::Coroutine => VariantState::Coroutine(CoroutineState::default()),
            UnitKind::AsyncGenerator => VariantState::AsyncGenerator(AsyncGenState::default()),
        }
    }
}

/// The part of a unit that is recycled through the pool.
///
/// Holds no `Rc` so that pools can be shared across threads.
#[derive(Debug)]
pub(crate) struct UnitShell {
    pub(crate) kind: UnitKind,
    pub(crate) name: RefCell<Arc<str>>,
    pub(crate) qualname: RefCell<Arc<str>>,
    pub(crate) running: Cell<bool>,
    pub(crate) finalized: Cell<bool>,
    pub(crate) exc_state: RefCell<ExcInfo>,
    pub(crate) variant: VariantState,
}

impl UnitShell {
    pub(crate) fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            name: RefCell::new(Arc::from("")),
            qualname: RefCell::new(Arc::from("")),
            running: Cell::new(false),
            finalized: Cell::new(false),
            exc_state: RefCell::new(ExcInfo::default()),
            variant: VariantState::fresh(kind),
        }
    }

    pub(crate) fn coroutine(&self) -> Option<&CoroutineState> {
        match &self.variant {
            VariantState::Coroutine(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn async_gen(&self) -> Option<&AsyncGenState> {
        match &self.variant {
            VariantState::AsyncGenerator(a) => Some(a),
            _ => None,
        }
    }
}

impl Recycle for UnitShell {
    fn recycle(&mut self) {
        *self.name.get_mut() = Arc::from("");
        *self.qualname.get_mut() = Arc::from("");
        self.running.set(false);
        self.finalized.set(false);
        *self.exc_state.get_mut() = ExcInfo::default();
        self.variant = VariantState::fresh(self.kind);
    }
}
