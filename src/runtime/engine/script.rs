//! Closure-driven frame

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::runtime::completion::Step;
use crate::runtime::context::ExecContext;
use crate::runtime::engine::{Frame, FrameOutcome, Resumption};
use crate::runtime::fault::Fault;
use crate::runtime::value::Value;
use crate::unit::delegate::SubIterator;

/// What a script body asks the frame to do next.
pub enum Action {
    Yield(Value),
    Return(Value),
    Raise(Fault),
    /// Delegate to a sub-iterator until it completes; the body is resumed
    /// with its completion value (or its fault).
    YieldFrom(SubIterator),
}

impl Action {
    /// Yield from an async generator's own code (wrapped with the async
    /// marker, as opposed to a raw value passed through from an await)
    pub fn async_yield(
        ctx: &ExecContext,
        value: Value,
    ) -> Self {
        Action::Yield(ctx.wrap_async_value(value))
    }
}

impl fmt::Debug for Action {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Action::Yield(v) => f.debug_tuple("Yield").field(v).finish(),
            Action::Return(v) => f.debug_tuple("Return").field(v).finish(),
            Action::Raise(e) => f.debug_tuple("Raise").field(e).finish(),
            Action::YieldFrom(sub) => f.debug_tuple("YieldFrom").field(&sub.describe()).finish(),
        }
    }
}

type Body = Box<dyn FnMut(&Rc<ExecContext>, Resumption) -> Action>;

/// A frame whose code is a Rust closure.
///
/// The closure is called once per resume with the resumption value and keeps
/// its own position in captured state. The first call always receives
/// `Send(None)`.
pub struct ScriptFrame {
    body: Body,
    started: bool,
    complete: bool,
    delegate: Option<SubIterator>,
    blocks: usize,
}

impl ScriptFrame {
    pub fn new(body: impl FnMut(&Rc<ExecContext>, Resumption) -> Action + 'static) -> Self {
        Self {
            body: Box::new(body),
            started: false,
            complete: false,
            delegate: None,
            blocks: 0,
        }
    }

    /// A frame that yields each value in order, then returns `ret`
    pub fn yielding(
        values: impl IntoIterator<Item = Value>,
        ret: Value,
    ) -> Self {
        let mut values = values.into_iter().collect::<Vec<_>>().into_iter();
        let mut ret = Some(ret);
        Self::new(move |_, input| match input {
            Resumption::Throw(f) => Action::Raise(f),
            Resumption::Send(_) => match values.next() {
                Some(v) => Action::Yield(v),
                None => Action::Return(ret.take().unwrap_or_default()),
            },
        })
    }

    /// Report a fixed number of open exception-handling blocks
    pub fn with_block_depth(
        mut self,
        blocks: usize,
    ) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn boxed(self) -> Box<dyn Frame> {
        Box::new(self)
    }
}

impl Frame for ScriptFrame {
    fn run(
        &mut self,
        ctx: &Rc<ExecContext>,
        input: Resumption,
    ) -> FrameOutcome {
        if self.complete {
            return match input {
                Resumption::Throw(f) => FrameOutcome::Raised(f),
                Resumption::Send(_) => FrameOutcome::Returned(Value::None),
            };
        }
        if !self.started {
            self.started = true;
            if let Resumption::Throw(f) = input {
                self.complete = true;
                return FrameOutcome::Raised(f);
            }
        }

        let mut input = input;
        loop {
            match (self.body)(ctx, input) {
                Action::Yield(v) => return FrameOutcome::Yielded(v),
                Action::Return(v) => {
                    self.complete = true;
                    return FrameOutcome::Returned(v);
                }
                Action::Raise(f) => {
                    self.complete = true;
                    return FrameOutcome::Raised(f);
                }
                Action::YieldFrom(mut sub) => {
                    trace!(target_desc = %sub.describe(), "yield from");
                    match sub.send(Value::None) {
                        Ok(Step::Yielded(v)) => {
                            self.delegate = Some(sub);
                            return FrameOutcome::Yielded(v);
                        }
                        Ok(Step::Complete(v)) => input = Resumption::Send(v),
                        Err(e) => input = Resumption::Throw(e.into_fault()),
                    }
                }
            }
        }
    }

    fn is_just_started(&self) -> bool {
        !self.started
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn delegation_target(&mut self) -> Option<&mut SubIterator> {
        self.delegate.as_mut()
    }

    fn end_delegation(&mut self) -> Option<SubIterator> {
        self.delegate.take()
    }

    fn block_depth(&self) -> usize {
        if self.complete {
            0
        } else {
            self.blocks
        }
    }
}

impl fmt::Debug for ScriptFrame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ScriptFrame")
            .field("started", &self.started)
            .field("complete", &self.complete)
            .field("delegating", &self.delegate.is_some())
            .finish()
    }
}
