//! End-to-end scenarios through the public API

use resumable::runtime::context::ExecContext;
use resumable::runtime::engine::{Action, Resumption, ScriptFrame};
use resumable::runtime::fault::FaultKind;
use resumable::runtime::value::Value;
use resumable::runtime::Step;
use resumable::unit::{
    AsyncGenerator, Coroutine, ExternalIterator, Generator, Resumable, SubIterator, UnitError,
    UnitKind, UnitResult, UnitState,
};
use resumable::util::config::{PoolConfig, RuntimeConfig};

fn ctx() -> std::rc::Rc<ExecContext> {
    ExecContext::with_config(RuntimeConfig::default())
}

#[test]
fn test_generator_yields_then_returns() {
    let gen = Generator::new(&ctx(), "g", ScriptFrame::yielding([Value::Int(1)], Value::Int(2)).boxed());
    assert_eq!(gen.resume().unwrap(), Step::Yielded(Value::Int(1)));
    assert_eq!(gen.resume().unwrap(), Step::Complete(Value::Int(2)));
    assert_eq!(gen.state(), UnitState::Completed);
}

#[test]
fn test_coroutine_reuse_is_exhausted() {
    let coro = Coroutine::new(&ctx(), "c", ScriptFrame::yielding([], Value::str("ok")).boxed());
    assert_eq!(coro.state(), UnitState::JustStarted);
    assert_eq!(coro.resume().unwrap(), Step::Complete(Value::str("ok")));
    let err = coro.resume().unwrap_err();
    assert_eq!(err, UnitError::Exhausted);
    assert_eq!(err.to_string(), "cannot reuse already awaited coroutine");
}

#[test]
fn test_async_generator_single_yield() {
    let mut step = 0;
    let frame = ScriptFrame::new(move |ctx, _| {
        step += 1;
        if step == 1 {
            Action::async_yield(ctx, Value::str("a"))
        } else {
            Action::Return(Value::None)
        }
    });
    let gen = AsyncGenerator::new(&ctx(), "agen", frame.boxed());

    let mut first = gen.asend(Value::None).unwrap();
    assert_eq!(first.send(Value::None).unwrap(), Step::Complete(Value::str("a")));

    let mut second = gen.asend(Value::None).unwrap();
    let end = second.send(Value::None).unwrap_err();
    assert!(end.is_raised(&FaultKind::AsyncCompletion));
    assert!(gen.is_closed());
}

#[test]
fn test_concurrent_asend_rejected() {
    let mut step = 0;
    let frame = ScriptFrame::new(move |ctx, _| {
        step += 1;
        match step {
            1 => Action::Yield(Value::str("waiting on io")),
            2 => Action::async_yield(ctx, Value::str("a")),
            _ => Action::Return(Value::None),
        }
    });
    let gen = AsyncGenerator::new(&ctx(), "agen", frame.boxed());

    let mut first = gen.asend(Value::None).unwrap();
    assert_eq!(first.send(Value::None).unwrap(), Step::Yielded(Value::str("waiting on io")));
    let mut second = gen.asend(Value::None).unwrap();
    let err = second.send(Value::None).unwrap_err();
    assert_eq!(err.to_string(), "anext(): asynchronous generator is already running");
    assert_eq!(first.send(Value::None).unwrap(), Step::Complete(Value::str("a")));
}

struct Plain {
    left: usize,
}

impl ExternalIterator for Plain {
    fn send(
        &mut self,
        _value: Value,
    ) -> UnitResult<Step> {
        if self.left == 0 {
            return Ok(Step::Complete(Value::None));
        }
        self.left -= 1;
        Ok(Step::Yielded(Value::Int(self.left as i64)))
    }
}

#[test]
fn test_shutdown_with_plain_delegate() {
    let mut sub = Some(SubIterator::external(Plain { left: 3 }));
    let frame = ScriptFrame::new(move |_, input| match (sub.take(), input) {
        (Some(s), _) => Action::YieldFrom(s),
        (None, Resumption::Throw(f)) => Action::Raise(f),
        (None, Resumption::Send(v)) => Action::Return(v),
    });
    let gen = Generator::new(&ctx(), "outer", frame.boxed());
    assert_eq!(gen.resume().unwrap(), Step::Yielded(Value::Int(2)));
    assert_eq!(gen.close(), Ok(()));
    assert_eq!(gen.state(), UnitState::Completed);
}

#[test]
fn test_pool_capacity() {
    let config = RuntimeConfig {
        pool: PoolConfig {
            enabled: true,
            ..PoolConfig::default()
        },
        ..RuntimeConfig::default()
    };
    let ctx = ExecContext::with_config(config);
    let pools = ctx.pools().clone();
    let build = || Generator::new(&ctx, "g", ScriptFrame::yielding([], Value::None).boxed());

    let batch: Vec<_> = (0..250).map(|_| build()).collect();
    drop(batch);
    assert_eq!(pools.unit_pool_len(UnitKind::Generator), 200);
    let stats = pools.unit_stats(UnitKind::Generator);
    assert_eq!(stats.released, 200);
    assert_eq!(stats.discarded, 50);

    let fresh_before = stats.fresh;
    let again: Vec<_> = (0..200).map(|_| build()).collect();
    let stats = pools.unit_stats(UnitKind::Generator);
    assert_eq!(stats.reused, 200);
    assert_eq!(stats.fresh, fresh_before);
    assert_eq!(pools.unit_pool_len(UnitKind::Generator), 0);

    let extra = build();
    assert_eq!(pools.unit_stats(UnitKind::Generator).fresh, fresh_before + 1);
    drop(extra);
    drop(again);
}
