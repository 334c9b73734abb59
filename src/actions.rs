//! Evaluation primitives of the Hey language.
//!
//! [`HeyActions`] owns the lexical [`Environment`] and the cancellation flag.
//! Every primitive receives a [`Context`] describing where in the program it
//! was invoked, so a failed validation can point at the exact argument that
//! was wrong rather than at the call as a whole.
//!
//! Long‑running primitives (`range`, `repeat`, `concat`, `ada-lovelace`) and
//! every scope entry pass through a *checkpoint* where a pending
//! [`CancelHandle::cancel`] request is observed.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::bernoulli::{bernoulli_with, render, Fraction};
use crate::environment::{Environment, Frame, Scope};
use crate::error::{ErrorKind, HeyError, Result};
use crate::parser::Span;
use crate::shape::Shape;
use crate::value::{Builtin, Color, Function, Thunk, Value, Vector};
use crate::MAX_EVAL_DEPTH;

/// Iterations between two cancellation checkpoints inside a primitive.
pub const CHECKPOINT_INTERVAL: usize = 100;

// ───────────────────────────── cancellation ─────────────────────────────

/// Shareable cancellation flag.  Clones observe the same flag, and the handle
/// can be moved to another thread to interrupt an evaluation in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption; observed at the next checkpoint.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending request, clearing the flag.
    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

// ─────────────────────────────── context ────────────────────────────────

/// Where a primitive was invoked: the program text, the span of the whole
/// call and the start offset of each syntactic argument.
#[derive(Debug, Clone)]
pub struct Context {
    source: Rc<str>,
    call: Span,
    args: Vec<usize>,
}

impl Context {
    pub fn new(source: Rc<str>, call: Span, args: Vec<usize>) -> Self {
        Context { source, call, args }
    }

    /// A context with no program text behind it, used when the host invokes
    /// a primitive directly.  Errors report line 1, column 1.
    pub fn detached() -> Self {
        Context::new(Rc::from(""), Span::default(), Vec::new())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Offset of the callee.
    pub fn call_site(&self) -> usize {
        self.call.start
    }

    pub fn call_text(&self) -> &str {
        self.call.text(&self.source)
    }

    /// Offset of argument `i`, or of the call itself when that argument is
    /// not present in the program text.
    pub fn arg(&self, i: usize) -> usize {
        self.args.get(i).copied().unwrap_or(self.call.start)
    }
}

// ─────────────────────────────── actions ────────────────────────────────

#[derive(Debug, Default)]
pub struct HeyActions {
    env: Environment,
    cancel: CancelHandle,
    depth: usize, // scopes and calls currently being evaluated
}

impl HeyActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    // ── checkpoints ─────────────────────────────────────────────────

    /// Fail with an interruption error if cancellation was requested.
    pub fn checkpoint(&self, ctx: &Context) -> Result<()> {
        if self.cancel.take() {
            info!("Evaluation interrupted at offset {}", ctx.call_site());
            return Err(HeyError::interruption(ctx.source(), ctx.call_site()));
        }
        Ok(())
    }

    /// Checkpoint on every [`CHECKPOINT_INTERVAL`]th iteration.
    fn tick(&self, ctx: &Context, i: usize) -> Result<()> {
        if i % CHECKPOINT_INTERVAL == 0 {
            self.checkpoint(ctx)?;
        }
        Ok(())
    }

    // ── scoping ─────────────────────────────────────────────────────

    /// Run `body` one nesting level deeper, failing with
    /// [`ErrorKind::Depth`] once [`MAX_EVAL_DEPTH`] levels are active.
    pub fn descend<F>(&mut self, ctx: &Context, body: F) -> Result<Value>
    where
        F: FnOnce(&mut HeyActions) -> Result<Value>,
    {
        if self.depth >= MAX_EVAL_DEPTH {
            info!("Nesting limit reached at offset {}", ctx.call_site());
            return Err(HeyError::depth(
                ctx.source(),
                ctx.call_site(),
                ErrorKind::Depth,
                MAX_EVAL_DEPTH,
            ));
        }

        self.depth += 1;
        let result = body(self);
        self.depth -= 1;

        result
    }

    /// Run `body` inside `frames`.  The frames are popped again whatever
    /// the outcome.
    pub fn prog<F>(&mut self, ctx: &Context, frames: Vec<Frame>, body: F) -> Result<Value>
    where
        F: FnOnce(&mut HeyActions) -> Result<Value>,
    {
        self.descend(ctx, |actions| {
            let count = frames.len();
            actions.env.push(frames);

            let result = actions.checkpoint(ctx).and_then(|()| body(actions));

            actions.env.pop(count);
            result
        })
    }

    /// Bind `id` in the innermost frame.  An anonymous function takes `id`
    /// as its own name, so its body can call it wherever it is applied.
    pub fn def(&mut self, ctx: &Context, id: &str, value: Value) -> Result<()> {
        if self.env.has(id, Scope::Local) {
            return Err(HeyError::already_defined(ctx.source(), ctx.arg(0), id));
        }

        let value = match value {
            Value::Function(fun) if fun.name.is_none() => {
                Value::Function(Rc::new(fun.with_name(id)))
            }
            other => other,
        };

        debug!("def {} = {}", id, value);
        self.env.pick().insert_mut(id.to_string(), value);
        Ok(())
    }

    pub fn known(&self, ctx: &Context, id: &str) -> Result<Value> {
        match self.env.get(id) {
            Some(value) => Ok(value.clone()),
            None => Err(HeyError::identifier(ctx.source(), ctx.arg(0), id)),
        }
    }

    /// Assert that `id` is not bound anywhere and hand it back.
    pub fn unknown(&self, ctx: &Context, id: &str) -> Result<String> {
        if self.env.has(id, Scope::Global) {
            return Err(HeyError::unbound(ctx.source(), ctx.arg(0), id));
        }
        Ok(id.to_string())
    }

    // ── data ────────────────────────────────────────────────────────

    /// `count` numbers starting at `start`, `step` apart (default 1).
    pub fn range(
        &self,
        ctx: &Context,
        count: &Value,
        start: &Value,
        step: Option<&Value>,
    ) -> Result<Value> {
        let count = expect_count(ctx, 0, count)?;
        let start = expect_number(ctx, 1, start)?;
        let step = match step {
            Some(step) => expect_number(ctx, 2, step)?,
            None => 1.0,
        };

        debug!("range count={} start={} step={}", count, start, step);

        let mut values = Vec::new();
        for i in 0..count {
            self.tick(ctx, i)?;
            values.push(Value::Number(start + i as f64 * step));
        }

        Ok(Value::sequence(values))
    }

    /// Flatten one level: sequences contribute their elements, anything else
    /// contributes itself.
    pub fn concat(&self, ctx: &Context, values: &[Value]) -> Result<Value> {
        let mut result = Vec::new();

        for value in values {
            match value {
                Value::Sequence(items) => {
                    for item in items.iter() {
                        self.tick(ctx, result.len())?;
                        result.push(item.clone());
                    }
                }
                other => {
                    self.tick(ctx, result.len())?;
                    result.push(other.clone());
                }
            }
        }

        Ok(Value::sequence(result))
    }

    /// `count` elements cycling through `data`.
    pub fn repeat(&self, ctx: &Context, data: &Value, count: &Value) -> Result<Value> {
        let count = expect_count(ctx, 1, count)?;

        let items: Rc<[Value]> = match data {
            Value::Sequence(items) => items.clone(),
            other => Rc::from(vec![other.clone()]),
        };

        if items.is_empty() && count > 0 {
            return Err(HeyError::data(ctx.source(), ctx.arg(0), data));
        }

        let mut values = Vec::new();
        for i in 0..count {
            self.tick(ctx, i)?;
            values.push(items[i % items.len()].clone());
        }

        Ok(Value::sequence(values))
    }

    /// Sub‑sequence between 1‑based `start` and inclusive `end`.  Negative
    /// positions count from the end (`-1` is the last element).
    pub fn slice(
        &self,
        ctx: &Context,
        data: &Value,
        start: &Value,
        end: Option<&Value>,
    ) -> Result<Value> {
        let items = expect_sequence(ctx, 0, data)?;
        let start = expect_integer(ctx, 1, start)?;
        let end = end.map(|end| expect_integer(ctx, 2, end)).transpose()?;

        let len = items.len() as i64;

        let from = match start {
            s if s > 0 => s - 1,
            s if s < 0 => len + s,
            _ => 0,
        };
        let to = match end {
            Some(e) if e < 0 => len + e + 1,
            Some(e) => e,
            None => len,
        };

        let from = from.clamp(0, len) as usize;
        let to = to.clamp(0, len) as usize;

        if from >= to {
            return Ok(Value::sequence(Vec::new()));
        }

        Ok(Value::sequence(items[from..to].to_vec()))
    }

    pub fn length(&self, ctx: &Context, data: &Value) -> Result<Value> {
        let items = expect_sequence(ctx, 0, data)?;
        Ok(Value::Number(items.len() as f64))
    }

    /// Bernoulli numbers `B(2)..=B(n+1)` as reduced fraction strings; `B(1)`
    /// is skipped, as in Lovelace's table.
    pub fn ada_lovelace(&self, ctx: &Context, n: &Value) -> Result<Value> {
        let n = expect_count(ctx, 0, n)?;

        let mut memo: Vec<Option<Fraction>> = vec![None, None];
        let mut values = Vec::new();

        for i in 0..n {
            self.tick(ctx, i)?;
            memo.push(None);
            let b = bernoulli_with(i + 2, &mut memo).ok_or_else(|| {
                HeyError::at(
                    ctx.source(),
                    ctx.arg(0),
                    ErrorKind::Number,
                    "smaller count",
                    Some(&n),
                )
            })?;
            values.push(Value::String(render(b)));
        }

        Ok(Value::sequence(values))
    }

    // ── geometry ────────────────────────────────────────────────────

    pub fn square(
        &self,
        ctx: &Context,
        size: &Value,
        color: &Value,
        rotation: Option<&Value>,
    ) -> Result<Value> {
        let shape = Shape::Square {
            size: expect_number(ctx, 0, size)?,
            color: expect_color(ctx, 1, color)?,
            rotation: optional_number(ctx, 2, rotation)?,
        };
        Ok(shape.into())
    }

    pub fn parallelogram(
        &self,
        ctx: &Context,
        base: &Value,
        height: &Value,
        offset: &Value,
        color: &Value,
        rotation: Option<&Value>,
    ) -> Result<Value> {
        let shape = Shape::Parallelogram {
            base: expect_number(ctx, 0, base)?,
            height: expect_number(ctx, 1, height)?,
            offset: expect_number(ctx, 2, offset)?,
            color: expect_color(ctx, 3, color)?,
            rotation: optional_number(ctx, 4, rotation)?,
        };
        Ok(shape.into())
    }

    /// Place `shape2` relative to `shape1` at `anchor` (default origin).
    pub fn merge(
        &self,
        ctx: &Context,
        shape1: &Value,
        shape2: &Value,
        anchor: Option<&Value>,
        rotation: Option<&Value>,
    ) -> Result<Value> {
        let shape1 = expect_shape(ctx, 0, shape1)?;
        let shape2 = expect_shape(ctx, 1, shape2)?;
        let anchor = match anchor {
            Some(anchor) => expect_vector(ctx, 2, anchor)?,
            None => Vector::default(),
        };

        let shape = Shape::Composite {
            shape1: Box::new(shape1.as_ref().clone()),
            shape2: Box::new(shape2.as_ref().clone()),
            anchor,
            rotation: optional_number(ctx, 3, rotation)?,
        };
        Ok(shape.into())
    }

    pub fn vector(&self, ctx: &Context, x: &Value, y: &Value) -> Result<Value> {
        Ok(Value::Vector(Vector {
            x: expect_number(ctx, 0, x)?,
            y: expect_number(ctx, 1, y)?,
        }))
    }

    // ── functions ───────────────────────────────────────────────────

    /// A callable over `params` that captures every frame visible now.
    pub fn funct(&self, ctx: &Context, params: Vec<String>, body: Thunk, text: String) -> Value {
        debug!(
            "funct {} capturing {} frame(s)",
            ctx.call_text(),
            self.env.depth()
        );

        Value::Function(Rc::new(Function {
            name: None,
            params,
            closure: self.env.snapshot(),
            body,
            text,
        }))
    }

    /// Call `callee` with `args`.
    ///
    /// A sequence is indexed (1‑based) by `args[0]`, falling back to
    /// `args[1]` when the index is out of range.  Functions and built‑ins
    /// are invoked after an arity check.
    pub fn result(&mut self, ctx: &Context, callee: &Value, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::Sequence(items) => {
                if !(1..=2).contains(&args.len()) {
                    return Err(HeyError::arity(ctx.source(), ctx.call_site(), "1-2", args.len()));
                }

                let index = expect_integer(ctx, 0, &args[0])?;

                if index >= 1 && index as usize <= items.len() {
                    return Ok(items[index as usize - 1].clone());
                }

                match args.into_iter().nth(1) {
                    Some(default) => Ok(default),
                    None => Err(HeyError::index(
                        ctx.source(),
                        ctx.arg(0),
                        items.len(),
                        index,
                    )),
                }
            }

            Value::Function(fun) => {
                let arity = fun.arity();
                if !arity.accepts(args.len()) {
                    return Err(HeyError::arity(ctx.source(), ctx.call_site(), arity, args.len()));
                }

                debug!("Calling {} with {} argument(s)", fun, args.len());

                // a named function sees itself; parameters shadow that name
                let own: Frame = match &fun.name {
                    Some(name) => Frame::new().insert(name.clone(), callee.clone()),
                    None => Frame::new(),
                };

                let locals: Frame = fun
                    .params
                    .iter()
                    .cloned()
                    .zip(args)
                    .fold(own, |frame, (k, v)| frame.insert(k, v));

                let mut frames = fun.closure.clone();
                frames.push(locals);

                let body = fun.body.clone();
                self.prog(ctx, frames, move |actions| body(actions))
            }

            Value::Builtin(builtin) => {
                let arity = builtin.arity();
                if !arity.accepts(args.len()) {
                    return Err(HeyError::arity(ctx.source(), ctx.call_site(), arity, args.len()));
                }

                self.apply_builtin(ctx, *builtin, &args)
            }

            _ => Err(HeyError::call(ctx.source(), ctx.call_site(), ctx.call_text())),
        }
    }

    /// Dispatch to the primitive behind `builtin`.  Arity was checked by
    /// the caller.
    fn apply_builtin(&self, ctx: &Context, builtin: Builtin, args: &[Value]) -> Result<Value> {
        debug!("Applying builtin {} to {} argument(s)", builtin.name(), args.len());

        let arg = |i: usize| args.get(i);

        match (builtin, args) {
            (Builtin::Range, [count, start, ..]) => self.range(ctx, count, start, arg(2)),
            (Builtin::Square, [size, color, ..]) => self.square(ctx, size, color, arg(2)),
            (Builtin::Parallelogram, [base, height, offset, color, ..]) => {
                self.parallelogram(ctx, base, height, offset, color, arg(4))
            }
            (Builtin::Merge, [shape1, shape2, ..]) => {
                self.merge(ctx, shape1, shape2, arg(2), arg(3))
            }
            (Builtin::Vector, [x, y]) => self.vector(ctx, x, y),
            (Builtin::Concat, values) => self.concat(ctx, values),
            (Builtin::Repeat, [data, count]) => self.repeat(ctx, data, count),
            (Builtin::Slice, [data, start, ..]) => self.slice(ctx, data, start, arg(2)),
            (Builtin::Length, [data]) => self.length(ctx, data),
            (Builtin::AdaLovelace, [n]) => self.ada_lovelace(ctx, n),
            _ => Err(HeyError::arity(
                ctx.source(),
                ctx.call_site(),
                builtin.arity(),
                args.len(),
            )),
        }
    }
}

// ───────────────────────────── validation ──────────────────────────────

fn expect_number(ctx: &Context, i: usize, value: &Value) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| HeyError::number(ctx.source(), ctx.arg(i), value))
}

fn optional_number(ctx: &Context, i: usize, value: Option<&Value>) -> Result<f64> {
    value.map_or(Ok(0.0), |v| expect_number(ctx, i, v))
}

fn expect_integer(ctx: &Context, i: usize, value: &Value) -> Result<i64> {
    let n = expect_number(ctx, i, value)?;
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(HeyError::integer(ctx.source(), ctx.arg(i), value));
    }
    Ok(n as i64)
}

/// A non‑negative integer usable as an element count.
fn expect_count(ctx: &Context, i: usize, value: &Value) -> Result<usize> {
    let n = expect_integer(ctx, i, value)?;
    usize::try_from(n).map_err(|_| {
        HeyError::at(
            ctx.source(),
            ctx.arg(i),
            ErrorKind::Number,
            "non-negative integer",
            Some(value),
        )
    })
}

fn expect_color(ctx: &Context, i: usize, value: &Value) -> Result<Color> {
    value
        .as_color()
        .ok_or_else(|| HeyError::color(ctx.source(), ctx.arg(i), value))
}

fn expect_sequence(ctx: &Context, i: usize, value: &Value) -> Result<Rc<[Value]>> {
    value
        .as_sequence()
        .cloned()
        .ok_or_else(|| HeyError::data(ctx.source(), ctx.arg(i), value))
}

fn expect_shape(ctx: &Context, i: usize, value: &Value) -> Result<Rc<Shape>> {
    value
        .as_shape()
        .cloned()
        .ok_or_else(|| HeyError::shape(ctx.source(), ctx.arg(i), value))
}

fn expect_vector(ctx: &Context, i: usize, value: &Value) -> Result<Vector> {
    value
        .as_vector()
        .ok_or_else(|| HeyError::vector(ctx.source(), ctx.arg(i), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::detached()
    }

    fn numbers(values: &[f64]) -> Value {
        Value::sequence(values.iter().map(|n| Value::Number(*n)).collect())
    }

    fn identity() -> Thunk {
        Rc::new(|actions: &mut HeyActions| actions.known(&Context::detached(), "a"))
    }

    #[test]
    fn prog_pops_its_frames() {
        let mut actions = HeyActions::new();
        let frame = Frame::new().insert("z".to_string(), Value::Number(1.0));

        let result = actions
            .prog(&ctx(), vec![frame], |a| a.known(&Context::detached(), "z"))
            .unwrap();

        assert_eq!(result, Value::Number(1.0));
        assert!(!actions.environment().has("z", Scope::Global));
    }

    #[test]
    fn prog_pops_its_frames_on_error() {
        let mut actions = HeyActions::new();
        let err = actions
            .prog(&ctx(), vec![Frame::new(), Frame::new()], |a| {
                a.known(&Context::detached(), "missing")
            })
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Identifier);
        assert_eq!(actions.environment().depth(), 1);
    }

    #[test]
    fn definition() {
        let mut actions = HeyActions::new();
        actions.def(&ctx(), "y", "val".into()).unwrap();
        assert_eq!(actions.known(&ctx(), "y").unwrap(), Value::from("val"));
    }

    #[test]
    fn redefinition_in_the_same_frame_fails() {
        let mut actions = HeyActions::new();
        actions.def(&ctx(), "y", 1.0.into()).unwrap();
        let err = actions.def(&ctx(), "y", 2.0.into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyDefined);
        assert_eq!(err.message, "expected new identifier, got y");
    }

    #[test]
    fn range() {
        let actions = HeyActions::new();
        let result = actions
            .range(&ctx(), &5.0.into(), &1.0.into(), Some(&2.0.into()))
            .unwrap();
        assert_eq!(result, numbers(&[1.0, 3.0, 5.0, 7.0, 9.0]));
    }

    #[test]
    fn range_error() {
        let actions = HeyActions::new();
        let err = actions
            .range(&ctx(), &"e".into(), &10.0.into(), Some(&2.0.into()))
            .unwrap_err();
        assert!(err.message.contains("number"));
    }

    #[test]
    fn square() {
        let actions = HeyActions::new();
        let result = actions
            .square(&ctx(), &1.0.into(), &"blue".into(), None)
            .unwrap();
        assert_eq!(
            result,
            Value::from(Shape::Square {
                size: 1.0,
                color: Color::Blue,
                rotation: 0.0,
            })
        );
    }

    #[test]
    fn square_error() {
        let actions = HeyActions::new();
        let err = actions
            .square(&ctx(), &1.0.into(), &"transparent".into(), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Color);
        assert_eq!(err.message, "expected color, got transparent");
    }

    #[test]
    fn merge() {
        let actions = HeyActions::new();
        let sq1 = actions.square(&ctx(), &58.0.into(), &Color::Red.into(), None).unwrap();
        let sq2 = actions
            .square(&ctx(), &40.0.into(), &Color::Green.into(), Some(&45.0.into()))
            .unwrap();

        let result = actions.merge(&ctx(), &sq1, &sq2, None, None).unwrap();
        match result.as_shape().map(|s| s.as_ref()) {
            Some(Shape::Composite { shape1, shape2, .. }) => {
                assert_eq!(shape1.name(), "square");
                assert_eq!(shape2.rotation(), 45.0);
            }
            other => panic!("expected composite, got {:?}", other),
        }
    }

    #[test]
    fn merge_rejects_non_shapes() {
        let actions = HeyActions::new();
        let sq = actions.square(&ctx(), &1.0.into(), &Color::Red.into(), None).unwrap();
        let err = actions.merge(&ctx(), &sq, &3.0.into(), None, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Shape);
    }

    #[test]
    fn parallelogram() {
        let actions = HeyActions::new();
        let result = actions
            .parallelogram(
                &ctx(),
                &50.0.into(),
                &30.0.into(),
                &(-20.0).into(),
                &"grey".into(),
                Some(&30.0.into()),
            )
            .unwrap();
        assert_eq!(
            result,
            Value::from(Shape::Parallelogram {
                base: 50.0,
                height: 30.0,
                offset: -20.0,
                color: Color::Grey,
                rotation: 30.0,
            })
        );
    }

    #[test]
    fn repeat_sequence() {
        let actions = HeyActions::new();
        let data = Value::sequence(vec![1.0.into(), "blue".into()]);
        let result = actions.repeat(&ctx(), &data, &3.0.into()).unwrap();
        assert_eq!(
            result,
            Value::sequence(vec![1.0.into(), "blue".into(), 1.0.into()])
        );
    }

    #[test]
    fn repeat_single_value() {
        let actions = HeyActions::new();
        let result = actions.repeat(&ctx(), &1.0.into(), &3.0.into()).unwrap();
        assert_eq!(result, numbers(&[1.0, 1.0, 1.0]));
    }

    #[test]
    fn repeat_zero_times_is_empty() {
        let actions = HeyActions::new();
        let result = actions.repeat(&ctx(), &numbers(&[]), &0.0.into()).unwrap();
        assert_eq!(result, numbers(&[]));
    }

    #[test]
    fn concat_flattens_one_level() {
        let actions = HeyActions::new();
        let nested = Value::sequence(vec![numbers(&[3.0])]);
        let result = actions
            .concat(&ctx(), &[1.0.into(), numbers(&[2.0]), nested.clone()])
            .unwrap();
        assert_eq!(result, Value::sequence(vec![1.0.into(), 2.0.into(), numbers(&[3.0])]));
    }

    #[test]
    fn concat_checks_for_cancellation_inside_one_long_argument() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::{Arc, Barrier};

        let actions = HeyActions::new();
        let long = actions
            .range(&ctx(), &2_000_000.0.into(), &0.0.into(), None)
            .unwrap();

        let handle = actions.cancel_handle().clone();
        let barrier = Arc::new(Barrier::new(2));
        let done = Arc::new(AtomicBool::new(false));

        let canceller = {
            let barrier = barrier.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                barrier.wait();
                while !done.load(Ordering::SeqCst) {
                    handle.cancel();
                    std::thread::yield_now();
                }
            })
        };

        barrier.wait();
        let result = actions.concat(&ctx(), &[long]);
        done.store(true, Ordering::SeqCst);
        canceller.join().unwrap();

        assert_eq!(result.unwrap_err().kind, ErrorKind::Interruption);
    }

    #[test]
    fn descend_fails_past_the_nesting_limit() {
        fn nest(actions: &mut HeyActions, levels: usize) -> Result<Value> {
            actions.descend(&Context::detached(), |actions| match levels {
                0 => Ok(Value::Number(0.0)),
                n => nest(actions, n - 1),
            })
        }

        let mut actions = HeyActions::new();
        assert!(nest(&mut actions, MAX_EVAL_DEPTH - 1).is_ok());

        let err = nest(&mut actions, MAX_EVAL_DEPTH).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Depth);
        assert!(nest(&mut actions, 3).is_ok());
    }

    #[test]
    fn defined_functions_are_named() {
        let mut actions = HeyActions::new();
        let fun = actions.funct(&ctx(), vec!["a".into()], identity(), "(a) -> a".into());
        actions.def(&ctx(), "id", fun).unwrap();

        match actions.known(&ctx(), "id").unwrap() {
            Value::Function(fun) => assert_eq!(fun.name.as_deref(), Some("id")),
            other => panic!("expected function, got {}", other),
        }
    }

    #[test]
    fn slice() {
        let actions = HeyActions::new();
        let data = numbers(&[1.0, 3.0, 5.0, 7.0]);
        let cases: [(f64, Option<f64>, &[f64]); 4] = [
            (2.0, None, &[3.0, 5.0, 7.0]),
            (2.0, Some(3.0), &[3.0, 5.0]),
            (2.0, Some(-2.0), &[3.0, 5.0]),
            (-3.0, Some(-2.0), &[3.0, 5.0]),
        ];
        for (start, end, expected) in cases {
            let end = end.map(Value::Number);
            let result = actions
                .slice(&ctx(), &data, &start.into(), end.as_ref())
                .unwrap();
            assert_eq!(result, numbers(expected), "slice({} {:?})", start, end);
        }
    }

    #[test]
    fn slice_error() {
        let actions = HeyActions::new();
        let err = actions
            .slice(&ctx(), &"unknown".into(), &1.0.into(), None)
            .unwrap_err();
        assert!(err.message.contains("data"));
    }

    #[test]
    fn vector() {
        let actions = HeyActions::new();
        let v = actions.vector(&ctx(), &3.0.into(), &4.0.into()).unwrap();
        assert_eq!(v.as_vector(), Some(Vector { x: 3.0, y: 4.0 }));
    }

    #[test]
    fn ada_lovelace() {
        let actions = HeyActions::new();
        let result = actions.ada_lovelace(&ctx(), &7.0.into()).unwrap();
        let expected: Vec<Value> = ["1/6", "0", "-1/30", "0", "1/42", "0", "-1/30"]
            .into_iter()
            .map(Value::from)
            .collect();
        assert_eq!(result, Value::sequence(expected));
    }

    #[test]
    fn function_call() {
        let mut actions = HeyActions::new();
        let fun = actions.funct(&ctx(), vec!["a".to_string()], identity(), "(a) -> a".into());
        let result = actions.result(&ctx(), &fun, vec![1.0.into()]).unwrap();
        assert_eq!(result, Value::Number(1.0));
        assert!(!actions.environment().has("a", Scope::Global));
    }

    #[test]
    fn arity_error() {
        let mut actions = HeyActions::new();
        let fun = actions.funct(&ctx(), vec!["a".to_string()], identity(), "(a) -> a".into());
        let err = actions.result(&ctx(), &fun, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
        assert_eq!(err.message, "expected 1 argument(s), got 0");
    }

    #[test]
    fn not_callable_error() {
        let mut actions = HeyActions::new();
        let err = actions.result(&ctx(), &1.0.into(), vec!["a".into()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Call);
        assert!(err.message.contains("function or data"));
    }

    #[test]
    fn sequence_index_and_default() {
        let mut actions = HeyActions::new();
        let data = numbers(&[10.0, 20.0]);
        assert_eq!(
            actions.result(&ctx(), &data, vec![2.0.into()]).unwrap(),
            Value::Number(20.0)
        );
        assert_eq!(
            actions.result(&ctx(), &data, vec![3.0.into(), 0.0.into()]).unwrap(),
            Value::Number(0.0)
        );

        let err = actions.result(&ctx(), &data, vec![3.0.into()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Data);
        assert_eq!(err.message, "expected index between 1 and 2, got 3");
    }

    #[test]
    fn builtin_values_are_callable() {
        let mut actions = HeyActions::new();
        let result = actions
            .result(&ctx(), &Value::Builtin(Builtin::Length), vec![numbers(&[1.0, 2.0])])
            .unwrap();
        assert_eq!(result, Value::Number(2.0));
    }

    #[test]
    fn known_and_unknown() {
        let mut actions = HeyActions::new();
        actions
            .environment_mut()
            .push([Frame::new().insert("k".to_string(), Value::Number(3.0))]);

        assert_eq!(actions.known(&ctx(), "k").unwrap(), Value::Number(3.0));
        assert_eq!(actions.unknown(&ctx(), "fresh").unwrap(), "fresh");

        let err = actions.unknown(&ctx(), "k").unwrap_err();
        assert_eq!(err.message, "expected unbound identifier, got k");

        actions.environment_mut().pop(1);
        let err = actions.known(&ctx(), "k").unwrap_err();
        assert!(err.message.contains("identifier"));
    }

    #[test]
    fn pending_cancel_interrupts_at_next_checkpoint() {
        let actions = HeyActions::new();
        actions.cancel_handle().cancel();

        let err = actions
            .repeat(&ctx(), &1.0.into(), &1000.0.into())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Interruption);
        assert_eq!(err.message, "expected completion, got interruption");

        // the request was consumed
        assert!(!actions.cancel_handle().is_cancelled());
        assert!(actions.repeat(&ctx(), &1.0.into(), &1000.0.into()).is_ok());
    }
}
