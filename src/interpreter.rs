use std::rc::Rc;

use log::{debug, info};

use crate::actions::{CancelHandle, Context, HeyActions};
use crate::environment::Frame;
use crate::error::Result;
use crate::parser::{parse, Call, Definition, Node, NodeKind, Span};
use crate::value::{Thunk, Value};

/// Tree‑walking evaluator for Hey programs.
///
/// One instance evaluates one program at a time; `evaluate` takes `&mut self`
/// so overlapping evaluations on the same instance are ruled out by the
/// borrow checker.  Use [`Interpreter::cancel_handle`] to interrupt from
/// another thread.
#[derive(Debug, Default)]
pub struct Interpreter {
    actions: HeyActions,
}

impl Interpreter {
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        Self {
            actions: HeyActions::new(),
        }
    }

    /// Parse and evaluate `source`.
    pub fn evaluate(&mut self, source: &str) -> Result<Value> {
        info!("Evaluating program of {} bytes", source.len());

        let program = parse(source)?;
        let value = self.run(&program, source)?;

        info!("Evaluation completed successfully");
        Ok(value)
    }

    /// Evaluate an already parsed program.  `source` must be the text
    /// `program` was parsed from.
    pub fn run(&mut self, program: &Node, source: &str) -> Result<Value> {
        let source: Rc<str> = Rc::from(source);
        eval(&mut self.actions, program, &source)
    }

    /// Invoke a callable value (typically one returned by `evaluate`).
    pub fn apply(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        let text: Rc<str> = Rc::from(callee.to_string());
        let ctx = Context::new(text.clone(), Span::new(0, text.len()), Vec::new());

        debug!("Applying {} to {} argument(s)", text, args.len());

        self.actions.result(&ctx, callee, args)
    }

    /// Request cooperative interruption of the running (or next) evaluation.
    pub fn cancel(&self) {
        self.actions.cancel_handle().cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.actions.cancel_handle().clone()
    }

    /// Current number of scope frames; `1` whenever no evaluation is running.
    pub fn depth(&self) -> usize {
        self.actions.environment().depth()
    }
}

// ───────────────────────────── tree walk ─────────────────────────────

fn eval(actions: &mut HeyActions, node: &Node, source: &Rc<str>) -> Result<Value> {
    debug!("Evaluating {}", node.text(source));

    match &node.kind {
        NodeKind::Prog { defs, result } => {
            let ctx = Context::new(source.clone(), node.span, Vec::new());

            actions.prog(&ctx, vec![Frame::new()], |actions| {
                for def in defs {
                    eval_def(actions, def, source)?;
                }
                eval(actions, result, source)
            })
        }

        NodeKind::Function { params, body } => {
            let names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
            let text = format!("({}) -> {}", names.join(" "), body.text(source));

            let thunk: Thunk = {
                let body = body.clone();
                let source = source.clone();
                Rc::new(move |actions: &mut HeyActions| eval(actions, &body, &source))
            };

            let ctx = Context::new(source.clone(), node.span, Vec::new());
            Ok(actions.funct(&ctx, names, thunk, text))
        }

        NodeKind::Result { callee, calls } => {
            let ctx = Context::new(source.clone(), node.span, Vec::new());
            actions.descend(&ctx, |actions| eval_calls(actions, callee, calls, source))
        }

        NodeKind::Known(id) => {
            let ctx = Context::new(source.clone(), node.span, vec![node.span.start]);
            actions.known(&ctx, id)
        }

        NodeKind::Builtin(builtin) => Ok(Value::Builtin(*builtin)),

        NodeKind::Number(n) => Ok(Value::Number(*n)),

        NodeKind::Str(s) => Ok(Value::String(s.clone())),

        NodeKind::Color(c) => Ok(Value::Color(*c)),
    }
}

/// `callee(args)(args)...`, each call applied to the previous result.
fn eval_calls(
    actions: &mut HeyActions,
    callee: &Node,
    calls: &[Call],
    source: &Rc<str>,
) -> Result<Value> {
    let mut value = eval(actions, callee, source)?;
    let mut span = callee.span;

    for call in calls {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(eval(actions, arg, source)?);
        }

        let offsets = call.args.iter().map(|a| a.span.start).collect();
        let ctx = Context::new(source.clone(), span, offsets);

        value = actions.result(&ctx, &value, args)?;
        span = span.to(call.span);
    }

    Ok(value)
}

fn eval_def(actions: &mut HeyActions, def: &Definition, source: &Rc<str>) -> Result<()> {
    debug!("Defining '{}'", def.name);

    let value = eval(actions, &def.body, source)?;

    let ctx = Context::new(source.clone(), def.span, vec![def.name_span.start]);
    actions.def(&ctx, &def.name, value)?;

    info!("'{}' defined", def.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn literal_round_trip() {
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.evaluate("12").unwrap(), Value::Number(12.0));
        assert_eq!(
            interpreter.evaluate("def x \"hi\"\nx").unwrap(),
            Value::from("hi")
        );
    }

    #[test]
    fn evaluations_do_not_share_definitions() {
        let mut interpreter = Interpreter::new();
        interpreter.evaluate("def a 1\na").unwrap();
        let err = interpreter.evaluate("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Identifier);
        assert_eq!(interpreter.depth(), 1);
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let mut interpreter = Interpreter::new();
        let err = interpreter.evaluate("def f (n) f(n)\nf(1)").unwrap_err();

        assert_eq!(err.kind, ErrorKind::Depth);
        assert_eq!(
            err.message,
            format!("expected at most {} nested levels, got deeper nesting", crate::MAX_EVAL_DEPTH)
        );
        assert_eq!(interpreter.depth(), 1);
        assert_eq!(interpreter.evaluate("7").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn nested_calls_within_the_limit_evaluate() {
        let mut interpreter = Interpreter::new();
        let source = format!("{}1{}", "c(".repeat(50), ")".repeat(50));
        assert_eq!(
            interpreter.evaluate(&source).unwrap(),
            Value::sequence(vec![Value::Number(1.0)])
        );
    }

    #[test]
    fn defined_functions_can_name_themselves_after_evaluation() {
        let mut interpreter = Interpreter::new();
        let outer = interpreter.evaluate("def f (n) (m) f\nf").unwrap();

        let inner = interpreter.apply(&outer, vec![Value::Number(1.0)]).unwrap();
        let again = interpreter.apply(&inner, vec![Value::Number(2.0)]).unwrap();

        assert_eq!(again, outer);
        assert_eq!(again.to_string(), "(n) -> (m) f");
    }

    #[test]
    fn apply_calls_a_returned_function() {
        let mut interpreter = Interpreter::new();
        let fun = interpreter.evaluate("(n) range(n 1)").unwrap();
        let result = interpreter.apply(&fun, vec![Value::Number(2.0)]).unwrap();
        assert_eq!(
            result,
            Value::sequence(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }
}
