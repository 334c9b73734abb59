use std::fmt::Write;

use crate::parser::{Node, NodeKind};

/// Renders a parse tree in a parenthesised prefix form, one node per group:
/// `def a 1 a(2)` prints as `(prog (def a (prog 1)) (call a (2)))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(node: &Node) -> String {
        let mut out = String::new();
        Self::write(node, &mut out);
        out
    }

    fn write(node: &Node, out: &mut String) {
        match &node.kind {
            // ── scopes ──────────────────────────────────────────────────
            NodeKind::Prog { defs, result } => {
                out.push_str("(prog");
                for def in defs {
                    let _ = write!(out, " (def {} ", def.name);
                    Self::write(&def.body, out);
                    out.push(')');
                }
                out.push(' ');
                Self::write(result, out);
                out.push(')');
            }

            // ── functions and calls ─────────────────────────────────────
            NodeKind::Function { params, body } => {
                let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                let _ = write!(out, "(fn ({}) ", names.join(" "));
                Self::write(body, out);
                out.push(')');
            }

            NodeKind::Result { callee, calls } => {
                out.push_str("(call ");
                Self::write(callee, out);
                for call in calls {
                    out.push_str(" (");
                    for (i, arg) in call.args.iter().enumerate() {
                        if i > 0 {
                            out.push(' ');
                        }
                        Self::write(arg, out);
                    }
                    out.push(')');
                }
                out.push(')');
            }

            // ── leaves ──────────────────────────────────────────────────
            NodeKind::Known(id) => out.push_str(id),

            NodeKind::Builtin(builtin) => out.push_str(builtin.name()),

            NodeKind::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    let mut buf = itoa::Buffer::new();
                    out.push_str(buf.format(*n as i64));
                } else {
                    let _ = write!(out, "{}", n);
                }
            }

            NodeKind::Str(s) => {
                let _ = write!(out, "\"{}\"", s.replace('"', "\"\""));
            }

            NodeKind::Color(c) => out.push_str(c.name()),
        }
    }
}
