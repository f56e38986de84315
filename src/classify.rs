//! Component classification.
//!
//! A fragment whose markup never touches an internal state slot compiles
//! to the stateless shape. Any access to `this.state` or `this.setState`
//! (notably inside event-handler attributes) marks the fragment stateful
//! and switches the synthesizer to the constructible shape with a state
//! slot and re-render wiring.

use oxc_ast::ast::{Expression, Program};
use oxc_ast_visit::Visit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Stateless,
    Stateful,
}

pub fn component_kind(program: &Program<'_>) -> ComponentKind {
    let mut detector = StateDetector { stateful: false };
    detector.visit_program(program);
    if detector.stateful {
        ComponentKind::Stateful
    } else {
        ComponentKind::Stateless
    }
}

struct StateDetector {
    stateful: bool,
}

impl<'a> Visit<'a> for StateDetector {
    fn visit_static_member_expression(
        &mut self,
        expr: &oxc_ast::ast::StaticMemberExpression<'a>,
    ) {
        if let Expression::ThisExpression(_) = &expr.object {
            if expr.property.name == "state" || expr.property.name == "setState" {
                self.stateful = true;
            }
        }
        oxc_ast_visit::walk::walk_static_member_expression(self, expr);
    }
}
