//! Markup lowering and compiler-access rewriting.
//!
//! Lowers every JSX element in the fragment into a call to the runtime's
//! element factory and rewrites implicit member accesses (`this.props`,
//! `this.context`) into reads of the synthesized bindings, routed through
//! the collision-free aliases chosen by the rewriter. `this.state` and
//! `this.setState` are left untouched; the stateful emission shape defines
//! both.
//!
//! After the rewrite the fragment body is split into the statements carried
//! into the generated component and the trailing markup expression, each
//! printed separately for the synthesizer.

use oxc_allocator::{Allocator, Box as oxc_box, CloneIn};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_span::{SourceType, SPAN};

use crate::emit::RUNTIME_FACTORY;
use crate::rename::ReservedAliases;
use crate::resolve;

/// A fragment whose value already is a component. Its body is exported
/// directly instead of being wrapped, and implicit member accesses are
/// left alone since the component manages its own instance fields.
#[derive(Debug, Clone)]
pub struct PreformedComponent {
    /// Statements preceding the component, kept at module scope.
    pub locals_code: String,
    /// Printed component declaration or expression, lowered.
    pub code: String,
    /// Set when `code` is a named declaration to export by name;
    /// `None` means `code` is an expression assigned to the export.
    pub export_name: Option<String>,
}

/// True when the fragment's trailing value is itself a component: a class
/// or function declaration, or a function-valued trailing expression.
pub fn preformed_component(program: &Program<'_>) -> bool {
    let last = program
        .body
        .iter()
        .filter(|stmt| !is_import_statement(stmt))
        .last();
    match last {
        Some(Statement::ClassDeclaration(class)) => class.id.is_some(),
        Some(Statement::FunctionDeclaration(func)) => func.id.is_some(),
        Some(Statement::ExpressionStatement(stmt)) => matches!(
            stmt.expression,
            Expression::ArrowFunctionExpression(_)
                | Expression::FunctionExpression(_)
                | Expression::ClassExpression(_)
        ),
        _ => false,
    }
}

fn is_import_statement(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::ImportDeclaration(_) => true,
        Statement::VariableDeclaration(decl) => resolve::decl_is_require_import(decl),
        _ => false,
    }
}

/// Lowers a fragment that already carries a component. Markup inside it
/// still becomes factory calls, but `this.props` and `this.context` stay
/// untouched.
pub fn lower_preformed<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
) -> PreformedComponent {
    let ast = AstBuilder::new(allocator);
    let mut lowerer = Lowerer {
        ast,
        own_alias: "",
        ambient_alias: "",
        rewrite_this: false,
        ambient_accessed: false,
    };
    lowerer.visit_program(program);

    let source_type = program.source_type;
    let body = std::mem::replace(&mut program.body, ast.vec());
    let total = body.iter().filter(|stmt| !is_import_statement(stmt)).count();

    let mut locals = ast.vec();
    let mut component_stmt = None;
    let mut export_name = None;
    let mut seen = 0usize;
    for stmt in body {
        if is_import_statement(&stmt) {
            continue;
        }
        seen += 1;
        if seen < total {
            locals.push(stmt);
            continue;
        }
        match &stmt {
            Statement::ClassDeclaration(class) => {
                export_name = class.id.as_ref().map(|id| id.name.to_string());
            }
            Statement::FunctionDeclaration(func) => {
                export_name = func.id.as_ref().map(|id| id.name.to_string());
            }
            _ => {}
        }
        component_stmt = Some(stmt);
    }

    let locals_code = if locals.is_empty() {
        String::new()
    } else {
        print_statements(&ast, source_type, locals)
    };

    let code = component_stmt
        .map(|stmt| {
            let mut single = ast.vec();
            single.push(stmt);
            let printed = print_statements(&ast, source_type, single);
            let trimmed = printed.trim();
            if export_name.is_some() {
                trimmed.to_string()
            } else {
                trimmed.strip_suffix(';').unwrap_or(trimmed).to_string()
            }
        })
        .unwrap_or_default();

    PreformedComponent {
        locals_code,
        code,
        export_name,
    }
}

/// Printed pieces of the rewritten fragment.
#[derive(Debug, Clone)]
pub struct LoweredFragment {
    /// Local statements carried into the component body, already lowered.
    pub locals_code: String,
    /// The trailing markup expression, lowered to factory calls. `None`
    /// when the fragment has no trailing expression statement.
    pub markup_code: Option<String>,
    /// The fragment read `this.context`, so the ambient-context binding is
    /// needed even if the name never appears free.
    pub ambient_accessed: bool,
}

pub fn lower_program<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    aliases: &ReservedAliases,
) -> LoweredFragment {
    let ast = AstBuilder::new(allocator);
    let mut lowerer = Lowerer {
        ast,
        own_alias: allocator.alloc_str(&aliases.own_props),
        ambient_alias: allocator.alloc_str(&aliases.ambient_context),
        rewrite_this: true,
        ambient_accessed: false,
    };
    lowerer.visit_program(program);
    let ambient_accessed = lowerer.ambient_accessed;

    let source_type = program.source_type;
    let body = std::mem::replace(&mut program.body, ast.vec());
    let total = body.len();

    let mut locals = ast.vec();
    let mut markup_stmt = None;
    for (index, stmt) in body.into_iter().enumerate() {
        match stmt {
            Statement::ImportDeclaration(_) => {}
            Statement::VariableDeclaration(ref decl) if resolve::decl_is_require_import(decl) => {}
            stmt @ Statement::ExpressionStatement(_) if index + 1 == total => {
                markup_stmt = Some(stmt);
            }
            other => locals.push(other),
        }
    }

    let locals_code = if locals.is_empty() {
        String::new()
    } else {
        print_statements(&ast, source_type, locals)
    };

    let markup_code = markup_stmt.map(|stmt| {
        let mut single = ast.vec();
        single.push(stmt);
        let code = print_statements(&ast, source_type, single);
        let trimmed = code.trim();
        trimmed.strip_suffix(';').unwrap_or(trimmed).to_string()
    });

    LoweredFragment {
        locals_code,
        markup_code,
        ambient_accessed,
    }
}

fn print_statements<'a>(
    ast: &AstBuilder<'a>,
    source_type: SourceType,
    body: oxc_allocator::Vec<'a, Statement<'a>>,
) -> String {
    let program = Program {
        span: SPAN,
        source_type,
        hashbang: None,
        directives: ast.vec(),
        body,
        source_text: "",
        comments: ast.vec(),
        scope_id: std::cell::Cell::new(None),
    };
    Codegen::new().build(&program).code
}

struct Lowerer<'a> {
    ast: AstBuilder<'a>,
    own_alias: &'a str,
    ambient_alias: &'a str,
    /// Rewrite `this.props` / `this.context` to the aliases. Off for
    /// pre-formed components, which own those accesses.
    rewrite_this: bool,
    ambient_accessed: bool,
}

impl<'a> Lowerer<'a> {
    fn lower_jsx_element(&mut self, element: &JSXElement<'a>) -> Expression<'a> {
        let tag = self.tag_expression(&element.opening_element.name);
        let props = self.props_expression(&element.opening_element.attributes);

        let mut args = self.ast.vec();
        args.push(Argument::from(tag));
        args.push(Argument::from(props));
        for child in &element.children {
            if let Some(expr) = self.lower_child(child) {
                args.push(Argument::from(expr));
            }
        }

        self.factory_call(args)
    }

    fn lower_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) -> Expression<'a> {
        let mut args = self.ast.vec();
        args.push(Argument::from(self.ast.expression_identifier(SPAN, "null")));
        args.push(Argument::from(self.ast.expression_identifier(SPAN, "null")));
        for child in &fragment.children {
            if let Some(expr) = self.lower_child(child) {
                args.push(Argument::from(expr));
            }
        }
        self.factory_call(args)
    }

    fn factory_call(
        &mut self,
        args: oxc_allocator::Vec<'a, Argument<'a>>,
    ) -> Expression<'a> {
        let callee = self.ast.expression_identifier(SPAN, RUNTIME_FACTORY);
        self.ast.expression_call(
            SPAN,
            callee,
            None::<oxc_box<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }

    fn tag_expression(&mut self, name: &JSXElementName<'a>) -> Expression<'a> {
        match name {
            // Lowercase host tags become string tags, capitalized tags stay
            // component references.
            JSXElementName::Identifier(id) => {
                let tag = self.ast.allocator.alloc_str(id.name.as_str());
                self.ast.expression_string_literal(SPAN, tag, None)
            }
            JSXElementName::IdentifierReference(id) => {
                let tag = self.ast.allocator.alloc_str(id.name.as_str());
                self.ast.expression_identifier(SPAN, tag)
            }
            JSXElementName::NamespacedName(ns) => {
                let tag = self
                    .ast
                    .allocator
                    .alloc_str(&format!("{}:{}", ns.namespace.name, ns.name.name));
                self.ast.expression_string_literal(SPAN, tag, None)
            }
            JSXElementName::MemberExpression(me) => self.member_tag_expression(me),
            JSXElementName::ThisExpression(_) => self.ast.expression_identifier(SPAN, "this"),
        }
    }

    fn member_tag_expression(&mut self, me: &JSXMemberExpression<'a>) -> Expression<'a> {
        let object = match &me.object {
            JSXMemberExpressionObject::IdentifierReference(id) => {
                let name = self.ast.allocator.alloc_str(id.name.as_str());
                self.ast.expression_identifier(SPAN, name)
            }
            JSXMemberExpressionObject::MemberExpression(inner) => {
                self.member_tag_expression(inner)
            }
            JSXMemberExpressionObject::ThisExpression(_) => {
                self.ast.expression_identifier(SPAN, "this")
            }
        };
        let property = self.ast.allocator.alloc_str(me.property.name.as_str());
        Expression::from(self.ast.member_expression_static(
            SPAN,
            object,
            self.ast.identifier_name(SPAN, property),
            false,
        ))
    }

    fn props_expression(
        &mut self,
        attributes: &oxc_allocator::Vec<'a, JSXAttributeItem<'a>>,
    ) -> Expression<'a> {
        if attributes.is_empty() {
            return self.ast.expression_identifier(SPAN, "null");
        }

        let has_spread = attributes
            .iter()
            .any(|item| matches!(item, JSXAttributeItem::SpreadAttribute(_)));

        if !has_spread {
            let mut props = self.ast.vec();
            for item in attributes {
                if let JSXAttributeItem::Attribute(attr) = item {
                    props.push(self.attribute_property(attr));
                }
            }
            return self.ast.expression_object(SPAN, props);
        }

        // Spread-bearing attribute lists keep source order by wrapping each
        // run of plain attributes in its own spread object.
        let mut entries = self.ast.vec();
        let mut run = self.ast.vec();
        for item in attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let property = self.attribute_property(attr);
                    run.push(property);
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    if !run.is_empty() {
                        let group = std::mem::replace(&mut run, self.ast.vec());
                        let object = self.ast.expression_object(SPAN, group);
                        entries.push(self.ast.object_property_kind_spread_property(SPAN, object));
                    }
                    let mut argument = spread.argument.clone_in(self.ast.allocator);
                    self.visit_expression(&mut argument);
                    entries.push(self.ast.object_property_kind_spread_property(SPAN, argument));
                }
            }
        }
        if !run.is_empty() {
            let object = self.ast.expression_object(SPAN, run);
            entries.push(self.ast.object_property_kind_spread_property(SPAN, object));
        }
        self.ast.expression_object(SPAN, entries)
    }

    fn attribute_property(&mut self, attr: &JSXAttribute<'a>) -> ObjectPropertyKind<'a> {
        let key = match &attr.name {
            JSXAttributeName::Identifier(id) => {
                let name = self.ast.allocator.alloc_str(id.name.as_str());
                PropertyKey::StaticIdentifier(self.ast.alloc(self.ast.identifier_name(SPAN, name)))
            }
            JSXAttributeName::NamespacedName(ns) => {
                let name = self
                    .ast
                    .allocator
                    .alloc_str(&format!("{}:{}", ns.namespace.name, ns.name.name));
                PropertyKey::StaticIdentifier(self.ast.alloc(self.ast.identifier_name(SPAN, name)))
            }
        };

        let value = match &attr.value {
            Some(JSXAttributeValue::StringLiteral(s)) => {
                Expression::StringLiteral(self.ast.alloc((**s).clone()))
            }
            Some(JSXAttributeValue::ExpressionContainer(container)) => {
                self.lower_container_expression(&container.expression)
            }
            Some(JSXAttributeValue::Element(el)) => self.lower_jsx_element(el),
            Some(JSXAttributeValue::Fragment(frag)) => self.lower_jsx_fragment(frag),
            None => self.ast.expression_boolean_literal(SPAN, true),
        };

        self.ast.object_property_kind_object_property(
            SPAN,
            PropertyKind::Init,
            key,
            value,
            false,
            false,
            false,
        )
    }

    fn lower_container_expression(&mut self, jsx_expr: &JSXExpression<'a>) -> Expression<'a> {
        if let Some(mut expr) = jsx_expr
            .as_expression()
            .map(|e| e.clone_in(self.ast.allocator))
        {
            self.visit_expression(&mut expr);
            expr
        } else {
            self.ast.expression_identifier(SPAN, "undefined")
        }
    }

    fn lower_child(&mut self, child: &JSXChild<'a>) -> Option<Expression<'a>> {
        match child {
            JSXChild::Text(t) => {
                let text = t.value.trim();
                if text.is_empty() {
                    None
                } else {
                    let text = self.ast.allocator.alloc_str(text);
                    Some(self.ast.expression_string_literal(SPAN, text, None))
                }
            }
            JSXChild::Element(el) => Some(self.lower_jsx_element(el)),
            JSXChild::Fragment(frag) => Some(self.lower_jsx_fragment(frag)),
            JSXChild::ExpressionContainer(container) => {
                container.expression.as_expression().map(|e| {
                    let mut expr = e.clone_in(self.ast.allocator);
                    self.visit_expression(&mut expr);
                    expr
                })
            }
            JSXChild::Spread(spread) => {
                let mut expr = spread.expression.clone_in(self.ast.allocator);
                self.visit_expression(&mut expr);
                Some(expr)
            }
        }
    }
}

impl<'a> VisitMut<'a> for Lowerer<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        match expr {
            Expression::JSXElement(element) => {
                let lowered = self.lower_jsx_element(element);
                *expr = lowered;
            }
            Expression::JSXFragment(fragment) => {
                let lowered = self.lower_jsx_fragment(fragment);
                *expr = lowered;
            }
            Expression::StaticMemberExpression(member) => {
                let alias = if self.rewrite_this
                    && matches!(member.object, Expression::ThisExpression(_))
                {
                    match member.property.name.as_str() {
                        "props" => Some(self.own_alias),
                        "context" => {
                            self.ambient_accessed = true;
                            Some(self.ambient_alias)
                        }
                        _ => None,
                    }
                } else {
                    None
                };
                if let Some(alias) = alias {
                    *expr = self.ast.expression_identifier(SPAN, alias);
                    return;
                }
                walk_expression(self, expr);
            }
            _ => walk_expression(self, expr),
        }
    }
}
