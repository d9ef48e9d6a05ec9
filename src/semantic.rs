//! Symbol resolution over a single document.
//!
//! Rules and fixes only care about identity: does this identifier bind to that
//! field, or to that constructor parameter? [`SemanticModel`] answers exactly
//! that question; [`ScopeModel`] answers it by walking lexical scopes of the
//! tree-sitter tree. Symbols are identified by the byte spans of the nodes that
//! declare them, which stay valid for the lifetime of the snapshot.

use crate::syntax::{
    self, ancestor_of_kind, children_of_kind, descendants, first_child_of_kind, kinds,
    named_children, SyntaxDocument,
};
use std::ops::Range;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolId {
    Field {
        type_span: Range<usize>,
        name: String,
    },
    Parameter {
        owner_span: Range<usize>,
        index: usize,
        name: String,
    },
    Local {
        declarator_span: Range<usize>,
        name: String,
    },
}

impl SymbolId {
    pub fn name(&self) -> &str {
        match self {
            SymbolId::Field { name, .. }
            | SymbolId::Parameter { name, .. }
            | SymbolId::Local { name, .. } => name,
        }
    }
}

/// Role an identifier token plays in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRole {
    /// Names the thing being declared (`int x`, `void M()`).
    Declaration,
    /// `this.x`
    ThisMember,
    /// `other.x`, bound to something outside this document's knowledge.
    ForeignMember,
    /// Type names, namespaces, named-argument labels and similar.
    NonExpression,
    /// A simple name in expression position.
    Simple,
}

pub trait SemanticModel {
    /// Resolves an identifier node to the symbol it declares or references.
    fn resolve(&self, identifier: Node<'_>) -> Option<SymbolId>;
}

pub struct ScopeModel<'d> {
    doc: &'d SyntaxDocument,
}

impl<'d> ScopeModel<'d> {
    pub fn new(doc: &'d SyntaxDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &'d SyntaxDocument {
        self.doc
    }

    /// Identifiers under `scope` that reference `symbol`. Declaration sites are
    /// not references.
    pub fn references<'t>(&self, scope: Node<'t>, symbol: &SymbolId) -> Vec<Node<'t>> {
        descendants(scope)
            .filter(|node| node.kind() == kinds::IDENTIFIER)
            .filter(|node| self.doc.text(*node) == symbol.name())
            .filter(|node| role(self.doc, *node) != IdentifierRole::Declaration)
            .filter(|node| self.resolve(*node).as_ref() == Some(symbol))
            .collect()
    }

    fn declared_symbol(&self, identifier: Node<'_>) -> Option<SymbolId> {
        let parent = identifier.parent()?;
        let name = self.doc.text(identifier).to_string();
        match parent.kind() {
            kinds::VARIABLE_DECLARATOR => {
                let declaration = parent.parent()?;
                let owner = declaration.parent()?;
                if owner.kind() == kinds::FIELD_DECLARATION {
                    let type_decl = ancestor_of_kind(owner, syntax::TYPE_DECLARATIONS)?;
                    Some(SymbolId::Field {
                        type_span: type_decl.byte_range(),
                        name,
                    })
                } else {
                    Some(SymbolId::Local {
                        declarator_span: parent.byte_range(),
                        name,
                    })
                }
            }
            kinds::PARAMETER => {
                let list = parent.parent()?;
                let owner = list.parent()?;
                let index = syntax::parameters(list)
                    .iter()
                    .position(|p| *p == parent)?;
                Some(SymbolId::Parameter {
                    owner_span: owner.byte_range(),
                    index,
                    name,
                })
            }
            kinds::LAMBDA_EXPRESSION => Some(SymbolId::Parameter {
                owner_span: parent.byte_range(),
                index: 0,
                name,
            }),
            _ => Some(SymbolId::Local {
                declarator_span: parent.byte_range(),
                name,
            }),
        }
    }

    fn resolve_simple_name(&self, identifier: Node<'_>, name: &str) -> Option<SymbolId> {
        let mut current = identifier.parent();
        while let Some(scope) = current {
            if let Some(symbol) = self.lookup_in_scope(scope, name) {
                return Some(symbol);
            }
            current = scope.parent();
        }
        None
    }

    fn lookup_in_scope(&self, scope: Node<'_>, name: &str) -> Option<SymbolId> {
        match scope.kind() {
            kinds::BLOCK => {
                for statement in children_of_kind(scope, kinds::LOCAL_DECLARATION_STATEMENT) {
                    if let Some(symbol) = self.lookup_declarators(statement, name) {
                        return Some(symbol);
                    }
                }
                descendants(scope)
                    .filter(|n| {
                        matches!(
                            n.kind(),
                            kinds::DECLARATION_EXPRESSION | kinds::DECLARATION_PATTERN
                        )
                    })
                    .filter(|n| ancestor_of_kind(*n, &[kinds::BLOCK]) == Some(scope))
                    .find(|n| syntax::name_of(*n).is_some_and(|id| self.is_named(id, name)))
                    .map(|n| SymbolId::Local {
                        declarator_span: n.byte_range(),
                        name: name.to_string(),
                    })
            }
            kinds::FOR_STATEMENT | kinds::USING_STATEMENT => self.lookup_declarators(scope, name),
            kinds::FOREACH_STATEMENT => scope
                .child_by_field_name("left")
                .filter(|left| left.kind() == kinds::IDENTIFIER && self.is_named(*left, name))
                .map(|_| SymbolId::Local {
                    declarator_span: scope.byte_range(),
                    name: name.to_string(),
                }),
            kinds::CATCH_CLAUSE => first_child_of_kind(scope, kinds::CATCH_DECLARATION)
                .filter(|decl| syntax::name_of(*decl).is_some_and(|id| self.is_named(id, name)))
                .map(|decl| SymbolId::Local {
                    declarator_span: decl.byte_range(),
                    name: name.to_string(),
                }),
            kinds::LAMBDA_EXPRESSION => match scope.child_by_field_name("parameters") {
                Some(single) if matches!(single.kind(), kinds::IDENTIFIER | "implicit_parameter") => {
                    self.is_named(single, name).then(|| SymbolId::Parameter {
                        owner_span: scope.byte_range(),
                        index: 0,
                        name: name.to_string(),
                    })
                }
                Some(list) => self.lookup_parameters(scope, list, name),
                None => None,
            },
            kind if syntax::TYPE_DECLARATIONS.contains(&kind) => self
                .lookup_field(scope, name)
                .or_else(|| {
                    // primary constructor parameters
                    first_child_of_kind(scope, kinds::PARAMETER_LIST)
                        .and_then(|list| self.lookup_parameters(scope, list, name))
                }),
            _ => first_child_of_kind(scope, kinds::PARAMETER_LIST)
                .and_then(|list| self.lookup_parameters(scope, list, name)),
        }
    }

    fn is_named(&self, node: Node<'_>, name: &str) -> bool {
        self.doc.text(node) == name
    }

    fn lookup_declarators(&self, holder: Node<'_>, name: &str) -> Option<SymbolId> {
        let declaration = first_child_of_kind(holder, kinds::VARIABLE_DECLARATION)?;
        children_of_kind(declaration, kinds::VARIABLE_DECLARATOR)
            .into_iter()
            .find(|d| syntax::name_of(*d).is_some_and(|id| self.doc.text(id) == name))
            .map(|d| SymbolId::Local {
                declarator_span: d.byte_range(),
                name: name.to_string(),
            })
    }

    fn lookup_parameters(&self, owner: Node<'_>, list: Node<'_>, name: &str) -> Option<SymbolId> {
        syntax::parameters(list)
            .iter()
            .position(|p| syntax::name_of(*p).is_some_and(|id| self.doc.text(id) == name))
            .map(|index| SymbolId::Parameter {
                owner_span: owner.byte_range(),
                index,
                name: name.to_string(),
            })
    }

    fn lookup_field(&self, type_decl: Node<'_>, name: &str) -> Option<SymbolId> {
        field_declarators(type_decl)
            .into_iter()
            .any(|d| syntax::name_of(d).is_some_and(|id| self.doc.text(id) == name))
            .then(|| SymbolId::Field {
                type_span: type_decl.byte_range(),
                name: name.to_string(),
            })
    }
}

impl SemanticModel for ScopeModel<'_> {
    fn resolve(&self, identifier: Node<'_>) -> Option<SymbolId> {
        if identifier.kind() != kinds::IDENTIFIER {
            return None;
        }
        let name = self.doc.text(identifier);
        match role(self.doc, identifier) {
            IdentifierRole::Declaration => self.declared_symbol(identifier),
            IdentifierRole::ThisMember => {
                let type_decl = ancestor_of_kind(identifier, syntax::TYPE_DECLARATIONS)?;
                self.lookup_field(type_decl, name)
            }
            IdentifierRole::ForeignMember | IdentifierRole::NonExpression => None,
            IdentifierRole::Simple => self.resolve_simple_name(identifier, name),
        }
    }
}

pub fn role(doc: &SyntaxDocument, identifier: Node<'_>) -> IdentifierRole {
    let Some(parent) = identifier.parent() else {
        return IdentifierRole::NonExpression;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(identifier);

    match parent.kind() {
        kinds::MEMBER_ACCESS_EXPRESSION if is_field("name") => {
            match parent.child_by_field_name("expression") {
                Some(receiver) if doc.text(receiver) == "this" => IdentifierRole::ThisMember,
                _ => IdentifierRole::ForeignMember,
            }
        }
        kinds::VARIABLE_DECLARATOR
        | kinds::PARAMETER
        | kinds::CATCH_DECLARATION
        | kinds::DECLARATION_EXPRESSION
        | kinds::DECLARATION_PATTERN
            if is_field("name") || syntax::name_of(parent) == Some(identifier) =>
        {
            IdentifierRole::Declaration
        }
        kinds::FOREACH_STATEMENT if is_field("left") => IdentifierRole::Declaration,
        kinds::LAMBDA_EXPRESSION if is_field("parameters") => IdentifierRole::Declaration,
        "name_colon" | "name_equals" | "qualified_name" | "alias_qualified_name"
        | "using_directive" | "namespace_declaration" | "file_scoped_namespace_declaration"
        | "attribute" | "type_parameter" | "type_argument_list" | "labeled_statement"
        | "goto_statement" | "base_list" => IdentifierRole::NonExpression,
        _ if is_field("type") || is_field("returns") => IdentifierRole::NonExpression,
        _ if is_field("name") => IdentifierRole::Declaration,
        _ => IdentifierRole::Simple,
    }
}

/// Declarators of every field declared directly in `type_decl`.
pub fn field_declarators(type_decl: Node<'_>) -> Vec<Node<'_>> {
    syntax::members(type_decl)
        .into_iter()
        .filter(|m| m.kind() == kinds::FIELD_DECLARATION)
        .filter_map(|field| first_child_of_kind(field, kinds::VARIABLE_DECLARATION))
        .flat_map(|decl| children_of_kind(decl, kinds::VARIABLE_DECLARATOR))
        .collect()
}

/// Constructors declared directly in `type_decl`.
pub fn constructors(type_decl: Node<'_>) -> Vec<Node<'_>> {
    syntax::members(type_decl)
        .into_iter()
        .filter(|m| m.kind() == kinds::CONSTRUCTOR_DECLARATION)
        .collect()
}

/// The block or expression body of a constructor, whichever it has.
pub fn body(member: Node<'_>) -> Option<Node<'_>> {
    named_children(member)
        .into_iter()
        .find(|c| matches!(c.kind(), kinds::BLOCK | kinds::ARROW_EXPRESSION_CLAUSE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifiers<'t>(doc: &'t SyntaxDocument, name: &str) -> Vec<Node<'t>> {
        descendants(doc.root())
            .filter(|n| n.kind() == kinds::IDENTIFIER && doc.text(*n) == name)
            .collect()
    }

    #[test]
    fn test_parameter_shadows_field() {
        let doc = SyntaxDocument::parse(
            "class C { private int name; C(int name) { this.name = name; } }",
        )
        .unwrap();
        let model = ScopeModel::new(&doc);
        let ids = identifiers(&doc, "name");
        // field declarator, parameter, this.name, name
        assert_eq!(ids.len(), 4);

        let field = model.resolve(ids[0]).unwrap();
        assert!(matches!(field, SymbolId::Field { .. }));
        let parameter = model.resolve(ids[1]).unwrap();
        assert!(matches!(parameter, SymbolId::Parameter { index: 0, .. }));

        assert_eq!(model.resolve(ids[2]), Some(field.clone()));
        assert_eq!(model.resolve(ids[3]), Some(parameter.clone()));
    }

    #[test]
    fn test_bare_name_binds_to_field() {
        let doc = SyntaxDocument::parse(
            "class C { int _x; void M() { var y = _x; } }",
        )
        .unwrap();
        let model = ScopeModel::new(&doc);
        let ids = identifiers(&doc, "_x");
        assert_eq!(model.resolve(ids[1]), model.resolve(ids[0]));
    }

    #[test]
    fn test_local_shadows_field() {
        let doc = SyntaxDocument::parse(
            "class C { int _x; void M() { int _x = 1; Use(_x); } }",
        )
        .unwrap();
        let model = ScopeModel::new(&doc);
        let ids = identifiers(&doc, "_x");
        assert!(matches!(model.resolve(ids[2]), Some(SymbolId::Local { .. })));
    }

    #[test]
    fn test_foreign_member_is_unbound() {
        let doc = SyntaxDocument::parse(
            "class C { int _x; void M(C other) { other._x = 1; } }",
        )
        .unwrap();
        let model = ScopeModel::new(&doc);
        let ids = identifiers(&doc, "_x");
        assert_eq!(role(&doc, ids[1]), IdentifierRole::ForeignMember);
        assert_eq!(model.resolve(ids[1]), None);
    }

    #[test]
    fn test_references_include_constructor_initializer() {
        let doc = SyntaxDocument::parse(
            "class C : B { C(int a) : base(a) { Use(a); } }",
        )
        .unwrap();
        let model = ScopeModel::new(&doc);
        let ctor = descendants(doc.root())
            .find(|n| n.kind() == kinds::CONSTRUCTOR_DECLARATION)
            .unwrap();
        let declared = model.resolve(identifiers(&doc, "a")[0]).unwrap();
        assert_eq!(model.references(ctor, &declared).len(), 2);
    }
}
