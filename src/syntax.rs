//! Parsed C# documents.
//!
//! A [`SyntaxDocument`] pairs the source text with its tree-sitter tree. It is
//! never edited in place: fixes produce new text, which is parsed again into a
//! fresh document.

use crate::error::{Error, Result};
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Node kinds of the tree-sitter-c-sharp grammar used by the rules.
pub mod kinds {
    pub const CLASS_DECLARATION: &str = "class_declaration";
    pub const STRUCT_DECLARATION: &str = "struct_declaration";
    pub const RECORD_DECLARATION: &str = "record_declaration";
    pub const RECORD_STRUCT_DECLARATION: &str = "record_struct_declaration";
    pub const INTERFACE_DECLARATION: &str = "interface_declaration";
    pub const DECLARATION_LIST: &str = "declaration_list";

    pub const FIELD_DECLARATION: &str = "field_declaration";
    pub const CONSTRUCTOR_DECLARATION: &str = "constructor_declaration";
    pub const CONSTRUCTOR_INITIALIZER: &str = "constructor_initializer";
    pub const METHOD_DECLARATION: &str = "method_declaration";
    pub const LOCAL_FUNCTION_STATEMENT: &str = "local_function_statement";
    pub const LAMBDA_EXPRESSION: &str = "lambda_expression";
    pub const ANONYMOUS_METHOD_EXPRESSION: &str = "anonymous_method_expression";

    pub const VARIABLE_DECLARATION: &str = "variable_declaration";
    pub const VARIABLE_DECLARATOR: &str = "variable_declarator";
    pub const PARAMETER_LIST: &str = "parameter_list";
    pub const PARAMETER: &str = "parameter";
    pub const MODIFIER: &str = "modifier";

    pub const BLOCK: &str = "block";
    pub const ARROW_EXPRESSION_CLAUSE: &str = "arrow_expression_clause";
    pub const EXPRESSION_STATEMENT: &str = "expression_statement";
    pub const LOCAL_DECLARATION_STATEMENT: &str = "local_declaration_statement";
    pub const FOR_STATEMENT: &str = "for_statement";
    pub const FOREACH_STATEMENT: &str = "foreach_statement";
    pub const USING_STATEMENT: &str = "using_statement";
    pub const CATCH_CLAUSE: &str = "catch_clause";
    pub const CATCH_DECLARATION: &str = "catch_declaration";
    pub const DECLARATION_EXPRESSION: &str = "declaration_expression";
    pub const DECLARATION_PATTERN: &str = "declaration_pattern";

    pub const ASSIGNMENT_EXPRESSION: &str = "assignment_expression";
    pub const MEMBER_ACCESS_EXPRESSION: &str = "member_access_expression";
    pub const IDENTIFIER: &str = "identifier";
    pub const COMMENT: &str = "comment";
}

pub fn csharp_language() -> tree_sitter::Language {
    tree_sitter_c_sharp::LANGUAGE.into()
}

pub struct SyntaxDocument {
    source: String,
    tree: Tree,
    line_starts: Vec<usize>,
}

impl SyntaxDocument {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut parser = Parser::new();
        parser.set_language(&csharp_language())?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::Parse(format!("{} bytes of source", source.len())))?;

        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Ok(Self {
            source,
            tree,
            line_starts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }

    /// Zero-based line containing `byte`.
    pub fn line_of(&self, byte: usize) -> usize {
        match self.line_starts.binary_search(&byte) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(self.source.len())
    }

    /// Byte range of `line` without its line terminator.
    pub fn line_range(&self, line: usize) -> Range<usize> {
        let start = self.line_start(line);
        let mut end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        if end > start && self.source.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        start..end
    }

    pub fn line_text(&self, line: usize) -> &str {
        &self.source[self.line_range(line)]
    }

    /// Character column of `byte` within its line, zero-based.
    pub fn column(&self, byte: usize) -> usize {
        let start = self.line_start(self.line_of(byte));
        self.source[start..byte].chars().count()
    }

    /// One-based (line, column) pair used in reports.
    pub fn position(&self, byte: usize) -> (usize, usize) {
        (self.line_of(byte) + 1, self.column(byte) + 1)
    }

    /// Finds the node of `kind` covering exactly `span`.
    pub fn node_at(&self, span: &Range<usize>, kind: &str) -> Option<Node<'_>> {
        let mut node = self
            .root()
            .descendant_for_byte_range(span.start, span.end)?;
        loop {
            if node.kind() == kind && node.byte_range() == *span {
                return Some(node);
            }
            if node.start_byte() < span.start || node.end_byte() > span.end {
                return None;
            }
            node = node.parent()?;
        }
    }
}

/// Pre-order walk of `node` and everything below it.
pub fn descendants<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    let mut stack = vec![node];
    std::iter::from_fn(move || {
        let next = stack.pop()?;
        let mut cursor = next.walk();
        let children: Vec<_> = next.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
        Some(next)
    })
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == kind)
        .collect()
}

pub fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == kind)
}

pub fn ancestor_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

pub fn is_type_declaration(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        kinds::CLASS_DECLARATION
            | kinds::STRUCT_DECLARATION
            | kinds::RECORD_DECLARATION
            | kinds::RECORD_STRUCT_DECLARATION
    )
}

/// Kinds whose members may declare private fields and constructors.
pub const TYPE_DECLARATIONS: &[&str] = &[
    kinds::CLASS_DECLARATION,
    kinds::STRUCT_DECLARATION,
    kinds::RECORD_DECLARATION,
    kinds::RECORD_STRUCT_DECLARATION,
];

/// Direct members of a type declaration.
pub fn members(type_decl: Node<'_>) -> Vec<Node<'_>> {
    first_child_of_kind(type_decl, kinds::DECLARATION_LIST)
        .map(named_children)
        .unwrap_or_default()
}

/// Name identifier of a declarator, parameter or declaration.
pub fn name_of(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("name")
        .or_else(|| first_child_of_kind(node, kinds::IDENTIFIER))
}

/// Text of every `modifier` child, e.g. `["private", "readonly"]`.
pub fn modifiers<'d>(doc: &'d SyntaxDocument, node: Node<'_>) -> Vec<&'d str> {
    children_of_kind(node, kinds::MODIFIER)
        .into_iter()
        .map(|m| doc.source()[m.byte_range()].trim())
        .collect()
}

pub fn parameters(list: Node<'_>) -> Vec<Node<'_>> {
    children_of_kind(list, kinds::PARAMETER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_is_loadable() {
        let version = csharp_language().version();
        assert!(
            (tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION..=tree_sitter::LANGUAGE_VERSION)
                .contains(&version),
            "grammar ABI {} is not supported by this tree-sitter",
            version
        );
        let doc = SyntaxDocument::parse("class C { C(int a) { } }").unwrap();
        assert!(!doc.has_errors());
    }

    #[test]
    fn test_line_bookkeeping() {
        let doc = SyntaxDocument::parse("class A\r\n{\n    int x;\n}\n").unwrap();
        assert_eq!(doc.line_text(0), "class A");
        assert_eq!(doc.line_text(2), "    int x;");
        let x = doc.source().find('x').unwrap();
        assert_eq!(doc.line_of(x), 2);
        assert_eq!(doc.column(x), 8);
        assert_eq!(doc.position(x), (3, 9));
    }

    #[test]
    fn test_node_lookup_by_span() {
        let doc = SyntaxDocument::parse("class A { A(int a) { } }").unwrap();
        let ctor = descendants(doc.root())
            .find(|n| n.kind() == kinds::CONSTRUCTOR_DECLARATION)
            .unwrap();
        let span = ctor.byte_range();
        let found = doc.node_at(&span, kinds::CONSTRUCTOR_DECLARATION).unwrap();
        assert_eq!(found.id(), ctor.id());
        assert!(doc.node_at(&span, kinds::FIELD_DECLARATION).is_none());
    }

    #[test]
    fn test_members_and_modifiers() {
        let doc = SyntaxDocument::parse("class A { private readonly int _x; public A() { } }")
            .unwrap();
        let class = descendants(doc.root())
            .find(|n| n.kind() == kinds::CLASS_DECLARATION)
            .unwrap();
        let members = members(class);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].kind(), kinds::FIELD_DECLARATION);
        assert_eq!(modifiers(&doc, members[0]), vec!["private", "readonly"]);
    }
}
