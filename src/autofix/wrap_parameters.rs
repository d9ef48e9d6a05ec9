use super::{CodeFixProvider, EditPlan};
use crate::error::NotApplicable;
use crate::rules::{signature_start, Fix, CONSTRUCTOR_LENGTH_ID};
use crate::syntax::{descendants, kinds, parameters, SyntaxDocument};
use std::ops::Range;
use tree_sitter::Node;

pub struct ParameterWrapFixer {
    indent_width: usize,
}

impl ParameterWrapFixer {
    pub fn new(indent_width: usize) -> Self {
        Self { indent_width }
    }
}

impl Default for ParameterWrapFixer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl CodeFixProvider for ParameterWrapFixer {
    fn fixable_ids(&self) -> &'static [&'static str] {
        &[CONSTRUCTOR_LENGTH_ID]
    }

    fn title(&self) -> &'static str {
        "Place each parameter on a new line"
    }

    fn equivalence_key(&self) -> &'static str {
        CONSTRUCTOR_LENGTH_ID
    }

    fn fix(&self, doc: &SyntaxDocument, anchor: &Range<usize>) -> Result<Fix, NotApplicable> {
        let list = doc
            .node_at(anchor, kinds::PARAMETER_LIST)
            .ok_or(NotApplicable::UnexpectedAnchor("parameter list"))?;
        let ctor = list
            .parent()
            .filter(|p| p.kind() == kinds::CONSTRUCTOR_DECLARATION)
            .ok_or(NotApplicable::MissingParent("constructor"))?;

        let params = parameters(list);
        if params.is_empty() {
            return Err(NotApplicable::EmptyParameterList);
        }

        let indent = " ".repeat(doc.column(signature_start(ctor)) + self.indent_width);
        let mut plan = EditPlan::new();
        let mut gap_start = list.start_byte() + 1;

        for param in &params {
            let gap = gap_start..param.start_byte();
            plan.replace(gap.clone(), leading_text(doc, list, &gap, &indent));
            gap_start = separator_after(*param).map_or(param.end_byte(), |c| c.end_byte());
        }

        plan.finish(self.title(), self.equivalence_key())
    }
}

/// Newline and indent, followed by the comments found in `gap`. Whitespace
/// in the gap is dropped.
fn leading_text(doc: &SyntaxDocument, list: Node<'_>, gap: &Range<usize>, indent: &str) -> String {
    let mut text = format!("\n{}", indent);
    let comments = descendants(list)
        .filter(|n| n.kind() == kinds::COMMENT)
        .filter(|n| gap.start <= n.start_byte() && n.end_byte() <= gap.end);

    for comment in comments {
        let comment_text = doc.text(comment).trim_end();
        text.push_str(comment_text);
        if comment_text.starts_with("//") {
            text.push('\n');
            text.push_str(indent);
        } else {
            text.push(' ');
        }
    }
    text
}

fn separator_after(param: Node<'_>) -> Option<Node<'_>> {
    let mut next = param.next_sibling();
    while let Some(node) = next {
        match node.kind() {
            "," => return Some(node),
            kinds::PARAMETER => return None,
            _ => next = node.next_sibling(),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofix::apply_fix;
    use crate::rules::{ConstructorLengthRule, Rule, RuleContext};
    use std::path::PathBuf;

    fn wrap(source: &str) -> Result<String, NotApplicable> {
        let doc = SyntaxDocument::parse(source).unwrap();
        let list = descendants(doc.root())
            .find(|n| n.kind() == kinds::PARAMETER_LIST)
            .unwrap();
        let fix = ParameterWrapFixer::default().fix(&doc, &list.byte_range())?;
        apply_fix(source, &fix)
    }

    #[test]
    fn test_each_parameter_on_its_own_line() {
        let source = "class C\n{\n    public C(int alpha, string beta, bool gamma) { }\n}\n";
        let expected = "class C\n{\n    public C(\n        int alpha,\n        string beta,\n        bool gamma) { }\n}\n";
        assert_eq!(wrap(source).unwrap(), expected);
    }

    #[test]
    fn test_indent_follows_constructor_column() {
        let source = "namespace N\n{\n    class C\n    {\n        C(int a, int b) { }\n    }\n}\n";
        let fixed = wrap(source).unwrap();
        assert!(fixed.contains("        C(\n            int a,\n            int b) { }"));
    }

    #[test]
    fn test_indent_ignores_attribute_line() {
        let source = "class C\n{\n  [Obsolete]\n    public C(int a, int b) { }\n}\n";
        let fixed = wrap(source).unwrap();
        assert!(fixed.contains("  [Obsolete]\n    public C(\n        int a,\n        int b) { }"));
    }

    #[test]
    fn test_comments_are_kept() {
        let source = "class C\n{\n    C(/* first */ int a, // second\n      int b) { }\n}\n";
        let fixed = wrap(source).unwrap();
        assert!(fixed.contains("    C(\n        /* first */ int a,\n        // second\n        int b) { }"));
    }

    #[test]
    fn test_empty_parameter_list() {
        assert_eq!(
            wrap("class C { C() { } }"),
            Err(NotApplicable::EmptyParameterList)
        );
    }

    #[test]
    fn test_method_parameter_list_is_rejected() {
        assert_eq!(
            wrap("class C { void M(int a) { } }"),
            Err(NotApplicable::MissingParent("constructor"))
        );
    }

    #[test]
    fn test_fix_is_idempotent() {
        let source = format!(
            "class C\n{{\n    public C(int alpha, string beta, bool gamma, string {}) {{ }}\n}}\n",
            "delta".repeat(14)
        );
        let once = wrap(&source).unwrap();
        assert_eq!(wrap(&once).unwrap(), once);

        let doc = SyntaxDocument::parse(once.as_str()).unwrap();
        let mut ctx = RuleContext::new(PathBuf::from("Test.cs"), &doc);
        ConstructorLengthRule::default().check(&mut ctx);
        assert!(ctx.issues.is_empty());
    }
}
