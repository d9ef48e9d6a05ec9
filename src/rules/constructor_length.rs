use super::*;
use crate::syntax::{descendants, first_child_of_kind, kinds, parameters};
use tree_sitter::Node;

pub const CONSTRUCTOR_LENGTH_ID: &str = "DS0001";

pub static CONSTRUCTOR_LENGTH: RuleDescriptor = RuleDescriptor {
    id: CONSTRUCTOR_LENGTH_ID,
    title: "Constructor declaration line is too long",
    category: "Formatting",
    severity: Severity::Info,
    description: "The line a constructor declaration starts on is longer than the configured \
                  maximum. Placing each parameter on its own line keeps signatures readable.",
};

pub struct ConstructorLengthRule {
    max_length: usize,
}

impl ConstructorLengthRule {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Length of the line the constructor starts on, if it is over the limit.
    ///
    /// Only that physical line counts: a signature already wrapped over several
    /// lines is judged by its first line alone.
    pub fn measure(&self, doc: &SyntaxDocument, ctor: Node<'_>) -> Option<usize> {
        let list = parameter_list(ctor)?;
        if parameters(list).is_empty() {
            return None;
        }

        let line = doc.line_of(signature_start(ctor));
        let length = doc.line_text(line).chars().count();
        (length > self.max_length).then_some(length)
    }
}

impl Default for ConstructorLengthRule {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Rule for ConstructorLengthRule {
    fn descriptor(&self) -> &'static RuleDescriptor {
        &CONSTRUCTOR_LENGTH
    }

    fn check(&self, ctx: &mut RuleContext<'_>) {
        let doc = ctx.document;
        let mut issues_to_report = Vec::new();

        for ctor in descendants(doc.root()).filter(|n| n.kind() == kinds::CONSTRUCTOR_DECLARATION) {
            let Some(length) = self.measure(doc, ctor) else {
                continue;
            };
            let Some(list) = parameter_list(ctor) else {
                continue;
            };
            issues_to_report.push(ctx.issue(
                &CONSTRUCTOR_LENGTH,
                format!(
                    "Constructor declaration line is {} characters long (maximum {})",
                    length, self.max_length
                ),
                list.byte_range(),
            ));
        }

        for issue in issues_to_report {
            ctx.report(issue);
        }
    }
}

/// Byte where the constructor signature begins: its first modifier, or its
/// name. Attribute lists in front of the signature are skipped.
pub fn signature_start(ctor: Node<'_>) -> usize {
    first_child_of_kind(ctor, kinds::MODIFIER)
        .or_else(|| ctor.child_by_field_name("name"))
        .map_or(ctor.start_byte(), |node| node.start_byte())
}

pub fn parameter_list(ctor: Node<'_>) -> Option<Node<'_>> {
    ctor.child_by_field_name("parameters")
        .or_else(|| first_child_of_kind(ctor, kinds::PARAMETER_LIST))
}
