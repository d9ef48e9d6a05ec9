use super::{CodeFixProvider, EditPlan};
use crate::error::NotApplicable;
use crate::rules::{ConstructorWrites, FieldUsage, Fix, HOST_UNREAD_FIELD_ID, UNREAD_FIELD_ID};
use crate::semantic::{ScopeModel, SemanticModel, SymbolId};
use crate::syntax::{self, ancestor_of_kind, children_of_kind, kinds, SyntaxDocument};
use std::ops::Range;
use tree_sitter::Node;

/// Removes an unread field together with the constructor statements that
/// assign it and the parameters that only existed to feed those statements.
pub struct UnreadFieldFixer;

impl CodeFixProvider for UnreadFieldFixer {
    fn fixable_ids(&self) -> &'static [&'static str] {
        &[UNREAD_FIELD_ID, HOST_UNREAD_FIELD_ID]
    }

    fn title(&self) -> &'static str {
        "Remove unread field and related parameter/assignment"
    }

    fn equivalence_key(&self) -> &'static str {
        UNREAD_FIELD_ID
    }

    fn fix(&self, doc: &SyntaxDocument, anchor: &Range<usize>) -> Result<Fix, NotApplicable> {
        let name = doc
            .node_at(anchor, kinds::IDENTIFIER)
            .ok_or(NotApplicable::UnexpectedAnchor("field name"))?;
        let declarator = name
            .parent()
            .filter(|p| p.kind() == kinds::VARIABLE_DECLARATOR)
            .ok_or(NotApplicable::UnexpectedAnchor("field declarator"))?;
        let declaration = declarator
            .parent()
            .filter(|p| p.kind() == kinds::VARIABLE_DECLARATION)
            .ok_or(NotApplicable::MissingParent("variable declaration"))?;
        let field = declaration
            .parent()
            .filter(|p| p.kind() == kinds::FIELD_DECLARATION)
            .ok_or(NotApplicable::MissingParent("field declaration"))?;
        let type_decl = ancestor_of_kind(field, syntax::TYPE_DECLARATIONS)
            .ok_or(NotApplicable::MissingParent("type declaration"))?;

        let model = ScopeModel::new(doc);
        let symbol = model
            .resolve(name)
            .filter(|s| matches!(s, SymbolId::Field { .. }))
            .ok_or(NotApplicable::UnresolvedSymbol)?;

        let usage = FieldUsage::collect(&model, type_decl, &symbol);
        if usage.constructor_writes.is_empty() {
            return Err(NotApplicable::NoConstructorAssignment);
        }
        if !usage.reads.is_empty() || !usage.other_writes.is_empty() {
            return Err(NotApplicable::FieldStillReferenced(symbol.name().to_string()));
        }

        let mut plan = EditPlan::new();
        for writes in &usage.constructor_writes {
            plan_constructor(&model, writes, &mut plan);
        }

        let declarators = children_of_kind(declaration, kinds::VARIABLE_DECLARATOR);
        if declarators.len() > 1 {
            let removed: Vec<bool> = declarators.iter().map(|d| *d == declarator).collect();
            for range in separated_removals(&declarators, &removed) {
                plan.remove(range);
            }
        } else {
            plan.remove(member_removal_range(doc, field));
        }

        tracing::debug!(field = symbol.name(), "planned unread field removal");
        plan.finish(self.title(), self.equivalence_key())
    }
}

/// Statement removals and parameter removals for one constructor.
fn plan_constructor(model: &ScopeModel<'_>, writes: &ConstructorWrites<'_>, plan: &mut EditPlan) {
    let doc = model.document();
    let ctor = writes.constructor;

    let mut candidates: Vec<SymbolId> = Vec::new();
    for dead in &writes.statements {
        if dead.expression_body {
            // `=> _field = value;` becomes an empty block
            plan.replace(dead.statement.start_byte()..ctor.end_byte(), "{ }");
        } else {
            plan.remove(statement_removal_range(doc, dead.statement));
        }

        let parameter = dead
            .assignment
            .child_by_field_name("right")
            .filter(|right| right.kind() == kinds::IDENTIFIER)
            .and_then(|right| model.resolve(right))
            .filter(|symbol| match symbol {
                SymbolId::Parameter { owner_span, .. } => *owner_span == ctor.byte_range(),
                _ => false,
            });
        if let Some(parameter) = parameter {
            if !candidates.contains(&parameter) {
                candidates.push(parameter);
            }
        }
    }

    let Some(list) = crate::rules::parameter_list(ctor) else {
        return;
    };
    let params = syntax::parameters(list);
    let mut removed = vec![false; params.len()];

    for candidate in &candidates {
        let SymbolId::Parameter { index, .. } = candidate else {
            continue;
        };
        let references = model.references(ctor, candidate);
        let in_dead = references
            .iter()
            .filter(|r| {
                writes.statements.iter().any(|dead| {
                    let outer = dead.statement.byte_range();
                    outer.start <= r.start_byte() && r.end_byte() <= outer.end
                })
            })
            .count();

        if in_dead > 0 && in_dead == references.len() {
            if let Some(flag) = removed.get_mut(*index) {
                *flag = true;
            }
        } else {
            tracing::debug!(
                parameter = candidate.name(),
                total = references.len(),
                in_dead,
                "keeping parameter that is used elsewhere"
            );
        }
    }

    if !params.is_empty() && removed.iter().all(|r| *r) {
        // Everything between the parentheses goes, including line breaks
        // left by a wrapped list.
        plan.remove(list.start_byte() + 1..list.end_byte() - 1);
        return;
    }
    for range in separated_removals(&params, &removed) {
        plan.remove(range);
    }
}

/// Ranges that delete the flagged items of a comma-separated list together
/// with their separators.
///
/// An item followed by a kept item takes everything up to that item with it;
/// the removed items after the last kept one go together with the separator
/// that precedes them.
fn separated_removals(items: &[Node<'_>], removed: &[bool]) -> Vec<Range<usize>> {
    if !removed.iter().any(|r| *r) {
        return Vec::new();
    }
    let Some(last_kept) = removed.iter().rposition(|r| !*r) else {
        let first = items[0].start_byte();
        let last = items[items.len() - 1].end_byte();
        return vec![first..last];
    };

    let mut ranges: Vec<Range<usize>> = (0..last_kept)
        .filter(|i| removed[*i])
        .map(|i| items[i].start_byte()..items[i + 1].start_byte())
        .collect();
    if last_kept + 1 < items.len() {
        ranges.push(items[last_kept].end_byte()..items[items.len() - 1].end_byte());
    }
    ranges
}

/// Whole lines when the statement sits on lines of its own, otherwise the
/// statement plus the blanks that follow it.
fn statement_removal_range(doc: &SyntaxDocument, node: Node<'_>) -> Range<usize> {
    let source = doc.source();
    let (start, end) = (node.start_byte(), node.end_byte());
    let first_line = doc.line_of(start);
    let last_line = doc.line_of(end);
    let line_start = doc.line_start(first_line);
    let line_end = doc.line_range(last_line).end;

    let before = &source[line_start..start];
    let after = &source[end..line_end];
    if before.trim().is_empty() && after.trim().is_empty() {
        line_start..doc.line_start(last_line + 1)
    } else {
        let trailing = after.len() - after.trim_start_matches([' ', '\t']).len();
        start..end + trailing
    }
}

/// Like [`statement_removal_range`], also taking the comment lines directly
/// above a member that occupies its own lines.
fn member_removal_range(doc: &SyntaxDocument, member: Node<'_>) -> Range<usize> {
    let range = statement_removal_range(doc, member);
    if range.start == member.start_byte() {
        return range;
    }

    let mut start = range.start;
    let mut previous = member.prev_sibling();
    while let Some(comment) = previous.filter(|p| p.kind() == kinds::COMMENT) {
        let line = doc.line_of(comment.start_byte());
        let own_line = doc.source()[doc.line_start(line)..comment.start_byte()]
            .trim()
            .is_empty();
        if !own_line || doc.line_of(comment.end_byte()) + 1 != doc.line_of(start) {
            break;
        }
        start = doc.line_start(line);
        previous = comment.prev_sibling();
    }
    start..range.end
}
