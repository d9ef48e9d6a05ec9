use super::*;
use crate::semantic::{self, role, IdentifierRole, ScopeModel, SemanticModel, SymbolId};
use crate::syntax::{self, descendants, kinds, named_children};
use tree_sitter::Node;

pub const UNREAD_FIELD_ID: &str = "DS0052";

pub static UNREAD_FIELD: RuleDescriptor = RuleDescriptor {
    id: UNREAD_FIELD_ID,
    title: "Private field is assigned but never read",
    category: "Usage",
    severity: Severity::Warning,
    description: "A private field is written by a constructor and never read anywhere in its \
                  type. The field, its constructor assignments and any constructor parameters \
                  that only fed those assignments can be removed.",
};

/// Host diagnostic id for the same condition; its issues can be fixed too.
pub const HOST_UNREAD_FIELD_ID: &str = "IDE0052";

const ACCESS_MODIFIERS: &[&str] = &["public", "protected", "internal", "file"];

pub struct UnreadFieldRule;

impl Rule for UnreadFieldRule {
    fn descriptor(&self) -> &'static RuleDescriptor {
        &UNREAD_FIELD
    }

    fn check(&self, ctx: &mut RuleContext<'_>) {
        let doc = ctx.document;
        let model = ScopeModel::new(doc);
        let mut issues_to_report = Vec::new();

        let types = descendants(doc.root()).filter(|n| syntax::is_type_declaration(*n));
        for type_decl in types {
            for declarator in semantic::field_declarators(type_decl) {
                let Some(field) = declarator.parent().and_then(|d| d.parent()) else {
                    continue;
                };
                if !is_private_field(doc, field) {
                    continue;
                }
                let Some(name) = syntax::name_of(declarator) else {
                    continue;
                };
                let Some(symbol) = model.resolve(name) else {
                    continue;
                };

                let usage = FieldUsage::collect(&model, type_decl, &symbol);
                if usage.is_unread() {
                    tracing::debug!(field = symbol.name(), "field is written but never read");
                    issues_to_report.push(ctx.issue(
                        &UNREAD_FIELD,
                        format!(
                            "Private field '{}' is assigned in a constructor but its value is never read",
                            symbol.name()
                        ),
                        name.byte_range(),
                    ));
                }
            }
        }

        for issue in issues_to_report {
            ctx.report(issue);
        }
    }
}

/// Explicitly `private`, or no accessibility at all (members default to
/// private). `const` fields cannot be assigned and are skipped.
pub fn is_private_field(doc: &SyntaxDocument, field: Node<'_>) -> bool {
    if field.kind() != kinds::FIELD_DECLARATION {
        return false;
    }
    let modifiers = syntax::modifiers(doc, field);
    if modifiers.contains(&"const") {
        return false;
    }
    !modifiers.iter().any(|m| ACCESS_MODIFIERS.contains(m))
}

/// A statement that does nothing but assign the field.
#[derive(Debug, Clone, Copy)]
pub struct DeadStatement<'t> {
    /// The `expression_statement`, or the `arrow_expression_clause` of an
    /// expression-bodied constructor.
    pub statement: Node<'t>,
    pub assignment: Node<'t>,
    pub expression_body: bool,
}

#[derive(Debug)]
pub struct ConstructorWrites<'t> {
    pub constructor: Node<'t>,
    pub statements: Vec<DeadStatement<'t>>,
}

/// Every mention of one field inside its declaring type, split into reads and
/// writes.
#[derive(Debug, Default)]
pub struct FieldUsage<'t> {
    pub constructor_writes: Vec<ConstructorWrites<'t>>,
    pub reads: Vec<Node<'t>>,
    /// Writes that are not one of the constructor statements above.
    pub other_writes: Vec<Node<'t>>,
}

impl<'t> FieldUsage<'t> {
    pub fn collect(model: &ScopeModel<'_>, type_decl: Node<'t>, field: &SymbolId) -> Self {
        let doc = model.document();
        let mut usage = FieldUsage::default();

        for ctor in semantic::constructors(type_decl) {
            let statements = dead_statements(model, ctor, field);
            if !statements.is_empty() {
                usage.constructor_writes.push(ConstructorWrites {
                    constructor: ctor,
                    statements,
                });
            }
        }

        for mention in mentions(model, type_decl, field) {
            if simple_assignment_target(doc, mention).is_none() {
                usage.reads.push(mention);
            } else if !usage.in_dead_statement(mention) {
                usage.other_writes.push(mention);
            }
        }

        usage
    }

    pub fn is_unread(&self) -> bool {
        !self.constructor_writes.is_empty() && self.reads.is_empty()
    }

    fn in_dead_statement(&self, node: Node<'_>) -> bool {
        let range = node.byte_range();
        self.dead_statements().any(|dead| {
            let outer = dead.statement.byte_range();
            outer.start <= range.start && range.end <= outer.end
        })
    }

    pub fn dead_statements(&self) -> impl Iterator<Item = &DeadStatement<'t>> {
        self.constructor_writes.iter().flat_map(|w| w.statements.iter())
    }
}

/// Statements of `ctor` that are a simple assignment into `field`.
pub fn dead_statements<'t>(
    model: &ScopeModel<'_>,
    ctor: Node<'t>,
    field: &SymbolId,
) -> Vec<DeadStatement<'t>> {
    let Some(body) = semantic::body(ctor) else {
        return Vec::new();
    };

    if body.kind() == kinds::ARROW_EXPRESSION_CLAUSE {
        return named_children(body)
            .into_iter()
            .find(|c| c.kind() != kinds::COMMENT)
            .filter(|expr| assigns_field(model, *expr, field))
            .map(|assignment| DeadStatement {
                statement: body,
                assignment,
                expression_body: true,
            })
            .into_iter()
            .collect();
    }

    named_children(body)
        .into_iter()
        .filter(|s| s.kind() == kinds::EXPRESSION_STATEMENT)
        .filter_map(|statement| {
            let expr = named_children(statement)
                .into_iter()
                .find(|c| c.kind() != kinds::COMMENT)?;
            assigns_field(model, expr, field).then_some(DeadStatement {
                statement,
                assignment: expr,
                expression_body: false,
            })
        })
        .collect()
}

/// `field = ...` or `this.field = ...` with a plain `=`.
pub fn assigns_field(model: &ScopeModel<'_>, expr: Node<'_>, field: &SymbolId) -> bool {
    let doc = model.document();
    if expr.kind() != kinds::ASSIGNMENT_EXPRESSION || assignment_operator(doc, expr) != Some("=") {
        return false;
    }
    let Some(left) = expr.child_by_field_name("left") else {
        return false;
    };
    let target = match left.kind() {
        kinds::IDENTIFIER => Some(left),
        kinds::MEMBER_ACCESS_EXPRESSION => left.child_by_field_name("name"),
        _ => None,
    };
    target.is_some_and(|t| model.resolve(t).as_ref() == Some(field))
}

pub fn assignment_operator<'d>(doc: &'d SyntaxDocument, assignment: Node<'_>) -> Option<&'d str> {
    let operator = assignment
        .child_by_field_name("operator")
        .or_else(|| assignment.child_by_field_name("left")?.next_sibling())?;
    Some(&doc.source()[operator.byte_range()])
}

/// The assignment whose left side is `mention`, directly or as the name of a
/// member access, when that assignment uses a plain `=`.
pub fn simple_assignment_target<'t>(doc: &SyntaxDocument, mention: Node<'t>) -> Option<Node<'t>> {
    let parent = mention.parent()?;
    let (target, assignment) = if parent.kind() == kinds::MEMBER_ACCESS_EXPRESSION
        && parent.child_by_field_name("name") == Some(mention)
    {
        (parent, parent.parent()?)
    } else {
        (mention, parent)
    };

    (assignment.kind() == kinds::ASSIGNMENT_EXPRESSION
        && assignment.child_by_field_name("left") == Some(target)
        && assignment_operator(doc, assignment) == Some("="))
    .then_some(assignment)
}

/// Identifiers in `type_decl` that may refer to `field`: every reference that
/// binds to it, plus same-named members accessed through another receiver,
/// which this document alone cannot rule out.
fn mentions<'t>(model: &ScopeModel<'_>, type_decl: Node<'t>, field: &SymbolId) -> Vec<Node<'t>> {
    let doc = model.document();
    descendants(type_decl)
        .filter(|n| n.kind() == kinds::IDENTIFIER && doc.text(*n) == field.name())
        .filter(|n| match role(doc, *n) {
            IdentifierRole::Declaration | IdentifierRole::NonExpression => false,
            IdentifierRole::ForeignMember => true,
            IdentifierRole::ThisMember | IdentifierRole::Simple => {
                model.resolve(*n).as_ref() == Some(field)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> Vec<Issue> {
        let doc = SyntaxDocument::parse(source).unwrap();
        let mut ctx = RuleContext::new(PathBuf::from("Test.cs"), &doc);
        UnreadFieldRule.check(&mut ctx);
        ctx.issues
    }

    fn flagged(source: &str) -> Vec<String> {
        check(source)
            .iter()
            .map(|issue| source[issue.span.clone()].to_string())
            .collect()
    }

    #[test]
    fn test_injected_field_never_read() {
        let source = r#"
class C
{
    private readonly ILogger _logger;

    public C(ILogger logger)
    {
        _logger = logger;
    }
}
"#;
        let issues = check(source);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, "DS0052");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].category, "Usage");
        assert_eq!(&source[issues[0].span.clone()], "_logger");
        assert_eq!(issues[0].location.line, 4);
    }

    #[test]
    fn test_this_qualified_assignment() {
        let source = "class C { private int count; C(int count) { this.count = count; } }";
        assert_eq!(flagged(source), vec!["count"]);
    }

    #[test]
    fn test_expression_bodied_constructor() {
        let source = "class C { private int _x; C(int x) => _x = x; }";
        assert_eq!(flagged(source), vec!["_x"]);
    }

    #[test]
    fn test_read_in_method_suppresses() {
        let source = "class C { private int _x; C(int x) { _x = x; } int Get() => _x; }";
        assert!(flagged(source).is_empty());
    }

    #[test]
    fn test_nameof_counts_as_read() {
        let source =
            "class C { private int _x; C(int x) { _x = x; } string N() { return nameof(_x); } }";
        assert!(flagged(source).is_empty());
    }

    #[test]
    fn test_compound_assignment_is_not_a_plain_write() {
        let source = "class C { private int _x; C(int x) { _x += x; } }";
        assert!(flagged(source).is_empty());
    }

    #[test]
    fn test_written_only_outside_constructors() {
        let source = "class C { private int _x; void Set(int x) { _x = x; } }";
        assert!(flagged(source).is_empty());
    }

    #[test]
    fn test_accessibility() {
        let public = "class C { public int _x; C(int x) { _x = x; } }";
        assert!(flagged(public).is_empty());

        let protected = "class C { private protected int _x; C(int x) { _x = x; } }";
        assert!(flagged(protected).is_empty());

        let implicit = "class C { int _x; C(int x) { _x = x; } }";
        assert_eq!(flagged(implicit), vec!["_x"]);
    }

    #[test]
    fn test_one_finding_per_declarator() {
        let source = "class C { private int a, b; C(int x, int y) { a = x; b = y; } int B => b; }";
        assert_eq!(flagged(source), vec!["a"]);

        let both = "class C { private int a, b; C(int x, int y) { a = x; b = y; } }";
        assert_eq!(flagged(both), vec!["a", "b"]);
    }

    #[test]
    fn test_local_with_same_name_is_not_a_read() {
        let source = r#"
class C
{
    private int _x;
    C(int x) { _x = x; }
    int M() { var _x = 3; return _x; }
}
"#;
        assert_eq!(flagged(source), vec!["_x"]);
    }

    #[test]
    fn test_foreign_member_access_counts_as_read() {
        let source = "class C { private int _x; C(int x) { _x = x; } bool Same(C o) => o._x == 1; }";
        assert!(flagged(source).is_empty());
    }

    #[test]
    fn test_usage_tracks_writes_outside_constructors() {
        let source = "class C { private int _x; C(int x) { _x = x; } void Reset() { _x = 0; } }";
        let doc = SyntaxDocument::parse(source).unwrap();
        let model = ScopeModel::new(&doc);
        let class = descendants(doc.root())
            .find(|n| n.kind() == kinds::CLASS_DECLARATION)
            .unwrap();
        let declarator = semantic::field_declarators(class)[0];
        let symbol = model.resolve(syntax::name_of(declarator).unwrap()).unwrap();

        let usage = FieldUsage::collect(&model, class, &symbol);
        assert!(usage.is_unread());
        assert_eq!(usage.dead_statements().count(), 1);
        assert_eq!(usage.other_writes.len(), 1);
    }
}
