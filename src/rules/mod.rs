use crate::config::Config;
use crate::syntax::SyntaxDocument;
use std::ops::Range;
use std::path::PathBuf;

mod constructor_length;
mod unread_field;

pub use constructor_length::*;
pub use unread_field::*;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Issue {
    pub rule: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub message: String,
    pub description: &'static str,
    pub location: Location,
    /// Byte range of the node the fix starts from.
    pub span: Range<usize>,
    pub fix: Option<Fix>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Fix {
    pub title: String,
    /// Groups fixes of the same kind for fix-all.
    pub equivalence_key: &'static str,
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Static description of a rule, shared by every issue it reports.
#[derive(Debug)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

pub struct RuleContext<'d> {
    pub file_path: PathBuf,
    pub document: &'d SyntaxDocument,
    pub issues: Vec<Issue>,
}

pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &'static RuleDescriptor;
    fn check(&self, ctx: &mut RuleContext<'_>);

    fn name(&self) -> &'static str {
        self.descriptor().id
    }
}

impl<'d> RuleContext<'d> {
    pub fn new(file_path: PathBuf, document: &'d SyntaxDocument) -> Self {
        Self {
            file_path,
            document,
            issues: Vec::new(),
        }
    }

    pub fn report(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn location(&self, span: &Range<usize>) -> Location {
        let (line, column) = self.document.position(span.start);
        let (end_line, end_column) = self.document.position(span.end);
        Location {
            line,
            column,
            end_line: Some(end_line),
            end_column: Some(end_column),
        }
    }

    pub fn issue(
        &self,
        descriptor: &'static RuleDescriptor,
        message: String,
        span: Range<usize>,
    ) -> Issue {
        Issue {
            rule: descriptor.id,
            title: descriptor.title,
            category: descriptor.category,
            severity: descriptor.severity,
            message,
            description: descriptor.description,
            location: self.location(&span),
            span,
            fix: None,
        }
    }
}

impl Severity {
    pub fn github_level(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "notice",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl Issue {
    pub fn display(&self) -> String {
        use colored::*;

        let severity_str = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".cyan().bold(),
        };

        let fixable = if self.fix.is_some() { " (fixable)".green() } else { "".normal() };

        format!(
            "  {}:{} {} [{}] {}{}",
            self.location.line,
            self.location.column,
            severity_str,
            self.rule.dimmed(),
            self.message,
            fixable
        )
    }
}

pub fn get_enabled_rules(config: &Config) -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = vec![];

    if config.rules.check_constructor_length {
        rules.push(Box::new(ConstructorLengthRule::new(config.style.max_line_length)));
    }

    if config.rules.check_unread_fields {
        rules.push(Box::new(UnreadFieldRule));
    }

    rules
}

/// Runs `rules` over one parsed document.
pub fn check_document(
    rules: &[Box<dyn Rule>],
    file_path: PathBuf,
    document: &SyntaxDocument,
) -> Vec<Issue> {
    let mut ctx = RuleContext::new(file_path, document);
    for rule in rules {
        rule.check(&mut ctx);
    }
    ctx.issues.sort_by_key(|issue| issue.span.start);
    ctx.issues
}
