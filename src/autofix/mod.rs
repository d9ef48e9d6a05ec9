//! Fix providers and the engine that applies their edits.
//!
//! A fix never touches a tree. Providers describe their change as byte-range
//! [`Replacement`]s over the snapshot they analysed; the engine splices them
//! into the text and tidies the touched lines.

use crate::config::Config;
use crate::error::NotApplicable;
use crate::rules::{Fix, Issue, Replacement};
use crate::syntax::SyntaxDocument;
use std::ops::Range;

pub mod format;
mod unread_field;
mod wrap_parameters;

pub use unread_field::UnreadFieldFixer;
pub use wrap_parameters::ParameterWrapFixer;

pub trait CodeFixProvider: Send + Sync {
    /// Rule ids whose issues this provider can fix.
    fn fixable_ids(&self) -> &'static [&'static str];

    fn title(&self) -> &'static str;

    fn equivalence_key(&self) -> &'static str;

    /// Builds the edit for the issue anchored at `anchor`.
    fn fix(&self, doc: &SyntaxDocument, anchor: &Range<usize>) -> Result<Fix, NotApplicable>;
}

pub fn get_fix_providers(config: &Config) -> Vec<Box<dyn CodeFixProvider>> {
    vec![
        Box::new(ParameterWrapFixer::new(config.style.indent_size)),
        Box::new(UnreadFieldFixer),
    ]
}

/// Asks the provider registered for `rule` to fix the issue at `anchor`.
pub fn fix_for(
    providers: &[Box<dyn CodeFixProvider>],
    doc: &SyntaxDocument,
    rule: &str,
    anchor: &Range<usize>,
) -> Result<Fix, NotApplicable> {
    let provider = providers
        .iter()
        .find(|p| p.fixable_ids().contains(&rule))
        .ok_or_else(|| NotApplicable::UnsupportedRule(rule.to_string()))?;

    let result = provider.fix(doc, anchor);
    if let Err(reason) = &result {
        tracing::debug!(rule, ?anchor, %reason, "fix not applicable");
    }
    result
}

/// Replacements collected by a fix provider before they become a [`Fix`].
#[derive(Debug, Default)]
pub struct EditPlan {
    replacements: Vec<Replacement>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.replacements.push(Replacement {
            start: range.start,
            end: range.end,
            text: text.into(),
        });
    }

    pub fn remove(&mut self, range: Range<usize>) {
        self.replace(range, String::new());
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Orders the replacements and rejects the plan if any two overlap.
    pub fn finish(
        mut self,
        title: &str,
        equivalence_key: &'static str,
    ) -> Result<Fix, NotApplicable> {
        self.replacements.sort_by_key(|r| (r.start, r.end));
        if overlapping(&self.replacements) {
            return Err(NotApplicable::ConflictingEdits);
        }
        Ok(Fix {
            title: title.to_string(),
            equivalence_key,
            replacements: self.replacements,
        })
    }
}

fn overlapping(sorted: &[Replacement]) -> bool {
    sorted.windows(2).any(|pair| pair[1].start < pair[0].end)
}

pub struct AutoFixEngine {
    pub fixes_applied: usize,
}

impl AutoFixEngine {
    pub fn new() -> Self {
        Self { fixes_applied: 0 }
    }

    /// Applies every fix attached to `issues` that does not collide with a fix
    /// already taken in this pass. Colliding fixes are left for the next pass,
    /// after the document has been re-analysed.
    pub fn apply_fixes(&mut self, content: &str, issues: &[Issue]) -> String {
        let mut accepted: Vec<Replacement> = Vec::new();
        let mut taken = 0;

        for fix in issues.iter().filter_map(|issue| issue.fix.as_ref()) {
            let mut candidate = accepted.clone();
            candidate.extend(fix.replacements.iter().cloned());
            candidate.sort_by_key(|r| (r.start, r.end));
            if overlapping(&candidate) {
                tracing::debug!(fix = %fix.title, "deferring fix that overlaps an earlier one");
                continue;
            }
            accepted = candidate;
            taken += 1;
        }

        let combined = Fix {
            title: String::new(),
            equivalence_key: "",
            replacements: accepted,
        };
        match apply_fix(content, &combined) {
            Ok(fixed) => {
                self.fixes_applied += taken;
                fixed
            }
            Err(reason) => {
                tracing::warn!(%reason, "discarding fixes for this pass");
                content.to_string()
            }
        }
    }
}

impl Default for AutoFixEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Splices `fix` into `content` and tidies the lines it touched.
pub fn apply_fix(content: &str, fix: &Fix) -> Result<String, NotApplicable> {
    let mut replacements: Vec<&Replacement> = fix.replacements.iter().collect();
    replacements.sort_by_key(|r| (r.start, r.end));

    let mut output = String::with_capacity(content.len());
    let mut touched = Vec::with_capacity(replacements.len());
    let mut cursor = 0;

    for replacement in replacements {
        let in_bounds = cursor <= replacement.start
            && replacement.start <= replacement.end
            && replacement.end <= content.len()
            && content.is_char_boundary(replacement.start)
            && content.is_char_boundary(replacement.end);
        if !in_bounds {
            return Err(NotApplicable::ConflictingEdits);
        }

        output.push_str(&content[cursor..replacement.start]);
        let start = output.len();
        output.push_str(&replacement.text);
        touched.push(start..output.len());
        cursor = replacement.end;
    }
    output.push_str(&content[cursor..]);

    Ok(format::tidy(&output, &touched))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(replacements: Vec<(usize, usize, &str)>) -> Fix {
        Fix {
            title: "test".to_string(),
            equivalence_key: "TEST",
            replacements: replacements
                .into_iter()
                .map(|(start, end, text)| Replacement {
                    start,
                    end,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_apply_fix_splices_in_order() {
        let content = "int a; int b; int c;";
        let fixed = apply_fix(content, &fix(vec![(14, 20, "long c;"), (0, 7, "")])).unwrap();
        assert_eq!(fixed, "int b; long c;");
    }

    #[test]
    fn test_apply_fix_rejects_overlap() {
        let content = "abcdef";
        let result = apply_fix(content, &fix(vec![(0, 3, "x"), (2, 4, "y")]));
        assert_eq!(result, Err(NotApplicable::ConflictingEdits));
    }

    #[test]
    fn test_apply_fix_rejects_out_of_range() {
        let result = apply_fix("abc", &fix(vec![(1, 10, "")]));
        assert_eq!(result, Err(NotApplicable::ConflictingEdits));
    }

    #[test]
    fn test_providers_cover_both_rules_and_host_id() {
        let providers = get_fix_providers(&Config::default());
        let ids: Vec<&str> = providers
            .iter()
            .flat_map(|p| p.fixable_ids().iter().copied())
            .collect();
        assert_eq!(ids, vec!["DS0001", "DS0052", "IDE0052"]);

        let source = "class C { private int _x; C(int x) { _x = x; } }";
        let doc = SyntaxDocument::parse(source).unwrap();
        let name = source.find("_x").unwrap();
        let fix = fix_for(&providers, &doc, "IDE0052", &(name..name + 2)).unwrap();
        assert_eq!(fix.equivalence_key, "DS0052");
        assert_eq!(
            fix_for(&providers, &doc, "CS0168", &(name..name + 2)),
            Err(NotApplicable::UnsupportedRule("CS0168".to_string()))
        );
    }

    #[test]
    fn test_edit_plan_detects_conflicts() {
        let mut plan = EditPlan::new();
        plan.remove(4..9);
        plan.replace(0..5, "x");
        assert_eq!(plan.finish("t", "T"), Err(NotApplicable::ConflictingEdits));

        let mut plan = EditPlan::new();
        plan.remove(5..9);
        plan.replace(0..5, "x");
        let fix = plan.finish("t", "T").unwrap();
        assert_eq!(fix.replacements[0].start, 0);
        assert_eq!(fix.replacements[1].start, 5);
    }
}
