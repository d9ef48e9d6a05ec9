use crate::autofix::{fix_for, get_fix_providers, AutoFixEngine, CodeFixProvider};
use crate::config::Config;
use crate::error::Result;
use crate::rules::{check_document, Issue, Rule};
use crate::source::read_source_file;
use crate::syntax::SyntaxDocument;
use crate::walker::CSharpFileWalker;
use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Analyzer {
    config: Arc<Config>,
    rules: Vec<Box<dyn Rule>>,
    fix_providers: Vec<Box<dyn CodeFixProvider>>,
}

#[derive(Debug, serde::Serialize)]
pub struct AnalysisResults {
    pub file_issues: AHashMap<PathBuf, Vec<Issue>>,
    pub stats: AnalysisStats,
    pub performance_stats: Option<PerformanceStats>,
    /// New file contents, byte order mark included when the original had one.
    pub fixed_files: Option<AHashMap<PathBuf, String>>,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct AnalysisStats {
    pub total_files: usize,
    pub files_with_issues: usize,
    pub total_issues: usize,
    pub issues_by_severity: AHashMap<String, usize>,
    /// Files that could not be read or parsed.
    pub failed_files: usize,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct PerformanceStats {
    pub analysis_time_ms: u128,
    pub autofix_time_ms: Option<u128>,
    pub fixes_applied: usize,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let rules = crate::rules::get_enabled_rules(&config);
        let fix_providers = get_fix_providers(&config);

        Self {
            config: Arc::new(config),
            rules,
            fix_providers,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every enabled rule over `text` and attaches a fix to each issue
    /// whose provider can prove its edit safe.
    pub fn analyze_source(&self, path: &Path, text: &str) -> Result<Vec<Issue>> {
        let doc = SyntaxDocument::parse(text)?;
        let mut issues = check_document(&self.rules, path.to_path_buf(), &doc);

        if doc.has_errors() {
            tracing::debug!(path = %path.display(), "syntax errors present, fixes withheld");
            return Ok(issues);
        }
        for issue in &mut issues {
            issue.fix = fix_for(&self.fix_providers, &doc, issue.rule, &issue.span).ok();
        }
        Ok(issues)
    }

    /// Fix-all for one document: applies every non-overlapping fix, re-analyses
    /// the result and repeats until nothing fixable remains or the configured
    /// pass limit is reached. Returns the new text and the number of fixes
    /// applied.
    pub fn fix_source(&self, path: &Path, text: &str) -> Result<(String, usize)> {
        let mut engine = AutoFixEngine::new();
        let mut current = text.to_string();

        for pass in 0..self.config.autofix.max_passes {
            let issues = self.analyze_source(path, &current)?;
            if !issues.iter().any(|issue| issue.fix.is_some()) {
                break;
            }
            let fixed = engine.apply_fixes(&current, &issues);
            if fixed == current {
                tracing::debug!(path = %path.display(), pass, "fix pass made no progress");
                break;
            }
            current = fixed;
        }

        Ok((current, engine.fixes_applied))
    }

    pub fn analyze_path(&self, path: &Path) -> AnalysisResults {
        self.analyze_path_with_options(path, false)
    }

    pub fn analyze_path_with_autofix(&self, path: &Path) -> AnalysisResults {
        self.analyze_path_with_options(path, true)
    }

    fn analyze_path_with_options(&self, path: &Path, apply_autofix: bool) -> AnalysisResults {
        let start_time = std::time::Instant::now();

        let files: Vec<PathBuf> = if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            CSharpFileWalker::new(&self.config).walk(path).collect()
        };
        tracing::info!(files = files.len(), root = %path.display(), "analyzing");

        let (file_issues, failed_files) = self.analyze_files_parallel(&files);
        let mut performance_stats = PerformanceStats {
            analysis_time_ms: start_time.elapsed().as_millis(),
            ..PerformanceStats::default()
        };

        let mut fixed_files = None;
        if apply_autofix && self.config.autofix.enabled {
            let autofix_start = std::time::Instant::now();
            let (fixes, applied) = self.fix_files(&file_issues);
            performance_stats.autofix_time_ms = Some(autofix_start.elapsed().as_millis());
            performance_stats.fixes_applied = applied;
            if !fixes.is_empty() {
                fixed_files = Some(fixes);
            }
        }

        let mut stats = AnalysisStats {
            total_files: files.len(),
            files_with_issues: file_issues.len(),
            failed_files,
            ..AnalysisStats::default()
        };
        for issues in file_issues.values() {
            stats.total_issues += issues.len();
            for issue in issues {
                *stats
                    .issues_by_severity
                    .entry(issue.severity.to_string())
                    .or_insert(0) += 1;
            }
        }

        AnalysisResults {
            file_issues,
            stats,
            performance_stats: Some(performance_stats),
            fixed_files,
        }
    }

    fn analyze_files_parallel(&self, files: &[PathBuf]) -> (AHashMap<PathBuf, Vec<Issue>>, usize) {
        let file_issues: DashMap<PathBuf, Vec<Issue>> = DashMap::new();
        let failures = AtomicUsize::new(0);

        let analyze = |file_path: &PathBuf| match self.analyze_single_file(file_path) {
            Ok(issues) if !issues.is_empty() => {
                file_issues.insert(file_path.clone(), issues);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "skipping file");
                failures.fetch_add(1, Ordering::Relaxed);
            }
        };

        if self.config.performance.parallel_analysis {
            files.par_iter().for_each(analyze);
        } else {
            files.iter().for_each(analyze);
        }

        (file_issues.into_iter().collect(), failures.into_inner())
    }

    fn analyze_single_file(&self, file_path: &Path) -> Result<Vec<Issue>> {
        let source = read_source_file(file_path, self.config.performance.memory_mapped_io)?;
        self.analyze_source(file_path, &source.text)
    }

    fn fix_files(&self, file_issues: &AHashMap<PathBuf, Vec<Issue>>) -> (AHashMap<PathBuf, String>, usize) {
        let fix_one = |file_path: &PathBuf| -> Result<Option<(PathBuf, String, usize)>> {
            let source = read_source_file(file_path, self.config.performance.memory_mapped_io)?;
            let (fixed, applied) = self.fix_source(file_path, &source.text)?;
            Ok((fixed != source.text).then(|| (file_path.clone(), source.contents(&fixed), applied)))
        };

        let fixable: Vec<&PathBuf> = file_issues
            .iter()
            .filter(|(_, issues)| issues.iter().any(|issue| issue.fix.is_some()))
            .map(|(path, _)| path)
            .collect();

        let results: Vec<Result<Option<(PathBuf, String, usize)>>> =
            if self.config.performance.parallel_analysis {
                fixable.par_iter().map(|path| fix_one(*path)).collect()
            } else {
                fixable.iter().map(|path| fix_one(*path)).collect()
            };

        let mut fixes = AHashMap::new();
        let mut applied = 0;
        for result in results {
            match result {
                Ok(Some((path, fixed, count))) => {
                    applied += count;
                    fixes.insert(path, fixed);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "could not fix file"),
            }
        }
        (fixes, applied)
    }
}

impl AnalysisResults {
    pub fn total_issues(&self) -> usize {
        self.stats.total_issues
    }

    pub fn file_count(&self) -> usize {
        self.stats.total_files
    }

    pub fn files_with_issues(&self) -> usize {
        self.stats.files_with_issues
    }

    pub fn fixable_count(&self) -> usize {
        self.file_issues
            .values()
            .flat_map(|issues| issues.iter())
            .filter(|issue| issue.fix.is_some())
            .count()
    }

    pub fn analysis_time_ms(&self) -> u128 {
        self.performance_stats
            .as_ref()
            .map(|stats| stats.analysis_time_ms)
            .unwrap_or(0)
    }

    pub fn fixes_applied(&self) -> usize {
        self.performance_stats
            .as_ref()
            .map(|stats| stats.fixes_applied)
            .unwrap_or(0)
    }

    pub fn has_fixes(&self) -> bool {
        self.fixed_files.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixes_are_attached() {
        let analyzer = Analyzer::new(Config::default());
        let source = "class C { private int _x; C(int x) { _x = x; } }";
        let issues = analyzer.analyze_source(Path::new("C.cs"), source).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].fix.as_ref().map(|f| f.title.as_str()),
            Some("Remove unread field and related parameter/assignment")
        );
    }

    #[test]
    fn test_unsafe_fix_is_not_offered() {
        // `Reset` writes the field, so removing it would break compilation.
        let analyzer = Analyzer::new(Config::default());
        let source = "class C { private int _x; C(int x) { _x = x; } void Reset() { _x = 0; } }";
        let issues = analyzer.analyze_source(Path::new("C.cs"), source).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].fix.is_none());
    }

    #[test]
    fn test_disabled_rule_reports_nothing() {
        let mut config = Config::default();
        config.rules.check_unread_fields = false;
        let analyzer = Analyzer::new(config);
        let source = "class C { private int _x; C(int x) { _x = x; } }";
        assert!(analyzer.analyze_source(Path::new("C.cs"), source).unwrap().is_empty());
    }

    #[test]
    fn test_fix_source_runs_until_clean() {
        let analyzer = Analyzer::new(Config::default());
        let source = "class C\n{\n    private int _a;\n    private int _b;\n    public C(int a, int b)\n    {\n        _a = a;\n        _b = b;\n    }\n}\n";
        let (fixed, applied) = analyzer.fix_source(Path::new("C.cs"), source).unwrap();
        assert_eq!(fixed, "class C\n{\n    public C()\n    {\n    }\n}\n");
        assert_eq!(applied, 2);
    }
}
