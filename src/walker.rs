use crate::config::Config;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub const IGNORE_FILE_NAME: &str = ".dslintignore";

/// Finds `.cs` files below a root, honouring `.gitignore`, `.dslintignore`
/// and the `ignore` globs of the configuration.
pub struct CSharpFileWalker {
    ignore: Vec<String>,
}

impl CSharpFileWalker {
    pub fn new(config: &Config) -> Self {
        Self {
            ignore: config.ignore.clone(),
        }
    }

    pub fn walk(&self, path: &Path) -> impl Iterator<Item = PathBuf> {
        let mut builder = WalkBuilder::new(path);
        builder
            .standard_filters(true)
            .add_custom_ignore_filename(IGNORE_FILE_NAME);
        if let Some(overrides) = self.overrides(path) {
            builder.overrides(overrides);
        }

        builder
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "cs"))
            .map(|entry| entry.path().to_path_buf())
    }

    fn overrides(&self, root: &Path) -> Option<Override> {
        if self.ignore.is_empty() {
            return None;
        }
        let mut builder = OverrideBuilder::new(root);
        for pattern in &self.ignore {
            if let Err(e) = builder.add(&format!("!{}", pattern)) {
                tracing::warn!(pattern, error = %e, "skipping invalid ignore pattern");
            }
        }
        match builder.build() {
            Ok(overrides) => Some(overrides),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring configured ignore patterns");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "class C { }").unwrap();
    }

    fn names(walker: &CSharpFileWalker, root: &Path) -> Vec<String> {
        let mut names: Vec<String> = walker
            .walk(root)
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_only_csharp_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.cs");
        touch(dir.path(), "src/B.cs");
        touch(dir.path(), "README.md");

        let walker = CSharpFileWalker::new(&Config::default());
        assert_eq!(names(&walker, dir.path()), vec!["A.cs", "src/B.cs"]);
    }

    #[test]
    fn test_ignore_file_and_config_globs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.cs");
        touch(dir.path(), "obj/Generated.cs");
        touch(dir.path(), "legacy/Old.cs");
        std::fs::write(dir.path().join(IGNORE_FILE_NAME), "legacy/\n").unwrap();

        let config = Config {
            ignore: vec!["obj/**".to_string()],
            ..Config::default()
        };
        let walker = CSharpFileWalker::new(&config);
        assert_eq!(names(&walker, dir.path()), vec!["A.cs"]);
    }
}
