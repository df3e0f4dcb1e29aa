use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::CompilerConfig;
use crate::diagnostic::Diagnostic;
use crate::span::Span;

pub const PROJECT_FILE: &str = "memoc.toml";

/// Project configuration from memoc.toml.
#[derive(Clone, Debug)]
pub struct Project {
    pub name: Option<String>,
    pub root_dir: PathBuf,
    /// Source directories or files, relative to `root_dir`.
    pub sources: Vec<PathBuf>,
    /// Output directory for compiled files, relative to `root_dir`.
    pub out_dir: Option<PathBuf>,
    pub compiler: CompilerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    #[serde(default)]
    project: ProjectTable,
    #[serde(default)]
    compiler: CompilerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectTable {
    name: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    out_dir: Option<String>,
}

impl Project {
    /// Load project from a memoc.toml file.
    pub fn load(toml_path: &Path) -> Result<Project, Diagnostic> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", toml_path.display(), e),
                Span::dummy(),
            )
        })?;
        let root_dir = toml_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&content, root_dir).map_err(|d| {
            d.with_note(format!("while loading '{}'", toml_path.display()))
        })
    }

    /// Parse memoc.toml contents.
    pub fn parse(content: &str, root_dir: PathBuf) -> Result<Project, Diagnostic> {
        let file: ProjectFile = toml::from_str(content).map_err(|e| {
            let span = e
                .span()
                .map(|r| Span::new(0, r.start as u32, r.end as u32))
                .unwrap_or_else(Span::dummy);
            Diagnostic::error(format!("invalid {}: {}", PROJECT_FILE, e.message()), span)
        })?;

        if let Err(err) = file.compiler.validate() {
            return Err(err.to_diagnostic());
        }

        let sources = if file.project.sources.is_empty() {
            vec![PathBuf::from("src")]
        } else {
            file.project.sources.iter().map(PathBuf::from).collect()
        };

        Ok(Project {
            name: file.project.name,
            root_dir,
            sources,
            out_dir: file.project.out_dir.map(PathBuf::from),
            compiler: file.compiler,
        })
    }

    /// Try to find a memoc.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilationMode, Environment};
    use std::fs;

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join(PROJECT_FILE);
        fs::write(
            &toml_path,
            r#"[project]
name = "app"
sources = ["components", "pages"]
out_dir = "dist"

[compiler]
compilation_mode = "annotation"
enable_preserve_existing_memoization_guarantees = true
"#,
        )
        .unwrap();

        let project = Project::load(&toml_path).unwrap();
        assert_eq!(project.name.as_deref(), Some("app"));
        assert_eq!(
            project.sources,
            vec![PathBuf::from("components"), PathBuf::from("pages")]
        );
        assert_eq!(project.out_dir, Some(PathBuf::from("dist")));
        assert_eq!(project.compiler.compilation_mode, CompilationMode::Annotation);
        assert!(project.compiler.enable_preserve_existing_memoization_guarantees);
        assert_eq!(project.root_dir, dir.path());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let project = Project::parse("", PathBuf::from(".")).unwrap();
        assert_eq!(project.sources, vec![PathBuf::from("src")]);
        assert_eq!(project.compiler, CompilerConfig::default());
    }

    #[test]
    fn test_conflicting_options_rejected() {
        let err = Project::parse(
            "[compiler]\nemit_freeze = true\nenvironment = \"production\"\n",
            PathBuf::from("."),
        )
        .unwrap_err();
        assert!(err.message.contains("configuration conflict"));
        let project = Project::parse(
            "[compiler]\nemit_freeze = true\nenvironment = \"development\"\n",
            PathBuf::from("."),
        )
        .unwrap();
        assert_eq!(project.compiler.environment, Environment::Development);
    }

    #[test]
    fn test_syntax_error_has_span() {
        let err = Project::parse("[compiler\n", PathBuf::from(".")).unwrap_err();
        assert!(err.message.starts_with("invalid memoc.toml"));
    }

    #[test]
    fn test_find_walks_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "").unwrap();
        let nested = dir.path().join("src").join("components");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Project::find(&nested), Some(dir.path().join(PROJECT_FILE)));
    }
}
