/// Filesystem discovery and format-specific definition loading
///
/// Three source formats are supported, selected by file extension: JSON (the
/// native structured document), YAML (plain structured data) and Lua (a
/// scripted module evaluated in a sandboxed VM that must define one expected
/// global). Each format is a [`FormatLoader`] implementation; the source
/// dispatches by extension and knows nothing about format internals.

use crate::definition::types::Definition;
use crate::error::LoadError;
use crate::loader::SkippedFile;
use async_trait::async_trait;
use mlua::LuaSerdeExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never scanned or watched, by convention.
pub const IGNORED_DIRS: [&str; 5] = ["node_modules", "target", "dist", "coverage", ".git"];

/// One source format behind a plugin-style contract: claim an extension,
/// load a path into a raw definition.
#[async_trait]
pub trait FormatLoader: Send + Sync {
    fn can_handle(&self, extension: &str) -> bool;
    async fn load(&self, path: &Path) -> Result<Definition, LoadError>;
}

/// Result of one discovery walk: loadable paths in deterministic order plus
/// the paths that were deliberately passed over.
#[derive(Debug, Default)]
pub struct Discovery {
    pub paths: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// Discovers definition files under a root directory and loads them through
/// the registered format loaders.
pub struct DefinitionSource {
    loaders: Vec<Box<dyn FormatLoader>>,
}

impl Default for DefinitionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionSource {
    /// Source with the three built-in formats registered.
    pub fn new() -> Self {
        Self::with_loaders(vec![
            Box::new(JsonLoader),
            Box::new(YamlLoader),
            Box::new(LuaLoader),
        ])
    }

    pub fn with_loaders(loaders: Vec<Box<dyn FormatLoader>>) -> Self {
        Self { loaders }
    }

    /// Walk `root` and collect files matching the configured extensions, in
    /// sorted order for deterministic reporting. Ignored directories are
    /// pruned and recorded as skips; hidden files (editor artifacts) are
    /// skipped too. A failure to read the tree itself aborts the walk and is
    /// the caller's catastrophic-discovery case.
    pub fn discover(&self, root: &Path, extensions: &[String]) -> Result<Discovery, LoadError> {
        let mut discovery = Discovery::default();

        let mut entries = WalkDir::new(root).sort_by_file_name().into_iter();
        while let Some(entry) = entries.next() {
            let entry = entry.map_err(|err| {
                LoadError::Io(err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")))
            })?;

            let path = entry.path();
            if entry.file_type().is_dir() {
                if entry.depth() > 0 && is_ignored_dir(entry.file_name().to_string_lossy().as_ref())
                {
                    discovery.skipped.push(SkippedFile {
                        source_path: path.to_path_buf(),
                        reason: "ignored directory".to_string(),
                    });
                    entries.skip_current_dir();
                }
                continue;
            }

            let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
                continue;
            };
            if !extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)) {
                continue;
            }

            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if hidden {
                discovery.skipped.push(SkippedFile {
                    source_path: path.to_path_buf(),
                    reason: "hidden file".to_string(),
                });
                continue;
            }

            discovery.paths.push(path.to_path_buf());
        }

        tracing::debug!(
            "🔍 Discovered {} definition file(s) under {} ({} skipped)",
            discovery.paths.len(),
            root.display(),
            discovery.skipped.len()
        );
        Ok(discovery)
    }

    /// Load one definition file, dispatching on its extension.
    pub async fn load(&self, path: &Path) -> Result<Definition, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        for loader in &self.loaders {
            if loader.can_handle(extension) {
                return loader.load(path).await;
            }
        }

        Err(LoadError::UnsupportedFormat {
            extension: extension.to_string(),
        })
    }
}

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name) || name.starts_with('.')
}

/// Expected export name for a scripted definition, derived from the file's
/// base name with kebab/snake case folded to camelCase
/// ("bug-fixes.lua" → "bugFixes").
pub fn expected_export(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let mut export = String::with_capacity(stem.len());
    let mut upper_next = false;
    for ch in stem.chars() {
        if ch == '-' || ch == '_' {
            upper_next = true;
        } else if upper_next {
            export.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            export.push(ch);
        }
    }
    export
}

/// Native structured format.
pub struct JsonLoader;

#[async_trait]
impl FormatLoader for JsonLoader {
    fn can_handle(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case("json")
    }

    async fn load(&self, path: &Path) -> Result<Definition, LoadError> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|err| LoadError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Plain structured-data format.
pub struct YamlLoader;

#[async_trait]
impl FormatLoader for YamlLoader {
    fn can_handle(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
    }

    async fn load(&self, path: &Path) -> Result<Definition, LoadError> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|err| LoadError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Scripted format: the file is evaluated in a fresh sandboxed Lua VM and
/// must define a global table named after its camelCased base name.
pub struct LuaLoader;

impl LuaLoader {
    /// Globals with filesystem/process reach are stripped before the script
    /// runs; a definition script only builds a table.
    const BLOCKED_GLOBALS: [&'static str; 4] = ["os", "io", "debug", "package"];

    fn evaluate(source: &str, export: &str, path: &Path) -> Result<Definition, LoadError> {
        let lua = mlua::Lua::new();
        let globals = lua.globals();
        for blocked in Self::BLOCKED_GLOBALS {
            let _ = globals.set(blocked, mlua::Nil);
        }

        lua.load(source)
            .set_name(path.to_string_lossy())
            .exec()
            .map_err(|err| LoadError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let value: mlua::Value = globals.get(export).map_err(|err| LoadError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        if value.is_nil() {
            return Err(LoadError::MissingExport {
                symbol: export.to_string(),
                path: path.to_path_buf(),
            });
        }

        lua.from_value(value).map_err(|err| LoadError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl FormatLoader for LuaLoader {
    fn can_handle(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case("lua")
    }

    async fn load(&self, path: &Path) -> Result<Definition, LoadError> {
        let source = tokio::fs::read_to_string(path).await?;
        let export = expected_export(path);
        // The VM lives entirely within this call; nothing Lua crosses an
        // await point.
        Self::evaluate(&source, &export, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_name_derivation() {
        assert_eq!(expected_export(Path::new("workflows/bug-fixes.lua")), "bugFixes");
        assert_eq!(expected_export(Path::new("refactoring.lua")), "refactoring");
        assert_eq!(expected_export(Path::new("a_b_c.lua")), "aBC");
    }

    #[test]
    fn ignored_dir_names() {
        assert!(is_ignored_dir("node_modules"));
        assert!(is_ignored_dir(".git"));
        assert!(is_ignored_dir(".cache"));
        assert!(!is_ignored_dir("workflows"));
    }

    #[test]
    fn lua_evaluation_extracts_expected_global() {
        let source = r#"
            bugFixes = {
                id = "bug-fixes",
                name = "Bug Fixes",
                version = "1.0.0",
                active = true,
                nodes = {
                    {
                        id = "n1",
                        name = "Start",
                        type = "flowdeck.shell",
                        typeVersion = 1,
                        position = { 100, 200 },
                        parameters = { command = "true" },
                    },
                },
            }
        "#;
        let definition =
            LuaLoader::evaluate(source, "bugFixes", Path::new("bug-fixes.lua")).unwrap();
        assert_eq!(definition.id, "bug-fixes");
        assert_eq!(definition.nodes.len(), 1);
        assert_eq!(definition.nodes[0].node_type, "flowdeck.shell");
    }

    #[test]
    fn lua_missing_export_is_reported() {
        let err = LuaLoader::evaluate("somethingElse = {}", "bugFixes", Path::new("bug-fixes.lua"))
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingExport { .. }));
    }

    #[test]
    fn lua_sandbox_removes_process_globals() {
        let err = LuaLoader::evaluate(
            r#"bugFixes = { id = os.getenv("HOME") }"#,
            "bugFixes",
            Path::new("bug-fixes.lua"),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
