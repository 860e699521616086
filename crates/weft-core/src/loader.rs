//! Agent loader — parses one agent YAML into a hydrated `AgentDefinition`.
//!
//! Prompt paths in the YAML resolve against the YAML's parent directory,
//! and that base is threaded through include expansion explicitly so the
//! loader stays re-entrant across workers. Prompt processing order is fixed:
//! `{{include: path}}` tokens are expanded recursively first, then `{{key}}`
//! placeholders are substituted from the agent's metadata. Unknown keys are
//! left literal.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{AgentConfig, AgentDefinition};
use crate::error::LoadError;

/// Recursion cap for `{{include: ...}}` expansion; also catches cycles.
pub const MAX_INCLUDE_DEPTH: usize = 16;

const INCLUDE_PATTERN: &str = r"\{\{include:([^}]*)\}\}";

/// Stateless loader rooted at the configuration base directory. Resolved
/// prompt paths must stay inside that base.
#[derive(Debug, Clone)]
pub struct AgentLoader {
    base_dir: PathBuf,
}

impl AgentLoader {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: normalize_path(base_dir),
        }
    }

    /// Load and hydrate the agent described by `yaml_path`.
    pub fn load(&self, yaml_path: &Path) -> Result<AgentDefinition, LoadError> {
        let prompt_base = yaml_path.parent().unwrap_or_else(|| Path::new("."));

        let raw = fs::read_to_string(yaml_path).map_err(|source| LoadError::FileIo {
            path: yaml_path.to_path_buf(),
            source,
        })?;
        let config: AgentConfig =
            serde_yaml::from_str(&raw).map_err(|e| LoadError::ConfigInvalid {
                path: yaml_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let system_prompt =
            self.load_prompt(config.system_prompt_path.as_deref(), prompt_base, &config.metadata)?;
        let user_prompt =
            self.load_prompt(config.user_prompt_path.as_deref(), prompt_base, &config.metadata)?;

        Ok(AgentDefinition {
            id: config.id,
            name: config.name,
            version: config.version,
            description: config.description,
            system_prompt,
            user_prompt,
            model: config.model,
            allowed_tools: config.allowed_tools,
            metadata: config.metadata,
        })
    }

    /// Absent or blank prompt paths hydrate to the empty string.
    fn load_prompt(
        &self,
        relative: Option<&str>,
        prompt_base: &Path,
        metadata: &BTreeMap<String, serde_yaml::Value>,
    ) -> Result<String, LoadError> {
        let Some(relative) = relative.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(String::new());
        };

        let raw = self.read_relative(relative, prompt_base)?;
        let expanded = self.expand_includes(&raw, prompt_base, 0)?;
        Ok(substitute_metadata(&expanded, metadata))
    }

    /// Read a file relative to the prompt base, rejecting paths that resolve
    /// outside the configured base directory.
    fn read_relative(&self, relative: &str, prompt_base: &Path) -> Result<String, LoadError> {
        let full = normalize_path(&prompt_base.join(relative));
        if !full.starts_with(&self.base_dir) {
            return Err(LoadError::PathEscapesBase { path: full });
        }
        fs::read_to_string(&full).map_err(|source| LoadError::FileIo { path: full, source })
    }

    /// Replace every `{{include: <relative-path>}}` token with the processed
    /// contents of the referenced file. Includes resolve against the same
    /// prompt base at every depth.
    fn expand_includes(
        &self,
        content: &str,
        prompt_base: &Path,
        depth: usize,
    ) -> Result<String, LoadError> {
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(LoadError::IncludeDepthExceeded {
                path: prompt_base.to_path_buf(),
                max: MAX_INCLUDE_DEPTH,
            });
        }

        let include_re = regex::Regex::new(INCLUDE_PATTERN).unwrap();
        let mut out = String::with_capacity(content.len());
        let mut last = 0;

        for caps in include_re.captures_iter(content) {
            let token = caps.get(0).unwrap();
            out.push_str(&content[last..token.start()]);

            let include_path = caps[1].trim();
            let included = self.read_relative(include_path, prompt_base)?;
            let processed = self.expand_includes(&included, prompt_base, depth + 1)?;
            out.push_str(&processed);

            last = token.end();
        }
        out.push_str(&content[last..]);
        Ok(out)
    }
}

/// Substitute `{{key}}` placeholders from the metadata map. Keys absent from
/// the map stay literal.
pub fn substitute_metadata(
    content: &str,
    metadata: &BTreeMap<String, serde_yaml::Value>,
) -> String {
    let mut out = content.to_string();
    for (key, value) in metadata {
        out = out.replace(&format!("{{{{{}}}}}", key), &scalar_to_string(value));
    }
    out
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem, so traversal checks work on not-yet-existing paths too.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn grader_yaml(dir: &Path) -> PathBuf {
        let yaml = dir.join("agents/grader/grader.yaml");
        write(
            &yaml,
            r#"
id: "grader"
name: "Grader"
systemPromptPath: "prompts/system.md"
model:
  provider: "openai"
  name: "gpt-4o-mini"
metadata:
  subject: "algebra"
  passMark: 60
"#,
        );
        yaml
    }

    #[test]
    fn hydrates_prompts_with_includes_and_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = grader_yaml(dir.path());
        write(
            &dir.path().join("agents/grader/prompts/system.md"),
            "You grade {{subject}}.\n{{include: rubric.md}}\nUnknown: {{missing}}",
        );
        write(
            &dir.path().join("agents/grader/prompts/rubric.md"),
            "Pass mark is {{passMark}}.",
        );

        let loader = AgentLoader::new(dir.path());
        let agent = loader.load(&yaml).unwrap();

        assert_eq!(
            agent.system_prompt,
            "You grade algebra.\nPass mark is 60.\nUnknown: {{missing}}"
        );
        assert_eq!(agent.user_prompt, "");
    }

    #[test]
    fn reloading_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = grader_yaml(dir.path());
        write(
            &dir.path().join("agents/grader/prompts/system.md"),
            "{{include: inner.md}} tail",
        );
        write(
            &dir.path().join("agents/grader/prompts/inner.md"),
            "{{subject}} inner",
        );

        let loader = AgentLoader::new(dir.path());
        let first = loader.load(&yaml).unwrap();
        let second = loader.load(&yaml).unwrap();
        assert_eq!(first.system_prompt, "algebra inner tail");
        assert_eq!(first.system_prompt, second.system_prompt);
    }

    #[test]
    fn include_cycle_hits_depth_cap() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = grader_yaml(dir.path());
        write(
            &dir.path().join("agents/grader/prompts/system.md"),
            "{{include: loop.md}}",
        );
        write(
            &dir.path().join("agents/grader/prompts/loop.md"),
            "{{include: loop.md}}",
        );

        let loader = AgentLoader::new(dir.path());
        assert!(matches!(
            loader.load(&yaml),
            Err(LoadError::IncludeDepthExceeded { .. })
        ));
    }

    #[test]
    fn include_escaping_base_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let yaml = base.join("agents/grader/grader.yaml");
        write(
            &yaml,
            r#"
id: "grader"
systemPromptPath: "../../../outside.md"
model:
  provider: "openai"
  name: "gpt-4o-mini"
"#,
        );
        write(&dir.path().join("outside.md"), "secret");

        let loader = AgentLoader::new(&base);
        assert!(matches!(
            loader.load(&yaml),
            Err(LoadError::PathEscapesBase { .. })
        ));
    }

    #[test]
    fn missing_required_fields_are_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("agents/broken/broken.yaml");
        write(&yaml, "name: no id or model\n");

        let loader = AgentLoader::new(dir.path());
        assert!(matches!(
            loader.load(&yaml),
            Err(LoadError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn blank_prompt_paths_yield_empty_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("agents/min/min.yaml");
        write(
            &yaml,
            r#"
id: "min"
systemPromptPath: "  "
model:
  provider: "ollama"
  name: "llama3"
"#,
        );

        let loader = AgentLoader::new(dir.path());
        let agent = loader.load(&yaml).unwrap();
        assert_eq!(agent.system_prompt, "");
        assert_eq!(agent.user_prompt, "");
    }
}
