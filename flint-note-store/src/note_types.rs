//! Note-type directory management (component G).

use flint_note_core::error::{FlintError, FlintResult};
use flint_note_core::models::NoteTypeInfo;
use flint_note_core::workspace::Workspace;
use serde::{Deserialize, Serialize};

const DESCRIPTION_FILE: &str = "_description.md";
const TEMPLATE_HEADING: &str = "\n## Template\n";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DescriptionFrontmatter {
    #[serde(default)]
    description: String,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    metadata_schema: Option<serde_json::Value>,
}

pub struct NoteTypeManager<'a> {
    workspace: &'a Workspace,
}

impl<'a> NoteTypeManager<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        template: Option<&str>,
        instructions: Option<&str>,
        metadata_schema: Option<serde_json::Value>,
    ) -> FlintResult<NoteTypeInfo> {
        let dir = self.workspace.ensure_note_type_dir(name)?;
        let desc_path = dir.join(DESCRIPTION_FILE);
        if desc_path.exists() {
            return Err(FlintError::Conflict(format!(
                "note type '{name}' already exists"
            )));
        }
        let text = render_description(description, template, instructions, &metadata_schema)?;
        tokio::fs::write(&desc_path, text).await?;
        self.get_info(name).await
    }

    pub async fn update(
        &self,
        name: &str,
        description: Option<&str>,
        template: Option<&str>,
        instructions: Option<&str>,
        metadata_schema: Option<serde_json::Value>,
    ) -> FlintResult<NoteTypeInfo> {
        let current = self.read_description(name).await?;
        let (current_front, current_template) = current;
        let new_front = DescriptionFrontmatter {
            description: description.unwrap_or(&current_front.description).to_string(),
            instructions: instructions
                .map(str::to_string)
                .or(current_front.instructions),
            metadata_schema: metadata_schema.or(current_front.metadata_schema),
        };
        let new_template = template.map(str::to_string).or(current_template);

        let text = render_description(
            &new_front.description,
            new_template.as_deref(),
            new_front.instructions.as_deref(),
            &new_front.metadata_schema,
        )?;
        let desc_path = self.workspace.note_type_dir(name)?.join(DESCRIPTION_FILE);
        tokio::fs::write(&desc_path, text).await?;
        self.get_info(name).await
    }

    pub async fn get_info(&self, name: &str) -> FlintResult<NoteTypeInfo> {
        let (front, template) = self.read_description(name).await?;
        let note_count = self.count_notes(name)?;
        Ok(NoteTypeInfo {
            name: name.to_string(),
            description: front.description,
            template,
            instructions: front.instructions,
            metadata_schema: front.metadata_schema,
            note_count,
        })
    }

    pub async fn get_template(&self, name: &str) -> FlintResult<Option<String>> {
        Ok(self.read_description(name).await?.1)
    }

    pub fn list(&self) -> FlintResult<Vec<String>> {
        self.workspace.list_note_type_dirs()
    }

    fn count_notes(&self, name: &str) -> FlintResult<usize> {
        let dir = self.workspace.note_type_dir(name)?;
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Ok(0);
        };
        let count = entries
            .flatten()
            .filter(|e| {
                let path = e.path();
                path.extension().and_then(|e| e.to_str()) == Some("md")
                    && path.file_name().and_then(|n| n.to_str()) != Some(DESCRIPTION_FILE)
            })
            .count();
        Ok(count)
    }

    async fn read_description(
        &self,
        name: &str,
    ) -> FlintResult<(DescriptionFrontmatter, Option<String>)> {
        let dir = self.workspace.note_type_dir(name)?;
        if !dir.is_dir() {
            return Err(FlintError::NotFound(format!("note type '{name}' not found")));
        }
        let desc_path = dir.join(DESCRIPTION_FILE);
        let raw = match tokio::fs::read_to_string(&desc_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((DescriptionFrontmatter::default(), None));
            }
            Err(e) => return Err(e.into()),
        };
        let parsed = crate::frontmatter::parse(&raw);
        let front: DescriptionFrontmatter =
            serde_json::from_value(serde_json::Value::Object(
                parsed.metadata.into_iter().collect(),
            ))
            .unwrap_or_default();
        let template = parsed
            .body
            .split_once(TEMPLATE_HEADING)
            .map(|(_, rest)| rest.trim_end().to_string())
            .filter(|t| !t.is_empty());
        Ok((front, template))
    }
}

fn render_description(
    description: &str,
    template: Option<&str>,
    instructions: Option<&str>,
    metadata_schema: &Option<serde_json::Value>,
) -> FlintResult<String> {
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert(
        "description".to_string(),
        serde_json::Value::String(description.to_string()),
    );
    if let Some(instructions) = instructions {
        metadata.insert(
            "instructions".to_string(),
            serde_json::Value::String(instructions.to_string()),
        );
    }
    if let Some(schema) = metadata_schema {
        metadata.insert("metadata_schema".to_string(), schema.clone());
    }

    let mut body = format!("# {description}\n");
    if let Some(template) = template {
        body.push_str(TEMPLATE_HEADING);
        body.push_str(template);
        body.push('\n');
    }
    Ok(crate::frontmatter::serialize(&metadata, &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_then_get_info_round_trips() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path()).unwrap();
        let manager = NoteTypeManager::new(&workspace);
        manager
            .create("meetings", "Meeting notes", Some("# {{title}}"), None, None)
            .await
            .unwrap();

        let info = manager.get_info("meetings").await.unwrap();
        assert_eq!(info.description, "Meeting notes");
        assert_eq!(info.template.as_deref(), Some("# {{title}}"));
        assert_eq!(info.note_count, 0);
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path()).unwrap();
        let manager = NoteTypeManager::new(&workspace);
        manager.create("meetings", "Meeting notes", None, None, None).await.unwrap();
        let err = manager
            .create("meetings", "Other", None, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn list_returns_created_types() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path()).unwrap();
        let manager = NoteTypeManager::new(&workspace);
        manager.create("a", "A", None, None, None).await.unwrap();
        manager.create("b", "B", None, None, None).await.unwrap();
        assert_eq!(manager.list().unwrap(), vec!["a", "b"]);
    }
}
