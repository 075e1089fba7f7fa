use crate::core::environment::content_digest;
use crate::domain::model::{FieldType, GraphQLType, TypePath};
use crate::domain::ports::Storage;
use crate::domain::schema::{FieldSchema, FieldSchemas, Schemas};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Mutex;

/// Append-only list of type paths, unique by path.
#[derive(Debug, Default)]
pub struct TypePathStore {
    inner: Mutex<TypePathTable>,
}

#[derive(Debug, Default)]
struct TypePathTable {
    entries: Vec<TypePath>,
    seen: HashSet<Vec<String>>,
}

impl TypePathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<TypePath>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.push(entry);
        }
        store
    }

    /// Returns `false` if the path was already recorded; the first entry wins.
    pub fn push(&self, entry: TypePath) -> bool {
        let mut table = self.table();
        if table.seen.contains(&entry.path) {
            return false;
        }
        table.seen.insert(entry.path.clone());
        table.entries.push(entry);
        true
    }

    pub fn entries(&self) -> Vec<TypePath> {
        self.table().entries.clone()
    }

    pub fn get(&self, path: &[String]) -> Option<TypePath> {
        self.table()
            .entries
            .iter()
            .find(|entry| entry.path == path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> std::sync::MutexGuard<'_, TypePathTable> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn persist<S: Storage>(&self, storage: &S, filename: &str) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries())?;
        storage.write_file(filename, &json).await?;
        tracing::debug!("Persisted {} type paths to {}", self.len(), filename);
        Ok(())
    }

    pub async fn load<S: Storage>(storage: &S, filename: &str) -> Result<Self> {
        let bytes = storage.read_file(filename).await?;
        let entries: Vec<TypePath> = serde_json::from_slice(&bytes)?;
        Ok(Self::from_entries(entries))
    }
}

/// `<prefix><digest of the schemas>.json`: changes whenever a schema does.
pub fn type_paths_filename(prefix: &str, schemas: &Schemas) -> String {
    let value = serde_json::to_value(schemas).unwrap_or_default();
    format!("{}{}.json", prefix, content_digest(&value))
}

/// `hero_image` -> `HeroImage`.
pub fn pascal_case(segment: &str) -> String {
    segment
        .split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Generated type name for a path, skipping the `data` segment.
pub fn generated_type_name(path: &[String]) -> String {
    let body: String = path
        .iter()
        .filter(|segment| segment.as_str() != "data")
        .map(|segment| pascal_case(segment))
        .collect();
    format!("Prismic{}", body)
}

/// The type recorded for a field of `kind` at `path`.
///
/// Container kinds get a name generated from their path so two slice zones
/// or groups never share a type.
pub fn type_name_for(path: &[String], kind: FieldType) -> String {
    match kind {
        FieldType::Slices => format!("{}SlicesType", generated_type_name(path)),
        FieldType::Group => format!("{}GroupType", generated_type_name(path)),
        FieldType::Slice => generated_type_name(path),
        other => other.graphql_type().to_string(),
    }
}

/// `items` and `primary` sections of a slice get their own object type.
pub fn section_type_name(slice_path: &[String], section: &str) -> String {
    let suffix = if section == "items" { "ItemType" } else { "PrimaryType" };
    format!("{}{}", generated_type_name(slice_path), suffix)
}

pub fn child_path(path: &[String], segment: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(segment.to_string());
    child
}

/// Every type path the schemas declare, in the order documents would
/// produce them.
pub fn type_paths_from_schemas(schemas: &Schemas) -> Vec<TypePath> {
    let mut out = Vec::new();

    for (custom_type, schema) in schemas.iter() {
        let root = vec![custom_type.clone()];
        out.push(TypePath::new(root.clone(), generated_type_name(&root)));
        out.push(TypePath::new(
            child_path(&root, "alternate_languages"),
            GraphQLType::AlternateLanguages.to_string(),
        ));

        let data = child_path(&root, "data");
        for (api_id, field) in schema.fields() {
            // The UID is a top-level document attribute, never part of `data`.
            if matches!(field, FieldSchema::Uid(_)) {
                continue;
            }
            collect_field(&child_path(&data, api_id), field, &mut out);
        }
    }

    out
}

fn collect_field(path: &[String], field: &FieldSchema, out: &mut Vec<TypePath>) {
    out.push(TypePath::new(path.to_vec(), type_name_for(path, field.field_type())));

    match field {
        FieldSchema::Group(group) => collect_fields(path, &group.config.fields, out),
        FieldSchema::Slices(slices) => {
            for (slice_type, choice) in &slices.config.choices {
                let slice_path = child_path(path, slice_type);
                out.push(TypePath::new(
                    slice_path.clone(),
                    type_name_for(&slice_path, FieldType::Slice),
                ));
                collect_slice_section(&slice_path, "primary", &choice.non_repeat, out);
                collect_slice_section(&slice_path, "items", &choice.repeat, out);
            }
        }
        _ => {}
    }
}

fn collect_slice_section(
    slice_path: &[String],
    section: &str,
    fields: &FieldSchemas,
    out: &mut Vec<TypePath>,
) {
    let section_path = child_path(slice_path, section);
    out.push(TypePath::new(
        section_path.clone(),
        section_type_name(slice_path, section),
    ));
    collect_fields(&section_path, fields, out);
}

fn collect_fields(path: &[String], fields: &FieldSchemas, out: &mut Vec<TypePath>) {
    for (api_id, field) in fields {
        collect_field(&child_path(path, api_id), field, out);
    }
}
