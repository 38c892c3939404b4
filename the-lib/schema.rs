//! The closed vocabulary a document may use.
//!
//! The schema is read by guards and default actions and never mutated by the
//! editor core. Changing it means replacing it wholesale.

use serde::{
  Deserialize,
  Serialize,
};

use crate::Tendril;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schema {
  pub styles:         Vec<Tendril>,
  pub decorators:     Vec<Tendril>,
  pub annotations:    Vec<AnnotationType>,
  pub lists:          Vec<Tendril>,
  pub block_objects:  Vec<ObjectType>,
  pub inline_objects: Vec<ObjectType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationType {
  pub name:   Tendril,
  #[serde(default)]
  pub fields: Vec<FieldType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectType {
  pub name:   Tendril,
  #[serde(default)]
  pub fields: Vec<FieldType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldType {
  pub name: Tendril,
  #[serde(rename = "type")]
  pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
  String,
  Number,
  Boolean,
  Object,
  Array,
}

impl FieldKind {
  pub fn accepts(self, value: &serde_json::Value) -> bool {
    use serde_json::Value;
    matches!(
      (self, value),
      (Self::String, Value::String(_))
        | (Self::Number, Value::Number(_))
        | (Self::Boolean, Value::Bool(_))
        | (Self::Object, Value::Object(_))
        | (Self::Array, Value::Array(_))
    )
  }
}

impl Default for Schema {
  fn default() -> Self {
    let names = |names: &[&str]| names.iter().map(|name| Tendril::from(*name)).collect();
    Self {
      styles:         names(&["normal", "h1", "h2", "h3", "blockquote"]),
      decorators:     names(&["strong", "em", "underline", "code", "strike-through"]),
      annotations:    vec![AnnotationType {
        name:   "link".into(),
        fields: vec![FieldType {
          name: "href".into(),
          kind: FieldKind::String,
        }],
      }],
      lists:          names(&["bullet", "number"]),
      block_objects:  vec![ObjectType {
        name:   "image".into(),
        fields: vec![FieldType {
          name: "src".into(),
          kind: FieldKind::String,
        }],
      }],
      inline_objects: vec![ObjectType {
        name:   "stock-ticker".into(),
        fields: vec![FieldType {
          name: "symbol".into(),
          kind: FieldKind::String,
        }],
      }],
    }
  }
}

impl Schema {
  pub fn has_style(&self, name: &str) -> bool {
    contains(&self.styles, name)
  }

  pub fn has_decorator(&self, name: &str) -> bool {
    contains(&self.decorators, name)
  }

  pub fn has_list(&self, name: &str) -> bool {
    contains(&self.lists, name)
  }

  pub fn annotation(&self, name: &str) -> Option<&AnnotationType> {
    self.annotations.iter().find(|ty| ty.name.as_str() == name)
  }

  pub fn block_object(&self, name: &str) -> Option<&ObjectType> {
    self.block_objects.iter().find(|ty| ty.name.as_str() == name)
  }

  pub fn inline_object(&self, name: &str) -> Option<&ObjectType> {
    self.inline_objects.iter().find(|ty| ty.name.as_str() == name)
  }

  /// The style new blocks get: the first declared, or `normal`.
  pub fn default_style(&self) -> Tendril {
    self
      .styles
      .first()
      .cloned()
      .unwrap_or_else(|| crate::document::DEFAULT_STYLE.into())
  }
}

/// Whether every declared field present in `fields` has the declared type.
/// Undeclared fields are rejected.
pub fn fields_conform(declared: &[FieldType], fields: &serde_json::Map<String, serde_json::Value>) -> bool {
  fields.iter().all(|(name, value)| {
    declared
      .iter()
      .find(|field| field.name.as_str() == name)
      .is_some_and(|field| field.kind.accepts(value))
  })
}

fn contains(names: &[Tendril], name: &str) -> bool {
  names.iter().any(|candidate| candidate.as_str() == name)
}
