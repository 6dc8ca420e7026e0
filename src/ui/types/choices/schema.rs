use anyhow::{Context, Result, anyhow, bail};
use schemars::Schema;
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldKind {
    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(FieldKind::String),
            "integer" => Some(FieldKind::Integer),
            "number" => Some(FieldKind::Number),
            "boolean" => Some(FieldKind::Boolean),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// One overridable parameter of a learner, as advertised by its schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Dotted path accepted by `--learner-param`.
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub nullable: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: Option<Vec<String>>,
}

impl Display for FieldSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:<28} {:<8}", self.name, self.kind.label())?;
        if self.nullable {
            write!(f, " (nullable)")?;
        }
        if let Some(allowed) = &self.allowed {
            write!(f, " one of [{}]", allowed.join(", "))?;
        }
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => write!(f, " in [{lo}, {hi}]")?,
            (Some(lo), None) => write!(f, " >= {lo}")?,
            (None, Some(hi)) => write!(f, " <= {hi}")?,
            (None, None) => {}
        }
        write!(f, "  {}", self.title)?;
        if let Some(d) = &self.description {
            write!(f, ": {d}")?;
        }
        Ok(())
    }
}

/// Scalar parameter fields of the tagged-enum branch named `kind_key`.
///
/// Nested objects are flattened into dotted names, matching how
/// `--learner-param` addresses them.
pub fn specs_for_kind(root: &Schema, kind_key: &str) -> Result<Vec<FieldSpec>> {
    let root_obj = root.as_object().context("root schema is not an object")?;

    let alts = root_obj
        .get("oneOf")
        .or_else(|| root_obj.get("anyOf"))
        .and_then(Value::as_array)
        .context("missing oneOf/anyOf")?;

    for branch in alts {
        let bobj = branch.as_object().context("branch is not object")?;
        let Some(props) = bobj.get("properties").and_then(Value::as_object) else {
            continue;
        };
        if !discriminant_matches(props, kind_key) {
            continue;
        }

        let Some(params) = props.get("params").and_then(Value::as_object) else {
            return Ok(vec![]);
        };
        let Some(params) = resolve_ref_obj(root_obj, params) else {
            return Ok(vec![]);
        };

        let mut out = Vec::new();
        collect_fields(root_obj, params, "", &mut out)?;
        return Ok(out);
    }

    bail!("no branch found for type={kind_key}");
}

fn collect_fields(
    root_obj: &Map<String, Value>,
    object: &Map<String, Value>,
    prefix: &str,
    out: &mut Vec<FieldSpec>,
) -> Result<()> {
    let Some(props) = object.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, field_schema) in props {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        let own = field_schema
            .as_object()
            .context("field schema not object")?;
        let resolved = resolve_ref_obj(root_obj, own)
            .ok_or_else(|| anyhow!("failed to resolve field $ref for '{path}'"))?;

        if resolved.get("properties").is_some() {
            collect_fields(root_obj, resolved, &path, out)?;
            continue;
        }

        let Some((kind, nullable)) = detect_field_kind(resolved.get("type")) else {
            continue;
        };

        let title = own
            .get("title")
            .or_else(|| resolved.get("title"))
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();

        let description = own
            .get("description")
            .or_else(|| resolved.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let min = resolved
            .get("minimum")
            .or_else(|| resolved.get("exclusiveMinimum"))
            .and_then(Value::as_f64);
        let max = resolved
            .get("maximum")
            .or_else(|| resolved.get("exclusiveMaximum"))
            .and_then(Value::as_f64);

        let allowed = resolved.get("enum").and_then(Value::as_array).map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });

        out.push(FieldSpec {
            name: path,
            title,
            description,
            kind,
            nullable,
            min,
            max,
            allowed,
        });
    }
    Ok(())
}

fn discriminant_matches(props: &Map<String, Value>, kind_key: &str) -> bool {
    let Some(tobj) = props.get("type").and_then(Value::as_object) else {
        return false;
    };

    if tobj.get("const").and_then(Value::as_str) == Some(kind_key) {
        return true;
    }
    tobj.get("enum")
        .and_then(Value::as_array)
        .is_some_and(|arr| arr.len() == 1 && arr[0].as_str() == Some(kind_key))
}

/// Resolves a local `$ref` like `#/$defs/DecisionTreeParams` against the root.
/// Objects without a `$ref` resolve to themselves.
fn resolve_ref_obj<'a>(
    root_obj: &'a Map<String, Value>,
    obj: &'a Map<String, Value>,
) -> Option<&'a Map<String, Value>> {
    match obj.get("$ref") {
        Some(Value::String(r)) => {
            let path = r.strip_prefix("#/")?;
            let mut cur: &Map<String, Value> = root_obj;
            for raw_seg in path.split('/') {
                // JSON Pointer unescape (~1 => /, ~0 => ~)
                let seg = raw_seg.replace("~1", "/").replace("~0", "~");
                cur = cur.get(&seg)?.as_object()?;
            }
            Some(cur)
        }
        _ => Some(obj),
    }
}

/// Scalar kind of a `type` keyword plus whether `null` is also accepted.
fn detect_field_kind(ty: Option<&Value>) -> Option<(FieldKind, bool)> {
    match ty {
        Some(Value::String(s)) => FieldKind::from_type_name(s).map(|k| (k, false)),
        Some(Value::Array(arr)) => {
            let names: Vec<&str> = arr.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            names
                .iter()
                .find_map(|s| FieldKind::from_type_name(s))
                .map(|k| (k, nullable))
        }
        _ => None,
    }
}
