//! ARFF reader
//!
//! Supports dense ARFF files with numeric and nominal attributes. The last
//! declared attribute is the class and must be nominal.

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;

use super::{Attribute, AttributeKind, Dataset};
use crate::error::{MultiViewError, Result};

/// Read and parse an ARFF file
pub fn read_arff(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| MultiViewError::DatasetLoad(format!("{}: {}", path.display(), e)))?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_arff(&name, &text)
}

/// Parse ARFF text into a dataset named `name`
pub fn parse_arff(name: &str, text: &str) -> Result<Dataset> {
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut lines = text.lines().enumerate();
    let mut in_data = false;

    for (line_no, raw) in lines.by_ref() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@relation") {
            continue;
        } else if lower.starts_with("@attribute") {
            let rest = line["@attribute".len()..].trim();
            attributes.push(parse_attribute(rest).map_err(|e| at_line(name, line_no, e))?);
        } else if lower.starts_with("@data") {
            in_data = true;
            break;
        } else {
            return Err(at_line(name, line_no, format!("unexpected header line '{}'", line)));
        }
    }

    if !in_data {
        return Err(MultiViewError::DatasetLoad(format!("{}: missing @data section", name)));
    }
    if attributes.len() < 2 {
        return Err(MultiViewError::DatasetLoad(format!(
            "{}: need at least one feature attribute and a class attribute",
            name
        )));
    }

    let class_attribute = attributes.pop().unwrap_or_else(|| Attribute::numeric("class"));
    if !class_attribute.is_nominal() {
        return Err(MultiViewError::DatasetLoad(format!(
            "{}: class attribute '{}' must be nominal",
            name, class_attribute.name
        )));
    }

    let lookups: Vec<Option<HashMap<&str, usize>>> = attributes
        .iter()
        .chain(std::iter::once(&class_attribute))
        .map(|attr| match &attr.kind {
            AttributeKind::Nominal(values) => Some(
                values.iter().enumerate().map(|(i, v)| (v.as_str(), i)).collect(),
            ),
            AttributeKind::Numeric => None,
        })
        .collect();

    let n_features = attributes.len();
    let mut flat: Vec<f64> = Vec::new();
    let mut labels: Vec<usize> = Vec::new();
    let mut weights: Vec<f64> = Vec::new();

    for (line_no, raw) in lines {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        if line.starts_with('{') {
            return Err(at_line(name, line_no, "sparse instances are not supported".to_string()));
        }

        let mut values = split_values(line).map_err(|e| at_line(name, line_no, e))?;
        // Trailing instance weight, e.g. `1,2,a,{3}`
        let weight = match values.last() {
            Some(last) if last.starts_with('{') => {
                Some(parse_weight(last).map_err(|e| at_line(name, line_no, e))?)
            }
            _ => None,
        };
        if weight.is_some() {
            values.pop();
        }
        weights.push(weight.unwrap_or(1.0));
        if values.len() != n_features + 1 {
            return Err(at_line(
                name,
                line_no,
                format!("expected {} values, found {}", n_features + 1, values.len()),
            ));
        }

        for (j, value) in values[..n_features].iter().enumerate() {
            let parsed = parse_value(value, &attributes[j], lookups[j].as_ref())
                .map_err(|e| at_line(name, line_no, e))?;
            flat.push(parsed);
        }

        let class_value = &values[n_features];
        if class_value == "?" {
            return Err(at_line(name, line_no, "missing class value".to_string()));
        }
        let label = lookups[n_features]
            .as_ref()
            .and_then(|lookup| lookup.get(class_value.as_str()).copied())
            .ok_or_else(|| {
                at_line(
                    name,
                    line_no,
                    format!("undeclared class value '{}'", class_value),
                )
            })?;
        labels.push(label);
    }

    let features = Array2::from_shape_vec((labels.len(), n_features), flat)?;
    Dataset::new(name, attributes, class_attribute, features, labels)?.with_weights(weights)
}

fn parse_weight(token: &str) -> std::result::Result<f64, String> {
    token
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|w| w.is_finite() && *w >= 0.0)
        .ok_or_else(|| format!("invalid instance weight '{}'", token))
}

fn at_line(name: &str, line_no: usize, msg: String) -> MultiViewError {
    MultiViewError::DatasetLoad(format!("{} line {}: {}", name, line_no + 1, msg))
}

fn parse_attribute(decl: &str) -> std::result::Result<Attribute, String> {
    let (attr_name, rest) = split_name(decl)?;
    let rest = rest.trim();

    if rest.starts_with('{') {
        let close = rest
            .rfind('}')
            .ok_or_else(|| format!("unterminated nominal declaration for '{}'", attr_name))?;
        let values = split_values(&rest[1..close])?;
        if values.is_empty() {
            return Err(format!("nominal attribute '{}' declares no values", attr_name));
        }
        return Ok(Attribute::nominal(attr_name, values));
    }

    let kind = rest.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
    match kind.as_str() {
        "numeric" | "real" | "integer" => Ok(Attribute::numeric(attr_name)),
        "" => Err(format!("attribute '{}' has no type", attr_name)),
        other => Err(format!("attribute '{}' has unsupported type '{}'", attr_name, other)),
    }
}

/// Split a possibly quoted attribute name from the rest of the declaration
fn split_name(decl: &str) -> std::result::Result<(String, &str), String> {
    match decl.chars().next() {
        Some(q) if q == '\'' || q == '"' => {
            let end = decl[1..]
                .find(q)
                .ok_or_else(|| format!("unterminated attribute name in '{}'", decl))?;
            Ok((decl[1..end + 1].to_string(), &decl[end + 2..]))
        }
        Some(_) => {
            let end = decl.find(char::is_whitespace).unwrap_or(decl.len());
            let name = &decl[..end];
            // `@attribute color{red,blue}` is legal
            match name.find('{') {
                Some(brace) => Ok((name[..brace].to_string(), &decl[brace..])),
                None => Ok((name.to_string(), &decl[end..])),
            }
        }
        None => Err("empty attribute declaration".to_string()),
    }
}

/// Split a comma-separated list, honouring single/double quotes and escapes
fn split_values(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    let mut closed = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Some(q), c) if c == q => {
                quote = None;
                closed = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'') | (None, '"') => {
                current.clear();
                quote = Some(c);
                quoted = true;
            }
            (None, ',') => {
                values.push(finish_token(&mut current, &mut quoted));
                closed = false;
            }
            (None, c) if closed && c.is_whitespace() => {}
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err("unterminated quoted value".to_string());
    }
    if !current.trim().is_empty() || quoted || !values.is_empty() {
        values.push(finish_token(&mut current, &mut quoted));
    }
    Ok(values)
}

fn finish_token(current: &mut String, quoted: &mut bool) -> String {
    let token = if *quoted {
        current.clone()
    } else {
        current.trim().to_string()
    };
    current.clear();
    *quoted = false;
    token
}

fn parse_value(
    value: &str,
    attr: &Attribute,
    lookup: Option<&HashMap<&str, usize>>,
) -> std::result::Result<f64, String> {
    if value == "?" {
        return Ok(f64::NAN);
    }
    match lookup {
        Some(lookup) => lookup
            .get(value)
            .map(|&i| i as f64)
            .ok_or_else(|| format!("undeclared value '{}' for attribute '{}'", value, attr.name)),
        None => value
            .parse::<f64>()
            .map_err(|_| format!("invalid numeric value '{}' for attribute '{}'", value, attr.name)),
    }
}
