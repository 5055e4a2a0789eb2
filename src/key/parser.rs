use crate::core::{Result, StoreError};

use super::component::{ClusteringKeyComponent, KeyComponent, SortOrder};
use super::definition::KeyDefinition;

/// Compile a textual key spec into a [`KeyDefinition`].
///
/// Grammar, informally:
///
/// ```text
/// key-spec    = partition [ "," clustering* ] [ "unique" ]
/// partition   = "(" component ("," component)* ")" | component
/// clustering  = ("+" | "-")? component        ; "+" ascending (default)
/// component   = [ property "as" ] column ":" type
/// ```
///
/// Parentheses around the partition group are optional when there is exactly
/// one partition component or no clustering key at all. The scan is a single
/// left-to-right pass tracking parenthesis depth and a partition/clustering
/// mode; the first sort marker (or the closing parenthesis) switches the mode
/// permanently to clustering.
pub fn parse(spec: &str) -> Result<KeyDefinition> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(StoreError::KeyDefinition("empty key spec".to_string()));
    }

    let (body, unique) = strip_unique_suffix(trimmed);
    if body.trim().is_empty() {
        return Err(StoreError::KeyDefinition(
            "key spec has no components".to_string(),
        ));
    }

    let mut partition: Vec<KeyComponent> = Vec::new();
    let mut clustering: Vec<ClusteringKeyComponent> = Vec::new();
    let mut clustering_mode = false;
    let mut saw_group = false;
    let mut depth = 0u32;
    let mut current = String::new();

    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '(' => {
                if depth > 0 {
                    return Err(StoreError::KeyDefinition(
                        "nested parentheses in key spec".to_string(),
                    ));
                }
                if saw_group || !partition.is_empty() || clustering_mode {
                    return Err(StoreError::KeyDefinition(
                        "partition-key group must come first".to_string(),
                    ));
                }
                if !current.trim().is_empty() {
                    return Err(StoreError::KeyDefinition(
                        "unexpected '(' inside a component".to_string(),
                    ));
                }
                depth = 1;
                saw_group = true;
            }
            ')' => {
                if depth == 0 {
                    return Err(StoreError::KeyDefinition(
                        "unmatched ')' in key spec".to_string(),
                    ));
                }
                flush(&current, false, true, &mut partition, &mut clustering)?;
                current.clear();
                depth = 0;
                // Everything after the partition group clusters.
                clustering_mode = true;
            }
            ',' => {
                if current.trim().is_empty() && depth == 0 && saw_group {
                    // Separator right after the closing parenthesis.
                    continue;
                }
                if !clustering_mode && depth == 0 && leads_with_marker(&chars) {
                    // First sort marker at top level: the component being
                    // flushed is still partition, everything after clusters.
                    flush(&current, false, false, &mut partition, &mut clustering)?;
                    clustering_mode = true;
                } else {
                    flush(
                        &current,
                        clustering_mode,
                        depth > 0,
                        &mut partition,
                        &mut clustering,
                    )?;
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if depth != 0 {
        return Err(StoreError::KeyDefinition(
            "unmatched '(' in key spec".to_string(),
        ));
    }
    if !current.trim().is_empty() {
        flush(
            &current,
            clustering_mode,
            false,
            &mut partition,
            &mut clustering,
        )?;
    }

    let mut definition = KeyDefinition::new(partition, clustering);
    definition.set_unique(unique);
    definition.validate()?;
    Ok(definition)
}

/// Classify and store one raw component according to the scan mode.
fn flush(
    raw: &str,
    clustering_mode: bool,
    inside_group: bool,
    partition: &mut Vec<KeyComponent>,
    clustering: &mut Vec<ClusteringKeyComponent>,
) -> Result<()> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(StoreError::KeyDefinition(
            "empty key component".to_string(),
        ));
    }

    let (order, text) = split_sort_marker(text);
    match order {
        Some(order) => {
            if inside_group || !clustering_mode {
                return Err(StoreError::KeyDefinition(format!(
                    "sort marker on partition-key component '{}'",
                    text
                )));
            }
            clustering.push(ClusteringKeyComponent::new(parse_component(text)?, order));
        }
        None if clustering_mode => {
            // Unmarked component after the mode switch: ascending by default.
            clustering.push(ClusteringKeyComponent::new(
                parse_component(text)?,
                SortOrder::Ascending,
            ));
        }
        None => partition.push(parse_component(text)?),
    }

    Ok(())
}

/// Peek whether the next non-space character starts a sort-marked component.
fn leads_with_marker(chars: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    chars
        .clone()
        .find(|ch| !ch.is_whitespace())
        .map(|ch| ch == '+' || ch == '-')
        .unwrap_or(false)
}

fn split_sort_marker(text: &str) -> (Option<SortOrder>, &str) {
    if let Some(rest) = text.strip_prefix('+') {
        (Some(SortOrder::Ascending), rest.trim_start())
    } else if let Some(rest) = text.strip_prefix('-') {
        (Some(SortOrder::Descending), rest.trim_start())
    } else {
        (None, text)
    }
}

/// `[property "as"] column ":" type`
fn parse_component(text: &str) -> Result<KeyComponent> {
    let (names, type_name) = text.split_once(':').ok_or_else(|| {
        StoreError::KeyDefinition(format!("component '{}' is missing ':type'", text))
    })?;

    let data_type = type_name.parse()?;
    let tokens: Vec<&str> = names.split_whitespace().collect();

    let (property, column) = match tokens.as_slice() {
        [column] => (*column, *column),
        [property, "as", column] => (*property, *column),
        _ => {
            return Err(StoreError::KeyDefinition(format!(
                "malformed component '{}'",
                text
            )));
        }
    };

    if !property
        .chars()
        .next()
        .map(|ch| ch.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        return Err(StoreError::KeyDefinition(format!(
            "property name '{}' must start with a letter",
            property
        )));
    }

    Ok(KeyComponent::new(column, property, data_type))
}

/// The whole expression may end with the keyword `unique`.
fn strip_unique_suffix(spec: &str) -> (&str, bool) {
    if let Some(rest) = spec.strip_suffix("unique") {
        let boundary = rest
            .chars()
            .last()
            .map(|ch| ch.is_whitespace() || ch == ')')
            .unwrap_or(false);
        if boundary {
            return (rest.trim_end(), true);
        }
    }
    (spec, false)
}
