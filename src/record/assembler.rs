// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Reconstruction of nested records from flat column data, following the
//! [Dremel] record shredding model.
//!
//! [`assemble_lists`] turns one leaf column's `(values, definition levels,
//! repetition levels)` triple into one nested list value per row.
//! [`assemble_nested`] then walks the schema tree to pair map keys with
//! values, strip list wrapper groups, and transpose struct fields into
//! per-row records.
//!
//! [Dremel]: https://research.google/pubs/pub36632/

use std::collections::HashMap;
use std::sync::Arc;

use crate::basic::Repetition;
use crate::data_type::Value;
use crate::errors::{ParquetError, Result};
use crate::schema::types::SchemaNode;

/// Descends `depth` levels into the most recently opened list at each level.
fn container_at(output: &mut Vec<Value>, depth: usize) -> Result<&mut Vec<Value>> {
    let mut current = output;
    for _ in 0..depth {
        match current.last_mut() {
            Some(Value::List(inner)) => current = inner,
            _ => return Err(general_err!("Malformed repetition levels: no open container")),
        }
    }
    Ok(current)
}

/// Appends the rows encoded by one page of a leaf column to `output`.
///
/// `rep_path` is the repetition of every schema element from the root to the
/// leaf (the root slot is ignored). A leading repetition level greater than
/// zero continues the last row of `output` rather than starting a new one,
/// which is how a row spans page boundaries.
///
/// When `def_levels` is `None` every one of the `count` values is present
/// at `max_def`.
pub fn assemble_lists(
    output: &mut Vec<Value>,
    def_levels: Option<&[u32]>,
    rep_levels: &[u32],
    values: Vec<Value>,
    rep_path: &[Repetition],
    max_def: u32,
    count: usize,
) -> Result<()> {
    let n = def_levels.map(|d| d.len()).unwrap_or(count);
    let leaf_parent = rep_path.len().saturating_sub(2);
    let mut values = values.into_iter();

    // schema depth, container depth and repetition depth of the cursor
    let mut depth = 0usize;
    let mut def = 0u32;
    let mut rep = 0u32;

    if rep_levels.first().is_some_and(|r| *r > 0) {
        // continue the previous row: descend into the open containers until
        // the leading repetition level is reached
        while (depth < leaf_parent || rep_path.get(depth + 1) == Some(&Repetition::REPEATED))
            && (rep_path[depth + 1] != Repetition::REPEATED || rep < rep_levels[0])
        {
            depth += 1;
            if rep_path[depth] != Repetition::REQUIRED {
                def += 1;
            }
            if rep_path[depth] == Repetition::REPEATED {
                rep += 1;
            }
        }
    }

    for i in 0..n {
        let value_def = def_levels.map(|d| d[i]).unwrap_or(max_def);
        let value_rep = rep_levels.get(i).copied().unwrap_or(0);

        // pop back out to the container where this repetition level restarts
        while depth > 0 && (rep_path[depth] != Repetition::REPEATED || rep > value_rep) {
            if rep_path[depth] != Repetition::REQUIRED {
                def -= 1;
            }
            if rep_path[depth] == Repetition::REPEATED {
                rep -= 1;
            }
            depth -= 1;
        }

        // descend to the definition level, opening a list per non-REQUIRED
        // element on the way
        while (depth < leaf_parent || rep_path.get(depth + 1) == Some(&Repetition::REPEATED))
            && (def < value_def || rep_path.get(depth + 1) == Some(&Repetition::REQUIRED))
        {
            depth += 1;
            if rep_path[depth] != Repetition::REQUIRED {
                container_at(output, def as usize)?.push(Value::List(Vec::new()));
                def += 1;
            }
            if rep_path[depth] == Repetition::REPEATED {
                rep += 1;
            }
        }

        let container = container_at(output, def as usize)?;
        if value_def == max_def {
            container.push(values.next().ok_or_else(|| {
                general_err!("Page has fewer values than defined definition levels")
            })?);
        } else if depth == leaf_parent {
            container.push(Value::Null);
        } else {
            container.push(Value::List(Vec::new()));
        }
    }

    if n == 0 {
        output.push(Value::List(Vec::new()));
    }
    Ok(())
}

/// Strips one wrapper layer at `depth`, replacing each singleton list with
/// its element. Empty wrappers (null slots) become null.
fn flatten_at_depth(values: &mut [Value], depth: usize) {
    for value in values.iter_mut() {
        if depth > 0 {
            if let Value::List(inner) = value {
                flatten_at_depth(inner, depth - 1);
            }
        } else {
            let taken = std::mem::replace(value, Value::Null);
            *value = match taken {
                Value::List(mut items) if !items.is_empty() => items.swap_remove(0),
                Value::List(_) => Value::Null,
                other => other,
            };
        }
    }
}

fn map_key_name(key: Value) -> Arc<str> {
    match key {
        Value::Text(name) => name,
        other => Arc::from(other.to_string().as_str()),
    }
}

/// Pairs parallel key and value arrays into per-row map records at `depth`.
fn assemble_maps(keys: Vec<Value>, values: Vec<Value>, depth: usize) -> Vec<Value> {
    keys.into_iter()
        .zip(values)
        .map(|(key, value)| {
            if depth > 0 {
                match (key, value) {
                    (Value::List(keys), Value::List(values)) => {
                        Value::List(assemble_maps(keys, values, depth - 1))
                    }
                    _ => Value::Null,
                }
            } else {
                match (key, value) {
                    (Value::List(keys), Value::List(values)) => Value::Record(
                        keys.into_iter()
                            .zip(values)
                            .map(|(k, v)| (map_key_name(k), v))
                            .collect(),
                    ),
                    _ => Value::Null,
                }
            }
        })
        .collect()
}

/// Transposes per-field arrays into one record per row, recursing through
/// `depth` wrapper layers.
fn invert_struct(fields: Vec<(Arc<str>, Value)>, depth: usize) -> Result<Value> {
    let length = match fields.first() {
        Some((_, Value::List(items))) => items.len(),
        _ => return Err(schema_err!("Struct field data is not an array")),
    };
    let mut columns: Vec<(Arc<str>, std::vec::IntoIter<Value>)> = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            Value::List(items) if items.len() == length => {
                columns.push((name, items.into_iter()))
            }
            _ => return Err(schema_err!("Mismatched struct field lengths")),
        }
    }

    let mut rows = Vec::with_capacity(length);
    for _ in 0..length {
        let row: Vec<(Arc<str>, Value)> = columns
            .iter_mut()
            .map(|(name, items)| (name.clone(), items.next().unwrap_or(Value::Null)))
            .collect();
        if depth > 0 {
            rows.push(invert_struct(row, depth - 1)?);
        } else {
            rows.push(Value::Record(row));
        }
    }
    Ok(Value::List(rows))
}

/// Assembles the leaf columns under `node` into a single nested column.
///
/// `subcolumn_data` maps dotted leaf paths to their [`assemble_lists`]
/// output; on return the leaf entries under `node` are replaced by one entry
/// at the node's own path.
pub fn assemble_nested(
    subcolumn_data: &mut HashMap<String, Vec<Value>>,
    node: &SchemaNode,
    depth: usize,
) -> Result<()> {
    let path = node.path.join(".");
    let optional = node.element.repetition == Some(Repetition::OPTIONAL);
    let next_depth = if optional { depth + 1 } else { depth };

    if node.is_list_like() {
        let mut element = &node.children[0];
        let mut element_depth = next_depth;
        if element.children.len() == 1 {
            element = &element.children[0];
            element_depth += 1;
        }
        assemble_nested(subcolumn_data, element, element_depth)?;

        let element_path = element.path.join(".");
        let mut values = subcolumn_data
            .remove(&element_path)
            .ok_or_else(|| schema_err!("List column {} is missing its values", path))?;
        if optional {
            flatten_at_depth(&mut values, depth);
        }
        subcolumn_data.insert(path, values);
        return Ok(());
    }

    if node.is_map_like() {
        let repeated = &node.children[0];
        assemble_nested(subcolumn_data, &repeated.children[0], next_depth + 1)?;
        assemble_nested(subcolumn_data, &repeated.children[1], next_depth + 1)?;

        let keys = subcolumn_data
            .remove(&repeated.children[0].path.join("."))
            .ok_or_else(|| schema_err!("Map column {} is missing its keys", path))?;
        let values = subcolumn_data
            .remove(&repeated.children[1].path.join("."))
            .ok_or_else(|| schema_err!("Map column {} is missing its values", path))?;
        if keys.len() != values.len() {
            return Err(schema_err!(
                "Map column {} has {} keys but {} values",
                path,
                keys.len(),
                values.len()
            ));
        }
        let mut out = assemble_maps(keys, values, next_depth);
        if optional {
            flatten_at_depth(&mut out, depth);
        }
        subcolumn_data.insert(path, out);
        return Ok(());
    }

    if !node.children.is_empty() {
        // plain struct: assemble children then transpose field arrays into
        // per-row records
        let invert_depth = match node.element.repetition {
            Some(Repetition::REQUIRED) | None => depth,
            _ => depth + 1,
        };
        let mut fields = Vec::with_capacity(node.children.len());
        for child in &node.children {
            assemble_nested(subcolumn_data, child, invert_depth)?;
            let child_data = subcolumn_data
                .remove(&child.path.join("."))
                .ok_or_else(|| schema_err!("Struct column {} is missing child data", path))?;
            fields.push((Arc::from(child.element.name.as_str()), Value::List(child_data)));
        }
        let inverted = invert_struct(fields, invert_depth)?;
        let mut out = match inverted {
            Value::List(rows) => rows,
            other => vec![other],
        };
        if optional {
            flatten_at_depth(&mut out, depth);
        }
        subcolumn_data.insert(path, out);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Type;
    use crate::schema::types::{SchemaElement, SchemaTree};

    const R: Repetition = Repetition::REQUIRED;
    const O: Repetition = Repetition::OPTIONAL;
    const P: Repetition = Repetition::REPEATED;

    fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|v| Value::Int(*v)).collect()
    }

    #[test]
    fn test_flat_optional_nulls() {
        // path: root, leaf OPTIONAL
        let mut out = Vec::new();
        assemble_lists(
            &mut out,
            Some(&[1, 0, 1]),
            &[],
            ints(&[10, 20]),
            &[R, O],
            1,
            3,
        )
        .unwrap();
        assert_eq!(out, vec![Value::Int(10), Value::Null, Value::Int(20)]);
    }

    #[test]
    fn test_required_list() {
        // root > list REPEATED leaf; rows [[1,2],[3]]
        let mut out = Vec::new();
        assemble_lists(
            &mut out,
            Some(&[1, 1, 1]),
            &[0, 1, 0],
            ints(&[1, 2, 3]),
            &[R, P],
            1,
            3,
        )
        .unwrap();
        assert_eq!(
            out,
            vec![list(ints(&[1, 2])), list(ints(&[3]))]
        );
    }

    #[test]
    fn test_three_level_list() {
        // root > tags OPTIONAL > list REPEATED > element OPTIONAL
        // rows: ["a","b"], null, [], ["c", null]
        let rep_path = [R, O, P, O];
        let text = |s: &str| Value::text(s);
        let mut out = Vec::new();
        assemble_lists(
            &mut out,
            Some(&[3, 3, 0, 1, 3, 2]),
            &[0, 1, 0, 0, 0, 1],
            vec![text("a"), text("b"), text("c")],
            &rep_path,
            3,
            6,
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                // each row carries the optional wrapper layer
                list(vec![list(vec![text("a"), text("b")])]),
                list(vec![]),
                list(vec![list(vec![])]),
                list(vec![list(vec![text("c"), Value::Null])]),
            ]
        );

        // flattening the optional wrapper yields the logical rows
        let mut values = out;
        flatten_at_depth(&mut values, 0);
        assert_eq!(
            values,
            vec![
                list(vec![text("a"), text("b")]),
                Value::Null,
                list(vec![]),
                list(vec![text("c"), Value::Null]),
            ]
        );
    }

    #[test]
    fn test_row_continues_across_pages() {
        let rep_path = [R, P];
        let mut out = Vec::new();
        assemble_lists(&mut out, Some(&[1, 1]), &[0, 1], ints(&[1, 2]), &rep_path, 1, 2).unwrap();
        // second page starts mid-row
        assemble_lists(&mut out, Some(&[1, 1]), &[1, 0], ints(&[3, 4]), &rep_path, 1, 2).unwrap();
        assert_eq!(out, vec![list(ints(&[1, 2, 3])), list(ints(&[4]))]);
    }

    #[test]
    fn test_empty_page_pushes_empty_row() {
        let mut out = Vec::new();
        assemble_lists(&mut out, Some(&[]), &[], Vec::new(), &[R, P], 1, 0).unwrap();
        assert_eq!(out, vec![list(vec![])]);
    }

    #[test]
    fn test_too_few_values_is_an_error() {
        let mut out = Vec::new();
        let err = assemble_lists(&mut out, Some(&[1, 1]), &[], ints(&[1]), &[R, O], 1, 2).unwrap_err();
        assert!(err.to_string().contains("fewer values"));
    }

    fn tree(elements: Vec<SchemaElement>) -> SchemaTree {
        let elements: Vec<_> = elements.into_iter().map(Arc::new).collect();
        SchemaTree::new(&elements).unwrap()
    }

    #[test]
    fn test_assemble_nested_list() {
        // optional list<string>
        let mut list_el = SchemaElement::group("tags", Some(O), 1);
        list_el.converted_type = Some(crate::basic::ConvertedType::LIST);
        let tree = tree(vec![
            SchemaElement::group("root", None, 1),
            list_el,
            SchemaElement::group("list", Some(P), 1),
            SchemaElement::primitive("element", O, Type::BYTE_ARRAY),
        ]);

        // leaf data as produced by assemble_lists for rows ["a","b"], null
        let mut data = HashMap::new();
        data.insert(
            "tags.list.element".to_string(),
            vec![
                list(vec![list(vec![Value::text("a"), Value::text("b")])]),
                list(vec![]),
            ],
        );
        assemble_nested(&mut data, tree.root().child("tags").unwrap(), 0).unwrap();
        assert_eq!(
            data.remove("tags").unwrap(),
            vec![
                list(vec![Value::text("a"), Value::text("b")]),
                Value::Null
            ]
        );
        assert!(data.is_empty());
    }

    #[test]
    fn test_assemble_nested_map() {
        let mut map_el = SchemaElement::group("attrs", Some(O), 1);
        map_el.converted_type = Some(crate::basic::ConvertedType::MAP);
        let tree = tree(vec![
            SchemaElement::group("root", None, 1),
            map_el,
            SchemaElement::group("key_value", Some(P), 2),
            SchemaElement::primitive("key", R, Type::BYTE_ARRAY),
            SchemaElement::primitive("value", O, Type::INT32),
        ]);

        let mut data = HashMap::new();
        // one row: {x: 1, y: null}; one row: null map
        data.insert(
            "attrs.key_value.key".to_string(),
            vec![
                list(vec![list(vec![Value::text("x"), Value::text("y")])]),
                list(vec![]),
            ],
        );
        data.insert(
            "attrs.key_value.value".to_string(),
            vec![
                list(vec![list(vec![Value::Int(1), Value::Null])]),
                list(vec![]),
            ],
        );
        assemble_nested(&mut data, tree.root().child("attrs").unwrap(), 0).unwrap();
        let rows = data.remove("attrs").unwrap();
        assert_eq!(
            rows,
            vec![
                Value::Record(vec![
                    (Arc::from("x"), Value::Int(1)),
                    (Arc::from("y"), Value::Null)
                ]),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_assemble_nested_struct() {
        // optional struct {a: int64, b: optional int64}
        let tree = tree(vec![
            SchemaElement::group("root", None, 1),
            SchemaElement::group("s", Some(O), 2),
            SchemaElement::primitive("a", R, Type::INT64),
            SchemaElement::primitive("b", O, Type::INT64),
        ]);

        let mut data = HashMap::new();
        // row 1: {a: 1, b: 2}; row 2: null struct
        data.insert(
            "s.a".to_string(),
            vec![list(ints(&[1])), list(vec![])],
        );
        data.insert(
            "s.b".to_string(),
            vec![list(ints(&[2])), list(vec![])],
        );
        assemble_nested(&mut data, tree.root().child("s").unwrap(), 0).unwrap();
        assert_eq!(
            data.remove("s").unwrap(),
            vec![
                Value::Record(vec![
                    (Arc::from("a"), Value::Int(1)),
                    (Arc::from("b"), Value::Int(2))
                ]),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_struct_length_mismatch() {
        let tree = tree(vec![
            SchemaElement::group("root", None, 1),
            SchemaElement::group("s", Some(R), 2),
            SchemaElement::primitive("a", R, Type::INT64),
            SchemaElement::primitive("b", R, Type::INT64),
        ]);
        let mut data = HashMap::new();
        data.insert("s.a".to_string(), ints(&[1, 2]));
        data.insert("s.b".to_string(), ints(&[3]));
        let err = assemble_nested(&mut data, tree.root().child("s").unwrap(), 0).unwrap_err();
        assert!(matches!(err, ParquetError::Schema(_)));
    }

    #[test]
    fn test_dremel_round_trip() {
        // the canonical nested document: repeated groups of repeated leaves
        // root > records OPTIONAL list > list REPEATED > element OPTIONAL int
        // built from levels, then flattened, must equal the source rows
        let rep_path = [R, O, P, O];
        let rows = [
            Some(vec![Some(1i64), None, Some(3)]),
            None,
            Some(vec![]),
            Some(vec![Some(4)]),
        ];

        // shred by hand
        let mut defs = Vec::new();
        let mut reps = Vec::new();
        let mut vals = Vec::new();
        for row in &rows {
            match row {
                None => {
                    defs.push(0);
                    reps.push(0);
                }
                Some(items) if items.is_empty() => {
                    defs.push(1);
                    reps.push(0);
                }
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        reps.push(if i == 0 { 0 } else { 1 });
                        match item {
                            None => defs.push(2),
                            Some(v) => {
                                defs.push(3);
                                vals.push(Value::Int(*v));
                            }
                        }
                    }
                }
            }
        }

        let mut out = Vec::new();
        assemble_lists(&mut out, Some(&defs), &reps, vals, &rep_path, 3, defs.len()).unwrap();
        flatten_at_depth(&mut out, 0);

        let expected: Vec<Value> = rows
            .iter()
            .map(|row| match row {
                None => Value::Null,
                Some(items) => list(
                    items
                        .iter()
                        .map(|i| i.map(Value::Int).unwrap_or(Value::Null))
                        .collect(),
                ),
            })
            .collect();
        assert_eq!(out, expected);
    }
}
