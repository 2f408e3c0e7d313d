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

//! The schema tree built from the footer's flat element list, and the
//! repetition/definition level model derived from it.

use std::sync::Arc;

use crate::basic::{ConvertedType, LogicalType, Repetition, Type};
use crate::errors::{ParquetError, Result};

/// One element of the flat, depth-first schema list in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaElement {
    /// Field name.
    pub name: String,
    /// Physical type; absent for group nodes.
    pub physical_type: Option<Type>,
    /// Byte length for FIXED_LEN_BYTE_ARRAY columns.
    pub type_length: Option<i32>,
    /// Field repetition; absent only for the root.
    pub repetition: Option<Repetition>,
    /// Number of direct children for group nodes.
    pub num_children: Option<i32>,
    /// Deprecated converted type annotation.
    pub converted_type: Option<ConvertedType>,
    /// DECIMAL scale.
    pub scale: Option<i32>,
    /// DECIMAL precision.
    pub precision: Option<i32>,
    /// Original field id of a converted schema.
    pub field_id: Option<i32>,
    /// Logical type annotation, superseding `converted_type`.
    pub logical_type: Option<LogicalType>,
}

impl SchemaElement {
    /// A group element with `num_children` children and no physical type.
    pub fn group(name: impl Into<String>, repetition: Option<Repetition>, num_children: i32) -> Self {
        Self {
            name: name.into(),
            physical_type: None,
            type_length: None,
            repetition,
            num_children: Some(num_children),
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        }
    }

    /// A leaf element of the given physical type.
    pub fn primitive(name: impl Into<String>, repetition: Repetition, physical_type: Type) -> Self {
        Self {
            name: name.into(),
            physical_type: Some(physical_type),
            type_length: None,
            repetition: Some(repetition),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        }
    }
}

/// A node of the schema tree.
///
/// Built once from the flat element list and immutable afterwards.
#[derive(Clone, Debug)]
pub struct SchemaNode {
    /// The flat element this node wraps.
    pub element: Arc<SchemaElement>,
    /// Names from the root to this node; empty for the root itself.
    pub path: Vec<String>,
    /// Child nodes in schema order.
    pub children: Vec<SchemaNode>,
    /// Number of elements in this subtree, including this node.
    pub count: usize,
}

impl SchemaNode {
    /// The child named `name`, if any.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|c| c.element.name == name)
    }

    /// The node's repetition, treating the root as REQUIRED.
    pub fn repetition(&self) -> Repetition {
        self.element.repetition.unwrap_or(Repetition::REQUIRED)
    }

    /// Whether this node is annotated and shaped as a Parquet list: a LIST
    /// annotation over exactly one REPEATED group holding the element type.
    pub fn is_list_like(&self) -> bool {
        let annotated = self.element.converted_type == Some(ConvertedType::LIST)
            || self.element.logical_type == Some(LogicalType::List);
        if !annotated || self.children.len() != 1 {
            return false;
        }
        let repeated = &self.children[0];
        repeated.repetition() == Repetition::REPEATED
            && repeated.children.len() == 1
            && repeated.children[0].repetition() != Repetition::REPEATED
    }

    /// Whether this node is annotated and shaped as a Parquet map: a MAP
    /// annotation over one REPEATED group with non-repeated `key` and
    /// `value` children.
    pub fn is_map_like(&self) -> bool {
        let annotated = self.element.converted_type == Some(ConvertedType::MAP)
            || self.element.logical_type == Some(LogicalType::Map);
        if !annotated || self.children.len() != 1 {
            return false;
        }
        let repeated = &self.children[0];
        repeated.repetition() == Repetition::REPEATED
            && repeated.children.len() == 2
            && repeated.children[0].element.name == "key"
            && repeated.children[1].element.name == "value"
            && repeated.children[0].repetition() != Repetition::REPEATED
            && repeated.children[1].repetition() != Repetition::REPEATED
    }
}

/// The schema tree of a Parquet file.
#[derive(Clone, Debug)]
pub struct SchemaTree {
    root: SchemaNode,
}

impl SchemaTree {
    /// Builds the tree from the footer's flat element list.
    ///
    /// Fails if the list is empty, if a group's `num_children` walks past
    /// the end of the list, or if the root's subtree does not consume the
    /// whole list.
    pub fn new(schema: &[Arc<SchemaElement>]) -> Result<Self> {
        if schema.is_empty() {
            return Err(schema_err!("Schema has no elements"));
        }
        let root = build_node(schema, 0, Vec::new())?;
        if root.count != schema.len() {
            return Err(schema_err!(
                "Schema tree consumed {} of {} elements",
                root.count,
                schema.len()
            ));
        }
        Ok(Self { root })
    }

    /// The root node.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Resolves a column path into the ordered nodes from root to leaf.
    ///
    /// The returned slice starts with the root; `name_path` addresses its
    /// descendants.
    pub fn path_lookup(&self, name_path: &[String]) -> Result<Vec<&SchemaNode>> {
        let mut nodes = vec![&self.root];
        for name in name_path {
            let next = nodes
                .last()
                .unwrap()
                .child(name)
                .ok_or_else(|| schema_err!("Schema element not found: {}", name))?;
            nodes.push(next);
        }
        Ok(nodes)
    }
}

fn build_node(schema: &[Arc<SchemaElement>], index: usize, path: Vec<String>) -> Result<SchemaNode> {
    let element = schema
        .get(index)
        .ok_or_else(|| schema_err!("Schema group walks past the end of the element list"))?
        .clone();

    let num_children = element.num_children.unwrap_or(0).max(0) as usize;
    let mut children = Vec::with_capacity(num_children);
    let mut count = 1;
    for _ in 0..num_children {
        let child_index = index + count;
        let child_name = schema
            .get(child_index)
            .ok_or_else(|| schema_err!("Schema group walks past the end of the element list"))?
            .name
            .clone();
        let mut child_path = path.clone();
        child_path.push(child_name);
        let child = build_node(schema, child_index, child_path)?;
        count += child.count;
        children.push(child);
    }

    Ok(SchemaNode {
        element,
        path,
        children,
        count,
    })
}

/// Maximum repetition level of a path: the number of REPEATED elements
/// along it. The root does not contribute.
pub fn max_repetition_level(path: &[&SchemaNode]) -> i16 {
    path.iter()
        .skip(1)
        .filter(|node| node.repetition() == Repetition::REPEATED)
        .count() as i16
}

/// Maximum definition level of a path: the number of non-REQUIRED elements
/// below the root.
pub fn max_definition_level(path: &[&SchemaNode]) -> i16 {
    path.iter()
        .skip(1)
        .filter(|node| node.repetition() != Repetition::REQUIRED)
        .count() as i16
}

/// Whether the path addresses a flat column: a direct, non-repeated leaf
/// child of the root.
pub fn is_flat_column(path: &[&SchemaNode]) -> bool {
    match path {
        [_root, leaf] => leaf.repetition() != Repetition::REPEATED && leaf.children.is_empty(),
        _ => false,
    }
}
