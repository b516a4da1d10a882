//! Dotted access paths.
//!
//! `children.0.fills.header.1.attributes.id` hops through two child lists
//! and ends on a field. Only list items and `$container` may be hopped
//! through; everything else ends the path.

use crate::error::{ObserveError, ObserveResult};
use std::fmt;
use stencil_tree::ChildList;

/// Reserved accessor returning the owning container of a node
pub const CONTAINER_ACCESSOR: &str = "$container";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Container,
    /// Session metadata (`meta`, `meta.dirty`, ...); empty string for all
    Meta(String),
    List(ChildList),
    Fills,
    Item(ChildList, usize),
    Field(Vec<String>),
}

impl Step {
    pub(crate) fn is_hop(&self) -> bool {
        matches!(self, Step::Container | Step::Item(..))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Container => f.write_str(CONTAINER_ACCESSOR),
            Step::Meta(field) if field.is_empty() => f.write_str("meta"),
            Step::Meta(field) => write!(f, "meta.{}", field),
            Step::List(list) => write!(f, "{}", list),
            Step::Fills => f.write_str("fills"),
            Step::Item(list, index) => write!(f, "{}.{}", list, index),
            Step::Field(segments) => f.write_str(&segments.join(".")),
        }
    }
}

pub(crate) fn parse(path: &str) -> ObserveResult<Vec<Step>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ObserveError::InvalidPath(path.to_string()));
    }

    let mut steps = Vec::new();
    let mut i = 0;
    while i < segments.len() {
        let (list, next) = match segments[i] {
            CONTAINER_ACCESSOR => {
                steps.push(Step::Container);
                i += 1;
                continue;
            }
            "meta" => {
                steps.push(Step::Meta(segments[i + 1..].join(".")));
                break;
            }
            "children" => (ChildList::Children, i + 1),
            "template" => (ChildList::Template, i + 1),
            "fills" => match segments.get(i + 1) {
                Some(name) => (ChildList::Fill(name.to_string()), i + 2),
                None => {
                    steps.push(Step::Fills);
                    break;
                }
            },
            _ => {
                steps.push(Step::Field(
                    segments[i..].iter().map(|s| s.to_string()).collect(),
                ));
                break;
            }
        };

        match segments.get(next) {
            None => {
                steps.push(Step::List(list));
                break;
            }
            Some(raw) => {
                let index = raw
                    .parse::<usize>()
                    .map_err(|_| ObserveError::InvalidPath(path.to_string()))?;
                steps.push(Step::Item(list, index));
                i = next + 1;
            }
        }
    }

    Ok(steps)
}
