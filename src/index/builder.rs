//! Decode-tree construction from the encoding-index document.
//!
//! The builder walks the index's `<hierarchy>` top-down. Grouping
//! fragments (`<hierarchy>` and nested `<node>` elements) dispatch on
//! decode constraints to further fragments; leaf-table fragments
//! (`<iclass_sect>` elements) dispatch on instruction-table rows to
//! form pages. Both derive their bit layout from the fragment's own
//! `<regdiagram>` first.
//!
//! Structural problems in the document (missing elements, unparsable
//! attributes) abort the whole build: the index is assumed internally
//! consistent, and a partially built tree would misclassify words. The
//! one tolerated degradation is an `iclass` reference with no matching
//! `<iclass_sect>` anywhere in the document; the reference is kept as
//! a bare-name terminal.

use std::path::Path;

use roxmltree::{Document, Node};

use super::types::{BitLayout, DecodeNode, FieldSpec, Pattern, RowKey, Target};
use crate::disasm::FormPage;

/// Error type for build failures.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("document has no <hierarchy> element")]
    MissingHierarchy,
    #[error("missing <{child}> under <{parent}>")]
    MissingElement { parent: String, child: String },
    #[error("<{element}> is missing attribute {attribute:?}")]
    MissingAttribute { element: String, attribute: String },
    #[error("bad numeric attribute {attribute:?} on <{element}>: {value:?}")]
    BadNumber {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("<thead> has no field-name row")]
    MissingHeaderRow,
    #[error("table header names {expected} columns but a row has only {got}")]
    ColumnCountMismatch { expected: usize, got: usize },
    #[error("table row has neither iformfile nor encname")]
    MissingRowTarget,
    #[error("child node has neither groupname nor iclass")]
    UnroutableChild,
    #[error("duplicate iclass_sect id {0:?}")]
    DuplicateSect(String),
}

/// Build the root decode node from a parsed index document.
///
/// `spec_dir` is the directory form-page paths are resolved against;
/// it is threaded through explicitly rather than read from any global.
pub(crate) fn build_root(doc: &Document, spec_dir: &Path) -> Result<DecodeNode, BuildError> {
    let hierarchy = doc
        .root()
        .descendants()
        .find(|n| n.has_tag_name("hierarchy"))
        .ok_or(BuildError::MissingHierarchy)?;
    build_group(doc, hierarchy, spec_dir)
}

/// Build a node from a grouping fragment.
///
/// Each child `<node>` contributes one dispatch row keyed by its
/// `<decode>` constraints, targeting either a nested group or a leaf
/// table found by iclass id.
pub(crate) fn build_group(
    doc: &Document,
    fragment: Node<'_, '_>,
    spec_dir: &Path,
) -> Result<DecodeNode, BuildError> {
    let layout = bit_layout(fragment)?;
    let mut dispatch = Vec::new();

    for child in fragment.children().filter(|n| n.has_tag_name("node")) {
        let key = decode_constraints(child)?;

        let target = if child.attribute("groupname").is_some() {
            Target::Table(Box::new(build_group(doc, child, spec_dir)?))
        } else if let Some(iclass) = child.attribute("iclass") {
            match find_iclass_sect(doc, iclass)? {
                Some(sect) => Target::Table(Box::new(build_sect(sect, spec_dir)?)),
                None => {
                    // tolerated: an id with no table is preserved as data
                    log::warn!("no iclass_sect with id {:?}; keeping bare name", iclass);
                    Target::Name(iclass.to_string())
                }
            }
        } else {
            return Err(BuildError::UnroutableChild);
        };

        dispatch.push((key, target));
    }

    log::debug!("built group node with {} dispatch rows", dispatch.len());
    Ok(DecodeNode {
        layout,
        dispatch,
        direct: None,
    })
}

/// Build a node from a leaf-table fragment (`<iclass_sect>`).
///
/// A table body with exactly one row collapses to a direct target and
/// builds no dispatch at all (a real shape in the index, not an
/// error). Otherwise field names come from the second header row and
/// each body row becomes one dispatch entry.
pub(crate) fn build_sect(sect: Node<'_, '_>, spec_dir: &Path) -> Result<DecodeNode, BuildError> {
    let layout = bit_layout(sect)?;
    let table = child_element(sect, "instructiontable")?;
    let tbody = child_element(table, "tbody")?;
    let rows: Vec<Node> = tbody.children().filter(|n| n.has_tag_name("tr")).collect();

    if rows.len() == 1 {
        return Ok(DecodeNode {
            layout,
            dispatch: Vec::new(),
            direct: Some(row_target(rows[0], spec_dir)?),
        });
    }

    let thead = child_element(table, "thead")?;
    let header_rows: Vec<Node> = thead.children().filter(|n| n.has_tag_name("tr")).collect();
    // the first header row is a column-group banner; field names are
    // in the second
    let field_row = header_rows.get(1).ok_or(BuildError::MissingHeaderRow)?;
    let columns: Vec<&str> = field_row
        .children()
        .filter(|n| n.has_tag_name("th"))
        .map(|th| th.text().unwrap_or(""))
        .collect();

    let mut dispatch = Vec::with_capacity(rows.len());
    for row in rows {
        let cells: Vec<Node> = row.children().filter(|n| n.has_tag_name("td")).collect();
        if cells.len() < columns.len() {
            return Err(BuildError::ColumnCountMismatch {
                expected: columns.len(),
                got: cells.len(),
            });
        }
        let key: RowKey = columns
            .iter()
            .zip(&cells)
            .map(|(name, cell)| (*name, Pattern::parse(cell.text())))
            .collect();
        dispatch.push((key, row_target(row, spec_dir)?));
    }

    log::debug!(
        "built iclass_sect {:?} with {} dispatch rows",
        sect.attribute("id").unwrap_or("?"),
        dispatch.len()
    );
    Ok(DecodeNode {
        layout,
        dispatch,
        direct: None,
    })
}

/// Derive a fragment's bit layout from its `<regdiagram>`.
///
/// Unnamed boxes are fixed opcode bits, not fields, and are skipped.
/// Width defaults to 1: the index omits the attribute for 1-wide
/// fields.
fn bit_layout(fragment: Node<'_, '_>) -> Result<BitLayout, BuildError> {
    let regdiagram = child_element(fragment, "regdiagram")?;
    let mut layout = BitLayout::new();

    for bx in regdiagram.children().filter(|n| n.has_tag_name("box")) {
        let Some(name) = bx.attribute("name") else {
            continue;
        };
        let hibit = numeric_attr(bx, "hibit")?;
        let width = match bx.attribute("width") {
            Some(_) => numeric_attr(bx, "width")?,
            None => 1,
        };
        layout.insert(name, FieldSpec { hibit, width });
    }

    Ok(layout)
}

/// Read a child `<node>`'s `<decode>` constraints into a row key.
fn decode_constraints(child: Node<'_, '_>) -> Result<RowKey, BuildError> {
    let decode = child_element(child, "decode")?;
    let mut key = RowKey::new();
    for bx in decode.children().filter(|n| n.has_tag_name("box")) {
        let name = require_attr(bx, "name")?;
        let value = child_element(bx, "c")?;
        key.push(name, Pattern::parse(value.text()));
    }
    Ok(key)
}

/// Resolve a table row to its target.
fn row_target(row: Node<'_, '_>, spec_dir: &Path) -> Result<Target, BuildError> {
    if let Some(file) = row.attribute("iformfile") {
        Ok(Target::Form(FormPage::new(spec_dir.join(file))))
    } else if let Some(name) = row.attribute("encname") {
        Ok(Target::Name(name.to_string()))
    } else {
        Err(BuildError::MissingRowTarget)
    }
}

/// Find the unique `<iclass_sect>` with the given id anywhere in the
/// document.
///
/// The index is expected to declare each id at most once; seeing it
/// twice means the document is inconsistent, and picking either table
/// silently would be a guess, so the build fails instead.
fn find_iclass_sect<'a, 'input>(
    doc: &'a Document<'input>,
    id: &str,
) -> Result<Option<Node<'a, 'input>>, BuildError> {
    let mut found = None;
    for sect in doc
        .root()
        .descendants()
        .filter(|n| n.has_tag_name("iclass_sect"))
    {
        if sect.attribute("id") == Some(id) {
            if found.is_some() {
                return Err(BuildError::DuplicateSect(id.to_string()));
            }
            found = Some(sect);
        }
    }
    Ok(found)
}

fn child_element<'a, 'input>(
    parent: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, BuildError> {
    parent
        .children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| BuildError::MissingElement {
            parent: parent.tag_name().name().to_string(),
            child: name.to_string(),
        })
}

fn require_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, BuildError> {
    node.attribute(name)
        .ok_or_else(|| BuildError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute: name.to_string(),
        })
}

fn numeric_attr(node: Node<'_, '_>, name: &str) -> Result<u32, BuildError> {
    let value = require_attr(node, name)?;
    value.parse().map_err(|_| BuildError::BadNumber {
        element: node.tag_name().name().to_string(),
        attribute: name.to_string(),
        value: value.to_string(),
    })
}
