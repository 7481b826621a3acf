//! Instruction-form pages and rendering.
//!
//! A dispatch row that names an `iformfile` resolves to a [`FormPage`]:
//! a handle on one instruction-form XML file from the spec directory.
//! The page is parsed lazily on first use and cached, so building the
//! decode tree touches no files beyond the index document itself, and
//! decode traversal stays a read-only query (the cache is a
//! [`OnceLock`]).
//!
//! Rendering here is deliberately shallow: the decode tree's job ends
//! at classifying the word into a form. The page supplies the form's
//! identity and mnemonic; operand semantics are out of scope.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Error loading or parsing an instruction-form page.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("form page has no <instructionsection> id")]
    MissingId,
}

/// Parsed contents of a form page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FormData {
    /// Section id (e.g. "ADD_addsub_imm").
    id: String,
    /// Human-readable title (e.g. "ADD (immediate)").
    title: String,
    /// Mnemonics in document order, one per encoding's asm template.
    mnemonics: Vec<String>,
}

/// A lazily-loaded instruction-form page.
///
/// Constructed by the tree builder from the spec directory and the
/// row's `iformfile` attribute; loaded on first [`disassemble`] call.
/// A missing or malformed file is logged once and renders every word as
/// unresolvable from then on.
///
/// [`disassemble`]: FormPage::disassemble
#[derive(Debug, Serialize, Deserialize)]
pub struct FormPage {
    path: PathBuf,
    #[serde(skip)]
    loaded: OnceLock<Option<FormData>>,
}

impl FormPage {
    /// Create a handle on the form page at `path`. No I/O happens here.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            loaded: OnceLock::new(),
        }
    }

    /// The page's file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render a decode hit against this page.
    ///
    /// Returns `None` when the page cannot be loaded, which the
    /// traversal reports as undecodable.
    pub fn disassemble(&self, word: u32) -> Option<DecodedForm> {
        let data = self.data()?;
        Some(DecodedForm {
            name: data.id.clone(),
            title: data.title.clone(),
            mnemonic: data.mnemonics.first().cloned(),
            word,
        })
    }

    fn data(&self) -> Option<&FormData> {
        self.loaded
            .get_or_init(|| match load_form(&self.path) {
                Ok(data) => Some(data),
                Err(e) => {
                    log::warn!("failed to load form page {}: {}", self.path.display(), e);
                    None
                }
            })
            .as_ref()
    }
}

impl Clone for FormPage {
    fn clone(&self) -> Self {
        // clones start with a cold parse cache
        Self::new(self.path.clone())
    }
}

impl PartialEq for FormPage {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FormPage {}

/// One rendered instruction form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedForm {
    /// Form identifier from the page's section id.
    pub name: String,
    /// Human-readable form title.
    pub title: String,
    /// Assembly mnemonic, when the page declares one.
    pub mnemonic: Option<String>,
    /// The raw word that matched.
    pub word: u32,
}

impl std::fmt::Display for DecodedForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mnemonic {
            Some(m) => write!(f, "{} [{}]", m, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn load_form(path: &Path) -> Result<FormData, FormError> {
    let content = std::fs::read_to_string(path)?;
    parse_form(&content)
}

/// Parse an instruction-form XML document.
fn parse_form(xml: &str) -> Result<FormData, FormError> {
    let doc = roxmltree::Document::parse(xml)?;
    let section = doc
        .root()
        .descendants()
        .find(|n| n.has_tag_name("instructionsection"))
        .ok_or(FormError::MissingId)?;
    let id = section.attribute("id").ok_or(FormError::MissingId)?;
    let title = section.attribute("title").unwrap_or(id);

    // One asm template per encoding; the mnemonic is the leading
    // alphabetic run of the template's first text token.
    let mut mnemonics = Vec::new();
    for template in section
        .descendants()
        .filter(|n| n.has_tag_name("asmtemplate"))
    {
        let Some(text) = template
            .children()
            .find(|n| n.has_tag_name("text"))
            .and_then(|n| n.text())
        else {
            continue;
        };
        let mnemonic: String = text
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '.')
            .collect();
        if !mnemonic.is_empty() {
            mnemonics.push(mnemonic);
        }
    }

    Ok(FormData {
        id: id.to_string(),
        title: title.to_string(),
        mnemonics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_FORM: &str = r#"
<instructionsection id="ADD_addsub_imm" title="ADD (immediate)" type="instruction">
  <classes>
    <iclass name="ADD">
      <encoding name="ADD_32_addsub_imm">
        <asmtemplate><text>ADD </text><a>Wd</a><text>, </text><a>Wn</a></asmtemplate>
      </encoding>
      <encoding name="ADD_64_addsub_imm">
        <asmtemplate><text>ADD </text><a>Xd</a><text>, </text><a>Xn</a></asmtemplate>
      </encoding>
    </iclass>
  </classes>
</instructionsection>
"#;

    #[test]
    fn test_parse_form_page() {
        let data = parse_form(TEST_FORM).unwrap();
        assert_eq!(data.id, "ADD_addsub_imm");
        assert_eq!(data.title, "ADD (immediate)");
        assert_eq!(data.mnemonics, ["ADD", "ADD"]);
    }

    #[test]
    fn test_parse_form_requires_section_id() {
        let result = parse_form("<instructionsection title=\"x\"/>");
        assert!(matches!(result, Err(FormError::MissingId)));
    }

    #[test]
    fn test_disassemble_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_FORM.as_bytes()).unwrap();

        let page = FormPage::new(file.path().to_path_buf());
        let form = page.disassemble(0x1100_0000).unwrap();
        assert_eq!(form.name, "ADD_addsub_imm");
        assert_eq!(form.mnemonic.as_deref(), Some("ADD"));
        assert_eq!(form.word, 0x1100_0000);
    }

    #[test]
    fn test_missing_file_renders_as_none() {
        let page = FormPage::new(PathBuf::from("/nonexistent/add.xml"));
        assert_eq!(page.disassemble(0), None);
        // second call hits the cached failure
        assert_eq!(page.disassemble(0), None);
    }

    #[test]
    fn test_clone_compares_equal_by_path() {
        let page = FormPage::new(PathBuf::from("a/b.xml"));
        assert_eq!(page, page.clone());
        assert_ne!(page, FormPage::new(PathBuf::from("a/c.xml")));
    }
}
