//! Template store: resolve a template id to a file and list what exists.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use log::{debug, info};

use officekit_io_xlsx::{ExportError, write_blank_template, write_quote_template};

use crate::conf::C_TEMPLATE_LOCK_PREFIX;
use crate::spec::{EnumDocumentKind, SpecTemplateInfo};

/// Spreadsheet templates created by `templates init`, as `(id, is quote)`.
const TUP_TEMPLATES_INIT: [(&str, bool); 5] = [
    ("default", false),
    ("budget", false),
    ("simple", false),
    ("cover", false),
    ("quote", true),
];

/// Template files laid out as `<root>/<kind>/<id><ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    path_dir_root: PathBuf,
}

impl TemplateStore {
    pub fn new(path_dir_root: impl Into<PathBuf>) -> Self {
        Self {
            path_dir_root: path_dir_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.path_dir_root
    }

    /// Path of template `id` for `kind`; the file must exist.
    pub fn get_path(&self, id: &str, kind: EnumDocumentKind) -> Result<PathBuf, ExportError> {
        validate_template_id(id)?;
        let path = self
            .path_dir_root
            .join(kind.as_str())
            .join(format!("{id}{}", kind.extension()));
        if !path.is_file() {
            return Err(ExportError::TemplateNotFound(path));
        }
        debug!("resolved template {id:?} ({kind}) to {}", path.display());
        Ok(path)
    }

    /// Every template under the root, sorted by kind then file name.
    ///
    /// Missing kind directories are skipped. `pattern` is a glob matched
    /// against the file name.
    pub fn list_all(&self, pattern: Option<&str>) -> Result<Vec<SpecTemplateInfo>, ExportError> {
        let matcher = pattern.map(create_name_matcher).transpose()?;
        let mut l_infos = Vec::new();

        for kind in EnumDocumentKind::ALL {
            let path_dir = self.path_dir_root.join(kind.as_str());
            let Ok(iter_entries) = fs::read_dir(&path_dir) else {
                debug!("template directory {} not readable", path_dir.display());
                continue;
            };
            let mut l_kind = Vec::new();
            for entry in iter_entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(c_name) = path.file_name().and_then(|s| s.to_str()) else {
                    continue;
                };
                if c_name.starts_with(C_TEMPLATE_LOCK_PREFIX) {
                    continue;
                }
                if let Some(m) = &matcher
                    && !m.is_match(c_name)
                {
                    continue;
                }
                let c_id = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(c_name)
                    .to_string();
                l_kind.push(SpecTemplateInfo {
                    id: c_id,
                    name: c_name.to_string(),
                    description: format!("{kind} template"),
                    kind,
                    path: path.clone(),
                });
            }
            l_kind.sort_by(|a, b| a.name.cmp(&b.name));
            l_infos.extend(l_kind);
        }
        Ok(l_infos)
    }
}

/// Write the standard spreadsheet templates under `<root>/excel/`.
///
/// Existing files are overwritten. Returns the written paths.
pub fn init_templates(path_dir_root: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let path_dir_excel = path_dir_root.join(EnumDocumentKind::Excel.as_str());
    let mut l_paths = Vec::with_capacity(TUP_TEMPLATES_INIT.len());
    for (c_id, if_quote) in TUP_TEMPLATES_INIT {
        let path = path_dir_excel.join(format!("{c_id}{}", EnumDocumentKind::Excel.extension()));
        if if_quote {
            write_quote_template(&path)?;
        } else {
            write_blank_template(&path)?;
        }
        l_paths.push(path);
    }
    info!(
        "initialized {} templates under {}",
        l_paths.len(),
        path_dir_excel.display()
    );
    Ok(l_paths)
}

fn validate_template_id(id: &str) -> Result<(), ExportError> {
    let if_bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.contains('\0');
    if if_bad {
        return Err(ExportError::Validation(format!("invalid template id: {id:?}")));
    }
    Ok(())
}

fn create_name_matcher(pattern: &str) -> Result<GlobMatcher, ExportError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| ExportError::Validation(format!("invalid template pattern: {e}")))
}
