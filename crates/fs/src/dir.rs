use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::OptionError;
use crate::options::{OptionFile, OptionKey, ResolvedOptions};

pub const OPTION_FILE_NAME: &str = ".skeema";

/// A schema-level directory: its own `.skeema` names the schema, and each
/// object lives in one .sql file.
#[derive(Debug, Clone)]
pub struct SchemaDir {
    pub path: PathBuf,
    pub schema_name: String,
    pub options: ResolvedOptions,
    /// Sorted .sql files directly inside the directory.
    pub sql_files: Vec<PathBuf>,
}

/// A host-level directory: connection options in its `.skeema`, schema
/// subdirectories beneath it.
#[derive(Debug, Clone)]
pub struct HostDir {
    pub path: PathBuf,
    pub options: ResolvedOptions,
    pub schema_dirs: Vec<SchemaDir>,
}

impl HostDir {
    /// Loads the directory tree rooted at `root`: the host-level option
    /// file, then one [`SchemaDir`] per subdirectory whose own option file
    /// sets `schema`. Child options inherit from the parent; command-line
    /// overrides are applied by the caller afterwards.
    pub fn discover(root: &Path, environment: &str) -> Result<Self, OptionError> {
        let mut options = ResolvedOptions::default();
        let host_option_path = root.join(OPTION_FILE_NAME);
        if host_option_path.is_file() {
            let file = OptionFile::read(&host_option_path)?;
            options.apply_file(&file, environment)?;
        }

        let mut schema_dirs = Vec::new();

        // the host dir itself may double as a schema dir
        if options.get(OptionKey::Schema).is_some() {
            schema_dirs.push(load_schema_dir(root, options.clone())?);
        }

        let mut subdirs: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect();
        subdirs.sort();

        for subdir in subdirs {
            let option_path = subdir.join(OPTION_FILE_NAME);
            if !option_path.is_file() {
                continue;
            }
            let mut child_options = options.clone();
            let file = OptionFile::read(&option_path)?;
            child_options.apply_file(&file, environment)?;
            if child_options.get(OptionKey::Schema).is_none() {
                continue;
            }
            schema_dirs.push(load_schema_dir(&subdir, child_options)?);
        }

        Ok(Self {
            path: root.to_path_buf(),
            options,
            schema_dirs,
        })
    }
}

fn load_schema_dir(path: &Path, options: ResolvedOptions) -> Result<SchemaDir, OptionError> {
    let schema_name = options
        .get(OptionKey::Schema)
        .expect("caller checked schema option")
        .to_string();

    let mut sql_files: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "sql")
        })
        .map(|entry| entry.into_path())
        .collect();
    sql_files.sort();

    Ok(SchemaDir {
        path: path.to_path_buf(),
        schema_name,
        options,
        sql_files,
    })
}
