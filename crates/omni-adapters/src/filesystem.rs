//! Filesystem actions -- create, copy, move, rename and delete inside a
//! [`Workspace`].
//!
//! Each action is a small [`Executable`] holding a shared workspace.  Paths
//! come from the step params, are resolved against the workspace root and
//! its location aliases, and may never escape the root.
//!
//! | Action                  | Required params                          |
//! |-------------------------|------------------------------------------|
//! | `create_folder`         | `name`                                   |
//! | `create_file`           | `name`                                   |
//! | `create_bulk_folders`   | `naming_pattern` or `count`              |
//! | `create_nested_folders` | `naming_pattern`, parents                |
//! | `copy` / `move`         | `source`, `destination`                  |
//! | `rename`                | `source`, `new_name`                     |
//! | `delete`                | `path`                                   |
//!
//! All actions also accept an optional `location` alias.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use omni_intent::NamingPattern;
use omni_kernel::action::{optional_str, optional_u64, require_str};
use omni_kernel::{ActionOutput, ActionRegistry, Executable, Params, Result};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{AdapterError, Result as AdapterResult};
use crate::paths::{Workspace, location_alias};

/// Category every filesystem action is registered under.
pub const CATEGORY: &str = "filesystem";

/// Upper bound on folders created by one bulk or nested call.
pub const MAX_BULK_FOLDERS: u64 = 10_000;

/// Register every filesystem action in `registry`, rooted at `workspace`.
pub fn register_filesystem(registry: &ActionRegistry, workspace: Arc<Workspace>) {
    let ws = || Arc::clone(&workspace);
    registry.register("create_folder", CATEGORY, CreateFolder(ws()));
    registry.register("create_file", CATEGORY, CreateFile(ws()));
    registry.register("create_bulk_folders", CATEGORY, CreateBulkFolders(ws()));
    registry.register("create_nested_folders", CATEGORY, CreateNestedFolders(ws()));
    registry.register("copy", CATEGORY, CopyItem(ws()));
    registry.register("move", CATEGORY, MoveItem(ws()));
    registry.register("rename", CATEGORY, RenameItem(ws()));
    registry.register("delete", CATEGORY, DeleteItem(ws()));
    info!(root = %workspace.root().display(), "filesystem actions registered");
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// ---------------------------------------------------------------------------
// Single folder / file
// ---------------------------------------------------------------------------

/// `create_folder { name, location?, parent? }`
pub struct CreateFolder(pub Arc<Workspace>);

impl Executable for CreateFolder {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "create_folder";
        let name = require_str(ACTION, params, "name")?;
        let location = optional_str(params, "location");
        let relative = match optional_str(params, "parent") {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        };
        let path = self.0.resolve_in(location, &relative, ACTION)?;

        let existed = path.is_dir();
        fs::create_dir_all(&path).map_err(AdapterError::from)?;
        debug!(path = %path.display(), existed, "folder created");

        let shown = display(&path);
        Ok(ActionOutput::new(json!({ "path": shown, "existed": existed }))
            .with_resources(if existed { Vec::new() } else { vec![shown] }))
    }

    fn description(&self) -> &str {
        "Create a folder"
    }
}

/// `create_file { name, content?, location? }`
pub struct CreateFile(pub Arc<Workspace>);

impl Executable for CreateFile {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "create_file";
        let name = require_str(ACTION, params, "name")?;
        let content = optional_str(params, "content").unwrap_or("");
        let path = self
            .0
            .resolve_in(optional_str(params, "location"), name, ACTION)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(AdapterError::from)?;
        }
        fs::write(&path, content).map_err(AdapterError::from)?;
        debug!(path = %path.display(), bytes = content.len(), "file written");

        let shown = display(&path);
        Ok(
            ActionOutput::new(json!({ "path": shown, "size_bytes": content.len() }))
                .with_resources(vec![shown]),
        )
    }

    fn description(&self) -> &str {
        "Create a file with optional content"
    }
}

// ---------------------------------------------------------------------------
// Bulk and nested folders
// ---------------------------------------------------------------------------

/// Names created and names that failed during a bulk run.
#[derive(Debug, Default)]
struct BulkReport {
    created: Vec<String>,
    failed: Vec<Value>,
}

impl BulkReport {
    fn create(&mut self, path: PathBuf, name: &str) {
        match fs::create_dir_all(&path) {
            Ok(()) => self.created.push(display(&path)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "folder creation failed");
                self.failed.push(json!({ "name": name, "error": e.to_string() }));
            }
        }
    }

    fn finish(self, action: &str, base: &Path, requested: u64) -> Result<ActionOutput> {
        if self.created.is_empty() && !self.failed.is_empty() {
            return Err(AdapterError::ExecutionFailed {
                action: action.to_string(),
                reason: format!("none of {} folders could be created", self.failed.len()),
            }
            .into());
        }
        info!(
            action,
            base = %base.display(),
            created = self.created.len(),
            failed = self.failed.len(),
            "bulk folder creation finished"
        );
        let value = json!({
            "base": display(base),
            "total_requested": requested,
            "created_count": self.created.len(),
            "failed_count": self.failed.len(),
            "created": &self.created,
            "failed": self.failed,
        });
        Ok(ActionOutput::new(value).with_resources(self.created))
    }
}

fn naming_pattern(action: &str, value: &Value) -> AdapterResult<NamingPattern> {
    NamingPattern::from_value(value).map_err(|e| AdapterError::InvalidParams {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

fn check_size(action: &str, requested: u64) -> AdapterResult<()> {
    if requested > MAX_BULK_FOLDERS {
        return Err(AdapterError::InvalidParams {
            action: action.to_string(),
            reason: format!("{requested} folders requested, limit is {MAX_BULK_FOLDERS}"),
        });
    }
    Ok(())
}

/// Base directory for bulk work: the location, then the optional parent,
/// which must already exist.
fn bulk_base(
    ws: &Workspace,
    action: &str,
    location: Option<&str>,
    parent: Option<&str>,
) -> AdapterResult<PathBuf> {
    let Some(parent) = parent else {
        return ws.location_dir(location, action);
    };
    let base = ws.resolve_in(location, parent, action)?;
    if !base.is_dir() {
        return Err(AdapterError::NotFound {
            action: action.to_string(),
            path: display(&base),
        });
    }
    Ok(base)
}

/// `create_bulk_folders { naming_pattern | count, parent_folder?, location? }`
pub struct CreateBulkFolders(pub Arc<Workspace>);

impl Executable for CreateBulkFolders {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "create_bulk_folders";
        let pattern = match params.get("naming_pattern").filter(|v| !v.is_null()) {
            Some(value) => naming_pattern(ACTION, value)?,
            None => {
                let count = optional_u64(params, "count").ok_or_else(|| {
                    AdapterError::InvalidParams {
                        action: ACTION.into(),
                        reason: "needs `naming_pattern` or `count`".into(),
                    }
                })?;
                NamingPattern::alphanumeric("folder", 1, count)
            }
        };
        check_size(ACTION, pattern.len())?;

        let base = bulk_base(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            optional_str(params, "parent_folder"),
        )?;
        debug!(base = %base.display(), count = pattern.len(), "creating bulk folders");

        let mut report = BulkReport::default();
        for name in pattern.expand() {
            report.create(base.join(&name), &name);
        }
        report.finish(ACTION, &base, pattern.len())
    }

    fn description(&self) -> &str {
        "Create a numbered series of folders"
    }
}

/// `create_nested_folders { naming_pattern, parent_pattern | parent_prefix +
/// parent_folders_count, container?, location? }`
pub struct CreateNestedFolders(pub Arc<Workspace>);

impl CreateNestedFolders {
    fn parents(params: &Params) -> AdapterResult<NamingPattern> {
        const ACTION: &str = "create_nested_folders";
        if let Some(value) = params.get("parent_pattern").filter(|v| !v.is_null()) {
            return naming_pattern(ACTION, value);
        }
        let count = optional_u64(params, "parent_folders_count").ok_or_else(|| {
            AdapterError::InvalidParams {
                action: ACTION.into(),
                reason: "needs `parent_pattern` or `parent_folders_count`".into(),
            }
        })?;
        let prefix = optional_str(params, "parent_prefix").unwrap_or("folder");
        Ok(NamingPattern::alphanumeric(prefix, 1, count))
    }
}

impl Executable for CreateNestedFolders {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "create_nested_folders";
        let children = match params.get("naming_pattern").filter(|v| !v.is_null()) {
            Some(value) => naming_pattern(ACTION, value)?,
            None => {
                let count = optional_u64(params, "count").unwrap_or(0);
                NamingPattern::alphanumeric("subfolder", 1, count)
            }
        };
        let parents = Self::parents(params)?;
        let requested = parents.len().saturating_mul(children.len());
        check_size(ACTION, requested)?;

        let base = bulk_base(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            optional_str(params, "container"),
        )?;
        debug!(
            base = %base.display(),
            parents = parents.len(),
            children = children.len(),
            "creating nested folders"
        );

        let child_names = children.expand();
        let mut report = BulkReport::default();
        for parent in parents.expand() {
            for child in &child_names {
                let name = format!("{parent}/{child}");
                report.create(base.join(&parent).join(child), &name);
            }
        }
        report.finish(ACTION, &base, requested)
    }

    fn description(&self) -> &str {
        "Create the same series of subfolders inside each of a series of folders"
    }
}

// ---------------------------------------------------------------------------
// Copy / move / rename / delete
// ---------------------------------------------------------------------------

fn existing(
    ws: &Workspace,
    action: &str,
    location: Option<&str>,
    raw: &str,
) -> AdapterResult<PathBuf> {
    let path = ws.resolve_in(location, raw, action)?;
    if !path.exists() {
        return Err(AdapterError::NotFound {
            action: action.to_string(),
            path: raw.to_string(),
        });
    }
    Ok(path)
}

/// Destination path for a copy or move.  A bare location alias or an
/// existing directory means "into that directory, same file name".
fn destination(
    ws: &Workspace,
    action: &str,
    source: &Path,
    raw: &str,
) -> AdapterResult<PathBuf> {
    let target = match location_alias(raw) {
        Some(_) => ws.location_dir(Some(raw), action)?,
        None => ws.resolve(raw, action)?,
    };
    if target.is_dir()
        && let Some(file_name) = source.file_name()
    {
        return Ok(target.join(file_name));
    }
    Ok(target)
}

fn copy_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    if from.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to).map(|_| ())
    }
}

/// `copy { source, destination, location? }`
pub struct CopyItem(pub Arc<Workspace>);

impl Executable for CopyItem {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "copy";
        let source = existing(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            require_str(ACTION, params, "source")?,
        )?;
        let target = destination(&self.0, ACTION, &source, require_str(ACTION, params, "destination")?)?;
        if target.starts_with(&source) && source.is_dir() {
            return Err(AdapterError::InvalidParams {
                action: ACTION.into(),
                reason: "cannot copy a folder into itself".into(),
            }
            .into());
        }

        copy_recursive(&source, &target).map_err(AdapterError::from)?;
        debug!(from = %source.display(), to = %target.display(), "copied");

        let shown = display(&target);
        Ok(ActionOutput::new(json!({ "source": display(&source), "destination": shown }))
            .with_resources(vec![shown]))
    }

    fn description(&self) -> &str {
        "Copy a file or folder"
    }
}

/// `move { source, destination, location? }`
pub struct MoveItem(pub Arc<Workspace>);

impl Executable for MoveItem {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "move";
        let source = existing(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            require_str(ACTION, params, "source")?,
        )?;
        let target = destination(&self.0, ACTION, &source, require_str(ACTION, params, "destination")?)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(AdapterError::from)?;
        }

        fs::rename(&source, &target).map_err(AdapterError::from)?;
        debug!(from = %source.display(), to = %target.display(), "moved");

        let shown = display(&target);
        Ok(ActionOutput::new(json!({ "source": display(&source), "destination": shown }))
            .with_resources(vec![shown]))
    }

    fn description(&self) -> &str {
        "Move a file or folder"
    }
}

/// `rename { source, new_name, location? }`
pub struct RenameItem(pub Arc<Workspace>);

impl Executable for RenameItem {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "rename";
        let new_name = require_str(ACTION, params, "new_name")?.trim();
        if new_name.is_empty() || new_name.contains(['/', '\\']) || new_name == ".." {
            return Err(AdapterError::InvalidParams {
                action: ACTION.into(),
                reason: format!("`{new_name}` is not a plain file name"),
            }
            .into());
        }
        let source = existing(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            require_str(ACTION, params, "source")?,
        )?;
        let target = source.with_file_name(new_name);
        if target.exists() {
            return Err(AdapterError::InvalidParams {
                action: ACTION.into(),
                reason: format!("`{new_name}` already exists"),
            }
            .into());
        }

        fs::rename(&source, &target).map_err(AdapterError::from)?;
        debug!(from = %source.display(), to = %target.display(), "renamed");

        let shown = display(&target);
        Ok(ActionOutput::new(json!({ "source": display(&source), "path": shown }))
            .with_resources(vec![shown]))
    }

    fn description(&self) -> &str {
        "Rename a file or folder in place"
    }
}

/// `delete { path, location? }`
pub struct DeleteItem(pub Arc<Workspace>);

impl Executable for DeleteItem {
    fn run(&self, params: &Params) -> Result<ActionOutput> {
        const ACTION: &str = "delete";
        let path = existing(
            &self.0,
            ACTION,
            optional_str(params, "location"),
            require_str(ACTION, params, "path")?,
        )?;
        if path == self.0.root() {
            return Err(AdapterError::InvalidParams {
                action: ACTION.into(),
                reason: "refusing to delete the workspace root".into(),
            }
            .into());
        }

        let was_dir = path.is_dir();
        if was_dir {
            fs::remove_dir_all(&path).map_err(AdapterError::from)?;
        } else {
            fs::remove_file(&path).map_err(AdapterError::from)?;
        }
        info!(path = %path.display(), was_dir, "deleted");

        Ok(ActionOutput::new(json!({ "path": display(&path), "was_dir": was_dir })))
    }

    fn description(&self) -> &str {
        "Delete a file or folder"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use omni_kernel::KernelError;

    fn workspace() -> (tempfile::TempDir, Arc<Workspace>) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(Workspace::new(dir.path()));
        (dir, ws)
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn create_folder_under_location() {
        let (_dir, ws) = workspace();
        let out = CreateFolder(ws.clone())
            .run(&params(json!({"name": "reports", "location": "desktop"})))
            .unwrap();
        assert!(ws.root().join("Desktop/reports").is_dir());
        assert_eq!(out.created_resources.len(), 1);
        assert_eq!(out.value["existed"], false);
    }

    #[test]
    fn create_folder_twice_reports_existing() {
        let (_dir, ws) = workspace();
        let p = params(json!({"name": "a"}));
        CreateFolder(ws.clone()).run(&p).unwrap();
        let out = CreateFolder(ws).run(&p).unwrap();
        assert_eq!(out.value["existed"], true);
        assert!(out.created_resources.is_empty());
    }

    #[test]
    fn create_file_with_content() {
        let (_dir, ws) = workspace();
        CreateFile(ws.clone())
            .run(&params(json!({"name": "notes/todo.txt", "content": "hello"})))
            .unwrap();
        let text = fs::read_to_string(ws.root().join("notes/todo.txt")).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn escape_is_refused() {
        let (_dir, ws) = workspace();
        let err = CreateFile(ws)
            .run(&params(json!({"name": "../outside.txt"})))
            .unwrap_err();
        assert!(matches!(err, KernelError::PermissionDenied { .. }));
    }

    #[test]
    fn bulk_decimal_folders() {
        let (_dir, ws) = workspace();
        let pattern = NamingPattern::decimal("1", 1, 15).to_value();
        let out = CreateBulkFolders(ws.clone())
            .run(&params(json!({"count": 15, "naming_pattern": pattern})))
            .unwrap();
        assert_eq!(out.value["created_count"], 15);
        assert!(ws.root().join("1.1").is_dir());
        assert!(ws.root().join("1.15").is_dir());
    }

    #[test]
    fn bulk_needs_existing_parent() {
        let (_dir, ws) = workspace();
        let pattern = NamingPattern::alphanumeric("mod", 1, 3).to_value();
        let err = CreateBulkFolders(ws)
            .run(&params(json!({"naming_pattern": pattern, "parent_folder": "missing"})))
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn bulk_empty_range_creates_nothing() {
        let (_dir, ws) = workspace();
        let pattern = NamingPattern::numeric(5, 2).to_value();
        let out = CreateBulkFolders(ws.clone())
            .run(&params(json!({"naming_pattern": pattern})))
            .unwrap();
        assert_eq!(out.value["created_count"], 0);
        assert_eq!(fs::read_dir(ws.root()).unwrap().count(), 0);
    }

    #[test]
    fn bulk_limit() {
        let (_dir, ws) = workspace();
        let pattern = NamingPattern::numeric(1, MAX_BULK_FOLDERS + 1).to_value();
        let err = CreateBulkFolders(ws)
            .run(&params(json!({"naming_pattern": pattern})))
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidParams { .. }));
    }

    #[test]
    fn nested_folders_inside_each_parent() {
        let (_dir, ws) = workspace();
        fs::create_dir_all(ws.root().join("project")).unwrap();
        let out = CreateNestedFolders(ws.clone())
            .run(&params(json!({
                "naming_pattern": NamingPattern::alphanumeric("sub", 1, 2).to_value(),
                "parent_folders_count": 3,
                "parent_prefix": "mod",
                "container": "project",
            })))
            .unwrap();
        assert_eq!(out.value["created_count"], 6);
        assert!(ws.root().join("project/mod3/sub2").is_dir());
    }

    #[test]
    fn copy_into_location_keeps_name() {
        let (_dir, ws) = workspace();
        fs::write(ws.root().join("a.txt"), "x").unwrap();
        fs::create_dir_all(ws.root().join("Documents")).unwrap();
        CopyItem(ws.clone())
            .run(&params(json!({"source": "a.txt", "destination": "documents"})))
            .unwrap();
        assert!(ws.root().join("Documents/a.txt").is_file());
        assert!(ws.root().join("a.txt").is_file());
    }

    #[test]
    fn copy_folder_recursively() {
        let (_dir, ws) = workspace();
        fs::create_dir_all(ws.root().join("src/inner")).unwrap();
        fs::write(ws.root().join("src/inner/f.txt"), "x").unwrap();
        CopyItem(ws.clone())
            .run(&params(json!({"source": "src", "destination": "dst"})))
            .unwrap();
        assert!(ws.root().join("dst/inner/f.txt").is_file());
    }

    #[test]
    fn move_and_rename() {
        let (_dir, ws) = workspace();
        fs::write(ws.root().join("a.txt"), "x").unwrap();
        MoveItem(ws.clone())
            .run(&params(json!({"source": "a.txt", "destination": "b.txt"})))
            .unwrap();
        RenameItem(ws.clone())
            .run(&params(json!({"source": "b.txt", "new_name": "c.txt"})))
            .unwrap();
        assert!(!ws.root().join("a.txt").exists());
        assert!(ws.root().join("c.txt").is_file());
    }

    #[test]
    fn rename_rejects_paths() {
        let (_dir, ws) = workspace();
        fs::write(ws.root().join("a.txt"), "x").unwrap();
        let err = RenameItem(ws)
            .run(&params(json!({"source": "a.txt", "new_name": "../b.txt"})))
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidParams { .. }));
    }

    #[test]
    fn delete_missing_is_terminal() {
        let (_dir, ws) = workspace();
        let err = DeleteItem(ws).run(&params(json!({"path": "ghost"}))).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn delete_folder_tree() {
        let (_dir, ws) = workspace();
        fs::create_dir_all(ws.root().join("old/deep")).unwrap();
        let out = DeleteItem(ws.clone()).run(&params(json!({"path": "old"}))).unwrap();
        assert_eq!(out.value["was_dir"], true);
        assert!(!ws.root().join("old").exists());
    }

    #[test]
    fn registration_covers_every_action() {
        let (_dir, ws) = workspace();
        let registry = ActionRegistry::new();
        register_filesystem(&registry, ws);
        assert_eq!(registry.list_by_category(CATEGORY).len(), 8);
    }
}
