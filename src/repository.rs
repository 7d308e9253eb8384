use thiserror::Error;

use crate::{
    models::{Module, Project, User},
    storage::{Filter, Store, StoreError},
};

/// Deepest level a module may sit at; roots are level 1.
pub const MAX_MODULE_LEVEL: i64 = 5;

pub const ADMIN_NAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// ModuleError
///
/// Hierarchy violations on top of plain storage failures.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("parent module {0} not found")]
    ParentNotFound(i64),
    #[error("module level can not exceed {MAX_MODULE_LEVEL}")]
    DepthExceeded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// create_module
///
/// Places `module` under its parent: a zero `parent_id` makes a root at level 1,
/// otherwise the parent must exist and the new level is `parent.level + 1`.
pub async fn create_module(store: &Store, mut module: Module) -> Result<Module, ModuleError> {
    module.level = if module.parent_id == 0 {
        1
    } else {
        let parent = match store.get::<Module>(module.parent_id).await {
            Ok(parent) => parent,
            Err(StoreError::NotFound) => return Err(ModuleError::ParentNotFound(module.parent_id)),
            Err(e) => return Err(e.into()),
        };
        parent.level + 1
    };
    if module.level > MAX_MODULE_LEVEL {
        return Err(ModuleError::DepthExceeded);
    }

    let mut created = store.create(&module).await?;
    created.full_name = resolve_full_name(store, &created).await?;
    tracing::info!(id = created.base.id, level = created.level, full_name = %created.full_name, "module created");
    Ok(created)
}

/// resolve_full_name
///
/// Walks the parent chain to the root and joins the names with `/`. The walk is
/// bounded by `MAX_MODULE_LEVEL`; a parent that has vanished ends the path early.
pub async fn resolve_full_name(store: &Store, module: &Module) -> Result<String, StoreError> {
    let mut names = vec![module.name.clone()];
    let mut parent_id = module.parent_id;

    for _ in 1..MAX_MODULE_LEVEL {
        if parent_id == 0 {
            break;
        }
        match store.get::<Module>(parent_id).await {
            Ok(parent) => {
                names.push(parent.name);
                parent_id = parent.parent_id;
            }
            Err(StoreError::NotFound) => {
                tracing::warn!(module = module.base.id, parent_id, "parent module missing while resolving path");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    names.reverse();
    Ok(names.join("/"))
}

/// Fills `full_name` on every module of a page.
pub async fn with_full_names(store: &Store, modules: Vec<Module>) -> Result<Vec<Module>, StoreError> {
    let mut resolved = Vec::with_capacity(modules.len());
    for mut module in modules {
        module.full_name = resolve_full_name(store, &module).await?;
        resolved.push(module);
    }
    Ok(resolved)
}

/// Direct children of `parent_id`, unpaginated.
pub async fn children(store: &Store, parent_id: i64) -> Result<Vec<Module>, StoreError> {
    let (_, modules) = store
        .list::<Module>(-1, 1, &Filter::new().eq("parent_id", parent_id))
        .await?;
    Ok(modules)
}

/// collect_subtree
///
/// Ids of `root` and all its descendants, ordered so that every child precedes its
/// parent and `root` comes last.
pub async fn collect_subtree(store: &Store, root: i64) -> Result<Vec<i64>, StoreError> {
    let mut stack = vec![root];
    let mut preorder = Vec::new();

    while let Some(id) = stack.pop() {
        preorder.push(id);
        for child in children(store, id).await? {
            stack.push(child.base.id);
        }
    }

    preorder.reverse();
    Ok(preorder)
}

/// delete_module_tree
///
/// Hard-deletes a module and every descendant in one transaction, children first.
/// Returns the number of removed rows.
pub async fn delete_module_tree(store: &Store, id: i64) -> Result<u64, StoreError> {
    // NotFound for an unknown or already deleted target.
    store.get::<Module>(id).await?;

    let ids = collect_subtree(store, id).await?;
    let removed = store.force_delete_all::<Module>(&ids).await?;
    tracing::info!(id, removed, "module tree deleted");
    Ok(removed)
}

/// attach_module
///
/// Resolves the owning module's full path onto `project.module`. A missing module
/// leaves the path empty.
pub async fn attach_module(store: &Store, mut project: Project) -> Result<Project, StoreError> {
    project.module = match store.get::<Module>(project.module_id).await {
        Ok(module) => resolve_full_name(store, &module).await?,
        Err(StoreError::NotFound) => {
            tracing::warn!(project = project.base.id, module_id = project.module_id, "project module missing");
            String::new()
        }
        Err(e) => return Err(e),
    };
    Ok(project)
}

/// ensure_admin
///
/// Seeds the `admin` account when it does not exist yet. Returns whether a new
/// account was created; losing a creation race to another instance is not an error.
pub async fn ensure_admin(store: &Store, password: &str) -> Result<bool, StoreError> {
    if store.is_exist::<User>(ADMIN_NAME).await {
        tracing::debug!("admin account already present");
        return Ok(false);
    }

    let mut admin = User {
        name: ADMIN_NAME.to_string(),
        cn_name: ADMIN_NAME.to_string(),
        password: password.to_string(),
        email: ADMIN_EMAIL.to_string(),
        admin: true,
        enabled: true,
        ..User::default()
    };
    admin.encode_password();

    match store.create(&admin).await {
        Ok(_) => {
            tracing::info!("admin account created");
            Ok(true)
        }
        Err(StoreError::ObjectExists) => Ok(false),
        Err(e) => Err(e),
    }
}
