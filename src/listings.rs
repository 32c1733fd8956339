//! Workspace resource listings
//!
//! Renders workspaces and the users, clients and projects of a workspace as
//! `<ul>` fragments of `id: name` entries, in the order the API returns them.

use crate::cache::{BatchCache, TtlCache};
use crate::credentials::resolve_workspace_id;
use crate::error::{escape_html, Result, TogglError};
use crate::gateway::TogglClient;
use crate::options::{QueryOptions, ResolvedParams};
use crate::report::{json_kind, EntityId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceUser {
    pub id: EntityId,
    #[serde(default)]
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
}

/// Something that renders as one `id: name` list entry.
pub trait ListEntry {
    fn entry_id(&self) -> &EntityId;
    fn entry_name(&self) -> &str;
}

macro_rules! list_entry {
    ($ty:ty, $field:ident) => {
        impl ListEntry for $ty {
            fn entry_id(&self) -> &EntityId {
                &self.id
            }
            fn entry_name(&self) -> &str {
                &self.$field
            }
        }
    };
}

list_entry!(Workspace, name);
list_entry!(WorkspaceUser, fullname);
list_entry!(Client, name);
list_entry!(Project, name);

/// Resources below a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceResource {
    Users,
    Clients,
    Projects,
}

impl WorkspaceResource {
    pub fn path(self, workspace_id: &str) -> String {
        let resource = match self {
            WorkspaceResource::Users => "users",
            WorkspaceResource::Clients => "clients",
            WorkspaceResource::Projects => "projects",
        };
        format!("workspaces/{workspace_id}/{resource}")
    }
}

/// Clients of a workspace, in API order, with lookup by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDirectory {
    clients: Vec<Client>,
}

impl ClientDirectory {
    pub fn new(clients: Vec<Client>) -> Self {
        Self { clients }
    }

    pub fn get(&self, id: &EntityId) -> Option<&Client> {
        self.clients.iter().find(|client| &client.id == id)
    }

    pub fn name_of(&self, id: &EntityId) -> Option<&str> {
        self.get(id).map(|client| client.name.as_str())
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Decode a list response. A `null` body is an empty list.
pub fn decode_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => {
            serde_json::from_value(body).map_err(|e| TogglError::MalformedResponse(e.to_string()))
        }
        other => Err(TogglError::MalformedResponse(format!(
            "expected a list, got {}",
            json_kind(&other)
        ))),
    }
}

pub fn render_list<T: ListEntry>(items: &[T]) -> String {
    let mut output = String::from("<ul>");
    for item in items {
        output.push_str("<li>");
        output.push_str(&escape_html(item.entry_id().as_str()));
        output.push_str(": ");
        output.push_str(&escape_html(item.entry_name()));
        output.push_str("</li>");
    }
    output.push_str("</ul>");
    output
}

#[derive(Clone)]
pub struct ListingRenderer {
    client: Arc<TogglClient>,
    responses: Arc<TtlCache>,
    batch: Arc<BatchCache>,
    default_workspace: Option<String>,
}

impl ListingRenderer {
    pub fn new(
        client: Arc<TogglClient>,
        responses: Arc<TtlCache>,
        batch: Arc<BatchCache>,
        default_workspace: Option<String>,
    ) -> Self {
        Self {
            client,
            responses,
            batch,
            default_workspace,
        }
    }

    pub async fn workspaces(&self) -> Result<String> {
        let body = self.fetch("workspaces", &ResolvedParams::new()).await?;
        let workspaces: Vec<Workspace> = decode_list(body)?;
        Ok(render_list(&workspaces))
    }

    pub async fn users(&self, options: &QueryOptions) -> Result<String> {
        let (workspace_id, params) = self.split_workspace(options)?;
        let body = self
            .fetch(&WorkspaceResource::Users.path(&workspace_id), &params)
            .await?;
        let users: Vec<WorkspaceUser> = decode_list(body)?;
        Ok(render_list(&users))
    }

    pub async fn clients(&self, options: &QueryOptions) -> Result<String> {
        let (workspace_id, params) = self.split_workspace(options)?;
        let directory = self.fetch_clients(&workspace_id, &params).await?;
        Ok(render_list(directory.clients()))
    }

    pub async fn projects(&self, options: &QueryOptions) -> Result<String> {
        let (workspace_id, params) = self.split_workspace(options)?;
        let body = self
            .fetch(&WorkspaceResource::Projects.path(&workspace_id), &params)
            .await?;
        let projects: Vec<Project> = decode_list(body)?;
        Ok(render_list(&projects))
    }

    /// Clients of a workspace for label lookups. Failures give an empty
    /// directory, which is not remembered.
    pub async fn client_lookup(&self, workspace_id: &str, params: &ResolvedParams) -> Arc<ClientDirectory> {
        match self.fetch_clients(workspace_id, params).await {
            Ok(directory) => directory,
            Err(e) => {
                warn!(workspace_id, error = %e, "Client lookup failed");
                Arc::new(ClientDirectory::default())
            }
        }
    }

    async fn fetch_clients(&self, workspace_id: &str, params: &ResolvedParams) -> Result<Arc<ClientDirectory>> {
        if let Some(directory) = self.batch.clients(workspace_id, params) {
            debug!(workspace_id, "Clients already loaded in this batch");
            return Ok(directory);
        }
        let body = self
            .fetch(&WorkspaceResource::Clients.path(workspace_id), params)
            .await?;
        let directory = Arc::new(ClientDirectory::new(decode_list(body)?));
        self.batch
            .store_clients(workspace_id, params, Arc::clone(&directory));
        Ok(directory)
    }

    /// Workspace id to use, and the remaining options as query params.
    fn split_workspace(&self, options: &QueryOptions) -> Result<(String, ResolvedParams)> {
        let workspace_id = resolve_workspace_id(options, self.default_workspace.as_deref())?;
        let mut rest = options.clone();
        rest.remove("workspace_id");
        Ok((workspace_id, rest.to_params()))
    }

    async fn fetch(&self, path: &str, params: &ResolvedParams) -> Result<Value> {
        self.responses
            .get_or_fetch(path, params, || self.client.resource(path, params))
            .await?
            .into_success()
    }
}
