use super::{router, LineageService};
use crate::control::ControlHandle;
use crate::tools::catalog;
use lineage_session::{PathGuard, SharedSession};
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool_handler, ErrorData as McpError, ServerHandler};
use std::sync::Arc;

impl LineageService {
    pub fn new(guard: PathGuard, session: SharedSession, control: Option<ControlHandle>) -> Self {
        Self {
            tool_router: router::build_tool_router(),
            guard: Arc::new(guard),
            session,
            control,
        }
    }
}

#[tool_handler]
impl ServerHandler for LineageService {
    #[allow(clippy::manual_async_fn)]
    fn initialize(
        &self,
        request: rmcp::model::InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<
        Output = std::result::Result<rmcp::model::InitializeResult, McpError>,
    > + Send
           + '_ {
        async move {
            if context.peer.peer_info().is_none() {
                context.peer.set_peer_info(request.clone());
            }

            // The tray shows the client by name; ancestor inference only fills the gap.
            let client_name = request.client_info.name.trim();
            if !client_name.is_empty() {
                if let Some(control) = &self.control {
                    control.set_client_label(client_name.to_string());
                }
            }
            log::debug!(
                "initialize from {} {}",
                request.client_info.name,
                request.client_info.version
            );

            let mut info = self.get_info();
            info.protocol_version = request.protocol_version;
            Ok(info)
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(catalog::tool_instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
