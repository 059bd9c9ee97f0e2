// Per-tool dispatch functions used by the MCP tool router.

pub(super) mod clear;
pub(super) mod delete;
pub(super) mod edit;
pub(super) mod list;
pub(super) mod multi_edit;
pub(super) mod multi_read;
pub(super) mod read;
pub(super) mod search;
pub(super) mod write;

mod tool_router;

pub(super) fn build_tool_router() -> rmcp::handler::server::tool::ToolRouter<super::LineageService>
{
    tool_router::build_tool_router()
}
