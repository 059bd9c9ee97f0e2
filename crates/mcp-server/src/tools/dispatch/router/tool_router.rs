use super::super::*;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_router};

pub(super) fn build_tool_router() -> ToolRouter<LineageService> {
    LineageService::tool_router()
}

#[tool_router]
impl LineageService {
    /// Directory listing as a markdown table.
    #[tool(
        description = "List a directory as a markdown table (directories first, then files with sizes). Paths are relative to the base directory."
    )]
    pub async fn list(
        &self,
        Parameters(request): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::list::list(self, request).await
    }

    /// Glob search below a directory.
    #[tool(
        description = "Find files by glob pattern ('*.rs' in one directory, '**/*.rs' recursively). Returns sorted paths relative to the base directory."
    )]
    pub async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::search::search(self, request).await
    }

    /// Read one file, paged when large.
    #[tool(
        description = "Read a text file, optionally with line numbers. Large files are paged so each response fits the read limit; follow the cursor in the continuation footer. Use offset/limit for a line window or page for fixed windows. The response may end with [CHANGED_FILES] and instruction files for the folders above the file."
    )]
    pub async fn read(
        &self,
        Parameters(request): Parameters<ReadRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::read::read(self, request).await
    }

    /// Read up to five files at once.
    #[tool(description = "Read up to 5 files in one call, each under a '--- path ---' header.")]
    pub async fn multi_read(
        &self,
        Parameters(request): Parameters<MultiReadRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::multi_read::multi_read(self, request).await
    }

    /// Create or overwrite a file.
    #[tool(description = "Create or overwrite a file. Parent directories are created.")]
    pub async fn write(
        &self,
        Parameters(request): Parameters<WriteRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::write::write(self, request).await
    }

    /// Exact string replacement.
    #[tool(
        description = "Replace an exact string in a file. The string must be unique unless replace_all is true."
    )]
    pub async fn edit(
        &self,
        Parameters(request): Parameters<EditRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::edit::edit(self, request).await
    }

    /// Several replacements in order.
    #[tool(
        description = "Apply several exact string replacements in order, possibly across files. Each edit reports its own result."
    )]
    pub async fn multi_edit(
        &self,
        Parameters(request): Parameters<MultiEditRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::multi_edit::multi_edit(self, request).await
    }

    /// Delete a file or an empty directory.
    #[tool(description = "Delete a file or an empty directory.")]
    pub async fn delete(
        &self,
        Parameters(request): Parameters<DeleteRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::delete::delete(self, request).await
    }

    /// Forget everything this session has seen.
    #[tool(
        description = "Clear the session cache. Tracked files are forgotten and instruction files are provided again on the next read."
    )]
    pub async fn clear(
        &self,
        Parameters(request): Parameters<ClearRequest>,
    ) -> Result<CallToolResult, McpError> {
        super::clear::clear(self, request).await
    }
}
