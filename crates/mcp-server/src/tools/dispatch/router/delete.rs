use super::super::{
    CallScope, CallToolResult, DeleteRequest, LineageService, McpError, ToolError, ToolResult,
};
use crate::tools::util::{append_section, SECTION_BREAK};
use std::fs;

pub(in crate::tools::dispatch) async fn delete(
    service: &LineageService,
    request: DeleteRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = delete_path(service, &mut call, &request);
    drop(call);
    service.finish("delete", &request.file_path, outcome)
}

fn delete_path(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &DeleteRequest,
) -> ToolResult<String> {
    let path = service.resolve(&request.file_path)?;
    if path == service.guard().base() {
        return Err(ToolError::InvalidRequest(
            "Cannot delete the base directory".to_string(),
        ));
    }
    let meta = fs::symlink_metadata(&path).map_err(|_| ToolError::FileNotFound {
        path: request.file_path.clone(),
        base: service.base_display(),
    })?;

    let deleted = |source| ToolError::Delete {
        path: request.file_path.clone(),
        source,
    };
    let mut out = if meta.is_dir() {
        // Only empty directories; `remove_dir` refuses anything else.
        fs::remove_dir(&path).map_err(deleted)?;
        format!("Successfully deleted empty directory: {}", request.file_path)
    } else {
        fs::remove_file(&path).map_err(deleted)?;
        format!("Successfully deleted file: {}", request.file_path)
    };

    call.untrack(&path);
    append_section(&mut out, &call.change_section(None), SECTION_BREAK);
    Ok(out)
}
