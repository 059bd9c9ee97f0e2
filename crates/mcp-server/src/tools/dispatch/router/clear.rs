use super::super::{CallToolResult, ClearRequest, LineageService, McpError};

pub(in crate::tools::dispatch) async fn clear(
    service: &LineageService,
    _request: ClearRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(false).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    call.force_clear();
    drop(call);
    service.finish(
        "clear",
        "",
        Ok("Cache cleared. Instruction files will be re-provided on next read.".to_string()),
    )
}
