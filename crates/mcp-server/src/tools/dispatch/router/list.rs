use super::super::{
    require_directory, CallScope, CallToolResult, LineageService, ListRequest, McpError, ToolError,
    ToolResult,
};
use crate::tools::files::{list_directory, render_listing};
use crate::tools::util::{append_section, SECTION_BREAK};

pub(in crate::tools::dispatch) async fn list(
    service: &LineageService,
    request: ListRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = list_table(service, &mut call, &request);
    drop(call);
    service.finish("list", request.path.as_deref().unwrap_or(""), outcome)
}

fn list_table(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &ListRequest,
) -> ToolResult<String> {
    let dir = require_directory(service, request.path.as_deref())?;
    let entries = list_directory(&dir).map_err(ToolError::Read)?;
    let mut out = render_listing(&entries, service.guard().base());
    append_section(&mut out, &call.change_section(None), SECTION_BREAK);
    Ok(out)
}
