use super::super::{
    CallScope, CallToolResult, LineageService, McpError, ToolError, ToolResult, WriteRequest,
};
use crate::tools::files::write_text;
use crate::tools::util::{append_section, SECTION_BREAK};

pub(in crate::tools::dispatch) async fn write(
    service: &LineageService,
    request: WriteRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = write_file(service, &mut call, &request);
    drop(call);
    service.finish("write", &request.file_path, outcome)
}

fn write_file(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &WriteRequest,
) -> ToolResult<String> {
    let path = service.resolve(&request.file_path)?;
    if path.is_dir() {
        return Err(ToolError::NotAFile {
            path: request.file_path.clone(),
            base: service.base_display(),
        });
    }
    let mtime = write_text(&path, &request.content).map_err(ToolError::Write)?;

    call.record_access(&path, mtime, request.content.clone());
    call.mark_instruction_file(&path);

    let mut out = format!("Successfully wrote to {}", request.file_path);
    append_section(&mut out, &call.change_section(Some(&path)), SECTION_BREAK);
    Ok(out)
}
