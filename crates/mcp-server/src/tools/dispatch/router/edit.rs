use super::super::{
    require_file, CallScope, CallToolResult, EditRequest, LineageService, McpError, ToolError,
    ToolResult,
};
use crate::tools::files::{read_text, replace_exact, write_text};
use crate::tools::util::{append_section, SECTION_BREAK};
use std::path::PathBuf;

pub(in crate::tools::dispatch) async fn edit(
    service: &LineageService,
    request: EditRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = edit_file(service, &mut call, &request);
    drop(call);
    service.finish("edit", &request.file_path, outcome)
}

fn edit_file(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &EditRequest,
) -> ToolResult<String> {
    let (path, count) = apply_edit(
        service,
        call,
        &request.file_path,
        &request.old_string,
        &request.new_string,
        request.replace_all,
    )?;

    let mut out = format!(
        "Successfully replaced {count} occurrence(s) in {}",
        request.file_path
    );
    append_section(
        &mut out,
        &call.change_section(Some(&path)),
        SECTION_BREAK,
    );
    Ok(out)
}

/// Replace in place and fingerprint the result, so the edit never shows up as an external change.
pub(super) fn apply_edit(
    service: &LineageService,
    call: &mut CallScope<'_>,
    file_path: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> ToolResult<(PathBuf, usize)> {
    let path = service.resolve(file_path)?;
    require_file(service, file_path, &path)?;
    let current = read_text(&path).map_err(ToolError::Read)?;
    let (updated, count) = replace_exact(&current.content, old, new, replace_all)?;
    let mtime = write_text(&path, &updated).map_err(ToolError::Write)?;

    call.record_access(&path, mtime, updated);
    call.mark_instruction_file(&path);
    Ok((path, count))
}
