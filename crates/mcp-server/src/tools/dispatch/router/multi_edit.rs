use super::super::{
    CallScope, CallToolResult, LineageService, McpError, MultiEditRequest, ToolError, ToolResult,
};
use super::edit::apply_edit;
use crate::tools::schemas::multi_edit::EditOperation;
use crate::tools::util::{append_section, SECTION_BREAK};

pub(in crate::tools::dispatch) async fn multi_edit(
    service: &LineageService,
    request: MultiEditRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let files: Vec<&str> = request
        .edits
        .iter()
        .filter_map(|edit| edit.file_path.as_deref())
        .collect();
    let label = files.join(",");
    let outcome = apply_all(service, &mut call, &request);
    drop(call);
    service.finish("multi_edit", &label, outcome)
}

fn apply_all(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &MultiEditRequest,
) -> ToolResult<String> {
    if request.edits.is_empty() {
        return Err(ToolError::InvalidRequest("No edits provided".to_string()));
    }

    let mut results = Vec::with_capacity(request.edits.len());
    for (idx, operation) in request.edits.iter().enumerate() {
        results.push(apply_one(service, call, idx + 1, operation));
    }

    let mut out = results.join("\n");
    append_section(&mut out, &call.change_section(None), SECTION_BREAK);
    Ok(out)
}

fn apply_one(
    service: &LineageService,
    call: &mut CallScope<'_>,
    number: usize,
    operation: &EditOperation,
) -> String {
    let Some(file_path) = operation.file_path.as_deref().filter(|p| !p.is_empty()) else {
        return format!("Edit {number}: Error: missing 'file_path'");
    };
    let Some(old) = operation.old_string.as_deref() else {
        return format!("Edit {number}: Error: missing 'old_string'");
    };
    let Some(new) = operation.new_string.as_deref() else {
        return format!("Edit {number}: Error: missing 'new_string'");
    };

    match apply_edit(service, call, file_path, old, new, operation.replace_all) {
        Ok((_, count)) => {
            format!("Edit {number} ({file_path}): Successfully replaced {count} occurrence(s)")
        }
        Err(err) => format!("Edit {number} ({file_path}): {err}"),
    }
}
